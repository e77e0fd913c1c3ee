//! Loads `appSettings` directives from XML files into a [`SettingsMap`].

use std::path::{Path, PathBuf};

use tracing::debug;

use super::error::{LoadCause, SettingsError};
use super::map::SettingsMap;
use super::node::{select, SettingsNode};
use super::xml::{decode_document, parse_document, Element};

/// Location of the directives in the primary settings file.
pub const ROOT_SELECTOR: &str = "/configuration/appSettings";

/// Location of the directives in a file named by a `file` attribute.
pub const INCLUDE_SELECTOR: &str = "/appSettings";

/// Accumulates settings across a primary file and its includes.
///
/// Every call to [`load`](Self::load) applies its directives on top of what
/// earlier calls produced, so a `clear` in a later file wipes entries from
/// earlier ones.
#[derive(Debug, Default)]
pub struct SettingsLoader {
    map: SettingsMap,
    filenames: Vec<PathBuf>,
    // Files whose directives are currently being applied, outermost first.
    active: Vec<PathBuf>,
}

impl SettingsLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads `path` and applies the directives of the element at `selector`.
    ///
    /// A `file` attribute on that element is followed before the element's
    /// own directives are applied; the named file is resolved relative to
    /// the directory of `path` and read with [`INCLUDE_SELECTOR`].
    pub fn load(&mut self, path: &Path, selector: &str) -> Result<(), SettingsError> {
        let root = read_document(path)?;
        self.filenames.push(path.to_path_buf());
        debug!(path = %path.display(), "loaded settings file");

        self.active.push(identity(path));
        let result = self.apply(path, &root, selector);
        self.active.pop();

        result.map_err(|source| SettingsError::Load {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Paths of every file read so far, in the order they were read.
    pub fn filenames(&self) -> &[PathBuf] {
        &self.filenames
    }

    pub fn map(&self) -> &SettingsMap {
        &self.map
    }

    pub fn finish(self) -> (Vec<PathBuf>, SettingsMap) {
        (self.filenames, self.map)
    }

    fn apply(&mut self, path: &Path, root: &Element, selector: &str) -> Result<(), LoadCause> {
        let element = select(root, selector)
            .ok_or_else(|| LoadCause::MissingElement(selector.to_string()))?;

        if let Some(file) = element.attribute("file") {
            let include = parent_directory(path).map_err(nested)?.join(file);
            if self.active.contains(&identity(&include)) {
                return Err(LoadCause::CircularInclude(include));
            }

            debug!(
                from = %path.display(),
                include = %include.display(),
                "following settings include"
            );
            self.load(&include, INCLUDE_SELECTOR).map_err(nested)?;
        }

        apply_directives(&mut self.map, element);
        Ok(())
    }
}

/// Applies the `add`, `remove` and `clear` children of `element` to `map` in
/// document order.
///
/// `add` and `remove` without a `key` attribute are skipped, an `add`
/// without `value` stores an empty string, and any other element is ignored.
pub fn apply_directives<N: SettingsNode>(map: &mut SettingsMap, element: &N) {
    for child in element.children() {
        match child.name() {
            "add" => {
                if let Some(key) = child.attribute("key") {
                    map.insert(key, child.attribute("value").unwrap_or_default());
                }
            }
            "remove" => {
                if let Some(key) = child.attribute("key") {
                    map.remove(key);
                }
            }
            "clear" => map.clear(),
            _ => {}
        }
    }
}

/// Returns the directory containing `path`.
///
/// Fails for paths without a directory component, such as a bare file name
/// or a filesystem root.
pub fn parent_directory(path: &Path) -> Result<&Path, SettingsError> {
    path.parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .ok_or_else(|| SettingsError::PathResolution(path.to_path_buf()))
}

fn read_document(path: &Path) -> Result<Element, SettingsError> {
    let load_error = |source| SettingsError::Load {
        path: path.to_path_buf(),
        source,
    };

    let bytes = std::fs::read(path).map_err(|e| load_error(LoadCause::Read(e)))?;
    let text = decode_document(&bytes).map_err(load_error)?;
    parse_document(&text).map_err(load_error)
}

/// Canonical form used to recognise the same file reached through different paths.
fn identity(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

fn nested(err: SettingsError) -> LoadCause {
    LoadCause::Nested(Box::new(err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    fn primary(body: &str) -> String {
        format!("<configuration><appSettings>{body}</appSettings></configuration>")
    }

    fn load(path: &Path) -> Result<SettingsLoader, SettingsError> {
        let mut loader = SettingsLoader::new();
        loader.load(path, ROOT_SELECTOR)?;
        Ok(loader)
    }

    #[test]
    fn test_add_directives_in_document_order() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "app.dll.config",
            &primary(
                r#"
                <add key="a" value="1"/>
                <add key="b" value="2"/>
                <add key="a" value="3"/>
                "#,
            ),
        );

        let (filenames, map) = load(&path).unwrap().finish();
        assert_eq!(filenames, vec![path]);
        assert_eq!(map.get("a"), Some("3"));
        assert_eq!(map.get("b"), Some("2"));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_remove_and_clear() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "app.dll.config",
            &primary(
                r#"
                <add key="a" value="1"/>
                <add key="b" value="2"/>
                <remove key="a"/>
                <remove key="never-added"/>
                <clear/>
                <add key="c" value="3"/>
                <remove key="b"/>
                "#,
            ),
        );

        let loader = load(&path).unwrap();
        let keys: Vec<&str> = loader.map().iter().map(|(k, _)| k).collect();
        assert_eq!(keys, ["c"]);
    }

    #[test]
    fn test_lenient_directives() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "app.dll.config",
            &primary(
                r#"
                <add key="empty"/>
                <add value="no key"/>
                <remove/>
                <unknown key="x" value="y"/>
                "#,
            ),
        );

        let loader = load(&path).unwrap();
        assert_eq!(loader.map().get("empty"), Some(""));
        assert_eq!(loader.map().len(), 1);
    }

    #[test]
    fn test_include_is_applied_first() {
        let dir = TempDir::new().unwrap();
        let included = write(
            &dir,
            "shared.config",
            r#"<appSettings>
                 <add key="shared" value="from include"/>
                 <add key="overridden" value="from include"/>
               </appSettings>"#,
        );
        let path = write(
            &dir,
            "app.dll.config",
            r#"<configuration>
                 <appSettings file="shared.config">
                   <add key="overridden" value="from primary"/>
                 </appSettings>
               </configuration>"#,
        );

        let (filenames, map) = load(&path).unwrap().finish();
        assert_eq!(filenames, vec![path, included]);
        assert_eq!(map.get("shared"), Some("from include"));
        assert_eq!(map.get("overridden"), Some("from primary"));
    }

    #[test]
    fn test_clear_discards_included_entries() {
        let dir = TempDir::new().unwrap();
        write(
            &dir,
            "shared.config",
            r#"<appSettings><add key="shared" value="1"/></appSettings>"#,
        );
        let path = write(
            &dir,
            "app.dll.config",
            r#"<configuration>
                 <appSettings file="shared.config">
                   <clear/>
                   <add key="own" value="2"/>
                 </appSettings>
               </configuration>"#,
        );

        let loader = load(&path).unwrap();
        assert_eq!(loader.map().get("shared"), None);
        assert_eq!(loader.map().get("own"), Some("2"));
    }

    #[test]
    fn test_include_chain() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("conf")).unwrap();
        write(
            &dir,
            "conf/base.config",
            r#"<appSettings><add key="level" value="base"/><add key="base" value="yes"/></appSettings>"#,
        );
        write(
            &dir,
            "conf/site.config",
            r#"<appSettings file="base.config"><add key="level" value="site"/></appSettings>"#,
        );
        let path = write(
            &dir,
            "app.dll.config",
            r#"<configuration><appSettings file="conf/site.config"/></configuration>"#,
        );

        let loader = load(&path).unwrap();
        assert_eq!(loader.filenames().len(), 3);
        assert_eq!(loader.map().get("level"), Some("site"));
        assert_eq!(loader.map().get("base"), Some("yes"));
    }

    #[test]
    fn test_utf16_file_with_bom() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.dll.config");
        let text = r#"<?xml version="1.0" encoding="utf-16"?>
            <configuration><appSettings><add key="a" value="1"/><add key="name" value="Zoë"/></appSettings></configuration>"#;
        let mut bytes = vec![0xFF, 0xFE];
        bytes.extend(text.encode_utf16().flat_map(u16::to_le_bytes));
        std::fs::write(&path, bytes).unwrap();

        let loader = load(&path).unwrap();
        assert_eq!(loader.map().get("a"), Some("1"));
        assert_eq!(loader.map().get("name"), Some("Zoë"));
    }

    #[test]
    fn test_undecodable_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.dll.config");
        std::fs::write(&path, b"<configuration><appSettings><add key=\"a\" value=\"\xFF\"/></appSettings></configuration>").unwrap();

        let err = load(&path).unwrap_err();
        assert!(matches!(
            err,
            SettingsError::Load { source: LoadCause::Decode(_), .. }
        ));
    }

    #[test]
    fn test_missing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("absent.dll.config");

        let err = load(&path).unwrap_err();
        assert!(matches!(
            err,
            SettingsError::Load { source: LoadCause::Read(_), .. }
        ));
    }

    #[test]
    fn test_missing_element_is_recorded_then_fails() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "app.dll.config", "<configuration/>");

        let mut loader = SettingsLoader::new();
        let err = loader.load(&path, ROOT_SELECTOR).unwrap_err();
        match err {
            SettingsError::Load {
                path: failed,
                source: LoadCause::MissingElement(selector),
            } => {
                assert_eq!(failed, path);
                assert_eq!(selector, ROOT_SELECTOR);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(loader.filenames(), [path]);
    }

    #[test]
    fn test_included_file_needs_top_level_element() {
        let dir = TempDir::new().unwrap();
        write(
            &dir,
            "shared.config",
            &primary(r#"<add key="a" value="1"/>"#),
        );
        let path = write(
            &dir,
            "app.dll.config",
            r#"<configuration><appSettings file="shared.config"/></configuration>"#,
        );

        let err = load(&path).unwrap_err();
        let SettingsError::Load {
            path: outer,
            source: LoadCause::Nested(inner),
        } = err
        else {
            panic!("expected nested load error");
        };
        assert_eq!(outer, path);
        assert!(matches!(
            *inner,
            SettingsError::Load { source: LoadCause::MissingElement(_), .. }
        ));
    }

    #[test]
    fn test_missing_include_names_both_files() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "app.dll.config",
            r#"<configuration><appSettings file="absent.config"/></configuration>"#,
        );

        let err = load(&path).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("app.dll.config"), "{message}");
        assert!(message.contains("absent.config"), "{message}");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_circular_include() {
        let dir = TempDir::new().unwrap();
        write(
            &dir,
            "a.config",
            r#"<appSettings file="b.config"><add key="a" value="1"/></appSettings>"#,
        );
        write(
            &dir,
            "b.config",
            r#"<appSettings file="a.config"><add key="b" value="2"/></appSettings>"#,
        );
        let path = write(
            &dir,
            "app.dll.config",
            r#"<configuration><appSettings file="a.config"/></configuration>"#,
        );

        let err = load(&path).unwrap_err();
        assert!(err.to_string().contains("circular include"), "{err}");
    }

    #[test]
    fn test_doctype_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "app.dll.config",
            r#"<!DOCTYPE configuration [<!ENTITY big "aaaaaaaaaa">]>
               <configuration><appSettings><add key="a" value="&big;"/></appSettings></configuration>"#,
        );

        let mut loader = SettingsLoader::new();
        let err = loader.load(&path, ROOT_SELECTOR).unwrap_err();
        assert!(matches!(
            err,
            SettingsError::Load { source: LoadCause::DtdProhibited, .. }
        ));
        assert!(loader.filenames().is_empty());
    }

    #[test]
    fn test_parent_directory() {
        assert_eq!(
            parent_directory(Path::new("/opt/app/app.dll.config")).unwrap(),
            Path::new("/opt/app")
        );
        assert!(matches!(
            parent_directory(Path::new("app.dll.config")),
            Err(SettingsError::PathResolution(_))
        ));
        assert!(parent_directory(Path::new("/")).is_err());
    }

    #[derive(Debug)]
    struct Node {
        name: &'static str,
        attributes: Vec<(&'static str, &'static str)>,
        children: Vec<Node>,
    }

    impl SettingsNode for Node {
        fn name(&self) -> &str {
            self.name
        }

        fn attribute(&self, name: &str) -> Option<&str> {
            self.attributes
                .iter()
                .find(|(k, _)| *k == name)
                .map(|(_, v)| *v)
        }

        fn children(&self) -> &[Self] {
            &self.children
        }
    }

    #[test]
    fn test_apply_directives_on_any_node_type() {
        let leaf = |name, attributes| Node {
            name,
            attributes,
            children: Vec::new(),
        };
        let element = Node {
            name: "appSettings",
            attributes: Vec::new(),
            children: vec![
                leaf("add", vec![("key", "x"), ("value", "1")]),
                leaf("add", vec![("key", "y"), ("value", "2")]),
                leaf("remove", vec![("key", "x")]),
            ],
        };

        let mut map = SettingsMap::new();
        map.insert("stale", "value");
        apply_directives(&mut map, &element);

        assert_eq!(map.get("stale"), Some("value"));
        assert_eq!(map.get("x"), None);
        assert_eq!(map.get("y"), Some("2"));
    }
}
