use std::path::{Path, PathBuf};

use super::builder::SettingsBuilder;
use super::env::EnvSource;
use super::error::{ExpansionCause, SettingsError};
use super::expand::expand_value;
use super::map::SettingsMap;

/// Settings loaded for a program, with `${name}` expansion on read.
///
/// Immutable once built; share it behind an `Arc` or use the process-wide
/// instance in [`crate::global`].
///
/// ## Expansion
///
/// A `${name}` reference in a value resolves, in order, to:
///
/// 1. the setting `name`, itself expanded
/// 2. the environment variable `name`
/// 3. a computed name: `ProgramDirectory`
///
/// ```no_run
/// use app_settings::Settings;
///
/// // <add key="data" value="${ProgramDirectory}/data"/>
/// let settings = Settings::from_process()?;
/// let data_dir = settings.get_setting("data")?;
/// # Ok::<(), app_settings::SettingsError>(())
/// ```
#[derive(Debug, Clone)]
pub struct Settings {
    pub(super) program_exe: PathBuf,
    pub(super) program_directory: PathBuf,
    pub(super) config_filenames: Vec<PathBuf>,
    pub(super) map: SettingsMap,
    pub(super) env: EnvSource,
}

impl Settings {
    /// Creates a builder for settings with non-default sources.
    pub fn builder() -> SettingsBuilder {
        SettingsBuilder::default()
    }

    /// Loads the settings file belonging to the running executable.
    pub fn from_process() -> Result<Self, SettingsError> {
        Self::builder().build()
    }

    pub fn program_exe(&self) -> &Path {
        &self.program_exe
    }

    /// Directory containing [`program_exe`](Self::program_exe).
    pub fn program_directory(&self) -> &Path {
        &self.program_directory
    }

    /// Every settings file that was read, the primary file first.
    pub fn config_filenames(&self) -> &[PathBuf] {
        &self.config_filenames
    }

    /// All raw values, before expansion.
    pub fn settings(&self) -> &SettingsMap {
        &self.map
    }

    pub fn raw_setting(&self, name: &str) -> Option<&str> {
        self.map.get(name)
    }

    pub fn contains_setting(&self, name: &str) -> bool {
        self.map.contains_key(name)
    }

    /// Returns the expanded value of a setting that must exist.
    pub fn get_setting(&self, name: &str) -> Result<String, SettingsError> {
        self.find_setting(name)?
            .ok_or_else(|| SettingsError::MissingSetting(name.to_string()))
    }

    /// Returns the expanded value of `name`, or `default` as given.
    ///
    /// The default is returned verbatim; `${...}` in it is not expanded.
    pub fn get_setting_or(&self, name: &str, default: &str) -> Result<String, SettingsError> {
        Ok(self
            .find_setting(name)?
            .unwrap_or_else(|| default.to_string()))
    }

    /// Returns the expanded value of `name`, or `None` if it is not set.
    pub fn find_setting(&self, name: &str) -> Result<Option<String>, SettingsError> {
        self.expand_setting(name, &mut Vec::new())
    }

    /// Resolves `name` the way a `${name}` reference would.
    pub fn get_expand_setting(&self, name: &str) -> Result<Option<String>, SettingsError> {
        self.resolve(name, &mut Vec::new())
    }

    // `expanding` holds the settings whose values are being expanded further
    // up the call chain.
    fn expand_setting(
        &self,
        name: &str,
        expanding: &mut Vec<String>,
    ) -> Result<Option<String>, SettingsError> {
        let Some(raw) = self.map.get(name) else {
            return Ok(None);
        };

        if expanding.iter().any(|n| n == name) {
            return Err(SettingsError::Expansion {
                name: name.to_string(),
                source: ExpansionCause::Circular(name.to_string()),
            });
        }

        expanding.push(name.to_string());
        let result = expand_value(raw, |reference| self.resolve(reference, expanding));
        expanding.pop();

        result.map(Some).map_err(|source| SettingsError::Expansion {
            name: name.to_string(),
            source,
        })
    }

    fn resolve(
        &self,
        name: &str,
        expanding: &mut Vec<String>,
    ) -> Result<Option<String>, SettingsError> {
        if let Some(value) = self.expand_setting(name, expanding)? {
            return Ok(Some(value));
        }

        if let Some(value) = self.env.get(name) {
            return Ok(Some(value));
        }

        Ok(self.computed(name))
    }

    fn computed(&self, name: &str) -> Option<String> {
        match name {
            "ProgramDirectory" => Some(self.program_directory.to_string_lossy().into_owned()),
            _ => None,
        }
    }
}
