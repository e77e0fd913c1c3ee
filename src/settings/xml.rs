//! Minimal XML element tree for settings documents.
//!
//! Only elements and their attributes are kept. Document type declarations
//! are rejected outright, and attribute values are unescaped against the
//! predefined XML entities only, so no external or DTD-declared entity is
//! ever resolved. Literal whitespace in attribute values is normalized to
//! spaces as XML requires; character references such as `&#10;` survive.

use std::borrow::Cow;

use encoding_rs::{Encoding, UTF_16BE, UTF_16LE, UTF_8};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::error::LoadCause;
use super::node::SettingsNode;

/// An element with its attributes and child elements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<Element>,
}

impl Element {
    fn from_start(start: &BytesStart<'_>) -> Result<Self, LoadCause> {
        let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();

        let mut attributes = Vec::new();
        for attr in start.attributes() {
            let attr = attr
                .map_err(quick_xml::Error::from)
                .map_err(LoadCause::Parse)?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let raw = String::from_utf8_lossy(&attr.value);
            let value = quick_xml::escape::unescape(&normalize_whitespace(&raw))
                .map_err(quick_xml::Error::from)
                .map_err(LoadCause::Parse)?
                .into_owned();
            attributes.push((key, value));
        }

        Ok(Self {
            name,
            attributes,
            children: Vec::new(),
        })
    }
}

impl SettingsNode for Element {
    fn name(&self) -> &str {
        &self.name
    }

    fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    fn children(&self) -> &[Self] {
        &self.children
    }
}

/// Decodes the raw bytes of a settings file.
///
/// A byte order mark decides the encoding. Without one, UTF-16 is recognised
/// from the leading `<?`, then the `encoding` of the XML declaration is used,
/// and UTF-8 when nothing is declared.
pub fn decode_document(bytes: &[u8]) -> Result<Cow<'_, str>, LoadCause> {
    let (encoding, body) = match Encoding::for_bom(bytes) {
        Some((encoding, bom_len)) => (encoding, &bytes[bom_len..]),
        None if bytes.starts_with(&[0x3C, 0x00, 0x3F, 0x00]) => (UTF_16LE, bytes),
        None if bytes.starts_with(&[0x00, 0x3C, 0x00, 0x3F]) => (UTF_16BE, bytes),
        None => match declared_encoding(bytes) {
            Some(label) => {
                let encoding = Encoding::for_label(label.as_bytes())
                    .ok_or_else(|| LoadCause::UnknownEncoding(label.to_string()))?;
                // The declaration was just read as single bytes.
                if encoding == UTF_16LE || encoding == UTF_16BE {
                    return Err(LoadCause::Decode(encoding.name()));
                }
                (encoding, bytes)
            }
            None => (UTF_8, bytes),
        },
    };

    let (text, had_errors) = encoding.decode_without_bom_handling(body);
    if had_errors {
        return Err(LoadCause::Decode(encoding.name()));
    }
    Ok(text)
}

/// The `encoding` pseudo-attribute of a leading `<?xml ...?>` declaration.
fn declared_encoding(bytes: &[u8]) -> Option<&str> {
    let rest = bytes.strip_prefix(b"<?xml")?;
    let end = rest.windows(2).position(|w| w == b"?>")?;
    let declaration = std::str::from_utf8(&rest[..end]).ok()?;

    let after = &declaration[declaration.find("encoding")? + "encoding".len()..];
    let after = after.trim_start().strip_prefix('=')?.trim_start();
    let quote = after.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    let value = &after[1..];
    Some(&value[..value.find(quote)?])
}

// Line breaks count once, so `\r\n` becomes a single space.
fn normalize_whitespace(raw: &str) -> Cow<'_, str> {
    if !raw.contains(['\t', '\n', '\r']) {
        return Cow::Borrowed(raw);
    }
    Cow::Owned(
        raw.replace("\r\n", " ")
            .replace(['\t', '\n', '\r'], " "),
    )
}

/// Parses `text` into its root element.
pub fn parse_document(text: &str) -> Result<Element, LoadCause> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        match reader.read_event().map_err(LoadCause::Parse)? {
            Event::DocType(_) => return Err(LoadCause::DtdProhibited),
            Event::Start(ref e) => {
                let element = Element::from_start(e)?;
                if stack.is_empty() && root.is_some() {
                    return Err(multiple_roots());
                }
                stack.push(element);
            }
            Event::Empty(ref e) => {
                let element = Element::from_start(e)?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| LoadCause::Malformed("unexpected end tag".to_string()))?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(LoadCause::Malformed(format!(
            "unclosed element '{}'",
            open.name
        )));
    }

    root.ok_or_else(|| LoadCause::Malformed("document has no root element".to_string()))
}

/// Hands a completed element to its parent, or makes it the document root.
fn attach(
    stack: &mut [Element],
    root: &mut Option<Element>,
    element: Element,
) -> Result<(), LoadCause> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None if root.is_some() => return Err(multiple_roots()),
        None => *root = Some(element),
    }
    Ok(())
}

fn multiple_roots() -> LoadCause {
    LoadCause::Malformed("document has more than one root element".to_string())
}
