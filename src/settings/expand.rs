//! `${name}` substitution in setting values.
//!
//! Substitution is a single left-to-right pass: text spliced in for a
//! reference is never scanned again, so a resolved value that itself
//! contains `${...}` comes through literally.

use super::error::{ExpansionCause, SettingsError};

const OPEN: &str = "${";
const CLOSE: char = '}';

/// Replaces every `${name}` in `raw` with what `lookup` returns for `name`.
///
/// Fails if a reference has no closing `}`, if `lookup` finds nothing, or if
/// `lookup` itself fails.
pub fn expand_value<F>(raw: &str, mut lookup: F) -> Result<String, ExpansionCause>
where
    F: FnMut(&str) -> Result<Option<String>, SettingsError>,
{
    let mut value = raw.to_string();
    let mut pos = 0;

    while let Some(offset) = value[pos..].find(OPEN) {
        let begin = pos + offset;
        let name_start = begin + OPEN.len();
        let end = value[name_start..]
            .find(CLOSE)
            .map(|i| name_start + i)
            .ok_or(ExpansionCause::Unterminated)?;

        let name = value[name_start..end].to_string();
        let resolved = lookup(&name)
            .map_err(|e| ExpansionCause::Nested(Box::new(e)))?
            .ok_or(ExpansionCause::Unresolved(name))?;

        value.replace_range(begin..=end, &resolved);
        pos = begin + resolved.len();
    }

    Ok(value)
}
