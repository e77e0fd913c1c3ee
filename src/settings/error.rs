use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SettingsError {
    #[error("cannot determine the path of the running executable: {source}")]
    ProcessPathUnavailable { source: std::io::Error },

    #[error("cannot determine the directory of '{0}'")]
    PathResolution(PathBuf),

    #[error("failed to load settings file '{path}': {source}")]
    Load { path: PathBuf, source: LoadCause },

    #[error("missing setting '{0}'")]
    MissingSetting(String),

    #[error("failed to expand setting '{name}': {source}")]
    Expansion {
        name: String,
        source: ExpansionCause,
    },
}

/// Why a settings file could not be loaded.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LoadCause {
    #[error("{0}")]
    Read(#[source] std::io::Error),

    #[error("{0}")]
    Parse(#[source] quick_xml::Error),

    #[error("unsupported encoding '{0}'")]
    UnknownEncoding(String),

    #[error("document is not valid {0}")]
    Decode(&'static str),

    #[error("DTD processing is prohibited")]
    DtdProhibited,

    #[error("{0}")]
    Malformed(String),

    #[error("missing element '{0}'")]
    MissingElement(String),

    #[error("circular include of '{0}'")]
    CircularInclude(PathBuf),

    #[error("{0}")]
    Nested(#[source] Box<SettingsError>),
}

/// Why a `${name}` reference could not be expanded.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ExpansionCause {
    #[error("unclosed reference (missing '}}')")]
    Unterminated,

    #[error("'{0}' not found in settings or environment")]
    Unresolved(String),

    #[error("circular reference to '{0}'")]
    Circular(String),

    #[error("{0}")]
    Nested(#[source] Box<SettingsError>),
}
