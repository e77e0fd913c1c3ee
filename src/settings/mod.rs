//! Loading and reading `appSettings` files.

mod builder;
mod env;
mod error;
mod expand;
mod loader;
mod map;
mod node;
mod store;
mod xml;

pub use builder::{config_path_for, SettingsBuilder, CONFIG_EXTENSION};
pub use env::EnvSource;
pub use error::{ExpansionCause, LoadCause, SettingsError};
pub use expand::expand_value;
pub use loader::{apply_directives, SettingsLoader, INCLUDE_SELECTOR, ROOT_SELECTOR};
pub use map::SettingsMap;
pub use node::{select, SettingsNode};
pub use store::Settings;
pub use xml::{decode_document, parse_document, Element};
