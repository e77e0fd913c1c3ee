pub mod global;
pub mod settings;

pub use settings::{
    ExpansionCause, LoadCause, Settings, SettingsBuilder, SettingsError, SettingsMap,
};
