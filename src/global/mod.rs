//! Process-wide settings for the running executable.
//!
//! The first accessor call loads the settings file next to the executable
//! (see [`Settings::from_process`]) and keeps the result for the rest of the
//! process. Concurrent first calls wait for that single load. If loading
//! fails, nothing is kept: the error goes to the caller and the next call
//! tries again from scratch.
//!
//! Programs that construct [`Settings`] themselves can [`install`] them
//! before the first access.
//!
//! ## Example
//!
//! ```no_run
//! use app_settings::global;
//!
//! let timeout = global::get_setting_or("timeout", "30")?;
//! let data_dir = global::get_setting("data")?;
//! # Ok::<(), app_settings::SettingsError>(())
//! ```

use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};

use tracing::warn;

use crate::settings::{Settings, SettingsError};

static SETTINGS: OnceLock<Settings> = OnceLock::new();

// Serializes initialization; reads after that go through `SETTINGS` alone.
static INIT_LOCK: Mutex<()> = Mutex::new(());

/// Returns the process-wide settings, loading them on first use.
pub fn settings() -> Result<&'static Settings, SettingsError> {
    load_once(&SETTINGS, &INIT_LOCK, || {
        Settings::from_process().inspect_err(|err| {
            warn!(error = %err, "failed to load application settings");
        })
    })
}

/// Returns the value in `cell`, running `load` under `lock` if it is empty.
///
/// Callers arriving while a load is running wait for it and share its
/// result. A failed load leaves `cell` empty for the next caller to retry.
fn load_once<'a, T, E>(
    cell: &'a OnceLock<T>,
    lock: &Mutex<()>,
    load: impl FnOnce() -> Result<T, E>,
) -> Result<&'a T, E> {
    if let Some(value) = cell.get() {
        return Ok(value);
    }

    let _guard = lock.lock().unwrap_or_else(|e| e.into_inner());
    if let Some(value) = cell.get() {
        return Ok(value);
    }

    let loaded = load()?;
    Ok(cell.get_or_init(|| loaded))
}

/// Makes `settings` the process-wide settings.
///
/// Returns `false`, leaving the current settings in place, if settings were
/// already loaded or installed.
pub fn install(settings: Settings) -> bool {
    let _guard = INIT_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    SETTINGS.set(settings).is_ok()
}

pub fn is_initialized() -> bool {
    SETTINGS.get().is_some()
}

pub fn program_exe() -> Result<&'static Path, SettingsError> {
    Ok(settings()?.program_exe())
}

pub fn program_directory() -> Result<&'static Path, SettingsError> {
    Ok(settings()?.program_directory())
}

pub fn config_filenames() -> Result<&'static [PathBuf], SettingsError> {
    Ok(settings()?.config_filenames())
}

/// See [`Settings::get_setting`].
pub fn get_setting(name: &str) -> Result<String, SettingsError> {
    settings()?.get_setting(name)
}

/// See [`Settings::get_setting_or`].
pub fn get_setting_or(name: &str, default: &str) -> Result<String, SettingsError> {
    settings()?.get_setting_or(name, default)
}

/// See [`Settings::find_setting`].
pub fn find_setting(name: &str) -> Result<Option<String>, SettingsError> {
    settings()?.find_setting(name)
}

/// See [`Settings::get_expand_setting`].
pub fn get_expand_setting(name: &str) -> Result<Option<String>, SettingsError> {
    settings()?.get_expand_setting(name)
}
