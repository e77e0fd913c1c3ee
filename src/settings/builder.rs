use std::path::{Path, PathBuf};

use tracing::debug;

use super::env::EnvSource;
use super::loader::{parent_directory, SettingsLoader, ROOT_SELECTOR};
use super::store::Settings;
use super::SettingsError;

/// Extension that replaces the executable's own to name its settings file.
pub const CONFIG_EXTENSION: &str = "dll.config";

/// Builder for [`Settings`].
///
/// By default everything is derived from the running process: the
/// executable path comes from the OS, the settings file sits next to it as
/// `<name>.dll.config`, and `${...}` references fall back to the process
/// environment. Each of these can be overridden.
///
/// ## Example
///
/// ```no_run
/// use app_settings::Settings;
///
/// let settings = Settings::builder()
///     .with_program_exe("/opt/billing/billing")
///     .with_env_vars([("STAGE", "test")])
///     .build()?;
///
/// // Reads /opt/billing/billing.dll.config
/// let db = settings.get_setting("database")?;
/// # Ok::<(), app_settings::SettingsError>(())
/// ```
#[derive(Debug, Default)]
#[must_use = "builders do nothing until .build() is called"]
pub struct SettingsBuilder {
    program_exe: Option<PathBuf>,
    config_file: Option<PathBuf>,
    env: EnvSource,
}

impl SettingsBuilder {
    /// Uses `path` instead of the running executable's path.
    pub fn with_program_exe(mut self, path: impl AsRef<Path>) -> Self {
        self.program_exe = Some(path.as_ref().to_path_buf());
        self
    }

    /// Reads `path` as the primary settings file instead of the one derived
    /// from the executable path.
    pub fn with_config_file(mut self, path: impl AsRef<Path>) -> Self {
        self.config_file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Resolves references against these variables instead of the process
    /// environment.
    pub fn with_env_vars<K, V>(self, vars: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.with_env_source(EnvSource::fixed(vars))
    }

    pub fn with_env_source(mut self, env: EnvSource) -> Self {
        self.env = env;
        self
    }

    /// Derives the program paths and loads the settings file with its includes.
    pub fn build(self) -> Result<Settings, SettingsError> {
        let program_exe = match self.program_exe {
            Some(path) => path,
            None => std::env::current_exe()
                .map_err(|source| SettingsError::ProcessPathUnavailable { source })?,
        };
        let program_directory = parent_directory(&program_exe)?.to_path_buf();

        let config_file = self
            .config_file
            .unwrap_or_else(|| config_path_for(&program_exe));

        let mut loader = SettingsLoader::new();
        loader.load(&config_file, ROOT_SELECTOR)?;
        let (config_filenames, map) = loader.finish();

        debug!(
            files = config_filenames.len(),
            settings = map.len(),
            "settings loaded"
        );

        Ok(Settings {
            program_exe,
            program_directory,
            config_filenames,
            map,
            env: self.env,
        })
    }
}

/// Path of the settings file belonging to the executable at `program_exe`.
pub fn config_path_for(program_exe: &Path) -> PathBuf {
    program_exe.with_extension(CONFIG_EXTENSION)
}
