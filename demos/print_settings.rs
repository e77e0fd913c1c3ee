use app_settings::{global, Settings};

// Usage: print_settings [CONFIG_FILE]
//
// Without an argument the settings file next to this executable is used.
fn main() -> Result<(), app_settings::SettingsError> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    if let Some(config) = std::env::args_os().nth(1) {
        let settings = Settings::builder().with_config_file(config).build()?;
        global::install(settings);
    }

    let settings = global::settings()?;
    println!("Program:   {}", settings.program_exe().display());
    println!("Directory: {}", settings.program_directory().display());
    for file in settings.config_filenames() {
        println!("Loaded:    {}", file.display());
    }

    for (name, _) in settings.settings().iter() {
        println!("{name} = {}", settings.get_setting(name)?);
    }

    Ok(())
}
