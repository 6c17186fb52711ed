//! `init` and `config` commands.

use crate::config::Settings;
use crate::error::ExitCode;

/// Write a default `.xray-traces/settings.toml`; refuses to overwrite unless `force`.
pub fn run_init(force: bool) -> ExitCode {
    match Settings::init_config_file(force) {
        Ok(path) => {
            println!("Created configuration file at: {}", path.display());
            println!("Add [<env>.aws] tables and select them with --config-env.");
            ExitCode::Success
        }
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::GeneralError
        }
    }
}

/// Print the effective settings in the same layout `init` writes, so the
/// output can be saved as a settings file.
pub fn run_config(config: &Settings) -> ExitCode {
    match config.to_toml() {
        Ok(rendered) => {
            println!("# Effective configuration");
            print!("{rendered}");
            ExitCode::Success
        }
        Err(e) => {
            eprintln!("Error displaying config: {e}");
            ExitCode::GeneralError
        }
    }
}
