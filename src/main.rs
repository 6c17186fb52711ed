//! xray-traces binary.
//!
//! Parses arguments, loads settings and dispatches to a command module.

use anyhow::Context;
use clap::Parser;
use xray_traces::cli::commands::traces::AwsOverrides;
use xray_traces::cli::{Cli, Commands, commands};
use xray_traces::{ExitCode, Settings};

fn load_settings(cli: &Cli) -> anyhow::Result<Settings> {
    match &cli.config {
        Some(path) => Settings::load_from(path, &cli.config_env).with_context(|| {
            format!("failed to load configuration from {}", path.display())
        }),
        None => Settings::load(&cli.config_env).context("failed to load configuration"),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let settings = match load_settings(&cli) {
        Ok(settings) => settings,
        // An explicit --config file must load.
        Err(e) if cli.config.is_some() => {
            eprintln!("Configuration error: {e:#}");
            std::process::exit(i32::from(ExitCode::UsageError));
        }
        Err(e) => {
            eprintln!("Configuration error: {e:#}");
            eprintln!("Using default configuration for now.");
            Settings::default()
        }
    };

    xray_traces::logging::init_with_config(&settings.logging);

    if cli.info {
        match &cli.config {
            Some(path) => eprintln!("Loaded configuration from {}", path.display()),
            None => eprintln!("Loaded workspace configuration"),
        }
        eprintln!("Config environment: {}", cli.config_env);
    }

    let code = match cli.command {
        Commands::Init { force } => commands::init::run_init(force),
        Commands::Config => commands::init::run_config(&settings),
        Commands::Traces(args) => {
            let overrides = AwsOverrides {
                region: cli.region,
                profile: cli.profile,
            };
            commands::traces::run(args, &settings, overrides).await
        }
    };

    if code != ExitCode::Success {
        std::process::exit(i32::from(code));
    }
}
