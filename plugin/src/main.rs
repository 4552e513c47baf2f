//! cdsdeploy - Entry Point
//!
//! Runs one deployment plugin from the command line, or serves every
//! registered plugin over a local HTTP host.

use std::collections::HashMap;
use std::env;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use cdsdeploy::app::options::AppOptions;
use cdsdeploy::app::run::{run, run_plugin};
use cdsdeploy::app::settings::Settings;
use cdsdeploy::deploy::PluginRegistry;
use cdsdeploy::filesys::file::File;
use cdsdeploy::job::sink::ConsoleSink;
use cdsdeploy::logs::init_logging;
use cdsdeploy::utils::{parse_cli_args, version_info};

use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    let cli_args = parse_cli_args(env::args().skip(1));

    // Print version and exit
    if cli_args.contains_key("version") {
        match serde_json::to_string_pretty(&version_info()) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("Unable to print version: {e}"),
        }
        return ExitCode::SUCCESS;
    }

    // Retrieve the settings file
    let settings = match cli_args.get("settings") {
        Some(path) => match File::new(path).read_json::<Settings>().await {
            Ok(settings) => settings,
            Err(e) => {
                eprintln!("Unable to read settings file: {e}");
                return ExitCode::FAILURE;
            }
        },
        None => Settings::default(),
    };

    // Initialize logging, the guard flushes the log file on exit
    let _log_guard = match init_logging(settings.log_options()) {
        Ok(guard) => guard,
        Err(e) => {
            println!("Failed to initialize logging: {e}");
            None
        }
    };

    let options = AppOptions::from(&settings);

    if let Some(plugin) = cli_args.get("run") {
        return run_once(plugin, cli_args.get("options"), options.http_timeout).await;
    }

    if cli_args.contains_key("serve") {
        info!("Running plugin host with options: {:?}", options);
        if let Err(e) = run(options, await_shutdown_signal()).await {
            error!("Failed to run the plugin host: {e}");
            return ExitCode::FAILURE;
        }
        return ExitCode::SUCCESS;
    }

    eprintln!("Usage: cdsdeploy --run=<plugin> --options=<file.json> | --serve [--settings=<file.json>] | --version");
    ExitCode::FAILURE
}

/// Run a single plugin and print its result
async fn run_once(plugin: &str, options_file: Option<&String>, http_timeout: Duration) -> ExitCode {
    let plugin_options = match options_file {
        Some(path) => match File::new(path).read_json::<HashMap<String, String>>().await {
            Ok(options) => options,
            Err(e) => {
                eprintln!("Unable to read options file: {e}");
                return ExitCode::FAILURE;
            }
        },
        None => HashMap::new(),
    };

    let registry = match PluginRegistry::with_defaults(http_timeout) {
        Ok(registry) => registry,
        Err(e) => {
            error!("Unable to register plugins: {e}");
            return ExitCode::FAILURE;
        }
    };

    let result = match run_plugin(&registry, plugin, plugin_options, Arc::new(ConsoleSink)).await {
        Ok(result) => result,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    match serde_json::to_string_pretty(&result) {
        Ok(json) => println!("{}", json),
        Err(e) => error!("Unable to print run result: {e}"),
    }

    if result.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

async fn await_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let (mut sigterm, mut sigint) =
            match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
                (Ok(term), Ok(int)) => (term, int),
                _ => {
                    error!("Unable to install signal handlers, falling back to Ctrl+C");
                    let _ = tokio::signal::ctrl_c().await;
                    return;
                }
            };

        tokio::select! {
            _ = sigterm.recv() => {
                info!("SIGTERM received, shutting down...");
            }
            _ = sigint.recv() => {
                info!("SIGINT received, shutting down...");
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Ctrl+C received, shutting down...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {e}");
        }
        info!("Ctrl+C received, shutting down...");
    }
}
