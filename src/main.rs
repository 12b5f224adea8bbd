//! voice-morph CLI entry point

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use voice_morph::cli::{
    app::{run_record, EXIT_ERROR, EXIT_USAGE_ERROR},
    args::{Cli, Commands, RecordArgs},
    config_cmd::handle_config_command,
    presenter::Presenter,
};
use voice_morph::domain::ConfigError;
use voice_morph::infrastructure::XdgConfigStore;

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("voice_morph=warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Config { action }) => {
            let presenter = Presenter::new();
            let store = XdgConfigStore::new();
            if let Err(e) = handle_config_command(action, &store, &presenter).await {
                presenter.error(&e.to_string());
                let code = match e {
                    ConfigError::ValidationError { .. } => EXIT_USAGE_ERROR,
                    _ => EXIT_ERROR,
                };
                return ExitCode::from(code);
            }
            ExitCode::SUCCESS
        }
        Some(Commands::Record(args)) => run_record(args).await,
        // Bare invocation records with configured defaults
        None => run_record(RecordArgs::default()).await,
    }
}
