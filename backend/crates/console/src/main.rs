use clap::Parser;
use promeconfig_console::cli::{self, Cli};
use promeconfig_console::views::auth_form::error_message;
use promeconfig_console::{backend, logging, AppController, ConsoleConfig, ConsoleError, SessionStore};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{debug, error};

async fn run(cli: Cli) -> Result<(), ConsoleError> {
    let config = ConsoleConfig::load(cli.config.as_deref())?;
    logging::init_logging(&config.log_dir);
    debug!(backend = ?config.backend, session = ?config.session_path, "Console configuration loaded.");

    let session = Arc::new(SessionStore::open(&config.session_path).await?);
    let backend = backend::from_config(&config, session.clone())?;
    let controller = Arc::new(AppController::new(backend, session));
    controller.init().await;

    cli::execute(cli.command, controller, &config).await
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Command failed.");
            eprintln!("{}", error_message(&e));
            ExitCode::FAILURE
        }
    }
}
