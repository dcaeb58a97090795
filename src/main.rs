use std::process::ExitCode;

use clap::Parser;
use mimalloc::MiMalloc;
use tracing::{error, info};

use pg_dropbox_backup::build_info::{BUILD_TIME, PROJECT_NAME, PROJECT_VERSION};
use pg_dropbox_backup::cli::Cli;
use pg_dropbox_backup::config::config::Config;
use pg_dropbox_backup::setup_logger::setup_logger;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // .env is optional
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let config = match Config::from_cli(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let (_log_guard, _stdout_guard) = match setup_logger(&config.log_dir, config.verbose).await {
        Ok(guards) => guards,
        Err(e) => {
            eprintln!("Error: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    info!(
        name = PROJECT_NAME,
        version = PROJECT_VERSION,
        built = BUILD_TIME,
        "Starting"
    );

    match pg_dropbox_backup::app::run(&config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %format!("{e:#}"), "Run failed");
            ExitCode::FAILURE
        }
    }
}
