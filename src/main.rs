// src/main.rs
mod api;
mod catalog;
mod config;
mod logging;
mod model;
mod order_sheet;
mod packer;

use std::process::ExitCode;

use catalog::Catalog;
use config::{AppConfig, LogConfig};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> ExitCode {
    let dotenv_result = dotenvy::dotenv();

    logging::init(&LogConfig::from_env());

    if let Err(err) = dotenv_result {
        if !matches!(err, dotenvy::Error::Io(ref io_err) if io_err.kind() == std::io::ErrorKind::NotFound)
        {
            warn!("⚠️ Could not load .env: {}", err);
        }
    }

    let app_config = AppConfig::from_env();

    let catalog = match Catalog::from_config(&app_config.catalog) {
        Ok(catalog) => catalog,
        Err(err) => {
            error!("❌ Could not load catalog: {}", err);
            return ExitCode::FAILURE;
        }
    };

    info!("🚀 Order packing service starting...");
    match api::start_api_server(app_config.api, catalog).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("❌ API server terminated with an error: {}", err);
            ExitCode::FAILURE
        }
    }
}
