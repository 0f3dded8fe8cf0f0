use log::{info, error};

mod core;
mod engine;
mod model;
mod web;

use crate::core::config::ServerConfig;
use crate::model::reference::ReferenceFiles;
use crate::web::server::{start_web_server, AppState};

/// Reference files named by the config; unset paths use the bundled data
fn reference_files(config: &ServerConfig) -> ReferenceFiles {
    ReferenceFiles {
        pathway: config.pathway_path.clone(),
        modules: config.modules_path.clone(),
        rules: config.rules_path.clone(),
    }
}

#[tokio::main]
async fn main() {
    // Initialize logging
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));
    info!("Starting VioFlux...");

    let config = ServerConfig::from_env();
    let source = reference_files(&config);

    let state = match AppState::new(&source, config) {
        Ok(state) => actix_web::web::Data::new(state),
        Err(e) => {
            error!("Failed to load reference data: {}", e);
            std::process::exit(1);
        }
    };
    info!(
        "Reference pathway: {}",
        state.reference.pathway.genes().collect::<Vec<_>>().join(" -> ")
    );

    info!("VioFlux is now running. Press Ctrl+C to stop.");
    tokio::select! {
        result = start_web_server(state) => match result {
            Ok(()) => info!("Web server stopped"),
            Err(e) => error!("Web server failed: {}", e),
        },
        signal = tokio::signal::ctrl_c() => {
            if let Err(e) = signal {
                error!("Failed to listen for Ctrl+C: {}", e);
            }
            info!("Shutting down VioFlux...");
        }
    }

    info!("VioFlux shutdown complete");
}
