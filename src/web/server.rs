use std::num::NonZeroUsize;
use std::sync::Arc;
use tokio::sync::Mutex;
use actix_web::{web, App, HttpServer, middleware};
use dashmap::DashMap;
use lru::LruCache;
use log::info;
use uuid::Uuid;

use crate::core::config::ServerConfig;
use crate::core::error::SimulationError;
use crate::core::metrics::MetricsManager;
use crate::core::session::Session;
use crate::engine::grid_search::GridSearchReport;
use crate::model::reference::{ReferenceData, ReferenceSource};
use crate::web::handlers;

/// Shared application state for web handlers
pub struct AppState {
    /// Read-only pathway, catalog, rules and sensitivity profile
    pub reference: Arc<ReferenceData>,
    /// Interactive sessions by id
    pub sessions: DashMap<Uuid, Session>,
    /// Ranked grids keyed by space and parameters
    pub grid_cache: Mutex<LruCache<String, Arc<GridSearchReport>>>,
    pub metrics: MetricsManager,
    pub config: ServerConfig,
}

impl AppState {
    /// Load reference data from `source` and build empty state around it
    pub fn new(source: &dyn ReferenceSource, config: ServerConfig) -> Result<Self, SimulationError> {
        info!("Loading reference data ({})", source.describe());
        let reference = Arc::new(source.load()?);
        let capacity = NonZeroUsize::new(config.grid_cache_capacity).unwrap_or(NonZeroUsize::MIN);

        Ok(Self {
            reference,
            sessions: DashMap::new(),
            grid_cache: Mutex::new(LruCache::new(capacity)),
            metrics: MetricsManager::new(),
            config,
        })
    }
}

/// Register the `/api` routes
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            // System APIs
            .route("/health", web::get().to(handlers::system::health))
            .route("/stats", web::get().to(handlers::system::stats))

            // Reference data APIs
            .route("/pathway", web::get().to(handlers::reference::get_pathway))
            .route("/modules", web::get().to(handlers::reference::get_modules))

            // Simulation APIs
            .route("/simulate", web::post().to(handlers::simulation::simulate))
            .route("/grid_search", web::post().to(handlers::simulation::grid_search))
            .route("/grid_search/csv", web::post().to(handlers::simulation::grid_search_csv))

            // Session APIs
            .route("/sessions", web::post().to(handlers::session::create_session))
            .route("/sessions/{id}", web::get().to(handlers::session::get_session))
            .route("/sessions/{id}", web::delete().to(handlers::session::delete_session))
            .route("/sessions/{id}/module", web::post().to(handlers::session::set_module))
            .route("/sessions/{id}/level", web::post().to(handlers::session::set_level))
            .route("/sessions/{id}/cycle", web::post().to(handlers::session::cycle_module))
            .route("/sessions/{id}/reset", web::post().to(handlers::session::reset_all))
            .route("/sessions/{id}/params", web::post().to(handlers::session::set_params))
    );
}

/// Start the HTTP server
pub async fn start_web_server(state: web::Data<AppState>) -> std::io::Result<()> {
    let bind = (state.config.bind_address.clone(), state.config.port);
    info!("Starting web server on http://{}:{}", bind.0, bind.1);

    HttpServer::new(move || {
        App::new()
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(configure_routes)
    })
    .bind(bind)?
    .run()
    .await
}

#[cfg(test)]
pub(crate) fn test_state() -> web::Data<AppState> {
    use crate::model::reference::ReferenceFiles;

    let state = AppState::new(&ReferenceFiles::default(), ServerConfig::default())
        .expect("bundled reference data loads");
    web::Data::new(state)
}
