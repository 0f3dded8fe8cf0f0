use actix_web::{web, HttpResponse, Responder};
use chrono::Utc;

use crate::web::server::AppState;
use crate::web::models::{HealthResponse, StatsResponse};

/// Liveness and reference data summary
pub async fn health(data: web::Data<AppState>) -> impl Responder {
    let reference = &data.reference;
    HttpResponse::Ok().json(HealthResponse {
        status: "ok".to_string(),
        service: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        genes: reference.pathway.len(),
        modules: reference.catalog.modules().len(),
        rules: reference.rules.len(),
        timestamp: Utc::now(),
    })
}

/// Operation counters, session and cache occupancy
pub async fn stats(data: web::Data<AppState>) -> impl Responder {
    let metrics = data.metrics.summary().await;
    let cached_grids = data.grid_cache.lock().await.len();

    HttpResponse::Ok().json(StatsResponse {
        success: true,
        metrics,
        active_sessions: data.sessions.len(),
        cached_grids,
    })
}
