use std::sync::Arc;
use std::time::Instant;
use actix_web::{web, HttpResponse, Responder};
use log::{info, debug};

use crate::core::error::SimulationError;
use crate::engine::grid_search::{grid_search as run_grid_search, to_csv, GridSearchReport, GridSpace, REFERENCE_LEVELS};
use crate::engine::simulate as run_simulation;
use crate::model::assignment::{AssignmentMap, DEFAULT_LEVEL};
use crate::web::handlers::ApiError;
use crate::web::models::{GridSearchRequest, GridSearchResponse, SimulateRequest, SimulateResponse};
use crate::web::server::AppState;

/// Entries returned by `/grid_search` when no limit is given
const DEFAULT_GRID_LIMIT: usize = 20;

fn simulate_request(data: &AppState, request: &SimulateRequest) -> Result<SimulateResponse, SimulationError> {
    let reference = &data.reference;
    let genes = reference.pathway.len();
    let modules = request
        .modules
        .clone()
        .unwrap_or_else(|| vec![reference.catalog.neutral().name.clone(); genes]);
    let levels = request.levels.clone().unwrap_or_else(|| vec![DEFAULT_LEVEL; genes]);

    let assignments = AssignmentMap::from_parallel(&reference.pathway, &reference.catalog, &modules, &levels)?;
    let outcome = run_simulation(reference, &assignments, &request.params())?;
    Ok(outcome.into())
}

/// Simulate one configuration
pub async fn simulate(
    data: web::Data<AppState>,
    request: web::Json<SimulateRequest>,
) -> impl Responder {
    let started = Instant::now();
    let result = simulate_request(&data, &request);
    data.metrics.record("simulate", started.elapsed(), result.is_ok()).await;

    match result {
        Ok(response) => HttpResponse::Ok().json(response),
        Err(e) => ApiError::from(e).to_response(),
    }
}

fn grid_space(data: &AppState, request: &GridSearchRequest) -> Result<GridSpace, SimulationError> {
    let catalog = &data.reference.catalog;
    match (&request.modules, &request.levels) {
        (None, None) => GridSpace::reference(catalog),
        (None, Some(levels)) => {
            let reference = GridSpace::reference(catalog)?;
            GridSpace::new(catalog, reference.modules, levels.clone())
        }
        (Some(modules), levels) => GridSpace::new(
            catalog,
            modules.clone(),
            levels.clone().unwrap_or_else(|| REFERENCE_LEVELS.to_vec()),
        ),
    }
}

/// Ranked grid for a request, served from the cache when possible
async fn ranked_grid(data: &web::Data<AppState>, request: &GridSearchRequest) -> Result<Arc<GridSearchReport>, ApiError> {
    let space = grid_space(data, request)?;
    let params = request.params();
    params.validate()?;
    let max_configurations = data.config.max_configurations;

    let key = format!("{:?}|{:?}|{:?}|{}", space.modules, space.levels, params, max_configurations);
    let cached = data.grid_cache.lock().await.get(&key).cloned();
    if let Some(report) = cached {
        debug!("Grid search cache hit");
        return Ok(report);
    }

    let reference = data.reference.clone();
    let report = web::block(move || {
        run_grid_search(
            &reference.pathway,
            &reference.catalog,
            &reference.rules,
            &space,
            &params,
            max_configurations,
        )
    })
    .await
    .map_err(|e| ApiError::Internal(format!("grid search worker failed: {}", e)))??;

    info!(
        "Grid search ranked {} of {} configurations",
        report.results.len(), report.total_combinations
    );
    let report = Arc::new(report);
    data.grid_cache.lock().await.put(key, report.clone());
    Ok(report)
}

/// Top-ranked grid configurations
pub async fn grid_search(
    data: web::Data<AppState>,
    request: web::Json<GridSearchRequest>,
) -> impl Responder {
    let started = Instant::now();
    let result = ranked_grid(&data, &request).await;
    data.metrics.record("grid_search", started.elapsed(), result.is_ok()).await;

    match result {
        Ok(report) => {
            let limit = request.limit.unwrap_or(DEFAULT_GRID_LIMIT);
            HttpResponse::Ok().json(GridSearchResponse::from_report(&report, limit))
        }
        Err(e) => e.to_response(),
    }
}

/// Full ranked grid as a CSV download
pub async fn grid_search_csv(
    data: web::Data<AppState>,
    request: web::Json<GridSearchRequest>,
) -> impl Responder {
    let started = Instant::now();
    let result = match ranked_grid(&data, &request).await {
        Ok(report) => to_csv(&data.reference.pathway, &report.results).map_err(ApiError::from),
        Err(e) => Err(e),
    };
    data.metrics.record("grid_search_csv", started.elapsed(), result.is_ok()).await;

    match result {
        Ok(csv) => HttpResponse::Ok()
            .content_type("text/csv")
            .insert_header(("Content-Disposition", "attachment; filename=\"grid_search.csv\""))
            .body(csv),
        Err(e) => e.to_response(),
    }
}

#[cfg(test)]
mod tests {
    use actix_web::{http::StatusCode, test, App};
    use serde_json::{json, Value};

    use crate::web::server::{configure_routes, test_state};

    #[actix_web::test]
    async fn test_simulate_defaults() {
        let app = test::init_service(App::new().app_data(test_state()).configure(configure_routes)).await;
        let req = test::TestRequest::post().uri("/api/simulate").set_json(json!({})).to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["yield"], 1.0);
        assert_eq!(body["active_genes"], 0);
        assert_eq!(body["flux"]["bottleneck_gene"], "None");
        assert_eq!(body["sensitivities"][0], json!(["VioA", 0.75]));
        assert_eq!(body["imbalance_penalty"], 1.0);
        assert_eq!(body["notes"], json!([]));
    }

    #[actix_web::test]
    async fn test_simulate_collapse() {
        let app = test::init_service(App::new().app_data(test_state()).configure(configure_routes)).await;
        let req = test::TestRequest::post()
            .uri("/api/simulate")
            .set_json(json!({
                "modules": ["CRISPRa_Ec", "neutral", "CRISPRi_dCas9", "neutral", "neutral"],
                "levels": [1.0, 0.5, 0.9, 0.5, 0.5],
            }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["yield"], 0.05);
        assert_eq!(body["flux"]["bottleneck_gene"], "VioE");
        assert_eq!(body["active_genes"], 1);
        assert_eq!(body["notes"].as_array().unwrap().len(), 1);
    }

    #[actix_web::test]
    async fn test_simulate_rejects_bad_input() {
        let app = test::init_service(App::new().app_data(test_state()).configure(configure_routes)).await;

        let req = test::TestRequest::post()
            .uri("/api/simulate")
            .set_json(json!({ "modules": ["VPR", "neutral", "neutral", "neutral", "neutral"] }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error_code"], "UNKNOWN_MODULE");

        let req = test::TestRequest::post()
            .uri("/api/simulate")
            .set_json(json!({ "levels": [0.5, 0.5] }))
            .to_request();
        let body: Value = test::read_body_json(test::call_service(&app, req).await).await;
        assert_eq!(body["error_code"], "INVALID_ASSIGNMENT");

        let req = test::TestRequest::post()
            .uri("/api/simulate")
            .set_json(json!({ "supply_cap": -1.0 }))
            .to_request();
        let body: Value = test::read_body_json(test::call_service(&app, req).await).await;
        assert_eq!(body["error_code"], "INVALID_CONFIGURATION");
    }

    #[actix_web::test]
    async fn test_grid_search_reference() {
        let state = test_state();
        let app = test::init_service(App::new().app_data(state.clone()).configure(configure_routes)).await;
        let req = test::TestRequest::post().uri("/api/grid_search").set_json(json!({})).to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["total_combinations"], 243);
        assert_eq!(body["evaluated"], 243);
        let results = body["results"].as_array().unwrap();
        assert_eq!(results.len(), 20);
        assert_eq!(results[0]["Yield"], 5.0);
        assert_eq!(results[0]["Bottleneck"], "None");

        // identical request is served from the cache
        let req = test::TestRequest::post().uri("/api/grid_search").set_json(json!({ "limit": 3 })).to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["results"].as_array().unwrap().len(), 3);
        assert_eq!(state.grid_cache.lock().await.len(), 1);
    }

    #[actix_web::test]
    async fn test_grid_search_custom_space_and_errors() {
        let app = test::init_service(App::new().app_data(test_state()).configure(configure_routes)).await;
        let req = test::TestRequest::post()
            .uri("/api/grid_search")
            .set_json(json!({ "modules": ["CRISPRi_dCas9", "neutral"], "levels": [0.9], "limit": 100 }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["total_combinations"], 32);
        assert_eq!(body["results"].as_array().unwrap().len(), 32);

        let req = test::TestRequest::post()
            .uri("/api/grid_search")
            .set_json(json!({ "modules": ["VPR"] }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_grid_search_csv() {
        let app = test::init_service(App::new().app_data(test_state()).configure(configure_routes)).await;
        let req = test::TestRequest::post().uri("/api/grid_search/csv").set_json(json!({})).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers().get("content-type").unwrap(), "text/csv");

        let body = test::read_body(resp).await;
        let text = std::str::from_utf8(&body).unwrap();
        assert_eq!(text.lines().count(), 244);
        assert!(text.starts_with("rank,config,yield,bottleneck"));
    }
}
