use actix_web::{web, HttpResponse, Responder};

use crate::web::server::AppState;
use crate::web::models::{ModulesResponse, PathwayResponse};

/// Pathway genes and per-step parameters in pathway order
pub async fn get_pathway(data: web::Data<AppState>) -> impl Responder {
    let reference = &data.reference;
    let steps = reference.pathway.steps();

    HttpResponse::Ok().json(PathwayResponse {
        genes: reference.pathway.genes().map(str::to_string).collect(),
        pathway_data: steps.to_vec(),
        baseline_k: steps.iter().map(|s| s.baseline_k).collect(),
        burden_w: steps.iter().map(|s| s.burden_w).collect(),
        sensitivity: reference.sensitivity.scores().to_vec(),
    })
}

/// Module catalog in catalog order
pub async fn get_modules(data: web::Data<AppState>) -> impl Responder {
    let catalog = &data.reference.catalog;

    HttpResponse::Ok().json(ModulesResponse {
        modules: catalog.modules().to_vec(),
        module_names: catalog.names().map(str::to_string).collect(),
        neutral: catalog.neutral().name.clone(),
    })
}
