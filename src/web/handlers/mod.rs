pub mod system;
pub mod reference;
pub mod simulation;
pub mod session;

use actix_web::HttpResponse;
use log::{warn, error};
use uuid::Uuid;

use crate::core::error::SimulationError;
use crate::web::models::ErrorResponse;

/// Failure of a request handler
#[derive(Debug)]
pub enum ApiError {
    /// Rejected input or reference data
    Simulation(SimulationError),
    SessionNotFound(Uuid),
    /// Blocking pool or export failure
    Internal(String),
}

impl From<SimulationError> for ApiError {
    fn from(err: SimulationError) -> Self {
        ApiError::Simulation(err)
    }
}

impl ApiError {
    pub fn to_response(&self) -> HttpResponse {
        match self {
            ApiError::Simulation(err) => {
                warn!("Rejected request: {}", err);
                HttpResponse::BadRequest().json(ErrorResponse {
                    success: false,
                    error: err.to_string(),
                    error_code: err.code().to_string(),
                })
            }
            ApiError::SessionNotFound(id) => HttpResponse::NotFound().json(ErrorResponse {
                success: false,
                error: format!("Session not found: {}", id),
                error_code: "SESSION_NOT_FOUND".to_string(),
            }),
            ApiError::Internal(msg) => {
                error!("Internal error: {}", msg);
                HttpResponse::InternalServerError().json(ErrorResponse {
                    success: false,
                    error: msg.clone(),
                    error_code: "INTERNAL_ERROR".to_string(),
                })
            }
        }
    }
}
