use std::time::Instant;
use actix_web::{web, HttpResponse, Responder};
use log::info;
use uuid::Uuid;

use crate::core::session::{Session, SessionCommand};
use crate::web::handlers::ApiError;
use crate::web::models::{
    CycleModuleRequest, GenericResponse, SessionResponse, SetLevelRequest, SetModuleRequest, SetParamsRequest,
};
use crate::web::server::AppState;

fn snapshot(data: &AppState, id: Uuid) -> Result<SessionResponse, ApiError> {
    let session = data.sessions.get(&id).ok_or(ApiError::SessionNotFound(id))?;
    Ok(session.snapshot()?.into())
}

/// Apply a command to a stored session and return its new state
async fn apply(data: web::Data<AppState>, id: Uuid, command: SessionCommand) -> HttpResponse {
    let started = Instant::now();
    let result = match data.sessions.get_mut(&id) {
        Some(mut session) => session
            .apply(command)
            .and_then(|outcome| session.snapshot_with(outcome))
            .map(SessionResponse::from)
            .map_err(ApiError::from),
        None => Err(ApiError::SessionNotFound(id)),
    };
    data.metrics.record("session_command", started.elapsed(), result.is_ok()).await;

    match result {
        Ok(response) => HttpResponse::Ok().json(response),
        Err(e) => e.to_response(),
    }
}

/// Start a session with every gene neutral
pub async fn create_session(data: web::Data<AppState>) -> impl Responder {
    let session = Session::new(data.reference.clone());
    let id = session.id();
    let response = session.snapshot().map(SessionResponse::from);
    data.sessions.insert(id, session);
    info!("Created session {}", id);

    match response {
        Ok(response) => HttpResponse::Created().json(response),
        Err(e) => ApiError::from(e).to_response(),
    }
}

pub async fn get_session(data: web::Data<AppState>, path: web::Path<Uuid>) -> impl Responder {
    match snapshot(&data, path.into_inner()) {
        Ok(response) => HttpResponse::Ok().json(response),
        Err(e) => e.to_response(),
    }
}

pub async fn delete_session(data: web::Data<AppState>, path: web::Path<Uuid>) -> impl Responder {
    let id = path.into_inner();
    match data.sessions.remove(&id) {
        Some(_) => {
            info!("Deleted session {}", id);
            HttpResponse::Ok().json(GenericResponse {
                success: true,
                message: format!("Session {} deleted", id),
                data: None,
            })
        }
        None => ApiError::SessionNotFound(id).to_response(),
    }
}

pub async fn set_module(
    data: web::Data<AppState>,
    path: web::Path<Uuid>,
    request: web::Json<SetModuleRequest>,
) -> impl Responder {
    let request = request.into_inner();
    apply(data, path.into_inner(), SessionCommand::SetModule {
        gene: request.gene,
        module: request.module,
    }).await
}

pub async fn set_level(
    data: web::Data<AppState>,
    path: web::Path<Uuid>,
    request: web::Json<SetLevelRequest>,
) -> impl Responder {
    let request = request.into_inner();
    apply(data, path.into_inner(), SessionCommand::SetLevel {
        gene: request.gene,
        level: request.level,
    }).await
}

pub async fn cycle_module(
    data: web::Data<AppState>,
    path: web::Path<Uuid>,
    request: web::Json<CycleModuleRequest>,
) -> impl Responder {
    apply(data, path.into_inner(), SessionCommand::CycleModule {
        gene: request.into_inner().gene,
    }).await
}

pub async fn reset_all(data: web::Data<AppState>, path: web::Path<Uuid>) -> impl Responder {
    apply(data, path.into_inner(), SessionCommand::ResetAll).await
}

pub async fn set_params(
    data: web::Data<AppState>,
    path: web::Path<Uuid>,
    request: web::Json<SetParamsRequest>,
) -> impl Responder {
    apply(data, path.into_inner(), SessionCommand::SetParams {
        params: request.params(),
    }).await
}
