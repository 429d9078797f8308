//! HTTP surface: session routes, the classroom WebSocket and Swagger UI.

use crate::{
    handlers,
    models::{
        CreateSessionPayload, ErrorResponse, EvaluationReport, Session, SessionStatus,
        TranscriptLine, UpdateSessionStatusPayload,
    },
    state::AppState,
    ws::ws_handler,
};

use axum::{
    Router,
    routing::{get, patch},
};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::create_session,
        handlers::list_sessions,
        handlers::get_session,
        handlers::get_transcript,
        handlers::update_session_status,
        handlers::get_evaluation,
    ),
    components(
        schemas(Session, SessionStatus, CreateSessionPayload, UpdateSessionStatusPayload, TranscriptLine, EvaluationReport, ErrorResponse)
    ),
    tags(
        (name = "Classroom API", description = "Session management for the simulated classroom")
    )
)]
pub struct ApiDoc;

pub fn create_router(app_state: Arc<AppState>) -> Router {
    let api_router = Router::new()
        .route(
            "/sessions",
            get(handlers::list_sessions).post(handlers::create_session),
        )
        .route("/sessions/{id}", get(handlers::get_session))
        .route("/sessions/{id}/transcript", get(handlers::get_transcript))
        .route(
            "/sessions/{id}/status",
            patch(handlers::update_session_status),
        )
        .route("/sessions/{id}/evaluation", get(handlers::get_evaluation))
        .route("/ws", get(ws_handler))
        .with_state(app_state);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(api_router)
}
