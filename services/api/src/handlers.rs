//! REST handlers for class sessions: creation, lookup, transcript, status
//! changes and the post-class evaluation. Each carries a `utoipa::path`
//! annotation picked up by [`crate::router::ApiDoc`].

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use classroom_core::{analytics, subject::resolve_subject};
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

use crate::{
    models::{
        CreateSessionPayload, ErrorResponse, EvaluationReport, Session, TranscriptLine,
        UpdateSessionStatusPayload,
    },
    state::AppState,
    store::StoreError,
};

pub const EMPTY_TOPIC_MESSAGE: &str = "Please enter a topic to begin.";

/// Handler failure, rendered as an [`ErrorResponse`] body.
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    InternalServerError(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, Json(ErrorResponse { message })).into_response()
            }
            ApiError::NotFound(message) => {
                (StatusCode::NOT_FOUND, Json(ErrorResponse { message })).into_response()
            }
            ApiError::InternalServerError(err) => {
                error!(error = ?err, "Request failed");
                let message = "An internal server error occurred.".to_string();
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse { message }),
                )
                    .into_response()
            }
        }
    }
}

impl<E> From<E> for ApiError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self::InternalServerError(err.into())
    }
}

fn store_error(err: StoreError) -> ApiError {
    match err {
        StoreError::NotFound(_) => ApiError::NotFound(err.to_string()),
        StoreError::Ended(_) | StoreError::AlreadyAttached(_) => ApiError::BadRequest(err.to_string()),
    }
}

fn not_found(id: Uuid) -> ApiError {
    store_error(StoreError::NotFound(id))
}

/// Create a new class session for a topic.
#[utoipa::path(
    post,
    path = "/sessions",
    request_body = CreateSessionPayload,
    responses(
        (status = 201, description = "Session created successfully", body = Session),
        (status = 400, description = "Blank topic", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn create_session(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateSessionPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let topic = payload.topic.trim();
    if topic.is_empty() {
        return Err(ApiError::BadRequest(EMPTY_TOPIC_MESSAGE.to_string()));
    }
    let subject = resolve_subject(state.content.as_ref(), topic).await;
    let session = state.store.create(topic, &subject);
    Ok((StatusCode::CREATED, Json(session)))
}

/// List all sessions, newest first.
#[utoipa::path(
    get,
    path = "/sessions",
    responses(
        (status = 200, description = "List of sessions", body = [Session])
    )
)]
pub async fn list_sessions(State(state): State<Arc<AppState>>) -> Json<Vec<Session>> {
    Json(state.store.list())
}

/// Get a specific session by its ID.
#[utoipa::path(
    get,
    path = "/sessions/{id}",
    responses(
        (status = 200, description = "Session details", body = Session),
        (status = 404, description = "Session not found", body = ErrorResponse)
    ),
    params(
        ("id" = Uuid, Path, description = "Session ID")
    )
)]
pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Session>, ApiError> {
    state.store.get(id).map(Json).ok_or_else(|| not_found(id))
}

/// Get the transcript of a session so far.
#[utoipa::path(
    get,
    path = "/sessions/{id}/transcript",
    responses(
        (status = 200, description = "Completed turns in order", body = [TranscriptLine]),
        (status = 404, description = "Session not found", body = ErrorResponse)
    ),
    params(
        ("id" = Uuid, Path, description = "Session ID")
    )
)]
pub async fn get_transcript(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<TranscriptLine>>, ApiError> {
    state.store.get(id).ok_or_else(|| not_found(id))?;
    let lines = state
        .store
        .classroom(id)
        .map(|classroom| {
            classroom
                .transcript()
                .iter()
                .map(|entry| TranscriptLine::from(entry.as_ref()))
                .collect()
        })
        .unwrap_or_default();
    Ok(Json(lines))
}

/// Update the status of a session. Setting `ended` ends a running class early.
#[utoipa::path(
    patch,
    path = "/sessions/{id}/status",
    request_body = UpdateSessionStatusPayload,
    responses(
        (status = 200, description = "Session status updated successfully", body = Session),
        (status = 400, description = "Session already ended", body = ErrorResponse),
        (status = 404, description = "Session not found", body = ErrorResponse)
    ),
    params(
        ("id" = Uuid, Path, description = "Session ID")
    )
)]
pub async fn update_session_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateSessionStatusPayload>,
) -> Result<Json<Session>, ApiError> {
    let session = state
        .store
        .set_status(id, payload.status)
        .map_err(store_error)?;
    info!(session_id = %id, status = ?payload.status, "Session status updated");
    Ok(Json(session))
}

/// Score the finished class and summarise the conversation.
#[utoipa::path(
    get,
    path = "/sessions/{id}/evaluation",
    responses(
        (status = 200, description = "Evaluation and conversation insights", body = EvaluationReport),
        (status = 400, description = "The class has not finished", body = ErrorResponse),
        (status = 404, description = "Session not found", body = ErrorResponse)
    ),
    params(
        ("id" = Uuid, Path, description = "Session ID")
    )
)]
pub async fn get_evaluation(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<EvaluationReport>, ApiError> {
    state.store.get(id).ok_or_else(|| not_found(id))?;
    let classroom = state
        .store
        .classroom(id)
        .ok_or_else(|| ApiError::BadRequest("The class has not started yet.".to_string()))?;
    if !classroom.is_finished() {
        return Err(ApiError::BadRequest("The class is still in progress.".to_string()));
    }
    let cell = state.store.report_cell(id).ok_or_else(|| not_found(id))?;

    let report = cell
        .get_or_init(|| async {
            let transcript = classroom.transcript();
            let (evaluation, insights) = tokio::join!(classroom.evaluate(), async {
                match &state.analytics {
                    Some(service) => analytics::insights(service.as_ref(), &transcript).await,
                    None => Default::default(),
                }
            });
            info!(session_id = %id, entries = transcript.len(), "Class evaluated");
            EvaluationReport {
                evaluation,
                insights,
            }
        })
        .await;
    Ok(Json(report.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::{Config, Provider},
        models::SessionStatus,
        store::SessionStore,
    };
    use axum::body::to_bytes;
    use classroom_core::{
        classroom::Classroom,
        content::{LessonRequest, ScriptedContentProvider},
        persona::Roster,
        timing::Timings,
    };
    use std::path::PathBuf;

    fn app_state() -> Arc<AppState> {
        Arc::new(AppState {
            store: Arc::new(SessionStore::new()),
            content: Arc::new(ScriptedContentProvider),
            analytics: None,
            http: reqwest::Client::new(),
            config: Arc::new(Config {
                bind_address: "127.0.0.1:0".parse().unwrap(),
                provider: Provider::OpenAI,
                openai_api_key: Some("test".to_string()),
                gemini_api_key: None,
                chat_model: "gpt-4o".to_string(),
                log_level: tracing::Level::INFO,
                prompts_path: PathBuf::from("./prompts"),
                elevenlabs_api_key: None,
                text_analytics: None,
            }),
        })
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn create(state: &Arc<AppState>, topic: &str) -> Response {
        create_session(
            State(state.clone()),
            Json(CreateSessionPayload {
                topic: topic.to_string(),
            }),
        )
        .await
        .into_response()
    }

    #[tokio::test]
    async fn test_blank_topic_is_rejected_with_the_user_message() {
        let state = app_state();
        let response = create(&state, "   ").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["message"], EMPTY_TOPIC_MESSAGE);
        assert!(state.store.list().is_empty());
    }

    #[tokio::test]
    async fn test_create_resolves_the_subject() {
        let state = app_state();
        let response = create(&state, "  photosynthesis in plants ").await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = body_json(response).await;
        assert_eq!(body["topic"], "photosynthesis in plants");
        assert_eq!(body["subject"], "Biology");
        assert_eq!(body["status"], "active");
    }

    #[tokio::test]
    async fn test_unknown_session_is_not_found() {
        let state = app_state();
        let id = Uuid::new_v4();
        let response = get_session(State(state.clone()), Path(id)).await.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let response = get_transcript(State(state), Path(id)).await.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_evaluation_requires_a_finished_class() {
        let state = app_state();
        let session = state.store.create("photosynthesis", "Biology");
        let response = get_evaluation(State(state), Path(session.id)).await.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_class_then_transcript_and_evaluation() {
        let state = app_state();
        let session = state.store.create("photosynthesis", "Biology");
        let classroom = Arc::new(Classroom::new(
            LessonRequest::new(&session.topic, &session.subject),
            Roster::default(),
            state.content.clone(),
            Vec::new(),
            Timings::default(),
        ));
        state.store.attach(session.id, classroom.clone()).unwrap();
        classroom.start();
        classroom.wait_finished().await;

        let Json(lines) = get_transcript(State(state.clone()), Path(session.id)).await.ok().unwrap();
        assert_eq!(lines.len(), classroom.transcript().len());
        assert!(lines.windows(2).all(|w| w[0].sequence < w[1].sequence));

        let Json(report) = get_evaluation(State(state.clone()), Path(session.id)).await.ok().unwrap();
        assert_eq!(report.evaluation.students.len(), 4);
        assert!(report.insights.key_phrases.is_empty());

        let Json(fetched) = get_session(State(state), Path(session.id)).await.ok().unwrap();
        assert_eq!(fetched.status, SessionStatus::Ended);
    }

    #[tokio::test]
    async fn test_status_patch_ends_the_session() {
        let state = app_state();
        let session = state.store.create("photosynthesis", "Biology");
        let Json(updated) = update_session_status(
            State(state.clone()),
            Path(session.id),
            Json(UpdateSessionStatusPayload {
                status: SessionStatus::Ended,
            }),
        )
        .await
        .ok()
        .unwrap();
        assert_eq!(updated.status, SessionStatus::Ended);

        let response = update_session_status(
            State(state),
            Path(session.id),
            Json(UpdateSessionStatusPayload {
                status: SessionStatus::Active,
            }),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
