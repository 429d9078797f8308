//! REST API Models
//!
//! Request and response bodies for the session endpoints, annotated with
//! `utoipa` so they show up in the generated OpenAPI document.

use chrono::{DateTime, Utc};
use classroom_core::{
    analytics::ConversationInsights, evaluation::Evaluation, persona::SpeakerId,
    turn::{TranscriptEntry, TurnKind},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, Copy, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// Created, or the class is playing.
    Active,
    /// The class finished or was ended early.
    Ended,
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone)]
pub struct Session {
    #[schema(value_type = String, format = Uuid)]
    pub id: Uuid,
    pub topic: String,
    #[schema(example = "Biology")]
    pub subject: String,
    #[schema(value_type = String, example = "active")]
    pub status: SessionStatus,
    /// Whether a classroom is attached (a client has connected and started it).
    pub started: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Deserialize, ToSchema)]
pub struct CreateSessionPayload {
    #[schema(example = "Photosynthesis")]
    pub topic: String,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateSessionStatusPayload {
    #[schema(example = "ended")]
    pub status: SessionStatus,
}

#[derive(Serialize, ToSchema)]
pub struct ErrorResponse {
    pub message: String,
}

/// One completed turn of the class.
#[derive(Serialize, ToSchema, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptLine {
    #[schema(value_type = String, format = Uuid)]
    pub id: Uuid,
    pub sequence: usize,
    #[schema(value_type = String, example = "teacher")]
    pub speaker_id: SpeakerId,
    pub speaker_name: String,
    pub text: String,
    #[schema(value_type = String, example = "teaching")]
    pub kind: TurnKind,
    pub created_at: DateTime<Utc>,
}

impl From<&TranscriptEntry> for TranscriptLine {
    fn from(entry: &TranscriptEntry) -> Self {
        Self {
            id: entry.id,
            sequence: entry.sequence,
            speaker_id: entry.turn.speaker_id.clone(),
            speaker_name: entry.turn.speaker_name.clone(),
            text: entry.turn.text.clone(),
            kind: entry.turn.kind,
            created_at: entry.turn.created_at,
        }
    }
}

/// End-of-class scores plus conversation insights.
#[derive(Serialize, ToSchema, Debug, Clone)]
pub struct EvaluationReport {
    #[schema(value_type = Object)]
    pub evaluation: Evaluation,
    #[schema(value_type = Object)]
    pub insights: ConversationInsights,
}

#[cfg(test)]
mod tests {
    use super::*;
    use classroom_core::turn::Turn;

    #[test]
    fn test_session_status_uses_lowercase_names() {
        assert_eq!(serde_json::to_string(&SessionStatus::Active).unwrap(), "\"active\"");
        assert_eq!(serde_json::to_string(&SessionStatus::Ended).unwrap(), "\"ended\"");

        let ended: SessionStatus = serde_json::from_str("\"ended\"").unwrap();
        assert_eq!(ended, SessionStatus::Ended);
        assert!(serde_json::from_str::<SessionStatus>("\"Ended\"").is_err());
    }

    #[test]
    fn test_create_session_payload_requires_topic() {
        let payload: CreateSessionPayload =
            serde_json::from_str(r#"{"topic": "Photosynthesis"}"#).unwrap();
        assert_eq!(payload.topic, "Photosynthesis");

        let missing: Result<CreateSessionPayload, _> = serde_json::from_str("{}");
        assert!(missing.is_err());
    }

    #[test]
    fn test_update_status_payload() {
        let payload: UpdateSessionStatusPayload =
            serde_json::from_str(r#"{"status": "ended"}"#).unwrap();
        assert_eq!(payload.status, SessionStatus::Ended);
    }

    #[test]
    fn test_error_response_serialization() {
        let error = ErrorResponse {
            message: "Please enter a topic to begin.".to_string(),
        };
        let json = serde_json::to_string(&error).unwrap();
        assert_eq!(json, r#"{"message":"Please enter a topic to begin."}"#);
    }

    #[test]
    fn test_transcript_line_from_entry() {
        let entry = TranscriptEntry {
            id: Uuid::new_v4(),
            sequence: 3,
            turn: Turn::new(SpeakerId::new("ali"), "Ali", "Is that like a battery?", TurnKind::Question),
        };
        let line = TranscriptLine::from(&entry);
        assert_eq!(line.sequence, 3);
        assert_eq!(line.speaker_name, "Ali");

        let json = serde_json::to_value(&line).unwrap();
        assert_eq!(json["speakerId"], "ali");
        assert_eq!(json["kind"], "question");
    }
}
