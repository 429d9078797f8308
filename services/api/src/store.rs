//! In-memory session store.
//!
//! Sessions live for the lifetime of the process. Each one is created over
//! REST and gets its `Classroom` attached when a client connects over the
//! WebSocket and starts the class.

use crate::models::{EvaluationReport, Session, SessionStatus};
use chrono::Utc;
use classroom_core::classroom::Classroom;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::OnceCell;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("Session with id '{0}' not found")]
    NotFound(Uuid),
    #[error("Session '{0}' has already ended")]
    Ended(Uuid),
    #[error("Session '{0}' is already running on another connection")]
    AlreadyAttached(Uuid),
}

struct SessionRecord {
    session: Session,
    classroom: Option<Arc<Classroom>>,
    report: Arc<OnceCell<EvaluationReport>>,
}

impl SessionRecord {
    fn view(&self) -> Session {
        let mut session = self.session.clone();
        session.started = self.classroom.is_some();
        if self.classroom.as_ref().is_some_and(|c| c.is_finished()) {
            session.status = SessionStatus::Ended;
        }
        session
    }
}

#[derive(Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<Uuid, SessionRecord>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self, topic: &str, subject: &str) -> Session {
        let now = Utc::now();
        let session = Session {
            id: Uuid::new_v4(),
            topic: topic.to_string(),
            subject: subject.to_string(),
            status: SessionStatus::Active,
            started: false,
            created_at: now,
            updated_at: now,
        };
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                session.id,
                SessionRecord {
                    session: session.clone(),
                    classroom: None,
                    report: Arc::new(OnceCell::new()),
                },
            );
        info!(session_id = %session.id, topic, subject, "Session created");
        session
    }

    /// All sessions, newest first.
    pub fn list(&self) -> Vec<Session> {
        let sessions = self.sessions.read().unwrap_or_else(PoisonError::into_inner);
        let mut list: Vec<Session> = sessions.values().map(SessionRecord::view).collect();
        list.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        list
    }

    pub fn get(&self, id: Uuid) -> Option<Session> {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .map(SessionRecord::view)
    }

    pub fn classroom(&self, id: Uuid) -> Option<Arc<Classroom>> {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .and_then(|r| r.classroom.clone())
    }

    /// The cached evaluation for a session, computed at most once.
    pub fn report_cell(&self, id: Uuid) -> Option<Arc<OnceCell<EvaluationReport>>> {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .map(|r| r.report.clone())
    }

    /// Binds a freshly built classroom to the session. A session runs at most
    /// one class.
    pub fn attach(&self, id: Uuid, classroom: Arc<Classroom>) -> Result<Session, StoreError> {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        let record = sessions.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        if record.session.status == SessionStatus::Ended {
            return Err(StoreError::Ended(id));
        }
        if record.classroom.is_some() {
            return Err(StoreError::AlreadyAttached(id));
        }
        record.classroom = Some(classroom);
        record.session.updated_at = Utc::now();
        Ok(record.view())
    }

    /// Updates the stored status. Moving to `Ended` ends a running class early.
    pub fn set_status(&self, id: Uuid, status: SessionStatus) -> Result<Session, StoreError> {
        let classroom = {
            let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
            let record = sessions.get_mut(&id).ok_or(StoreError::NotFound(id))?;
            if record.session.status == SessionStatus::Ended && status == SessionStatus::Active {
                return Err(StoreError::Ended(id));
            }
            record.session.status = status;
            record.session.updated_at = Utc::now();
            record.classroom.clone()
        };
        if status == SessionStatus::Ended {
            if let Some(classroom) = classroom {
                classroom.end_class();
            }
        }
        self.get(id).ok_or(StoreError::NotFound(id))
    }
}
