use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::{Outcome, SessionSnapshot};

/// Session state returned by every session endpoint
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse<E> {
    pub session_id: Uuid,
    /// applied | ignored | superseded | failed
    pub outcome: &'static str,
    /// Why an operation was ignored or failed
    pub reason: Option<String>,
    #[serde(flatten)]
    pub session: SessionSnapshot<E>,
}

impl<E> SessionResponse<E> {
    pub fn new(session_id: Uuid, outcome: &Outcome, session: SessionSnapshot<E>) -> Self {
        let reason = match outcome {
            Outcome::Ignored(rejection) => Some(rejection.to_string()),
            Outcome::Failed(message) => Some(message.clone()),
            Outcome::Applied | Outcome::Superseded => None,
        };

        Self {
            session_id,
            outcome: outcome.label(),
            reason,
            session,
        }
    }
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}
