//! Session domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The currently valid token pair for one user.
///
/// Logout stores empty strings in both token fields; that is the
/// "no active session" state. An empty string never decodes as a token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionRecord {
    pub user_id: Uuid,
    pub access_token: String,
    pub refresh_token: String,
    pub updated_at: DateTime<Utc>,
}

impl SessionRecord {
    pub fn is_active(&self) -> bool {
        !self.access_token.is_empty() && !self.refresh_token.is_empty()
    }
}
