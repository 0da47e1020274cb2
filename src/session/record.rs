use super::types::{Session, SessionKey, Turn};
use crate::error::{StoreError, StoreResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Current on-disk record layout. Bump when a field changes meaning.
pub const RECORD_SCHEMA_VERSION: u32 = 1;

/// Self-describing wire form of a [`Session`] in the durable backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    #[serde(default = "legacy_schema_version")]
    pub schema_version: u32,
    #[serde(rename = "conversationID")]
    pub conversation_id: i64,
    #[serde(rename = "participantID")]
    pub participant_id: i64,
    pub is_active: bool,
    #[serde(default)]
    pub history: Vec<Turn>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn legacy_schema_version() -> u32 {
    1
}

impl SessionRecord {
    pub fn from_session(session: &Session) -> Self {
        Self {
            schema_version: RECORD_SCHEMA_VERSION,
            conversation_id: session.key.conversation_id,
            participant_id: session.key.participant_id,
            is_active: session.is_active(),
            history: session.history().to_vec(),
            created_at: session.created_at,
            updated_at: session.updated_at,
        }
    }

    pub fn key(&self) -> SessionKey {
        SessionKey::new(self.conversation_id, self.participant_id)
    }

    pub fn into_session(self, revision: u64) -> StoreResult<Session> {
        if self.schema_version > RECORD_SCHEMA_VERSION {
            return Err(StoreError::Schema(format!(
                "record schema version {} is newer than supported {RECORD_SCHEMA_VERSION}",
                self.schema_version
            )));
        }
        Ok(Session::from_parts(
            self.key(),
            self.is_active,
            self.history,
            self.created_at,
            self.updated_at,
            revision,
        ))
    }

    pub fn encode(&self) -> StoreResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn decode(payload: &str) -> StoreResult<Self> {
        Ok(serde_json::from_str(payload)?)
    }
}
