use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Composite identity of a session: one participant inside one conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionKey {
    pub conversation_id: i64,
    pub participant_id: i64,
}

impl SessionKey {
    pub const fn new(conversation_id: i64, participant_id: i64) -> Self {
        Self {
            conversation_id,
            participant_id,
        }
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.conversation_id, self.participant_id)
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
}

/// One role-tagged message in a session's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: TurnRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    pub fn new(role: TurnRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    /// Length in characters, not bytes.
    pub fn char_len(&self) -> usize {
        self.content.chars().count()
    }
}

/// Persisted conversational state for one [`SessionKey`].
///
/// Values returned by a store are detached copies. Only the dispatcher flips
/// `is_active`; the activation setters are crate-private for that reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub key: SessionKey,
    is_active: bool,
    history: Vec<Turn>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Store-managed write counter; 0 means the value was never persisted.
    pub(crate) revision: u64,
}

impl Session {
    /// Fresh inactive session with empty history, as synthesized on lookup-miss.
    pub fn new(key: SessionKey) -> Self {
        let now = Utc::now();
        Self {
            key,
            is_active: false,
            history: Vec::new(),
            created_at: now,
            updated_at: now,
            revision: 0,
        }
    }

    pub(crate) fn from_parts(
        key: SessionKey,
        is_active: bool,
        history: Vec<Turn>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
        revision: u64,
    ) -> Self {
        Self {
            key,
            is_active,
            history,
            created_at,
            updated_at,
            revision,
        }
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn history(&self) -> &[Turn] {
        &self.history
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub(crate) fn activate(&mut self) {
        self.is_active = true;
        self.touch();
    }

    pub(crate) fn deactivate(&mut self) {
        self.is_active = false;
        self.touch();
    }

    pub fn push_turn(&mut self, role: TurnRole, content: impl Into<String>) {
        self.history.push(Turn::new(role, content));
        self.touch();
    }

    /// Total history size in characters.
    pub fn context_size(&self) -> usize {
        self.history.iter().map(Turn::char_len).sum()
    }

    /// Drop the whole history. Never truncates partially.
    pub fn reset(&mut self) {
        self.history.clear();
        self.touch();
    }

    /// Advance `updated_at`, never backwards.
    pub(crate) fn touch(&mut self) {
        let now = Utc::now();
        if now > self.updated_at {
            self.updated_at = now;
        }
    }
}
