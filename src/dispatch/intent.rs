use crate::error::ValidationError;
use crate::session::SessionKey;

/// Where an intent came from. The participant is optional because some
/// channel events (anonymous group admins, channel posts) carry no sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Origin {
    pub conversation_id: i64,
    pub participant_id: Option<i64>,
}

impl Origin {
    pub const fn new(conversation_id: i64, participant_id: i64) -> Self {
        Self {
            conversation_id,
            participant_id: Some(participant_id),
        }
    }

    pub const fn anonymous(conversation_id: i64) -> Self {
        Self {
            conversation_id,
            participant_id: None,
        }
    }

    pub fn key(&self) -> Result<SessionKey, ValidationError> {
        self.participant_id
            .map(|participant_id| SessionKey::new(self.conversation_id, participant_id))
            .ok_or(ValidationError::MissingParticipant)
    }
}

/// Caller-supplied participant metadata rendered by `whoami`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParticipantProfile {
    pub first_name: String,
    pub last_name: Option<String>,
    pub username: Option<String>,
}

impl ParticipantProfile {
    pub fn display_name(&self) -> String {
        match self.last_name.as_deref().map(str::trim) {
            Some(last) if !last.is_empty() => format!("{} {last}", self.first_name.trim()),
            _ => self.first_name.trim().to_string(),
        }
    }

    pub fn handle(&self) -> Option<String> {
        self.username
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .map(|u| format!("@{}", u.trim_start_matches('@')))
    }
}

/// A decoded user action, independent of the channel it arrived on.
#[derive(Debug, Clone, PartialEq, Eq, strum::IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum Intent {
    Restart(Origin),
    Help(Origin),
    BeginSession(Origin),
    EndSession(Origin),
    #[strum(serialize = "whoami")]
    WhoAmI {
        origin: Origin,
        profile: ParticipantProfile,
    },
    InboundText {
        origin: Origin,
        text: String,
    },
}

impl Intent {
    pub fn origin(&self) -> Origin {
        match self {
            Self::Restart(origin)
            | Self::Help(origin)
            | Self::BeginSession(origin)
            | Self::EndSession(origin)
            | Self::WhoAmI { origin, .. }
            | Self::InboundText { origin, .. } => *origin,
        }
    }

    pub fn kind(&self) -> &'static str {
        self.into()
    }
}
