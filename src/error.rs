use crate::session::SessionKey;
use thiserror::Error;

// ─── Top-level error hierarchy ───────────────────────────────────────────────

/// Structured error hierarchy for `chatrelay`.
///
/// Each subsystem defines its own error variant. The dispatcher hands these
/// back alongside reply text so callers can log them; the composition root
/// uses `anyhow::Result` for ad-hoc context chains.
#[derive(Debug, Error)]
pub enum RelayError {
    // ── Config ───────────────────────────────────────────────────────────
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    // ── Session store ───────────────────────────────────────────────────
    #[error("store: {0}")]
    Store(#[from] StoreError),

    // ── Generation ──────────────────────────────────────────────────────
    #[error("generation: {0}")]
    Generation(#[from] GenerationError),

    // ── Intent validation ───────────────────────────────────────────────
    #[error("validation: {0}")]
    Validation(#[from] ValidationError),

    // ── Dispatch lifecycle ──────────────────────────────────────────────
    #[error("dispatch: {0}")]
    Dispatch(#[from] DispatchError),

    // ── Transport / Channel ─────────────────────────────────────────────
    #[error("transport: {0}")]
    Transport(#[from] TransportError),

    // ── Generic fallthrough (wraps anyhow for interop) ──────────────────
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ─── Config errors ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load config: {0}")]
    Load(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

// ─── Session store errors ───────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    #[error("sqlx: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("record codec: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("schema: {0}")]
    Schema(String),

    #[error("revision conflict for {key}: expected revision {expected}")]
    Conflict { key: SessionKey, expected: u64 },
}

// ─── Generation errors ──────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("provider {provider} request failed: {message}")]
    Request { provider: String, message: String },

    #[error("provider {provider} returned {status}: {body}")]
    Status {
        provider: String,
        status: u16,
        body: String,
    },

    #[error("provider {provider} returned no text")]
    Empty { provider: String },

    #[error("provider {provider} credentials not set")]
    Credentials { provider: String },

    #[error("unknown provider: {0}")]
    UnknownProvider(String),
}

// ─── Intent validation errors ───────────────────────────────────────────────

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("intent has no participant identity")]
    MissingParticipant,

    #[error("inbound message is empty")]
    EmptyMessage,
}

// ─── Dispatch lifecycle errors ──────────────────────────────────────────────

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error("dispatch cancelled before completion")]
    Cancelled,
}

// ─── Transport errors ───────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("telegram {method} failed ({status}): {body}")]
    Api {
        method: String,
        status: u16,
        body: String,
    },

    #[error("http: {0}")]
    Http(#[from] reqwest::Error),
}

/// Convenience alias used by the store layer.
pub type StoreResult<T> = std::result::Result<T, StoreError>;
