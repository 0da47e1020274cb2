use crate::error::RelayError;

/// User-facing text for one dispatch, plus the error behind it (if any) for
/// the caller to log. `text` never contains raw error details.
#[derive(Debug)]
pub struct Reply {
    pub text: String,
    pub failure: Option<RelayError>,
}

impl Reply {
    pub fn ok(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            failure: None,
        }
    }

    pub fn failed(text: impl Into<String>, failure: impl Into<RelayError>) -> Self {
        Self {
            text: text.into(),
            failure: Some(failure.into()),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.failure.is_some()
    }
}
