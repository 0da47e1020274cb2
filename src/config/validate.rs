use super::types::Config;
use crate::error::ConfigError;

impl Config {
    /// Reject configurations the relay cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.telegram.bot_token.trim().is_empty() {
            return Err(ConfigError::Validation(
                "telegram.bot_token is empty (set TELEGRAM_BOT_TOKEN)".into(),
            ));
        }
        if self.telegram.allowed_chat_ids.is_empty() {
            return Err(ConfigError::Validation(
                "telegram.allowed_chat_ids is empty (set ALLOWED_CHAT_IDS)".into(),
            ));
        }
        if self
            .generation
            .api_key
            .as_deref()
            .is_none_or(|k| k.trim().is_empty())
        {
            return Err(ConfigError::Validation(
                "generation.api_key is missing (set CLAUDE_API_KEY)".into(),
            ));
        }
        self.validate_store()?;
        if self.dispatch.max_context_chars == 0 {
            return Err(ConfigError::Validation(
                "dispatch.max_context_chars must be greater than zero".into(),
            ));
        }
        if self.health.enabled {
            let host = self.health.host.trim();
            if host.is_empty() || host.contains(char::is_whitespace) {
                return Err(ConfigError::Validation(
                    "health.host must be an IP address or hostname".into(),
                ));
            }
        }
        Ok(())
    }

    /// Store-only checks, shared with commands that never talk to Telegram.
    pub fn validate_store(&self) -> Result<(), ConfigError> {
        if self.store.ttl_secs == 0 {
            return Err(ConfigError::Validation(
                "store.ttl_secs must be greater than zero".into(),
            ));
        }
        if self.store.namespace.trim().is_empty() || self.store.namespace.contains(':') {
            return Err(ConfigError::Validation(
                "store.namespace must be non-empty and must not contain ':'".into(),
            ));
        }
        Ok(())
    }
}
