use super::types::{Config, StoreBackend};

/// Parse a comma-separated chat ID list. Unparseable entries are skipped.
pub(crate) fn parse_chat_ids(raw: &str) -> Vec<i64> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .filter_map(|part| match part.parse::<i64>() {
            Ok(id) => Some(id),
            Err(_) => {
                tracing::warn!(entry = part, "ignoring invalid chat id in ALLOWED_CHAT_IDS");
                None
            }
        })
        .collect()
}

impl Config {
    pub fn apply_env_overrides(&mut self) {
        if let Ok(token) = std::env::var("TELEGRAM_BOT_TOKEN")
            && !token.trim().is_empty()
        {
            self.telegram.bot_token = token.trim().to_string();
        }

        if let Ok(raw) = std::env::var("ALLOWED_CHAT_IDS")
            && !raw.trim().is_empty()
        {
            self.telegram.allowed_chat_ids = parse_chat_ids(&raw);
        }

        if let Ok(key) =
            std::env::var("CLAUDE_API_KEY").or_else(|_| std::env::var("ANTHROPIC_API_KEY"))
            && !key.trim().is_empty()
        {
            self.generation.api_key = Some(key.trim().to_string());
        }

        if let Ok(level) = std::env::var("LOG_LEVEL")
            && !level.trim().is_empty()
        {
            self.logging.level = level.trim().to_lowercase();
        }

        if let Ok(raw) = std::env::var("CHATRELAY_STORE_BACKEND") {
            match raw.trim().parse::<StoreBackend>() {
                Ok(backend) => self.store.backend = backend,
                Err(_) if raw.trim().is_empty() => {}
                Err(_) => tracing::warn!(value = %raw, "unknown CHATRELAY_STORE_BACKEND, keeping {}", self.store.backend),
            }
        }

        if let Ok(path) = std::env::var("CHATRELAY_SQLITE_PATH")
            && !path.trim().is_empty()
        {
            self.store.sqlite_path = path;
        }

        if let Ok(port_str) = std::env::var("CHATRELAY_HEALTH_PORT")
            && let Ok(port) = port_str.trim().parse::<u16>()
        {
            self.health.port = port;
        }
    }
}
