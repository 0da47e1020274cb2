pub mod api;
pub mod decode;
mod handler;

use crate::config::TelegramConfig;
use crate::dispatch::Dispatcher;
use crate::error::TransportError;
use crate::providers::http_client::build_http_client;
use api::{
    AnswerCallbackQuery, ApiResponse, BotCommand, GetUpdates, InlineKeyboardMarkup,
    SendChatAction, SendMessage, SetMyCommands, Update, User,
};
use reqwest::Client;
use serde::Serialize;
use serde::de::{DeserializeOwned, IgnoredAny};
use std::collections::HashSet;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

pub use decode::{END_CHAT_CALLBACK, Inbound, decode_update};

/// Telegram's per-message text limit, in characters.
pub const MAX_MESSAGE_CHARS: usize = 4096;

const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Long-polling Bot API gateway feeding the dispatcher.
pub struct TelegramGateway {
    client: Client,
    bot_token: String,
    api_base_url: String,
    allowed_chat_ids: HashSet<i64>,
    poll_timeout_secs: u64,
    retry_delay: Duration,
    dispatcher: Arc<Dispatcher>,
    bot_username: OnceLock<String>,
    ready: Arc<AtomicBool>,
}

impl TelegramGateway {
    pub fn new(config: &TelegramConfig, dispatcher: Arc<Dispatcher>) -> Self {
        // Long polls hold the connection for `poll_timeout_secs`.
        let client = build_http_client(Duration::from_secs(config.poll_timeout_secs + 15));

        Self {
            client,
            bot_token: config.bot_token.trim().to_string(),
            api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
            allowed_chat_ids: config.allowed_chat_ids.iter().copied().collect(),
            poll_timeout_secs: config.poll_timeout_secs,
            retry_delay: DEFAULT_RETRY_DELAY,
            dispatcher,
            bot_username: OnceLock::new(),
            ready: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Share the readiness flag with the health endpoint. It is raised once
    /// polling starts and lowered when the loop exits.
    pub fn with_ready_flag(mut self, ready: Arc<AtomicBool>) -> Self {
        self.ready = ready;
        self
    }

    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    fn api_url(&self, method: &str) -> String {
        format!("{}/bot{}/{method}", self.api_base_url, self.bot_token)
    }

    pub fn is_chat_allowed(&self, chat_id: i64) -> bool {
        self.allowed_chat_ids.contains(&chat_id)
    }

    pub fn bot_username(&self) -> Option<&str> {
        self.bot_username.get().map(String::as_str)
    }

    async fn call<B, T>(&self, method: &str, body: &B) -> Result<T, TransportError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        // `without_url` keeps the bot token out of error text.
        let response = self
            .client
            .post(self.api_url(method))
            .json(body)
            .send()
            .await
            .map_err(|e| TransportError::Http(e.without_url()))?;

        let status = response.status();
        let raw = response
            .text()
            .await
            .map_err(|e| TransportError::Http(e.without_url()))?;

        let api_error = |body: String| TransportError::Api {
            method: method.to_string(),
            status: status.as_u16(),
            body,
        };

        let parsed: ApiResponse<T> = serde_json::from_str(&raw)
            .map_err(|e| api_error(format!("malformed response: {e}")))?;

        if !status.is_success() || !parsed.ok {
            return Err(api_error(
                parsed.description.unwrap_or_else(|| "request rejected".into()),
            ));
        }
        parsed
            .result
            .ok_or_else(|| api_error("response carried no result".into()))
    }

    pub async fn get_me(&self) -> Result<User, TransportError> {
        self.call("getMe", &serde_json::json!({})).await
    }

    pub async fn get_updates(&self, offset: i64) -> Result<Vec<Update>, TransportError> {
        self.call(
            "getUpdates",
            &GetUpdates {
                offset,
                timeout: self.poll_timeout_secs,
                allowed_updates: &["message", "callback_query"],
            },
        )
        .await
    }

    pub async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        reply_to_message_id: Option<i64>,
        reply_markup: Option<InlineKeyboardMarkup>,
    ) -> Result<(), TransportError> {
        let _: IgnoredAny = self
            .call(
                "sendMessage",
                &SendMessage {
                    chat_id,
                    text,
                    reply_to_message_id,
                    disable_notification: true,
                    reply_markup,
                },
            )
            .await?;
        Ok(())
    }

    pub async fn send_typing(&self, chat_id: i64) -> Result<(), TransportError> {
        let _: IgnoredAny = self
            .call(
                "sendChatAction",
                &SendChatAction {
                    chat_id,
                    action: "typing",
                },
            )
            .await?;
        Ok(())
    }

    pub async fn answer_callback_query(&self, callback_query_id: &str) -> Result<(), TransportError> {
        let _: IgnoredAny = self
            .call(
                "answerCallbackQuery",
                &AnswerCallbackQuery { callback_query_id },
            )
            .await?;
        Ok(())
    }

    /// Publish the command menu in the dispatcher's language.
    pub async fn register_commands(&self) -> Result<(), TransportError> {
        let locale = self.dispatcher.locale();
        let commands = vec![
            BotCommand {
                command: "start",
                description: t!("telegram.command_start", locale = locale).to_string(),
            },
            BotCommand {
                command: "help",
                description: t!("telegram.command_help", locale = locale).to_string(),
            },
            BotCommand {
                command: "begin_chat",
                description: t!("telegram.command_begin_chat", locale = locale).to_string(),
            },
            BotCommand {
                command: "end_chat",
                description: t!("telegram.command_end_chat", locale = locale).to_string(),
            },
            BotCommand {
                command: "whoami",
                description: t!("telegram.command_whoami", locale = locale).to_string(),
            },
        ];
        let _: IgnoredAny = self
            .call("setMyCommands", &SetMyCommands { commands })
            .await?;
        Ok(())
    }
}
