use super::api::{InlineKeyboardMarkup, Update};
use super::decode::{END_CHAT_CALLBACK, decode_update};
use super::{MAX_MESSAGE_CHARS, TelegramGateway};
use crate::error::TransportError;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

impl TelegramGateway {
    /// Poll for updates until `shutdown` fires, handling each update on its
    /// own task. In-flight handlers are awaited before returning.
    ///
    /// Fails only when the bot identity cannot be fetched at startup.
    pub async fn run(self: Arc<Self>, shutdown: CancellationToken) -> Result<(), TransportError> {
        let me = self.get_me().await?;
        if let Some(username) = me.username.filter(|u| !u.is_empty()) {
            tracing::info!(bot = %username, "telegram gateway connected");
            let _ = self.bot_username.set(username);
        }

        if let Err(err) = self.register_commands().await {
            tracing::warn!(error = %err, "failed to register bot commands");
        }

        let tasks = TaskTracker::new();
        let mut offset: i64 = 0;
        self.ready.store(true, Ordering::SeqCst);

        loop {
            let polled = tokio::select! {
                biased;
                () = shutdown.cancelled() => break,
                polled = self.get_updates(offset) => polled,
            };

            match polled {
                Ok(updates) => {
                    for update in updates {
                        offset = offset.max(update.update_id + 1);
                        let gateway = Arc::clone(&self);
                        tasks.spawn(async move { gateway.handle_update(update).await });
                    }
                }
                Err(err) => {
                    tracing::warn!(error = %err, "telegram poll error");
                    tokio::select! {
                        () = shutdown.cancelled() => break,
                        () = tokio::time::sleep(self.retry_delay) => {}
                    }
                }
            }
        }

        self.ready.store(false, Ordering::SeqCst);
        tasks.close();
        tasks.wait().await;
        tracing::info!("telegram gateway stopped");
        Ok(())
    }

    pub(super) async fn handle_update(&self, update: Update) {
        let Some(inbound) = decode_update(&update, self.bot_username()) else {
            return;
        };

        if !self.is_chat_allowed(inbound.chat_id) {
            tracing::warn!(chat_id = inbound.chat_id, "dropping update from chat not on the allow-list");
            return;
        }

        if let Some(callback) = &update.callback_query
            && let Err(err) = self.answer_callback_query(&callback.id).await
        {
            tracing::warn!(error = %err, "failed to answer callback query");
        }

        if inbound.expects_generation
            && let Err(err) = self.send_typing(inbound.chat_id).await
        {
            tracing::debug!(error = %err, "failed to send typing action");
        }

        let key = inbound.intent.origin().key().ok();
        let reply = self.dispatcher.dispatch(inbound.intent).await;

        let text = if reply.text.trim().is_empty() {
            t!("dispatch.failure", locale = self.dispatcher.locale()).to_string()
        } else {
            reply.text
        };

        let markup = match key {
            Some(key) if self.dispatcher.session_active(key).await => {
                Some(InlineKeyboardMarkup::single(
                    t!("telegram.end_chat_button", locale = self.dispatcher.locale()),
                    END_CHAT_CALLBACK,
                ))
            }
            _ => None,
        };

        self.deliver(inbound.chat_id, &text, inbound.reply_to, markup)
            .await;
    }

    /// Send a reply, split to Telegram's size limit. Only the first part is
    /// threaded under the source message and only the last carries the
    /// keyboard.
    async fn deliver(
        &self,
        chat_id: i64,
        text: &str,
        reply_to: Option<i64>,
        markup: Option<InlineKeyboardMarkup>,
    ) {
        let parts = split_message(text, MAX_MESSAGE_CHARS);
        let last = parts.len().saturating_sub(1);
        for (index, part) in parts.iter().enumerate() {
            let reply_to = if index == 0 { reply_to } else { None };
            let markup = if index == last { markup.clone() } else { None };
            if let Err(err) = self.send_message(chat_id, part, reply_to, markup).await {
                tracing::error!(chat_id, error = %err, "failed to deliver reply");
                return;
            }
        }
    }
}

/// Split on line boundaries where possible, falling back to a hard split by
/// character count for single oversized lines.
fn split_message(text: &str, max_chars: usize) -> Vec<String> {
    if text.chars().count() <= max_chars {
        return vec![text.to_string()];
    }

    let mut parts = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for line in text.split_inclusive('\n') {
        let line_len = line.chars().count();
        if current_len + line_len > max_chars && !current.is_empty() {
            parts.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if line_len > max_chars {
            let chars: Vec<char> = line.chars().collect();
            for chunk in chars.chunks(max_chars) {
                parts.push(chunk.iter().collect());
            }
            continue;
        }
        current.push_str(line);
        current_len += line_len;
    }

    if !current.is_empty() {
        parts.push(current);
    }
    parts
}
