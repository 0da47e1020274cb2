use super::intent::{Intent, Origin, ParticipantProfile};
use super::reply::Reply;
use crate::error::{DispatchError, RelayError, ValidationError};
use crate::providers::Generator;
use crate::session::{SessionKey, SessionLock, SessionStore, TurnRole};
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

pub const DEFAULT_MAX_CONTEXT_CHARS: usize = 10_000;

/// Runs the per-session state machine for each decoded intent.
///
/// Every mutating intent holds the key's [`SessionLock`] for the whole
/// load, mutate, generate, save sequence, so events for one participant
/// apply one at a time while other keys proceed in parallel.
pub struct Dispatcher {
    store: Arc<dyn SessionStore>,
    generator: Arc<dyn Generator>,
    max_context_chars: usize,
    locale: String,
    shutdown: CancellationToken,
}

impl Dispatcher {
    pub fn new(store: Arc<dyn SessionStore>, generator: Arc<dyn Generator>) -> Self {
        Self {
            store,
            generator,
            max_context_chars: DEFAULT_MAX_CONTEXT_CHARS,
            locale: "en".into(),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn with_max_context_chars(mut self, max_context_chars: usize) -> Self {
        self.max_context_chars = max_context_chars;
        self
    }

    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = locale.into();
        self
    }

    pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    pub fn locale(&self) -> &str {
        &self.locale
    }

    pub async fn dispatch(&self, intent: Intent) -> Reply {
        match intent {
            Intent::Restart(origin) => self.restart(&origin).await,
            Intent::Help(origin) => self.help(&origin).await,
            Intent::BeginSession(origin) => self.begin_session(&origin).await,
            Intent::EndSession(origin) => self.end_session(&origin).await,
            Intent::WhoAmI { origin, profile } => self.whoami(&origin, &profile).await,
            Intent::InboundText { origin, text } => self.inbound_text(&origin, &text).await,
        }
    }

    /// Forget the session entirely and show the help text.
    pub async fn restart(&self, origin: &Origin) -> Reply {
        self.run("restart", origin, move |key| self.restart_locked(key))
            .await
    }

    pub async fn help(&self, origin: &Origin) -> Reply {
        self.run("help", origin, move |_| {
            std::future::ready(Ok::<_, RelayError>(Reply::ok(self.help_text())))
        })
        .await
    }

    pub async fn begin_session(&self, origin: &Origin) -> Reply {
        self.run("begin_session", origin, move |key| self.begin_locked(key))
            .await
    }

    pub async fn end_session(&self, origin: &Origin) -> Reply {
        self.run("end_session", origin, move |key| self.end_locked(key))
            .await
    }

    /// Identity and status report. Reads only the active flag.
    pub async fn whoami(&self, origin: &Origin, profile: &ParticipantProfile) -> Reply {
        self.run("whoami", origin, move |key| self.render_whoami(key, profile))
            .await
    }

    pub async fn inbound_text(&self, origin: &Origin, text: &str) -> Reply {
        self.run("inbound_text", origin, move |key| {
            self.inbound_text_locked(key, text)
        })
        .await
    }

    /// Presentational flag for the channel (e.g. an "end session" button).
    /// Store failures read as inactive.
    pub async fn session_active(&self, key: SessionKey) -> bool {
        match self.store.is_active(key).await {
            Ok(active) => active,
            Err(err) => {
                tracing::warn!(%key, error = %err, "could not read session state");
                false
            }
        }
    }

    async fn run<F, Fut>(&self, intent: &'static str, origin: &Origin, op: F) -> Reply
    where
        F: FnOnce(SessionKey) -> Fut,
        Fut: Future<Output = Result<Reply, RelayError>>,
    {
        let key = match origin.key() {
            Ok(key) => key,
            Err(err) => {
                tracing::warn!(
                    intent,
                    conversation_id = origin.conversation_id,
                    "rejecting intent: {err}"
                );
                return self.failure_reply(err.into());
            }
        };

        let span = tracing::info_span!(
            "dispatch",
            intent,
            conversation_id = key.conversation_id,
            participant_id = key.participant_id,
            dispatch_id = %Uuid::new_v4(),
        );

        async move {
            match op(key).await {
                Ok(reply) => reply,
                Err(err) => self.failure_reply(err),
            }
        }
        .instrument(span)
        .await
    }

    async fn acquire(&self, key: SessionKey) -> Result<SessionLock, DispatchError> {
        if self.shutdown.is_cancelled() {
            return Err(DispatchError::Cancelled);
        }
        tokio::select! {
            biased;
            () = self.shutdown.cancelled() => Err(DispatchError::Cancelled),
            lock = self.store.lock(key) => Ok(lock),
        }
    }

    async fn restart_locked(&self, key: SessionKey) -> Result<Reply, RelayError> {
        let _lock = self.acquire(key).await?;
        self.store.delete(key).await?;
        tracing::info!("session deleted");
        Ok(Reply::ok(self.help_text()))
    }

    async fn begin_locked(&self, key: SessionKey) -> Result<Reply, RelayError> {
        let _lock = self.acquire(key).await?;
        let mut session = self.store.get_or_create(key).await?;
        let was_active = session.is_active();

        session.reset();
        session.activate();
        self.store.save(&mut session).await?;

        tracing::info!(was_active, "session started");
        Ok(Reply::ok(
            t!("dispatch.session_started", locale = self.locale.as_str()).to_string(),
        ))
    }

    async fn end_locked(&self, key: SessionKey) -> Result<Reply, RelayError> {
        let _lock = self.acquire(key).await?;
        let mut session = self.store.get_or_create(key).await?;

        if !session.is_active() {
            tracing::debug!("end requested for inactive session");
            return Ok(Reply::ok(
                t!("dispatch.already_inactive", locale = self.locale.as_str()).to_string(),
            ));
        }

        session.reset();
        session.deactivate();
        self.store.save(&mut session).await?;

        tracing::info!("session ended");
        Ok(Reply::ok(
            t!("dispatch.session_ended", locale = self.locale.as_str()).to_string(),
        ))
    }

    async fn render_whoami(
        &self,
        key: SessionKey,
        profile: &ParticipantProfile,
    ) -> Result<Reply, RelayError> {
        let status = if self.store.is_active(key).await? {
            t!("dispatch.status_active", locale = self.locale.as_str())
        } else {
            t!("dispatch.status_inactive", locale = self.locale.as_str())
        };

        let text = t!(
            "dispatch.whoami",
            locale = self.locale.as_str(),
            name = profile.display_name(),
            username = profile.handle().unwrap_or_else(|| "-".into()),
            user_id = key.participant_id,
            chat_id = key.conversation_id,
            status = status
        );
        Ok(Reply::ok(text.to_string()))
    }

    async fn inbound_text_locked(&self, key: SessionKey, text: &str) -> Result<Reply, RelayError> {
        if text.trim().is_empty() {
            return Err(ValidationError::EmptyMessage.into());
        }

        let _lock = self.acquire(key).await?;
        let mut session = self.store.get_or_create(key).await?;

        if !session.is_active() {
            tracing::debug!("text for inactive session ignored");
            return Ok(Reply::ok(
                t!("dispatch.not_active", locale = self.locale.as_str()).to_string(),
            ));
        }

        session.push_turn(TurnRole::User, text);

        let size = session.context_size();
        if size > self.max_context_chars {
            session.reset();
            self.store.save(&mut session).await?;
            tracing::info!(size, limit = self.max_context_chars, "context overflow, history reset");
            return Ok(Reply::ok(
                t!("dispatch.context_overflow", locale = self.locale.as_str()).to_string(),
            ));
        }

        let generated = tokio::select! {
            biased;
            () = self.shutdown.cancelled() => return Err(DispatchError::Cancelled.into()),
            result = self.generator.generate(session.history()) => result,
        };

        match generated {
            Ok(answer) => {
                session.push_turn(TurnRole::Assistant, answer.as_str());

                // The reply is delivered either way; the stored history is not
                // allowed to stay above the threshold.
                let rotated = session.context_size() > self.max_context_chars;
                if rotated {
                    session.reset();
                }
                self.store.save(&mut session).await?;

                if rotated {
                    tracing::info!(limit = self.max_context_chars, "context rotated after reply");
                    let notice = t!("dispatch.context_rotated", locale = self.locale.as_str());
                    Ok(Reply::ok(format!("{answer}\n\n{notice}")))
                } else {
                    tracing::debug!(turns = session.history().len(), "reply generated");
                    Ok(Reply::ok(answer))
                }
            }
            Err(err) => {
                tracing::warn!(
                    provider = self.generator.name(),
                    error = %err,
                    "generation failed, keeping user turn"
                );
                self.store.save(&mut session).await?;
                Ok(Reply::failed(
                    t!("dispatch.generation_failed", locale = self.locale.as_str()).to_string(),
                    err,
                ))
            }
        }
    }

    fn help_text(&self) -> String {
        t!("dispatch.help", locale = self.locale.as_str()).to_string()
    }

    fn failure_reply(&self, err: RelayError) -> Reply {
        let text = match &err {
            RelayError::Dispatch(DispatchError::Cancelled) => {
                tracing::info!("dispatch cancelled by shutdown");
                t!("dispatch.shutting_down", locale = self.locale.as_str())
            }
            RelayError::Validation(ValidationError::EmptyMessage) => {
                tracing::debug!("empty message rejected");
                t!("dispatch.empty_message", locale = self.locale.as_str())
            }
            RelayError::Store(store_err) => {
                tracing::error!(
                    backend = self.store.backend_name(),
                    error = %store_err,
                    "session store failure"
                );
                t!("dispatch.failure", locale = self.locale.as_str())
            }
            other => {
                tracing::error!(error = %other, "dispatch failed");
                t!("dispatch.failure", locale = self.locale.as_str())
            }
        };
        Reply::failed(text.to_string(), err)
    }
}
