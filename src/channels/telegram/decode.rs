use super::api::{Message, Update, User};
use crate::dispatch::{Intent, Origin, ParticipantProfile};

/// Callback payload of the inline "end session" button.
pub const END_CHAT_CALLBACK: &str = "end_chat";

/// A decoded update, ready for the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inbound {
    pub chat_id: i64,
    pub intent: Intent,
    /// Message to thread the reply under, if any.
    pub reply_to: Option<i64>,
    /// Inbound text needs a typing indicator while the reply is generated.
    pub expects_generation: bool,
}

/// Map a Bot API update to an intent. Returns `None` for updates the relay
/// ignores: unknown commands, commands addressed to another bot, group
/// chatter that does not mention the bot, non-text messages, other bots.
pub fn decode_update(update: &Update, bot_username: Option<&str>) -> Option<Inbound> {
    if let Some(callback) = &update.callback_query {
        let message = callback.message.as_ref()?;
        if callback.data.as_deref() != Some(END_CHAT_CALLBACK) {
            return None;
        }
        return Some(Inbound {
            chat_id: message.chat.id,
            intent: Intent::EndSession(Origin::new(message.chat.id, callback.from.id)),
            reply_to: None,
            expects_generation: false,
        });
    }

    let message = update.message.as_ref()?;
    decode_message(message, bot_username)
}

fn decode_message(message: &Message, bot_username: Option<&str>) -> Option<Inbound> {
    if message.from.as_ref().is_some_and(|from| from.is_bot) {
        return None;
    }
    let text = message.text.as_deref()?;
    let chat_id = message.chat.id;
    let origin = Origin {
        conversation_id: chat_id,
        participant_id: message.from.as_ref().map(|from| from.id),
    };

    if let Some(command) = parse_command(text, bot_username) {
        let intent = match command {
            "start" => Intent::Restart(origin),
            "help" => Intent::Help(origin),
            "begin_chat" => Intent::BeginSession(origin),
            "end_chat" => Intent::EndSession(origin),
            "whoami" => Intent::WhoAmI {
                origin,
                profile: message.from.as_ref().map(profile).unwrap_or_default(),
            },
            other => {
                tracing::debug!(command = other, chat_id, "ignoring unknown command");
                return None;
            }
        };
        return Some(Inbound {
            chat_id,
            intent,
            reply_to: Some(message.message_id),
            expects_generation: false,
        });
    }
    if text.starts_with('/') {
        return None;
    }

    let text = if message.chat.is_group() {
        let mention = format!("@{}", bot_username?);
        if !text.contains(&mention) {
            return None;
        }
        text.replace(&mention, "").trim().to_string()
    } else {
        text.to_string()
    };

    Some(Inbound {
        chat_id,
        intent: Intent::InboundText { origin, text },
        reply_to: Some(message.message_id),
        expects_generation: true,
    })
}

/// `/cmd`, `/cmd args` or `/cmd@bot args`. Returns the bare command name, or
/// `None` when the text is not a command or names a different bot.
fn parse_command<'a>(text: &'a str, bot_username: Option<&str>) -> Option<&'a str> {
    let head = text.strip_prefix('/')?.split_whitespace().next()?;
    let (command, addressee) = match head.split_once('@') {
        Some((command, addressee)) => (command, Some(addressee)),
        None => (head, None),
    };
    if command.is_empty() {
        return None;
    }
    if let (Some(addressee), Some(bot)) = (addressee, bot_username)
        && !addressee.eq_ignore_ascii_case(bot)
    {
        return None;
    }
    Some(command)
}

fn profile(user: &User) -> ParticipantProfile {
    ParticipantProfile {
        first_name: user.first_name.clone(),
        last_name: user.last_name.clone(),
        username: user.username.clone(),
    }
}
