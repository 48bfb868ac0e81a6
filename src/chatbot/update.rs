//! Inbound webhook payloads.
//!
//! Only the handful of fields the dialog needs are modelled; everything else
//! in the Telegram update is ignored so unusual payloads still parse.

use serde::Deserialize;
use teloxide::utils::command::BotCommands;

use crate::chatbot::session::ModeKind;

/// Commands shown in the chat menu, in menu order.
#[derive(BotCommands, Clone, Copy, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase")]
pub enum Command {
    #[command(description = "Main menu")]
    Start,
    #[command(description = "Generate a Tinder profile 😎")]
    Profile,
    #[command(description = "Message to break the ice 🥰")]
    Opener,
    #[command(description = "Chat on your behalf 😈")]
    Message,
    #[command(description = "Chat with celebrities 🔥")]
    Date,
    #[command(description = "Ask ChatGPT a question 🧠")]
    Gpt,
}

impl Command {
    /// The dialog mode this command switches to.
    pub fn mode(self) -> ModeKind {
        match self {
            Command::Start => ModeKind::None,
            Command::Profile => ModeKind::Profile,
            Command::Opener => ModeKind::Opener,
            Command::Message => ModeKind::Message,
            Command::Date => ModeKind::Date,
            Command::Gpt => ModeKind::Gpt,
        }
    }

    /// Parse `/name`, `/name@bot` or `/name args`; arguments are ignored.
    pub fn from_text(text: &str, bot_username: &str) -> Option<Self> {
        let head = text.split_whitespace().next()?;
        Self::parse(head, bot_username).ok()
    }
}

#[derive(Debug, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<IncomingMessage>,
    #[serde(default)]
    pub callback_query: Option<CallbackQuery>,
}

#[derive(Debug, Deserialize)]
pub struct IncomingMessage {
    pub message_id: i64,
    pub chat: Chat,
    #[serde(default)]
    pub text: Option<String>,
    /// Unix time; some payloads omit it.
    #[serde(default)]
    pub date: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    #[serde(default)]
    pub data: Option<String>,
    #[serde(default)]
    pub message: Option<CallbackMessage>,
}

#[derive(Debug, Deserialize)]
pub struct CallbackMessage {
    pub chat: Chat,
}

/// What the dialog should do with an update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Command { chat_id: i64, command: Command },
    Text { chat_id: i64, text: String },
    Selection {
        chat_id: i64,
        callback_id: String,
        token: String,
    },
    Ignored,
}

impl Update {
    pub fn classify(self, bot_username: &str) -> Inbound {
        if let Some(query) = self.callback_query {
            return match (query.data, query.message) {
                (Some(token), Some(message)) => Inbound::Selection {
                    chat_id: message.chat.id,
                    callback_id: query.id,
                    token,
                },
                _ => Inbound::Ignored,
            };
        }

        let Some(message) = self.message else {
            return Inbound::Ignored;
        };
        let Some(text) = message.text else {
            return Inbound::Ignored;
        };
        let chat_id = message.chat.id;

        if text.starts_with('/') {
            return match Command::from_text(&text, bot_username) {
                Some(command) => Inbound::Command { chat_id, command },
                None => Inbound::Ignored,
            };
        }

        Inbound::Text { chat_id, text }
    }
}
