//! Telegram delivery using teloxide.

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{
    BotCommand, BotCommandScope, CallbackQueryId, InlineKeyboardButton, InlineKeyboardMarkup,
    InputFile, MenuButton, MessageId, ParseMode, Recipient,
};
use tracing::{info, warn};

use crate::chatbot::text::Markup;

/// An inline choice offered under a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Button {
    pub token: &'static str,
    pub label: &'static str,
}

/// Outbound side of the chat, as seen by the dialog handlers.
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Send text and return the new message id.
    async fn send_text(&self, chat_id: i64, text: &str, markup: Markup) -> Result<i64, String>;

    /// Send text with one button per row.
    async fn send_buttons(
        &self,
        chat_id: i64,
        text: &str,
        markup: Markup,
        buttons: &[Button],
    ) -> Result<i64, String>;

    /// Replace the text of an earlier message (plain rendering).
    async fn edit_text(&self, chat_id: i64, message_id: i64, text: &str) -> Result<(), String>;

    async fn send_photo(&self, chat_id: i64, data: Vec<u8>, file_name: &str) -> Result<i64, String>;

    /// Acknowledge a button press so the client stops its spinner.
    async fn answer_selection(&self, callback_id: &str) -> Result<(), String>;

    /// Install the chat-scoped command menu.
    async fn show_menu(&self, chat_id: i64, commands: Vec<BotCommand>) -> Result<(), String>;
}

/// Telegram API client.
pub struct TelegramClient {
    bot: Bot,
}

impl TelegramClient {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

fn failed(what: &str, e: impl std::fmt::Display) -> String {
    let msg = format!("Failed to {what}: {e}");
    warn!("{}", msg);
    msg
}

#[async_trait]
impl Messenger for TelegramClient {
    async fn send_text(&self, chat_id: i64, text: &str, markup: Markup) -> Result<i64, String> {
        let mut request = self.bot.send_message(ChatId(chat_id), text);
        if markup == Markup::Markdown {
            #[allow(deprecated)]
            {
                request = request.parse_mode(ParseMode::Markdown);
            }
        }

        request
            .await
            .map(|msg| msg.id.0 as i64)
            .map_err(|e| failed("send", e))
    }

    async fn send_buttons(
        &self,
        chat_id: i64,
        text: &str,
        markup: Markup,
        buttons: &[Button],
    ) -> Result<i64, String> {
        let keyboard: Vec<Vec<InlineKeyboardButton>> = buttons
            .iter()
            .map(|b| vec![InlineKeyboardButton::callback(b.label, b.token)])
            .collect();

        let mut request = self
            .bot
            .send_message(ChatId(chat_id), text)
            .reply_markup(InlineKeyboardMarkup::new(keyboard));
        if markup == Markup::Markdown {
            #[allow(deprecated)]
            {
                request = request.parse_mode(ParseMode::Markdown);
            }
        }

        request
            .await
            .map(|msg| msg.id.0 as i64)
            .map_err(|e| failed("send buttons", e))
    }

    async fn edit_text(&self, chat_id: i64, message_id: i64, text: &str) -> Result<(), String> {
        self.bot
            .edit_message_text(ChatId(chat_id), MessageId(message_id as i32), text)
            .await
            .map_err(|e| failed("edit message", e))?;
        Ok(())
    }

    async fn send_photo(&self, chat_id: i64, data: Vec<u8>, file_name: &str) -> Result<i64, String> {
        info!("📷 Sending {} to chat {} ({} bytes)", file_name, chat_id, data.len());

        let input_file = InputFile::memory(data).file_name(file_name.to_string());
        self.bot
            .send_photo(ChatId(chat_id), input_file)
            .await
            .map(|msg| msg.id.0 as i64)
            .map_err(|e| failed("send photo", e))
    }

    async fn answer_selection(&self, callback_id: &str) -> Result<(), String> {
        self.bot
            .answer_callback_query(CallbackQueryId(callback_id.to_string()))
            .await
            .map_err(|e| failed("answer callback", e))?;
        Ok(())
    }

    async fn show_menu(&self, chat_id: i64, commands: Vec<BotCommand>) -> Result<(), String> {
        info!("📋 Installing {} menu command(s) for chat {}", commands.len(), chat_id);

        let scope = BotCommandScope::Chat {
            chat_id: Recipient::Id(ChatId(chat_id)),
        };
        self.bot
            .set_my_commands(commands)
            .scope(scope)
            .await
            .map_err(|e| failed("set commands", e))?;

        self.bot
            .set_chat_menu_button()
            .chat_id(ChatId(chat_id))
            .menu_button(MenuButton::Commands)
            .await
            .map_err(|e| failed("set menu button", e))?;

        Ok(())
    }
}
