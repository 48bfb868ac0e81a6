//! Chatbot module - routes Telegram updates through dialog modes to ChatGPT.

pub mod conversation;
pub mod dialog;
pub mod openai;
pub mod resources;
pub mod session;
pub mod telegram;
pub mod text;
pub mod update;

#[cfg(test)]
pub(crate) mod testing;

pub use dialog::{Dialog, DialogError};
pub use resources::Resources;
pub use telegram::TelegramClient;
pub use update::{Inbound, Update};
