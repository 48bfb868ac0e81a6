//! Wingman - a Telegram dating-assistant bot backed by ChatGPT.

pub mod chatbot;
pub mod config;
pub mod server;
