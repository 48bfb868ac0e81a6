//! In-memory stand-ins for the model API and Telegram, shared by the tests.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use tempfile::TempDir;
use teloxide::types::BotCommand;

use crate::chatbot::openai::{Completions, Error, Message};
use crate::chatbot::telegram::{Button, Messenger};
use crate::chatbot::text::Markup;

/// Replies with canned answers in order and records every transcript it saw.
pub struct ScriptedModel {
    replies: Mutex<VecDeque<Result<String, String>>>,
    calls: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedModel {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(|r| Ok(r.into())).collect()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Every call fails as if the quota ran out.
    pub fn failing() -> Self {
        let replies = (0..8).map(|_| Err("429: quota exceeded".to_string())).collect();
        Self {
            replies: Mutex::new(replies),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<Vec<Message>> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Completions for ScriptedModel {
    async fn complete(&self, messages: &[Message]) -> Result<String, Error> {
        self.calls.lock().unwrap().push(messages.to_vec());
        match self.replies.lock().unwrap().pop_front() {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(e)) => Err(Error::Api(e)),
            None => Err(Error::Empty),
        }
    }
}

/// One thing the bot did in a chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    Text {
        chat_id: i64,
        text: String,
        markup: Markup,
    },
    Buttons {
        chat_id: i64,
        text: String,
        markup: Markup,
        tokens: Vec<String>,
    },
    Edit {
        chat_id: i64,
        message_id: i64,
        text: String,
    },
    Photo { chat_id: i64, file_name: String },
    Answer { callback_id: String },
    Menu {
        chat_id: i64,
        commands: Vec<String>,
    },
}

#[derive(Default)]
pub struct RecordingMessenger {
    sent: Mutex<Vec<Sent>>,
}

impl RecordingMessenger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap().clear();
    }

    /// Texts sent or edited into `chat_id`, in order.
    pub fn texts(&self, chat_id: i64) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::Text { chat_id: c, text, .. }
                | Sent::Buttons { chat_id: c, text, .. }
                | Sent::Edit { chat_id: c, text, .. }
                    if c == chat_id =>
                {
                    Some(text)
                }
                _ => None,
            })
            .collect()
    }

    fn record(&self, sent: Sent) -> i64 {
        let mut all = self.sent.lock().unwrap();
        all.push(sent);
        all.len() as i64
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn send_text(&self, chat_id: i64, text: &str, markup: Markup) -> Result<i64, String> {
        Ok(self.record(Sent::Text {
            chat_id,
            text: text.to_string(),
            markup,
        }))
    }

    async fn send_buttons(
        &self,
        chat_id: i64,
        text: &str,
        markup: Markup,
        buttons: &[Button],
    ) -> Result<i64, String> {
        let tokens = buttons.iter().map(|b| b.token.to_string()).collect();
        Ok(self.record(Sent::Buttons {
            chat_id,
            text: text.to_string(),
            markup,
            tokens,
        }))
    }

    async fn edit_text(&self, chat_id: i64, message_id: i64, text: &str) -> Result<(), String> {
        self.record(Sent::Edit {
            chat_id,
            message_id,
            text: text.to_string(),
        });
        Ok(())
    }

    async fn send_photo(&self, chat_id: i64, _data: Vec<u8>, file_name: &str) -> Result<i64, String> {
        Ok(self.record(Sent::Photo {
            chat_id,
            file_name: file_name.to_string(),
        }))
    }

    async fn answer_selection(&self, callback_id: &str) -> Result<(), String> {
        self.record(Sent::Answer { callback_id: callback_id.to_string() });
        Ok(())
    }

    async fn show_menu(&self, chat_id: i64, commands: Vec<BotCommand>) -> Result<(), String> {
        let commands = commands.into_iter().map(|c| c.command).collect();
        self.record(Sent::Menu { chat_id, commands });
        Ok(())
    }
}

/// A resource tree with every message, prompt and image the dialog uses.
pub fn resource_fixture() -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write_all(root, "messages", "txt", &["main", "gpt", "date", "message", "profile", "opener"], |n| {
        format!("{n} intro")
    });
    write_all(
        root,
        "prompts",
        "txt",
        &[
            "gpt", "profile", "opener", "message_next", "message_date",
            "date_grande", "date_robbie", "date_zendaya", "date_gosling", "date_hardy",
        ],
        |n| format!("{n} prompt"),
    );
    write_all(
        root,
        "images",
        "jpg",
        &[
            "main", "gpt", "date", "message", "profile", "opener",
            "date_grande", "date_robbie", "date_zendaya", "date_gosling", "date_hardy",
        ],
        |_| "jpeg".to_string(),
    );
    dir
}

fn write_all(root: &Path, dir: &str, ext: &str, names: &[&str], content: impl Fn(&str) -> String) {
    let dir = root.join(dir);
    std::fs::create_dir_all(&dir).unwrap();
    for name in names {
        std::fs::write(dir.join(format!("{name}.{ext}")), content(name)).unwrap();
    }
}
