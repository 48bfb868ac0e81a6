//! Ordered transcript sent to the completion API.
//!
//! One-shot questions rebuild the transcript from scratch; multi-turn
//! scenarios seed it with `set_prompt` and grow it with `add_message`.

use crate::chatbot::openai::{Completions, Error, Message};
use crate::chatbot::text::normalize;
use tracing::info;

#[derive(Debug, Default)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a fresh transcript holding only the system instruction.
    pub fn set_prompt(&mut self, prompt: &str) {
        self.messages.clear();
        self.messages.push(Message::system(normalize(prompt)));
    }

    /// Append a user turn onto the current transcript and ask for a reply.
    ///
    /// If the call fails the user turn stays in the transcript.
    pub async fn add_message(&mut self, api: &dyn Completions, text: &str) -> Result<String, Error> {
        self.messages.push(Message::user(normalize(text)));
        self.send(api).await
    }

    /// Ask a single question with its own system prompt, discarding prior turns.
    pub async fn send_question(
        &mut self,
        api: &dyn Completions,
        prompt: &str,
        text: &str,
    ) -> Result<String, Error> {
        self.messages.clear();
        self.messages.push(Message::system(normalize(prompt)));
        self.messages.push(Message::user(normalize(text)));
        self.send(api).await
    }

    async fn send(&mut self, api: &dyn Completions) -> Result<String, Error> {
        info!("🧠 Asking model ({} message(s))", self.messages.len());
        let reply = normalize(&api.complete(&self.messages).await?);
        self.messages.push(Message::assistant(reply.clone()));
        Ok(reply)
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }
}
