//! Dialog router - turns inbound updates into mode transitions and replies.

use std::fmt;
use std::sync::Arc;

use teloxide::utils::command::BotCommands;
use tracing::{debug, info, warn};

use crate::chatbot::conversation::Conversation;
use crate::chatbot::openai::{self, Completions};
use crate::chatbot::resources::{ResourceError, Resources};
use crate::chatbot::session::{ChatState, Mode, ModeKind, Progress, SessionStore};
use crate::chatbot::telegram::{Button, Messenger};
use crate::chatbot::text::{guard_markdown, preview};
use crate::chatbot::update::{Command, Inbound};

const MENU_GREETING: &str = "ChatGPT mode is off. You are in the main menu ✅";
const DATE_CHOSEN: &str = "Good choice 😎 Your task is to ask them out in five messages! 🔥";
const TYPING: &str = "typing...";
const THINKING: &str = "Thinking over the options...";
const PROFILE_WAIT: &str = "ChatGPT is generating your profile. Please wait a few seconds.";
const OPENER_WAIT: &str = "ChatGPT is generating your message...";

const DATE_PREFIX: &str = "date_";
const MESSAGE_PREFIX: &str = "message_";

pub const DATE_CHOICES: [Button; 5] = [
    Button {
        token: "date_grande",
        label: "Ariana Grande",
    },
    Button {
        token: "date_robbie",
        label: "Margot Robbie",
    },
    Button {
        token: "date_zendaya",
        label: "Zendaya",
    },
    Button {
        token: "date_gosling",
        label: "Ryan Gosling",
    },
    Button {
        token: "date_hardy",
        label: "Tom Hardy",
    },
];

pub const MESSAGE_CHOICES: [Button; 2] = [
    Button {
        token: "message_next",
        label: "Write the next message",
    },
    Button {
        token: "message_date",
        label: "Ask for a date",
    },
];

/// Anything that stops an update from being handled.
#[derive(Debug)]
pub enum DialogError {
    Resource(ResourceError),
    Model(openai::Error),
    Delivery(String),
}

impl fmt::Display for DialogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resource(e) => write!(f, "resource error: {e}"),
            Self::Model(e) => write!(f, "model error: {e}"),
            Self::Delivery(e) => write!(f, "delivery error: {e}"),
        }
    }
}

impl std::error::Error for DialogError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Resource(e) => Some(e),
            Self::Model(e) => Some(e),
            Self::Delivery(_) => None,
        }
    }
}

impl From<ResourceError> for DialogError {
    fn from(e: ResourceError) -> Self {
        Self::Resource(e)
    }
}

impl From<openai::Error> for DialogError {
    fn from(e: openai::Error) -> Self {
        Self::Model(e)
    }
}

impl From<String> for DialogError {
    fn from(e: String) -> Self {
        Self::Delivery(e)
    }
}

/// The dialog state machine shared by all chats.
pub struct Dialog {
    resources: Resources,
    model: Arc<dyn Completions>,
    messenger: Arc<dyn Messenger>,
    sessions: SessionStore,
    bot_username: String,
}

impl Dialog {
    pub fn new(
        resources: Resources,
        model: Arc<dyn Completions>,
        messenger: Arc<dyn Messenger>,
        bot_username: String,
    ) -> Self {
        Self {
            resources,
            model,
            messenger,
            sessions: SessionStore::new(),
            bot_username,
        }
    }

    pub fn bot_username(&self) -> &str {
        &self.bot_username
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Handle one inbound update to completion.
    ///
    /// Model failures are not turned into chat replies here; they propagate so
    /// the transport can log them and report a failure.
    pub async fn dispatch(&self, inbound: Inbound) -> Result<(), DialogError> {
        match inbound {
            Inbound::Command { chat_id, command } => self.handle_command(chat_id, command).await,
            Inbound::Text { chat_id, text } => self.handle_text(chat_id, &text).await,
            Inbound::Selection {
                chat_id,
                callback_id,
                token,
            } => self.handle_selection(chat_id, &callback_id, &token).await,
            Inbound::Ignored => {
                debug!("Ignoring update");
                Ok(())
            }
        }
    }

    /// Enter the mode a command names, resetting that mode's accumulators.
    pub async fn handle_command(&self, chat_id: i64, command: Command) -> Result<(), DialogError> {
        let state = self.sessions.get(chat_id).await;
        let mut state = state.lock().await;
        state.session.enter_mode(command.mode());
        info!("🎭 Chat {} entered {:?} mode", chat_id, command.mode());

        match command {
            Command::Start => {
                self.say(chat_id, MENU_GREETING).await?;
                let msg = self.resources.load_message("main").await?;
                self.photo(chat_id, "main").await?;
                self.say(chat_id, &msg).await?;
                self.messenger.show_menu(chat_id, Command::bot_commands()).await?;
            }
            Command::Gpt => {
                self.photo(chat_id, "gpt").await?;
                let msg = self.resources.load_message("gpt").await?;
                self.say(chat_id, &msg).await?;
            }
            Command::Date => {
                let msg = self.resources.load_message("date").await?;
                self.photo(chat_id, "date").await?;
                self.offer(chat_id, &msg, &DATE_CHOICES).await?;
            }
            Command::Message => {
                let msg = self.resources.load_message("message").await?;
                self.photo(chat_id, "message").await?;
                self.offer(chat_id, &msg, &MESSAGE_CHOICES).await?;
            }
            Command::Profile | Command::Opener => {
                let name = if command == Command::Profile { "profile" } else { "opener" };
                let msg = self.resources.load_message(name).await?;
                self.photo(chat_id, name).await?;
                self.say(chat_id, &msg).await?;

                let first = state.session.first_question().unwrap_or_default();
                self.say(chat_id, first).await?;
            }
        }

        Ok(())
    }

    /// Route free text to the handler of the chat's current mode.
    pub async fn handle_text(&self, chat_id: i64, text: &str) -> Result<(), DialogError> {
        let state = self.sessions.get(chat_id).await;
        let mut state = state.lock().await;
        let ChatState {
            session,
            conversation,
        } = &mut *state;

        info!("📨 Chat {} ({:?}): \"{}\"", chat_id, session.mode().kind(), preview(text, 50));

        let kind = session.mode().kind();
        match kind {
            // TODO: decide whether text outside any mode should point the user at /start
            ModeKind::None => {
                debug!("No active mode in chat {}, dropping text", chat_id);
            }
            ModeKind::Gpt => {
                let prompt = self.resources.load_prompt("gpt").await?;
                let answer = conversation.send_question(self.model.as_ref(), &prompt, text).await?;
                self.say(chat_id, &answer).await?;
            }
            ModeKind::Date => {
                if let Mode::Date { character: None } = session.mode() {
                    warn!("Chat {} is talking in date mode before picking a character", chat_id);
                }
                let placeholder = self.say(chat_id, TYPING).await?;
                let answer = conversation.add_message(self.model.as_ref(), text).await?;
                self.messenger.edit_text(chat_id, placeholder, &answer).await?;
            }
            ModeKind::Message => {
                session.append_history(text);
            }
            ModeKind::Profile | ModeKind::Opener => match session.answer(text) {
                Some(Progress::Ask(question)) => {
                    self.say(chat_id, question).await?;
                }
                Some(Progress::Complete) => {
                    let user_info = session.formatted_fields().unwrap_or_default();
                    self.finish_questionnaire(chat_id, kind, conversation, &user_info).await?;
                }
                Some(Progress::Finished) | None => {
                    debug!("Questionnaire in chat {} already complete", chat_id);
                }
            },
        }

        Ok(())
    }

    /// Handle a button press, matched by token prefix.
    pub async fn handle_selection(&self, chat_id: i64, callback_id: &str, token: &str) -> Result<(), DialogError> {
        let state = self.sessions.get(chat_id).await;
        let mut state = state.lock().await;
        let ChatState {
            session,
            conversation,
        } = &mut *state;

        self.messenger.answer_selection(callback_id).await?;
        info!("👆 Chat {} selected {}", chat_id, token);

        if token.starts_with(DATE_PREFIX) {
            self.photo(chat_id, token).await?;
            self.say(chat_id, DATE_CHOSEN).await?;
            let prompt = self.resources.load_prompt(token).await?;
            conversation.set_prompt(&prompt);
            if let Mode::Date { character } = session.mode_mut() {
                *character = Some(token.to_string());
            }
        } else if token.starts_with(MESSAGE_PREFIX) {
            let prompt = self.resources.load_prompt(token).await?;
            let history = session.joined_history();
            let placeholder = self.say(chat_id, THINKING).await?;
            let answer = conversation.send_question(self.model.as_ref(), &prompt, &history).await?;
            self.messenger.edit_text(chat_id, placeholder, &answer).await?;
        } else {
            warn!("Unknown selection token {:?} in chat {}", token, chat_id);
        }

        Ok(())
    }

    async fn finish_questionnaire(
        &self,
        chat_id: i64,
        kind: ModeKind,
        conversation: &mut Conversation,
        user_info: &str,
    ) -> Result<(), DialogError> {
        let (prompt_name, wait) = match kind {
            ModeKind::Profile => ("profile", PROFILE_WAIT),
            _ => ("opener", OPENER_WAIT),
        };
        let prompt = self.resources.load_prompt(prompt_name).await?;
        let placeholder = self.say(chat_id, wait).await?;
        let answer = conversation.send_question(self.model.as_ref(), &prompt, user_info).await?;
        self.messenger.edit_text(chat_id, placeholder, &answer).await?;
        Ok(())
    }

    /// Send Markdown text, swapping in a notice when the markup is unbalanced.
    async fn say(&self, chat_id: i64, text: &str) -> Result<i64, DialogError> {
        let (text, markup) = guard_markdown(text);
        Ok(self.messenger.send_text(chat_id, &text, markup).await?)
    }

    /// Like `say`, with one button per row under the text.
    async fn offer(&self, chat_id: i64, text: &str, buttons: &[Button]) -> Result<i64, DialogError> {
        let (text, markup) = guard_markdown(text);
        Ok(self.messenger.send_buttons(chat_id, &text, markup, buttons).await?)
    }

    async fn photo(&self, chat_id: i64, name: &str) -> Result<(), DialogError> {
        let image = self.resources.load_image(name).await?;
        self.messenger.send_photo(chat_id, image.data, &image.file_name).await?;
        Ok(())
    }
}
