//! Per-chat dialog state.
//!
//! Each mode carries only the data it needs, so entering a mode always starts
//! from empty accumulators.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::chatbot::conversation::Conversation;

/// A profile attribute collected during the questionnaires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Name,
    Sex,
    Age,
    City,
    Occupation,
    Hobby,
    Goals,
    Handsome,
    Wealth,
    Annoys,
}

impl Field {
    /// Display order of the formatted profile.
    pub const ALL: [Field; 10] = [
        Field::Name,
        Field::Sex,
        Field::Age,
        Field::City,
        Field::Occupation,
        Field::Hobby,
        Field::Goals,
        Field::Handsome,
        Field::Wealth,
        Field::Annoys,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Field::Name => "name",
            Field::Sex => "sex",
            Field::Age => "age",
            Field::City => "city",
            Field::Occupation => "occupation",
            Field::Hobby => "hobby",
            Field::Goals => "goals",
            Field::Handsome => "handsome",
            Field::Wealth => "wealth",
            Field::Annoys => "annoys",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Field::Name => "Name",
            Field::Sex => "Sex",
            Field::Age => "Age",
            Field::City => "City",
            Field::Occupation => "Occupation",
            Field::Hobby => "Hobby",
            Field::Goals => "Dating goals",
            Field::Handsome => "Attractiveness(1-10)",
            Field::Wealth => "Wealth",
            Field::Annoys => "Dislikes in people",
        }
    }
}

/// One questionnaire step: the question asked and the field its answer fills.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    pub question: &'static str,
    pub field: Field,
}

pub const PROFILE_STEPS: [Step; 5] = [
    Step {
        question: "How old are you?",
        field: Field::Age,
    },
    Step {
        question: "What do you do for a living?",
        field: Field::Occupation,
    },
    Step {
        question: "What are your hobbies?",
        field: Field::Hobby,
    },
    Step {
        question: "What annoys you in people?",
        field: Field::Annoys,
    },
    Step {
        question: "What are your dating goals?",
        field: Field::Goals,
    },
];

pub const OPENER_STEPS: [Step; 5] = [
    Step {
        question: "Partner's name?",
        field: Field::Name,
    },
    Step {
        question: "How old is your partner?",
        field: Field::Age,
    },
    Step {
        question: "Rate their looks: 1-10 points?",
        field: Field::Handsome,
    },
    Step {
        question: "What do they do for a living?",
        field: Field::Occupation,
    },
    Step {
        question: "Dating goals?",
        field: Field::Goals,
    },
];

/// Answers collected so far, kept in insertion order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Fields(Vec<(Field, String)>);

impl Fields {
    pub fn insert(&mut self, field: Field, value: impl Into<String>) {
        let value = value.into();
        match self.0.iter_mut().find(|(f, _)| *f == field) {
            Some(entry) => entry.1 = value,
            None => self.0.push((field, value)),
        }
    }

    pub fn get(&self, field: Field) -> Option<&str> {
        self.0.iter().find(|(f, _)| *f == field).map(|(_, v)| v.as_str())
    }

    pub fn keys(&self) -> Vec<&'static str> {
        self.0.iter().map(|(f, _)| f.key()).collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Render as "Label: value" lines in the fixed label order.
    pub fn format(&self) -> String {
        let mut result = String::new();
        for field in Field::ALL {
            if let Some(value) = self.get(field) {
                result.push_str(field.label());
                result.push_str(": ");
                result.push_str(value);
                result.push('\n');
            }
        }
        result
    }
}

/// Progress through a fixed list of steps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Questionnaire {
    pub steps: &'static [Step],
    pub fields: Fields,
    pub step: usize,
}

/// What recording an answer led to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Progress {
    /// More answers are needed; ask this next.
    Ask(&'static str),
    /// The last field was just filled.
    Complete,
    /// The questionnaire already finished; the answer was dropped.
    Finished,
}

impl Questionnaire {
    pub fn new(steps: &'static [Step]) -> Self {
        Self {
            steps,
            fields: Fields::default(),
            step: 0,
        }
    }

    pub fn first_question(&self) -> &'static str {
        self.steps.first().map(|s| s.question).unwrap_or_default()
    }

    /// Store `answer` in the field of the current step and advance.
    ///
    /// Answers are positional and unvalidated: whatever arrives fills the
    /// next field, empty strings included.
    pub fn record(&mut self, answer: &str) -> Progress {
        self.step += 1;
        let Some(current) = self.steps.get(self.step - 1) else {
            return Progress::Finished;
        };
        self.fields.insert(current.field, answer);
        match self.steps.get(self.step) {
            Some(next) => Progress::Ask(next.question),
            None => Progress::Complete,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeKind {
    None,
    Gpt,
    Date,
    Message,
    Profile,
    Opener,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    None,
    Gpt,
    /// Chatting with a character; `character` is the selected prompt key.
    Date { character: Option<String> },
    /// Collecting the user's correspondence.
    Message { history: Vec<String> },
    Profile(Questionnaire),
    Opener(Questionnaire),
}

impl Mode {
    pub fn kind(&self) -> ModeKind {
        match self {
            Mode::None => ModeKind::None,
            Mode::Gpt => ModeKind::Gpt,
            Mode::Date { .. } => ModeKind::Date,
            Mode::Message { .. } => ModeKind::Message,
            Mode::Profile(_) => ModeKind::Profile,
            Mode::Opener(_) => ModeKind::Opener,
        }
    }
}

#[derive(Debug)]
pub struct Session {
    mode: Mode,
}

impl Default for Session {
    fn default() -> Self {
        Self { mode: Mode::None }
    }
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> &Mode {
        &self.mode
    }

    pub fn mode_mut(&mut self) -> &mut Mode {
        &mut self.mode
    }

    /// Switch to `kind`, starting its accumulators empty.
    pub fn enter_mode(&mut self, kind: ModeKind) {
        self.mode = match kind {
            ModeKind::None => Mode::None,
            ModeKind::Gpt => Mode::Gpt,
            ModeKind::Date => Mode::Date { character: None },
            ModeKind::Message => Mode::Message {
                history: Vec::new(),
            },
            ModeKind::Profile => Mode::Profile(Questionnaire::new(&PROFILE_STEPS)),
            ModeKind::Opener => Mode::Opener(Questionnaire::new(&OPENER_STEPS)),
        };
    }

    /// Set a field directly. Returns false outside the questionnaire modes.
    pub fn record_field(&mut self, field: Field, value: &str) -> bool {
        match &mut self.mode {
            Mode::Profile(q) | Mode::Opener(q) => {
                q.fields.insert(field, value);
                true
            }
            _ => false,
        }
    }

    /// Append to the MESSAGE history. Returns false in any other mode.
    pub fn append_history(&mut self, text: &str) -> bool {
        match &mut self.mode {
            Mode::Message { history } => {
                history.push(text.to_string());
                true
            }
            _ => false,
        }
    }

    /// Feed an answer to the active questionnaire, if any.
    pub fn answer(&mut self, text: &str) -> Option<Progress> {
        match &mut self.mode {
            Mode::Profile(q) | Mode::Opener(q) => Some(q.record(text)),
            _ => None,
        }
    }

    pub fn first_question(&self) -> Option<&'static str> {
        match &self.mode {
            Mode::Profile(q) | Mode::Opener(q) => Some(q.first_question()),
            _ => None,
        }
    }

    /// Labelled answers of the active questionnaire.
    pub fn formatted_fields(&self) -> Option<String> {
        match &self.mode {
            Mode::Profile(q) | Mode::Opener(q) => Some(q.fields.format()),
            _ => None,
        }
    }

    /// History joined with blank lines; empty outside MESSAGE mode.
    pub fn joined_history(&self) -> String {
        match &self.mode {
            Mode::Message { history } => history.join("\n\n"),
            _ => String::new(),
        }
    }
}

/// Everything one chat owns: dialog mode plus model transcript.
#[derive(Debug, Default)]
pub struct ChatState {
    pub session: Session,
    pub conversation: Conversation,
}

/// Chat id to isolated state. Entries live as long as the process.
#[derive(Default)]
pub struct SessionStore {
    chats: Mutex<HashMap<i64, Arc<Mutex<ChatState>>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the state for `chat_id`, creating it on first use.
    pub async fn get(&self, chat_id: i64) -> Arc<Mutex<ChatState>> {
        let mut chats = self.chats.lock().await;
        chats.entry(chat_id).or_default().clone()
    }

    pub async fn len(&self) -> usize {
        self.chats.lock().await.len()
    }
}
