//! Dialogue types
//!
//! A dialogue is either a pre-rendered prompt string or an ordered list of
//! turns. Turns are raw text fragments or structured role messages, which is
//! also the shape the chat-completions wire format expects.

use serde::{Deserialize, Serialize};

/// Built-in role names understood by the default chat template
pub const SYSTEM: &str = "system";
pub const USER: &str = "user";
pub const ASSISTANT: &str = "assistant";
pub const ENVIRONMENT: &str = "environment";

/// One structured conversation turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,

    /// Optional speaker name (e.g. a tool or persona identity)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Message {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
            name: None,
        }
    }

    pub fn named(
        role: impl Into<String>,
        name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
            name: Some(name.into()),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(SYSTEM, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(USER, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(ASSISTANT, content)
    }
}

/// One entry of a structured dialogue: opaque text or a role message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Turn {
    Raw(String),
    Message(Message),
}

impl From<Message> for Turn {
    fn from(m: Message) -> Self {
        Turn::Message(m)
    }
}

impl From<&str> for Turn {
    fn from(s: &str) -> Self {
        Turn::Raw(s.to_string())
    }
}

impl From<String> for Turn {
    fn from(s: String) -> Self {
        Turn::Raw(s)
    }
}

/// Input accepted by the renderer and the dispatch client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Dialogue {
    /// Already-rendered prompt; passes through the renderer unchanged
    Text(String),
    /// Ordered conversation turns
    Turns(Vec<Turn>),
}

impl Dialogue {
    /// Number of turns (a plain string counts as one)
    pub fn len(&self) -> usize {
        match self {
            Dialogue::Text(_) => 1,
            Dialogue::Turns(turns) => turns.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Dialogue::Text(s) => s.is_empty(),
            Dialogue::Turns(turns) => turns.is_empty(),
        }
    }
}

impl From<&str> for Dialogue {
    fn from(s: &str) -> Self {
        Dialogue::Text(s.to_string())
    }
}

impl From<String> for Dialogue {
    fn from(s: String) -> Self {
        Dialogue::Text(s)
    }
}

impl From<Vec<Turn>> for Dialogue {
    fn from(turns: Vec<Turn>) -> Self {
        Dialogue::Turns(turns)
    }
}

impl From<Vec<Message>> for Dialogue {
    fn from(messages: Vec<Message>) -> Self {
        Dialogue::Turns(messages.into_iter().map(Turn::Message).collect())
    }
}

impl From<Message> for Dialogue {
    fn from(m: Message) -> Self {
        Dialogue::Turns(vec![Turn::Message(m)])
    }
}
