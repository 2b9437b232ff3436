//! Flattens dialogues into prompt strings and chat message lists.

use super::{RoleTable, TemplateError};
use crate::dialogue::{Dialogue, Message, Turn, ASSISTANT};

/// Renders dialogues through a role meta-template.
///
/// A template is read-only after construction and can be shared freely across
/// tasks. Rendering never mutates the input dialogue; calling `render` twice
/// on the same dialogue yields the same string.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    table: RoleTable,
}

impl PromptTemplate {
    pub fn new(table: RoleTable) -> Self {
        Self { table }
    }

    /// Template for the standard OpenAI chat roles
    pub fn chat_default() -> Self {
        Self::new(RoleTable::chat_default())
    }

    pub fn table(&self) -> &RoleTable {
        &self.table
    }

    /// Flatten a dialogue into a single prompt string.
    ///
    /// Plain-text dialogues pass through unchanged. Raw turns are appended
    /// verbatim. A structured turn resolves its role (one fallback hop),
    /// then contributes begin phrase + content + end phrase. Two terminal
    /// cases differ: when the last turn's resolved role has `generate` set,
    /// its end phrase is withheld so the prompt stays open; when the last
    /// turn resolves to anything other than the assistant, the assistant's
    /// unnamed begin phrase is appended to cue the model.
    pub fn render(&self, dialogue: &Dialogue) -> Result<String, TemplateError> {
        let turns = match dialogue {
            Dialogue::Text(text) => return Ok(text.clone()),
            Dialogue::Turns(turns) => turns,
        };

        let mut prompt = String::new();
        let last = turns.len().saturating_sub(1);
        for (index, turn) in turns.iter().enumerate() {
            let message = match turn {
                Turn::Raw(fragment) => {
                    prompt.push_str(fragment);
                    continue;
                }
                Turn::Message(message) => message,
            };

            let spec = self.table.resolve(&message.role)?;
            prompt.push_str(&spec.begin_phrase(message.name.as_deref()));
            prompt.push_str(&message.content);
            if index == last && spec.generate {
                // leave the prompt open for the model to complete
                continue;
            }
            prompt.push_str(&spec.end);
            if index == last && spec.role != ASSISTANT {
                let assistant = self
                    .table
                    .get(ASSISTANT)
                    .ok_or_else(|| TemplateError::UnknownRole(ASSISTANT.to_string()))?;
                prompt.push_str(&assistant.begin_phrase(None));
            }
        }
        Ok(prompt)
    }

    /// Project a dialogue into a chat-completions message list.
    ///
    /// Roles are fallback-resolved so the wire sees only declared API roles;
    /// plain text and raw turns become user messages. Begin/end phrases and
    /// the `generate` flag only shape the flattened form, not this one.
    pub fn messages(&self, dialogue: &Dialogue) -> Result<Vec<Message>, TemplateError> {
        let turns = match dialogue {
            Dialogue::Text(text) => return Ok(vec![Message::user(text.clone())]),
            Dialogue::Turns(turns) => turns,
        };

        let mut messages = Vec::with_capacity(turns.len());
        for turn in turns {
            match turn {
                Turn::Raw(fragment) => messages.push(Message::user(fragment.clone())),
                Turn::Message(message) => {
                    let spec = self.table.resolve(&message.role)?;
                    messages.push(Message {
                        role: spec.role.clone(),
                        content: message.content.clone(),
                        name: message.name.clone(),
                    });
                }
            }
        }
        Ok(messages)
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::chat_default()
    }
}
