//! Per-model conversation log.

use std::collections::HashMap;
use std::path::PathBuf;

/// One entry of a conversation. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Turn {
    User(String),
    Assistant(String),
    Image { path: PathBuf, caption: String },
}

/// Authoritative turn history keyed by model identifier.
///
/// Insertion order is chronological order. Operations on one model never touch
/// another model's turns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationStore {
    conversations: HashMap<String, Vec<Turn>>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, model: &str, turn: Turn) {
        self.conversation_mut(model).push(turn);
    }

    /// Returns the turns recorded for `model`, or an empty slice for an unknown model.
    pub fn turns_for(&self, model: &str) -> &[Turn] {
        self.conversations
            .get(model)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Replaces the text of a tail `Assistant` turn, or appends one when the tail is
    /// anything else.
    pub fn replace_last_assistant_turn(&mut self, model: &str, text: impl Into<String>) {
        let text = text.into();
        let turns = self.conversation_mut(model);

        if let Some(Turn::Assistant(last)) = turns.last_mut() {
            *last = text;
        } else {
            turns.push(Turn::Assistant(text));
        }
    }

    /// Empties the conversation for `model` only. The conversation keeps existing.
    pub fn clear(&mut self, model: &str) {
        if let Some(turns) = self.conversations.get_mut(model) {
            turns.clear();
        }
    }

    pub fn has_conversation(&self, model: &str) -> bool {
        self.conversations.contains_key(model)
    }

    fn conversation_mut(&mut self, model: &str) -> &mut Vec<Turn> {
        self.conversations.entry(model.to_string()).or_default()
    }
}
