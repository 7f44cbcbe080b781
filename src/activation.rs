//! Per-conversation and global activation state.
//!
//! A conversation is either explicitly active, explicitly inactive, or
//! falls back to the global default. Keyword mode is the last fallback
//! and needs the message text, so it is reported as a deferred decision.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque, stable handle for a chat session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(String);

impl ConversationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ConversationId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ConversationId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Outcome of the activation lookup for one conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    Silent,
    Speak,
    /// Speak only if the message text contains a keyword.
    KeywordRequired,
}

/// How a conversation's setting is derived, for status reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationMode {
    Enabled,
    Disabled,
    Default { global_active: bool },
}

#[derive(Debug, Clone, Default)]
pub struct ActivationState {
    active: HashSet<ConversationId>,
    inactive: HashSet<ConversationId>,
    global_active: bool,
    keywords_enabled: bool,
}

impl ActivationState {
    pub fn new(global_active: bool, keywords_enabled: bool) -> Self {
        Self {
            global_active,
            keywords_enabled,
            ..Self::default()
        }
    }

    pub fn should_speak(&self, id: &ConversationId) -> Gate {
        if self.inactive.contains(id) {
            Gate::Silent
        } else if self.active.contains(id) || self.global_active {
            Gate::Speak
        } else if self.keywords_enabled {
            Gate::KeywordRequired
        } else {
            Gate::Silent
        }
    }

    pub fn is_active(&self, id: &ConversationId) -> bool {
        self.active.contains(id)
    }

    pub fn is_inactive(&self, id: &ConversationId) -> bool {
        self.inactive.contains(id)
    }

    pub fn global_active(&self) -> bool {
        self.global_active
    }

    pub fn keywords_enabled(&self) -> bool {
        self.keywords_enabled
    }

    pub fn set_conversation_active(&mut self, id: &ConversationId, active: bool) {
        if active {
            self.active.insert(id.clone());
            self.inactive.remove(id);
        } else {
            self.active.remove(id);
        }
    }

    pub fn set_conversation_inactive(&mut self, id: &ConversationId, inactive: bool) {
        if inactive {
            self.inactive.insert(id.clone());
            self.active.remove(id);
        } else {
            self.inactive.remove(id);
        }
    }

    pub fn set_global_active(&mut self, active: bool) {
        self.global_active = active;
    }

    pub fn set_keywords_enabled(&mut self, enabled: bool) {
        self.keywords_enabled = enabled;
    }

    /// `/tts buddy on`: avoids an explicit override when clearing the
    /// inactive flag already falls back to an enabled default.
    pub fn enable_conversation(&mut self, id: &ConversationId) {
        if self.is_inactive(id) && self.global_active {
            self.set_conversation_inactive(id, false);
        } else {
            self.set_conversation_active(id, true);
        }
    }

    /// `/tts buddy off`: mirror image of [`Self::enable_conversation`].
    pub fn disable_conversation(&mut self, id: &ConversationId) {
        if self.is_active(id) && !self.global_active {
            self.set_conversation_active(id, false);
        } else {
            self.set_conversation_inactive(id, true);
        }
    }

    /// `/tts on` issued from `id`.
    pub fn enable_globally(&mut self, id: &ConversationId) {
        self.set_global_active(true);
        self.set_conversation_inactive(id, false);
    }

    /// `/tts off` issued from `id`.
    pub fn disable_globally(&mut self, id: &ConversationId) {
        self.set_global_active(false);
        self.set_conversation_active(id, false);
    }

    pub fn conversation_mode(&self, id: &ConversationId) -> ConversationMode {
        if self.is_active(id) {
            ConversationMode::Enabled
        } else if self.is_inactive(id) {
            ConversationMode::Disabled
        } else {
            ConversationMode::Default {
                global_active: self.global_active,
            }
        }
    }

    /// Drop all overrides for a conversation that has been closed.
    pub fn forget(&mut self, id: &ConversationId) -> bool {
        let was_active = self.active.remove(id);
        let was_inactive = self.inactive.remove(id);
        was_active || was_inactive
    }

    pub fn tracked_conversations(&self) -> usize {
        self.active.len() + self.inactive.len()
    }
}
