//! Ordered text substitution rules.
//!
//! Rules run in table order and each rule sees the output of the one
//! before it, so a replacement can itself be rewritten by a later rule.

use serde::{Deserialize, Serialize};

use crate::error::{Result, TtsError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Replacement {
    pub pattern: String,
    pub replacement: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReplacementTable {
    entries: Vec<Replacement>,
}

impl ReplacementTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or overwrite the rule for `pattern`.
    ///
    /// An existing rule is removed first and the new one goes to the front
    /// of the table.
    pub fn add(&mut self, pattern: &str, replacement: &str) -> Result<()> {
        if pattern.is_empty() {
            return Err(TtsError::InvalidPattern);
        }
        self.remove(pattern);
        self.entries.insert(
            0,
            Replacement {
                pattern: pattern.to_string(),
                replacement: replacement.to_string(),
            },
        );
        Ok(())
    }

    /// Remove the rule for `pattern`. Returns whether a rule was removed.
    pub fn remove(&mut self, pattern: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.pattern != pattern);
        self.entries.len() != before
    }

    pub fn apply(&self, text: &str) -> String {
        let mut buffer = text.to_string();
        for entry in &self.entries {
            // Stored tables may predate the empty-pattern check.
            if entry.pattern.is_empty() {
                continue;
            }
            if buffer.contains(entry.pattern.as_str()) {
                buffer = buffer.replace(entry.pattern.as_str(), &entry.replacement);
            }
        }
        buffer
    }

    pub fn list(&self) -> &[Replacement] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
