//! Trigger words for keyword-activated speech.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeywordSet {
    words: Vec<String>,
}

impl KeywordSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `word` at the front unless it is already present.
    pub fn add(&mut self, word: &str) -> bool {
        if self.words.iter().any(|w| w == word) {
            return false;
        }
        self.words.insert(0, word.to_string());
        true
    }

    pub fn remove(&mut self, word: &str) -> bool {
        let before = self.words.len();
        self.words.retain(|w| w != word);
        self.words.len() != before
    }

    /// First keyword (in set order) that occurs as a case-sensitive
    /// substring of `text`.
    pub fn find_match(&self, text: &str) -> Option<&str> {
        self.words
            .iter()
            .find(|w| !w.is_empty() && text.contains(w.as_str()))
            .map(String::as_str)
    }

    pub fn contains_match(&self, text: &str) -> bool {
        self.find_match(text).is_some()
    }

    pub fn list(&self) -> &[String] {
        &self.words
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}
