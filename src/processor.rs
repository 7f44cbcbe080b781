//! Per-message gating, normalization and dispatch.
//!
//! Inactive conversations are vetoed first. Otherwise a message is spoken
//! when the conversation or the global default is active, or when keyword
//! mode is on and the raw text contains a keyword. Spoken text is stripped
//! of markup and unsafe characters, rewritten by the replacement table,
//! rendered through the compose template, and handed to the sink.

use tracing::{debug, warn};

use crate::activation::{ActivationState, ConversationId, Gate};
use crate::error::TtsError;
use crate::normalize::normalize;
use crate::prefs::Profile;
use crate::sink::{ComposeTemplate, SpeechSink, Utterance};

#[derive(Debug, Default)]
pub struct ProcessResult {
    /// The message passed the gate.
    pub spoken: bool,
    pub normalized_text: Option<String>,
    /// Set when the message passed the gate but could not be handed off.
    pub dispatch_error: Option<TtsError>,
}

impl ProcessResult {
    fn silent() -> Self {
        Self::default()
    }
}

pub struct MessageProcessor<'a> {
    activation: &'a ActivationState,
    profile: &'a Profile,
    sink: &'a dyn SpeechSink,
}

impl<'a> MessageProcessor<'a> {
    pub fn new(
        activation: &'a ActivationState,
        profile: &'a Profile,
        sink: &'a dyn SpeechSink,
    ) -> Self {
        Self {
            activation,
            profile,
            sink,
        }
    }

    /// Gate and speak an incoming message.
    pub fn process(&self, conversation: &ConversationId, raw_text: &str) -> ProcessResult {
        match self.activation.should_speak(conversation) {
            Gate::Silent => return ProcessResult::silent(),
            Gate::Speak => {}
            Gate::KeywordRequired => match self.profile.keywords.find_match(raw_text) {
                Some(word) => debug!("Keyword '{word}' matched in {conversation}"),
                None => return ProcessResult::silent(),
            },
        }
        self.speak(raw_text)
    }

    /// Speak `raw_text` regardless of global and keyword state. An
    /// inactive conversation still vetoes it.
    pub fn say(&self, conversation: &ConversationId, raw_text: &str) -> ProcessResult {
        if self.activation.is_inactive(conversation) {
            return ProcessResult::silent();
        }
        self.speak(raw_text)
    }

    /// Normalized form of `raw_text` as it would be spoken.
    pub fn prepare(&self, raw_text: &str) -> String {
        self.profile.replace.apply(&normalize(raw_text))
    }

    fn speak(&self, raw_text: &str) -> ProcessResult {
        let text = self.prepare(raw_text);

        let dispatch_error = if text.trim().is_empty() {
            debug!("Nothing left to say after normalization");
            None
        } else {
            self.dispatch(&text).err()
        };

        ProcessResult {
            spoken: true,
            normalized_text: Some(text),
            dispatch_error,
        }
    }

    fn dispatch(&self, text: &str) -> Result<(), TtsError> {
        debug!("Echoing: '{text}'");
        let template = ComposeTemplate::parse(&self.profile.compose)?;
        let argv = template.render(&Utterance {
            command: &self.profile.command,
            language: &self.profile.language,
            volume: &self.profile.volume,
            text,
        });
        self.sink.speak(&argv).inspect_err(|e| {
            warn!("Error while executing {}: {e}", self.profile.command);
        })
    }
}
