//! Plugin lifecycle and event dispatch.
//!
//! A [`Plugin`] owns the preferences, the activation state and the speech
//! sink for its whole lifetime: created at load, driven by message events
//! and `/tts` commands from the host, torn down at unload.

use chrono::{DateTime, Local};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::activation::{ActivationState, ConversationId, ConversationMode};
use crate::command::{
    self, BuddyCommand, Command, CommandStatus, GlobalCommand, KeywordCommand, ReplaceCommand,
    Setting,
};
use crate::config::SinkMode;
use crate::error::{Result, TtsError};
use crate::prefs::{PreferenceStore, Preferences};
use crate::processor::{MessageProcessor, ProcessResult};
use crate::sink::{ComposeTemplate, DirectSink, ShellQueueSink, SpeechSink};

pub const PLUGIN_NAME: &str = "chat-tts";

/// Reply to a `/tts` command: a result code plus status lines for the
/// conversation view.
#[derive(Debug, Clone, Serialize)]
pub struct CommandOutcome {
    pub status: CommandStatus,
    pub lines: Vec<String>,
}

impl CommandOutcome {
    fn ok(lines: Vec<String>) -> Self {
        Self {
            status: CommandStatus::Ok,
            lines,
        }
    }

    fn failed(err: &TtsError) -> Self {
        let mut lines = vec![format!("{PLUGIN_NAME} - {err}")];
        lines.extend(command::USAGE.iter().map(|u| u.to_string()));
        Self {
            status: CommandStatus::Failed,
            lines,
        }
    }

    fn not_mine() -> Self {
        Self {
            status: CommandStatus::Continue,
            lines: Vec::new(),
        }
    }
}

/// Result of an incoming message event.
#[derive(Debug, Clone, Serialize)]
pub struct MessageOutcome {
    pub spoken: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Status lines for the conversation; only set when dispatch failed.
    pub lines: Vec<String>,
}

impl From<ProcessResult> for MessageOutcome {
    fn from(result: ProcessResult) -> Self {
        let error = result.dispatch_error.map(|e| e.to_string());
        let lines = error
            .iter()
            .map(|e| format!("{PLUGIN_NAME} - could not speak message: {e}"))
            .collect();
        Self {
            spoken: result.spoken,
            text: result.normalized_text,
            error,
            lines,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PluginStatus {
    pub active: bool,
    pub keywords_enabled: bool,
    pub profile: String,
    pub shell: String,
    pub command: String,
    pub tracked_conversations: usize,
    pub loaded_at: String,
}

pub struct Plugin {
    prefs: Preferences,
    store: Box<dyn PreferenceStore>,
    /// Set when stored preferences could not be read; the store is then
    /// never written so the unreadable file survives for repair.
    store_unreadable: bool,
    activation: ActivationState,
    sink: Box<dyn SpeechSink>,
    loaded_at: DateTime<Local>,
}

impl Plugin {
    /// Read preferences and start the speech sink.
    ///
    /// Never fails: unreadable preferences fall back to defaults and a
    /// sink that cannot start leaves the plugin loaded but mute.
    pub fn load(store: Box<dyn PreferenceStore>, mode: SinkMode) -> Self {
        let (prefs, store_unreadable) = read_prefs(store.as_ref());
        let sink: Box<dyn SpeechSink> = match mode {
            SinkMode::Shell => Box::new(ShellQueueSink::spawn_or_degrade(prefs.shell())),
            SinkMode::Direct => Box::new(DirectSink::new()),
        };
        Self::with_prefs(prefs, store_unreadable, store, sink)
    }

    /// Load with an already constructed sink.
    pub fn with_sink(store: Box<dyn PreferenceStore>, sink: Box<dyn SpeechSink>) -> Self {
        let (prefs, store_unreadable) = read_prefs(store.as_ref());
        Self::with_prefs(prefs, store_unreadable, store, sink)
    }

    fn with_prefs(
        prefs: Preferences,
        store_unreadable: bool,
        store: Box<dyn PreferenceStore>,
        sink: Box<dyn SpeechSink>,
    ) -> Self {
        let activation = ActivationState::new(prefs.active(), prefs.current().keywords_active);
        info!(
            "{PLUGIN_NAME} loaded (profile: {}, {})",
            prefs.profile_name(),
            if prefs.active() { "enabled" } else { "disabled" }
        );
        Self {
            prefs,
            store,
            store_unreadable,
            activation,
            sink,
            loaded_at: Local::now(),
        }
    }

    /// Close the sink and flush preferences.
    pub fn unload(&mut self) {
        self.sink.close();
        self.persist();
        info!("{PLUGIN_NAME} unloaded");
    }

    pub fn prefs(&self) -> &Preferences {
        &self.prefs
    }

    pub fn activation(&self) -> &ActivationState {
        &self.activation
    }

    pub fn select_profile(&mut self, name: &str) {
        self.prefs.select_profile(name);
        self.activation
            .set_keywords_enabled(self.prefs.current().keywords_active);
        self.persist();
    }

    pub fn status(&self) -> PluginStatus {
        PluginStatus {
            active: self.activation.global_active(),
            keywords_enabled: self.activation.keywords_enabled(),
            profile: self.prefs.profile_name().to_string(),
            shell: self.prefs.shell().to_string(),
            command: self.prefs.current().command.clone(),
            tracked_conversations: self.activation.tracked_conversations(),
            loaded_at: self.loaded_at.format("%Y-%m-%dT%H:%M:%S").to_string(),
        }
    }

    fn processor(&self) -> MessageProcessor<'_> {
        MessageProcessor::new(&self.activation, self.prefs.current(), self.sink.as_ref())
    }

    /// Incoming direct or group message.
    pub fn handle_message(&self, conversation: &ConversationId, raw_text: &str) -> MessageOutcome {
        self.processor().process(conversation, raw_text).into()
    }

    /// The host closed a conversation; drop its overrides.
    pub fn conversation_closed(&mut self, conversation: &ConversationId) {
        if self.activation.forget(conversation) {
            debug!("Forgot overrides for {conversation}");
        }
    }

    /// Run a command line such as `/tts keyword add urgent`.
    pub fn handle_command(&mut self, conversation: &ConversationId, line: &str) -> CommandOutcome {
        match command::parse_line(line) {
            Ok(None) => CommandOutcome::not_mine(),
            Ok(Some(cmd)) => self.execute(conversation, cmd),
            Err(e) => CommandOutcome::failed(&e),
        }
    }

    /// Run an already parsed command.
    pub fn execute(&mut self, conversation: &ConversationId, cmd: Command) -> CommandOutcome {
        let result = match cmd {
            Command::Global(cmd) => self.global(conversation, cmd),
            Command::Buddy(cmd) => Ok(self.buddy(conversation, cmd)),
            Command::Keyword(cmd) => Ok(self.keyword(cmd)),
            Command::Replace(cmd) => self.replace(cmd),
        };
        match result {
            Ok(lines) => CommandOutcome::ok(lines),
            Err(e) => CommandOutcome::failed(&e),
        }
    }

    fn global(&mut self, conversation: &ConversationId, cmd: GlobalCommand) -> Result<Vec<String>> {
        let lines = match cmd {
            GlobalCommand::Report => {
                vec![self.log_active(), self.log_conversation(conversation)]
            }
            GlobalCommand::On => {
                self.activation.enable_globally(conversation);
                self.prefs.set_active(true);
                self.persist();
                vec![self.log_active()]
            }
            GlobalCommand::Off => {
                self.activation.disable_globally(conversation);
                self.prefs.set_active(false);
                self.persist();
                vec![self.log_active()]
            }
            GlobalCommand::Status => {
                let mut lines = vec![
                    self.log_active(),
                    self.log_conversation(conversation),
                    self.log_setting(Setting::Shell),
                    self.log_setting(Setting::Command),
                    self.log_setting(Setting::Compose),
                    self.log_keywords_active(),
                    self.log_keywords(),
                ];
                lines.extend(self.log_replacements());
                lines
            }
            GlobalCommand::Show(setting) => vec![self.log_setting(setting)],
            GlobalCommand::Set(setting, value) => {
                self.set(setting, &value)?;
                self.persist();
                vec![self.log_setting(setting)]
            }
            GlobalCommand::Say(text) => {
                let outcome: MessageOutcome = self.processor().say(conversation, &text).into();
                outcome.lines
            }
            GlobalCommand::Test(text) => {
                let outcome = self.handle_message(conversation, &text);
                let mut lines = vec![if outcome.spoken {
                    format!("{PLUGIN_NAME} - echoing test string...")
                } else {
                    format!("{PLUGIN_NAME} - not echoing test string")
                }];
                lines.extend(outcome.lines);
                lines
            }
        };
        Ok(lines)
    }

    fn set(&mut self, setting: Setting, value: &str) -> Result<()> {
        match setting {
            Setting::Shell => {
                self.prefs.set_shell(value);
                info!("Shell set to {value}; takes effect on next load");
            }
            Setting::Profile => {
                self.prefs.select_profile(value);
                self.activation
                    .set_keywords_enabled(self.prefs.current().keywords_active);
            }
            Setting::Command => self.prefs.current_mut().command = value.to_string(),
            Setting::Compose => {
                ComposeTemplate::parse(value)?;
                self.prefs.current_mut().compose = value.to_string();
            }
            Setting::Language => self.prefs.current_mut().language = value.to_string(),
            Setting::Volume => self.prefs.current_mut().volume = value.to_string(),
        }
        Ok(())
    }

    fn buddy(&mut self, conversation: &ConversationId, cmd: BuddyCommand) -> Vec<String> {
        match cmd {
            BuddyCommand::Report => {}
            BuddyCommand::On => self.activation.enable_conversation(conversation),
            BuddyCommand::Off => self.activation.disable_conversation(conversation),
        }
        vec![self.log_conversation(conversation)]
    }

    fn keyword(&mut self, cmd: KeywordCommand) -> Vec<String> {
        let lines = match cmd {
            KeywordCommand::Report => return vec![self.log_keywords_active()],
            KeywordCommand::List => return vec![self.log_keywords()],
            KeywordCommand::On => {
                self.set_keywords_enabled(true);
                vec![self.log_keywords_active()]
            }
            KeywordCommand::Off => {
                self.set_keywords_enabled(false);
                vec![self.log_keywords_active()]
            }
            KeywordCommand::Add(word) => {
                self.prefs.current_mut().keywords.add(&word);
                vec![format!("{PLUGIN_NAME} - added keyword: {word}")]
            }
            KeywordCommand::Remove(word) => {
                self.prefs.current_mut().keywords.remove(&word);
                vec![format!("{PLUGIN_NAME} - removed keyword: {word}")]
            }
        };
        self.persist();
        lines
    }

    fn set_keywords_enabled(&mut self, enabled: bool) {
        self.activation.set_keywords_enabled(enabled);
        self.prefs.current_mut().keywords_active = enabled;
    }

    fn replace(&mut self, cmd: ReplaceCommand) -> Result<Vec<String>> {
        let line = match cmd {
            ReplaceCommand::List => return Ok(self.log_replacements()),
            ReplaceCommand::Remove(pattern) => {
                self.prefs.current_mut().replace.remove(&pattern);
                format!("{PLUGIN_NAME} - deleted replacement for: {pattern}")
            }
            ReplaceCommand::Add(pattern, replacement) => {
                self.prefs.current_mut().replace.add(&pattern, &replacement)?;
                format!("{PLUGIN_NAME} - added replacement for: {pattern}")
            }
        };
        self.persist();
        Ok(vec![line])
    }

    fn persist(&mut self) {
        if self.store_unreadable {
            debug!("Stored preferences unreadable, not saving");
            return;
        }
        if let Err(e) = self.store.save(&self.prefs) {
            warn!("Failed to save preferences: {e}");
        }
    }

    // --- Status lines ---

    fn log_active(&self) -> String {
        format!("{PLUGIN_NAME} is {}", on_off(self.activation.global_active()))
    }

    fn log_conversation(&self, conversation: &ConversationId) -> String {
        match self.activation.conversation_mode(conversation) {
            ConversationMode::Enabled => {
                format!("{PLUGIN_NAME} is enabled for this conversation")
            }
            ConversationMode::Disabled => {
                format!("{PLUGIN_NAME} is disabled for this conversation")
            }
            ConversationMode::Default { global_active } => format!(
                "{PLUGIN_NAME} uses the default setting ({}) for this conversation",
                on_off(global_active)
            ),
        }
    }

    fn log_setting(&self, setting: Setting) -> String {
        let profile = self.prefs.current();
        match setting {
            Setting::Shell => format!("{PLUGIN_NAME} shell is: {}", self.prefs.shell()),
            Setting::Profile => format!("{PLUGIN_NAME} profile is: {}", self.prefs.profile_name()),
            Setting::Command => format!("{PLUGIN_NAME} command is: {}", profile.command),
            Setting::Compose => format!("{PLUGIN_NAME} parameters are: {}", profile.compose),
            Setting::Language => format!("{PLUGIN_NAME} language is: {}", profile.language),
            Setting::Volume => format!("{PLUGIN_NAME} volume is: {}", profile.volume),
        }
    }

    fn log_keywords_active(&self) -> String {
        format!(
            "{PLUGIN_NAME} keywords are: {}",
            on_off(self.activation.keywords_enabled())
        )
    }

    fn log_keywords(&self) -> String {
        let words = self.prefs.current().keywords.list();
        if words.is_empty() {
            format!("{PLUGIN_NAME} active keywords: (none)")
        } else {
            format!("{PLUGIN_NAME} active keywords: {}", words.join(", "))
        }
    }

    fn log_replacements(&self) -> Vec<String> {
        let mut lines = vec![format!("{PLUGIN_NAME} active replacements:")];
        lines.extend(
            self.prefs
                .current()
                .replace
                .list()
                .iter()
                .map(|r| format!("{} => {}", r.pattern, r.replacement)),
        );
        lines
    }
}

fn on_off(enabled: bool) -> &'static str {
    if enabled {
        "enabled"
    } else {
        "disabled"
    }
}

/// Returns the preferences and whether the store failed to load.
fn read_prefs(store: &dyn PreferenceStore) -> (Preferences, bool) {
    match store.load() {
        Ok(prefs) => (prefs, false),
        Err(e) => {
            warn!("{e}; using default preferences, changes will not be saved this session");
            (Preferences::default(), true)
        }
    }
}
