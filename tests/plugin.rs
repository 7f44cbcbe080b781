use std::sync::{Arc, Mutex};

use chat_tts::activation::{ConversationId, Gate};
use chat_tts::command::CommandStatus;
use chat_tts::error::{Result, TtsError};
use chat_tts::plugin::Plugin;
use chat_tts::config::SinkMode;
use chat_tts::prefs::{MemoryPreferenceStore, Preferences, YamlPreferenceStore};
use chat_tts::sink::SpeechSink;

#[derive(Clone, Default)]
struct RecordingSink {
    spoken: Arc<Mutex<Vec<Vec<String>>>>,
    broken: bool,
}

impl RecordingSink {
    fn texts(&self) -> Vec<String> {
        self.spoken
            .lock()
            .unwrap()
            .iter()
            .map(|argv| argv.last().cloned().unwrap_or_default())
            .collect()
    }
}

impl SpeechSink for RecordingSink {
    fn speak(&self, argv: &[String]) -> Result<()> {
        if self.broken {
            return Err(TtsError::SinkWrite("broken pipe".into()));
        }
        self.spoken.lock().unwrap().push(argv.to_vec());
        Ok(())
    }

    fn close(&mut self) {}
}

fn setup(prefs: Preferences) -> (Plugin, RecordingSink, MemoryPreferenceStore) {
    let store = MemoryPreferenceStore::new(prefs);
    let sink = RecordingSink::default();
    let plugin = Plugin::with_sink(Box::new(store.clone()), Box::new(sink.clone()));
    (plugin, sink, store)
}

fn run(plugin: &mut Plugin, conv: &ConversationId, line: &str) -> Vec<String> {
    let outcome = plugin.handle_command(conv, line);
    assert_eq!(outcome.status, CommandStatus::Ok, "{line}: {:?}", outcome.lines);
    outcome.lines
}

#[test]
fn test_default_speaks_everything() {
    let (plugin, sink, _) = setup(Preferences::default());
    let c = ConversationId::from("alice");

    let outcome = plugin.handle_message(&c, "<b>hello</b> there");
    assert!(outcome.spoken);
    assert_eq!(outcome.text.as_deref(), Some("hello there"));
    assert_eq!(
        sink.spoken.lock().unwrap()[0],
        ["/usr/bin/espeak", "-v", "de", "-a", "200", "hello there"]
    );
}

#[test]
fn test_inactive_beats_keyword() {
    let (mut plugin, sink, _) = setup(Preferences::default());
    let c = ConversationId::from("c");

    run(&mut plugin, &c, "/tts off");
    run(&mut plugin, &c, "/tts keyword on");
    run(&mut plugin, &c, "/tts keyword add urgent");
    run(&mut plugin, &c, "/tts buddy off");
    assert!(plugin.activation().is_inactive(&c));

    assert!(!plugin.handle_message(&c, "this is urgent").spoken);
    assert!(sink.texts().is_empty());
}

#[test]
fn test_keyword_fallback() {
    let (mut plugin, sink, _) = setup(Preferences::default());
    let c = ConversationId::from("c");

    run(&mut plugin, &c, "/tts off");
    run(&mut plugin, &c, "/tts keyword on");
    run(&mut plugin, &c, "/tts keyword add urgent");

    assert!(plugin.handle_message(&c, "this is urgent news").spoken);
    assert!(!plugin.handle_message(&c, "ordinary text").spoken);
    assert_eq!(sink.texts(), ["this is urgent news"]);
}

#[test]
fn test_buddy_on_degrades_to_default() {
    let (mut plugin, _, _) = setup(Preferences::default());
    let c = ConversationId::from("c");

    let lines = run(&mut plugin, &c, "/tts buddy off");
    assert_eq!(lines, ["chat-tts is disabled for this conversation"]);

    let lines = run(&mut plugin, &c, "/tts buddy on");
    assert_eq!(
        lines,
        ["chat-tts uses the default setting (enabled) for this conversation"]
    );
    assert!(!plugin.activation().is_active(&c));
    assert!(!plugin.activation().is_inactive(&c));
    assert_eq!(plugin.activation().should_speak(&c), Gate::Speak);
}

#[test]
fn test_buddy_on_when_globally_off() {
    let (mut plugin, _, _) = setup(Preferences::default());
    let c = ConversationId::from("c");
    let other = ConversationId::from("other");

    run(&mut plugin, &c, "/tts off");
    let lines = run(&mut plugin, &c, "/tts buddy on");
    assert_eq!(lines, ["chat-tts is enabled for this conversation"]);

    assert!(plugin.handle_message(&c, "hi").spoken);
    assert!(!plugin.handle_message(&other, "hi").spoken);
}

#[test]
fn test_replacements_chain_through_commands() {
    let (mut plugin, sink, _) = setup(Preferences::default());
    let c = ConversationId::from("c");

    // newest rule runs first
    run(&mut plugin, &c, "/tts replace b c");
    run(&mut plugin, &c, "/tts replace a b");
    plugin.handle_message(&c, "a");

    let lines = run(&mut plugin, &c, "/tts replace");
    assert_eq!(lines, ["chat-tts active replacements:", "a => b", "b => c"]);
    assert_eq!(sink.texts(), ["c"]);

    let lines = run(&mut plugin, &c, "/tts replace a");
    assert_eq!(lines, ["chat-tts - deleted replacement for: a"]);
    assert_eq!(plugin.prefs().current().replace.len(), 1);
}

#[test]
fn test_say_and_test_commands() {
    let (mut plugin, sink, _) = setup(Preferences::default());
    let c = ConversationId::from("c");

    run(&mut plugin, &c, "/tts off");
    let lines = run(&mut plugin, &c, "/tts test hello");
    assert_eq!(lines, ["chat-tts - not echoing test string"]);

    let lines = run(&mut plugin, &c, "/tts say hello world");
    assert!(lines.is_empty());
    assert_eq!(sink.texts(), ["hello world"]);

    run(&mut plugin, &c, "/tts on");
    let lines = run(&mut plugin, &c, "/tts test it's me");
    assert_eq!(lines, ["chat-tts - echoing test string..."]);
    assert_eq!(sink.texts(), ["hello world", "its me"]);
}

#[test]
fn test_dispatch_failure_surfaces_once() {
    let store = MemoryPreferenceStore::default();
    let sink = RecordingSink {
        broken: true,
        ..Default::default()
    };
    let plugin = Plugin::with_sink(Box::new(store), Box::new(sink));
    let c = ConversationId::from("c");

    let outcome = plugin.handle_message(&c, "hello");
    assert!(outcome.spoken);
    assert!(outcome.error.is_some());
    assert_eq!(outcome.lines.len(), 1);
    assert!(outcome.lines[0].contains("could not speak"));
}

#[test]
fn test_settings_persist() {
    let (mut plugin, sink, store) = setup(Preferences::default());
    let c = ConversationId::from("c");

    assert_eq!(
        run(&mut plugin, &c, "/tts lang en"),
        ["chat-tts language is: en"]
    );
    run(&mut plugin, &c, "/tts volume 80");
    run(&mut plugin, &c, "/tts command /usr/bin/say");
    run(&mut plugin, &c, "/tts compose {command} -l {language} {text}");
    run(&mut plugin, &c, "/tts off");

    let saved = store.snapshot();
    assert!(!saved.active());
    assert_eq!(saved.current().language, "en");
    assert_eq!(saved.current().volume, "80");

    run(&mut plugin, &c, "/tts say hi");
    assert_eq!(
        sink.spoken.lock().unwrap()[0],
        ["/usr/bin/say", "-l", "en", "hi"]
    );
}

#[test]
fn test_bad_compose_rejected() {
    let (mut plugin, _, _) = setup(Preferences::default());
    let c = ConversationId::from("c");

    let outcome = plugin.handle_command(&c, "/tts compose {command} -v {language}");
    assert_eq!(outcome.status, CommandStatus::Failed);
    assert_eq!(
        plugin.prefs().current().compose,
        chat_tts::prefs::DEFAULT_COMPOSE
    );
}

#[test]
fn test_profile_switch_swaps_keyword_state() {
    let (mut plugin, _, _) = setup(Preferences::default());
    let c = ConversationId::from("c");

    run(&mut plugin, &c, "/tts keyword on");
    run(&mut plugin, &c, "/tts keyword add urgent");
    assert_eq!(
        run(&mut plugin, &c, "/tts profile quiet"),
        ["chat-tts profile is: quiet"]
    );
    assert!(!plugin.activation().keywords_enabled());
    assert_eq!(
        run(&mut plugin, &c, "/tts keyword list"),
        ["chat-tts active keywords: (none)"]
    );

    run(&mut plugin, &c, "/tts profile espeak");
    assert!(plugin.activation().keywords_enabled());
    assert_eq!(
        run(&mut plugin, &c, "/tts keyword list"),
        ["chat-tts active keywords: urgent"]
    );
}

#[test]
fn test_status_report() {
    let (mut plugin, _, _) = setup(Preferences::default());
    let c = ConversationId::from("c");

    let lines = run(&mut plugin, &c, "/tts status");
    assert_eq!(
        lines,
        [
            "chat-tts is enabled",
            "chat-tts uses the default setting (enabled) for this conversation",
            "chat-tts shell is: /bin/sh",
            "chat-tts command is: /usr/bin/espeak",
            "chat-tts parameters are: {command} -v {language} -a {volume} {text}",
            "chat-tts keywords are: disabled",
            "chat-tts active keywords: (none)",
            "chat-tts active replacements:",
        ]
    );
}

#[test]
fn test_command_result_codes() {
    let (mut plugin, _, _) = setup(Preferences::default());
    let c = ConversationId::from("c");

    assert_eq!(
        plugin.handle_command(&c, "/me waves").status,
        CommandStatus::Continue
    );
    let failed = plugin.handle_command(&c, "/tts frobnicate");
    assert_eq!(failed.status, CommandStatus::Failed);
    assert!(failed.lines.iter().any(|l| l.starts_with("/tts buddy")));
}

#[test]
fn test_closed_conversation_is_forgotten() {
    let (mut plugin, _, _) = setup(Preferences::default());
    let c = ConversationId::from("c");

    run(&mut plugin, &c, "/tts buddy off");
    assert_eq!(plugin.status().tracked_conversations, 1);

    plugin.conversation_closed(&c);
    assert_eq!(plugin.status().tracked_conversations, 0);
    assert!(plugin.handle_message(&c, "back again").spoken);
}

#[test]
fn test_unload_persists() {
    let (mut plugin, _, store) = setup(Preferences::default());
    plugin.select_profile("festival");
    plugin.unload();
    assert_eq!(store.snapshot().profile_name(), "festival");
}

#[test]
fn test_unreadable_prefs_file_left_intact() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("prefs.yaml");
    let original = "active: false\nprofiles:\n  espeak:\n    keywords: [urgent\n";
    std::fs::write(&path, original).unwrap();

    let mut plugin = Plugin::load(Box::new(YamlPreferenceStore::new(&path)), SinkMode::Direct);
    let c = ConversationId::from("c");
    assert!(plugin.activation().global_active());

    run(&mut plugin, &c, "/tts keyword add later");
    run(&mut plugin, &c, "/tts off");
    plugin.unload();

    assert_eq!(std::fs::read_to_string(&path).unwrap(), original);
}

#[test]
fn test_readable_prefs_file_saved() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("prefs.yaml");

    let mut plugin = Plugin::load(Box::new(YamlPreferenceStore::new(&path)), SinkMode::Direct);
    run(&mut plugin, &ConversationId::from("c"), "/tts keyword add urgent");
    plugin.unload();

    let saved = chat_tts::prefs::PreferenceStore::load(&YamlPreferenceStore::new(&path)).unwrap();
    assert!(saved.current().keywords.contains_match("urgent"));
}
