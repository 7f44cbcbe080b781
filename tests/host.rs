use chat_tts::config::SinkMode;
use chat_tts::host;
use chat_tts::plugin::Plugin;
use chat_tts::prefs::MemoryPreferenceStore;
use serde_json::{json, Value};

fn replies(output: &[u8]) -> Vec<Value> {
    String::from_utf8_lossy(output)
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect()
}

#[tokio::test]
async fn json_lines_round_trip() {
    // Direct mode never spawns anything until a message is spoken.
    let mut plugin = Plugin::load(Box::new(MemoryPreferenceStore::default()), SinkMode::Direct);

    let input = [
        json!({ "type": "command", "conversation": "c", "line": "/tts off" }),
        json!({ "type": "message", "conversation": "c", "text": "quiet please" }),
        json!({ "type": "closed", "conversation": "c" }),
        json!({ "type": "status" }),
    ]
    .iter()
    .map(|v| v.to_string())
    .collect::<Vec<_>>()
    .join("\n")
        + "\nnot json\n";

    let mut output = Vec::new();
    host::run(&mut plugin, input.as_bytes(), &mut output)
        .await
        .unwrap();
    plugin.unload();

    let replies = replies(&output);
    assert_eq!(replies.len(), 5);
    assert_eq!(replies[0]["status"], json!("ok"));
    assert_eq!(replies[0]["lines"], json!(["chat-tts is disabled"]));
    assert_eq!(replies[1]["spoken"], json!(false));
    assert_eq!(replies[2]["status"], json!("ok"));
    assert_eq!(replies[3]["active"], json!(false));
    assert!(replies[4]["error"].is_string());
}
