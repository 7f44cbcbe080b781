//! Line-oriented host bridge.
//!
//! Reads one JSON event per line and writes one JSON reply per line, for
//! chat clients that would rather pipe events than speak HTTP.

use serde::Deserialize;
use serde_json::json;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, warn};

use crate::activation::ConversationId;
use crate::plugin::Plugin;

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum HostEvent {
    Message { conversation: String, text: String },
    Command { conversation: String, line: String },
    Closed { conversation: String },
    Status,
}

pub fn handle_event(plugin: &mut Plugin, event: HostEvent) -> serde_json::Value {
    match event {
        HostEvent::Message { conversation, text } => {
            json!(plugin.handle_message(&ConversationId::from(conversation), &text))
        }
        HostEvent::Command { conversation, line } => {
            json!(plugin.handle_command(&ConversationId::from(conversation), &line))
        }
        HostEvent::Closed { conversation } => {
            plugin.conversation_closed(&ConversationId::from(conversation));
            json!({ "status": "ok" })
        }
        HostEvent::Status => json!(plugin.status()),
    }
}

/// Process events until the reader is exhausted.
pub async fn run<R, W>(plugin: &mut Plugin, reader: R, mut writer: W) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let reply = match serde_json::from_str::<HostEvent>(&line) {
            Ok(event) => {
                debug!("Host event: {event:?}");
                handle_event(plugin, event)
            }
            Err(e) => {
                warn!("Bad host event: {e}");
                json!({ "error": e.to_string() })
            }
        };
        writer.write_all(format!("{reply}\n").as_bytes()).await?;
        writer.flush().await?;
    }
    Ok(())
}

/// Run against the process's stdin and stdout.
pub async fn run_stdio(plugin: &mut Plugin) -> std::io::Result<()> {
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    run(plugin, stdin, tokio::io::stdout()).await
}
