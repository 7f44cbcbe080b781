//! Speech sinks: where normalized text goes to be spoken.
//!
//! The compose template always renders to an argument vector with the
//! message text as exactly one argument. The shell queue quotes every
//! argument before writing it to its long-lived shell, and the direct
//! sink hands the vector to the OS without any shell.

use std::io::Write;
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::Mutex;

use tracing::{debug, info, warn};

use crate::error::{Result, TtsError};

/// Values substituted into a compose template.
#[derive(Debug, Clone, Copy)]
pub struct Utterance<'a> {
    pub command: &'a str,
    pub language: &'a str,
    pub volume: &'a str,
    pub text: &'a str,
}

/// Whitespace-separated argument slots with `{command}`, `{language}`,
/// `{volume}` and `{text}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposeTemplate {
    slots: Vec<String>,
}

impl ComposeTemplate {
    pub fn parse(template: &str) -> Result<Self> {
        let slots: Vec<String> = template.split_whitespace().map(String::from).collect();
        if slots.is_empty() {
            return Err(TtsError::CommandParse("compose template is empty".into()));
        }
        if !slots.iter().any(|s| s.contains("{text}")) {
            return Err(TtsError::CommandParse(
                "compose template must contain {text}".into(),
            ));
        }
        Ok(Self { slots })
    }

    pub fn render(&self, utterance: &Utterance<'_>) -> Vec<String> {
        self.slots.iter().map(|slot| fill(slot, utterance)).collect()
    }
}

/// Single left-to-right pass so substituted values are never re-expanded.
fn fill(slot: &str, u: &Utterance<'_>) -> String {
    let mut out = String::with_capacity(slot.len());
    let mut rest = slot;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        let value = tail.find('}').and_then(|end| {
            let value = match &tail[1..end] {
                "command" => u.command,
                "language" => u.language,
                "volume" => u.volume,
                "text" => u.text,
                _ => return None,
            };
            Some((value, end))
        });
        match value {
            Some((value, end)) => {
                out.push_str(value);
                rest = &tail[end + 1..];
            }
            None => {
                out.push('{');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Quote one argument for a POSIX shell.
pub fn shell_quote(arg: &str) -> String {
    format!("'{}'", arg.replace('\'', r"'\''"))
}

/// Destination for rendered speech commands.
pub trait SpeechSink: Send {
    fn speak(&self, argv: &[String]) -> Result<()>;

    /// Release the underlying process. Later calls to `speak` fail.
    fn close(&mut self);
}

/// One shell process, started at load, fed one command line per utterance.
pub struct ShellQueueSink {
    shell: String,
    child: Option<Child>,
    stdin: Mutex<Option<ChildStdin>>,
}

impl ShellQueueSink {
    pub fn spawn(shell: &str) -> Result<Self> {
        let mut child = Command::new(shell)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| TtsError::SinkSpawn(format!("failed to spawn {shell}: {e}")))?;

        let stdin = child.stdin.take();
        info!("Speech queue started ({shell}, pid {})", child.id());

        Ok(Self {
            shell: shell.to_string(),
            child: Some(child),
            stdin: Mutex::new(stdin),
        })
    }

    /// Like [`Self::spawn`], but a failed spawn yields a sink whose
    /// writes all fail instead of an error.
    pub fn spawn_or_degrade(shell: &str) -> Self {
        match Self::spawn(shell) {
            Ok(sink) => sink,
            Err(e) => {
                warn!("{e}; speech output disabled until reload");
                Self {
                    shell: shell.to_string(),
                    child: None,
                    stdin: Mutex::new(None),
                }
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.child.is_some()
    }
}

impl SpeechSink for ShellQueueSink {
    fn speak(&self, argv: &[String]) -> Result<()> {
        let line: Vec<String> = argv.iter().map(|a| shell_quote(a)).collect();
        let line = format!("{}\n", line.join(" "));

        let mut guard = self
            .stdin
            .lock()
            .map_err(|_| TtsError::SinkWrite("speech queue lock poisoned".into()))?;
        let stdin = guard.as_mut().ok_or_else(|| {
            TtsError::SinkWrite(format!("speech queue ({}) is not running", self.shell))
        })?;

        stdin
            .write_all(line.as_bytes())
            .and_then(|()| stdin.flush())
            .map_err(|e| TtsError::SinkWrite(format!("write to {} failed: {e}", self.shell)))
    }

    fn close(&mut self) {
        if let Ok(mut guard) = self.stdin.lock() {
            guard.take();
        }
        if let Some(mut child) = self.child.take() {
            match child.wait() {
                Ok(status) => debug!("Speech queue exited: {status}"),
                Err(e) => warn!("Failed to wait for speech queue: {e}"),
            }
        }
    }
}

impl Drop for ShellQueueSink {
    fn drop(&mut self) {
        self.close();
    }
}

/// Spawns the rendered argument vector directly for every utterance.
#[derive(Default)]
pub struct DirectSink {
    closed: bool,
}

impl DirectSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SpeechSink for DirectSink {
    fn speak(&self, argv: &[String]) -> Result<()> {
        if self.closed {
            return Err(TtsError::SinkWrite("speech sink is closed".into()));
        }
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| TtsError::SinkWrite("empty speech command".into()))?;

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| TtsError::SinkWrite(format!("failed to run {program}: {e}")))?;

        // Reap in the background so speech does not block the caller.
        std::thread::spawn(move || {
            if let Err(e) = child.wait() {
                warn!("Speech command wait failed: {e}");
            }
        });
        Ok(())
    }

    fn close(&mut self) {
        self.closed = true;
    }
}
