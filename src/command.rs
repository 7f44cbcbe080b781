//! `/tts` chat command parsing.
//!
//! Four handler groups share the `tts` command name. Each one claims
//! lines whose first word is its own and declines the rest, which lets
//! the next group try. The global group claims everything left over.

use serde::Serialize;

use crate::error::{Result, TtsError};

pub const CMD_TTS: &str = "tts";

/// Result code reported back to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandStatus {
    Ok,
    /// Bad arguments or unknown subcommand.
    Failed,
    /// Not a `/tts` command.
    Continue,
}

/// Settings that can be shown or changed with `/tts <setting> [value]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Setting {
    Shell,
    Command,
    Compose,
    Profile,
    Language,
    Volume,
}

impl Setting {
    fn from_word(word: &str) -> Option<Self> {
        Some(match word {
            "shell" => Self::Shell,
            "command" => Self::Command,
            "compose" => Self::Compose,
            "profile" => Self::Profile,
            "lang" => Self::Language,
            "volume" => Self::Volume,
            _ => return None,
        })
    }

    /// Whether `/tts <setting>` without a value reports it.
    fn showable(self) -> bool {
        matches!(self, Self::Shell | Self::Command | Self::Compose)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GlobalCommand {
    Report,
    On,
    Off,
    Status,
    Show(Setting),
    Set(Setting, String),
    Say(String),
    Test(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuddyCommand {
    Report,
    On,
    Off,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeywordCommand {
    Report,
    On,
    Off,
    List,
    Add(String),
    Remove(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplaceCommand {
    List,
    Remove(String),
    Add(String, String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Global(GlobalCommand),
    Buddy(BuddyCommand),
    Keyword(KeywordCommand),
    Replace(ReplaceCommand),
}

/// Split `input` into at most `max` arguments. The last one takes the
/// rest of the line, inner whitespace included.
pub fn split_args(input: &str, max: usize) -> Vec<String> {
    let mut args = Vec::new();
    let mut rest = input.trim();
    while !rest.is_empty() {
        if args.len() + 1 == max {
            args.push(rest.to_string());
            break;
        }
        let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        args.push(rest[..end].to_string());
        rest = rest[end..].trim_start();
    }
    args
}

/// Parse a full command line such as `tts buddy on` (leading `/` optional).
///
/// `Ok(None)` means the line is not a `/tts` command at all.
pub fn parse_line(line: &str) -> Result<Option<Command>> {
    let line = line.trim().trim_start_matches('/');
    let (name, rest) = match line.find(char::is_whitespace) {
        Some(end) => (&line[..end], &line[end..]),
        None => (line, ""),
    };
    if name != CMD_TTS {
        return Ok(None);
    }
    parse(rest).map(Some)
}

/// Parse the arguments following `/tts`.
pub fn parse(input: &str) -> Result<Command> {
    let args = split_args(input, 3);
    if let Some(cmd) = parse_buddy(&args) {
        return cmd.map(Command::Buddy);
    }
    if let Some(cmd) = parse_keyword(&args) {
        return cmd.map(Command::Keyword);
    }
    if let Some(cmd) = parse_replace(&args) {
        return cmd.map(Command::Replace);
    }
    parse_global(&split_args(input, 2)).map(Command::Global)
}

fn failed(msg: impl Into<String>) -> TtsError {
    TtsError::CommandParse(msg.into())
}

fn parse_buddy(args: &[String]) -> Option<Result<BuddyCommand>> {
    if args.first()? != "buddy" {
        return None;
    }
    Some(match args.get(1).map(String::as_str) {
        None => Ok(BuddyCommand::Report),
        Some("on") => Ok(BuddyCommand::On),
        Some("off") => Ok(BuddyCommand::Off),
        Some(other) => Err(failed(format!("unknown buddy option: {other}"))),
    })
}

fn parse_keyword(args: &[String]) -> Option<Result<KeywordCommand>> {
    if args.first()? != "keyword" {
        return None;
    }
    let sub = args.get(1).map(String::as_str);
    Some(match (sub, args.get(2)) {
        (None, _) => Ok(KeywordCommand::Report),
        (Some("on"), None) => Ok(KeywordCommand::On),
        (Some("off"), None) => Ok(KeywordCommand::Off),
        (Some("list"), None) => Ok(KeywordCommand::List),
        (Some("add"), Some(word)) => Ok(KeywordCommand::Add(word.clone())),
        (Some("remove"), Some(word)) => Ok(KeywordCommand::Remove(word.clone())),
        (Some(other), _) => Err(failed(format!("bad keyword arguments: {other}"))),
    })
}

fn parse_replace(args: &[String]) -> Option<Result<ReplaceCommand>> {
    if args.first()? != "replace" {
        return None;
    }
    Some(Ok(match (args.get(1), args.get(2)) {
        (None, _) => ReplaceCommand::List,
        (Some(pattern), None) => ReplaceCommand::Remove(pattern.clone()),
        (Some(pattern), Some(replacement)) => {
            ReplaceCommand::Add(pattern.clone(), replacement.clone())
        }
    }))
}

fn parse_global(args: &[String]) -> Result<GlobalCommand> {
    let Some(word) = args.first() else {
        return Ok(GlobalCommand::Report);
    };
    let value = args.get(1);

    match (word.as_str(), value) {
        ("on", None) => Ok(GlobalCommand::On),
        ("off", None) => Ok(GlobalCommand::Off),
        ("status", None) => Ok(GlobalCommand::Status),
        ("say", Some(text)) => Ok(GlobalCommand::Say(text.clone())),
        ("test", Some(text)) => Ok(GlobalCommand::Test(text.clone())),
        (word, value) => match (Setting::from_word(word), value) {
            (Some(setting), None) if setting.showable() => Ok(GlobalCommand::Show(setting)),
            (Some(setting), Some(value)) => Ok(GlobalCommand::Set(setting, value.clone())),
            _ => Err(failed(format!("unknown or incomplete command: {word}"))),
        },
    }
}

/// Help lines shown when a command fails.
pub const USAGE: &[&str] = &[
    "/tts [on | off | status | shell <path> | command <path> | compose <template> | profile <name> | lang <code> | volume <n> | say <text> | test <text>]",
    "/tts buddy [on | off]",
    "/tts keyword [on | off | list | add <keyword> | remove <keyword>]",
    "/tts replace [<word> [<replacement>]]",
];

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &str) -> String {
        v.to_string()
    }

    #[test]
    fn test_split_args_rest_of_line() {
        assert_eq!(split_args("  say hello   big world ", 2), ["say", "hello   big world"]);
        assert_eq!(split_args("replace brb be right back", 3), ["replace", "brb", "be right back"]);
        assert_eq!(split_args("", 3), Vec::<String>::new());
        assert_eq!(split_args("on", 2), ["on"]);
    }

    #[test]
    fn test_parse_line_filters_other_commands() {
        assert_eq!(parse_line("/me waves").unwrap(), None);
        assert_eq!(parse_line("ttsx on").unwrap(), None);
        assert_eq!(
            parse_line("/tts on").unwrap(),
            Some(Command::Global(GlobalCommand::On))
        );
        assert_eq!(
            parse_line("tts").unwrap(),
            Some(Command::Global(GlobalCommand::Report))
        );
    }

    #[test]
    fn test_parse_global() {
        assert_eq!(parse("status").unwrap(), Command::Global(GlobalCommand::Status));
        assert_eq!(
            parse("say hello there").unwrap(),
            Command::Global(GlobalCommand::Say(s("hello there")))
        );
        assert_eq!(
            parse("compose {command} {text}").unwrap(),
            Command::Global(GlobalCommand::Set(Setting::Compose, s("{command} {text}")))
        );
        assert_eq!(
            parse("shell").unwrap(),
            Command::Global(GlobalCommand::Show(Setting::Shell))
        );
        assert_eq!(
            parse("lang en").unwrap(),
            Command::Global(GlobalCommand::Set(Setting::Language, s("en")))
        );
    }

    #[test]
    fn test_parse_global_failures() {
        for input in ["say", "test", "lang", "volume", "profile", "bogus", "on now"] {
            assert!(
                matches!(parse(input), Err(TtsError::CommandParse(_))),
                "{input} should fail"
            );
        }
    }

    #[test]
    fn test_parse_buddy() {
        assert_eq!(parse("buddy").unwrap(), Command::Buddy(BuddyCommand::Report));
        assert_eq!(parse("buddy on").unwrap(), Command::Buddy(BuddyCommand::On));
        assert_eq!(parse("buddy off").unwrap(), Command::Buddy(BuddyCommand::Off));
        assert!(parse("buddy maybe").is_err());
    }

    #[test]
    fn test_parse_keyword() {
        assert_eq!(parse("keyword").unwrap(), Command::Keyword(KeywordCommand::Report));
        assert_eq!(parse("keyword list").unwrap(), Command::Keyword(KeywordCommand::List));
        assert_eq!(
            parse("keyword add red alert").unwrap(),
            Command::Keyword(KeywordCommand::Add(s("red alert")))
        );
        assert_eq!(
            parse("keyword remove urgent").unwrap(),
            Command::Keyword(KeywordCommand::Remove(s("urgent")))
        );
        assert!(parse("keyword add").is_err());
        assert!(parse("keyword on please").is_err());
    }

    #[test]
    fn test_parse_replace() {
        assert_eq!(parse("replace").unwrap(), Command::Replace(ReplaceCommand::List));
        assert_eq!(
            parse("replace brb").unwrap(),
            Command::Replace(ReplaceCommand::Remove(s("brb")))
        );
        assert_eq!(
            parse("replace brb be right back").unwrap(),
            Command::Replace(ReplaceCommand::Add(s("brb"), s("be right back")))
        );
    }
}
