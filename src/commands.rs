use std::path::PathBuf;

pub const CLEAR_TOKEN: &str = "§";
pub const START_TOKEN: &str = "▶";
pub const STOP_TOKEN: &str = "■";

/// Chat input that drives the session instead of being sent to the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlToken {
    Clear,
    Start,
    Stop,
}

/// Matches input that is exactly one control token after trimming.
pub fn parse_control_token(input: &str) -> Option<ControlToken> {
    match input.trim() {
        CLEAR_TOKEN => Some(ControlToken::Clear),
        START_TOKEN => Some(ControlToken::Start),
        STOP_TOKEN => Some(ControlToken::Stop),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlashCommand {
    Help,
    Models,
    Model(String),
    Attach(PathBuf),
    Upload(PathBuf),
    Quit,
    MissingArgument(String),
    Unknown(String),
}

pub fn parse_slash_command(input: &str) -> Option<SlashCommand> {
    let trimmed = input.trim();
    if !trimmed.starts_with('/') {
        return None;
    }

    let (command, argument) = match trimmed.split_once(char::is_whitespace) {
        Some((command, rest)) => (command, rest.trim()),
        None => (trimmed, ""),
    };

    let parsed = match (command, argument) {
        ("/help", _) => SlashCommand::Help,
        ("/models", _) => SlashCommand::Models,
        ("/quit", _) => SlashCommand::Quit,
        ("/model" | "/attach" | "/upload", "") => {
            SlashCommand::MissingArgument(command.to_string())
        }
        ("/model", name) => SlashCommand::Model(name.to_string()),
        ("/attach", path) => SlashCommand::Attach(PathBuf::from(path)),
        ("/upload", path) => SlashCommand::Upload(PathBuf::from(path)),
        _ => SlashCommand::Unknown(command.to_string()),
    };

    Some(parsed)
}
