use thiserror::Error;
use winnow::combinator::{alt, preceded};
use winnow::token::{tag, take_while1};
use winnow::{IResult, Parser};

/// A slash command typed at the chat prompt.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Help,
    Clear,
    Quit,
    History,
    Stats,
    Config,
    Models,
    Examples,
    Example(usize),
    Model(String),
    Temperature(f32),
    System(String),
    Stream(bool),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("unknown command '/{0}', try /help")]
    Unknown(String),

    #[error("usage: {0}")]
    Usage(&'static str),
}

pub fn is_command(line: &str) -> bool {
    line.trim_start().starts_with('/')
}

fn command_name(input: &str) -> IResult<&str, &str> {
    preceded(tag("/"), take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_')).parse_next(input)
}

fn toggle(input: &str) -> IResult<&str, bool> {
    alt((tag("on").value(true), tag("off").value(false))).parse_next(input)
}

/// Parses a line that starts with `/`.
pub fn parse_command(line: &str) -> Result<Command, CommandError> {
    let line = line.trim();
    let (rest, name) = command_name(line).map_err(|_| CommandError::Unknown(line.trim_start_matches('/').to_string()))?;

    // the name must be followed by whitespace or nothing
    if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
        return Err(CommandError::Unknown(line.trim_start_matches('/').to_string()));
    }
    let arg = rest.trim();

    let no_arg = |command: Command| {
        if arg.is_empty() {
            Ok(command)
        } else {
            Err(CommandError::Unknown(format!("{name} {arg}")))
        }
    };

    match name.to_ascii_lowercase().as_str() {
        "help" => no_arg(Command::Help),
        "clear" => no_arg(Command::Clear),
        "quit" | "exit" => no_arg(Command::Quit),
        "history" => no_arg(Command::History),
        "stats" => no_arg(Command::Stats),
        "config" => no_arg(Command::Config),
        "models" => no_arg(Command::Models),
        "examples" => no_arg(Command::Examples),
        "example" => arg
            .parse::<usize>()
            .ok()
            .filter(|n| *n > 0)
            .map(Command::Example)
            .ok_or(CommandError::Usage("/example <number>")),
        "model" if !arg.is_empty() && !arg.contains(char::is_whitespace) => Ok(Command::Model(arg.to_string())),
        "model" => Err(CommandError::Usage("/model <id>")),
        "temperature" | "temp" => arg
            .parse::<f32>()
            .map(Command::Temperature)
            .map_err(|_| CommandError::Usage("/temperature <0.0-2.0>")),
        "system" if !arg.is_empty() => Ok(Command::System(arg.to_string())),
        "system" => Err(CommandError::Usage("/system <instruction>")),
        "stream" => match toggle(arg) {
            Ok(("", enabled)) => Ok(Command::Stream(enabled)),
            _ => Err(CommandError::Usage("/stream on|off")),
        },
        _ => Err(CommandError::Unknown(name.to_string())),
    }
}
