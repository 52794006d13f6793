//! Parsing of console input lines.

use infinity_client::Coords;
use std::path::PathBuf;

pub const HELP: &str = "\
commands:
  <text>               send a chat prompt
  /coords x y z t      attach spacetime coordinates to prompts
  /coords off          stop attaching coordinates
  /synth <prompt>      synthesize audio
  /cancel              stop waiting for a synthesis result
  /load <path>         load a module from a file
  /save                save model state
  /log                 show the system log
  /status              show the connection state
  /reconnect           reconnect now
  /quit                exit";

#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    Chat(String),
    Coords(Option<Coords>),
    Synth(String),
    Cancel,
    Load(PathBuf),
    Save,
    Log,
    Status,
    Reconnect,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InputError {
    #[error("unknown command /{0} (try /help)")]
    Unknown(String),
    #[error("usage: {0}")]
    Usage(&'static str),
}

/// Parse one line. Blank lines yield `None`.
pub fn parse(line: &str) -> Result<Option<Input>, InputError> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let Some(command) = trimmed.strip_prefix('/') else {
        return Ok(Some(Input::Chat(line.trim_end().to_string())));
    };

    let (name, rest) = command
        .split_once(char::is_whitespace)
        .map(|(name, rest)| (name, rest.trim()))
        .unwrap_or((command, ""));

    let input = match name {
        "coords" => Input::Coords(parse_coords(rest)?),
        "synth" if !rest.is_empty() => Input::Synth(rest.to_string()),
        "synth" => return Err(InputError::Usage("/synth <prompt>")),
        "cancel" => Input::Cancel,
        "load" if !rest.is_empty() => Input::Load(PathBuf::from(rest)),
        "load" => return Err(InputError::Usage("/load <path>")),
        "save" => Input::Save,
        "log" => Input::Log,
        "status" => Input::Status,
        "reconnect" => Input::Reconnect,
        "help" | "?" => Input::Help,
        "quit" | "exit" => Input::Quit,
        other => return Err(InputError::Unknown(other.to_string())),
    };
    Ok(Some(input))
}

fn parse_coords(rest: &str) -> Result<Option<Coords>, InputError> {
    const USAGE: &str = "/coords x y z t | /coords off";
    if rest == "off" {
        return Ok(None);
    }
    let values = rest
        .split_whitespace()
        .map(str::parse::<f64>)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| InputError::Usage(USAGE))?;
    match values.as_slice() {
        &[x, y, z, t] => Ok(Some(Coords::new(x, y, z, t))),
        _ => Err(InputError::Usage(USAGE)),
    }
}
