//! Protocol messages.
//!
//! Both directions use the same adjacently tagged envelope: the variant name
//! goes in `type`, its fields in `payload`.

use crate::Coords;
use serde::{Deserialize, Serialize};

/// Messages sent from client to server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ClientMessage {
    /// A chat prompt, optionally anchored at spacetime coordinates.
    Chat(ChatRequest),
    /// A runtime control command.
    System(SystemRequest),
    /// An audio synthesis prompt.
    Synth(SynthRequest),
}

impl ClientMessage {
    pub fn chat(prompt: impl Into<String>, coords: Option<Coords>) -> Self {
        Self::Chat(ChatRequest {
            prompt: prompt.into(),
            coords,
        })
    }

    pub fn save_state() -> Self {
        Self::System(SystemRequest {
            command: SystemCommand::SaveState,
            code: None,
        })
    }

    pub fn load_module(code: impl Into<String>) -> Self {
        Self::System(SystemRequest {
            command: SystemCommand::LoadModule,
            code: Some(code.into()),
        })
    }

    pub fn synth(prompt: impl Into<String>) -> Self {
        Self::Synth(SynthRequest {
            prompt: prompt.into(),
        })
    }

    /// The value of the `type` discriminant this message is sent with.
    pub fn kind(&self) -> &'static str {
        match self {
            ClientMessage::Chat(_) => "chat",
            ClientMessage::System(_) => "system",
            ClientMessage::Synth(_) => "synth",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coords: Option<Coords>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemRequest {
    pub command: SystemCommand,
    /// Module source, only sent with `load_module`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

/// Commands understood by the server's system channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemCommand {
    SaveState,
    LoadModule,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SynthRequest {
    pub prompt: String,
}

/// Messages sent from server to client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ServerMessage {
    /// A chat reply from the model.
    Chat(ChatReply),
    /// Finished audio synthesis.
    Synth(SynthResult),
    /// Informational notice for the system log.
    System(Notice),
    /// Server-side failure report.
    Error(Notice),
}

impl ServerMessage {
    /// Discriminant values the client knows how to decode.
    pub const KINDS: [&'static str; 4] = ["chat", "synth", "system", "error"];

    /// Whether `kind` names a known server message.
    pub fn recognizes(kind: &str) -> bool {
        Self::KINDS.contains(&kind)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatReply {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SynthResult {
    /// Base64-encoded audio bytes.
    pub audio_b64: String,
    /// Prompt the audio was generated from.
    pub prompt: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub message: String,
}
