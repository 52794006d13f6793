//! Wire types for the Infinity-Core client protocol.
//!
//! Every frame is a JSON text message of the form
//! `{"type": "...", "payload": {...}}`. This crate only describes the frames;
//! connection handling and dispatch live in `infinity-client`.

mod message;

pub use message::{
    ChatReply, ChatRequest, ClientMessage, Notice, ServerMessage, SynthRequest, SynthResult,
    SystemCommand, SystemRequest,
};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Spacetime coordinates attached to a chat prompt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Coords {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub t: f64,
}

impl Coords {
    pub fn new(x: f64, y: f64, z: f64, t: f64) -> Self {
        Self { x, y, z, t }
    }
}

impl fmt::Display for Coords {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {}, t={})", self.x, self.y, self.z, self.t)
    }
}

/// Connection lifecycle state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConnectionState {
    /// Opening the channel.
    #[default]
    Connecting,
    /// Channel open, sends are transmitted.
    Connected,
    /// Channel closed or failed; a reconnect may be pending.
    Disconnected,
}

impl ConnectionState {
    /// Short status label for display.
    pub fn label(&self) -> &'static str {
        match self {
            ConnectionState::Connecting => "Connecting...",
            ConnectionState::Connected => "Online",
            ConnectionState::Disconnected => "Offline",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coords_serialize_as_flat_object() {
        let json = serde_json::to_value(Coords::new(1.0, 2.5, -3.0, 4.0)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"x": 1.0, "y": 2.5, "z": -3.0, "t": 4.0})
        );
    }

    #[test]
    fn state_starts_connecting() {
        assert_eq!(ConnectionState::default(), ConnectionState::Connecting);
        assert_eq!(ConnectionState::Disconnected.to_string(), "Offline");
    }
}
