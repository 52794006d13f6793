//! Per-feature state fed by the router: chat history, system log and the last
//! synthesized clip.

use crate::router::{self, InboundHandler};
use crate::{AudioClip, ConnectionEvent};
use infinity_core::{ClientMessage, ConnectionState, Coords};
use uuid::Uuid;

/// System log line written when the channel opens.
pub const ESTABLISHED_NOTICE: &str = "Connection to Infinity-Core established.";
/// System log line written when the channel drops.
pub const LOST_NOTICE: &str = "Connection to Infinity-Core lost. Reconnecting...";
/// Text of the provisional reply shown while waiting.
pub const TYPING_TEXT: &str = "...";

/// Who an entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sender {
    User,
    Ai,
    System,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatEntry {
    pub id: Uuid,
    pub text: String,
    pub sender: Sender,
    /// Provisional placeholder, removed by the next inbound frame.
    pub typing: bool,
    pub coords: Option<Coords>,
}

impl ChatEntry {
    pub fn new(sender: Sender, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: text.into(),
            sender,
            typing: false,
            coords: None,
        }
    }

    pub fn placeholder() -> Self {
        Self {
            typing: true,
            ..Self::new(Sender::Ai, TYPING_TEXT)
        }
    }

    pub fn with_coords(mut self, coords: Option<Coords>) -> Self {
        self.coords = coords;
        self
    }
}

/// Client-side view of one session with the server.
#[derive(Debug, Default)]
pub struct Session {
    chat: Vec<ChatEntry>,
    system_log: Vec<ChatEntry>,
    audio: Option<AudioClip>,
    synth_pending: bool,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn chat(&self) -> &[ChatEntry] {
        &self.chat
    }

    pub fn system_log(&self) -> &[ChatEntry] {
        &self.system_log
    }

    /// The most recent synthesized clip.
    pub fn audio(&self) -> Option<&AudioClip> {
        self.audio.as_ref()
    }

    pub fn synth_pending(&self) -> bool {
        self.synth_pending
    }

    /// Record a user prompt and build the request for it.
    ///
    /// Blank prompts and prompts typed while not connected are ignored. The
    /// prompt is paired with a typing placeholder until the next frame.
    pub fn submit_chat(
        &mut self,
        text: &str,
        coords: Option<Coords>,
        state: ConnectionState,
    ) -> Option<ClientMessage> {
        if text.trim().is_empty() || state != ConnectionState::Connected {
            return None;
        }
        self.chat
            .push(ChatEntry::new(Sender::User, text).with_coords(coords));
        self.chat.push(ChatEntry::placeholder());
        Some(ClientMessage::chat(text, coords))
    }

    /// Request that `code` be loaded into the running core.
    pub fn load_module(&self, code: &str) -> Option<ClientMessage> {
        (!code.trim().is_empty()).then(|| ClientMessage::load_module(code))
    }

    pub fn save_state(&self) -> ClientMessage {
        ClientMessage::save_state()
    }

    /// Start a synthesis. Ignored while one is already pending.
    pub fn synthesize(&mut self, prompt: &str) -> Option<ClientMessage> {
        if prompt.trim().is_empty() || self.synth_pending {
            return None;
        }
        self.synth_pending = true;
        Some(ClientMessage::synth(prompt))
    }

    /// Forget a synthesis whose request never left.
    pub fn abort_synth(&mut self) {
        self.synth_pending = false;
    }

    /// Fold a connection event into the session.
    pub fn apply(&mut self, event: ConnectionEvent) {
        match event {
            ConnectionEvent::Established => self.log(ESTABLISHED_NOTICE),
            ConnectionEvent::Lost { .. } => {
                // A reply can't arrive on the new channel.
                self.synth_pending = false;
                self.log(LOST_NOTICE);
            }
            ConnectionEvent::Frame(raw) => {
                router::dispatch(&raw, self);
            }
        }
    }

    fn log(&mut self, text: impl Into<String>) {
        self.system_log.push(ChatEntry::new(Sender::System, text));
    }
}

impl InboundHandler for Session {
    fn clear_placeholders(&mut self) {
        self.chat.retain(|entry| !entry.typing);
    }

    fn on_chat(&mut self, text: String) {
        self.chat.push(ChatEntry::new(Sender::Ai, text));
    }

    fn on_synth(&mut self, audio_b64: String, prompt: String) {
        self.log(format!("Audio synthesis complete for prompt: \"{prompt}\""));
        self.audio = Some(AudioClip::new(audio_b64, prompt));
        self.synth_pending = false;
    }

    fn on_system_notice(&mut self, message: String) {
        self.log(message);
    }

    fn on_error_notice(&mut self, message: String) {
        let text = format!("Error from server: {message}");
        tracing::error!("{}", text);
        self.synth_pending = false;
        self.log(text);
    }

    fn on_raw_text(&mut self, text: String) {
        self.chat.push(ChatEntry::new(Sender::Ai, text));
    }
}
