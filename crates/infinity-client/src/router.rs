//! Inbound frame classification and dispatch.
//!
//! Every frame ends up in exactly one of three places:
//! - a typed handler, when it is a JSON object with a known `type` and a
//!   matching payload;
//! - nowhere, when it is a JSON object whose `type` is missing or unknown;
//! - the raw-text handler, for everything else (not JSON, not an object, or a
//!   known `type` carrying a malformed payload).
//!
//! Placeholder entries are cleared for every frame, dropped ones included.

use infinity_core::ServerMessage;
use serde_json::Value;

/// A classified inbound frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    Chat { text: String },
    Synth { audio_b64: String, prompt: String },
    SystemNotice { message: String },
    ErrorNotice { message: String },
    /// Payload that does not follow the structured schema.
    RawText { text: String },
}

impl From<ServerMessage> for InboundEvent {
    fn from(message: ServerMessage) -> Self {
        match message {
            ServerMessage::Chat(reply) => InboundEvent::Chat { text: reply.text },
            ServerMessage::Synth(result) => InboundEvent::Synth {
                audio_b64: result.audio_b64,
                prompt: result.prompt,
            },
            ServerMessage::System(notice) => InboundEvent::SystemNotice {
                message: notice.message,
            },
            ServerMessage::Error(notice) => InboundEvent::ErrorNotice {
                message: notice.message,
            },
        }
    }
}

/// Where a frame goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Event(InboundEvent),
    /// Structured frame with an unrecognized (or absent) discriminant.
    Dropped { kind: Option<String> },
}

/// Receives dispatched frames.
pub trait InboundHandler {
    /// Remove provisional "typing" entries. Runs before every dispatch.
    fn clear_placeholders(&mut self);

    fn on_chat(&mut self, text: String);

    fn on_synth(&mut self, audio_b64: String, prompt: String);

    fn on_system_notice(&mut self, message: String);

    fn on_error_notice(&mut self, message: String);

    fn on_raw_text(&mut self, text: String);
}

/// Classify a raw payload without side effects.
pub fn classify(raw: &str) -> Route {
    let fields = match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(fields)) => fields,
        Ok(_) | Err(_) => return raw_text(raw),
    };

    let kind = match fields.get("type").and_then(Value::as_str) {
        Some(kind) if ServerMessage::recognizes(kind) => kind.to_owned(),
        other => {
            return Route::Dropped {
                kind: other.map(str::to_owned),
            };
        }
    };

    match serde_json::from_value::<ServerMessage>(Value::Object(fields)) {
        Ok(message) => Route::Event(message.into()),
        Err(e) => {
            tracing::debug!("malformed {} payload, treating as text: {}", kind, e);
            raw_text(raw)
        }
    }
}

/// Classify `raw` and hand it to `handler`.
///
/// Returns `false` when the frame was dropped and no handler ran.
pub fn dispatch<H: InboundHandler + ?Sized>(raw: &str, handler: &mut H) -> bool {
    let route = classify(raw);
    handler.clear_placeholders();

    let event = match route {
        Route::Event(event) => event,
        Route::Dropped { kind } => {
            tracing::debug!("dropping frame with unrecognized type {:?}", kind);
            return false;
        }
    };

    match event {
        InboundEvent::Chat { text } => handler.on_chat(text),
        InboundEvent::Synth { audio_b64, prompt } => handler.on_synth(audio_b64, prompt),
        InboundEvent::SystemNotice { message } => handler.on_system_notice(message),
        InboundEvent::ErrorNotice { message } => handler.on_error_notice(message),
        InboundEvent::RawText { text } => {
            tracing::debug!("plain text frame received");
            handler.on_raw_text(text)
        }
    }
    true
}

fn raw_text(raw: &str) -> Route {
    Route::Event(InboundEvent::RawText {
        text: raw.to_owned(),
    })
}
