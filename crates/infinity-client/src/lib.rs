//! Client side of the Infinity-Core protocol.
//!
//! Three pieces, used together by a front-end:
//! - [`ConnectionManager`] owns the WebSocket, reconnecting after drops.
//! - [`router`] classifies inbound frames and dispatches them to an
//!   [`InboundHandler`].
//! - [`Session`] is the stock handler: chat history, system log and the last
//!   synthesized clip.

mod audio;
mod config;
mod connection;
mod error;
pub mod router;
mod session;

pub use audio::AudioClip;
pub use config::{
    ClientConfig, DEFAULT_HOST, DEFAULT_RECONNECT_DELAY, DEFAULT_SEND_TIMEOUT, endpoint_for_page,
};
pub use connection::{ConnectionEvent, ConnectionHandle, ConnectionManager};
pub use error::ClientError;
pub use router::{InboundEvent, InboundHandler, Route};
pub use session::{ChatEntry, ESTABLISHED_NOTICE, LOST_NOTICE, Sender, Session, TYPING_TEXT};

pub use infinity_core::{ClientMessage, ConnectionState, Coords, ServerMessage};
pub use uuid::Uuid;
