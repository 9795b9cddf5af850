//! Core types for the wirechat real-time channel.
//!
//! This crate provides the wire vocabulary shared by the channel manager and
//! the application: envelopes, the message entity and identifiers. It has no
//! I/O of its own.

mod entity;
mod ids;
mod message;

pub use entity::{Direction, Message, MessageStatus};
pub use ids::{IdParseError, MessageId, PeerId};
pub use message::{Envelope, EnvelopeError, InboundEvent, OutboundMessage, StatusUpdate, kind};

use std::fmt;

/// Connection lifecycle state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// No live transport; possibly waiting out a reconnect delay.
    #[default]
    Disconnected,
    /// A transport is being opened.
    Connecting,
    /// Normal operation.
    Connected,
}

impl ConnectionState {
    pub fn is_connected(self) -> bool {
        self == Self::Connected
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
        })
    }
}
