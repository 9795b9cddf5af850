//! Client-side real-time channel for wirechat.
//!
//! A [`ChannelManager`] keeps one authenticated event stream open to the
//! backend: it reconnects with exponential backoff after drops, keeps the
//! connection alive with heartbeats, and pushes classified events into an
//! application-provided [`EventSink`]. Callers never see transport errors;
//! they observe [`ChannelStatus`] instead.

mod backoff;
mod config;
mod dispatch;
mod endpoint;
mod heartbeat;
mod manager;
mod sink;
mod transport;

pub use backoff::ReconnectPolicy;
pub use config::ChannelConfig;
pub use dispatch::{Dispatched, dispatch};
pub use endpoint::{Endpoint, EndpointError};
pub use manager::{ChannelError, ChannelManager, ChannelStatus};
pub use sink::EventSink;
pub use transport::{ABNORMAL_CLOSURE, Link, Transport, TransportError, TransportEvent, WsTransport};

pub use wirechat_core::ConnectionState;
