//! Inbound frame classification.

use crate::EventSink;
use tracing::{debug, trace, warn};
use wirechat_core::{EnvelopeError, InboundEvent, kind};

/// What a frame turned into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatched {
    /// A `new_message`; `appended` tells whether it was for the focused peer.
    NewMessage { appended: bool },
    StatusUpdate,
    Pong,
    /// A well-formed envelope of a kind we do not handle.
    Ignored,
    /// The frame could not be decoded and was discarded.
    Dropped,
}

/// Decode one text frame and apply it to `sink`.
///
/// Never fails: undecodable frames are logged and dropped. A `new_message`
/// whose payload does not decode still refreshes the peer list.
pub fn dispatch(frame: &str, sink: &dyn EventSink) -> Dispatched {
    let event = match InboundEvent::parse(frame) {
        Ok(event) => event,
        Err(EnvelopeError::Payload { kind: payload_kind, source })
            if payload_kind == kind::NEW_MESSAGE =>
        {
            warn!(error = %source, "undecodable new_message payload, refreshing peer list only");
            sink.refresh_peer_list();
            return Dispatched::NewMessage { appended: false };
        }
        Err(e) => {
            warn!(error = %e, "dropping inbound frame");
            return Dispatched::Dropped;
        }
    };
    trace!(kind = event.kind(), "inbound event");

    match event {
        InboundEvent::NewMessage(message) => {
            let focused = sink
                .current_peer()
                .is_some_and(|peer| peer == message.contact_id);
            if focused {
                debug!(
                    message_id = %message.id,
                    contact_id = %message.contact_id,
                    "appending message"
                );
                sink.append_message(message);
            }
            // Previews and unread counts change either way.
            sink.refresh_peer_list();
            Dispatched::NewMessage { appended: focused }
        }
        InboundEvent::StatusUpdate(update) => {
            debug!(message_id = %update.message_id, status = %update.status, "status update");
            sink.set_message_status(&update.message_id, update.status);
            Dispatched::StatusUpdate
        }
        InboundEvent::Pong => Dispatched::Pong,
        InboundEvent::Unknown { kind, .. } => {
            debug!(%kind, "ignoring unknown event kind");
            Dispatched::Ignored
        }
    }
}
