//! Wire envelopes.
//!
//! Every frame, in either direction, is a JSON text frame of the shape
//! `{"type": <kind>, "payload": <object>}`. Inbound frames are classified into
//! [`InboundEvent`]; kinds this client does not know are kept as
//! [`InboundEvent::Unknown`] instead of failing.

use crate::{Message, MessageId, MessageStatus, PeerId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Envelope kinds.
pub mod kind {
    pub const NEW_MESSAGE: &str = "new_message";
    pub const STATUS_UPDATE: &str = "status_update";
    pub const PONG: &str = "pong";
    pub const SET_CONTACT: &str = "set_contact";
    pub const PING: &str = "ping";
}

/// The raw `{type, payload}` wrapper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub payload: Value,
}

/// Messages sent from server to client.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    /// A message was received or sent in some conversation.
    NewMessage(Message),
    /// Delivery status of a known message changed.
    StatusUpdate(StatusUpdate),
    /// Heartbeat reply.
    Pong,
    /// A kind this client does not understand.
    Unknown { kind: String, payload: Value },
}

/// Payload of a `status_update` envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub message_id: MessageId,
    pub status: MessageStatus,
}

impl InboundEvent {
    /// Parse a text frame.
    pub fn parse(frame: &str) -> Result<Self, EnvelopeError> {
        let envelope: Envelope = serde_json::from_str(frame).map_err(EnvelopeError::Malformed)?;
        Self::try_from(envelope)
    }

    /// The envelope kind this event was decoded from.
    pub fn kind(&self) -> &str {
        match self {
            Self::NewMessage(_) => kind::NEW_MESSAGE,
            Self::StatusUpdate(_) => kind::STATUS_UPDATE,
            Self::Pong => kind::PONG,
            Self::Unknown { kind, .. } => kind,
        }
    }
}

impl TryFrom<Envelope> for InboundEvent {
    type Error = EnvelopeError;

    fn try_from(envelope: Envelope) -> Result<Self, Self::Error> {
        let Envelope { kind, payload } = envelope;
        let typed = match kind.as_str() {
            kind::NEW_MESSAGE => serde_json::from_value(payload).map(Self::NewMessage),
            kind::STATUS_UPDATE => serde_json::from_value(payload).map(Self::StatusUpdate),
            kind::PONG => Ok(Self::Pong),
            _ => return Ok(Self::Unknown { kind, payload }),
        };
        typed.map_err(|source| EnvelopeError::Payload { kind, source })
    }
}

/// Messages sent from client to server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum OutboundMessage {
    /// Tell the server which conversation is on screen; empty means none.
    SetContact { contact_id: String },
    /// Heartbeat.
    Ping {},
}

impl OutboundMessage {
    pub fn set_contact(peer: Option<&PeerId>) -> Self {
        Self::SetContact {
            contact_id: peer.map(|p| p.as_str().to_owned()).unwrap_or_default(),
        }
    }

    pub fn ping() -> Self {
        Self::Ping {}
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::SetContact { .. } => kind::SET_CONTACT,
            Self::Ping {} => kind::PING,
        }
    }

    /// Encode as a text frame.
    pub fn to_frame(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Error decoding an inbound frame.
#[derive(Debug, thiserror::Error)]
pub enum EnvelopeError {
    #[error("frame is not a valid envelope: {0}")]
    Malformed(#[source] serde_json::Error),
    #[error("invalid {kind} payload: {source}")]
    Payload {
        kind: String,
        #[source]
        source: serde_json::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_status_update() {
        let event = InboundEvent::parse(
            r#"{"type":"status_update","payload":{"message_id":"m-1","status":"read"}}"#,
        )
        .unwrap();
        assert_eq!(
            event,
            InboundEvent::StatusUpdate(StatusUpdate {
                message_id: "m-1".parse().unwrap(),
                status: MessageStatus::Read,
            })
        );
    }

    #[test]
    fn pong_payload_is_optional() {
        assert_eq!(InboundEvent::parse(r#"{"type":"pong"}"#).unwrap(), InboundEvent::Pong);
        assert_eq!(
            InboundEvent::parse(r#"{"type":"pong","payload":{}}"#).unwrap(),
            InboundEvent::Pong
        );
    }

    #[test]
    fn unknown_kind_keeps_payload() {
        let event =
            InboundEvent::parse(r#"{"type":"typing","payload":{"contact_id":"9"}}"#).unwrap();
        assert_eq!(event.kind(), "typing");
        assert_eq!(
            event,
            InboundEvent::Unknown {
                kind: "typing".into(),
                payload: json!({"contact_id": "9"}),
            }
        );
    }

    #[test]
    fn malformed_frames() {
        for frame in ["not json", "[1,2]", r#"{"payload":{}}"#, ""] {
            assert!(
                matches!(InboundEvent::parse(frame), Err(EnvelopeError::Malformed(_))),
                "{frame:?} should be malformed"
            );
        }
    }

    #[test]
    fn bad_payload_for_known_kind() {
        let err = InboundEvent::parse(r#"{"type":"status_update","payload":{"status":"read"}}"#)
            .unwrap_err();
        assert!(matches!(err, EnvelopeError::Payload { ref kind, .. } if kind == "status_update"));
    }

    #[test]
    fn outbound_frames() {
        let peer: PeerId = "42".parse().unwrap();
        let frame = OutboundMessage::set_contact(Some(&peer)).to_frame().unwrap();
        assert_eq!(
            serde_json::from_str::<Value>(&frame).unwrap(),
            json!({"type": "set_contact", "payload": {"contact_id": "42"}})
        );

        let frame = OutboundMessage::set_contact(None).to_frame().unwrap();
        assert_eq!(
            serde_json::from_str::<Value>(&frame).unwrap(),
            json!({"type": "set_contact", "payload": {"contact_id": ""}})
        );

        let frame = OutboundMessage::ping().to_frame().unwrap();
        assert_eq!(
            serde_json::from_str::<Value>(&frame).unwrap(),
            json!({"type": "ping", "payload": {}})
        );
    }
}
