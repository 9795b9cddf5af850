use wirechat_core::{Message, MessageId, MessageStatus, PeerId};

/// Application state that receives channel events.
///
/// Implemented by the contacts/messages store. The channel only ever reads
/// [`current_peer`](EventSink::current_peer); everything else is a mutation
/// entry point. Calls happen on the channel's event loop and must not block.
pub trait EventSink: Send + Sync {
    /// The conversation currently on screen, if any.
    fn current_peer(&self) -> Option<PeerId>;

    /// Add a message to the open conversation.
    fn append_message(&self, message: Message);

    /// Re-fetch the peer list (previews, unread counts).
    fn refresh_peer_list(&self);

    /// Record a delivery status change.
    fn set_message_status(&self, message_id: &MessageId, status: MessageStatus);
}
