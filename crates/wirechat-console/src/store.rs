use std::collections::HashMap;

use parking_lot::RwLock;
use tracing::{debug, info};
use wirechat_client::EventSink;
use wirechat_core::{Message, MessageId, MessageStatus, PeerId};

#[derive(Debug, Default)]
struct Inner {
    focused: Option<PeerId>,
    conversations: HashMap<PeerId, Vec<Message>>,
    refreshes: u64,
}

/// In-memory contacts and conversations.
#[derive(Debug, Default)]
pub struct ContactsStore {
    inner: RwLock<Inner>,
}

impl ContactsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Put `peer` on screen, or clear the screen.
    pub fn focus(&self, peer: Option<PeerId>) {
        self.inner.write().focused = peer;
    }

    pub fn focused(&self) -> Option<PeerId> {
        self.inner.read().focused.clone()
    }

    pub fn messages(&self, peer: &PeerId) -> Vec<Message> {
        self.inner
            .read()
            .conversations
            .get(peer)
            .cloned()
            .unwrap_or_default()
    }

    pub fn refreshes(&self) -> u64 {
        self.inner.read().refreshes
    }
}

impl EventSink for ContactsStore {
    fn current_peer(&self) -> Option<PeerId> {
        self.focused()
    }

    fn append_message(&self, message: Message) {
        let mut inner = self.inner.write();
        let conversation = inner
            .conversations
            .entry(message.contact_id.clone())
            .or_default();
        if conversation.iter().any(|m| m.id == message.id) {
            debug!(id = %message.id, "duplicate message ignored");
            return;
        }
        info!(
            id = %message.id,
            peer = %message.contact_id,
            kind = %message.message_type,
            content = %message.content,
            "message"
        );
        conversation.push(message);
    }

    fn refresh_peer_list(&self) {
        let mut inner = self.inner.write();
        inner.refreshes += 1;
        debug!(refreshes = inner.refreshes, "peer list refresh");
    }

    fn set_message_status(&self, message_id: &MessageId, status: MessageStatus) {
        let mut inner = self.inner.write();
        let found = inner
            .conversations
            .values_mut()
            .flat_map(|c| c.iter_mut())
            .find(|m| &m.id == message_id);
        match found {
            Some(message) => {
                info!(id = %message_id, %status, "status");
                message.status = status;
            }
            None => debug!(id = %message_id, %status, "status for unknown message"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use wirechat_core::Direction;

    fn message(id: &str, peer: &str) -> Message {
        Message {
            id: id.parse().unwrap(),
            contact_id: peer.parse().unwrap(),
            direction: Direction::Incoming,
            message_type: "text".into(),
            content: serde_json::json!("hi"),
            status: MessageStatus::Delivered,
            wamid: None,
            error_message: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn appends_per_peer_without_duplicates() {
        let store = ContactsStore::new();
        let peer: PeerId = "42".parse().unwrap();
        store.append_message(message("m-1", "42"));
        store.append_message(message("m-1", "42"));
        store.append_message(message("m-2", "7"));

        assert_eq!(store.messages(&peer).len(), 1);
        assert_eq!(store.messages(&"7".parse().unwrap()).len(), 1);
    }

    #[test]
    fn status_updates_find_the_message() {
        let store = ContactsStore::new();
        store.append_message(message("m-1", "42"));
        store.set_message_status(&"m-1".parse().unwrap(), MessageStatus::Read);
        store.set_message_status(&"m-9".parse().unwrap(), MessageStatus::Failed);

        let messages = store.messages(&"42".parse().unwrap());
        assert_eq!(messages[0].status, MessageStatus::Read);
    }

    #[test]
    fn focus_drives_current_peer() {
        let store = ContactsStore::new();
        assert_eq!(store.current_peer(), None);
        store.focus(Some("42".parse().unwrap()));
        assert_eq!(store.current_peer().unwrap().as_str(), "42");
        store.refresh_peer_list();
        assert_eq!(store.refreshes(), 1);
    }
}
