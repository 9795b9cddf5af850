#![allow(dead_code)]

use async_trait::async_trait;
use futures::SinkExt;
use futures::channel::mpsc;
use futures::Sink;
use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use tokio::time::Instant;
use url::Url;
use wirechat_client::{EventSink, Link, Transport, TransportError, TransportEvent};
use wirechat_core::{Message, MessageId, MessageStatus, PeerId};

/// Records every store mutation.
#[derive(Default)]
pub struct Recorder {
    focused: Mutex<Option<PeerId>>,
    pub appended: Mutex<Vec<Message>>,
    pub refreshes: Mutex<usize>,
    pub statuses: Mutex<Vec<(MessageId, MessageStatus)>>,
}

impl Recorder {
    pub fn focused_on(peer: &str) -> Arc<Self> {
        let recorder = Self::default();
        *recorder.focused.lock().unwrap() = Some(peer.parse().unwrap());
        Arc::new(recorder)
    }

    pub fn appended(&self) -> usize {
        self.appended.lock().unwrap().len()
    }

    pub fn refreshes(&self) -> usize {
        *self.refreshes.lock().unwrap()
    }

    pub fn mutations(&self) -> usize {
        self.appended() + self.refreshes() + self.statuses.lock().unwrap().len()
    }
}

impl EventSink for Recorder {
    fn current_peer(&self) -> Option<PeerId> {
        self.focused.lock().unwrap().clone()
    }

    fn append_message(&self, message: Message) {
        self.appended.lock().unwrap().push(message);
    }

    fn refresh_peer_list(&self) {
        *self.refreshes.lock().unwrap() += 1;
    }

    fn set_message_status(&self, message_id: &MessageId, status: MessageStatus) {
        self.statuses
            .lock()
            .unwrap()
            .push((message_id.clone(), status));
    }
}

pub fn new_message_frame(id: &str, contact_id: &str) -> String {
    serde_json::json!({
        "type": "new_message",
        "payload": {
            "id": id,
            "contact_id": contact_id,
            "direction": "incoming",
            "message_type": "text",
            "content": "hello",
            "status": "delivered",
            "created_at": "2024-05-01T10:00:00Z",
            "updated_at": "2024-05-01T10:00:00Z"
        }
    })
    .to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Answer {
    Accept,
    Refuse,
}

/// Server side of one accepted fake connection.
struct Remote {
    written: mpsc::UnboundedReceiver<String>,
    events: mpsc::UnboundedSender<TransportEvent>,
    closed_by_client: bool,
}

struct Shared {
    script: VecDeque<Answer>,
    fallback: Answer,
    opens: Vec<(Instant, Url)>,
    remotes: Vec<Remote>,
}

/// In-memory transport. Each `open` consumes the next scripted answer.
#[derive(Clone)]
pub struct FakeTransport(Arc<Mutex<Shared>>);

impl FakeTransport {
    pub fn scripted(answers: impl IntoIterator<Item = Answer>, fallback: Answer) -> Self {
        Self(Arc::new(Mutex::new(Shared {
            script: answers.into_iter().collect(),
            fallback,
            opens: Vec::new(),
            remotes: Vec::new(),
        })))
    }

    pub fn accepting() -> Self {
        Self::scripted([], Answer::Accept)
    }

    pub fn refusing() -> Self {
        Self::scripted([], Answer::Refuse)
    }

    pub fn opens(&self) -> usize {
        self.0.lock().unwrap().opens.len()
    }

    pub fn open_times(&self) -> Vec<Instant> {
        self.0.lock().unwrap().opens.iter().map(|(at, _)| *at).collect()
    }

    pub fn last_url(&self) -> Option<Url> {
        self.0.lock().unwrap().opens.last().map(|(_, url)| url.clone())
    }

    pub fn links(&self) -> usize {
        self.0.lock().unwrap().remotes.len()
    }

    /// Deliver a text frame on the most recent link.
    pub fn push(&self, frame: &str) {
        self.emit(TransportEvent::Frame(frame.to_owned()));
    }

    /// Close the most recent link from the server side.
    pub fn drop_connection(&self, code: u16) {
        self.emit(TransportEvent::Closed {
            code: Some(code),
            reason: "going away".into(),
        });
    }

    fn emit(&self, event: TransportEvent) {
        let shared = self.0.lock().unwrap();
        let remote = shared.remotes.last().expect("no link opened");
        remote.events.unbounded_send(event).unwrap();
    }

    /// Frames written so far on link `index`, drained.
    pub fn written(&self, index: usize) -> Vec<String> {
        let mut shared = self.0.lock().unwrap();
        let remote = &mut shared.remotes[index];
        let mut frames = Vec::new();
        loop {
            match remote.written.try_next() {
                Ok(Some(frame)) => frames.push(frame),
                Ok(None) => {
                    remote.closed_by_client = true;
                    break;
                }
                Err(_) => break,
            }
        }
        frames
    }

    /// Whether the client has closed or released link `index`.
    pub fn is_closed(&self, index: usize) -> bool {
        self.written(index);
        self.0.lock().unwrap().remotes[index].closed_by_client
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn open(&self, url: &Url) -> Result<Link, TransportError> {
        let mut shared = self.0.lock().unwrap();
        shared.opens.push((Instant::now(), url.clone()));
        let answer = shared.script.pop_front().unwrap_or(shared.fallback);
        match answer {
            Answer::Refuse => Err(TransportError::Other("connection refused".into())),
            Answer::Accept => {
                let (written_tx, written) = mpsc::unbounded();
                let (events, events_rx) = mpsc::unbounded();
                shared.remotes.push(Remote {
                    written,
                    events,
                    closed_by_client: false,
                });
                let sink = written_tx.sink_map_err(|e| TransportError::Other(e.to_string()));
                Ok(Link::new(sink, events_rx))
            }
        }
    }
}

/// Sink that never has room for a frame and never finishes closing.
struct Wedged;

impl Sink<String> for Wedged {
    type Error = TransportError;

    fn poll_ready(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Pending
    }

    fn start_send(self: Pin<&mut Self>, _frame: String) -> Result<(), Self::Error> {
        Ok(())
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Pending
    }

    fn poll_close(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Pending
    }
}

/// Accepts every open, then never drains a single write.
#[derive(Clone, Default)]
pub struct StalledTransport {
    opens: Arc<Mutex<usize>>,
}

impl StalledTransport {
    pub fn opens(&self) -> usize {
        *self.opens.lock().unwrap()
    }
}

#[async_trait]
impl Transport for StalledTransport {
    async fn open(&self, _url: &Url) -> Result<Link, TransportError> {
        *self.opens.lock().unwrap() += 1;
        Ok(Link::new(Wedged, futures::stream::pending()))
    }
}

/// Let the channel's event loop drain whatever is queued.
pub async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}
