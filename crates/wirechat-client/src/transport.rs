//! The transport seam.
//!
//! The channel manager never touches a socket directly. It asks a
//! [`Transport`] to open a [`Link`], writes text frames into the link and
//! reads [`TransportEvent`]s out of it. [`WsTransport`] is the production
//! implementation over `tokio-tungstenite`.

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use futures_util::{Sink, SinkExt, Stream, StreamExt, future};
use std::fmt;
use std::pin::Pin;
use tokio_tungstenite::tungstenite::{self, Message};
use url::Url;

/// Close code reported when the connection dropped without a close frame.
pub const ABNORMAL_CLOSURE: u16 = 1006;

/// Something the remote end did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// A text frame.
    Frame(String),
    /// The connection is gone. `code` is absent when the stream simply ended.
    Closed { code: Option<u16>, reason: String },
}

type FrameSink = Pin<Box<dyn Sink<String, Error = TransportError> + Send>>;

/// One open connection: a sink for outgoing frames and a stream of events.
pub struct Link {
    sink: FrameSink,
    events: BoxStream<'static, TransportEvent>,
}

impl Link {
    pub fn new<S, E>(sink: S, events: E) -> Self
    where
        S: Sink<String, Error = TransportError> + Send + 'static,
        E: Stream<Item = TransportEvent> + Send + 'static,
    {
        Self {
            sink: Box::pin(sink),
            events: events.boxed(),
        }
    }

    pub async fn send(&mut self, frame: String) -> Result<(), TransportError> {
        self.sink.send(frame).await
    }

    /// The next event, or `None` once the remote stream has ended.
    pub async fn next_event(&mut self) -> Option<TransportEvent> {
        self.events.next().await
    }

    /// Close our side of the connection.
    pub async fn close(&mut self) -> Result<(), TransportError> {
        self.sink.close().await
    }
}

impl fmt::Debug for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Link").finish_non_exhaustive()
    }
}

/// Opens links.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Open a connection to `url`. Resolves once the connection is usable.
    async fn open(&self, url: &Url) -> Result<Link, TransportError>;
}

/// Transport failure.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("websocket: {0}")]
    WebSocket(#[from] tungstenite::Error),
    #[error("connection closed")]
    Closed,
    #[error("{0}")]
    Other(String),
}

/// WebSocket transport.
#[derive(Debug, Clone, Copy, Default)]
pub struct WsTransport;

#[async_trait]
impl Transport for WsTransport {
    async fn open(&self, url: &Url) -> Result<Link, TransportError> {
        let (ws, _response) = tokio_tungstenite::connect_async(url.as_str()).await?;
        let (sink, stream) = ws.split();

        let sink = sink.sink_map_err(TransportError::from).with(|frame: String| {
            future::ready(Ok::<_, TransportError>(Message::Text(frame.into())))
        });

        let events = stream.filter_map(|item| future::ready(classify(item)));

        Ok(Link::new(sink, events))
    }
}

fn classify(item: Result<Message, tungstenite::Error>) -> Option<TransportEvent> {
    match item {
        Ok(Message::Text(text)) => Some(TransportEvent::Frame(text.as_str().to_owned())),
        Ok(Message::Close(frame)) => Some(match frame {
            Some(frame) => TransportEvent::Closed {
                code: Some(u16::from(frame.code)),
                reason: frame.reason.as_str().to_owned(),
            },
            None => TransportEvent::Closed {
                code: None,
                reason: String::new(),
            },
        }),
        // Control frames are answered by tungstenite; binary is not part of the protocol.
        Ok(_) => None,
        Err(e) => Some(TransportEvent::Closed {
            code: Some(ABNORMAL_CLOSURE),
            reason: e.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tungstenite::protocol::CloseFrame;
    use tungstenite::protocol::frame::coding::CloseCode;

    #[test]
    fn text_becomes_frame() {
        assert_eq!(
            classify(Ok(Message::Text("{}".into()))),
            Some(TransportEvent::Frame("{}".into()))
        );
    }

    #[test]
    fn close_frame_carries_code() {
        let frame = CloseFrame {
            code: CloseCode::Away,
            reason: "restarting".into(),
        };
        assert_eq!(
            classify(Ok(Message::Close(Some(frame)))),
            Some(TransportEvent::Closed {
                code: Some(1001),
                reason: "restarting".into(),
            })
        );
    }

    #[test]
    fn errors_are_abnormal_closes() {
        let event = classify(Err(tungstenite::Error::ConnectionClosed));
        assert!(matches!(
            event,
            Some(TransportEvent::Closed { code: Some(ABNORMAL_CLOSURE), .. })
        ));
    }

    #[test]
    fn control_and_binary_frames_are_skipped() {
        assert_eq!(classify(Ok(Message::Ping(Vec::new().into()))), None);
        assert_eq!(classify(Ok(Message::Binary(vec![1, 2].into()))), None);
    }
}
