//! The channel manager.
//!
//! [`ChannelManager`] is a cheap handle. The actual state lives in a
//! [`Driver`] that runs as a single tokio task: commands from the handle,
//! transport events, the heartbeat and the reconnect timer are all
//! multiplexed onto one loop, so no two handlers ever run at once and the
//! state needs no locking.
//!
//! ```text
//! connect ─▶ Connecting ─▶ Connected ──close/error──▶ Backoff ─▶ Connecting ─▶ …
//!                │                                       │
//!                └──────────open failed─────────────────▶┘──budget spent──▶ Disconnected
//! ```

use crate::backoff::ReconnectPolicy;
use crate::dispatch::{Dispatched, dispatch};
use crate::heartbeat::{Beat, Heartbeat};
use crate::transport::{ABNORMAL_CLOSURE, Link, Transport, TransportError, TransportEvent};
use crate::{ChannelConfig, Endpoint, EventSink};
use futures_util::future::BoxFuture;
use std::future::{Future, pending};
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Sleep};
use tracing::{debug, info, trace, warn};
use wirechat_core::{ConnectionState, OutboundMessage, PeerId};

/// Longest a single write or close may hold up the event loop.
const LINK_IO_TIMEOUT: Duration = Duration::from_secs(5);

/// Observable snapshot of the channel, republished on every transition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelStatus {
    pub state: ConnectionState,
    /// Reconnect attempts spent since the last successful open.
    pub reconnect_attempts: u32,
    /// Set while a reconnect is scheduled.
    pub retry_in: Option<Duration>,
}

/// Error returned by [`ChannelManager`] operations.
///
/// Transport failures never show up here; they are absorbed by the
/// reconnect policy.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChannelError {
    #[error("credential token is empty")]
    EmptyToken,
    #[error("channel manager has been destroyed")]
    Destroyed,
}

#[derive(Debug)]
enum Command {
    Connect(String),
    Disconnect,
    SetActivePeer(Option<PeerId>),
    Shutdown,
}

/// Handle to one logical real-time channel.
///
/// Create one per authenticated session, call [`connect`](Self::connect) with
/// the session token and [`destroy`](Self::destroy) when the session ends.
/// Dropping the handle stops the channel as well.
#[derive(Debug)]
pub struct ChannelManager {
    commands: mpsc::UnboundedSender<Command>,
    status: watch::Receiver<ChannelStatus>,
    task: Option<JoinHandle<()>>,
}

impl ChannelManager {
    /// Spawn the channel's event loop. Must be called within a tokio runtime.
    pub fn new<T: Transport>(
        endpoint: Endpoint,
        config: ChannelConfig,
        transport: T,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        let (commands, command_rx) = mpsc::unbounded_channel();
        let (status_tx, status) = watch::channel(ChannelStatus::default());
        let driver = Driver {
            endpoint,
            policy: config.reconnect_policy(),
            heartbeat_interval: config.heartbeat_interval(),
            pong_timeout: config.pong_timeout(),
            transport: Arc::new(transport),
            sink,
            commands: command_rx,
            status: status_tx,
            token: None,
            link: None,
            connecting: None,
            heartbeat: None,
            retry: None,
            reconnect_attempts: 0,
        };
        let task = tokio::spawn(driver.run());
        Self {
            commands,
            status,
            task: Some(task),
        }
    }

    /// Open the channel with `token`.
    ///
    /// Does nothing if the channel is already open or an open is in flight.
    /// Cancels a pending reconnect and starts a fresh retry budget otherwise.
    /// Connection failures are not reported here; watch
    /// [`status`](Self::status) instead.
    pub fn connect(&self, token: impl Into<String>) -> Result<(), ChannelError> {
        let token = token.into();
        if token.is_empty() {
            return Err(ChannelError::EmptyToken);
        }
        self.command(Command::Connect(token))
    }

    /// Close the channel and suppress any reconnect. Safe to call repeatedly.
    pub fn disconnect(&self) {
        // A stopped loop is already disconnected.
        let _ = self.command(Command::Disconnect);
    }

    /// Tell the server which conversation is on screen. Dropped silently when
    /// the channel is not open.
    pub fn set_active_peer(&self, peer: Option<PeerId>) {
        let _ = self.command(Command::SetActivePeer(peer));
    }

    pub fn state(&self) -> ConnectionState {
        self.status.borrow().state
    }

    pub fn status(&self) -> ChannelStatus {
        *self.status.borrow()
    }

    /// Subscribe to status changes.
    pub fn watch(&self) -> watch::Receiver<ChannelStatus> {
        self.status.clone()
    }

    /// Disconnect and stop the event loop.
    pub async fn destroy(mut self) {
        let _ = self.command(Command::Shutdown);
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "channel task did not shut down cleanly");
            }
        }
    }

    fn command(&self, command: Command) -> Result<(), ChannelError> {
        self.commands
            .send(command)
            .map_err(|_| ChannelError::Destroyed)
    }
}

impl Drop for ChannelManager {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

enum Event {
    Command(Option<Command>),
    Opened(Result<Link, TransportError>),
    Transport(Option<TransportEvent>),
    Beat(Beat),
    RetryDue,
}

struct Driver {
    endpoint: Endpoint,
    policy: ReconnectPolicy,
    heartbeat_interval: Duration,
    pong_timeout: Option<Duration>,
    transport: Arc<dyn Transport>,
    sink: Arc<dyn EventSink>,
    commands: mpsc::UnboundedReceiver<Command>,
    status: watch::Sender<ChannelStatus>,
    /// Kept only to reconnect.
    token: Option<String>,
    link: Option<Link>,
    connecting: Option<BoxFuture<'static, Result<Link, TransportError>>>,
    /// Present iff `link` is.
    heartbeat: Option<Heartbeat>,
    retry: Option<Pin<Box<Sleep>>>,
    reconnect_attempts: u32,
}

impl Driver {
    async fn run(mut self) {
        loop {
            match self.next_event().await {
                Event::Command(Some(Command::Connect(token))) => self.connect(token),
                Event::Command(Some(Command::Disconnect)) => self.disconnect().await,
                Event::Command(Some(Command::SetActivePeer(peer))) => {
                    self.send(OutboundMessage::set_contact(peer.as_ref())).await;
                }
                Event::Command(Some(Command::Shutdown) | None) => {
                    self.disconnect().await;
                    break;
                }
                Event::Opened(result) => {
                    self.connecting = None;
                    self.opened(result);
                }
                Event::Transport(Some(TransportEvent::Frame(frame))) => self.received(&frame),
                Event::Transport(Some(TransportEvent::Closed { code, reason })) => {
                    self.closed(code, &reason);
                }
                Event::Transport(None) => self.closed(None, "stream ended"),
                Event::Beat(Beat::Ping) => self.ping().await,
                Event::Beat(Beat::Expired) => self.pong_overdue().await,
                Event::RetryDue => {
                    self.retry = None;
                    self.open();
                }
            }
        }
        debug!("channel event loop stopped");
    }

    async fn next_event(&mut self) -> Event {
        let Self {
            commands,
            connecting,
            link,
            heartbeat,
            retry,
            ..
        } = self;

        tokio::select! {
            // Commands first, so a disconnect beats a reconnect that is due in
            // the same instant.
            biased;
            command = commands.recv() => Event::Command(command),
            opened = when_some(connecting.as_mut()) => Event::Opened(opened),
            event = async {
                match link.as_mut() {
                    Some(link) => link.next_event().await,
                    None => pending().await,
                }
            } => Event::Transport(event),
            beat = async {
                match heartbeat.as_mut() {
                    Some(heartbeat) => heartbeat.next().await,
                    None => pending().await,
                }
            } => Event::Beat(beat),
            () = when_some(retry.as_mut()) => Event::RetryDue,
        }
    }

    fn connect(&mut self, token: String) {
        if self.link.is_some() {
            debug!("channel already connected");
            return;
        }
        if self.connecting.is_some() {
            debug!("channel connect already in flight");
            return;
        }
        self.token = Some(token);
        self.retry = None;
        self.reconnect_attempts = 0;
        self.open();
    }

    /// Start opening a transport with the stored token.
    fn open(&mut self) {
        if self.link.is_some() || self.connecting.is_some() {
            return;
        }
        let Some(token) = self.token.as_deref() else {
            warn!("no credential to connect with");
            return;
        };
        let url = self.endpoint.url_for(token);
        info!(endpoint = %self.endpoint, "connecting channel");

        let transport = Arc::clone(&self.transport);
        self.connecting = Some(Box::pin(async move { transport.open(&url).await }));
        self.publish(ConnectionState::Connecting);
    }

    fn opened(&mut self, result: Result<Link, TransportError>) {
        match result {
            Ok(link) => {
                info!("channel connected");
                self.link = Some(link);
                self.reconnect_attempts = 0;
                self.heartbeat = Some(Heartbeat::start(
                    self.heartbeat_interval,
                    self.pong_timeout,
                ));
                self.publish(ConnectionState::Connected);
            }
            Err(e) => {
                warn!(error = %e, "failed to open channel");
                self.schedule_reconnect();
            }
        }
    }

    fn received(&mut self, frame: &str) {
        trace!(len = frame.len(), "frame received");
        if dispatch(frame, self.sink.as_ref()) == Dispatched::Pong {
            if let Some(heartbeat) = self.heartbeat.as_mut() {
                heartbeat.pong_received();
            }
        }
    }

    fn closed(&mut self, code: Option<u16>, reason: &str) {
        info!(?code, reason, "channel closed");
        self.link = None;
        self.schedule_reconnect();
    }

    async fn ping(&mut self) {
        self.send(OutboundMessage::ping()).await;
        if let Some(heartbeat) = self.heartbeat.as_mut() {
            heartbeat.ping_sent();
        }
    }

    async fn pong_overdue(&mut self) {
        let timeout = self.heartbeat.as_ref().and_then(Heartbeat::pong_timeout);
        warn!(?timeout, "no pong received, dropping connection");
        self.heartbeat = None;
        self.close_link().await;
        self.schedule_reconnect();
    }

    fn schedule_reconnect(&mut self) {
        self.heartbeat = None;
        if !self.policy.allows(self.reconnect_attempts) {
            warn!(
                attempts = self.reconnect_attempts,
                "max reconnect attempts reached, giving up"
            );
            self.retry = None;
            self.publish(ConnectionState::Disconnected);
            return;
        }

        self.reconnect_attempts += 1;
        let delay = self.policy.delay_for(self.reconnect_attempts);
        info!(
            attempt = self.reconnect_attempts,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            "reconnecting"
        );
        self.retry = Some(Box::pin(time::sleep(delay)));
        self.publish_with_retry(ConnectionState::Disconnected, Some(delay));
    }

    async fn disconnect(&mut self) {
        self.heartbeat = None;
        self.retry = None;
        self.connecting = None;
        let was_open = self.link.is_some();
        self.close_link().await;
        self.reconnect_attempts = self.policy.max_attempts;
        self.publish(ConnectionState::Disconnected);
        if was_open {
            info!("channel disconnected");
        }
    }

    async fn close_link(&mut self) {
        if let Some(mut link) = self.link.take() {
            let closed = time::timeout(LINK_IO_TIMEOUT, link.close()).await;
            match closed {
                Ok(Ok(())) => {}
                Ok(Err(e)) => debug!(error = %e, "error closing channel"),
                Err(_) => debug!("channel close timed out, dropping link"),
            }
        }
    }

    /// Fire-and-forget: nothing is queued or retried.
    async fn send(&mut self, message: OutboundMessage) {
        let Some(link) = self.link.as_mut() else {
            trace!(kind = message.kind(), "channel not open, dropping outbound message");
            return;
        };
        let frame = match message.to_frame() {
            Ok(frame) => frame,
            Err(e) => {
                warn!(kind = message.kind(), error = %e, "failed to encode outbound message");
                return;
            }
        };
        let sent = time::timeout(LINK_IO_TIMEOUT, link.send(frame)).await;
        match sent {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                warn!(kind = message.kind(), error = %e, "failed to send outbound message");
            }
            Err(_) => {
                // A sink that cannot take a frame is as good as gone.
                warn!(kind = message.kind(), "outbound send timed out");
                self.closed(Some(ABNORMAL_CLOSURE), "send timed out");
            }
        }
    }

    fn publish(&self, state: ConnectionState) {
        self.publish_with_retry(state, None);
    }

    fn publish_with_retry(&self, state: ConnectionState, retry_in: Option<Duration>) {
        self.status.send_replace(ChannelStatus {
            state,
            reconnect_attempts: self.reconnect_attempts,
            retry_in,
        });
    }
}

async fn when_some<F>(future: Option<&mut F>) -> F::Output
where
    F: Future + Unpin,
{
    match future {
        Some(future) => future.await,
        None => pending().await,
    }
}
