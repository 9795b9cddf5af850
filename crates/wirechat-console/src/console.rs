//! Line-oriented control surface over a running channel.

use std::str::FromStr;
use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{info, warn};
use wirechat_client::{ChannelManager, ChannelStatus, ConnectionState};
use wirechat_core::{IdParseError, PeerId};

use crate::store::ContactsStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Open(PeerId),
    Close,
    Status,
    Connect,
    Disconnect,
    Quit,
}

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("unknown command `{0}` (try: open <peer>, close, status, connect, disconnect, quit)")]
    Unknown(String),
    #[error("`open` needs a peer id")]
    MissingPeer,
    #[error(transparent)]
    InvalidPeer(#[from] IdParseError),
}

impl FromStr for Command {
    type Err = ParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let verb = words.next().unwrap_or_default();
        match verb {
            "open" => {
                let peer = words.next().ok_or(ParseError::MissingPeer)?;
                Ok(Self::Open(peer.parse()?))
            }
            "close" => Ok(Self::Close),
            "status" => Ok(Self::Status),
            "connect" => Ok(Self::Connect),
            "disconnect" => Ok(Self::Disconnect),
            "quit" | "exit" => Ok(Self::Quit),
            other => Err(ParseError::Unknown(other.to_owned())),
        }
    }
}

pub struct Console {
    manager: ChannelManager,
    store: Arc<ContactsStore>,
    token: String,
}

impl Console {
    pub fn new(manager: ChannelManager, store: Arc<ContactsStore>, token: String) -> Self {
        Self {
            manager,
            store,
            token,
        }
    }

    /// Read commands until `quit`, end of input, or Ctrl-C, then tear the
    /// channel down.
    ///
    /// The focused peer is re-announced every time the channel comes up.
    pub async fn run(self, input: impl AsyncBufRead + Unpin) -> anyhow::Result<()> {
        let mut lines = input.lines();
        let mut status = self.manager.watch();
        let mut was_connected = status.borrow().state.is_connected();
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);

        let result = loop {
            tokio::select! {
                line = lines.next_line() => {
                    let line = match line {
                        Ok(Some(line)) => line,
                        Ok(None) => break Ok(()),
                        Err(e) => break Err(e.into()),
                    };
                    if line.trim().is_empty() {
                        continue;
                    }
                    match line.parse::<Command>() {
                        Ok(Command::Quit) => break Ok(()),
                        Ok(command) => self.apply(command),
                        Err(e) => println!("{e}"),
                    }
                }
                changed = status.changed() => {
                    if changed.is_err() {
                        break Ok(());
                    }
                    let connected = status.borrow_and_update().state.is_connected();
                    if connected && !was_connected {
                        if let Some(peer) = self.store.focused() {
                            self.manager.set_active_peer(Some(peer));
                        }
                    }
                    was_connected = connected;
                }
                _ = &mut ctrl_c => {
                    info!("interrupted");
                    break Ok(());
                }
            }
        };

        self.manager.destroy().await;
        result
    }

    fn apply(&self, command: Command) {
        match command {
            Command::Open(peer) => {
                self.store.focus(Some(peer.clone()));
                self.manager.set_active_peer(Some(peer));
            }
            Command::Close => {
                self.store.focus(None);
                self.manager.set_active_peer(None);
            }
            Command::Status => {
                println!("{}", describe(&self.manager.status()));
                if let Some(peer) = self.store.focused() {
                    let messages = self.store.messages(&peer).len();
                    println!("{peer}: {messages} messages");
                }
                println!("peer list refreshed {} times", self.store.refreshes());
            }
            Command::Connect => {
                if let Err(e) = self.manager.connect(self.token.clone()) {
                    warn!(error = %e, "connect refused");
                }
            }
            Command::Disconnect => self.manager.disconnect(),
            Command::Quit => {}
        }
    }
}

fn describe(status: &ChannelStatus) -> String {
    match (status.state, status.retry_in) {
        (ConnectionState::Disconnected, Some(delay)) => format!(
            "disconnected, retry {} in {}ms",
            status.reconnect_attempts,
            delay.as_millis()
        ),
        (state, _) => state.to_string(),
    }
}
