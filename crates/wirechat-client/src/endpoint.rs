//! Channel endpoint construction.
//!
//! The socket lives at `/ws` on the same host as the page, and its scheme
//! mirrors the page's: a secure page gets `wss`, anything else `ws`. The
//! credential rides along as the `token` query parameter.

use std::fmt;
use url::Url;

const CHANNEL_PATH: &str = "/ws";
const TOKEN_PARAM: &str = "token";

/// A validated channel endpoint, minus the credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    base: Url,
}

impl Endpoint {
    /// Derive the endpoint from the origin the application was served from.
    pub fn from_origin(origin: &Url) -> Result<Self, EndpointError> {
        let scheme = match origin.scheme() {
            "https" | "wss" => "wss",
            "http" | "ws" => "ws",
            other => return Err(EndpointError::UnsupportedScheme(other.to_owned())),
        };
        let host = origin.host_str().ok_or(EndpointError::MissingHost)?;
        let authority = match origin.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_owned(),
        };
        let base = Url::parse(&format!("{scheme}://{authority}{CHANNEL_PATH}"))?;
        Ok(Self { base })
    }

    /// Parse an origin string and derive the endpoint from it.
    pub fn parse(origin: &str) -> Result<Self, EndpointError> {
        Self::from_origin(&Url::parse(origin)?)
    }

    /// Whether the channel will run over TLS.
    pub fn is_secure(&self) -> bool {
        self.base.scheme() == "wss"
    }

    /// The full URL to open, credential included.
    pub fn url_for(&self, token: &str) -> Url {
        let mut url = self.base.clone();
        url.query_pairs_mut().append_pair(TOKEN_PARAM, token);
        url
    }
}

/// Displays without the credential, safe for logs.
impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}?{TOKEN_PARAM}=<redacted>", self.base)
    }
}

/// Error deriving an endpoint from a page origin.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EndpointError {
    #[error("invalid origin: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("origin scheme must be http or https, got: {0}")]
    UnsupportedScheme(String),
    #[error("origin has no host")]
    MissingHost,
}
