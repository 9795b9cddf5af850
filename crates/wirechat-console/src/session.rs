use std::io::ErrorKind;
use std::path::PathBuf;

use anyhow::{Context, bail};
use parking_lot::RwLock;
use tracing::{debug, info, warn};
use wirechat_gate::AuthState;

/// Session token persisted in a local credentials file.
#[derive(Debug)]
pub struct FileSession {
    path: PathBuf,
    token: RwLock<Option<String>>,
}

impl FileSession {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            token: RwLock::new(None),
        }
    }

    pub fn token(&self) -> Option<String> {
        self.token.read().clone()
    }

    pub fn login(&self, token: &str) -> anyhow::Result<()> {
        let token = token.trim();
        if token.is_empty() {
            bail!("session token must not be empty");
        }
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        std::fs::write(&self.path, token)
            .with_context(|| format!("failed to write {}", self.path.display()))?;
        *self.token.write() = Some(token.to_owned());
        info!(path = %self.path.display(), "session stored");
        Ok(())
    }

    pub fn logout(&self) -> anyhow::Result<()> {
        *self.token.write() = None;
        match std::fs::remove_file(&self.path) {
            Ok(()) => info!(path = %self.path.display(), "session removed"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                return Err(e).with_context(|| format!("failed to remove {}", self.path.display()));
            }
        }
        Ok(())
    }
}

impl AuthState for FileSession {
    fn is_authenticated(&self) -> bool {
        self.token.read().is_some()
    }

    fn restore_session(&self) -> bool {
        let stored = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw.trim().to_owned(),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no stored session");
                return self.is_authenticated();
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "failed to read stored session");
                return self.is_authenticated();
            }
        };
        if stored.is_empty() {
            return self.is_authenticated();
        }
        *self.token.write() = Some(stored);
        true
    }
}
