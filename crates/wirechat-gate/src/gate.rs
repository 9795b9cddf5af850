use std::sync::Arc;

use tracing::debug;
use url::form_urlencoded;

use crate::route::{NavigationTarget, RouteName};

pub const LOGIN_PATH: &str = "/login";
pub const DASHBOARD_PATH: &str = "/";

/// Session state the gate consults.
pub trait AuthState {
    /// Whether a session is currently held.
    fn is_authenticated(&self) -> bool;

    /// Try to rebuild the session from persisted state. Returns whether a
    /// session is held afterwards.
    fn restore_session(&self) -> bool;
}

impl<T: AuthState + ?Sized> AuthState for Arc<T> {
    fn is_authenticated(&self) -> bool {
        (**self).is_authenticated()
    }

    fn restore_session(&self) -> bool {
        (**self).restore_session()
    }
}

impl<T: AuthState + ?Sized> AuthState for &T {
    fn is_authenticated(&self) -> bool {
        (**self).is_authenticated()
    }

    fn restore_session(&self) -> bool {
        (**self).restore_session()
    }
}

/// What to do with a navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Proceed,
    /// Go to the login view, carrying the requested location for resumption.
    RedirectToLogin { redirect: String },
    RedirectToDashboard,
}

impl Decision {
    /// The location to navigate to instead, if any.
    pub fn location(&self) -> Option<String> {
        match self {
            Self::Proceed => None,
            Self::RedirectToLogin { redirect } => Some(login_location(redirect)),
            Self::RedirectToDashboard => Some(DASHBOARD_PATH.to_owned()),
        }
    }
}

/// Decides, per navigation, whether to proceed or redirect.
#[derive(Debug, Clone)]
pub struct SessionGate<A> {
    auth: A,
}

impl<A: AuthState> SessionGate<A> {
    pub fn new(auth: A) -> Self {
        Self { auth }
    }

    pub fn auth(&self) -> &A {
        &self.auth
    }

    /// A protected target gets one session restoration attempt before the
    /// login redirect, so persisted credentials survive a restart.
    pub fn check(&self, target: &NavigationTarget) -> Decision {
        let authenticated = self.auth.is_authenticated();

        let decision = if target.requires_auth {
            if authenticated || self.auth.restore_session() {
                Decision::Proceed
            } else {
                Decision::RedirectToLogin {
                    redirect: target.full_path.clone(),
                }
            }
        } else if authenticated && matches!(target.name, RouteName::Login | RouteName::Register) {
            Decision::RedirectToDashboard
        } else {
            Decision::Proceed
        };

        debug!(
            route = %target.name,
            path = %target.full_path,
            authenticated,
            ?decision,
            "navigation checked"
        );
        decision
    }
}

/// `/login?redirect=<encoded location>`.
pub fn login_location(redirect: &str) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("redirect", redirect)
        .finish();
    format!("{LOGIN_PATH}?{query}")
}

/// Where to go after a successful login on `login_location`.
///
/// Only local paths are honoured; anything else lands on the dashboard.
pub fn resume_target(login_location: &str) -> String {
    let query = match login_location.split_once('?') {
        Some((_, rest)) => rest.split('#').next().unwrap_or_default(),
        None => return DASHBOARD_PATH.to_owned(),
    };

    form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == "redirect")
        .map(|(_, value)| value.into_owned())
        .filter(|target| is_local(target))
        .unwrap_or_else(|| DASHBOARD_PATH.to_owned())
}

fn is_local(target: &str) -> bool {
    target.starts_with('/') && !target.starts_with("//") && !target.contains('\\')
}
