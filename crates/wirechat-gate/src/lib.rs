//! Navigation gate for wirechat.
//!
//! Every navigation resolves to a [`NavigationTarget`]; a [`SessionGate`]
//! then decides whether it may proceed, must go to the login view first, or
//! should skip the login view because a session is already held.

mod gate;
mod route;

pub use gate::{
    AuthState, DASHBOARD_PATH, Decision, LOGIN_PATH, SessionGate, login_location, resume_target,
};
pub use route::{NavigationTarget, RouteError, RouteName, RouteTable};
