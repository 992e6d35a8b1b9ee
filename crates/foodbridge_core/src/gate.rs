//! crates/foodbridge_core/src/gate.rs
//!
//! The authorization gate: given the current session state and an optional
//! required role, decide whether to render protected content or send the
//! caller elsewhere. Pure and synchronous so it can be re-evaluated on every
//! request and unit-tested as a decision table.

use uuid::Uuid;

use crate::domain::AppRole;

/// The explicit session lifecycle: resolution in flight, no session, or an
/// authenticated identity with its (possibly still unresolved) role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Session resolution has not completed; nothing may render yet.
    Loading,
    Anonymous,
    Authenticated { user_id: Uuid, role: Option<AppRole> },
}

/// What the caller should do with the current request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Session still resolving: show a placeholder, render nothing protected.
    Wait,
    /// No session: send to the sign-in entry point.
    RedirectToSignIn,
    /// Session present but the role does not satisfy the requirement: send to
    /// the public landing page. Never surfaced as an error.
    RedirectToLanding,
    Render,
}

/// Decides render-or-redirect for one request.
///
/// A missing role when one is required is treated identically to a mismatch:
/// a silent redirect, not an error. Protected content is never rendered while
/// the session is still loading.
pub fn authorize(session: &SessionState, required: Option<AppRole>) -> GateDecision {
    match session {
        SessionState::Loading => GateDecision::Wait,
        SessionState::Anonymous => GateDecision::RedirectToSignIn,
        SessionState::Authenticated { role, .. } => match required {
            None => GateDecision::Render,
            Some(required) if *role == Some(required) => GateDecision::Render,
            Some(_) => GateDecision::RedirectToLanding,
        },
    }
}
