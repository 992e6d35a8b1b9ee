//! services/api/src/web/middleware.rs
//!
//! Session and role middleware for protecting routes.
//!
//! `require_auth` resolves the session cookie into a [`CurrentUser`] extension,
//! re-resolving the role on every request. The per-role guards translate the
//! core gate decision into responses: anonymous callers are redirected to the
//! sign-in entry point, mismatched roles to the landing page — silently, never
//! as an error body.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
    Extension,
};
use foodbridge_core::domain::AppRole;
use foodbridge_core::gate::{authorize, GateDecision, SessionState};
use std::sync::Arc;
use tracing::error;
use uuid::Uuid;

use crate::web::state::AppState;

/// Where the gate sends anonymous sessions.
pub const SIGN_IN_PATH: &str = "/auth";
/// Where the gate sends authenticated sessions whose role does not match.
pub const LANDING_PATH: &str = "/";

/// The resolved identity for one request, inserted by [`require_auth`].
/// `role` is `None` when the user has no role row; the gate treats that
/// exactly like a mismatch.
#[derive(Debug, Clone, Copy)]
pub struct CurrentUser {
    pub user_id: Uuid,
    pub role: Option<AppRole>,
}

impl CurrentUser {
    pub fn session_state(&self) -> SessionState {
        SessionState::Authenticated {
            user_id: self.user_id,
            role: self.role,
        }
    }
}

/// Extracts the auth session id from the Cookie header.
pub fn session_cookie(headers: &axum::http::HeaderMap) -> Option<&str> {
    headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())?
        .split(';')
        .find_map(|c| c.trim().strip_prefix("session="))
}

/// Middleware that validates the auth session cookie and resolves the caller's
/// identity and role for this request.
///
/// The role lookup runs on every request rather than being cached with the
/// session: a just-revoked or just-assigned role takes effect immediately.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Response {
    // 1. Extract the session id from the cookie header.
    let Some(session_id) = session_cookie(req.headers()).map(str::to_owned) else {
        return gate_response(&SessionState::Anonymous, None, req, next).await;
    };

    // 2. Validate the session in the database, get the user id.
    let user_id = match state.db.validate_auth_session(&session_id).await {
        Ok(user_id) => user_id,
        Err(_) => {
            // Unknown or expired session: same as no session at all.
            return gate_response(&SessionState::Anonymous, None, req, next).await;
        }
    };

    // 3. Resolve the role fresh. A missing role is not an error here; the
    //    gate decides what it means for the route being requested.
    let role = state.db.get_role(user_id).await.ok();

    // 4. Insert the resolved identity into request extensions.
    req.extensions_mut().insert(CurrentUser { user_id, role });

    // 5. Continue to the handler (or to a role guard further in).
    next.run(req).await
}

/// Applies the core gate decision for one request.
async fn gate_response(
    session: &SessionState,
    required: Option<AppRole>,
    req: Request,
    next: Next,
) -> Response {
    match authorize(session, required) {
        GateDecision::Render => next.run(req).await,
        GateDecision::RedirectToSignIn => Redirect::to(SIGN_IN_PATH).into_response(),
        GateDecision::RedirectToLanding => Redirect::to(LANDING_PATH).into_response(),
        GateDecision::Wait => {
            // Session resolution completes inline on the server before the
            // gate runs, so this arm is unreachable in practice.
            error!("Authorization gate saw a loading session on the server");
            Redirect::to(SIGN_IN_PATH).into_response()
        }
    }
}

async fn gate_role(
    required: AppRole,
    user: Option<Extension<CurrentUser>>,
    req: Request,
    next: Next,
) -> Response {
    let session = match user {
        Some(Extension(user)) => user.session_state(),
        // Mounted without `require_auth` in front, or the cookie never
        // resolved: treat as anonymous.
        None => SessionState::Anonymous,
    };
    gate_response(&session, Some(required), req, next).await
}

pub async fn require_donor(
    user: Option<Extension<CurrentUser>>,
    req: Request,
    next: Next,
) -> Response {
    gate_role(AppRole::Donor, user, req, next).await
}

pub async fn require_ngo(
    user: Option<Extension<CurrentUser>>,
    req: Request,
    next: Next,
) -> Response {
    gate_role(AppRole::Ngo, user, req, next).await
}

pub async fn require_volunteer(
    user: Option<Extension<CurrentUser>>,
    req: Request,
    next: Next,
) -> Response {
    gate_role(AppRole::Volunteer, user, req, next).await
}

pub async fn require_admin(
    user: Option<Extension<CurrentUser>>,
    req: Request,
    next: Next,
) -> Response {
    gate_role(AppRole::Admin, user, req, next).await
}
