//! services/api/src/web/auth.rs
//!
//! Authentication endpoints for user signup, login, logout and session
//! resolution, plus the owner-side active-status toggle.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use chrono::{Duration, Utc};
use foodbridge_core::domain::AppRole;
use foodbridge_core::ports::{ChangeOp, PortError, StoreTable};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, OnceLock};
use tracing::{error, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::web::middleware::{session_cookie, CurrentUser};
use crate::web::protocol::ProfileView;
use crate::web::state::AppState;

/// Matches the original signup form's minimum password rule.
const MIN_PASSWORD_LEN: usize = 6;

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex"))
}

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub phone: String,
    pub city: String,
    /// One of `donor`, `ngo`, `volunteer`. Admin accounts are seeded, not
    /// self-registered.
    pub role: String,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize, ToSchema)]
pub struct AuthResponse {
    pub user_id: Uuid,
    pub email: String,
    /// Missing when the account has no role assignment; the client then lands
    /// on the public page rather than a dashboard.
    pub role: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct MeResponse {
    pub user_id: Uuid,
    pub role: Option<String>,
    pub profile: Option<ProfileView>,
}

#[derive(Deserialize, ToSchema)]
pub struct ActiveStatusRequest {
    pub is_active: bool,
}

fn session_set_cookie(session_id: &str, ttl: Duration) -> String {
    format!(
        "session={}; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age={}",
        session_id,
        ttl.num_seconds()
    )
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /auth/signup - Create a new user account with its profile and role
#[utoipa::path(
    post,
    path = "/auth/signup",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "User created successfully", body = AuthResponse),
        (status = 400, description = "Invalid request"),
        (status = 409, description = "An account with this email already exists"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn signup_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SignupRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    // 1. Validate the form fields. Identity errors are surfaced verbatim.
    if !email_regex().is_match(&req.email) {
        return Err((StatusCode::BAD_REQUEST, "Invalid email address".to_string()));
    }
    if req.password.len() < MIN_PASSWORD_LEN {
        return Err((
            StatusCode::BAD_REQUEST,
            format!("Password must be at least {} characters", MIN_PASSWORD_LEN),
        ));
    }
    if req.full_name.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Name is required".to_string()));
    }
    let role = match req.role.parse::<AppRole>() {
        Ok(AppRole::Admin) | Err(_) => {
            return Err((
                StatusCode::BAD_REQUEST,
                "Role must be donor, ngo or volunteer".to_string(),
            ));
        }
        Ok(role) => role,
    };

    // 2. Hash the password.
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let password_hash = argon2
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(|e| {
            error!("Failed to hash password: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to hash password".to_string())
        })?
        .to_string();

    // 3. Create the user; a duplicate email is reported as such, not as a
    //    generic failure.
    let user = state
        .db
        .create_user_with_email(&req.email, &password_hash)
        .await
        .map_err(|e| match e {
            PortError::Duplicate(message) => (StatusCode::CONFLICT, message),
            other => {
                error!("Failed to create user: {:?}", other);
                (StatusCode::INTERNAL_SERVER_ERROR, "Failed to create user".to_string())
            }
        })?;

    // 4. Create the profile and role rows the dashboards resolve at sign-in.
    state
        .db
        .create_profile(user.user_id, req.full_name.trim(), &req.phone, &req.city)
        .await
        .map_err(|e| {
            error!("Failed to create profile: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to create profile".to_string())
        })?;
    state.db.assign_role(user.user_id, role).await.map_err(|e| {
        error!("Failed to assign role: {:?}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, "Failed to assign role".to_string())
    })?;

    // 5. Open an auth session and hand the cookie back.
    let auth_session_id = Uuid::new_v4().to_string();
    let ttl = Duration::days(state.config.session_ttl_days);
    let expires_at = Utc::now() + ttl;

    state
        .db
        .create_auth_session(&auth_session_id, user.user_id, expires_at)
        .await
        .map_err(|e| {
            error!("Failed to create auth session: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to create session".to_string())
        })?;

    let cookie = session_set_cookie(&auth_session_id, ttl);

    // New accounts show up on the admin user list.
    state.feed.publish(StoreTable::Profiles, ChangeOp::Insert);

    let response = AuthResponse {
        user_id: user.user_id,
        email: user.email,
        role: Some(role.as_str().to_string()),
    };

    Ok((
        StatusCode::CREATED,
        [(header::SET_COOKIE, cookie)],
        Json(response),
    ))
}

/// POST /auth/login - Login with existing account
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    // 1. Get user by email. An unknown email reads the same as a bad password.
    let user_creds = state
        .db
        .get_user_by_email(&req.email)
        .await
        .map_err(|_| (StatusCode::UNAUTHORIZED, "Invalid email or password".to_string()))?;

    // 2. Verify the password.
    let parsed_hash = PasswordHash::new(&user_creds.hashed_password).map_err(|e| {
        error!("Failed to parse password hash: {:?}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, "Authentication error".to_string())
    })?;

    let valid = Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .is_ok();

    if !valid {
        return Err((StatusCode::UNAUTHORIZED, "Invalid email or password".to_string()));
    }

    // 3. Resolve the role so the client can route to the right dashboard.
    //    A role-less account is not an error; it simply gets no dashboard.
    let role = state.db.get_role(user_creds.user_id).await.ok();

    // 4. Open an auth session and hand the cookie back.
    let auth_session_id = Uuid::new_v4().to_string();
    let ttl = Duration::days(state.config.session_ttl_days);
    let expires_at = Utc::now() + ttl;

    state
        .db
        .create_auth_session(&auth_session_id, user_creds.user_id, expires_at)
        .await
        .map_err(|e| {
            error!("Failed to create auth session: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to create session".to_string())
        })?;

    let cookie = session_set_cookie(&auth_session_id, ttl);

    let response = AuthResponse {
        user_id: user_creds.user_id,
        email: user_creds.email,
        role: role.map(|r| r.as_str().to_string()),
    };

    Ok((StatusCode::OK, [(header::SET_COOKIE, cookie)], Json(response)))
}

/// POST /auth/logout - Logout and invalidate session
///
/// Signing out always succeeds from the caller's point of view: the cookie is
/// cleared even if deleting the server-side session fails.
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 200, description = "Logout successful")
    )
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    headers: axum::http::HeaderMap,
) -> impl IntoResponse {
    if let Some(auth_session_id) = session_cookie(&headers) {
        if let Err(e) = state.db.delete_auth_session(auth_session_id).await {
            warn!("Failed to delete auth session on logout: {:?}", e);
        }
    }

    let cookie = "session=; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age=0";
    (StatusCode::OK, [(header::SET_COOKIE, cookie.to_string())])
}

/// GET /auth/me - Resolve the current session's identity, role and profile
#[utoipa::path(
    get,
    path = "/auth/me",
    responses(
        (status = 200, description = "Current session", body = MeResponse),
        (status = 303, description = "No active session")
    )
)]
pub async fn me_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    // A missing profile row is tolerated: the account is still usable, the
    // client just has nothing to display for it.
    let profile = state.db.get_profile(user.user_id).await.ok();

    Ok(Json(MeResponse {
        user_id: user.user_id,
        role: user.role.map(|r| r.as_str().to_string()),
        profile: profile.map(ProfileView::from),
    }))
}

/// PUT /me/active - Toggle the caller's own availability flag
///
/// For volunteers this gates the visibility of new available pickups; any
/// in-flight deliveries they already claimed stay visible.
#[utoipa::path(
    put,
    path = "/me/active",
    request_body = ActiveStatusRequest,
    responses(
        (status = 200, description = "Profile updated", body = ProfileView),
        (status = 404, description = "No profile for this account"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn update_active_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<ActiveStatusRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let profile = state
        .db
        .set_active_status(user.user_id, req.is_active)
        .await
        .map_err(|e| match e {
            PortError::NotFound(message) => (StatusCode::NOT_FOUND, message),
            other => {
                error!("Failed to update active status: {:?}", other);
                (StatusCode::INTERNAL_SERVER_ERROR, "Failed to update profile".to_string())
            }
        })?;

    state.feed.publish(StoreTable::Profiles, ChangeOp::Update);

    Ok(Json(ProfileView::from(profile)))
}
