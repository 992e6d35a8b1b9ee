//! services/api/src/web/admin.rs
//!
//! The admin moderation surface: the unfiltered donation view with aggregate
//! counts, user block/unblock, donation removal and the contact inbox. Every
//! route here sits behind the admin role gate.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use foodbridge_core::ports::{ChangeOp, StoreTable};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::web::protocol::{
    donation_views, ContactMessageView, CountsView, DonationView, ProfileView, UserAccountView,
};
use crate::web::rest::port_error_response;
use crate::web::state::AppState;

#[derive(Deserialize, ToSchema)]
pub struct UserActiveRequest {
    pub is_active: bool,
}

/// Every donation in the system, newest first.
#[utoipa::path(
    get,
    path = "/admin/donations",
    responses(
        (status = 200, description = "All donations", body = [DonationView]),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn list_donations_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let donations = state
        .db
        .all_donations()
        .await
        .map_err(|e| port_error_response("list all donations", e))?;

    Ok(Json(donation_views(donations)))
}

/// Aggregate donation counts for the overview cards.
#[utoipa::path(
    get,
    path = "/admin/stats",
    responses(
        (status = 200, description = "Donation counts by status", body = CountsView),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn donation_stats_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let counts = state
        .db
        .donation_counts()
        .await
        .map_err(|e| port_error_response("load donation stats", e))?;

    Ok(Json(CountsView::from(counts)))
}

/// Remove a donation outright. Moderation only; the lifecycle has no
/// cancellation transition.
#[utoipa::path(
    delete,
    path = "/admin/donations/{id}",
    params(("id" = Uuid, Path, description = "The donation to delete")),
    responses(
        (status = 204, description = "Donation deleted"),
        (status = 404, description = "No such donation"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn delete_donation_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    state
        .db
        .delete_donation(id)
        .await
        .map_err(|e| port_error_response("delete donation", e))?;

    state.feed.publish(StoreTable::Donations, ChangeOp::Delete);

    Ok(StatusCode::NO_CONTENT)
}

/// Every registered account with profile and role.
#[utoipa::path(
    get,
    path = "/admin/users",
    responses(
        (status = 200, description = "All user accounts", body = [UserAccountView]),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn list_users_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let accounts = state
        .db
        .list_user_accounts()
        .await
        .map_err(|e| port_error_response("list users", e))?;

    Ok(Json(
        accounts
            .into_iter()
            .map(UserAccountView::from)
            .collect::<Vec<_>>(),
    ))
}

/// Block or unblock an account. Last write wins against the owner's own
/// toggle; no guard is needed for that race.
#[utoipa::path(
    put,
    path = "/admin/users/{id}/active",
    params(("id" = Uuid, Path, description = "The user to update")),
    request_body = UserActiveRequest,
    responses(
        (status = 200, description = "Profile updated", body = ProfileView),
        (status = 404, description = "No such user"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn set_user_active_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<UserActiveRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let profile = state
        .db
        .set_active_status(id, req.is_active)
        .await
        .map_err(|e| port_error_response("update user", e))?;

    state.feed.publish(StoreTable::Profiles, ChangeOp::Update);

    Ok(Json(ProfileView::from(profile)))
}

/// The contact inbox, newest first.
#[utoipa::path(
    get,
    path = "/admin/messages",
    responses(
        (status = 200, description = "All contact messages", body = [ContactMessageView]),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn list_messages_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let messages = state
        .db
        .list_contact_messages()
        .await
        .map_err(|e| port_error_response("list contact messages", e))?;

    Ok(Json(
        messages
            .into_iter()
            .map(ContactMessageView::from)
            .collect::<Vec<_>>(),
    ))
}

/// Mark a contact message handled.
#[utoipa::path(
    post,
    path = "/admin/messages/{id}/resolve",
    params(("id" = Uuid, Path, description = "The message to resolve")),
    responses(
        (status = 200, description = "Message resolved", body = ContactMessageView),
        (status = 404, description = "No such message"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn resolve_message_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let message = state
        .db
        .resolve_contact_message(id)
        .await
        .map_err(|e| port_error_response("resolve contact message", e))?;

    state
        .feed
        .publish(StoreTable::ContactMessages, ChangeOp::Update);

    Ok(Json(ContactMessageView::from(message)))
}
