//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the donor, NGO and volunteer surfaces, the
//! public contact form, and the master definition for the OpenAPI
//! specification.
//!
//! Every transition handler works the same way: ask the store for the
//! conditional update, map a precondition miss to 409 (the "someone else got
//! there first" signal the client renders differently from a failure), and on
//! success return the updated row and publish a change event so every
//! subscribed dashboard refetches.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use chrono::{DateTime, Utc};
use foodbridge_core::domain::NewDonation;
use foodbridge_core::ports::{ChangeOp, PortError, StoreTable};
use serde::Deserialize;
use std::sync::Arc;
use tracing::error;
use utoipa::{OpenApi, ToSchema};
use uuid::Uuid;

use crate::web::admin;
use crate::web::auth;
use crate::web::middleware::CurrentUser;
use crate::web::protocol::{
    donation_views, ContactMessageView, CountsView, DonationView, ProfileView, UserAccountView,
};
use crate::web::state::AppState;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::signup_handler,
        auth::login_handler,
        auth::logout_handler,
        auth::me_handler,
        auth::update_active_handler,
        create_donation_handler,
        my_donations_handler,
        available_donations_handler,
        accepted_donations_handler,
        accept_donation_handler,
        claimable_donations_handler,
        my_deliveries_handler,
        claim_donation_handler,
        deliver_donation_handler,
        submit_contact_handler,
        admin::list_donations_handler,
        admin::donation_stats_handler,
        admin::delete_donation_handler,
        admin::list_users_handler,
        admin::set_user_active_handler,
        admin::list_messages_handler,
        admin::resolve_message_handler,
    ),
    components(
        schemas(
            auth::SignupRequest,
            auth::LoginRequest,
            auth::AuthResponse,
            auth::MeResponse,
            auth::ActiveStatusRequest,
            CreateDonationRequest,
            ContactRequest,
            admin::UserActiveRequest,
            DonationView,
            ProfileView,
            UserAccountView,
            ContactMessageView,
            CountsView,
        )
    ),
    tags(
        (name = "FoodBridge API", description = "API endpoints for the food donation matching platform.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// Shared Error Mapping
//=========================================================================================

/// Maps a port failure onto its HTTP response: conflicts and duplicates
/// become 409, missing rows 404, and only genuinely unexpected store
/// failures become an opaque 500.
pub(crate) fn port_error_response(context: &str, err: PortError) -> (StatusCode, String) {
    match err {
        PortError::Conflict(message) => (StatusCode::CONFLICT, message),
        PortError::Duplicate(message) => (StatusCode::CONFLICT, message),
        PortError::NotFound(message) => (StatusCode::NOT_FOUND, message),
        PortError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
        PortError::Unexpected(message) => {
            error!("Failed to {}: {}", context, message);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to {}", context),
            )
        }
    }
}

//=========================================================================================
// API Request Payload Structs
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct CreateDonationRequest {
    pub food_item: String,
    pub quantity: String,
    pub description: String,
    pub pickup_address: String,
    /// `home` or `hotel`; defaults to `home` like the original form.
    pub food_source: Option<String>,
    pub expiry_time: DateTime<Utc>,
}

#[derive(Deserialize, ToSchema)]
pub struct ContactRequest {
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
}

//=========================================================================================
// Donor Handlers
//=========================================================================================

/// Post a new donation. It enters the lifecycle as `pending` and immediately
/// appears in every NGO's available list.
#[utoipa::path(
    post,
    path = "/donations",
    request_body = CreateDonationRequest,
    responses(
        (status = 201, description = "Donation posted", body = DonationView),
        (status = 400, description = "Invalid request"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn create_donation_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<CreateDonationRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    if req.food_item.trim().is_empty() || req.quantity.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "Food item and quantity are required".to_string(),
        ));
    }
    if req.pickup_address.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "A pickup address is required".to_string(),
        ));
    }

    // The donation is listed under the donor's profile city.
    let city = state
        .db
        .get_profile(user.user_id)
        .await
        .map(|p| p.city)
        .unwrap_or_default();

    let donation = state
        .db
        .create_donation(NewDonation {
            donor_id: user.user_id,
            food_item: req.food_item,
            quantity: req.quantity,
            description: req.description,
            city,
            pickup_address: req.pickup_address,
            food_source: req.food_source.unwrap_or_else(|| "home".to_string()),
            expiry_time: req.expiry_time,
        })
        .await
        .map_err(|e| port_error_response("post donation", e))?;

    state.feed.publish(StoreTable::Donations, ChangeOp::Insert);

    Ok((StatusCode::CREATED, Json(DonationView::from(donation))))
}

/// The donor's personal history, every status, newest first.
#[utoipa::path(
    get,
    path = "/donations/mine",
    responses(
        (status = 200, description = "The caller's donations", body = [DonationView]),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn my_donations_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let donations = state
        .db
        .donations_by_donor(user.user_id)
        .await
        .map_err(|e| port_error_response("list donations", e))?;

    Ok(Json(donation_views(donations)))
}

//=========================================================================================
// NGO Handlers
//=========================================================================================

/// The shared pending set every NGO dashboard contends over.
#[utoipa::path(
    get,
    path = "/donations/available",
    responses(
        (status = 200, description = "Donations available to accept", body = [DonationView]),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn available_donations_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let donations = state
        .db
        .pending_donations()
        .await
        .map_err(|e| port_error_response("list available donations", e))?;

    Ok(Json(donation_views(donations)))
}

/// Donations this NGO has accepted, through any later status.
#[utoipa::path(
    get,
    path = "/donations/accepted",
    responses(
        (status = 200, description = "Donations accepted by the caller", body = [DonationView]),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn accepted_donations_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let donations = state
        .db
        .donations_accepted_by(user.user_id)
        .await
        .map_err(|e| port_error_response("list accepted donations", e))?;

    Ok(Json(donation_views(donations)))
}

/// Accept a pending donation, claiming it exclusively for this NGO.
///
/// Two NGOs racing for the same donation is the expected case: the store
/// applies exactly one of the conditional updates and the loser gets a 409.
#[utoipa::path(
    post,
    path = "/donations/{id}/accept",
    params(("id" = Uuid, Path, description = "The donation to accept")),
    responses(
        (status = 200, description = "Donation accepted", body = DonationView),
        (status = 409, description = "The donation is no longer pending"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn accept_donation_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let donation = state
        .db
        .accept_donation(id, user.user_id)
        .await
        .map_err(|e| port_error_response("accept donation", e))?;

    state.feed.publish(StoreTable::Donations, ChangeOp::Update);

    Ok(Json(DonationView::from(donation)))
}

//=========================================================================================
// Volunteer Handlers
//=========================================================================================

/// Accepted donations with no volunteer yet — the contended pickup set.
///
/// An inactive volunteer sees an empty list: the availability toggle gates
/// visibility of new pickup work, nothing else.
#[utoipa::path(
    get,
    path = "/pickups/available",
    responses(
        (status = 200, description = "Donations available to claim", body = [DonationView]),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn claimable_donations_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let is_active = match state.db.get_profile(user.user_id).await {
        Ok(profile) => profile.is_active,
        // No profile row reads as inactive; a store failure still surfaces.
        Err(PortError::NotFound(_)) => false,
        Err(e) => return Err(port_error_response("list available pickups", e)),
    };
    if !is_active {
        return Ok(Json(Vec::<DonationView>::new()));
    }

    let donations = state
        .db
        .claimable_donations()
        .await
        .map_err(|e| port_error_response("list available pickups", e))?;

    Ok(Json(donation_views(donations)))
}

/// Everything this volunteer has claimed, in flight or delivered.
#[utoipa::path(
    get,
    path = "/deliveries/mine",
    responses(
        (status = 200, description = "The caller's deliveries", body = [DonationView]),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn my_deliveries_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let donations = state
        .db
        .deliveries_for(user.user_id)
        .await
        .map_err(|e| port_error_response("list deliveries", e))?;

    Ok(Json(donation_views(donations)))
}

/// Claim an accepted donation for pickup, exclusively for this volunteer.
#[utoipa::path(
    post,
    path = "/donations/{id}/claim",
    params(("id" = Uuid, Path, description = "The donation to claim")),
    responses(
        (status = 200, description = "Pickup claimed", body = DonationView),
        (status = 409, description = "The donation was already claimed"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn claim_donation_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let donation = state
        .db
        .claim_donation(id, user.user_id)
        .await
        .map_err(|e| port_error_response("claim pickup", e))?;

    state.feed.publish(StoreTable::Donations, ChangeOp::Update);

    Ok(Json(DonationView::from(donation)))
}

/// Mark a picked-up donation as delivered. Only the claiming volunteer may.
#[utoipa::path(
    post,
    path = "/donations/{id}/deliver",
    params(("id" = Uuid, Path, description = "The donation to mark delivered")),
    responses(
        (status = 200, description = "Donation delivered", body = DonationView),
        (status = 409, description = "Not the claiming volunteer, or not picked up"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn deliver_donation_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let donation = state
        .db
        .deliver_donation(id, user.user_id)
        .await
        .map_err(|e| port_error_response("mark delivered", e))?;

    state.feed.publish(StoreTable::Donations, ChangeOp::Update);

    Ok(Json(DonationView::from(donation)))
}

//=========================================================================================
// Contact Handler (public)
//=========================================================================================

/// Submit a message through the public contact form.
#[utoipa::path(
    post,
    path = "/contact",
    request_body = ContactRequest,
    responses(
        (status = 201, description = "Message received", body = ContactMessageView),
        (status = 400, description = "Invalid request"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn submit_contact_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ContactRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    if req.name.trim().is_empty() || req.message.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "Name and message are required".to_string(),
        ));
    }

    let message = state
        .db
        .create_contact_message(&req.name, &req.email, &req.subject, &req.message)
        .await
        .map_err(|e| port_error_response("submit contact message", e))?;

    state
        .feed
        .publish(StoreTable::ContactMessages, ChangeOp::Insert);

    Ok((StatusCode::CREATED, Json(ContactMessageView::from(message))))
}
