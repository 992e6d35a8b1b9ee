//! services/api/src/web/protocol.rs
//!
//! Defines the wire shapes shared by the REST handlers and the WebSocket feed:
//! the per-entity view structs, and the message protocol for the realtime
//! dashboard synchronization.

use chrono::{DateTime, Utc};
use foodbridge_core::domain::{
    ContactMessage, Donation, DonationCounts, Profile, UserAccount,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

//=========================================================================================
// Entity Views (the single serialization boundary out of the domain)
//=========================================================================================

/// The one wire shape for a donation, used by REST responses and snapshots alike.
#[derive(Serialize, Debug, Clone, ToSchema)]
pub struct DonationView {
    pub id: Uuid,
    pub donor_id: Uuid,
    pub ngo_id: Option<Uuid>,
    pub volunteer_id: Option<Uuid>,
    pub food_item: String,
    pub quantity: String,
    pub description: String,
    pub city: String,
    pub pickup_address: String,
    pub food_source: String,
    pub expiry_time: DateTime<Utc>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub picked_up_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
}

impl From<Donation> for DonationView {
    fn from(d: Donation) -> Self {
        Self {
            id: d.id,
            donor_id: d.donor_id,
            ngo_id: d.ngo_id,
            volunteer_id: d.volunteer_id,
            food_item: d.food_item,
            quantity: d.quantity,
            description: d.description,
            city: d.city,
            pickup_address: d.pickup_address,
            food_source: d.food_source,
            expiry_time: d.expiry_time,
            status: d.status.as_str().to_string(),
            created_at: d.created_at,
            accepted_at: d.accepted_at,
            picked_up_at: d.picked_up_at,
            delivered_at: d.delivered_at,
        }
    }
}

pub fn donation_views(donations: Vec<Donation>) -> Vec<DonationView> {
    donations.into_iter().map(DonationView::from).collect()
}

#[derive(Serialize, Debug, Clone, ToSchema)]
pub struct ProfileView {
    pub user_id: Uuid,
    pub full_name: String,
    pub phone: String,
    pub city: String,
    pub is_active: bool,
}

impl From<Profile> for ProfileView {
    fn from(p: Profile) -> Self {
        Self {
            user_id: p.user_id,
            full_name: p.full_name,
            phone: p.phone,
            city: p.city,
            is_active: p.is_active,
        }
    }
}

/// One row of the admin user table: profile, role and email together.
#[derive(Serialize, Debug, Clone, ToSchema)]
pub struct UserAccountView {
    pub user_id: Uuid,
    pub full_name: String,
    pub phone: String,
    pub city: String,
    pub is_active: bool,
    pub role: String,
    pub email: String,
}

impl From<UserAccount> for UserAccountView {
    fn from(a: UserAccount) -> Self {
        Self {
            user_id: a.profile.user_id,
            full_name: a.profile.full_name,
            phone: a.profile.phone,
            city: a.profile.city,
            is_active: a.profile.is_active,
            role: a.role.as_str().to_string(),
            email: a.email,
        }
    }
}

#[derive(Serialize, Debug, Clone, ToSchema)]
pub struct ContactMessageView {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl From<ContactMessage> for ContactMessageView {
    fn from(m: ContactMessage) -> Self {
        Self {
            id: m.id,
            name: m.name,
            email: m.email,
            subject: m.subject,
            message: m.message,
            status: m.status.as_str().to_string(),
            created_at: m.created_at,
        }
    }
}

#[derive(Serialize, Debug, Clone, Copy, ToSchema)]
pub struct CountsView {
    pub total: i64,
    pub pending: i64,
    pub accepted: i64,
    pub picked_up: i64,
    pub delivered: i64,
}

impl From<DonationCounts> for CountsView {
    fn from(c: DonationCounts) -> Self {
        Self {
            total: c.total,
            pending: c.pending,
            accepted: c.accepted,
            picked_up: c.picked_up,
            delivered: c.delivered,
        }
    }
}

//=========================================================================================
// Messages Sent FROM the Client (Browser) TO the Server
//=========================================================================================

/// Represents the structured text messages a client can send to the server.
#[derive(Deserialize, Debug)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Opens the feed. This must be the first message sent on the connection;
    /// the server answers with `FeedInitialized` and an initial snapshot.
    Init,
}

//=========================================================================================
// Messages Sent FROM the Server TO the Client (Browser)
//=========================================================================================
// Every snapshot replaces the client's lists wholesale. There are no deltas:
// after any table change the server re-runs the role's full query set and
// resends it, so concurrently-acting dashboards converge without reloads.
//=========================================================================================

/// Represents the structured text messages the server can send to the client.
#[derive(Serialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Confirms the feed is open for the session's role.
    FeedInitialized { role: String },

    /// The donor's personal history, any status, newest first.
    DonorSnapshot { mine: Vec<DonationView> },

    /// The NGO's two lists: the shared pending set and its own accepted set.
    NgoSnapshot {
        available: Vec<DonationView>,
        accepted: Vec<DonationView>,
    },

    /// The volunteer's two lists plus the activity flag that gates the
    /// available set (an inactive volunteer sees no new pickups).
    VolunteerSnapshot {
        is_active: bool,
        available: Vec<DonationView>,
        deliveries: Vec<DonationView>,
    },

    /// The admin overview: every donation, the aggregate counts, all user
    /// accounts and the contact inbox.
    AdminSnapshot {
        donations: Vec<DonationView>,
        counts: CountsView,
        users: Vec<UserAccountView>,
        messages: Vec<ContactMessageView>,
    },

    /// Reports a fatal error to the client, which should display an error message.
    Error { message: String },
}
