//! crates/foodbridge_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// The single role attached to every user identity at signup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AppRole {
    Donor,
    Ngo,
    Volunteer,
    Admin,
}

impl AppRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppRole::Donor => "donor",
            AppRole::Ngo => "ngo",
            AppRole::Volunteer => "volunteer",
            AppRole::Admin => "admin",
        }
    }
}

impl fmt::Display for AppRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "donor" => Ok(AppRole::Donor),
            "ngo" => Ok(AppRole::Ngo),
            "volunteer" => Ok(AppRole::Volunteer),
            "admin" => Ok(AppRole::Admin),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

/// The donation lifecycle states, in workflow order.
///
/// The derived `Ord` follows declaration order, so `Pending < Accepted <
/// PickedUp < Delivered` holds and a status may never move to a smaller value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DonationStatus {
    Pending,
    Accepted,
    PickedUp,
    Delivered,
}

impl DonationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DonationStatus::Pending => "pending",
            DonationStatus::Accepted => "accepted",
            DonationStatus::PickedUp => "picked_up",
            DonationStatus::Delivered => "delivered",
        }
    }

    /// `Delivered` is terminal; nothing transitions out of it.
    pub fn is_terminal(&self) -> bool {
        matches!(self, DonationStatus::Delivered)
    }
}

impl fmt::Display for DonationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DonationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(DonationStatus::Pending),
            "accepted" => Ok(DonationStatus::Accepted),
            "picked_up" => Ok(DonationStatus::PickedUp),
            "delivered" => Ok(DonationStatus::Delivered),
            other => Err(format!("unknown donation status '{}'", other)),
        }
    }
}

/// One surplus-food offering posted by a donor, tracked through the fixed
/// `pending → accepted → picked_up → delivered` lifecycle.
#[derive(Debug, Clone, PartialEq)]
pub struct Donation {
    pub id: Uuid,
    pub donor_id: Uuid,
    /// Set exactly once, by the accepting NGO. Non-null iff status >= accepted.
    pub ngo_id: Option<Uuid>,
    /// Set exactly once, by the claiming volunteer. Non-null iff status >= picked_up.
    pub volunteer_id: Option<Uuid>,
    pub food_item: String,
    pub quantity: String,
    pub description: String,
    pub city: String,
    pub pickup_address: String,
    pub food_source: String,
    /// Advisory only: stored and displayed, never enforced.
    pub expiry_time: DateTime<Utc>,
    pub status: DonationStatus,
    pub created_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub picked_up_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
}

impl Donation {
    /// Checks that the actor-id columns agree with the status: `ngo_id` is
    /// non-null iff the donation has been accepted, `volunteer_id` is non-null
    /// iff it has been picked up.
    pub fn actor_fields_consistent(&self) -> bool {
        let accepted = self.status >= DonationStatus::Accepted;
        let picked_up = self.status >= DonationStatus::PickedUp;
        self.ngo_id.is_some() == accepted && self.volunteer_id.is_some() == picked_up
    }

    /// Checks that the non-null lifecycle timestamps are strictly increasing
    /// in workflow order (created, accepted, picked up, delivered).
    pub fn timestamps_monotonic(&self) -> bool {
        let present: Vec<DateTime<Utc>> = [
            Some(self.created_at),
            self.accepted_at,
            self.picked_up_at,
            self.delivered_at,
        ]
        .into_iter()
        .flatten()
        .collect();
        present.windows(2).all(|pair| pair[0] < pair[1])
    }
}

/// The immutable attributes a donor supplies when posting a donation.
/// Everything else (id, status, timestamps) is assigned by the store.
#[derive(Debug, Clone)]
pub struct NewDonation {
    pub donor_id: Uuid,
    pub food_item: String,
    pub quantity: String,
    pub description: String,
    pub city: String,
    pub pickup_address: String,
    pub food_source: String,
    pub expiry_time: DateTime<Utc>,
}

// Represents a user - used throughout app
#[derive(Debug, Clone)]
pub struct User {
    pub user_id: Uuid,
    pub email: String,
}

// Only used internally for login/signup - contains sensitive data
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user_id: Uuid,
    pub email: String,
    pub hashed_password: String,
}

// Represents a browser login session (auth cookie)
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub id: String,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

/// Per-user profile, created at signup. `is_active` gates a volunteer's
/// visibility of available pickups and is the admin's block/unblock switch.
#[derive(Debug, Clone)]
pub struct Profile {
    pub user_id: Uuid,
    pub full_name: String,
    pub phone: String,
    pub city: String,
    pub is_active: bool,
}

/// A profile joined with its role and email — the admin moderation row.
#[derive(Debug, Clone)]
pub struct UserAccount {
    pub profile: Profile,
    pub role: AppRole,
    pub email: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageStatus {
    New,
    Resolved,
}

impl MessageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageStatus::New => "new",
            MessageStatus::Resolved => "resolved",
        }
    }
}

impl FromStr for MessageStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(MessageStatus::New),
            "resolved" => Ok(MessageStatus::Resolved),
            other => Err(format!("unknown message status '{}'", other)),
        }
    }
}

/// A message submitted through the public contact form. Independent of the
/// donation lifecycle; moderated by the admin.
#[derive(Debug, Clone)]
pub struct ContactMessage {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
    pub status: MessageStatus,
    pub created_at: DateTime<Utc>,
}

/// Aggregate donation counts for the admin overview.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DonationCounts {
    pub total: i64,
    pub pending: i64,
    pub accepted: i64,
    pub picked_up: i64,
    pub delivered: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn donation(status: DonationStatus) -> Donation {
        let t0 = Utc::now();
        Donation {
            id: Uuid::new_v4(),
            donor_id: Uuid::new_v4(),
            ngo_id: (status >= DonationStatus::Accepted).then(Uuid::new_v4),
            volunteer_id: (status >= DonationStatus::PickedUp).then(Uuid::new_v4),
            food_item: "Veg Biryani".into(),
            quantity: "50 servings".into(),
            description: "Biryani and raita".into(),
            city: "Pune".into(),
            pickup_address: "12 MG Road".into(),
            food_source: "hotel".into(),
            expiry_time: t0 + Duration::hours(4),
            status,
            created_at: t0,
            accepted_at: (status >= DonationStatus::Accepted).then(|| t0 + Duration::minutes(5)),
            picked_up_at: (status >= DonationStatus::PickedUp).then(|| t0 + Duration::minutes(20)),
            delivered_at: (status >= DonationStatus::Delivered).then(|| t0 + Duration::minutes(50)),
        }
    }

    #[test]
    fn status_order_follows_workflow() {
        assert!(DonationStatus::Pending < DonationStatus::Accepted);
        assert!(DonationStatus::Accepted < DonationStatus::PickedUp);
        assert!(DonationStatus::PickedUp < DonationStatus::Delivered);
        assert!(DonationStatus::Delivered.is_terminal());
        assert!(!DonationStatus::PickedUp.is_terminal());
    }

    #[test]
    fn status_and_role_round_trip_through_wire_names() {
        for status in [
            DonationStatus::Pending,
            DonationStatus::Accepted,
            DonationStatus::PickedUp,
            DonationStatus::Delivered,
        ] {
            assert_eq!(status.as_str().parse::<DonationStatus>(), Ok(status));
        }
        for role in [AppRole::Donor, AppRole::Ngo, AppRole::Volunteer, AppRole::Admin] {
            assert_eq!(role.as_str().parse::<AppRole>(), Ok(role));
        }
        assert!("rejected".parse::<DonationStatus>().is_err());
    }

    #[test]
    fn actor_fields_track_status() {
        for status in [
            DonationStatus::Pending,
            DonationStatus::Accepted,
            DonationStatus::PickedUp,
            DonationStatus::Delivered,
        ] {
            assert!(donation(status).actor_fields_consistent(), "{status}");
        }

        let mut bad = donation(DonationStatus::Pending);
        bad.ngo_id = Some(Uuid::new_v4());
        assert!(!bad.actor_fields_consistent());

        let mut bad = donation(DonationStatus::Delivered);
        bad.volunteer_id = None;
        assert!(!bad.actor_fields_consistent());
    }

    #[test]
    fn timestamps_must_strictly_increase() {
        assert!(donation(DonationStatus::Delivered).timestamps_monotonic());

        let mut bad = donation(DonationStatus::Delivered);
        bad.delivered_at = Some(bad.created_at);
        assert!(!bad.timestamps_monotonic());

        let mut equal = donation(DonationStatus::Accepted);
        equal.accepted_at = Some(equal.created_at);
        assert!(!equal.timestamps_monotonic());
    }
}
