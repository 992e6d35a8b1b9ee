//! crates/foodbridge_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the
//! core to be independent of the concrete database and change-feed plumbing.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{
    AppRole, AuthSession, ContactMessage, Donation, DonationCounts, NewDonation, Profile, User,
    UserAccount, UserCredentials,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
///
/// The variants mirror the error taxonomy the handlers need to distinguish:
/// a `Conflict` is a conditional update whose precondition no longer held
/// (another actor got there first) and must never be reported as a generic
/// failure; a `Duplicate` is an identity error (signup on a taken email).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("No longer available: {0}")]
    Conflict(String),
    #[error("Already exists: {0}")]
    Duplicate(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Change Feed Types
//=========================================================================================

/// The tables a dashboard view may need to watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreTable {
    Donations,
    Profiles,
    ContactMessages,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOp {
    Insert,
    Update,
    Delete,
}

/// One change-feed notification. Deliberately row-agnostic: subscribers react
/// by re-running their whole query set, not by patching individual rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeEvent {
    pub table: StoreTable,
    pub op: ChangeOp,
}

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait DatabaseService: Send + Sync {
    // --- Auth Methods ---
    /// Fails with [`PortError::Duplicate`] if the email is already registered.
    async fn create_user_with_email(&self, email: &str, hashed_password: &str) -> PortResult<User>;

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials>;

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<AuthSession>;

    /// Resolves a session id to its user, rejecting unknown or expired sessions.
    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid>;

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()>;

    // --- Identity & Role Resolution ---
    async fn create_profile(
        &self,
        user_id: Uuid,
        full_name: &str,
        phone: &str,
        city: &str,
    ) -> PortResult<Profile>;

    async fn assign_role(&self, user_id: Uuid, role: AppRole) -> PortResult<()>;

    async fn get_profile(&self, user_id: Uuid) -> PortResult<Profile>;

    /// Fails with [`PortError::NotFound`] for a role-less user; the caller
    /// treats that the same as a role mismatch, never as an error.
    async fn get_role(&self, user_id: Uuid) -> PortResult<AppRole>;

    async fn set_active_status(&self, user_id: Uuid, is_active: bool) -> PortResult<Profile>;

    /// Every registered account with its profile and role, newest first.
    async fn list_user_accounts(&self) -> PortResult<Vec<UserAccount>>;

    // --- Donations: creation and the per-role query shapes ---
    async fn create_donation(&self, new: NewDonation) -> PortResult<Donation>;

    /// Donor history: everything the donor posted, any status, newest first.
    async fn donations_by_donor(&self, donor_id: Uuid) -> PortResult<Vec<Donation>>;

    /// The shared, contended set every NGO dashboard shows.
    async fn pending_donations(&self) -> PortResult<Vec<Donation>>;

    async fn donations_accepted_by(&self, ngo_id: Uuid) -> PortResult<Vec<Donation>>;

    /// Accepted and not yet claimed by any volunteer — the contended pickup set.
    async fn claimable_donations(&self) -> PortResult<Vec<Donation>>;

    async fn deliveries_for(&self, volunteer_id: Uuid) -> PortResult<Vec<Donation>>;

    async fn all_donations(&self) -> PortResult<Vec<Donation>>;

    async fn donation_counts(&self) -> PortResult<DonationCounts>;

    // --- Donations: conditional transitions ---
    //
    // Each of these applies only if the stored row still satisfies the
    // transition precondition, and fails with `PortError::Conflict` otherwise.
    // The returned row is the post-transition state.
    async fn accept_donation(&self, donation_id: Uuid, ngo_id: Uuid) -> PortResult<Donation>;

    async fn claim_donation(&self, donation_id: Uuid, volunteer_id: Uuid) -> PortResult<Donation>;

    async fn deliver_donation(&self, donation_id: Uuid, volunteer_id: Uuid)
        -> PortResult<Donation>;

    /// Admin-only removal of a donation row.
    async fn delete_donation(&self, donation_id: Uuid) -> PortResult<()>;

    // --- Contact Messages ---
    async fn create_contact_message(
        &self,
        name: &str,
        email: &str,
        subject: &str,
        message: &str,
    ) -> PortResult<ContactMessage>;

    async fn list_contact_messages(&self) -> PortResult<Vec<ContactMessage>>;

    async fn resolve_contact_message(&self, message_id: Uuid) -> PortResult<ContactMessage>;
}
