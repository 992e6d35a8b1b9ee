//! Shared test support: an in-memory `DatabaseService` so the lifecycle and
//! query-shape semantics can be exercised without a running PostgreSQL.
//!
//! Transitions delegate to `foodbridge_core::lifecycle::apply` under a single
//! lock, which makes the store observationally equivalent to the SQL
//! adapter's conditional updates: one racing attempt wins, the rest see
//! `PortError::Conflict`.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use foodbridge_core::domain::{
    AppRole, AuthSession, ContactMessage, Donation, DonationCounts, DonationStatus, MessageStatus,
    NewDonation, Profile, User, UserAccount, UserCredentials,
};
use foodbridge_core::lifecycle::{apply, Transition, TransitionError};
use foodbridge_core::ports::{DatabaseService, PortError, PortResult};
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

#[derive(Default)]
struct Tables {
    users: Vec<UserCredentials>,
    sessions: HashMap<String, AuthSession>,
    profiles: Vec<Profile>,
    roles: HashMap<Uuid, AppRole>,
    donations: Vec<Donation>,
    messages: Vec<ContactMessage>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a complete account (user, profile, role) and returns its id.
    pub async fn register(&self, name: &str, role: AppRole) -> Uuid {
        let email = format!("{}@example.org", name);
        let user = self
            .create_user_with_email(&email, "argon2-hash")
            .await
            .expect("create user");
        self.create_profile(user.user_id, name, "+91 98765 43210", "Pune")
            .await
            .expect("create profile");
        self.assign_role(user.user_id, role).await.expect("assign role");
        user.user_id
    }

    fn transition(&self, donation_id: Uuid, transition: Transition) -> PortResult<Donation> {
        let mut tables = self.tables.lock().unwrap();
        let Some(donation) = tables.donations.iter_mut().find(|d| d.id == donation_id) else {
            // Same contract as the SQL adapter: a vanished row reads as
            // "no longer available", not as a transport error.
            return Err(PortError::Conflict(format!(
                "Donation {} is no longer available",
                donation_id
            )));
        };

        // The wall clock can tick slower than the test; keep stamps strictly
        // increasing the way consecutive database transactions would.
        let last_stamp = [
            Some(donation.created_at),
            donation.accepted_at,
            donation.picked_up_at,
            donation.delivered_at,
        ]
        .into_iter()
        .flatten()
        .max()
        .unwrap();
        let now = Utc::now().max(last_stamp + Duration::microseconds(1));

        match apply(donation, &transition, now) {
            Ok(updated) => {
                *donation = updated.clone();
                Ok(updated)
            }
            Err(TransitionError::Conflict) => Err(PortError::Conflict(format!(
                "Donation {} is no longer available",
                donation_id
            ))),
        }
    }

    fn newest_first(mut donations: Vec<Donation>) -> Vec<Donation> {
        donations.reverse();
        donations
    }
}

#[async_trait]
impl DatabaseService for MemoryStore {
    async fn create_user_with_email(&self, email: &str, hashed_password: &str) -> PortResult<User> {
        let mut tables = self.tables.lock().unwrap();
        if tables.users.iter().any(|u| u.email == email) {
            return Err(PortError::Duplicate(format!(
                "An account with email {} already exists",
                email
            )));
        }
        let user = UserCredentials {
            user_id: Uuid::new_v4(),
            email: email.to_string(),
            hashed_password: hashed_password.to_string(),
        };
        tables.users.push(user.clone());
        Ok(User {
            user_id: user.user_id,
            email: user.email,
        })
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        let tables = self.tables.lock().unwrap();
        tables
            .users
            .iter()
            .find(|u| u.email == email)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", email)))
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<AuthSession> {
        let session = AuthSession {
            id: session_id.to_string(),
            user_id,
            expires_at,
        };
        self.tables
            .lock()
            .unwrap()
            .sessions
            .insert(session_id.to_string(), session.clone());
        Ok(session)
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        let tables = self.tables.lock().unwrap();
        tables
            .sessions
            .get(session_id)
            .filter(|s| s.expires_at > Utc::now())
            .map(|s| s.user_id)
            .ok_or(PortError::Unauthorized)
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        self.tables.lock().unwrap().sessions.remove(session_id);
        Ok(())
    }

    async fn create_profile(
        &self,
        user_id: Uuid,
        full_name: &str,
        phone: &str,
        city: &str,
    ) -> PortResult<Profile> {
        let profile = Profile {
            user_id,
            full_name: full_name.to_string(),
            phone: phone.to_string(),
            city: city.to_string(),
            is_active: true,
        };
        self.tables.lock().unwrap().profiles.push(profile.clone());
        Ok(profile)
    }

    async fn assign_role(&self, user_id: Uuid, role: AppRole) -> PortResult<()> {
        self.tables.lock().unwrap().roles.insert(user_id, role);
        Ok(())
    }

    async fn get_profile(&self, user_id: Uuid) -> PortResult<Profile> {
        let tables = self.tables.lock().unwrap();
        tables
            .profiles
            .iter()
            .find(|p| p.user_id == user_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Profile for user {} not found", user_id)))
    }

    async fn get_role(&self, user_id: Uuid) -> PortResult<AppRole> {
        let tables = self.tables.lock().unwrap();
        tables
            .roles
            .get(&user_id)
            .copied()
            .ok_or_else(|| PortError::NotFound(format!("No role assigned to user {}", user_id)))
    }

    async fn set_active_status(&self, user_id: Uuid, is_active: bool) -> PortResult<Profile> {
        let mut tables = self.tables.lock().unwrap();
        let profile = tables
            .profiles
            .iter_mut()
            .find(|p| p.user_id == user_id)
            .ok_or_else(|| PortError::NotFound(format!("Profile for user {} not found", user_id)))?;
        profile.is_active = is_active;
        Ok(profile.clone())
    }

    async fn list_user_accounts(&self) -> PortResult<Vec<UserAccount>> {
        let tables = self.tables.lock().unwrap();
        let mut accounts = Vec::new();
        for profile in tables.profiles.iter().rev() {
            let Some(role) = tables.roles.get(&profile.user_id) else {
                continue;
            };
            let Some(user) = tables.users.iter().find(|u| u.user_id == profile.user_id) else {
                continue;
            };
            accounts.push(UserAccount {
                profile: profile.clone(),
                role: *role,
                email: user.email.clone(),
            });
        }
        Ok(accounts)
    }

    async fn create_donation(&self, new: NewDonation) -> PortResult<Donation> {
        let donation = Donation {
            id: Uuid::new_v4(),
            donor_id: new.donor_id,
            ngo_id: None,
            volunteer_id: None,
            food_item: new.food_item,
            quantity: new.quantity,
            description: new.description,
            city: new.city,
            pickup_address: new.pickup_address,
            food_source: new.food_source,
            expiry_time: new.expiry_time,
            status: DonationStatus::Pending,
            created_at: Utc::now(),
            accepted_at: None,
            picked_up_at: None,
            delivered_at: None,
        };
        self.tables.lock().unwrap().donations.push(donation.clone());
        Ok(donation)
    }

    async fn donations_by_donor(&self, donor_id: Uuid) -> PortResult<Vec<Donation>> {
        let tables = self.tables.lock().unwrap();
        Ok(Self::newest_first(
            tables
                .donations
                .iter()
                .filter(|d| d.donor_id == donor_id)
                .cloned()
                .collect(),
        ))
    }

    async fn pending_donations(&self) -> PortResult<Vec<Donation>> {
        let tables = self.tables.lock().unwrap();
        Ok(Self::newest_first(
            tables
                .donations
                .iter()
                .filter(|d| d.status == DonationStatus::Pending)
                .cloned()
                .collect(),
        ))
    }

    async fn donations_accepted_by(&self, ngo_id: Uuid) -> PortResult<Vec<Donation>> {
        let tables = self.tables.lock().unwrap();
        Ok(Self::newest_first(
            tables
                .donations
                .iter()
                .filter(|d| d.ngo_id == Some(ngo_id))
                .cloned()
                .collect(),
        ))
    }

    async fn claimable_donations(&self) -> PortResult<Vec<Donation>> {
        let tables = self.tables.lock().unwrap();
        Ok(Self::newest_first(
            tables
                .donations
                .iter()
                .filter(|d| d.status == DonationStatus::Accepted && d.volunteer_id.is_none())
                .cloned()
                .collect(),
        ))
    }

    async fn deliveries_for(&self, volunteer_id: Uuid) -> PortResult<Vec<Donation>> {
        let tables = self.tables.lock().unwrap();
        Ok(Self::newest_first(
            tables
                .donations
                .iter()
                .filter(|d| d.volunteer_id == Some(volunteer_id))
                .cloned()
                .collect(),
        ))
    }

    async fn all_donations(&self) -> PortResult<Vec<Donation>> {
        let tables = self.tables.lock().unwrap();
        Ok(Self::newest_first(tables.donations.clone()))
    }

    async fn donation_counts(&self) -> PortResult<DonationCounts> {
        let tables = self.tables.lock().unwrap();
        let mut counts = DonationCounts {
            total: tables.donations.len() as i64,
            ..Default::default()
        };
        for donation in &tables.donations {
            match donation.status {
                DonationStatus::Pending => counts.pending += 1,
                DonationStatus::Accepted => counts.accepted += 1,
                DonationStatus::PickedUp => counts.picked_up += 1,
                DonationStatus::Delivered => counts.delivered += 1,
            }
        }
        Ok(counts)
    }

    async fn accept_donation(&self, donation_id: Uuid, ngo_id: Uuid) -> PortResult<Donation> {
        self.transition(donation_id, Transition::Accept { ngo_id })
    }

    async fn claim_donation(&self, donation_id: Uuid, volunteer_id: Uuid) -> PortResult<Donation> {
        self.transition(donation_id, Transition::PickUp { volunteer_id })
    }

    async fn deliver_donation(
        &self,
        donation_id: Uuid,
        volunteer_id: Uuid,
    ) -> PortResult<Donation> {
        self.transition(donation_id, Transition::Deliver { volunteer_id })
    }

    async fn delete_donation(&self, donation_id: Uuid) -> PortResult<()> {
        let mut tables = self.tables.lock().unwrap();
        let before = tables.donations.len();
        tables.donations.retain(|d| d.id != donation_id);
        if tables.donations.len() == before {
            return Err(PortError::NotFound(format!(
                "Donation {} not found",
                donation_id
            )));
        }
        Ok(())
    }

    async fn create_contact_message(
        &self,
        name: &str,
        email: &str,
        subject: &str,
        message: &str,
    ) -> PortResult<ContactMessage> {
        let contact = ContactMessage {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: email.to_string(),
            subject: subject.to_string(),
            message: message.to_string(),
            status: MessageStatus::New,
            created_at: Utc::now(),
        };
        self.tables.lock().unwrap().messages.push(contact.clone());
        Ok(contact)
    }

    async fn list_contact_messages(&self) -> PortResult<Vec<ContactMessage>> {
        let tables = self.tables.lock().unwrap();
        let mut messages = tables.messages.clone();
        messages.reverse();
        Ok(messages)
    }

    async fn resolve_contact_message(&self, message_id: Uuid) -> PortResult<ContactMessage> {
        let mut tables = self.tables.lock().unwrap();
        let message = tables
            .messages
            .iter_mut()
            .find(|m| m.id == message_id)
            .ok_or_else(|| PortError::NotFound(format!("Contact message {} not found", message_id)))?;
        message.status = MessageStatus::Resolved;
        Ok(message.clone())
    }
}
