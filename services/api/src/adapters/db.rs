//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `DatabaseService` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.
//!
//! The three lifecycle transitions are conditional updates: the transition's
//! precondition lives in the `WHERE` clause (with the expected status bound from
//! the core `Transition`, so SQL and engine cannot drift) and a zero-row result
//! maps to `PortError::Conflict` — the "someone else got there first" signal.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use foodbridge_core::domain::{
    AppRole, AuthSession, ContactMessage, Donation, DonationCounts, DonationStatus, MessageStatus,
    NewDonation, Profile, User, UserAccount, UserCredentials,
};
use foodbridge_core::lifecycle::Transition;
use foodbridge_core::ports::{DatabaseService, PortError, PortResult};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

/// The donation column list shared by every query that returns donation rows,
/// so each statement deserializes through the same record struct.
const DONATION_COLUMNS: &str = "id, donor_id, ngo_id, volunteer_id, food_item, quantity, \
     description, city, pickup_address, food_source, expiry_time, status, created_at, \
     accepted_at, picked_up_at, delivered_at";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DatabaseService` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct UserRecord {
    user_id: Uuid,
    email: String,
}
impl UserRecord {
    fn to_domain(self) -> User {
        User {
            user_id: self.user_id,
            email: self.email,
        }
    }
}

#[derive(FromRow)]
struct UserCredentialsRecord {
    user_id: Uuid,
    email: String,
    hashed_password: String,
}
impl UserCredentialsRecord {
    fn to_domain(self) -> UserCredentials {
        UserCredentials {
            user_id: self.user_id,
            email: self.email,
            hashed_password: self.hashed_password,
        }
    }
}

#[derive(FromRow)]
struct AuthSessionRecord {
    id: String,
    user_id: Uuid,
    expires_at: DateTime<Utc>,
}
impl AuthSessionRecord {
    fn to_domain(self) -> AuthSession {
        AuthSession {
            id: self.id,
            user_id: self.user_id,
            expires_at: self.expires_at,
        }
    }
}

#[derive(FromRow)]
struct ProfileRecord {
    user_id: Uuid,
    full_name: String,
    phone: String,
    city: String,
    is_active: bool,
}
impl ProfileRecord {
    fn to_domain(self) -> Profile {
        Profile {
            user_id: self.user_id,
            full_name: self.full_name,
            phone: self.phone,
            city: self.city,
            is_active: self.is_active,
        }
    }
}

#[derive(FromRow)]
struct UserAccountRecord {
    user_id: Uuid,
    full_name: String,
    phone: String,
    city: String,
    is_active: bool,
    role: String,
    email: String,
}
impl UserAccountRecord {
    fn to_domain(self) -> PortResult<UserAccount> {
        let role = self
            .role
            .parse::<AppRole>()
            .map_err(PortError::Unexpected)?;
        Ok(UserAccount {
            profile: Profile {
                user_id: self.user_id,
                full_name: self.full_name,
                phone: self.phone,
                city: self.city,
                is_active: self.is_active,
            },
            role,
            email: self.email,
        })
    }
}

#[derive(FromRow)]
struct DonationRecord {
    id: Uuid,
    donor_id: Uuid,
    ngo_id: Option<Uuid>,
    volunteer_id: Option<Uuid>,
    food_item: String,
    quantity: String,
    description: String,
    city: String,
    pickup_address: String,
    food_source: String,
    expiry_time: DateTime<Utc>,
    status: String,
    created_at: DateTime<Utc>,
    accepted_at: Option<DateTime<Utc>>,
    picked_up_at: Option<DateTime<Utc>>,
    delivered_at: Option<DateTime<Utc>>,
}
impl DonationRecord {
    fn to_domain(self) -> PortResult<Donation> {
        let status = self
            .status
            .parse()
            .map_err(PortError::Unexpected)?;
        Ok(Donation {
            id: self.id,
            donor_id: self.donor_id,
            ngo_id: self.ngo_id,
            volunteer_id: self.volunteer_id,
            food_item: self.food_item,
            quantity: self.quantity,
            description: self.description,
            city: self.city,
            pickup_address: self.pickup_address,
            food_source: self.food_source,
            expiry_time: self.expiry_time,
            status,
            created_at: self.created_at,
            accepted_at: self.accepted_at,
            picked_up_at: self.picked_up_at,
            delivered_at: self.delivered_at,
        })
    }
}

#[derive(FromRow)]
struct ContactMessageRecord {
    id: Uuid,
    name: String,
    email: String,
    subject: String,
    message: String,
    status: String,
    created_at: DateTime<Utc>,
}
impl ContactMessageRecord {
    fn to_domain(self) -> PortResult<ContactMessage> {
        let status = self
            .status
            .parse()
            .map_err(PortError::Unexpected)?;
        Ok(ContactMessage {
            id: self.id,
            name: self.name,
            email: self.email,
            subject: self.subject,
            message: self.message,
            status,
            created_at: self.created_at,
        })
    }
}

#[derive(FromRow)]
struct CountsRecord {
    total: i64,
    pending: i64,
    accepted: i64,
    picked_up: i64,
    delivered: i64,
}
impl CountsRecord {
    fn to_domain(self) -> DonationCounts {
        DonationCounts {
            total: self.total,
            pending: self.pending,
            accepted: self.accepted,
            picked_up: self.picked_up,
            delivered: self.delivered,
        }
    }
}

fn collect_donations(records: Vec<DonationRecord>) -> PortResult<Vec<Donation>> {
    records.into_iter().map(|r| r.to_domain()).collect()
}

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DatabaseService for DbAdapter {
    async fn create_user_with_email(&self, email: &str, hashed_password: &str) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(
            "INSERT INTO users (user_id, email, hashed_password) VALUES ($1, $2, $3) \
             RETURNING user_id, email",
        )
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(hashed_password)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                PortError::Duplicate(format!("An account with email {} already exists", email))
            }
            _ => PortError::Unexpected(e.to_string()),
        })?;

        Ok(record.to_domain())
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        let record = sqlx::query_as::<_, UserCredentialsRecord>(
            "SELECT user_id, email, hashed_password FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => PortError::NotFound(format!("User {} not found", email)),
            _ => PortError::Unexpected(e.to_string()),
        })?;

        Ok(record.to_domain())
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<AuthSession> {
        let record = sqlx::query_as::<_, AuthSessionRecord>(
            "INSERT INTO auth_sessions (id, user_id, expires_at) VALUES ($1, $2, $3) \
             RETURNING id, user_id, expires_at",
        )
        .bind(session_id)
        .bind(user_id)
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        Ok(record.to_domain())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        // Expired sessions are indistinguishable from unknown ones.
        let record = sqlx::query_as::<_, AuthSessionRecord>(
            "SELECT id, user_id, expires_at FROM auth_sessions \
             WHERE id = $1 AND expires_at > now()",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        record
            .map(|r| r.user_id)
            .ok_or(PortError::Unauthorized)
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(())
    }

    async fn create_profile(
        &self,
        user_id: Uuid,
        full_name: &str,
        phone: &str,
        city: &str,
    ) -> PortResult<Profile> {
        let record = sqlx::query_as::<_, ProfileRecord>(
            "INSERT INTO profiles (user_id, full_name, phone, city) VALUES ($1, $2, $3, $4) \
             RETURNING user_id, full_name, phone, city, is_active",
        )
        .bind(user_id)
        .bind(full_name)
        .bind(phone)
        .bind(city)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        Ok(record.to_domain())
    }

    async fn assign_role(&self, user_id: Uuid, role: AppRole) -> PortResult<()> {
        sqlx::query("INSERT INTO user_roles (user_id, role) VALUES ($1, $2)")
            .bind(user_id)
            .bind(role.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(())
    }

    async fn get_profile(&self, user_id: Uuid) -> PortResult<Profile> {
        let record = sqlx::query_as::<_, ProfileRecord>(
            "SELECT user_id, full_name, phone, city, is_active FROM profiles WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => {
                PortError::NotFound(format!("Profile for user {} not found", user_id))
            }
            _ => PortError::Unexpected(e.to_string()),
        })?;

        Ok(record.to_domain())
    }

    async fn get_role(&self, user_id: Uuid) -> PortResult<AppRole> {
        let role: Option<(String,)> =
            sqlx::query_as("SELECT role FROM user_roles WHERE user_id = $1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| PortError::Unexpected(e.to_string()))?;

        match role {
            Some((role,)) => role.parse().map_err(PortError::Unexpected),
            None => Err(PortError::NotFound(format!(
                "No role assigned to user {}",
                user_id
            ))),
        }
    }

    async fn set_active_status(&self, user_id: Uuid, is_active: bool) -> PortResult<Profile> {
        let record = sqlx::query_as::<_, ProfileRecord>(
            "UPDATE profiles SET is_active = $2 WHERE user_id = $1 \
             RETURNING user_id, full_name, phone, city, is_active",
        )
        .bind(user_id)
        .bind(is_active)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        record
            .map(|r| r.to_domain())
            .ok_or_else(|| PortError::NotFound(format!("Profile for user {} not found", user_id)))
    }

    async fn list_user_accounts(&self) -> PortResult<Vec<UserAccount>> {
        let records = sqlx::query_as::<_, UserAccountRecord>(
            "SELECT p.user_id, p.full_name, p.phone, p.city, p.is_active, r.role, u.email \
             FROM profiles p \
             JOIN user_roles r ON r.user_id = p.user_id \
             JOIN users u ON u.user_id = p.user_id \
             ORDER BY p.created_at DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        records.into_iter().map(|r| r.to_domain()).collect()
    }

    async fn create_donation(&self, new: NewDonation) -> PortResult<Donation> {
        let sql = format!(
            "INSERT INTO donations \
             (id, donor_id, food_item, quantity, description, city, pickup_address, \
              food_source, expiry_time, status) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             RETURNING {DONATION_COLUMNS}"
        );
        let record = sqlx::query_as::<_, DonationRecord>(&sql)
            .bind(Uuid::new_v4())
            .bind(new.donor_id)
            .bind(&new.food_item)
            .bind(&new.quantity)
            .bind(&new.description)
            .bind(&new.city)
            .bind(&new.pickup_address)
            .bind(&new.food_source)
            .bind(new.expiry_time)
            .bind(DonationStatus::Pending.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        record.to_domain()
    }

    async fn donations_by_donor(&self, donor_id: Uuid) -> PortResult<Vec<Donation>> {
        let sql = format!(
            "SELECT {DONATION_COLUMNS} FROM donations WHERE donor_id = $1 \
             ORDER BY created_at DESC"
        );
        let records = sqlx::query_as::<_, DonationRecord>(&sql)
            .bind(donor_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        collect_donations(records)
    }

    async fn pending_donations(&self) -> PortResult<Vec<Donation>> {
        let sql = format!(
            "SELECT {DONATION_COLUMNS} FROM donations WHERE status = $1 \
             ORDER BY created_at DESC"
        );
        let records = sqlx::query_as::<_, DonationRecord>(&sql)
            .bind(DonationStatus::Pending.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        collect_donations(records)
    }

    async fn donations_accepted_by(&self, ngo_id: Uuid) -> PortResult<Vec<Donation>> {
        let sql = format!(
            "SELECT {DONATION_COLUMNS} FROM donations WHERE ngo_id = $1 \
             ORDER BY created_at DESC"
        );
        let records = sqlx::query_as::<_, DonationRecord>(&sql)
            .bind(ngo_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        collect_donations(records)
    }

    async fn claimable_donations(&self) -> PortResult<Vec<Donation>> {
        let sql = format!(
            "SELECT {DONATION_COLUMNS} FROM donations \
             WHERE status = $1 AND volunteer_id IS NULL \
             ORDER BY created_at DESC"
        );
        let records = sqlx::query_as::<_, DonationRecord>(&sql)
            .bind(DonationStatus::Accepted.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        collect_donations(records)
    }

    async fn deliveries_for(&self, volunteer_id: Uuid) -> PortResult<Vec<Donation>> {
        let sql = format!(
            "SELECT {DONATION_COLUMNS} FROM donations WHERE volunteer_id = $1 \
             ORDER BY created_at DESC"
        );
        let records = sqlx::query_as::<_, DonationRecord>(&sql)
            .bind(volunteer_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        collect_donations(records)
    }

    async fn all_donations(&self) -> PortResult<Vec<Donation>> {
        let sql = format!("SELECT {DONATION_COLUMNS} FROM donations ORDER BY created_at DESC");
        let records = sqlx::query_as::<_, DonationRecord>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        collect_donations(records)
    }

    async fn donation_counts(&self) -> PortResult<DonationCounts> {
        let record = sqlx::query_as::<_, CountsRecord>(
            "SELECT COUNT(*) AS total, \
             COUNT(*) FILTER (WHERE status = 'pending') AS pending, \
             COUNT(*) FILTER (WHERE status = 'accepted') AS accepted, \
             COUNT(*) FILTER (WHERE status = 'picked_up') AS picked_up, \
             COUNT(*) FILTER (WHERE status = 'delivered') AS delivered \
             FROM donations",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        Ok(record.to_domain())
    }

    async fn accept_donation(&self, donation_id: Uuid, ngo_id: Uuid) -> PortResult<Donation> {
        let transition = Transition::Accept { ngo_id };
        let sql = format!(
            "UPDATE donations SET ngo_id = $1, status = $2, accepted_at = now() \
             WHERE id = $3 AND status = $4 \
             RETURNING {DONATION_COLUMNS}"
        );
        let record = sqlx::query_as::<_, DonationRecord>(&sql)
            .bind(ngo_id)
            .bind(transition.resulting_status().as_str())
            .bind(donation_id)
            .bind(transition.required_status().as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        match record {
            Some(record) => record.to_domain(),
            // Zero rows matched the precondition: another NGO already took it.
            None => Err(PortError::Conflict(format!(
                "Donation {} is no longer pending",
                donation_id
            ))),
        }
    }

    async fn claim_donation(&self, donation_id: Uuid, volunteer_id: Uuid) -> PortResult<Donation> {
        let transition = Transition::PickUp { volunteer_id };
        let sql = format!(
            "UPDATE donations SET volunteer_id = $1, status = $2, picked_up_at = now() \
             WHERE id = $3 AND status = $4 AND volunteer_id IS NULL \
             RETURNING {DONATION_COLUMNS}"
        );
        let record = sqlx::query_as::<_, DonationRecord>(&sql)
            .bind(volunteer_id)
            .bind(transition.resulting_status().as_str())
            .bind(donation_id)
            .bind(transition.required_status().as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        match record {
            Some(record) => record.to_domain(),
            None => Err(PortError::Conflict(format!(
                "Donation {} is no longer available for pickup",
                donation_id
            ))),
        }
    }

    async fn deliver_donation(
        &self,
        donation_id: Uuid,
        volunteer_id: Uuid,
    ) -> PortResult<Donation> {
        let transition = Transition::Deliver { volunteer_id };
        let sql = format!(
            "UPDATE donations SET status = $2, delivered_at = now() \
             WHERE id = $3 AND status = $4 AND volunteer_id = $1 \
             RETURNING {DONATION_COLUMNS}"
        );
        let record = sqlx::query_as::<_, DonationRecord>(&sql)
            .bind(volunteer_id)
            .bind(transition.resulting_status().as_str())
            .bind(donation_id)
            .bind(transition.required_status().as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        match record {
            Some(record) => record.to_domain(),
            None => Err(PortError::Conflict(format!(
                "Donation {} cannot be delivered by this volunteer",
                donation_id
            ))),
        }
    }

    async fn delete_donation(&self, donation_id: Uuid) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM donations WHERE id = $1")
            .bind(donation_id)
            .execute(&self.pool)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        if result.rows_affected() == 0 {
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
        let record = sqlx::query_as::<_, ContactMessageRecord>(
            "INSERT INTO contact_messages (id, name, email, subject, message, status) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING id, name, email, subject, message, status, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(email)
        .bind(subject)
        .bind(message)
        .bind(MessageStatus::New.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        record.to_domain()
    }

    async fn list_contact_messages(&self) -> PortResult<Vec<ContactMessage>> {
        let records = sqlx::query_as::<_, ContactMessageRecord>(
            "SELECT id, name, email, subject, message, status, created_at \
             FROM contact_messages ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        records.into_iter().map(|r| r.to_domain()).collect()
    }

    async fn resolve_contact_message(&self, message_id: Uuid) -> PortResult<ContactMessage> {
        let record = sqlx::query_as::<_, ContactMessageRecord>(
            "UPDATE contact_messages SET status = $2 WHERE id = $1 \
             RETURNING id, name, email, subject, message, status, created_at",
        )
        .bind(message_id)
        .bind(MessageStatus::Resolved.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        match record {
            Some(record) => record.to_domain(),
            None => Err(PortError::NotFound(format!(
                "Contact message {} not found",
                message_id
            ))),
        }
    }
}
