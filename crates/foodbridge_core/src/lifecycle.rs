//! crates/foodbridge_core/src/lifecycle.rs
//!
//! The donation lifecycle engine: the three status transitions, their row
//! preconditions, and the reference `apply` semantics every store
//! implementation must be observationally equivalent to.
//!
//! A transition is a *conditional* update: it only takes effect if the stored
//! row still satisfies the precondition at apply time. That is the whole
//! claim-exclusivity mechanism — when two actors race for the same donation,
//! at most one attempt can match the precondition, and the loser must see a
//! [`TransitionError::Conflict`], not a generic failure.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{AppRole, Donation, DonationStatus};

/// A requested change to one donation row, carrying the acting user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// `pending → accepted`: an NGO claims the donation.
    Accept { ngo_id: Uuid },
    /// `accepted → picked_up`: a volunteer claims the delivery.
    PickUp { volunteer_id: Uuid },
    /// `picked_up → delivered`: the claiming volunteer completes it.
    Deliver { volunteer_id: Uuid },
}

impl Transition {
    /// The status the stored row must still have for this transition to apply.
    pub fn required_status(&self) -> DonationStatus {
        match self {
            Transition::Accept { .. } => DonationStatus::Pending,
            Transition::PickUp { .. } => DonationStatus::Accepted,
            Transition::Deliver { .. } => DonationStatus::PickedUp,
        }
    }

    /// The status the row holds after this transition applies.
    pub fn resulting_status(&self) -> DonationStatus {
        match self {
            Transition::Accept { .. } => DonationStatus::Accepted,
            Transition::PickUp { .. } => DonationStatus::PickedUp,
            Transition::Deliver { .. } => DonationStatus::Delivered,
        }
    }

    /// The role whose dashboard is allowed to invoke this transition.
    pub fn actor_role(&self) -> AppRole {
        match self {
            Transition::Accept { .. } => AppRole::Ngo,
            Transition::PickUp { .. } | Transition::Deliver { .. } => AppRole::Volunteer,
        }
    }

    /// The full row precondition, including the actor-id clauses: picking up
    /// additionally requires that no volunteer has claimed the donation yet,
    /// and delivering requires that the caller is the claiming volunteer.
    pub fn matches(&self, donation: &Donation) -> bool {
        if donation.status != self.required_status() {
            return false;
        }
        match self {
            Transition::Accept { .. } => true,
            Transition::PickUp { .. } => donation.volunteer_id.is_none(),
            Transition::Deliver { volunteer_id } => donation.volunteer_id == Some(*volunteer_id),
        }
    }
}

/// Why a transition did not apply.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    /// The stored row no longer satisfies the precondition — another actor
    /// got there first (or the caller is not the claiming volunteer).
    #[error("donation is no longer available for this action")]
    Conflict,
}

/// Applies a transition to an in-memory donation row, returning the updated
/// row. Sets exactly the fields the per-transition contract names: the new
/// status, at most one actor id, and the one corresponding timestamp.
///
/// This is the reference semantics. The SQL adapter encodes [`Transition::
/// matches`] in its `WHERE` clause and must behave identically; the in-memory
/// test store calls this directly under a lock.
pub fn apply(
    donation: &Donation,
    transition: &Transition,
    now: DateTime<Utc>,
) -> Result<Donation, TransitionError> {
    if !transition.matches(donation) {
        return Err(TransitionError::Conflict);
    }

    let mut updated = donation.clone();
    updated.status = transition.resulting_status();
    match transition {
        Transition::Accept { ngo_id } => {
            updated.ngo_id = Some(*ngo_id);
            updated.accepted_at = Some(now);
        }
        Transition::PickUp { volunteer_id } => {
            updated.volunteer_id = Some(*volunteer_id);
            updated.picked_up_at = Some(now);
        }
        Transition::Deliver { .. } => {
            updated.delivered_at = Some(now);
        }
    }

    debug_assert!(updated.actor_fields_consistent());
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn pending_donation() -> Donation {
        let t0 = Utc::now();
        Donation {
            id: Uuid::new_v4(),
            donor_id: Uuid::new_v4(),
            ngo_id: None,
            volunteer_id: None,
            food_item: "Dal, Rice, Roti".into(),
            quantity: "100 servings".into(),
            description: "Wedding surplus".into(),
            city: "Pune".into(),
            pickup_address: "45 Church Street".into(),
            food_source: "hotel".into(),
            expiry_time: t0 + Duration::hours(3),
            status: DonationStatus::Pending,
            created_at: t0,
            accepted_at: None,
            picked_up_at: None,
            delivered_at: None,
        }
    }

    #[test]
    fn full_lifecycle_sets_each_field_exactly_once() {
        let ngo = Uuid::new_v4();
        let volunteer = Uuid::new_v4();
        let d0 = pending_donation();
        let t = d0.created_at;

        let d1 = apply(&d0, &Transition::Accept { ngo_id: ngo }, t + Duration::minutes(1))
            .expect("accept pending");
        assert_eq!(d1.status, DonationStatus::Accepted);
        assert_eq!(d1.ngo_id, Some(ngo));
        assert!(d1.volunteer_id.is_none());

        let d2 = apply(
            &d1,
            &Transition::PickUp { volunteer_id: volunteer },
            t + Duration::minutes(2),
        )
        .expect("pick up accepted");
        assert_eq!(d2.status, DonationStatus::PickedUp);
        assert_eq!(d2.volunteer_id, Some(volunteer));
        // The NGO claim is untouched by later transitions.
        assert_eq!(d2.ngo_id, Some(ngo));

        let d3 = apply(
            &d2,
            &Transition::Deliver { volunteer_id: volunteer },
            t + Duration::minutes(3),
        )
        .expect("deliver picked up");
        assert_eq!(d3.status, DonationStatus::Delivered);
        assert!(d3.timestamps_monotonic());
        assert!(d3.actor_fields_consistent());
    }

    #[test]
    fn second_accept_conflicts() {
        let d0 = pending_donation();
        let winner = Uuid::new_v4();
        let loser = Uuid::new_v4();
        let now = Utc::now();

        let d1 = apply(&d0, &Transition::Accept { ngo_id: winner }, now).expect("first accept");
        let err = apply(&d1, &Transition::Accept { ngo_id: loser }, now).unwrap_err();
        assert_eq!(err, TransitionError::Conflict);
        assert_eq!(d1.ngo_id, Some(winner));
    }

    #[test]
    fn pick_up_requires_unclaimed_row() {
        let d0 = pending_donation();
        let now = Utc::now();
        let d1 = apply(&d0, &Transition::Accept { ngo_id: Uuid::new_v4() }, now).unwrap();

        let first = Uuid::new_v4();
        let d2 = apply(&d1, &Transition::PickUp { volunteer_id: first }, now).unwrap();
        let err =
            apply(&d2, &Transition::PickUp { volunteer_id: Uuid::new_v4() }, now).unwrap_err();
        assert_eq!(err, TransitionError::Conflict);
        assert_eq!(d2.volunteer_id, Some(first));
    }

    #[test]
    fn only_the_claiming_volunteer_may_deliver() {
        let now = Utc::now();
        let claimant = Uuid::new_v4();
        let d = apply(
            &apply(
                &pending_donation(),
                &Transition::Accept { ngo_id: Uuid::new_v4() },
                now,
            )
            .unwrap(),
            &Transition::PickUp { volunteer_id: claimant },
            now + Duration::seconds(1),
        )
        .unwrap();

        let other = Uuid::new_v4();
        assert_eq!(
            apply(&d, &Transition::Deliver { volunteer_id: other }, now + Duration::seconds(2)),
            Err(TransitionError::Conflict)
        );
        assert!(apply(
            &d,
            &Transition::Deliver { volunteer_id: claimant },
            now + Duration::seconds(2)
        )
        .is_ok());
    }

    #[test]
    fn no_transition_skips_or_reverses_a_state() {
        let d0 = pending_donation();
        let now = Utc::now();
        let v = Uuid::new_v4();

        // pending rows cannot be picked up or delivered.
        assert!(apply(&d0, &Transition::PickUp { volunteer_id: v }, now).is_err());
        assert!(apply(&d0, &Transition::Deliver { volunteer_id: v }, now).is_err());

        // delivered rows accept nothing further.
        let delivered = {
            let d1 = apply(&d0, &Transition::Accept { ngo_id: Uuid::new_v4() }, now).unwrap();
            let d2 = apply(&d1, &Transition::PickUp { volunteer_id: v }, now + Duration::seconds(1))
                .unwrap();
            apply(&d2, &Transition::Deliver { volunteer_id: v }, now + Duration::seconds(2))
                .unwrap()
        };
        assert!(apply(&delivered, &Transition::Accept { ngo_id: Uuid::new_v4() }, now).is_err());
        assert!(apply(&delivered, &Transition::PickUp { volunteer_id: v }, now).is_err());
        assert!(apply(&delivered, &Transition::Deliver { volunteer_id: v }, now).is_err());
    }

    #[test]
    fn transition_metadata_lines_up() {
        let v = Uuid::new_v4();
        let accept = Transition::Accept { ngo_id: v };
        assert_eq!(accept.required_status(), DonationStatus::Pending);
        assert_eq!(accept.resulting_status(), DonationStatus::Accepted);
        assert_eq!(accept.actor_role(), AppRole::Ngo);

        let deliver = Transition::Deliver { volunteer_id: v };
        assert_eq!(deliver.required_status(), DonationStatus::PickedUp);
        assert_eq!(deliver.actor_role(), AppRole::Volunteer);
    }
}
