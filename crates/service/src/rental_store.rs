//! Durable storage for rental agreements + their timelines.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use toolhire_core::{AggregateRoot, DomainError, DomainResult, ExpectedVersion};
use toolhire_rentals::{RentalAgreement, RentalId};

/// Storage for one record per rental agreement.
///
/// The service façade is the only writer. `save` enforces the optimistic
/// version check and refuses any write that would rewrite or reorder
/// already-committed timeline checkpoints.
pub trait RentalStore: Send + Sync {
    fn load(&self, rental_id: RentalId) -> DomainResult<RentalAgreement>;

    fn save(&self, rental: &RentalAgreement, expected: ExpectedVersion) -> DomainResult<()>;
}

impl<S> RentalStore for Arc<S>
where
    S: RentalStore + ?Sized,
{
    fn load(&self, rental_id: RentalId) -> DomainResult<RentalAgreement> {
        (**self).load(rental_id)
    }

    fn save(&self, rental: &RentalAgreement, expected: ExpectedVersion) -> DomainResult<()> {
        (**self).save(rental, expected)
    }
}

/// In-memory rental store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryRentalStore {
    rentals: RwLock<HashMap<RentalId, RentalAgreement>>,
}

impl InMemoryRentalStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RentalStore for InMemoryRentalStore {
    fn load(&self, rental_id: RentalId) -> DomainResult<RentalAgreement> {
        let rentals = self
            .rentals
            .read()
            .map_err(|_| DomainError::invariant("rental store lock poisoned"))?;
        rentals.get(&rental_id).cloned().ok_or(DomainError::NotFound)
    }

    fn save(&self, rental: &RentalAgreement, expected: ExpectedVersion) -> DomainResult<()> {
        let mut rentals = self
            .rentals
            .write()
            .map_err(|_| DomainError::invariant("rental store lock poisoned"))?;

        let rental_id = rental.id_typed();
        let current = rentals.get(&rental_id);
        expected.check(current.map(|r| r.version()).unwrap_or(0))?;

        // Checkpoints are never edited, removed, or reordered.
        if let Some(existing) = current {
            let committed = existing.timeline();
            let incoming = rental.timeline();
            if incoming.len() < committed.len() || &incoming[..committed.len()] != committed {
                return Err(DomainError::invariant(
                    "timeline must extend the committed checkpoints append-only",
                ));
            }
        }
        let ordered = rental
            .timeline()
            .windows(2)
            .all(|w| w[0].occurred_at <= w[1].occurred_at);
        if !ordered {
            return Err(DomainError::invariant(
                "timeline timestamps must be monotonically non-decreasing",
            ));
        }

        rentals.insert(rental_id, rental.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use toolhire_core::{
        Actor, ActorRole, Aggregate, AggregateId, Currency, Money, UserId,
    };
    use toolhire_inventory::ItemId;
    use toolhire_rentals::{RentalCommand, RequestRental};

    fn gbp(amount: i64) -> Money {
        Money::new(amount, Currency::new("GBP").unwrap()).unwrap()
    }

    fn requested_rental() -> RentalAgreement {
        let rental_id = RentalId::new(AggregateId::new());
        let now = Utc::now();
        let mut rental = RentalAgreement::empty(rental_id);
        let events = rental
            .handle(&RentalCommand::Request(RequestRental {
                rental_id,
                item_id: ItemId::new(AggregateId::new()),
                renter_id: UserId::new(),
                quantity: 1,
                daily_rate: gbp(2_500),
                deposit: gbp(15_000),
                rental_start: now + Duration::days(1),
                rental_end: now + Duration::days(3),
                notes: None,
                actor: Actor::new(UserId::new(), ActorRole::Renter),
                occurred_at: now,
            }))
            .unwrap();
        for event in &events {
            rental.apply(event);
        }
        rental
    }

    #[test]
    fn save_and_load_round_trip() {
        let store = InMemoryRentalStore::new();
        let rental = requested_rental();

        store.save(&rental, ExpectedVersion::Exact(0)).unwrap();
        let loaded = store.load(rental.id_typed()).unwrap();
        assert_eq!(loaded, rental);
    }

    #[test]
    fn load_of_unknown_rental_is_not_found() {
        let store = InMemoryRentalStore::new();
        let err = store.load(RentalId::new(AggregateId::new())).unwrap_err();
        assert!(matches!(err, DomainError::NotFound));
    }

    #[test]
    fn stale_expected_version_is_rejected() {
        let store = InMemoryRentalStore::new();
        let rental = requested_rental();
        store.save(&rental, ExpectedVersion::Exact(0)).unwrap();

        // A second writer holding the pre-save version loses.
        let err = store.save(&rental, ExpectedVersion::Exact(0)).unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[test]
    fn save_rejects_a_rewritten_timeline() {
        let store = InMemoryRentalStore::new();
        let committed = requested_rental();
        store.save(&committed, ExpectedVersion::Exact(0)).unwrap();

        // A divergent instance with the same id but a shorter timeline must
        // not replace the committed history.
        let divergent = RentalAgreement::empty(committed.id_typed());
        let err = store.save(&divergent, ExpectedVersion::Any).unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }
}
