//! Stock counters and the reservation invariant.

use serde::{Deserialize, Serialize};

use toolhire_core::{DomainError, DomainResult};

/// Classification of remaining availability against the safety threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockHealth {
    OutOfStock,
    LowStock,
    Healthy,
}

/// Per-item stock counters.
///
/// Invariant after every operation: `0 <= reserved <= on_hand`.
/// `available = on_hand - reserved` is the only quantity that can still be
/// claimed. Operations are pure: they validate, then return the new counters
/// or an error with the old counters untouched (no partial mutation).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockLevels {
    on_hand: i64,
    reserved: i64,
}

impl StockLevels {
    pub fn new(on_hand: i64, reserved: i64) -> DomainResult<Self> {
        if on_hand < 0 || reserved < 0 || reserved > on_hand {
            return Err(DomainError::invariant(format!(
                "stock counters out of range (on_hand={on_hand}, reserved={reserved})"
            )));
        }
        Ok(Self { on_hand, reserved })
    }

    pub fn on_hand(&self) -> i64 {
        self.on_hand
    }

    pub fn reserved(&self) -> i64 {
        self.reserved
    }

    pub fn available(&self) -> i64 {
        self.on_hand - self.reserved
    }

    fn ensure_positive(quantity: i64) -> DomainResult<()> {
        if quantity <= 0 {
            return Err(DomainError::validation(format!(
                "quantity must be positive, got {quantity}"
            )));
        }
        Ok(())
    }

    /// Claim `quantity` units from available stock.
    ///
    /// All-or-nothing: if fewer than `quantity` units are available the call
    /// fails with `InsufficientStock` and nothing changes.
    pub fn reserve(self, quantity: i64) -> DomainResult<Self> {
        Self::ensure_positive(quantity)?;
        let available = self.available();
        if available < quantity {
            return Err(DomainError::insufficient_stock(quantity, available));
        }
        Ok(Self {
            on_hand: self.on_hand,
            reserved: self.reserved + quantity,
        })
    }

    /// Convert a standing reservation into consumed stock at handover.
    pub fn commit(self, quantity: i64) -> DomainResult<Self> {
        Self::ensure_positive(quantity)?;
        if self.reserved < quantity || self.on_hand < quantity {
            return Err(DomainError::invariant(format!(
                "cannot commit {quantity} units (on_hand={}, reserved={})",
                self.on_hand, self.reserved
            )));
        }
        Ok(Self {
            on_hand: self.on_hand - quantity,
            reserved: self.reserved - quantity,
        })
    }

    /// Give a reservation back (cancellation before checkout).
    pub fn release(self, quantity: i64) -> DomainResult<Self> {
        Self::ensure_positive(quantity)?;
        if self.reserved < quantity {
            return Err(DomainError::invariant(format!(
                "cannot release {quantity} units (reserved={})",
                self.reserved
            )));
        }
        Ok(Self {
            on_hand: self.on_hand,
            reserved: self.reserved - quantity,
        })
    }

    /// Return physical units after the rental's return step.
    ///
    /// The reservation was already cleared at checkout, so only `on_hand`
    /// moves.
    pub fn restock(self, quantity: i64) -> DomainResult<Self> {
        Self::ensure_positive(quantity)?;
        let on_hand = self.on_hand.checked_add(quantity).ok_or_else(|| {
            DomainError::invariant(format!(
                "restock overflow (on_hand={}, quantity={quantity})",
                self.on_hand
            ))
        })?;
        Ok(Self {
            on_hand,
            reserved: self.reserved,
        })
    }

    /// Classify availability against the item's safety threshold.
    pub fn health(&self, safety_stock: i64) -> StockHealth {
        let available = self.available();
        if available == 0 {
            StockHealth::OutOfStock
        } else if available <= safety_stock {
            StockHealth::LowStock
        } else {
            StockHealth::Healthy
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn levels(on_hand: i64, reserved: i64) -> StockLevels {
        StockLevels::new(on_hand, reserved).unwrap()
    }

    #[test]
    fn reserve_up_to_available_succeeds() {
        let next = levels(5, 3).reserve(2).unwrap();
        assert_eq!(next.reserved(), 5);
        assert_eq!(next.available(), 0);
    }

    #[test]
    fn reserve_beyond_available_fails_without_side_effect() {
        let current = levels(5, 4);
        let err = current.reserve(2).unwrap_err();
        assert_eq!(
            err,
            DomainError::InsufficientStock {
                requested: 2,
                available: 1
            }
        );
        // Pure value semantics: the original counters are untouched.
        assert_eq!(current, levels(5, 4));
    }

    #[test]
    fn zero_or_negative_quantities_are_rejected_everywhere() {
        let current = levels(5, 1);
        for qty in [0, -3] {
            assert!(matches!(
                current.reserve(qty),
                Err(DomainError::Validation(_))
            ));
            assert!(matches!(current.commit(qty), Err(DomainError::Validation(_))));
            assert!(matches!(
                current.release(qty),
                Err(DomainError::Validation(_))
            ));
            assert!(matches!(
                current.restock(qty),
                Err(DomainError::Validation(_))
            ));
        }
    }

    #[test]
    fn commit_consumes_on_hand_and_reservation() {
        let next = levels(3, 2).commit(2).unwrap();
        assert_eq!(next.on_hand(), 1);
        assert_eq!(next.reserved(), 0);
    }

    #[test]
    fn commit_more_than_reserved_is_invariant_fault() {
        let err = levels(3, 1).commit(2).unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }

    #[test]
    fn release_more_than_reserved_is_invariant_fault() {
        let err = levels(3, 1).release(2).unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }

    #[test]
    fn restock_only_moves_on_hand() {
        let next = levels(0, 0).restock(1).unwrap();
        assert_eq!(next.on_hand(), 1);
        assert_eq!(next.reserved(), 0);
    }

    #[test]
    fn health_boundaries() {
        // available == 0 → out of stock, regardless of threshold.
        assert_eq!(levels(1, 1).health(1), StockHealth::OutOfStock);
        // 0 < available <= safety_stock → low.
        assert_eq!(levels(1, 0).health(1), StockHealth::LowStock);
        // available > safety_stock → healthy.
        assert_eq!(levels(2, 0).health(1), StockHealth::Healthy);
        assert_eq!(levels(1, 0).health(0), StockHealth::Healthy);
    }

    #[derive(Debug, Clone, Copy)]
    enum Op {
        Reserve(i64),
        Commit(i64),
        Release(i64),
        Restock(i64),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        let qty = 1i64..5;
        prop_oneof![
            qty.clone().prop_map(Op::Reserve),
            qty.clone().prop_map(Op::Commit),
            qty.clone().prop_map(Op::Release),
            qty.prop_map(Op::Restock),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: for any sequence of ledger operations, the counters
        /// satisfy `0 <= reserved <= on_hand` after every successful call,
        /// and failed calls leave the counters unchanged.
        #[test]
        fn counter_invariant_holds_across_any_sequence(
            ops in prop::collection::vec(op_strategy(), 1..50)
        ) {
            let mut current = levels(3, 0);

            for op in ops {
                let attempt = match op {
                    Op::Reserve(q) => current.reserve(q),
                    Op::Commit(q) => current.commit(q),
                    Op::Release(q) => current.release(q),
                    Op::Restock(q) => current.restock(q),
                };

                if let Ok(next) = attempt {
                    current = next;
                }

                prop_assert!(current.reserved() >= 0);
                prop_assert!(current.reserved() <= current.on_hand());
                prop_assert!(current.available() >= 0);
            }
        }

        /// Property: reserve never succeeds when the requested quantity
        /// exceeds what is available at call time.
        #[test]
        fn reserve_never_overcommits(
            on_hand in 0i64..20,
            reserved_seed in 0i64..20,
            quantity in 1i64..25
        ) {
            let reserved = reserved_seed.min(on_hand);
            let current = levels(on_hand, reserved);
            let outcome = current.reserve(quantity);

            if quantity > current.available() {
                prop_assert!(outcome.is_err());
            } else {
                prop_assert_eq!(outcome.unwrap().available(), current.available() - quantity);
            }
        }
    }
}
