use serde::{Deserialize, Serialize};

use toolhire_core::{DomainError, DomainResult, Money, ValueObject};

/// Where the held deposit stands after settlement (or before it: `Held`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DepositStatus {
    Held,
    Released,
    PartiallyReleased,
}

/// Caller-supplied classification of the inspection result.
///
/// Cross-checked against the charge list: `Clear` with charges present (or
/// `Partial` without any) is a validation error, never silently corrected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InspectionOutcome {
    Clear,
    Partial,
}

impl InspectionOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            InspectionOutcome::Clear => "clear",
            InspectionOutcome::Partial => "partial",
        }
    }
}

/// One damage line item produced at inspection.
///
/// Not persisted independently; embedded in the rental's settlement summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Charge {
    pub code: String,
    pub amount: Money,
    pub description: Option<String>,
}

impl ValueObject for Charge {}

/// The computed reconciliation of deposit vs charges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementSummary {
    pub outcome: InspectionOutcome,
    pub charges: Vec<Charge>,
    pub total_charges: Money,
    pub release_amount: Money,
    pub deposit_status: DepositStatus,
    /// Set when charges exceed the deposit: the remainder a downstream
    /// billing collaborator invoices. This engine records it and stops there.
    pub additional_amount_owed: Option<Money>,
}

/// Reconcile a held deposit against inspection charges.
///
/// - `total == 0` → full release.
/// - `0 < total < deposit` → partial release of the difference.
/// - `total >= deposit` → nothing released, deposit fully withheld, and the
///   excess recorded as `additional_amount_owed`.
pub fn settle(
    deposit: &Money,
    outcome: InspectionOutcome,
    charges: Vec<Charge>,
) -> DomainResult<SettlementSummary> {
    match outcome {
        InspectionOutcome::Clear if !charges.is_empty() => {
            return Err(DomainError::validation(
                "outcome 'clear' cannot carry charges",
            ));
        }
        InspectionOutcome::Partial if charges.is_empty() => {
            return Err(DomainError::validation(
                "outcome 'partial' requires at least one charge",
            ));
        }
        _ => {}
    }

    let mut total = Money::zero(deposit.currency().clone());
    for charge in &charges {
        if charge.code.trim().is_empty() {
            return Err(DomainError::validation("charge code cannot be empty"));
        }
        if charge.amount.is_zero() {
            return Err(DomainError::validation(format!(
                "charge '{}' must carry a positive amount",
                charge.code
            )));
        }
        if !charge.amount.same_currency(deposit) {
            return Err(DomainError::validation(format!(
                "charge '{}' is in {}, deposit is in {}",
                charge.code,
                charge.amount.currency(),
                deposit.currency()
            )));
        }
        total = total.checked_add(&charge.amount)?;
    }

    let release_amount = deposit.sub_clamped(&total)?;
    let deposit_status = if total.is_zero() {
        DepositStatus::Released
    } else {
        DepositStatus::PartiallyReleased
    };
    let additional_amount_owed = if total.amount() > deposit.amount() {
        Some(total.sub_clamped(deposit)?)
    } else {
        None
    };

    Ok(SettlementSummary {
        outcome,
        charges,
        total_charges: total,
        release_amount,
        deposit_status,
        additional_amount_owed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use toolhire_core::Currency;

    fn gbp(amount: i64) -> Money {
        Money::new(amount, Currency::new("GBP").unwrap()).unwrap()
    }

    fn charge(code: &str, amount: Money) -> Charge {
        Charge {
            code: code.to_string(),
            amount,
            description: None,
        }
    }

    #[test]
    fn clear_inspection_releases_the_whole_deposit() {
        let summary = settle(&gbp(15_000), InspectionOutcome::Clear, vec![]).unwrap();
        assert_eq!(summary.release_amount, gbp(15_000));
        assert_eq!(summary.total_charges, gbp(0));
        assert_eq!(summary.deposit_status, DepositStatus::Released);
        assert_eq!(summary.additional_amount_owed, None);
    }

    #[test]
    fn partial_damage_releases_the_difference() {
        // Deposit 150 GBP, cleaning charge 20 GBP.
        let summary = settle(
            &gbp(15_000),
            InspectionOutcome::Partial,
            vec![charge("cleaning", gbp(2_000))],
        )
        .unwrap();
        assert_eq!(summary.release_amount, gbp(13_000));
        assert_eq!(summary.deposit_status, DepositStatus::PartiallyReleased);
        assert_eq!(summary.additional_amount_owed, None);
    }

    #[test]
    fn charges_equal_to_deposit_release_nothing() {
        let summary = settle(
            &gbp(15_000),
            InspectionOutcome::Partial,
            vec![charge("write_off", gbp(15_000))],
        )
        .unwrap();
        assert_eq!(summary.release_amount, gbp(0));
        assert_eq!(summary.deposit_status, DepositStatus::PartiallyReleased);
        assert_eq!(summary.additional_amount_owed, None);
    }

    #[test]
    fn excess_charges_record_the_amount_still_owed() {
        let summary = settle(
            &gbp(15_000),
            InspectionOutcome::Partial,
            vec![charge("replacement", gbp(22_500))],
        )
        .unwrap();
        assert_eq!(summary.release_amount, gbp(0));
        assert_eq!(summary.additional_amount_owed, Some(gbp(7_500)));
    }

    #[test]
    fn outcome_and_charges_must_agree() {
        let err = settle(
            &gbp(100),
            InspectionOutcome::Clear,
            vec![charge("scratch", gbp(10))],
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));

        let err = settle(&gbp(100), InspectionOutcome::Partial, vec![]).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn mismatched_currency_charges_are_rejected() {
        let eur = Money::new(500, Currency::new("EUR").unwrap()).unwrap();
        let err = settle(
            &gbp(10_000),
            InspectionOutcome::Partial,
            vec![charge("dent", eur)],
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn zero_amount_charges_are_rejected() {
        let err = settle(
            &gbp(10_000),
            InspectionOutcome::Partial,
            vec![charge("noop", gbp(0))],
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: `release = max(deposit - total, 0)` and
        /// `release + min(total, deposit) == deposit` for any charge mix.
        #[test]
        fn release_arithmetic_balances(
            deposit in 0i64..1_000_000,
            amounts in prop::collection::vec(1i64..100_000, 1..8)
        ) {
            let deposit = gbp(deposit);
            let charges: Vec<Charge> = amounts
                .iter()
                .enumerate()
                .map(|(i, a)| charge(&format!("damage_{i}"), gbp(*a)))
                .collect();
            let total: i64 = amounts.iter().sum();

            let summary = settle(&deposit, InspectionOutcome::Partial, charges).unwrap();

            prop_assert_eq!(summary.total_charges.amount(), total);
            prop_assert_eq!(
                summary.release_amount.amount(),
                (deposit.amount() - total).max(0)
            );
            prop_assert_eq!(
                summary.release_amount.amount() + total.min(deposit.amount()),
                deposit.amount()
            );

            match summary.additional_amount_owed {
                Some(owed) => prop_assert_eq!(owed.amount(), total - deposit.amount()),
                None => prop_assert!(total <= deposit.amount()),
            }
        }
    }
}
