//! Balance calculator for a single grant.
//!
//! Totals are accumulated without rounding; formatting to two decimals happens
//! only at presentation time (see `core::report`).

use crate::{
    entities::disbursement,
    errors::{Error, Result},
};
use serde::Serialize;

/// Disbursed total and remaining balance of one grant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GrantLedger {
    /// Approved budget
    pub amount_approved: f64,
    /// Sum of disbursement amounts
    pub total_disbursed: f64,
    /// `amount_approved − total_disbursed`
    pub remaining_balance: f64,
}

impl GrantLedger {
    /// Computes the ledger from the grant's approved amount and its disbursements.
    #[must_use]
    pub fn new(amount_approved: f64, disbursements: &[disbursement::Model]) -> Self {
        Self::from_amounts(amount_approved, disbursements.iter().map(|d| d.amount))
    }

    /// Computes the ledger from raw disbursement amounts.
    pub fn from_amounts(amount_approved: f64, amounts: impl IntoIterator<Item = f64>) -> Self {
        let total_disbursed: f64 = amounts.into_iter().sum();
        Self {
            amount_approved,
            total_disbursed,
            remaining_balance: amount_approved - total_disbursed,
        }
    }

    /// Checks a candidate disbursement against the current remaining balance.
    ///
    /// Rejects non-finite or non-positive amounts and amounts above the
    /// remaining balance, compared in whole cents. The check is only as fresh
    /// as the disbursements this ledger was built from; two concurrent
    /// creations can both pass it.
    pub fn validate_disbursement(&self, amount: f64) -> Result<()> {
        validate_positive_amount(amount)?;
        if to_cents(amount) > to_cents(self.remaining_balance) {
            return Err(Error::ExceedsRemainingBalance {
                amount,
                remaining: self.remaining_balance,
            });
        }
        Ok(())
    }

    /// Ledger after recording `amount`.
    #[must_use]
    pub fn with_disbursement(self, amount: f64) -> Self {
        let total_disbursed = self.total_disbursed + amount;
        Self {
            total_disbursed,
            remaining_balance: self.amount_approved - total_disbursed,
            ..self
        }
    }
}

fn to_cents(amount: f64) -> f64 {
    (amount * 100.0).round()
}

/// Rejects amounts that are not finite or not strictly positive.
pub fn validate_positive_amount(amount: f64) -> Result<()> {
    if amount.is_finite() && amount > 0.0 {
        Ok(())
    } else {
        Err(Error::InvalidAmount { amount })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;

    #[test]
    fn test_ledger_totals() {
        let ledger = GrantLedger::from_amounts(10_000.0, [3_000.0, 2_000.0]);
        assert_eq!(ledger.total_disbursed, 5_000.0);
        assert_eq!(ledger.remaining_balance, 5_000.0);
    }

    #[test]
    fn test_overshoot_rejected_with_exact_remaining() {
        let ledger = GrantLedger::from_amounts(10_000.0, [3_000.0, 2_000.0]);

        let err = ledger.validate_disbursement(5_000.01).unwrap_err();
        assert!(matches!(
            err,
            Error::ExceedsRemainingBalance { remaining, .. } if remaining == 5_000.0
        ));
        assert!(err.to_string().contains("5000.00"));

        assert!(ledger.validate_disbursement(5_000.0).is_ok());
        let after = ledger.with_disbursement(5_000.0);
        assert_eq!(after.remaining_balance, 0.0);
        assert!(after.validate_disbursement(0.01).is_err());
    }

    #[test]
    fn test_exact_remaining_accepted_despite_float_drift() {
        let ledger = GrantLedger::from_amounts(0.30, [0.10, 0.10]);
        assert!(ledger.remaining_balance < 0.10);
        assert!(ledger.validate_disbursement(0.10).is_ok());
        assert!(ledger.validate_disbursement(0.11).is_err());

        let ledger = GrantLedger::from_amounts(1000.3, [500.1, 200.1]);
        assert!(ledger.validate_disbursement(300.1).is_ok());
        let err = ledger.validate_disbursement(300.11).unwrap_err();
        assert!(err.to_string().contains("300.10"));
    }

    #[test]
    fn test_non_positive_and_non_finite_amounts_rejected() {
        let ledger = GrantLedger::from_amounts(100.0, []);
        for amount in [0.0, -1.0, f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            assert!(matches!(
                ledger.validate_disbursement(amount),
                Err(Error::InvalidAmount { .. })
            ));
        }
    }

    #[test]
    fn test_empty_ledger() {
        let ledger = GrantLedger::new(250.0, &[]);
        assert_eq!(ledger.total_disbursed, 0.0);
        assert_eq!(ledger.remaining_balance, 250.0);
    }
}
