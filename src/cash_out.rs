// Cash-Out Policy
//
// Decides how many of each denomination leave the drawer when a count is
// submitted. Computed once at creation and stored on the record.
//
//   opening: nothing leaves the drawer
//   closing: cash_out[k] = max(0, current[k] - target[k])
//
// Shortfalls against the target are absorbed here (never negative); surfacing
// them is the reconciliation engine's job.

use crate::count::CountType;
use crate::denominations::DenominationCount;
use crate::entities::TargetProfile;
use crate::error::{CashError, Result};
use crate::money::Money;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Derived figures for one count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountTotals {
    pub total_cash: Money,
    pub cash_out: DenominationCount,
    pub total_for_deposit: Money,
}

/// Denominations to remove from the drawer.
pub fn cash_out(
    denominations: &DenominationCount,
    target: &TargetProfile,
    count_type: CountType,
) -> DenominationCount {
    match count_type {
        CountType::Opening => DenominationCount::ZERO,
        CountType::Closing => {
            let mut out = DenominationCount::ZERO;
            for (denomination, current) in denominations.iter() {
                out.set(denomination, current.saturating_sub(target.get(denomination)));
            }
            out
        }
    }
}

/// Total cash, cash-out vector and deposit figure for a count.
pub fn compute_totals(
    denominations: &DenominationCount,
    target: &TargetProfile,
    count_type: CountType,
) -> Result<CountTotals> {
    let total_cash = denominations.total()?;
    let cash_out = cash_out(denominations, target, count_type);
    let total_for_deposit = total_cash
        .checked_sub(cash_out.total()?)
        .ok_or(CashError::Overflow("deposit total"))?;

    debug!(
        count_type = %count_type,
        total_cash = %total_cash,
        total_for_deposit = %total_for_deposit,
        "computed count totals"
    );

    Ok(CountTotals {
        total_cash,
        cash_out,
        total_for_deposit,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::denominations::Denomination;

    fn target() -> TargetProfile {
        TargetProfile::new(
            DenominationCount::ZERO
                .with(Denomination::Quarters, 40)
                .with(Denomination::Ones, 50)
                .with(Denomination::Fives, 10),
        )
    }

    #[test]
    fn test_opening_cash_out_is_zero() {
        let counts = DenominationCount::ZERO
            .with(Denomination::Quarters, 90)
            .with(Denomination::Twenties, 4);
        let totals = compute_totals(&counts, &target(), CountType::Opening).unwrap();

        assert!(totals.cash_out.is_zero());
        assert_eq!(totals.total_cash, Money::from_cents(10_250));
        assert_eq!(totals.total_for_deposit, totals.total_cash);
    }

    #[test]
    fn test_closing_removes_excess_over_target() {
        let counts = DenominationCount::ZERO
            .with(Denomination::Quarters, 60)
            .with(Denomination::Ones, 50);
        let out = cash_out(&counts, &target(), CountType::Closing);

        assert_eq!(out.get(Denomination::Quarters), 20);
        assert_eq!(out.get(Denomination::Ones), 0);
    }

    #[test]
    fn test_closing_shortfall_is_absorbed() {
        // Three fives against a target of ten: nothing removed, never negative.
        let counts = DenominationCount::ZERO
            .with(Denomination::Fives, 3)
            .with(Denomination::Hundreds, 2);
        let totals = compute_totals(&counts, &target(), CountType::Closing).unwrap();

        assert_eq!(totals.cash_out.get(Denomination::Fives), 0);
        assert_eq!(totals.cash_out.get(Denomination::Hundreds), 2);
        assert_eq!(totals.total_cash, Money::from_cents(21_500));
        assert_eq!(totals.total_for_deposit, Money::from_cents(1_500));
    }

    #[test]
    fn test_deposit_identity() {
        let counts = DenominationCount::ZERO
            .with(Denomination::Pennies, 120)
            .with(Denomination::Quarters, 41)
            .with(Denomination::Ones, 75)
            .with(Denomination::Tens, 6);
        let totals = compute_totals(&counts, &target(), CountType::Closing).unwrap();

        assert_eq!(
            totals.total_for_deposit,
            totals.total_cash - totals.cash_out.total().unwrap()
        );
        assert!(!totals.total_for_deposit.is_negative());
    }
}
