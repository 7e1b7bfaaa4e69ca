//! Money helpers with decimal precision.
//!
//! CRITICAL: Never use floating-point for money calculations.
//! Every amount in the ledger is a `rust_decimal::Decimal` rounded to the
//! reference currency's minor unit (cents).

use rust_decimal::{Decimal, RoundingStrategy};

/// Number of decimal places for posted amounts.
pub const CURRENCY_DP: u32 = 2;

/// Number of decimal places for inventory unit costs.
pub const UNIT_COST_DP: u32 = 4;

/// One minor unit of the reference currency.
pub const CENT: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Largest tolerated difference between total debits and total credits.
pub const BALANCE_TOLERANCE: Decimal = CENT;

/// Remaining depreciable base at or below which an asset is finished.
pub const DEPRECIATION_EPSILON: Decimal = Decimal::from_parts(9, 0, 0, false, 3);

/// Rounds an amount to cents, midpoint away from zero.
///
/// ```
/// use rust_decimal_macros::dec;
/// use tally_shared::types::money::round_cents;
///
/// assert_eq!(round_cents(dec!(2.345)), dec!(2.35));
/// assert_eq!(round_cents(dec!(-2.345)), dec!(-2.35));
/// ```
#[must_use]
pub fn round_cents(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(CURRENCY_DP, RoundingStrategy::MidpointAwayFromZero)
}

/// Rounds a per-unit cost to four decimal places.
#[must_use]
pub fn round_unit_cost(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(UNIT_COST_DP, RoundingStrategy::MidpointAwayFromZero)
}

/// Returns true if two amounts agree within the balance tolerance.
#[must_use]
pub fn within_tolerance(a: Decimal, b: Decimal) -> bool {
    (a - b).abs() <= BALANCE_TOLERANCE
}

#[cfg(test)]
#[path = "money_tests.rs"]
mod tests;
