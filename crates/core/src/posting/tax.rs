//! Tax extraction from gross amounts.
//!
//! Every gross amount is treated as tax-inclusive, for expenses and
//! invoices alike. Line items are split out of the subtotal afterwards,
//! so there is a single tax formula per rate.

use rust_decimal::Decimal;
use tally_shared::types::money::round_cents;

use super::events::TaxSettings;

/// A gross amount split into subtotal and tax.
///
/// `subtotal + tax == gross` exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaxSplit {
    /// Amount before tax.
    pub subtotal: Decimal,
    /// Tax amount.
    pub tax: Decimal,
}

/// Splits a non-negative gross into subtotal and tax.
///
/// The subtotal is rounded to cents and the tax absorbs the residue, so
/// the parts always sum to the gross to the cent.
///
/// ```
/// use rust_decimal_macros::dec;
/// use tally_core::posting::events::TaxSettings;
/// use tally_core::posting::tax::split_gross;
///
/// let split = split_gross(dec!(100.00), Some(&TaxSettings::Percentage { rate: dec!(7) }));
/// assert_eq!(split.subtotal, dec!(93.46));
/// assert_eq!(split.tax, dec!(6.54));
/// ```
#[must_use]
pub fn split_gross(gross: Decimal, tax: Option<&TaxSettings>) -> TaxSplit {
    let gross = round_cents(gross);
    let tax_amount = match tax {
        Some(TaxSettings::Percentage { rate }) if *rate > Decimal::ZERO => {
            let subtotal = round_cents(gross / (Decimal::ONE + *rate / Decimal::ONE_HUNDRED));
            gross - subtotal
        }
        Some(TaxSettings::Fixed { amount }) if *amount > Decimal::ZERO => {
            round_cents((*amount).min(gross))
        }
        _ => Decimal::ZERO,
    };
    TaxSplit {
        subtotal: gross - tax_amount,
        tax: tax_amount,
    }
}
