//! Scaling line-item amounts to a target total.
//!
//! Lines are scaled proportionally and rounded to cents; the last line
//! absorbs the rounding drift so the parts sum exactly to the target.
//! When that would drive the last line negative (only possible for
//! totals of a few cents spread over many lines) the allocation falls
//! back to the Largest Remainder Method.

use rust_decimal::{Decimal, RoundingStrategy};
use tally_shared::types::money::{CENT, CURRENCY_DP, round_cents};

/// Scales `weights` so they sum exactly to `total`.
///
/// Returns an empty vector when `weights` is empty or sums to zero.
#[must_use]
pub fn scale_to_total(weights: &[Decimal], total: Decimal) -> Vec<Decimal> {
    let sum: Decimal = weights.iter().copied().sum();
    if weights.is_empty() || sum <= Decimal::ZERO {
        return vec![];
    }
    let total = round_cents(total);
    let scale = total / sum;

    let mut scaled: Vec<Decimal> = weights.iter().map(|w| round_cents(*w * scale)).collect();
    let head: Decimal = scaled[..scaled.len() - 1].iter().copied().sum();
    let last = total - head;
    if last < Decimal::ZERO {
        return largest_remainder(weights, sum, total);
    }
    if let Some(slot) = scaled.last_mut() {
        *slot = last;
    }
    scaled
}

fn largest_remainder(weights: &[Decimal], sum: Decimal, total: Decimal) -> Vec<Decimal> {
    let exact: Vec<Decimal> = weights.iter().map(|w| total * *w / sum).collect();
    let mut rounded: Vec<Decimal> = exact
        .iter()
        .map(|a| a.round_dp_with_strategy(CURRENCY_DP, RoundingStrategy::ToZero))
        .collect();

    let mut remainder = total - rounded.iter().copied().sum::<Decimal>();

    // Hand out leftover cents by descending fractional part, ties to the earlier line.
    let mut order: Vec<usize> = (0..exact.len()).collect();
    order.sort_by(|&a, &b| {
        let frac_a = exact[a] - rounded[a];
        let frac_b = exact[b] - rounded[b];
        frac_b.cmp(&frac_a).then(a.cmp(&b))
    });
    for index in order.into_iter().cycle() {
        if remainder < CENT {
            break;
        }
        rounded[index] += CENT;
        remainder -= CENT;
    }
    rounded
}
