//! Property-based tests for journal balance validation.

use proptest::prelude::*;
use rust_decimal::Decimal;

use super::error::PostingError;
use super::types::{EntryDraft, Side};
use super::validation::{validate_entries, without_zero_lines};

/// Strategy to generate a valid positive amount (> 0).
fn positive_amount() -> impl Strategy<Value = Decimal> {
    // 0.01 to 1,000,000.00
    (1i64..100_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Strategy to generate a negative amount.
fn negative_amount() -> impl Strategy<Value = Decimal> {
    (1i64..100_000_000i64).prop_map(|cents| Decimal::new(-cents, 2))
}

fn side_strategy() -> impl Strategy<Value = Side> {
    prop_oneof![Just(Side::Debit), Just(Side::Credit)]
}

fn line(side: Side, amount: Decimal) -> EntryDraft {
    match side {
        Side::Debit => EntryDraft::debit("6999", amount, None),
        Side::Credit => EntryDraft::credit("1000", amount, None),
    }
}

fn is_violation(result: &Result<impl std::fmt::Debug, PostingError>) -> bool {
    matches!(result, Err(PostingError::InvariantViolation { .. }))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Negative lines are rejected even when the totals agree.
    #[test]
    fn prop_negative_amount_rejected(side in side_strategy(), neg in negative_amount()) {
        let entries = vec![line(side, neg), line(side.flip(), neg)];
        prop_assert!(is_violation(&validate_entries(&entries)));
    }

    /// A journal with only one side is rejected.
    #[test]
    fn prop_single_sided_rejected(side in side_strategy(), a in positive_amount(), b in positive_amount()) {
        let entries = vec![line(side, a), line(side, b)];
        prop_assert!(is_violation(&validate_entries(&entries)));
    }

    /// Any split of the debit side that sums to the credit is accepted.
    #[test]
    fn prop_multi_entry_balanced_accepted(a in positive_amount(), b in positive_amount()) {
        let entries = vec![
            line(Side::Debit, a),
            line(Side::Debit, b),
            line(Side::Credit, a + b),
        ];
        let totals = validate_entries(&entries);
        prop_assert!(totals.is_ok(), "{:?}", totals);
        let totals = totals.unwrap();
        prop_assert_eq!(totals.debit, a + b);
        prop_assert_eq!(totals.credit, a + b);
    }

    /// A difference of one cent is tolerated, two cents are not.
    #[test]
    fn prop_tolerance_is_one_cent(amount in positive_amount()) {
        let cent = Decimal::new(1, 2);
        let within = vec![line(Side::Debit, amount + cent), line(Side::Credit, amount)];
        let beyond = vec![line(Side::Debit, amount + cent + cent), line(Side::Credit, amount)];
        prop_assert!(validate_entries(&within).is_ok());
        prop_assert!(is_violation(&validate_entries(&beyond)));
    }

    /// Stripping zero lines never changes the totals.
    #[test]
    fn prop_zero_lines_carry_nothing(amount in positive_amount(), side in side_strategy()) {
        let entries = vec![
            line(Side::Debit, amount),
            line(side, Decimal::ZERO),
            line(Side::Credit, amount),
        ];
        let stripped = without_zero_lines(entries.clone());
        prop_assert_eq!(stripped.len(), 2);
        prop_assert_eq!(
            validate_entries(&stripped).unwrap(),
            validate_entries(&entries).unwrap()
        );
    }
}

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_empty_journal_rejected() {
        assert!(is_violation(&validate_entries(&[])));
    }

    #[test]
    fn test_violation_reports_totals() {
        let entries = vec![
            line(Side::Debit, Decimal::new(10_000, 2)),
            line(Side::Credit, Decimal::new(9_000, 2)),
        ];
        let err = validate_entries(&entries).unwrap_err();
        assert_eq!(err.to_string(), "Journal is not balanced. Debit: 100.00, Credit: 90.00");
    }
}
