//! Idempotency reference derivation.
//!
//! Ad hoc events hash their counterparty, amount and submission instant;
//! scheduled events use readable `kind:entity:period` keys.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rust_decimal::Decimal;
use sha2::{Digest, Sha256};
use tally_shared::types::{AssetId, JournalId, RecurringRuleId};

use crate::calendar::YearMonth;

/// Hex digits of the digest kept in ad hoc references.
const DIGEST_LEN: usize = 16;

fn digest(parts: &[&str]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(parts.join("|").as_bytes());
    let hex = format!("{:x}", hasher.finalize());
    hex[..DIGEST_LEN].to_string()
}

fn ad_hoc(prefix: &str, counterparty: &str, amount: Decimal, submitted_at: DateTime<Utc>) -> String {
    let counterparty = counterparty.trim().to_lowercase();
    let amount = amount.normalize().to_string();
    let at = submitted_at.to_rfc3339_opts(SecondsFormat::Millis, true);
    format!("{prefix}-{}", digest(&[&counterparty, &amount, &at]))
}

/// `EXP-{hash}` for an expense.
#[must_use]
pub fn expense_reference(vendor: &str, amount: Decimal, submitted_at: DateTime<Utc>) -> String {
    ad_hoc("EXP", vendor, amount, submitted_at)
}

/// `INV-{hash}` for an invoice.
#[must_use]
pub fn invoice_reference(customer: &str, amount: Decimal, submitted_at: DateTime<Utc>) -> String {
    ad_hoc("INV", customer, amount, submitted_at)
}

/// `PAY-{hash}` for a payment, keyed by the settled record.
#[must_use]
pub fn payment_reference(target: &str, amount: Decimal, submitted_at: DateTime<Utc>) -> String {
    ad_hoc("PAY", target, amount, submitted_at)
}

/// `REC-{ruleId}-{YYYYMMDD}` for a recurring run.
#[must_use]
pub fn recurring_reference(rule_id: RecurringRuleId, run_date: NaiveDate) -> String {
    format!("REC-{rule_id}-{}", run_date.format("%Y%m%d"))
}

/// `depreciation:{assetId}:YYYY-MM` for a monthly charge.
#[must_use]
pub fn depreciation_reference(asset_id: AssetId, period: YearMonth) -> String {
    format!("depreciation:{asset_id}:{}", period.label())
}

/// `void:{journalId}` for a payment reversal.
#[must_use]
pub fn void_reference(payment_journal_id: JournalId) -> String {
    format!("void:{payment_journal_id}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 14, 9, 30, 0).unwrap()
    }

    #[test]
    fn test_expense_reference_is_deterministic() {
        let a = expense_reference("Acme", dec!(100.00), at());
        let b = expense_reference("  acme ", dec!(100), at());
        assert_eq!(a, b);
        assert!(a.starts_with("EXP-"));
        assert_eq!(a.len(), 4 + DIGEST_LEN);
    }

    #[test]
    fn test_expense_reference_changes_with_inputs() {
        let base = expense_reference("Acme", dec!(100), at());
        assert_ne!(base, expense_reference("Acme", dec!(101), at()));
        assert_ne!(base, expense_reference("Globex", dec!(100), at()));
        assert_ne!(
            base,
            expense_reference("Acme", dec!(100), at() + chrono::Duration::seconds(1))
        );
        let invoice = invoice_reference("Acme", dec!(100), at());
        assert!(invoice.starts_with("INV-"));
        assert_eq!(&base[4..], &invoice[4..]);
    }

    #[test]
    fn test_scheduled_references() {
        let rule = RecurringRuleId::new();
        let date = NaiveDate::from_ymd_opt(2025, 2, 28).unwrap();
        assert_eq!(recurring_reference(rule, date), format!("REC-{rule}-20250228"));

        let asset = AssetId::new();
        let period = YearMonth::new(2025, 7).unwrap();
        assert_eq!(
            depreciation_reference(asset, period),
            format!("depreciation:{asset}:2025-07")
        );

        let journal = JournalId::new();
        assert_eq!(void_reference(journal), format!("void:{journal}"));
    }
}
