//! Payment journal construction.

use rust_decimal::Decimal;
use tally_shared::types::money::round_cents;

use super::events::PaymentRecord;
use crate::chart::PostingAccounts;
use crate::ledger::metadata::PaymentTarget;
use crate::ledger::types::EntryDraft;
use crate::ledger::validation::without_zero_lines;

/// A built payment journal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentDraft {
    /// Balanced lines.
    pub entries: Vec<EntryDraft>,
    /// Cash moved.
    pub amount: Decimal,
    /// Part applied to the outstanding balance.
    pub applied: Decimal,
    /// Part beyond the outstanding balance.
    pub excess: Decimal,
}

/// Builds the lines of a payment against a record with `outstanding` left to settle.
///
/// Invoice payments credit receivable up to the outstanding balance and
/// park any excess in customer credits. Expense payments debit payable
/// for the whole amount; an excess becomes a vendor prepayment netted
/// against payable.
#[must_use]
pub fn build_payment(
    event: &PaymentRecord,
    outstanding: Decimal,
    posting: &PostingAccounts,
) -> PaymentDraft {
    let amount = round_cents(event.amount);
    let applied = amount.min(outstanding.max(Decimal::ZERO));
    let excess = amount - applied;
    let memo = event.memo.clone();

    let entries = match event.target {
        PaymentTarget::Invoice(id) => vec![
            EntryDraft::debit(&posting.cash, amount, memo.clone()),
            EntryDraft::credit(&posting.receivable, applied, memo),
            EntryDraft::credit(
                &posting.customer_credits,
                excess,
                Some(format!("Overpayment on invoice {id}")),
            ),
        ],
        PaymentTarget::Expense(id) => vec![
            EntryDraft::debit(&posting.payable, applied, memo.clone()),
            EntryDraft::debit(
                &posting.payable,
                excess,
                Some(format!("Vendor prepayment on expense {id}")),
            ),
            EntryDraft::credit(&posting.cash, amount, memo),
        ],
    };

    PaymentDraft {
        entries: without_zero_lines(entries),
        amount,
        applied,
        excess,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::codes;
    use crate::ledger::types::Side;
    use chrono::{NaiveDate, Utc};
    use rust_decimal_macros::dec;
    use tally_shared::types::{ExpenseId, InvoiceId, TenantId};

    fn payment(target: PaymentTarget, amount: Decimal) -> PaymentRecord {
        PaymentRecord {
            tenant_id: TenantId::new(),
            reference: None,
            date: NaiveDate::from_ymd_opt(2025, 4, 1).unwrap(),
            target,
            amount,
            memo: None,
            submitted_at: Utc::now(),
        }
    }

    #[test]
    fn test_invoice_payment_within_outstanding() {
        let draft = build_payment(
            &payment(PaymentTarget::Invoice(InvoiceId::new()), dec!(300)),
            dec!(500),
            &PostingAccounts::default(),
        );
        assert_eq!(draft.applied, dec!(300));
        assert_eq!(draft.excess, Decimal::ZERO);
        assert_eq!(draft.entries.len(), 2);
        assert_eq!(draft.entries[0].account_code, codes::CASH);
        assert_eq!(draft.entries[1].account_code, codes::ACCOUNTS_RECEIVABLE);
    }

    #[test]
    fn test_invoice_overpayment_goes_to_customer_credits() {
        let draft = build_payment(
            &payment(PaymentTarget::Invoice(InvoiceId::new()), dec!(600)),
            dec!(500),
            &PostingAccounts::default(),
        );
        assert_eq!(draft.excess, dec!(100));
        assert_eq!(draft.entries[2].account_code, codes::CUSTOMER_CREDITS);
        assert_eq!(draft.entries[2].side, Side::Credit);
        assert_eq!(draft.entries[2].amount, dec!(100));
    }

    #[test]
    fn test_expense_payment_debits_payable() {
        let draft = build_payment(
            &payment(PaymentTarget::Expense(ExpenseId::new()), dec!(150)),
            dec!(100),
            &PostingAccounts::default(),
        );
        let debits: Vec<_> = draft
            .entries
            .iter()
            .filter(|e| e.side == Side::Debit)
            .map(|e| (e.account_code.as_str(), e.amount))
            .collect();
        assert_eq!(
            debits,
            vec![(codes::ACCOUNTS_PAYABLE, dec!(100)), (codes::ACCOUNTS_PAYABLE, dec!(50))]
        );
        assert_eq!(draft.entries.last().map(|e| e.amount), Some(dec!(150)));
    }
}
