//! Expense journal construction.
//!
//! A refund is built as the normal expense of the same absolute amount
//! and then mirrored: every line keeps its account and amount and swaps
//! its side.

use rust_decimal::Decimal;
use tally_shared::types::money::round_cents;

use super::allocation::scale_to_total;
use super::events::ExpensePosting;
use super::tax::{TaxSplit, split_gross};
use crate::chart::{PostingAccounts, TaxRegime};
use crate::inventory::InventoryLot;
use crate::ledger::types::{EntryDraft, PaymentStatus};
use crate::ledger::validation::without_zero_lines;

/// Accounts chosen for an expense before the unit of work begins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpenseAccounts {
    /// Debit account for the subtotal when there are no line items.
    pub primary: String,
    /// Debit account per line item, parallel to `line_items`.
    pub lines: Vec<String>,
    /// Credit account for the gross (cash or payable).
    pub credit: String,
}

/// A built expense journal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpenseDraft {
    /// Balanced lines.
    pub entries: Vec<EntryDraft>,
    /// Absolute gross amount.
    pub gross: Decimal,
    /// Subtotal and tax.
    pub split: TaxSplit,
    /// Lots received by inventory lines; empty for refunds.
    pub receipts: Vec<InventoryLot>,
}

/// Builds the journal lines of an expense or refund.
///
/// Expects an event that passed [`validate_expense`](super::validate::validate_expense).
#[must_use]
pub fn build_expense(
    event: &ExpensePosting,
    accounts: &ExpenseAccounts,
    posting: &PostingAccounts,
    regime: TaxRegime,
) -> ExpenseDraft {
    let refund = event.is_refund();
    let gross = round_cents(event.amount.abs());
    let split = split_gross(gross, event.tax.as_ref());
    let memo = event.description.clone().unwrap_or_else(|| event.vendor.clone());

    let mut entries = Vec::new();
    let mut receipts = Vec::new();

    if event.line_items.is_empty() {
        entries.push(EntryDraft::debit(&accounts.primary, split.subtotal, Some(memo.clone())));
    } else {
        let weights: Vec<Decimal> = event.line_items.iter().map(|l| l.amount).collect();
        let scaled = scale_to_total(&weights, split.subtotal);
        for ((line, amount), code) in event.line_items.iter().zip(scaled).zip(&accounts.lines) {
            entries.push(EntryDraft::debit(code, amount, Some(line.description.clone())));
            if let (false, Some(product_id), Some(quantity)) = (refund, line.product_id, line.quantity) {
                receipts.push(InventoryLot::receipt(
                    event.tenant_id,
                    product_id,
                    event.date,
                    quantity,
                    amount,
                ));
            }
        }
    }

    if split.tax > Decimal::ZERO {
        entries.push(EntryDraft::debit(
            posting.purchase_tax(regime),
            split.tax,
            Some(format!("Tax on {}", event.vendor)),
        ));
    }

    let status = if refund {
        PaymentStatus::Refunded
    } else {
        event.payment_status
    };
    let paid = event.amount_paid.map(round_cents);
    match (status, paid) {
        (PaymentStatus::Partial, Some(paid)) => {
            entries.push(EntryDraft::credit(&posting.cash, paid, Some(memo.clone())));
            entries.push(EntryDraft::credit(&accounts.credit, gross - paid, Some(memo)));
        }
        (PaymentStatus::Overpaid, Some(paid)) if paid > gross => {
            let excess = paid - gross;
            entries.push(EntryDraft::credit(&accounts.credit, gross, Some(memo)));
            entries.push(EntryDraft::debit(
                &posting.payable,
                excess,
                Some(format!("Overpayment to {}", event.vendor)),
            ));
            entries.push(EntryDraft::credit(
                &posting.cash,
                excess,
                Some(format!("Overpayment to {}", event.vendor)),
            ));
        }
        _ => entries.push(EntryDraft::credit(&accounts.credit, gross, Some(memo))),
    }

    let mut entries = without_zero_lines(entries);
    if refund {
        entries = entries.into_iter().map(EntryDraft::flipped).collect();
    }

    ExpenseDraft {
        entries,
        gross,
        split,
        receipts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::codes;
    use crate::ledger::types::{JournalTotals, Side};
    use crate::posting::events::{LineItem, TaxSettings};
    use chrono::{NaiveDate, Utc};
    use rust_decimal_macros::dec;
    use tally_shared::types::{ProductId, TenantId};

    fn expense(amount: Decimal, status: PaymentStatus) -> ExpensePosting {
        ExpensePosting {
            tenant_id: TenantId::new(),
            reference: None,
            date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            vendor: "Acme".into(),
            description: None,
            amount,
            is_refund: false,
            payment_status: status,
            amount_paid: None,
            category_key: None,
            suggested_account_code: None,
            tax: None,
            line_items: vec![],
            due_date: None,
            submitted_at: Utc::now(),
            recurring_rule_id: None,
        }
    }

    fn accounts(credit: &str) -> ExpenseAccounts {
        ExpenseAccounts {
            primary: codes::OFFICE_SUPPLIES.into(),
            lines: vec![],
            credit: credit.into(),
        }
    }

    fn lines(entries: &[EntryDraft]) -> Vec<(&str, Side, Decimal)> {
        entries
            .iter()
            .map(|e| (e.account_code.as_str(), e.side, e.amount))
            .collect()
    }

    #[test]
    fn test_paid_expense() {
        let draft = build_expense(
            &expense(dec!(100.00), PaymentStatus::Paid),
            &accounts(codes::CASH),
            &PostingAccounts::default(),
            TaxRegime::SalesTax,
        );
        assert_eq!(
            lines(&draft.entries),
            vec![
                (codes::OFFICE_SUPPLIES, Side::Debit, dec!(100.00)),
                (codes::CASH, Side::Credit, dec!(100.00)),
            ]
        );
    }

    #[test]
    fn test_percentage_tax_regimes() {
        let mut event = expense(dec!(110.00), PaymentStatus::Unpaid);
        event.tax = Some(TaxSettings::Percentage { rate: dec!(10) });

        let sales = build_expense(&event, &accounts(codes::ACCOUNTS_PAYABLE), &PostingAccounts::default(), TaxRegime::SalesTax);
        assert_eq!(
            lines(&sales.entries),
            vec![
                (codes::OFFICE_SUPPLIES, Side::Debit, dec!(100.00)),
                (codes::SALES_TAX_EXPENSE, Side::Debit, dec!(10.00)),
                (codes::ACCOUNTS_PAYABLE, Side::Credit, dec!(110.00)),
            ]
        );

        let vat = build_expense(&event, &accounts(codes::ACCOUNTS_PAYABLE), &PostingAccounts::default(), TaxRegime::Vat);
        assert_eq!(vat.entries[1].account_code, codes::VAT_RECEIVABLE);
    }

    #[test]
    fn test_partial_splits_cash_and_payable() {
        let mut event = expense(dec!(100), PaymentStatus::Partial);
        event.amount_paid = Some(dec!(30));
        let draft = build_expense(&event, &accounts(codes::ACCOUNTS_PAYABLE), &PostingAccounts::default(), TaxRegime::SalesTax);
        assert_eq!(
            lines(&draft.entries),
            vec![
                (codes::OFFICE_SUPPLIES, Side::Debit, dec!(100)),
                (codes::CASH, Side::Credit, dec!(30)),
                (codes::ACCOUNTS_PAYABLE, Side::Credit, dec!(70)),
            ]
        );
    }

    #[test]
    fn test_overpaid_nets_excess_against_payable() {
        let mut event = expense(dec!(100), PaymentStatus::Overpaid);
        event.amount_paid = Some(dec!(120));
        let draft = build_expense(&event, &accounts(codes::CASH), &PostingAccounts::default(), TaxRegime::SalesTax);
        assert_eq!(
            lines(&draft.entries),
            vec![
                (codes::OFFICE_SUPPLIES, Side::Debit, dec!(100)),
                (codes::CASH, Side::Credit, dec!(100)),
                (codes::ACCOUNTS_PAYABLE, Side::Debit, dec!(20)),
                (codes::CASH, Side::Credit, dec!(20)),
            ]
        );
        let totals = JournalTotals::of(&draft.entries);
        assert_eq!(totals.debit, totals.credit);
    }

    #[test]
    fn test_refund_mirrors_expense() {
        let mut event = expense(dec!(-50.00), PaymentStatus::Paid);
        event.is_refund = true;
        let draft = build_expense(&event, &accounts(codes::CASH), &PostingAccounts::default(), TaxRegime::SalesTax);
        assert_eq!(
            lines(&draft.entries),
            vec![
                (codes::OFFICE_SUPPLIES, Side::Credit, dec!(50.00)),
                (codes::CASH, Side::Debit, dec!(50.00)),
            ]
        );
        assert_eq!(draft.gross, dec!(50.00));
    }

    #[test]
    fn test_line_items_scaled_and_inventory_received() {
        let product = ProductId::new();
        let mut widgets = LineItem::new("Widgets", dec!(60));
        widgets.product_id = Some(product);
        widgets.quantity = Some(dec!(4));

        let mut event = expense(dec!(107.00), PaymentStatus::Paid);
        event.tax = Some(TaxSettings::Percentage { rate: dec!(7) });
        event.line_items = vec![widgets, LineItem::new("Paper", dec!(40))];

        let accounts = ExpenseAccounts {
            primary: codes::OFFICE_SUPPLIES.into(),
            lines: vec![codes::INVENTORY.into(), codes::OFFICE_SUPPLIES.into()],
            credit: codes::CASH.into(),
        };
        let draft = build_expense(&event, &accounts, &PostingAccounts::default(), TaxRegime::SalesTax);

        assert_eq!(
            lines(&draft.entries),
            vec![
                (codes::INVENTORY, Side::Debit, dec!(60.00)),
                (codes::OFFICE_SUPPLIES, Side::Debit, dec!(40.00)),
                (codes::SALES_TAX_EXPENSE, Side::Debit, dec!(7.00)),
                (codes::CASH, Side::Credit, dec!(107.00)),
            ]
        );
        assert_eq!(draft.receipts.len(), 1);
        assert_eq!(draft.receipts[0].product_id, product);
        assert_eq!(draft.receipts[0].unit_cost, dec!(15.0000));
    }
}
