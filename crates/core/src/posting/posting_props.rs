//! Property-based tests for journal builders.
//!
//! - Every built journal balances within the cent tolerance, for refunds,
//!   tax splits, partial/overpaid settlement and line-item scaling
//! - Tax splits always sum back to the gross exactly

use chrono::{NaiveDate, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;
use tally_shared::types::money::BALANCE_TOLERANCE;
use tally_shared::types::{ProductId, TenantId};

use super::events::{ExpensePosting, InvoicePosting, LineItem, PaymentRecord, TaxSettings};
use super::expense::{ExpenseAccounts, build_expense};
use super::invoice::build_invoice;
use super::payment::build_payment;
use super::tax::split_gross;
use crate::chart::{PostingAccounts, TaxRegime, codes};
use crate::inventory::{InventoryLot, LotLedger};
use crate::ledger::metadata::PaymentTarget;
use crate::ledger::types::{EntryDraft, JournalTotals, PaymentStatus};
use crate::ledger::validation::validate_entries;

/// Strategy for positive amounts (0.01 to 100,000.00).
fn positive_amount() -> impl Strategy<Value = Decimal> {
    (1i64..10_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Strategy for optional tax settings with awkward rates.
fn tax_strategy() -> impl Strategy<Value = Option<TaxSettings>> {
    prop_oneof![
        Just(None),
        (0i64..10_000i64).prop_map(|bp| Some(TaxSettings::Percentage { rate: Decimal::new(bp, 2) })),
        (0i64..5_000_000i64).prop_map(|c| Some(TaxSettings::Fixed { amount: Decimal::new(c, 2) })),
    ]
}

fn line_weights() -> impl Strategy<Value = Vec<Decimal>> {
    prop::collection::vec(positive_amount(), 0..6)
}

fn status_strategy() -> impl Strategy<Value = PaymentStatus> {
    prop_oneof![
        Just(PaymentStatus::Paid),
        Just(PaymentStatus::Unpaid),
        Just(PaymentStatus::Partial),
        Just(PaymentStatus::Overpaid),
    ]
}

fn expense(amount: Decimal, tax: Option<TaxSettings>, weights: &[Decimal]) -> ExpensePosting {
    ExpensePosting {
        tenant_id: TenantId::new(),
        reference: None,
        date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
        vendor: "Vendor".into(),
        description: None,
        amount,
        is_refund: amount < Decimal::ZERO,
        payment_status: PaymentStatus::Paid,
        amount_paid: None,
        category_key: None,
        suggested_account_code: None,
        tax,
        line_items: weights.iter().map(|w| LineItem::new("line", *w)).collect(),
        due_date: None,
        submitted_at: Utc::now(),
        recurring_rule_id: None,
    }
}

fn assert_balanced(entries: &[EntryDraft]) -> Result<(), TestCaseError> {
    let totals = JournalTotals::of(entries);
    prop_assert!(
        totals.difference().abs() <= BALANCE_TOLERANCE,
        "unbalanced: {:?}",
        totals
    );
    prop_assert!(validate_entries(entries).is_ok());
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    /// Subtotal plus tax always equals the gross exactly to the cent.
    #[test]
    fn prop_tax_split_sums_to_gross(gross in positive_amount(), tax in tax_strategy()) {
        let split = split_gross(gross, tax.as_ref());
        prop_assert_eq!(split.subtotal + split.tax, gross);
        prop_assert!(split.tax >= Decimal::ZERO);
        prop_assert!(split.subtotal >= Decimal::ZERO);
    }

    /// Expenses and refunds balance for every status, tax mode and line split.
    #[test]
    fn prop_expense_balances(
        amount in positive_amount(),
        refund in any::<bool>(),
        status in status_strategy(),
        paid_ratio in 1i64..300,
        tax in tax_strategy(),
        weights in line_weights(),
    ) {
        let signed = if refund { -amount } else { amount };
        let mut event = expense(signed, tax, &weights);
        event.payment_status = status;
        let paid = Decimal::new(paid_ratio, 2) * amount;
        event.amount_paid = match status {
            PaymentStatus::Partial if paid > Decimal::ZERO && paid < amount => Some(paid.round_dp(2)),
            PaymentStatus::Partial => None,
            PaymentStatus::Overpaid => Some((amount + paid).round_dp(2)),
            _ => None,
        };
        if event.amount_paid.is_none() && status == PaymentStatus::Partial {
            event.payment_status = PaymentStatus::Unpaid;
        }

        let credit = if refund || matches!(event.payment_status, PaymentStatus::Paid | PaymentStatus::Overpaid) {
            codes::CASH
        } else {
            codes::ACCOUNTS_PAYABLE
        };
        let accounts = ExpenseAccounts {
            primary: codes::GENERAL_EXPENSE.into(),
            lines: weights.iter().map(|_| codes::GENERAL_EXPENSE.to_string()).collect(),
            credit: credit.into(),
        };
        let draft = build_expense(&event, &accounts, &PostingAccounts::default(), TaxRegime::Vat);
        assert_balanced(&draft.entries)?;
    }

    /// Invoices balance across payment levels, discounts and FIFO costing.
    #[test]
    fn prop_invoice_balances(
        amount in positive_amount(),
        paid_ratio in 0i64..300,
        discount in 0i64..100_000,
        stated_subtotal in proptest::option::of(positive_amount()),
        tax in tax_strategy(),
        weights in line_weights(),
        sold in 1i64..50,
        stocked in 0i64..50,
    ) {
        let tenant = TenantId::new();
        let product = ProductId::new();
        let mut lines: Vec<LineItem> = weights.iter().map(|w| LineItem::new("line", *w)).collect();
        if let Some(first) = lines.first_mut() {
            first.product_id = Some(product);
            first.quantity = Some(Decimal::from(sold));
        }
        let event = InvoicePosting {
            tenant_id: tenant,
            reference: None,
            invoice_number: None,
            date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            customer: "Customer".into(),
            description: None,
            amount,
            amount_paid: (Decimal::new(paid_ratio, 2) * amount).round_dp(2),
            subtotal: stated_subtotal,
            discount: Decimal::new(discount, 2),
            tax,
            revenue_account_code: None,
            line_items: lines,
            due_date: None,
            submitted_at: Utc::now(),
            recurring_rule_id: None,
        };
        let mut lots = LotLedger::new();
        lots.load(
            product,
            vec![InventoryLot::receipt(
                tenant,
                product,
                NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
                Decimal::from(stocked),
                Decimal::new(stocked * 317, 2),
            )],
        );
        let draft = build_invoice(&event, &PostingAccounts::default(), TaxRegime::SalesTax, &mut lots);
        assert_balanced(&draft.entries)?;
    }

    /// Payments balance whether they under- or over-settle the target.
    #[test]
    fn prop_payment_balances(
        amount in positive_amount(),
        outstanding in positive_amount(),
        invoice in any::<bool>(),
    ) {
        let target = if invoice {
            PaymentTarget::Invoice(tally_shared::types::InvoiceId::new())
        } else {
            PaymentTarget::Expense(tally_shared::types::ExpenseId::new())
        };
        let event = PaymentRecord {
            tenant_id: TenantId::new(),
            reference: None,
            date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            target,
            amount,
            memo: None,
            submitted_at: Utc::now(),
        };
        let draft = build_payment(&event, outstanding, &PostingAccounts::default());
        prop_assert_eq!(draft.applied + draft.excess, amount);
        assert_balanced(&draft.entries)?;
    }
}

/// A $100 expense at a rate whose quotient has more than two decimals.
#[test]
fn test_boundary_tax_sums_to_the_cent() {
    for rate in ["7", "8.25", "13", "19.6", "33.333"] {
        let rate: Decimal = rate.parse().unwrap();
        let event = expense(Decimal::ONE_HUNDRED, Some(TaxSettings::Percentage { rate }), &[]);
        let accounts = ExpenseAccounts {
            primary: codes::OFFICE_SUPPLIES.into(),
            lines: vec![],
            credit: codes::CASH.into(),
        };
        let draft = build_expense(&event, &accounts, &PostingAccounts::default(), TaxRegime::SalesTax);
        assert_eq!(draft.split.subtotal + draft.split.tax, Decimal::ONE_HUNDRED);
        let totals = JournalTotals::of(&draft.entries);
        assert_eq!(totals.debit, Decimal::ONE_HUNDRED);
        assert_eq!(totals.credit, Decimal::ONE_HUNDRED);
    }
}
