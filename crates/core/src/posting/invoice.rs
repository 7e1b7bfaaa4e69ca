//! Invoice journal construction.

use rust_decimal::Decimal;
use tally_shared::types::money::{round_cents, within_tolerance};

use super::allocation::scale_to_total;
use super::events::InvoicePosting;
use super::tax::{TaxSplit, split_gross};
use crate::chart::{PostingAccounts, TaxRegime};
use crate::inventory::{LotConsumption, LotLedger};
use crate::ledger::metadata::LotShortfall;
use crate::ledger::types::EntryDraft;
use crate::ledger::validation::without_zero_lines;

/// A built invoice journal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoiceDraft {
    /// Balanced lines.
    pub entries: Vec<EntryDraft>,
    /// Stated total.
    pub total: Decimal,
    /// Net revenue and tax.
    pub split: TaxSplit,
    /// True if the discount went to the contra-revenue account.
    pub discount_posted: bool,
    /// Cost of goods sold from FIFO lots.
    pub cost_of_goods_sold: Decimal,
    /// Lots consumed, oldest first per product.
    pub consumptions: Vec<LotConsumption>,
    /// Quantities sold beyond available lots.
    pub shortfalls: Vec<LotShortfall>,
}

/// Revenue account for each line, falling back to the invoice override
/// and then to the standard sales account.
#[must_use]
pub fn revenue_accounts(event: &InvoicePosting, posting: &PostingAccounts) -> (String, Vec<String>) {
    let invoice = event
        .revenue_account_code
        .clone()
        .unwrap_or_else(|| posting.sales_revenue.clone());
    let lines = event
        .line_items
        .iter()
        .map(|l| l.account_code.clone().unwrap_or_else(|| invoice.clone()))
        .collect();
    (invoice, lines)
}

/// Builds the journal lines of an invoice, consuming FIFO lots for
/// inventory lines from `lots`.
///
/// Expects an event that passed [`validate_invoice`](super::validate::validate_invoice).
#[must_use]
pub fn build_invoice(
    event: &InvoicePosting,
    posting: &PostingAccounts,
    regime: TaxRegime,
    lots: &mut LotLedger,
) -> InvoiceDraft {
    let total = round_cents(event.amount);
    let paid = round_cents(event.amount_paid);
    let discount = round_cents(event.discount);
    let split = split_gross(total, event.tax.as_ref());
    let memo = event.description.clone().unwrap_or_else(|| event.customer.clone());

    // A separate discount line only when the stated figures reconcile.
    let discount_posted = discount > Decimal::ZERO
        && event
            .subtotal
            .is_some_and(|s| within_tolerance(round_cents(s) - discount + split.tax, total));
    let revenue_base = if discount_posted {
        split.subtotal + discount
    } else {
        split.subtotal
    };

    let mut entries = Vec::new();

    if paid == Decimal::ZERO {
        entries.push(EntryDraft::debit(&posting.receivable, total, Some(memo.clone())));
    } else if paid < total {
        entries.push(EntryDraft::debit(&posting.cash, paid, Some(memo.clone())));
        entries.push(EntryDraft::debit(&posting.receivable, total - paid, Some(memo.clone())));
    } else {
        entries.push(EntryDraft::debit(&posting.cash, paid, Some(memo.clone())));
        entries.push(EntryDraft::credit(
            &posting.customer_credits,
            paid - total,
            Some(format!("Overpayment by {}", event.customer)),
        ));
    }

    if discount_posted {
        entries.push(EntryDraft::debit(&posting.sales_discounts, discount, Some(memo.clone())));
    }

    let (invoice_account, line_accounts) = revenue_accounts(event, posting);
    if event.line_items.is_empty() {
        entries.push(EntryDraft::credit(&invoice_account, revenue_base, Some(memo)));
    } else {
        let weights: Vec<Decimal> = event.line_items.iter().map(|l| l.amount).collect();
        let scaled = scale_to_total(&weights, revenue_base);
        for ((line, amount), code) in event.line_items.iter().zip(scaled).zip(&line_accounts) {
            entries.push(EntryDraft::credit(code, amount, Some(line.description.clone())));
        }
    }

    if split.tax > Decimal::ZERO {
        entries.push(EntryDraft::credit(
            posting.sales_tax(regime),
            split.tax,
            Some(format!("Tax on invoice to {}", event.customer)),
        ));
    }

    let mut cost_of_goods_sold = Decimal::ZERO;
    let mut consumptions = Vec::new();
    let mut shortfalls = Vec::new();
    for line in &event.line_items {
        let (Some(product_id), Some(quantity)) = (line.product_id, line.quantity) else {
            continue;
        };
        let outcome = lots.consume(product_id, quantity);
        if outcome.shortfall > Decimal::ZERO {
            tracing::warn!(
                %product_id,
                shortfall = %outcome.shortfall,
                "Sold more than available inventory lots"
            );
            shortfalls.push(LotShortfall {
                product_id,
                quantity: outcome.shortfall,
            });
        }
        let cost = outcome.cost();
        if cost > Decimal::ZERO {
            let description = Some(format!("Cost of {}", line.description));
            entries.push(EntryDraft::debit(&posting.cost_of_goods_sold, cost, description.clone()));
            entries.push(EntryDraft::credit(&posting.inventory, cost, description));
        }
        cost_of_goods_sold += cost;
        consumptions.extend(outcome.consumptions);
    }

    InvoiceDraft {
        entries: without_zero_lines(entries),
        total,
        split,
        discount_posted,
        cost_of_goods_sold,
        consumptions,
        shortfalls,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::codes;
    use crate::inventory::InventoryLot;
    use crate::ledger::types::{JournalTotals, Side};
    use crate::posting::events::{LineItem, TaxSettings};
    use chrono::{NaiveDate, Utc};
    use rust_decimal_macros::dec;
    use tally_shared::types::{ProductId, TenantId};

    fn invoice(amount: Decimal, paid: Decimal) -> InvoicePosting {
        InvoicePosting {
            tenant_id: TenantId::new(),
            reference: None,
            invoice_number: None,
            date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            customer: "Globex".into(),
            description: None,
            amount,
            amount_paid: paid,
            subtotal: None,
            discount: Decimal::ZERO,
            tax: None,
            revenue_account_code: None,
            line_items: vec![],
            due_date: None,
            submitted_at: Utc::now(),
            recurring_rule_id: None,
        }
    }

    fn build(event: &InvoicePosting) -> InvoiceDraft {
        build_invoice(event, &PostingAccounts::default(), TaxRegime::SalesTax, &mut LotLedger::new())
    }

    fn lines(entries: &[EntryDraft]) -> Vec<(&str, Side, Decimal)> {
        entries
            .iter()
            .map(|e| (e.account_code.as_str(), e.side, e.amount))
            .collect()
    }

    #[test]
    fn test_unpaid_invoice_hits_receivable() {
        let draft = build(&invoice(dec!(500), dec!(0)));
        assert_eq!(
            lines(&draft.entries),
            vec![
                (codes::ACCOUNTS_RECEIVABLE, Side::Debit, dec!(500)),
                (codes::SALES_REVENUE, Side::Credit, dec!(500)),
            ]
        );
    }

    #[test]
    fn test_partially_paid_invoice() {
        let draft = build(&invoice(dec!(500), dec!(200)));
        assert_eq!(
            lines(&draft.entries),
            vec![
                (codes::CASH, Side::Debit, dec!(200)),
                (codes::ACCOUNTS_RECEIVABLE, Side::Debit, dec!(300)),
                (codes::SALES_REVENUE, Side::Credit, dec!(500)),
            ]
        );
    }

    #[test]
    fn test_overpaid_invoice_routes_excess_to_customer_credits() {
        let draft = build(&invoice(dec!(1000.00), dec!(1200.00)));
        assert_eq!(
            lines(&draft.entries),
            vec![
                (codes::CASH, Side::Debit, dec!(1200.00)),
                (codes::CUSTOMER_CREDITS, Side::Credit, dec!(200.00)),
                (codes::SALES_REVENUE, Side::Credit, dec!(1000.00)),
            ]
        );
    }

    #[test]
    fn test_reconciling_discount_is_posted_to_contra_revenue() {
        let mut event = invoice(dec!(99.00), dec!(0));
        event.subtotal = Some(dec!(100.00));
        event.discount = dec!(10.00);
        event.tax = Some(TaxSettings::Percentage { rate: dec!(10) });
        let draft = build(&event);

        // 99 / 1.1 = 90 net, 9 tax; 100 - 10 + 9 = 99 reconciles.
        assert!(draft.discount_posted);
        assert_eq!(
            lines(&draft.entries),
            vec![
                (codes::ACCOUNTS_RECEIVABLE, Side::Debit, dec!(99.00)),
                (codes::SALES_DISCOUNTS, Side::Debit, dec!(10.00)),
                (codes::SALES_REVENUE, Side::Credit, dec!(100.00)),
                (codes::SALES_TAX_PAYABLE, Side::Credit, dec!(9.00)),
            ]
        );
    }

    #[test]
    fn test_non_reconciling_discount_is_folded_into_revenue() {
        let mut event = invoice(dec!(95.00), dec!(0));
        event.subtotal = Some(dec!(100.00));
        event.discount = dec!(10.00);
        let draft = build(&event);

        assert!(!draft.discount_posted);
        assert_eq!(
            lines(&draft.entries),
            vec![
                (codes::ACCOUNTS_RECEIVABLE, Side::Debit, dec!(95.00)),
                (codes::SALES_REVENUE, Side::Credit, dec!(95.00)),
            ]
        );
    }

    #[test]
    fn test_line_accounts_and_fifo_cogs() {
        let tenant = TenantId::new();
        let product = ProductId::new();
        let day = |d| NaiveDate::from_ymd_opt(2025, 1, d).unwrap();
        let mut lots = LotLedger::new();
        lots.load(
            product,
            vec![
                InventoryLot::receipt(tenant, product, day(1), dec!(2), dec!(10)),
                InventoryLot::receipt(tenant, product, day(2), dec!(5), dec!(35)),
            ],
        );

        let mut widget = LineItem::new("Widgets", dec!(90));
        widget.product_id = Some(product);
        widget.quantity = Some(dec!(3));
        let mut consulting = LineItem::new("Setup", dec!(10));
        consulting.account_code = Some("4100".into());

        let mut event = invoice(dec!(200), dec!(0));
        event.tenant_id = tenant;
        event.line_items = vec![widget, consulting];

        let draft = build_invoice(&event, &PostingAccounts::default(), TaxRegime::SalesTax, &mut lots);

        // 2 units at 5.00 plus 1 unit at 7.00.
        assert_eq!(draft.cost_of_goods_sold, dec!(17.00));
        assert_eq!(draft.consumptions.len(), 2);
        assert!(draft.shortfalls.is_empty());
        assert_eq!(
            lines(&draft.entries),
            vec![
                (codes::ACCOUNTS_RECEIVABLE, Side::Debit, dec!(200)),
                (codes::SALES_REVENUE, Side::Credit, dec!(180.00)),
                ("4100", Side::Credit, dec!(20.00)),
                (codes::COST_OF_GOODS_SOLD, Side::Debit, dec!(17.00)),
                (codes::INVENTORY, Side::Credit, dec!(17.00)),
            ]
        );
        let totals = JournalTotals::of(&draft.entries);
        assert_eq!(totals.debit, totals.credit);
    }

    #[test]
    fn test_shortfall_still_posts() {
        let product = ProductId::new();
        let mut line = LineItem::new("Widgets", dec!(50));
        line.product_id = Some(product);
        line.quantity = Some(dec!(2));
        let mut event = invoice(dec!(50), dec!(50));
        event.line_items = vec![line];

        let draft = build(&event);
        assert_eq!(draft.cost_of_goods_sold, Decimal::ZERO);
        assert_eq!(draft.shortfalls, vec![LotShortfall { product_id: product, quantity: dec!(2) }]);
        assert_eq!(draft.entries.len(), 2);
    }
}
