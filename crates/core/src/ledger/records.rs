//! Expense and invoice domain records linked 1:1 to their journals.
//!
//! Records carry settlement state for payment tracking. They never take
//! part in balance checks; their journals do.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tally_shared::types::{ExpenseId, InvoiceId, JournalId, TenantId};

use super::types::PaymentStatus;
use crate::posting::events::{LineItem, TaxSettings};

/// Settlement arithmetic shared by expenses and invoices.
fn settle(total: Decimal, paid: Decimal) -> (Decimal, PaymentStatus) {
    let paid = paid.max(Decimal::ZERO);
    (paid, PaymentStatus::from_amounts(total, paid))
}

/// An expense bill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpenseRecord {
    /// Unique identifier.
    pub id: ExpenseId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Originating journal.
    pub journal_id: JournalId,
    /// Vendor name.
    pub vendor: String,
    /// Description.
    pub description: Option<String>,
    /// Absolute gross amount.
    pub total: Decimal,
    /// Cash paid so far.
    pub amount_paid: Decimal,
    /// Settlement status.
    pub status: PaymentStatus,
    /// True for refunds.
    pub is_refund: bool,
    /// Accounting date.
    pub date: NaiveDate,
    /// Payment due date.
    pub due_date: Option<NaiveDate>,
    /// Tax settings used.
    pub tax: Option<TaxSettings>,
    /// Line items as submitted.
    pub line_items: Vec<LineItem>,
}

impl ExpenseRecord {
    /// Amount still owed to the vendor.
    #[must_use]
    pub fn outstanding(&self) -> Decimal {
        (self.total - self.amount_paid).max(Decimal::ZERO)
    }

    /// Records a payment.
    pub fn apply_payment(&mut self, amount: Decimal) {
        (self.amount_paid, self.status) = settle(self.total, self.amount_paid + amount);
    }

    /// Rolls a payment back.
    pub fn reverse_payment(&mut self, amount: Decimal) {
        (self.amount_paid, self.status) = settle(self.total, self.amount_paid - amount);
    }
}

/// A customer invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceRecord {
    /// Unique identifier.
    pub id: InvoiceId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Originating journal.
    pub journal_id: JournalId,
    /// Customer name.
    pub customer: String,
    /// Invoice number as submitted.
    pub invoice_number: Option<String>,
    /// Uppercase alphanumeric form used for duplicate detection.
    pub normalized_number: Option<String>,
    /// Stated total.
    pub total: Decimal,
    /// Cash received so far.
    pub amount_paid: Decimal,
    /// Settlement status.
    pub status: PaymentStatus,
    /// Discount granted.
    pub discount: Decimal,
    /// Accounting date.
    pub date: NaiveDate,
    /// Payment due date.
    pub due_date: Option<NaiveDate>,
    /// Tax settings used.
    pub tax: Option<TaxSettings>,
    /// Line items as submitted.
    pub line_items: Vec<LineItem>,
}

impl InvoiceRecord {
    /// Amount still owed by the customer.
    #[must_use]
    pub fn outstanding(&self) -> Decimal {
        (self.total - self.amount_paid).max(Decimal::ZERO)
    }

    /// Records a payment.
    pub fn apply_payment(&mut self, amount: Decimal) {
        (self.amount_paid, self.status) = settle(self.total, self.amount_paid + amount);
    }

    /// Rolls a payment back.
    pub fn reverse_payment(&mut self, amount: Decimal) {
        (self.amount_paid, self.status) = settle(self.total, self.amount_paid - amount);
    }
}

/// Normalizes an invoice number to uppercase ASCII alphanumerics.
///
/// Returns `None` when nothing is left, so blank numbers never collide.
#[must_use]
pub fn normalize_invoice_number(number: &str) -> Option<String> {
    let normalized: String = number
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_uppercase())
        .collect();
    (!normalized.is_empty()).then_some(normalized)
}
