//! Normalized business events accepted by the ledger writer.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tally_shared::types::{AssetId, JournalId, ProductId, RecurringRuleId, TenantId};

use crate::calendar::YearMonth;
use crate::ledger::metadata::PaymentTarget;
use crate::ledger::types::{JournalKind, PaymentStatus};

/// How tax is carved out of a gross amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum TaxSettings {
    /// Tax-inclusive percentage: `tax = gross - gross / (1 + rate/100)`.
    Percentage {
        /// Rate in percent, 0-100.
        rate: Decimal,
    },
    /// A fixed tax amount, capped at the gross.
    Fixed {
        /// Tax amount.
        amount: Decimal,
    },
}

/// One line of an expense or invoice.
///
/// A line with a `product_id` is inventory-tracked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    /// Line description.
    pub description: String,
    /// Line amount before scaling.
    pub amount: Decimal,
    /// Quantity, required for inventory lines.
    #[serde(default)]
    pub quantity: Option<Decimal>,
    /// Inventory-tracked product.
    #[serde(default)]
    pub product_id: Option<ProductId>,
    /// Explicit account for this line.
    #[serde(default)]
    pub account_code: Option<String>,
    /// Logical category for this line.
    #[serde(default)]
    pub category_key: Option<String>,
}

impl LineItem {
    /// A plain line with just a description and amount.
    #[must_use]
    pub fn new(description: &str, amount: Decimal) -> Self {
        Self {
            description: description.to_string(),
            amount,
            quantity: None,
            product_id: None,
            account_code: None,
            category_key: None,
        }
    }

    /// Returns true if the line moves inventory.
    #[must_use]
    pub fn is_inventory(&self) -> bool {
        self.product_id.is_some()
    }
}

/// An expense bill, or a refund when the amount is negative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpensePosting {
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Idempotency reference; derived when absent.
    #[serde(default)]
    pub reference: Option<String>,
    /// Accounting date.
    pub date: NaiveDate,
    /// Vendor name.
    pub vendor: String,
    /// Free-text description used for account resolution.
    #[serde(default)]
    pub description: Option<String>,
    /// Gross amount; negative for refunds.
    pub amount: Decimal,
    /// Marks a refund even if the amount is positive.
    #[serde(default)]
    pub is_refund: bool,
    /// Settlement status at posting time.
    #[serde(default)]
    pub payment_status: PaymentStatus,
    /// Cash already paid, for partial and overpaid bills.
    #[serde(default)]
    pub amount_paid: Option<Decimal>,
    /// Logical category key (e.g. `SOFTWARE`).
    #[serde(default)]
    pub category_key: Option<String>,
    /// Account code chosen by a user or a suggestion service.
    #[serde(default)]
    pub suggested_account_code: Option<String>,
    /// Tax settings; no tax line when absent.
    #[serde(default)]
    pub tax: Option<TaxSettings>,
    /// Optional line-item split of the subtotal.
    #[serde(default)]
    pub line_items: Vec<LineItem>,
    /// Payment due date.
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    /// Submission instant, part of the derived reference.
    pub submitted_at: DateTime<Utc>,
    /// Recurring rule that produced this event.
    #[serde(default)]
    pub recurring_rule_id: Option<RecurringRuleId>,
}

impl ExpensePosting {
    /// Returns true if the event is posted as a refund.
    #[must_use]
    pub fn is_refund(&self) -> bool {
        self.is_refund || self.amount < Decimal::ZERO
    }
}

/// A customer invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoicePosting {
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Idempotency reference; derived when absent.
    #[serde(default)]
    pub reference: Option<String>,
    /// Invoice number, a second idempotency key.
    #[serde(default)]
    pub invoice_number: Option<String>,
    /// Accounting date.
    pub date: NaiveDate,
    /// Customer name.
    pub customer: String,
    /// Free-text description.
    #[serde(default)]
    pub description: Option<String>,
    /// Stated total, tax included.
    pub amount: Decimal,
    /// Cash received at posting time.
    #[serde(default)]
    pub amount_paid: Decimal,
    /// Stated subtotal before discount and tax.
    #[serde(default)]
    pub subtotal: Option<Decimal>,
    /// Discount granted.
    #[serde(default)]
    pub discount: Decimal,
    /// Tax settings; no tax line when absent.
    #[serde(default)]
    pub tax: Option<TaxSettings>,
    /// Revenue account override for the whole invoice.
    #[serde(default)]
    pub revenue_account_code: Option<String>,
    /// Optional line-item split of the revenue.
    #[serde(default)]
    pub line_items: Vec<LineItem>,
    /// Payment due date.
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    /// Submission instant, part of the derived reference.
    pub submitted_at: DateTime<Utc>,
    /// Recurring rule that produced this event.
    #[serde(default)]
    pub recurring_rule_id: Option<RecurringRuleId>,
}

/// A payment against an expense or invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRecord {
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Idempotency reference; derived when absent.
    #[serde(default)]
    pub reference: Option<String>,
    /// Accounting date.
    pub date: NaiveDate,
    /// Settled record.
    pub target: PaymentTarget,
    /// Cash moved, positive.
    pub amount: Decimal,
    /// Free-form memo.
    #[serde(default)]
    pub memo: Option<String>,
    /// Submission instant, part of the derived reference.
    pub submitted_at: DateTime<Utc>,
}

/// Reversal of a payment journal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoidPayment {
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// The payment journal to reverse.
    pub payment_journal_id: JournalId,
    /// Accounting date of the reversal.
    pub date: NaiveDate,
    /// Why the payment is voided.
    pub reason: String,
}

/// One month of straight-line depreciation for an asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssetDepreciation {
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// The asset.
    pub asset_id: AssetId,
    /// The month being charged.
    pub period: YearMonth,
}

/// Any event the ledger writer accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostingEvent {
    /// Expense bill or refund.
    Expense(ExpensePosting),
    /// Customer invoice.
    Invoice(InvoicePosting),
    /// Payment against a record.
    Payment(PaymentRecord),
    /// Payment reversal.
    VoidPayment(VoidPayment),
    /// Monthly depreciation.
    AssetDepreciation(AssetDepreciation),
}

impl PostingEvent {
    /// The owning tenant.
    #[must_use]
    pub const fn tenant_id(&self) -> TenantId {
        match self {
            Self::Expense(e) => e.tenant_id,
            Self::Invoice(e) => e.tenant_id,
            Self::Payment(e) => e.tenant_id,
            Self::VoidPayment(e) => e.tenant_id,
            Self::AssetDepreciation(e) => e.tenant_id,
        }
    }

    /// The journal kind the event produces.
    #[must_use]
    pub const fn kind(&self) -> JournalKind {
        match self {
            Self::Expense(_) => JournalKind::Expense,
            Self::Invoice(_) => JournalKind::Invoice,
            Self::Payment(_) => JournalKind::Payment,
            Self::VoidPayment(_) => JournalKind::Void,
            Self::AssetDepreciation(_) => JournalKind::Depreciation,
        }
    }
}
