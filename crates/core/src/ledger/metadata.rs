//! Typed journal metadata, one variant per event kind.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tally_shared::types::{
    AssetId, ExpenseId, InventoryLotId, InvoiceId, JournalId, ProductId, RecurringRuleId,
};

use super::types::{JournalKind, PaymentStatus};

/// The record a payment settles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum PaymentTarget {
    /// An expense bill (reduces accounts payable).
    Expense(ExpenseId),
    /// A customer invoice (reduces accounts receivable).
    Invoice(InvoiceId),
}

/// Metadata of an expense journal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpenseMeta {
    /// The expense record created with the journal.
    pub expense_id: ExpenseId,
    /// Vendor name as submitted.
    pub vendor: String,
    /// Status at posting time.
    pub payment_status: PaymentStatus,
    /// True for refunds.
    pub is_refund: bool,
    /// Resolver tier that chose the primary debit account.
    pub resolution_source: String,
    /// Lots received by inventory-tracked lines.
    #[serde(default)]
    pub lot_receipts: Vec<InventoryLotId>,
    /// Recurring rule that produced the posting.
    pub recurring_rule_id: Option<RecurringRuleId>,
}

/// An inventory line whose lots could not cover the sold quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LotShortfall {
    /// The product.
    pub product_id: ProductId,
    /// Quantity sold without a matching lot.
    pub quantity: Decimal,
}

/// Metadata of an invoice journal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceMeta {
    /// The invoice record created with the journal.
    pub invoice_id: InvoiceId,
    /// Customer name as submitted.
    pub customer: String,
    /// Invoice number as submitted.
    pub invoice_number: Option<String>,
    /// True if the discount was posted to the contra-revenue account.
    pub discount_posted: bool,
    /// Cost of goods sold recognized from FIFO lots.
    pub cost_of_goods_sold: Decimal,
    /// Inventory lines sold beyond available lots.
    #[serde(default)]
    pub shortfalls: Vec<LotShortfall>,
    /// Recurring rule that produced the posting.
    pub recurring_rule_id: Option<RecurringRuleId>,
}

/// Metadata of a payment journal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentMeta {
    /// Settled record.
    pub target: PaymentTarget,
    /// Cash moved.
    pub amount: Decimal,
    /// Part applied to the outstanding balance.
    pub applied: Decimal,
    /// Part beyond the outstanding balance.
    pub excess: Decimal,
    /// Free-form memo.
    pub memo: Option<String>,
}

/// Metadata of a void journal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoidMeta {
    /// The reversed payment journal.
    pub voided_journal_id: JournalId,
    /// Record whose settlement was rolled back.
    pub target: PaymentTarget,
    /// Payment amount rolled back.
    pub amount: Decimal,
    /// Why the payment was voided.
    pub reason: String,
}

/// Metadata of a depreciation journal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepreciationMeta {
    /// The depreciated asset.
    pub asset_id: AssetId,
    /// `YYYY-MM` period.
    pub period: String,
    /// Charge posted.
    pub amount: Decimal,
    /// Accumulated depreciation after this charge.
    pub accumulated_after: Decimal,
    /// True if this charge finished the asset.
    pub fully_depreciated: bool,
}

/// Journal metadata as a closed sum type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PostingMetadata {
    /// Expense journal.
    Expense(ExpenseMeta),
    /// Invoice journal.
    Invoice(InvoiceMeta),
    /// Payment journal.
    Payment(PaymentMeta),
    /// Void journal.
    Void(VoidMeta),
    /// Depreciation journal.
    Depreciation(DepreciationMeta),
}

impl PostingMetadata {
    /// The journal kind this metadata belongs to.
    #[must_use]
    pub const fn kind(&self) -> JournalKind {
        match self {
            Self::Expense(_) => JournalKind::Expense,
            Self::Invoice(_) => JournalKind::Invoice,
            Self::Payment(_) => JournalKind::Payment,
            Self::Void(_) => JournalKind::Void,
            Self::Depreciation(_) => JournalKind::Depreciation,
        }
    }
}
