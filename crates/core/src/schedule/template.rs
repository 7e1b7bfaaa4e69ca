//! Posting templates carried by recurring rules.
//!
//! A template holds everything of an event except the tenant, the date
//! and the idempotency reference, which come from the rule and the run.

use chrono::{NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tally_shared::types::{RecurringRuleId, TenantId};

use super::rule::RuleKind;
use crate::calendar::add_days;
use crate::ledger::error::FieldError;
use crate::ledger::types::PaymentStatus;
use crate::posting::events::{ExpensePosting, InvoicePosting, LineItem, PostingEvent, TaxSettings};
use crate::posting::reference::recurring_reference;

/// Expense fields repeated on every run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpenseTemplate {
    /// Vendor name.
    pub vendor: String,
    /// Description used for account resolution.
    #[serde(default)]
    pub description: Option<String>,
    /// Gross amount; negative for a recurring refund.
    pub amount: Decimal,
    /// Settlement status of each bill.
    #[serde(default)]
    pub payment_status: PaymentStatus,
    /// Cash paid for partial bills.
    #[serde(default)]
    pub amount_paid: Option<Decimal>,
    /// Logical category key.
    #[serde(default)]
    pub category_key: Option<String>,
    /// Explicit account code.
    #[serde(default)]
    pub suggested_account_code: Option<String>,
    /// Tax settings.
    #[serde(default)]
    pub tax: Option<TaxSettings>,
    /// Line-item split.
    #[serde(default)]
    pub line_items: Vec<LineItem>,
}

impl ExpenseTemplate {
    /// A paid expense with only a vendor and amount.
    #[must_use]
    pub fn new(vendor: &str, amount: Decimal) -> Self {
        Self {
            vendor: vendor.to_string(),
            description: None,
            amount,
            payment_status: PaymentStatus::Paid,
            amount_paid: None,
            category_key: None,
            suggested_account_code: None,
            tax: None,
            line_items: Vec::new(),
        }
    }
}

/// Invoice fields repeated on every run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceTemplate {
    /// Customer name.
    pub customer: String,
    /// Description.
    #[serde(default)]
    pub description: Option<String>,
    /// Stated total, tax included.
    pub amount: Decimal,
    /// Cash received at posting time.
    #[serde(default)]
    pub amount_paid: Decimal,
    /// Stated subtotal.
    #[serde(default)]
    pub subtotal: Option<Decimal>,
    /// Discount granted.
    #[serde(default)]
    pub discount: Decimal,
    /// Tax settings.
    #[serde(default)]
    pub tax: Option<TaxSettings>,
    /// Revenue account override.
    #[serde(default)]
    pub revenue_account_code: Option<String>,
    /// Line-item split.
    #[serde(default)]
    pub line_items: Vec<LineItem>,
    /// Invoice numbers become `{prefix}-{YYYYMMDD}`; no number when absent.
    #[serde(default)]
    pub invoice_number_prefix: Option<String>,
}

impl InvoiceTemplate {
    /// An unpaid invoice with only a customer and amount.
    #[must_use]
    pub fn new(customer: &str, amount: Decimal) -> Self {
        Self {
            customer: customer.to_string(),
            description: None,
            amount,
            amount_paid: Decimal::ZERO,
            subtotal: None,
            discount: Decimal::ZERO,
            tax: None,
            revenue_account_code: None,
            line_items: Vec::new(),
            invoice_number_prefix: None,
        }
    }
}

/// The event a rule produces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PayloadTemplate {
    /// Recurring expense.
    Expense(ExpenseTemplate),
    /// Recurring invoice.
    Invoice(InvoiceTemplate),
}

impl PayloadTemplate {
    /// Event kind.
    #[must_use]
    pub const fn kind(&self) -> RuleKind {
        match self {
            Self::Expense(_) => RuleKind::Expense,
            Self::Invoice(_) => RuleKind::Invoice,
        }
    }

    /// Checks that do not depend on the run date.
    ///
    /// The full event is validated again by the writer on every run.
    #[must_use]
    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        let (party_field, party, amount) = match self {
            Self::Expense(t) => ("template.vendor", &t.vendor, t.amount),
            Self::Invoice(t) => ("template.customer", &t.customer, t.amount),
        };
        if party.trim().is_empty() {
            errors.push(FieldError::new(party_field, "must not be empty"));
        }
        if amount.is_zero() {
            errors.push(FieldError::new("template.amount", "must not be zero"));
        }
        if matches!(self, Self::Invoice(_)) && amount < Decimal::ZERO {
            errors.push(FieldError::new("template.amount", "must be positive"));
        }
        errors
    }

    /// Builds the concrete event for one scheduled run.
    ///
    /// The event is dated at the scheduled run date and carries the
    /// `REC-{ruleId}-{YYYYMMDD}` reference. Its submission instant is
    /// midnight UTC of the run date so repeated builds are identical.
    #[must_use]
    pub fn materialize(
        &self,
        tenant_id: TenantId,
        rule_id: RecurringRuleId,
        run_date: NaiveDate,
        due_days: Option<u32>,
    ) -> PostingEvent {
        let reference = Some(recurring_reference(rule_id, run_date));
        let submitted_at = Utc.from_utc_datetime(&run_date.and_time(chrono::NaiveTime::MIN));
        let due_date = due_days.and_then(|days| add_days(run_date, i64::from(days)));

        match self {
            Self::Expense(t) => PostingEvent::Expense(ExpensePosting {
                tenant_id,
                reference,
                date: run_date,
                vendor: t.vendor.clone(),
                description: t.description.clone(),
                amount: t.amount,
                is_refund: false,
                payment_status: t.payment_status,
                amount_paid: t.amount_paid,
                category_key: t.category_key.clone(),
                suggested_account_code: t.suggested_account_code.clone(),
                tax: t.tax,
                line_items: t.line_items.clone(),
                due_date,
                submitted_at,
                recurring_rule_id: Some(rule_id),
            }),
            Self::Invoice(t) => PostingEvent::Invoice(InvoicePosting {
                tenant_id,
                reference,
                invoice_number: t
                    .invoice_number_prefix
                    .as_ref()
                    .map(|prefix| format!("{prefix}-{}", run_date.format("%Y%m%d"))),
                date: run_date,
                customer: t.customer.clone(),
                description: t.description.clone(),
                amount: t.amount,
                amount_paid: t.amount_paid,
                subtotal: t.subtotal,
                discount: t.discount,
                tax: t.tax,
                revenue_account_code: t.revenue_account_code.clone(),
                line_items: t.line_items.clone(),
                due_date,
                submitted_at,
                recurring_rule_id: Some(rule_id),
            }),
        }
    }
}
