//! Field-level validation of incoming events.
//!
//! Every check runs and all failures are reported together, so callers
//! can show the whole list at once.

use rust_decimal::Decimal;

use super::events::{ExpensePosting, InvoicePosting, LineItem, PaymentRecord, TaxSettings, VoidPayment};
use crate::ledger::error::{FieldError, PostingError};
use crate::ledger::types::PaymentStatus;

#[derive(Default)]
struct Collector(Vec<FieldError>);

impl Collector {
    fn check(&mut self, ok: bool, field: &str, message: &str) {
        if !ok {
            self.0.push(FieldError::new(field, message));
        }
    }

    fn finish(self) -> Result<(), PostingError> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(PostingError::Validation(self.0))
        }
    }
}

fn check_tax(errors: &mut Collector, tax: Option<&TaxSettings>) {
    match tax {
        Some(TaxSettings::Percentage { rate }) => errors.check(
            *rate >= Decimal::ZERO && *rate <= Decimal::ONE_HUNDRED,
            "tax.rate",
            "must be between 0 and 100",
        ),
        Some(TaxSettings::Fixed { amount }) => {
            errors.check(*amount >= Decimal::ZERO, "tax.amount", "must not be negative");
        }
        None => {}
    }
}

fn check_lines(errors: &mut Collector, lines: &[LineItem]) {
    if lines.is_empty() {
        return;
    }
    for (index, line) in lines.iter().enumerate() {
        errors.check(
            line.amount >= Decimal::ZERO,
            &format!("line_items[{index}].amount"),
            "must not be negative",
        );
        if line.is_inventory() {
            errors.check(
                line.quantity.is_some_and(|q| q > Decimal::ZERO),
                &format!("line_items[{index}].quantity"),
                "must be positive for inventory items",
            );
        }
    }
    let sum: Decimal = lines.iter().map(|l| l.amount).sum();
    errors.check(sum > Decimal::ZERO, "line_items", "amounts must sum to a positive value");
}

/// Validates an expense or refund.
///
/// # Errors
///
/// Returns [`PostingError::Validation`] listing every failed field.
pub fn validate_expense(event: &ExpensePosting) -> Result<(), PostingError> {
    let mut errors = Collector::default();
    errors.check(!event.vendor.trim().is_empty(), "vendor", "must not be empty");
    errors.check(event.amount != Decimal::ZERO, "amount", "must not be zero");
    check_tax(&mut errors, event.tax.as_ref());
    check_lines(&mut errors, &event.line_items);

    if let Some(paid) = event.amount_paid {
        errors.check(paid >= Decimal::ZERO, "amount_paid", "must not be negative");
    }
    if !event.is_refund() {
        let gross = event.amount;
        match event.payment_status {
            PaymentStatus::Partial => errors.check(
                event
                    .amount_paid
                    .is_some_and(|p| p > Decimal::ZERO && p < gross),
                "amount_paid",
                "must be between zero and the amount for a partial payment",
            ),
            PaymentStatus::Overpaid => errors.check(
                event.amount_paid.is_none_or(|p| p >= gross),
                "amount_paid",
                "must be at least the amount for an overpayment",
            ),
            _ => {}
        }
    }
    errors.finish()
}

/// Validates an invoice.
///
/// # Errors
///
/// Returns [`PostingError::Validation`] listing every failed field.
pub fn validate_invoice(event: &InvoicePosting) -> Result<(), PostingError> {
    let mut errors = Collector::default();
    errors.check(!event.customer.trim().is_empty(), "customer", "must not be empty");
    errors.check(event.amount > Decimal::ZERO, "amount", "must be positive");
    errors.check(event.amount_paid >= Decimal::ZERO, "amount_paid", "must not be negative");
    errors.check(event.discount >= Decimal::ZERO, "discount", "must not be negative");
    if let Some(subtotal) = event.subtotal {
        errors.check(subtotal >= Decimal::ZERO, "subtotal", "must not be negative");
    }
    if let Some(number) = &event.invoice_number {
        errors.check(!number.trim().is_empty(), "invoice_number", "must not be blank");
    }
    check_tax(&mut errors, event.tax.as_ref());
    check_lines(&mut errors, &event.line_items);
    errors.finish()
}

/// Validates a payment.
///
/// # Errors
///
/// Returns [`PostingError::Validation`] listing every failed field.
pub fn validate_payment(event: &PaymentRecord) -> Result<(), PostingError> {
    let mut errors = Collector::default();
    errors.check(event.amount > Decimal::ZERO, "amount", "must be positive");
    errors.finish()
}

/// Validates a payment void.
///
/// # Errors
///
/// Returns [`PostingError::Validation`] listing every failed field.
pub fn validate_void(event: &VoidPayment) -> Result<(), PostingError> {
    let mut errors = Collector::default();
    errors.check(!event.reason.trim().is_empty(), "reason", "must not be empty");
    errors.finish()
}
