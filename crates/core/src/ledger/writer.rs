//! The ledger writer: one entry point turning business events into
//! committed, balanced journals.
//!
//! Every posting follows the same path:
//! 1. Validate the event and settle its idempotency reference
//! 2. Replay an existing journal with that reference, if any
//! 3. Resolve accounts (may call the classification oracle)
//! 4. Inside one unit of work: re-check the reference under lock, build
//!    the entries, check balance, write journal, entries and records
//! 5. Commit; a lost unique-constraint race replays the winner
//!
//! Nothing slow happens while a unit of work is open.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use tally_shared::types::money::round_cents;
use tally_shared::types::{ExpenseId, InventoryTxnId, InvoiceId, JournalId, ProductId, TenantId};

use super::entry::LedgerEntry;
use super::error::{PostingError, StoreError};
use super::journal::Journal;
use super::metadata::{
    DepreciationMeta, ExpenseMeta, InvoiceMeta, PaymentMeta, PaymentTarget, PostingMetadata, VoidMeta,
};
use super::records::{ExpenseRecord, InvoiceRecord, normalize_invoice_number};
use super::store::{LedgerStore, LedgerUnitOfWork};
use super::types::{
    DuplicateKind, EntryDraft, JournalKind, JournalTotals, PaymentStatus, PostingPreview, PostingResult,
};
use super::validation::validate_entries;
use crate::calendar::YearMonth;
use crate::chart::{ChartOfAccounts, PostingAccounts, TaxRegime};
use crate::depreciation::{AssetStatus, straight_line_charge};
use crate::inventory::{InventoryLot, InventoryTxn, InventoryTxnKind, LotConsumption, LotLedger};
use crate::posting::depreciation::build_depreciation;
use crate::posting::events::{
    AssetDepreciation, ExpensePosting, InvoicePosting, PaymentRecord, PostingEvent, VoidPayment,
};
use crate::posting::expense::{ExpenseAccounts, ExpenseDraft, build_expense};
use crate::posting::invoice::{InvoiceDraft, build_invoice};
use crate::posting::payment::build_payment;
use crate::posting::reference::{
    depreciation_reference, expense_reference, invoice_reference, payment_reference, void_reference,
};
use crate::posting::reversal::{reversal_description, reversing_entries};
use crate::posting::validate::{validate_expense, validate_invoice, validate_payment, validate_void};
use crate::resolver::{AccountHint, AccountResolver, ResolutionSource, resolve_credit};

/// Outcome of the work done inside a unit of work.
enum Written {
    /// A new journal to commit.
    Posted(PostingResult),
    /// The event was already posted; nothing to commit.
    Existing(PostingResult),
}

/// An expense resolved and built before its unit of work begins.
struct ExpensePlan {
    draft: ExpenseDraft,
    source: ResolutionSource,
}

/// Posts business events to the ledger.
pub struct LedgerWriter {
    store: Arc<dyn LedgerStore>,
    resolver: Arc<AccountResolver>,
    accounts: PostingAccounts,
}

impl LedgerWriter {
    /// Creates a writer over a store and a resolver.
    #[must_use]
    pub fn new(
        store: Arc<dyn LedgerStore>,
        resolver: Arc<AccountResolver>,
        accounts: PostingAccounts,
    ) -> Self {
        Self {
            store,
            resolver,
            accounts,
        }
    }

    /// System accounts used by the builders.
    #[must_use]
    pub fn accounts(&self) -> &PostingAccounts {
        &self.accounts
    }

    /// Posts an event, returning the new journal or the one already
    /// posted under the same reference (`is_existing = true`).
    ///
    /// # Errors
    ///
    /// Returns a [`PostingError`]; nothing is written when it does.
    #[tracing::instrument(
        skip(self, event),
        fields(tenant_id = %event.tenant_id(), kind = event.kind().as_str())
    )]
    pub async fn post(&self, event: PostingEvent) -> Result<PostingResult, PostingError> {
        match &event {
            PostingEvent::Expense(e) => self.post_expense(e).await,
            PostingEvent::Invoice(e) => self.post_invoice(e).await,
            PostingEvent::Payment(e) => self.post_payment(e).await,
            PostingEvent::VoidPayment(e) => self.post_void(e).await,
            PostingEvent::AssetDepreciation(e) => self.post_depreciation(e).await,
        }
    }

    /// Computes the entries an expense or invoice would post, writing nothing.
    ///
    /// Uses the same validation, resolution and amount math as [`post`](Self::post),
    /// costing inventory against the current lots without locking them.
    ///
    /// # Errors
    ///
    /// Returns the error posting would return, or a validation error for
    /// other event kinds.
    pub async fn preview(&self, event: &PostingEvent) -> Result<PostingPreview, PostingError> {
        let (tenant_id, reference, entries) = match event {
            PostingEvent::Expense(e) => {
                validate_expense(e)?;
                let plan = self.plan_expense(e).await?;
                (e.tenant_id, Self::expense_ref(e), plan.draft.entries)
            }
            PostingEvent::Invoice(e) => {
                validate_invoice(e)?;
                let profile = self.store.tenant_profile(e.tenant_id).await?;
                let mut lots = LotLedger::new();
                for product_id in invoice_products(e) {
                    lots.load(product_id, self.store.lots(e.tenant_id, product_id).await?);
                }
                let draft = build_invoice(e, &self.accounts, profile.tax_regime, &mut lots);
                (e.tenant_id, Self::invoice_ref(e), draft.entries)
            }
            _ => {
                return Err(PostingError::invalid(
                    "kind",
                    "preview supports expense and invoice events",
                ));
            }
        };

        check_balanced(&entries)?;
        let chart = self.store.chart(tenant_id).await?;
        ensure_accounts(&chart, &entries)?;
        let already_posted = self.store.find_journal(tenant_id, &reference).await?.is_some();

        Ok(PostingPreview {
            reference,
            entries,
            already_posted,
        })
    }

    // ========== Expenses ==========

    fn expense_ref(event: &ExpensePosting) -> String {
        supplied(event.reference.as_deref())
            .unwrap_or_else(|| expense_reference(&event.vendor, event.amount, event.submitted_at))
    }

    async fn post_expense(&self, event: &ExpensePosting) -> Result<PostingResult, PostingError> {
        validate_expense(event)?;
        let reference = Self::expense_ref(event);
        if let Some(result) = self.replay(event.tenant_id, &reference).await? {
            return Ok(result);
        }

        let plan = self.plan_expense(event).await?;

        let mut uow = self.store.begin().await?;
        let written = self.write_expense(uow.as_mut(), event, &reference, plan).await;
        self.finish(uow, written, event.tenant_id, &reference, None).await
    }

    async fn plan_expense(&self, event: &ExpensePosting) -> Result<ExpensePlan, PostingError> {
        let chart = self.store.chart(event.tenant_id).await?;
        let profile = self.store.tenant_profile(event.tenant_id).await?;

        let hint = AccountHint {
            tenant_id: event.tenant_id,
            category_key: event.category_key.clone(),
            vendor: event.vendor.clone(),
            description: event.description.clone(),
            suggested_account_code: event.suggested_account_code.clone(),
        };
        let primary = self.resolver.resolve_debit(&hint, &chart).await?;

        let mut lines = Vec::with_capacity(event.line_items.len());
        for line in &event.line_items {
            let code = if line.is_inventory() {
                self.accounts.inventory.clone()
            } else if line.account_code.is_some() || line.category_key.is_some() {
                let line_hint = AccountHint {
                    category_key: line.category_key.clone().or_else(|| event.category_key.clone()),
                    description: Some(line.description.clone()),
                    suggested_account_code: line.account_code.clone(),
                    ..hint.clone()
                };
                self.resolver.resolve_debit(&line_hint, &chart).await?.account_code
            } else {
                primary.account_code.clone()
            };
            lines.push(code);
        }

        let status = if event.is_refund() {
            PaymentStatus::Refunded
        } else {
            event.payment_status
        };
        let credit = resolve_credit(status, event.amount, &self.accounts);

        let accounts = ExpenseAccounts {
            primary: primary.account_code,
            lines,
            credit: credit.account_code,
        };
        let draft = build_expense(event, &accounts, &self.accounts, profile.tax_regime);
        check_balanced(&draft.entries)?;

        Ok(ExpensePlan {
            draft,
            source: primary.source,
        })
    }

    async fn write_expense(
        &self,
        uow: &mut dyn LedgerUnitOfWork,
        event: &ExpensePosting,
        reference: &str,
        plan: ExpensePlan,
    ) -> Result<Written, PostingError> {
        if let Some(result) = existing(uow, event.tenant_id, reference).await? {
            return Ok(Written::Existing(result));
        }

        let journal_id = JournalId::new();
        let expense_id = ExpenseId::new();
        let refund = event.is_refund();
        let ExpensePlan { draft, source } = plan;

        let mut receipts = draft.receipts;
        for lot in &mut receipts {
            lot.journal_id = Some(journal_id);
        }

        let metadata = PostingMetadata::Expense(ExpenseMeta {
            expense_id,
            vendor: event.vendor.clone(),
            payment_status: event.payment_status,
            is_refund: refund,
            resolution_source: source.as_str().to_string(),
            lot_receipts: receipts.iter().map(|l| l.id).collect(),
            recurring_rule_id: event.recurring_rule_id,
        });
        let description = event
            .description
            .clone()
            .unwrap_or_else(|| format!("Expense: {}", event.vendor));
        let journal = new_journal(journal_id, event.tenant_id, event.date, description, reference, metadata);
        let journal = store_journal(uow, journal, &draft.entries).await?;

        let (amount_paid, status) = if refund {
            (draft.gross, PaymentStatus::Refunded)
        } else {
            let paid = match event.payment_status {
                PaymentStatus::Unpaid => Decimal::ZERO,
                PaymentStatus::Partial | PaymentStatus::Overpaid => {
                    event.amount_paid.map_or(draft.gross, round_cents)
                }
                PaymentStatus::Paid | PaymentStatus::Refunded => draft.gross,
            };
            (paid, PaymentStatus::from_amounts(draft.gross, paid))
        };
        uow.insert_expense(&ExpenseRecord {
            id: expense_id,
            tenant_id: event.tenant_id,
            journal_id,
            vendor: event.vendor.clone(),
            description: event.description.clone(),
            total: draft.gross,
            amount_paid,
            status,
            is_refund: refund,
            date: event.date,
            due_date: event.due_date,
            tax: event.tax,
            line_items: event.line_items.clone(),
        })
        .await?;

        if !receipts.is_empty() {
            let txns: Vec<InventoryTxn> = receipts.iter().map(|lot| receipt_txn(lot, journal_id)).collect();
            uow.insert_lots(&receipts).await?;
            uow.insert_inventory_txns(&txns).await?;
        }

        tracing::info!(%journal_id, reference, source = source.as_str(), "Expense posted");
        Ok(Written::Posted(journal.to_result(None)))
    }

    // ========== Invoices ==========

    fn invoice_ref(event: &InvoicePosting) -> String {
        supplied(event.reference.as_deref())
            .unwrap_or_else(|| invoice_reference(&event.customer, event.amount, event.submitted_at))
    }

    async fn post_invoice(&self, event: &InvoicePosting) -> Result<PostingResult, PostingError> {
        validate_invoice(event)?;
        let reference = Self::invoice_ref(event);
        if let Some(result) = self.replay(event.tenant_id, &reference).await? {
            return Ok(result);
        }

        let profile = self.store.tenant_profile(event.tenant_id).await?;
        let normalized = event.invoice_number.as_deref().and_then(normalize_invoice_number);

        let mut uow = self.store.begin().await?;
        let written = self
            .write_invoice(uow.as_mut(), event, &reference, normalized.as_deref(), profile.tax_regime)
            .await;
        self.finish(uow, written, event.tenant_id, &reference, normalized.as_deref())
            .await
    }

    async fn write_invoice(
        &self,
        uow: &mut dyn LedgerUnitOfWork,
        event: &InvoicePosting,
        reference: &str,
        normalized: Option<&str>,
        regime: TaxRegime,
    ) -> Result<Written, PostingError> {
        if let Some(result) = existing(uow, event.tenant_id, reference).await? {
            return Ok(Written::Existing(result));
        }
        if let Some(number) = normalized {
            if let Some(journal) = uow.find_invoice_journal(event.tenant_id, number).await? {
                tracing::info!(journal_id = %journal.id, invoice_number = number, "Invoice number already posted");
                return Ok(Written::Existing(journal.to_result(Some(DuplicateKind::InvoiceNumber))));
            }
        }

        // Lots are locked in product order so concurrent sales cannot deadlock.
        let mut lots = LotLedger::new();
        for product_id in invoice_products(event) {
            lots.load(product_id, uow.lock_lots(event.tenant_id, product_id).await?);
        }

        let draft = build_invoice(event, &self.accounts, regime, &mut lots);
        let journal_id = JournalId::new();
        let invoice_id = InvoiceId::new();
        let InvoiceDraft {
            entries,
            total,
            discount_posted,
            cost_of_goods_sold,
            consumptions,
            shortfalls,
            ..
        } = draft;

        let metadata = PostingMetadata::Invoice(InvoiceMeta {
            invoice_id,
            customer: event.customer.clone(),
            invoice_number: event.invoice_number.clone(),
            discount_posted,
            cost_of_goods_sold,
            shortfalls,
            recurring_rule_id: event.recurring_rule_id,
        });
        let description = event
            .description
            .clone()
            .unwrap_or_else(|| format!("Invoice: {}", event.customer));
        let journal = new_journal(journal_id, event.tenant_id, event.date, description, reference, metadata);
        let journal = store_journal(uow, journal, &entries).await?;

        let paid = round_cents(event.amount_paid);
        uow.insert_invoice(&InvoiceRecord {
            id: invoice_id,
            tenant_id: event.tenant_id,
            journal_id,
            customer: event.customer.clone(),
            invoice_number: event.invoice_number.clone(),
            normalized_number: normalized.map(ToString::to_string),
            total,
            amount_paid: paid,
            status: PaymentStatus::from_amounts(total, paid),
            discount: round_cents(event.discount),
            date: event.date,
            due_date: event.due_date,
            tax: event.tax,
            line_items: event.line_items.clone(),
        })
        .await?;

        if !consumptions.is_empty() {
            let changed = lots.changed_lots();
            let txns: Vec<InventoryTxn> = consumptions
                .iter()
                .map(|c| consumption_txn(c, event.tenant_id, journal_id))
                .collect();
            uow.update_lots(&changed).await?;
            uow.insert_inventory_txns(&txns).await?;
        }

        tracing::info!(%journal_id, reference, %cost_of_goods_sold, "Invoice posted");
        Ok(Written::Posted(journal.to_result(None)))
    }

    // ========== Payments ==========

    async fn post_payment(&self, event: &PaymentRecord) -> Result<PostingResult, PostingError> {
        validate_payment(event)?;
        let reference = supplied(event.reference.as_deref()).unwrap_or_else(|| {
            payment_reference(&target_label(event.target), event.amount, event.submitted_at)
        });
        if let Some(result) = self.replay(event.tenant_id, &reference).await? {
            return Ok(result);
        }

        let mut uow = self.store.begin().await?;
        let written = self.write_payment(uow.as_mut(), event, &reference).await;
        self.finish(uow, written, event.tenant_id, &reference, None).await
    }

    async fn write_payment(
        &self,
        uow: &mut dyn LedgerUnitOfWork,
        event: &PaymentRecord,
        reference: &str,
    ) -> Result<Written, PostingError> {
        if let Some(result) = existing(uow, event.tenant_id, reference).await? {
            return Ok(Written::Existing(result));
        }

        let tenant_id = event.tenant_id;
        let mut settlement = Settlement::load(uow, tenant_id, event.target).await?;
        let draft = build_payment(event, settlement.outstanding(), &self.accounts);

        let journal_id = JournalId::new();
        let metadata = PostingMetadata::Payment(PaymentMeta {
            target: event.target,
            amount: draft.amount,
            applied: draft.applied,
            excess: draft.excess,
            memo: event.memo.clone(),
        });
        let description = event
            .memo
            .clone()
            .unwrap_or_else(|| format!("Payment for {}", target_label(event.target)));
        let journal = new_journal(journal_id, tenant_id, event.date, description, reference, metadata);
        let journal = store_journal(uow, journal, &draft.entries).await?;

        settlement.apply(draft.amount);
        settlement.save(uow).await?;

        tracing::info!(%journal_id, reference, applied = %draft.applied, excess = %draft.excess, "Payment posted");
        Ok(Written::Posted(journal.to_result(None)))
    }

    // ========== Voids ==========

    async fn post_void(&self, event: &VoidPayment) -> Result<PostingResult, PostingError> {
        validate_void(event)?;
        let reference = void_reference(event.payment_journal_id);
        if let Some(result) = self.replay(event.tenant_id, &reference).await? {
            return Ok(result);
        }

        let mut uow = self.store.begin().await?;
        let written = self.write_void(uow.as_mut(), event, &reference).await;
        self.finish(uow, written, event.tenant_id, &reference, None).await
    }

    async fn write_void(
        &self,
        uow: &mut dyn LedgerUnitOfWork,
        event: &VoidPayment,
        reference: &str,
    ) -> Result<Written, PostingError> {
        if let Some(result) = existing(uow, event.tenant_id, reference).await? {
            return Ok(Written::Existing(result));
        }

        let tenant_id = event.tenant_id;
        let original = uow
            .load_journal(tenant_id, event.payment_journal_id)
            .await?
            .ok_or_else(|| PostingError::TargetNotFound(format!("journal {}", event.payment_journal_id)))?;
        let PostingMetadata::Payment(payment) = &original.metadata else {
            return Err(PostingError::invalid("payment_journal_id", "journal is not a payment"));
        };

        let journal_id = JournalId::new();
        let metadata = PostingMetadata::Void(VoidMeta {
            voided_journal_id: original.id,
            target: payment.target,
            amount: payment.amount,
            reason: event.reason.clone(),
        });
        let entries = reversing_entries(&original);
        let description = reversal_description(&original, &event.reason);
        let journal = new_journal(journal_id, tenant_id, event.date, description, reference, metadata);
        let journal = store_journal(uow, journal, &entries).await?;

        let mut settlement = Settlement::load(uow, tenant_id, payment.target).await?;
        settlement.reverse(payment.amount);
        settlement.save(uow).await?;

        tracing::info!(%journal_id, voided = %original.id, "Payment voided");
        Ok(Written::Posted(journal.to_result(None)))
    }

    // ========== Depreciation ==========

    async fn post_depreciation(&self, event: &AssetDepreciation) -> Result<PostingResult, PostingError> {
        let reference = depreciation_reference(event.asset_id, event.period);
        if let Some(result) = self.replay(event.tenant_id, &reference).await? {
            return Ok(result);
        }

        let mut uow = self.store.begin().await?;
        let written = self.write_depreciation(uow.as_mut(), event, &reference).await;
        self.finish(uow, written, event.tenant_id, &reference, None).await
    }

    async fn write_depreciation(
        &self,
        uow: &mut dyn LedgerUnitOfWork,
        event: &AssetDepreciation,
        reference: &str,
    ) -> Result<Written, PostingError> {
        if let Some(result) = existing(uow, event.tenant_id, reference).await? {
            return Ok(Written::Existing(result));
        }

        let mut asset = uow
            .load_asset(event.tenant_id, event.asset_id)
            .await?
            .ok_or_else(|| PostingError::TargetNotFound(format!("asset {}", event.asset_id)))?;
        // Only the scheduled month posts; periods never skip ahead.
        let due = YearMonth::of(asset.next_run_on);
        if event.period != due {
            return Err(PostingError::invalid(
                "period",
                &format!("asset is due for {}, not {}", due.label(), event.period.label()),
            ));
        }
        let charge = straight_line_charge(&asset);
        if asset.status == AssetStatus::FullyDepreciated || charge <= Decimal::ZERO {
            return Err(PostingError::invalid("asset_id", "asset has nothing left to depreciate"));
        }

        let date = asset.next_run_on;
        let entries = build_depreciation(&asset, event.period, charge, &self.accounts);
        asset.apply_charge(charge);

        let journal_id = JournalId::new();
        let metadata = PostingMetadata::Depreciation(DepreciationMeta {
            asset_id: asset.id,
            period: event.period.label(),
            amount: charge,
            accumulated_after: asset.accumulated_depreciation,
            fully_depreciated: asset.status == AssetStatus::FullyDepreciated,
        });
        let description = format!("Depreciation: {} {}", asset.name, event.period.label());
        let journal = new_journal(journal_id, event.tenant_id, date, description, reference, metadata);
        let journal = store_journal(uow, journal, &entries).await?;
        uow.update_asset(&asset).await?;

        tracing::info!(
            %journal_id,
            asset_id = %asset.id,
            %charge,
            status = asset.status.as_str(),
            "Depreciation posted"
        );
        Ok(Written::Posted(journal.to_result(None)))
    }

    // ========== Unit of work plumbing ==========

    /// Returns the committed journal with this reference, if any.
    async fn replay(
        &self,
        tenant_id: TenantId,
        reference: &str,
    ) -> Result<Option<PostingResult>, PostingError> {
        let found = self.store.find_journal(tenant_id, reference).await?;
        Ok(found.map(|journal| {
            tracing::info!(journal_id = %journal.id, reference, "Reference already posted, replaying");
            journal.to_result(Some(DuplicateKind::Reference))
        }))
    }

    /// Commits or rolls back a unit of work according to what was written.
    async fn finish(
        &self,
        uow: Box<dyn LedgerUnitOfWork>,
        written: Result<Written, PostingError>,
        tenant_id: TenantId,
        reference: &str,
        invoice_number: Option<&str>,
    ) -> Result<PostingResult, PostingError> {
        match written {
            Ok(Written::Posted(result)) => match uow.commit().await {
                Ok(()) => Ok(result),
                Err(StoreError::UniqueViolation(constraint)) => {
                    self.replay_winner(tenant_id, reference, invoice_number, &constraint)
                        .await
                }
                Err(e) => Err(e.into()),
            },
            Ok(Written::Existing(result)) => {
                uow.rollback().await?;
                Ok(result)
            }
            Err(PostingError::Store(StoreError::UniqueViolation(constraint))) => {
                discard(uow).await;
                self.replay_winner(tenant_id, reference, invoice_number, &constraint)
                    .await
            }
            Err(e) => {
                discard(uow).await;
                Err(e)
            }
        }
    }

    /// Looks up the journal that won a unique-constraint race.
    async fn replay_winner(
        &self,
        tenant_id: TenantId,
        reference: &str,
        invoice_number: Option<&str>,
        constraint: &str,
    ) -> Result<PostingResult, PostingError> {
        tracing::info!(reference, constraint, "Lost a posting race, replaying the winner");
        if let Some(journal) = self.store.find_journal(tenant_id, reference).await? {
            return Ok(journal.to_result(Some(DuplicateKind::Reference)));
        }
        if let Some(number) = invoice_number {
            let mut uow = self.store.begin().await?;
            let found = uow.find_invoice_journal(tenant_id, number).await;
            discard(uow).await;
            if let Some(journal) = found? {
                return Ok(journal.to_result(Some(DuplicateKind::InvoiceNumber)));
            }
        }
        Err(StoreError::Conflict.into())
    }
}

/// Rolls back, logging instead of masking the original failure.
async fn discard(uow: Box<dyn LedgerUnitOfWork>) {
    if let Err(e) = uow.rollback().await {
        tracing::warn!(error = %e, "Rollback failed");
    }
}

/// Locks the reference and returns the journal already holding it.
async fn existing(
    uow: &mut dyn LedgerUnitOfWork,
    tenant_id: TenantId,
    reference: &str,
) -> Result<Option<PostingResult>, PostingError> {
    uow.lock_reference(tenant_id, reference).await?;
    let found = uow.find_journal(tenant_id, reference).await?;
    Ok(found.map(|journal| {
        tracing::info!(journal_id = %journal.id, reference, "Reference posted concurrently, replaying");
        journal.to_result(Some(DuplicateKind::Reference))
    }))
}

/// Balance check; a failure here is a logic bug and must alert.
fn check_balanced(entries: &[EntryDraft]) -> Result<JournalTotals, PostingError> {
    validate_entries(entries).inspect_err(|e| {
        tracing::error!(error = %e, "Accounting invariant violated, posting rolled back");
    })
}

fn entry_codes(entries: &[EntryDraft]) -> Vec<String> {
    entries
        .iter()
        .map(|e| e.account_code.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

fn ensure_accounts(chart: &ChartOfAccounts, entries: &[EntryDraft]) -> Result<(), PostingError> {
    let codes = entry_codes(entries);
    let missing = chart.missing(codes.iter().map(String::as_str));
    if missing.is_empty() {
        Ok(())
    } else {
        Err(PostingError::AccountsNotFound(missing))
    }
}

/// Checks balance, binds entries to stored accounts and inserts the journal.
async fn store_journal(
    uow: &mut dyn LedgerUnitOfWork,
    mut journal: Journal,
    entries: &[EntryDraft],
) -> Result<Journal, PostingError> {
    let totals = check_balanced(entries)?;

    let codes = entry_codes(entries);
    let ids = uow.account_ids(journal.tenant_id, &codes).await?;
    let missing: Vec<String> = codes.into_iter().filter(|c| !ids.contains_key(c)).collect();
    if !missing.is_empty() {
        tracing::warn!(?missing, "Journal references accounts missing from the chart");
        return Err(PostingError::AccountsNotFound(missing));
    }

    journal.amount = totals.debit;
    journal.entries = entries
        .iter()
        .filter_map(|draft| {
            ids.get(&draft.account_code)
                .map(|&account_id| LedgerEntry::from_draft(journal.id, account_id, draft))
        })
        .collect();
    uow.insert_journal(&journal).await?;
    Ok(journal)
}

fn new_journal(
    id: JournalId,
    tenant_id: TenantId,
    date: NaiveDate,
    description: String,
    reference: &str,
    metadata: PostingMetadata,
) -> Journal {
    let kind: JournalKind = metadata.kind();
    Journal {
        id,
        tenant_id,
        date,
        description,
        reference: reference.to_string(),
        amount: Decimal::ZERO,
        kind,
        metadata,
        created_at: Utc::now(),
        entries: Vec::new(),
    }
}

/// A caller-supplied reference, ignoring blanks.
fn supplied(reference: Option<&str>) -> Option<String> {
    reference
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(ToString::to_string)
}

fn target_label(target: PaymentTarget) -> String {
    match target {
        PaymentTarget::Expense(id) => format!("expense {id}"),
        PaymentTarget::Invoice(id) => format!("invoice {id}"),
    }
}

/// Inventory-tracked products of an invoice, sorted and deduplicated.
fn invoice_products(event: &InvoicePosting) -> BTreeSet<ProductId> {
    event.line_items.iter().filter_map(|l| l.product_id).collect()
}

fn receipt_txn(lot: &InventoryLot, journal_id: JournalId) -> InventoryTxn {
    InventoryTxn {
        id: InventoryTxnId::new(),
        tenant_id: lot.tenant_id,
        lot_id: lot.id,
        product_id: lot.product_id,
        journal_id,
        kind: InventoryTxnKind::Receipt,
        quantity: lot.quantity,
        unit_cost: lot.unit_cost,
    }
}

fn consumption_txn(consumption: &LotConsumption, tenant_id: TenantId, journal_id: JournalId) -> InventoryTxn {
    InventoryTxn {
        id: InventoryTxnId::new(),
        tenant_id,
        lot_id: consumption.lot_id,
        product_id: consumption.product_id,
        journal_id,
        kind: InventoryTxnKind::Consumption,
        quantity: consumption.quantity,
        unit_cost: consumption.unit_cost,
    }
}

/// The record a payment or void settles, loaded inside the unit of work.
enum Settlement {
    Expense(ExpenseRecord),
    Invoice(InvoiceRecord),
}

impl Settlement {
    async fn load(
        uow: &mut dyn LedgerUnitOfWork,
        tenant_id: TenantId,
        target: PaymentTarget,
    ) -> Result<Self, PostingError> {
        let found = match target {
            PaymentTarget::Expense(id) => uow.load_expense(tenant_id, id).await?.map(Self::Expense),
            PaymentTarget::Invoice(id) => uow.load_invoice(tenant_id, id).await?.map(Self::Invoice),
        };
        found.ok_or_else(|| PostingError::TargetNotFound(target_label(target)))
    }

    fn outstanding(&self) -> Decimal {
        match self {
            Self::Expense(r) => r.outstanding(),
            Self::Invoice(r) => r.outstanding(),
        }
    }

    fn apply(&mut self, amount: Decimal) {
        match self {
            Self::Expense(r) => r.apply_payment(amount),
            Self::Invoice(r) => r.apply_payment(amount),
        }
    }

    fn reverse(&mut self, amount: Decimal) {
        match self {
            Self::Expense(r) => r.reverse_payment(amount),
            Self::Invoice(r) => r.reverse_payment(amount),
        }
    }

    async fn save(&self, uow: &mut dyn LedgerUnitOfWork) -> Result<(), PostingError> {
        match self {
            Self::Expense(r) => uow.update_expense_settlement(r).await?,
            Self::Invoice(r) => uow.update_invoice_settlement(r).await?,
        }
        Ok(())
    }
}
