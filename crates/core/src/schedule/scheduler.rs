//! The recurring scheduler: rule management and run entry points.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use dashmap::DashMap;
use futures::{FutureExt, StreamExt, stream};
use serde::Serialize;
use tally_shared::types::{RecurringRuleId, TenantId};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::cadence::{advance, advance_date, first_run_date, local_date, run_instant};
use super::error::SchedulerError;
use super::rule::{NewRule, RecurringRule, RuleUpdate, RunLogEntry, RunStatus, validate_rule};
use super::store::{RuleStore, TenantScope};
use crate::ledger::error::{FieldError, PostingError, StoreError};
use crate::ledger::store::LedgerStore;
use crate::ledger::types::{PostingPreview, PostingResult};
use crate::ledger::writer::LedgerWriter;

/// Code reported for skipped runs. Informational, never an error.
pub const SCHEDULE_SKIPPED: &str = "SCHEDULE_SKIPPED";

/// Scheduler tuning.
#[derive(Debug, Clone)]
pub struct SchedulerSettings {
    /// Rules run concurrently within one sweep.
    pub max_concurrent_rules: usize,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            max_concurrent_rules: 8,
        }
    }
}

/// Why a rule did not run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Paused explicitly or deactivated.
    Inactive,
    /// `next_run_at` is still ahead.
    NotDue,
    /// Already ran today and the next run is not a catch-up.
    RanToday,
    /// Soft pause still in effect.
    Paused {
        /// The pause lifts on this date.
        until: NaiveDate,
    },
    /// The run date is past the rule's end date; the rule was deactivated.
    PastEndDate {
        /// The rule's end date.
        end_date: NaiveDate,
    },
}

impl SkipReason {
    /// Run-log detail.
    #[must_use]
    pub fn detail(&self) -> String {
        match self {
            Self::Inactive => "rule is inactive".to_string(),
            Self::NotDue => "not due".to_string(),
            Self::RanToday => "already ran today".to_string(),
            Self::Paused { until } => format!("paused until {until}"),
            Self::PastEndDate { end_date } => format!("past end date {end_date}"),
        }
    }

    /// Skips worth a run-log entry.
    const fn is_logged(&self) -> bool {
        matches!(self, Self::Paused { .. } | Self::PastEndDate { .. })
    }
}

/// Result of running one rule.
#[derive(Debug)]
pub enum RunOutcome {
    /// The posting was committed (or had been already) and the rule advanced.
    Committed {
        /// Scheduled date that ran.
        run_date: NaiveDate,
        /// Writer result.
        result: PostingResult,
        /// The rule's new next run.
        next_run_at: DateTime<Utc>,
        /// True if the rule reached its end date.
        deactivated: bool,
    },
    /// Dry run: what the posting would be.
    Previewed {
        /// Scheduled date previewed.
        run_date: NaiveDate,
        /// Would-be entries.
        preview: PostingPreview,
    },
    /// Nothing ran.
    Skipped {
        /// Scheduled date.
        run_date: NaiveDate,
        /// Why.
        reason: SkipReason,
    },
    /// The writer rejected the event; the rule did not advance.
    Failed {
        /// Scheduled date that failed.
        run_date: NaiveDate,
        /// Writer error.
        error: PostingError,
    },
}

/// Summary of one sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Rules looked at.
    pub considered: usize,
    /// Rules that committed a posting.
    pub committed: usize,
    /// Rules skipped (not due, paused, ended).
    pub skipped: usize,
    /// Rules whose posting failed.
    pub failed: usize,
    /// Rules advanced by a concurrent sweep first.
    pub conflicts: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Sweep,
    Manual { dry_run: bool },
}

struct SweepGuard<'a>(&'a AtomicBool);

impl Drop for SweepGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Turns recurring rules into postings.
///
/// Each rule's due-check-and-advance runs under a per-rule lock and is
/// saved with a compare-and-swap on `next_run_at`, so concurrent sweeps
/// never fire a rule twice. Postings go through the same
/// [`LedgerWriter::post`] as direct callers.
pub struct RecurringScheduler {
    rules: Arc<dyn RuleStore>,
    ledger: Arc<dyn LedgerStore>,
    writer: Arc<LedgerWriter>,
    settings: SchedulerSettings,
    locks: DashMap<RecurringRuleId, Arc<Mutex<()>>>,
    sweeping: AtomicBool,
}

impl RecurringScheduler {
    /// Creates a scheduler.
    #[must_use]
    pub fn new(
        rules: Arc<dyn RuleStore>,
        ledger: Arc<dyn LedgerStore>,
        writer: Arc<LedgerWriter>,
        settings: SchedulerSettings,
    ) -> Self {
        Self {
            rules,
            ledger,
            writer,
            settings,
            locks: DashMap::new(),
            sweeping: AtomicBool::new(false),
        }
    }

    // ========== Rule management ==========

    /// Creates a rule and schedules its first run.
    #[tracing::instrument(skip(self, new_rule), fields(tenant_id = %new_rule.tenant_id, cadence = %new_rule.cadence))]
    pub async fn create_rule(
        &self,
        new_rule: NewRule,
        now: DateTime<Utc>,
    ) -> Result<RecurringRule, SchedulerError> {
        let errors = validate_rule(
            &new_rule.name,
            new_rule.start_date,
            new_rule.end_date,
            &new_rule.options,
            &new_rule.template,
        );
        if !errors.is_empty() {
            return Err(SchedulerError::InvalidRule(errors));
        }

        let tz = self.time_zone(new_rule.tenant_id).await?;
        let created_on = local_date(now, new_rule.cadence, tz);
        let next_run_at = first_run_date(new_rule.start_date, created_on, new_rule.cadence, &new_rule.options)
            .and_then(|date| run_instant(date, new_rule.cadence, tz))
            .ok_or_else(out_of_range)?;

        let rule = RecurringRule {
            id: RecurringRuleId::new(),
            tenant_id: new_rule.tenant_id,
            name: new_rule.name,
            cadence: new_rule.cadence,
            start_date: new_rule.start_date,
            end_date: new_rule.end_date,
            options: new_rule.options,
            next_run_at,
            last_run_at: None,
            is_active: true,
            template: new_rule.template,
            run_log: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        self.rules.insert(&rule).await?;

        tracing::info!(rule_id = %rule.id, next_run_at = %rule.next_run_at, "Recurring rule created");
        Ok(rule)
    }

    /// Applies a partial update.
    ///
    /// Changing the cadence or options reschedules the rule from its last
    /// committed run, or from its start date if it never ran.
    #[tracing::instrument(skip(self, update))]
    pub async fn update_rule(
        &self,
        rule_id: RecurringRuleId,
        update: RuleUpdate,
        now: DateTime<Utc>,
    ) -> Result<RecurringRule, SchedulerError> {
        let lock = self.lock_for(rule_id);
        let _guard = lock.lock().await;

        let mut rule = self.load(rule_id).await?;
        let expected = rule.next_run_at;
        let reschedules = update.reschedules();

        if let Some(name) = update.name {
            rule.name = name;
        }
        if let Some(cadence) = update.cadence {
            rule.cadence = cadence;
        }
        if let Some(end_date) = update.end_date {
            rule.end_date = end_date;
        }
        if let Some(options) = update.options {
            rule.options = options;
        }
        if let Some(template) = update.template {
            rule.template = template;
        }

        let errors = validate_rule(&rule.name, rule.start_date, rule.end_date, &rule.options, &rule.template);
        if !errors.is_empty() {
            return Err(SchedulerError::InvalidRule(errors));
        }

        if reschedules {
            let tz = self.time_zone(rule.tenant_id).await?;
            let next = match rule.last_committed_run() {
                Some(last) => advance_date(last, rule.cadence, &rule.options),
                None => first_run_date(
                    rule.start_date,
                    local_date(now, rule.cadence, tz),
                    rule.cadence,
                    &rule.options,
                ),
            };
            rule.next_run_at = next
                .and_then(|date| run_instant(date, rule.cadence, tz))
                .ok_or_else(out_of_range)?;
        }

        self.persist(&mut rule, expected, now).await?;
        Ok(rule)
    }

    /// Pauses a rule, optionally until `resume_on`.
    pub async fn pause(
        &self,
        rule_id: RecurringRuleId,
        resume_on: Option<NaiveDate>,
        now: DateTime<Utc>,
    ) -> Result<RecurringRule, SchedulerError> {
        let lock = self.lock_for(rule_id);
        let _guard = lock.lock().await;

        let mut rule = self.load(rule_id).await?;
        let expected = rule.next_run_at;
        rule.is_active = false;
        rule.options.resume_on = resume_on;
        self.persist(&mut rule, expected, now).await?;

        tracing::info!(rule_id = %rule_id, resume_on = ?resume_on, "Recurring rule paused");
        Ok(rule)
    }

    /// Lifts an explicit pause. A soft `pause_until` stays in place.
    pub async fn resume(
        &self,
        rule_id: RecurringRuleId,
        now: DateTime<Utc>,
    ) -> Result<RecurringRule, SchedulerError> {
        let lock = self.lock_for(rule_id);
        let _guard = lock.lock().await;

        let mut rule = self.load(rule_id).await?;
        let expected = rule.next_run_at;
        rule.is_active = true;
        rule.options.resume_on = None;
        self.persist(&mut rule, expected, now).await?;

        tracing::info!(rule_id = %rule_id, "Recurring rule resumed");
        Ok(rule)
    }

    /// Deletes a rule. Journals it produced are untouched.
    pub async fn delete(&self, rule_id: RecurringRuleId) -> Result<(), SchedulerError> {
        let lock = self.lock_for(rule_id);
        let guard = lock.lock().await;

        if !self.rules.delete(rule_id).await? {
            return Err(SchedulerError::RuleNotFound(rule_id));
        }
        drop(guard);
        self.locks.remove(&rule_id);
        Ok(())
    }

    /// Loads a rule.
    pub async fn rule(&self, rule_id: RecurringRuleId) -> Result<RecurringRule, SchedulerError> {
        self.load(rule_id).await
    }

    /// Rules of a tenant.
    pub async fn rules(&self, tenant_id: TenantId) -> Result<Vec<RecurringRule>, SchedulerError> {
        Ok(self.rules.list(tenant_id).await?)
    }

    // ========== Running ==========

    /// Runs every due rule in `scope` as of `now`.
    ///
    /// Failures are isolated per rule: they land in that rule's run log
    /// and the sweep goes on.
    #[tracing::instrument(skip(self))]
    pub async fn run_due(
        &self,
        scope: TenantScope,
        now: DateTime<Utc>,
    ) -> Result<SweepReport, SchedulerError> {
        let candidates = self.rules.candidates(scope, now).await?;
        let mut report = SweepReport {
            considered: candidates.len(),
            ..SweepReport::default()
        };

        let outcomes: Vec<(RecurringRuleId, Result<RunOutcome, SchedulerError>)> =
            stream::iter(candidates.into_iter().map(|rule| rule.id))
                .map(|id| self.execute(id, Mode::Sweep, now).map(move |outcome| (id, outcome)))
                .buffer_unordered(self.settings.max_concurrent_rules.max(1))
                .collect()
                .await;

        for (rule_id, outcome) in outcomes {
            match outcome {
                Ok(RunOutcome::Committed { .. }) => report.committed += 1,
                Ok(RunOutcome::Skipped { .. } | RunOutcome::Previewed { .. }) => report.skipped += 1,
                Ok(RunOutcome::Failed { .. }) => report.failed += 1,
                Err(SchedulerError::Store(StoreError::Conflict)) => {
                    tracing::debug!(rule_id = %rule_id, "Rule advanced by a concurrent sweep");
                    report.conflicts += 1;
                }
                Err(e) => {
                    tracing::warn!(rule_id = %rule_id, error = %e, "Recurring rule could not run");
                    report.failed += 1;
                }
            }
        }

        tracing::info!(
            considered = report.considered,
            committed = report.committed,
            skipped = report.skipped,
            failed = report.failed,
            conflicts = report.conflicts,
            "Recurring sweep finished"
        );
        Ok(report)
    }

    /// Runs one rule's current scheduled date, due or not.
    ///
    /// Inactivity, pause windows and the end date still apply. A dry run
    /// goes through the writer's preview path and persists nothing.
    pub async fn run_one(
        &self,
        rule_id: RecurringRuleId,
        dry_run: bool,
        now: DateTime<Utc>,
    ) -> Result<RunOutcome, SchedulerError> {
        self.execute(rule_id, Mode::Manual { dry_run }, now).await
    }

    /// One background sweep over all tenants.
    ///
    /// Returns `Ok(None)` when the previous sweep is still running.
    pub async fn tick(&self) -> Result<Option<SweepReport>, SchedulerError> {
        if self
            .sweeping
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!("Previous sweep still running, tick dropped");
            return Ok(None);
        }
        let _sweeping = SweepGuard(&self.sweeping);
        self.run_due(TenantScope::All, Utc::now()).await.map(Some)
    }

    /// Runs [`tick`](Self::tick) every `every` until the task is aborted.
    pub fn spawn(self: Arc<Self>, every: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                if let Err(e) = self.tick().await {
                    tracing::warn!(error = %e, code = e.error_code(), "Recurring sweep failed");
                }
            }
        })
    }

    #[tracing::instrument(skip_all, fields(rule_id = %rule_id, ?mode))]
    async fn execute(
        &self,
        rule_id: RecurringRuleId,
        mode: Mode,
        now: DateTime<Utc>,
    ) -> Result<RunOutcome, SchedulerError> {
        let lock = self.lock_for(rule_id);
        let _guard = lock.lock().await;

        let mut rule = self.load(rule_id).await?;
        let expected = rule.next_run_at;
        let dry_run = mode == Mode::Manual { dry_run: true };
        let tz = self.time_zone(rule.tenant_id).await?;
        let today = local_date(now, rule.cadence, tz);
        let run_date = local_date(rule.next_run_at, rule.cadence, tz);
        let mut dirty = false;

        if !rule.is_active {
            match rule.options.resume_on {
                Some(resume_on) if resume_on <= today => {
                    rule.is_active = true;
                    rule.options.resume_on = None;
                    dirty = true;
                    tracing::info!(%resume_on, "Recurring rule resumed automatically");
                }
                _ => return Ok(RunOutcome::Skipped { run_date, reason: SkipReason::Inactive }),
            }
        }

        if let Some(reason) = skip_reason(&rule, mode, now, today, run_date, tz) {
            if let SkipReason::PastEndDate { .. } = reason {
                rule.is_active = false;
                dirty = true;
            }
            if !dry_run {
                if reason.is_logged() {
                    dirty |= rule.record(RunLogEntry {
                        at: now,
                        run_date,
                        status: RunStatus::Skipped,
                        journal_id: None,
                        detail: Some(reason.detail()),
                    });
                }
                if dirty {
                    self.persist(&mut rule, expected, now).await?;
                }
            }
            tracing::debug!(%run_date, reason = %reason.detail(), code = SCHEDULE_SKIPPED, "Recurring rule skipped");
            return Ok(RunOutcome::Skipped { run_date, reason });
        }

        let event = rule
            .template
            .materialize(rule.tenant_id, rule.id, run_date, rule.options.due_days);

        if dry_run {
            return Ok(match self.writer.preview(&event).await {
                Ok(preview) => RunOutcome::Previewed { run_date, preview },
                Err(error) => RunOutcome::Failed { run_date, error },
            });
        }

        match self.writer.post(event).await {
            Ok(result) => {
                rule.last_run_at = Some(now);
                match advance(rule.next_run_at, rule.cadence, &rule.options, tz) {
                    Some(next) => {
                        rule.next_run_at = next;
                        if rule
                            .end_date
                            .is_some_and(|end| local_date(next, rule.cadence, tz) > end)
                        {
                            rule.is_active = false;
                        }
                    }
                    None => rule.is_active = false,
                }
                rule.record(RunLogEntry {
                    at: now,
                    run_date,
                    status: RunStatus::Committed,
                    journal_id: Some(result.journal_id),
                    detail: result.is_existing.then(|| "already posted".to_string()),
                });
                self.persist(&mut rule, expected, now).await?;

                tracing::info!(
                    %run_date,
                    journal_id = %result.journal_id,
                    is_existing = result.is_existing,
                    next_run_at = %rule.next_run_at,
                    active = rule.is_active,
                    "Recurring rule ran"
                );
                Ok(RunOutcome::Committed {
                    run_date,
                    result,
                    next_run_at: rule.next_run_at,
                    deactivated: !rule.is_active,
                })
            }
            Err(error) => {
                tracing::warn!(%run_date, error = %error, code = error.error_code(), "Recurring rule failed");
                rule.record(RunLogEntry {
                    at: now,
                    run_date,
                    status: RunStatus::Failed,
                    journal_id: None,
                    detail: Some(error.to_string()),
                });
                self.persist(&mut rule, expected, now).await?;
                Ok(RunOutcome::Failed { run_date, error })
            }
        }
    }

    async fn load(&self, rule_id: RecurringRuleId) -> Result<RecurringRule, SchedulerError> {
        self.rules
            .get(rule_id)
            .await?
            .ok_or(SchedulerError::RuleNotFound(rule_id))
    }

    async fn persist(
        &self,
        rule: &mut RecurringRule,
        expected: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<(), SchedulerError> {
        rule.updated_at = now;
        self.rules.save(rule, expected).await?;
        Ok(())
    }

    async fn time_zone(&self, tenant_id: TenantId) -> Result<Option<Tz>, StoreError> {
        Ok(self.ledger.tenant_profile(tenant_id).await?.time_zone)
    }

    fn lock_for(&self, rule_id: RecurringRuleId) -> Arc<Mutex<()>> {
        Arc::clone(&self.locks.entry(rule_id).or_default())
    }
}

fn skip_reason(
    rule: &RecurringRule,
    mode: Mode,
    now: DateTime<Utc>,
    today: NaiveDate,
    run_date: NaiveDate,
    tz: Option<Tz>,
) -> Option<SkipReason> {
    if mode == Mode::Sweep {
        if rule.next_run_at > now {
            return Some(SkipReason::NotDue);
        }
        // Catch-up of a prior day is allowed; a second run for today is not.
        let ran_today = rule
            .last_run_at
            .is_some_and(|last| local_date(last, rule.cadence, tz) == today);
        if ran_today && run_date >= today {
            return Some(SkipReason::RanToday);
        }
    }
    if let Some(until) = rule.options.pause_until
        && today < until
    {
        return Some(SkipReason::Paused { until });
    }
    if let Some(end_date) = rule.end_date
        && run_date > end_date
    {
        return Some(SkipReason::PastEndDate { end_date });
    }
    None
}

fn out_of_range() -> SchedulerError {
    SchedulerError::InvalidRule(vec![FieldError::new(
        "start_date",
        "schedule is outside the supported date range",
    )])
}
