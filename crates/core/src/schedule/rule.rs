//! Recurring rule domain types.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc, Weekday};
use serde::{Deserialize, Serialize};
use tally_shared::types::{JournalId, RecurringRuleId, TenantId};

use super::template::PayloadTemplate;
use crate::ledger::error::FieldError;

/// Maximum number of run-log entries kept per rule.
pub const RUN_LOG_CAPACITY: usize = 20;

/// Recurrence family of a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cadence {
    /// Every day.
    Daily,
    /// Every week, or every `interval_weeks` weeks.
    Weekly,
    /// Every month.
    Monthly,
    /// Every year on the same month and day.
    Annual,
}

impl Cadence {
    /// Storage name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Annual => "annual",
        }
    }

    /// Parses a storage name.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "daily" => Some(Self::Daily),
            "weekly" => Some(Self::Weekly),
            "monthly" => Some(Self::Monthly),
            "annual" | "yearly" => Some(Self::Annual),
            _ => None,
        }
    }
}

impl fmt::Display for Cadence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which business event a rule produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    /// Expense bill.
    Expense,
    /// Customer invoice.
    Invoice,
}

/// Cadence refinements and pause settings.
///
/// Monthly precedence: `end_of_month`, then `day_of_month`, then
/// `nth_week` + `nth_weekday`, then the same day next month.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleOptions {
    /// Monthly: fixed day, clamped to the month length.
    pub day_of_month: Option<u32>,
    /// Weekly: run on this weekday.
    pub weekday: Option<Weekday>,
    /// Monthly: which occurrence of `nth_weekday` (1-5).
    pub nth_week: Option<u32>,
    /// Monthly: weekday for `nth_week`.
    pub nth_weekday: Option<Weekday>,
    /// Monthly: last calendar day.
    pub end_of_month: bool,
    /// Accepted for compatibility; daily rules always step one day.
    pub interval_days: Option<u32>,
    /// Weekly without a weekday: step this many weeks.
    pub interval_weeks: Option<u32>,
    /// Soft pause: skipped while today is before this date.
    pub pause_until: Option<NaiveDate>,
    /// Explicit pause: reactivated once today reaches this date.
    pub resume_on: Option<NaiveDate>,
    /// Due date offset, in days after the run date.
    pub due_days: Option<u32>,
}

/// Outcome recorded in a rule's run log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Journal posted (or already present).
    Committed,
    /// Posting failed; the rule did not advance.
    Failed,
    /// Pause window or end date.
    Skipped,
    /// Dry run. Never persisted.
    Previewed,
}

/// One run-log record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunLogEntry {
    /// When the run happened.
    pub at: DateTime<Utc>,
    /// Scheduled date the run was for.
    pub run_date: NaiveDate,
    /// Outcome.
    pub status: RunStatus,
    /// Posted journal, for commits.
    #[serde(default)]
    pub journal_id: Option<JournalId>,
    /// Error or skip detail.
    #[serde(default)]
    pub detail: Option<String>,
}

/// A calendar rule bound to a posting template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurringRule {
    /// Unique identifier.
    pub id: RecurringRuleId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Display name.
    pub name: String,
    /// Recurrence family.
    pub cadence: Cadence,
    /// First possible run date.
    pub start_date: NaiveDate,
    /// Last possible run date.
    pub end_date: Option<NaiveDate>,
    /// Cadence refinements and pause settings.
    pub options: RuleOptions,
    /// Instant of the next scheduled run (midnight of the run date).
    pub next_run_at: DateTime<Utc>,
    /// Instant of the last committed run.
    pub last_run_at: Option<DateTime<Utc>>,
    /// False when paused explicitly or deactivated past the end date.
    pub is_active: bool,
    /// Event produced on each run.
    pub template: PayloadTemplate,
    /// Newest last, at most [`RUN_LOG_CAPACITY`] entries.
    pub run_log: Vec<RunLogEntry>,
    /// Creation instant.
    pub created_at: DateTime<Utc>,
    /// Last modification instant.
    pub updated_at: DateTime<Utc>,
}

impl RecurringRule {
    /// The event kind this rule produces.
    #[must_use]
    pub const fn kind(&self) -> RuleKind {
        self.template.kind()
    }

    /// Appends a run-log entry, dropping the oldest beyond capacity.
    ///
    /// A skip repeating the newest entry (same status, run date, detail
    /// and day) is not recorded again. Returns whether the log changed.
    pub fn record(&mut self, entry: RunLogEntry) -> bool {
        if entry.status == RunStatus::Skipped
            && self.run_log.last().is_some_and(|last| {
                last.status == RunStatus::Skipped
                    && last.run_date == entry.run_date
                    && last.detail == entry.detail
                    && last.at.date_naive() == entry.at.date_naive()
            })
        {
            return false;
        }
        self.run_log.push(entry);
        if self.run_log.len() > RUN_LOG_CAPACITY {
            let excess = self.run_log.len() - RUN_LOG_CAPACITY;
            self.run_log.drain(..excess);
        }
        true
    }

    /// Run date of the most recent commit in the log.
    #[must_use]
    pub fn last_committed_run(&self) -> Option<NaiveDate> {
        self.run_log
            .iter()
            .rev()
            .find(|e| e.status == RunStatus::Committed)
            .map(|e| e.run_date)
    }
}

/// Input for creating a rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRule {
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Display name.
    pub name: String,
    /// Recurrence family.
    pub cadence: Cadence,
    /// First possible run date.
    pub start_date: NaiveDate,
    /// Last possible run date.
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    /// Cadence refinements.
    #[serde(default)]
    pub options: RuleOptions,
    /// Event produced on each run.
    pub template: PayloadTemplate,
}

/// Partial update of a rule. `None` leaves a field unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleUpdate {
    /// New name.
    pub name: Option<String>,
    /// New cadence.
    pub cadence: Option<Cadence>,
    /// New end date; `Some(None)` clears it.
    pub end_date: Option<Option<NaiveDate>>,
    /// Replacement options.
    pub options: Option<RuleOptions>,
    /// Replacement template.
    pub template: Option<PayloadTemplate>,
}

impl RuleUpdate {
    /// Returns true if the update changes when the rule runs.
    #[must_use]
    pub const fn reschedules(&self) -> bool {
        self.cadence.is_some() || self.options.is_some()
    }
}

/// Field-level checks shared by create and update.
#[must_use]
pub fn validate_rule(
    name: &str,
    start_date: NaiveDate,
    end_date: Option<NaiveDate>,
    options: &RuleOptions,
    template: &PayloadTemplate,
) -> Vec<FieldError> {
    let mut errors = Vec::new();

    if name.trim().is_empty() {
        errors.push(FieldError::new("name", "must not be empty"));
    }
    if end_date.is_some_and(|end| end < start_date) {
        errors.push(FieldError::new("end_date", "must not be before start_date"));
    }
    if options.day_of_month.is_some_and(|d| !(1..=31).contains(&d)) {
        errors.push(FieldError::new("options.day_of_month", "must be between 1 and 31"));
    }
    if options.nth_week.is_some_and(|n| !(1..=5).contains(&n)) {
        errors.push(FieldError::new("options.nth_week", "must be between 1 and 5"));
    }
    if options.nth_week.is_some() != options.nth_weekday.is_some() {
        errors.push(FieldError::new(
            "options.nth_weekday",
            "nth_week and nth_weekday must be set together",
        ));
    }
    if options.interval_weeks == Some(0) {
        errors.push(FieldError::new("options.interval_weeks", "must be at least 1"));
    }
    if options.interval_days == Some(0) {
        errors.push(FieldError::new("options.interval_days", "must be at least 1"));
    }
    errors.extend(template.validate());

    errors
}
