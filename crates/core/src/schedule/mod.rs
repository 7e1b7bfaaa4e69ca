//! Recurring transactions: calendar rules that turn a template into a
//! posting on each scheduled date.
//!
//! A rule is `ACTIVE`, `PAUSED` or `DEACTIVATED`:
//! - explicit pause sets `is_active = false`; lifted by [`RecurringScheduler::resume`]
//!   or once today reaches `options.resume_on`
//! - soft pause (`options.pause_until`) skips runs without touching `is_active`
//! - a run date past `end_date` deactivates the rule
//!
//! Runs are keyed `REC-{ruleId}-{YYYYMMDD}`, so a rule never posts the same
//! date twice even when two sweeps race.

pub mod cadence;
pub mod error;
pub mod rule;
pub mod scheduler;
pub mod store;
pub mod template;

#[cfg(test)]
mod cadence_props;
#[cfg(test)]
mod scheduler_tests;

pub use cadence::{advance, advance_date, first_run_date};
pub use error::SchedulerError;
pub use rule::{Cadence, NewRule, RecurringRule, RuleKind, RuleOptions, RuleUpdate, RunLogEntry, RunStatus};
pub use scheduler::{RecurringScheduler, RunOutcome, SchedulerSettings, SkipReason, SweepReport};
pub use store::{MemoryRuleStore, RuleStore, TenantScope};
pub use template::{ExpenseTemplate, InvoiceTemplate, PayloadTemplate};
