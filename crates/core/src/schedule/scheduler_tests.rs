//! Recurring scheduler tests against the in-memory stores.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, TimeZone, Utc, Weekday};
use chrono_tz::Tz;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tally_shared::types::TenantId;

use super::error::SchedulerError;
use super::rule::{Cadence, NewRule, RuleOptions, RuleUpdate, RunStatus};
use super::scheduler::{RecurringScheduler, RunOutcome, SchedulerSettings, SkipReason};
use super::store::{MemoryRuleStore, RuleStore, TenantScope};
use super::template::{ExpenseTemplate, PayloadTemplate};
use crate::chart::{PostingAccounts, TaxRegime, TenantProfile, codes};
use crate::ledger::MemoryLedgerStore;
use crate::ledger::types::Side;
use crate::ledger::writer::LedgerWriter;
use crate::posting::events::TaxSettings;
use crate::resolver::AccountResolver;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
}

struct Fixture {
    tenant: TenantId,
    ledger: MemoryLedgerStore,
    rules: MemoryRuleStore,
    scheduler: RecurringScheduler,
}

async fn fixture() -> Fixture {
    let tenant = TenantId::new();
    let ledger = MemoryLedgerStore::with_standard_chart(tenant).await;
    let rules = MemoryRuleStore::new();
    let scheduler = scheduler_over(&ledger, &rules);
    Fixture {
        tenant,
        ledger,
        rules,
        scheduler,
    }
}

fn scheduler_over(ledger: &MemoryLedgerStore, rules: &MemoryRuleStore) -> RecurringScheduler {
    let accounts = PostingAccounts::default();
    let resolver = Arc::new(AccountResolver::standard(&accounts, None));
    let writer = Arc::new(LedgerWriter::new(Arc::new(ledger.clone()), resolver, accounts));
    RecurringScheduler::new(
        Arc::new(rules.clone()),
        Arc::new(ledger.clone()),
        writer,
        SchedulerSettings::default(),
    )
}

fn office_supplies() -> PayloadTemplate {
    let mut template = ExpenseTemplate::new("Acme", dec!(100));
    template.category_key = Some("OFFICE_SUPPLIES".into());
    PayloadTemplate::Expense(template)
}

fn rule(tenant: TenantId, cadence: Cadence, start: NaiveDate, options: RuleOptions) -> NewRule {
    NewRule {
        tenant_id: tenant,
        name: "Office supplies".into(),
        cadence,
        start_date: start,
        end_date: None,
        options,
        template: office_supplies(),
    }
}

fn end_of_month() -> RuleOptions {
    RuleOptions {
        end_of_month: true,
        ..RuleOptions::default()
    }
}

fn committed(outcome: &RunOutcome) -> NaiveDate {
    match outcome {
        RunOutcome::Committed { run_date, .. } => *run_date,
        other => panic!("expected a commit, got {other:?}"),
    }
}

fn skipped(outcome: &RunOutcome) -> &SkipReason {
    match outcome {
        RunOutcome::Skipped { reason, .. } => reason,
        other => panic!("expected a skip, got {other:?}"),
    }
}

#[tokio::test]
async fn test_end_of_month_rule_runs_three_times() {
    let f = fixture().await;
    let created = f
        .scheduler
        .create_rule(rule(f.tenant, Cadence::Monthly, date(2025, 1, 31), end_of_month()), at(2025, 1, 31, 10, 0))
        .await
        .unwrap();
    assert_eq!(created.next_run_at, at(2025, 2, 28, 0, 0));

    let mut run_dates = Vec::new();
    for _ in 0..3 {
        let outcome = f.scheduler.run_one(created.id, false, at(2025, 5, 1, 9, 0)).await.unwrap();
        run_dates.push(committed(&outcome));
    }

    assert_eq!(run_dates, vec![date(2025, 2, 28), date(2025, 3, 31), date(2025, 4, 30)]);
    let journals = f.ledger.journals(f.tenant).await;
    let dates: Vec<NaiveDate> = journals.iter().map(|j| j.date).collect();
    assert_eq!(dates, run_dates);
    assert_eq!(journals[0].reference, format!("REC-{}-20250228", created.id));

    let rule = f.scheduler.rule(created.id).await.unwrap();
    assert_eq!(rule.next_run_at, at(2025, 5, 31, 0, 0));
    assert_eq!(rule.run_log.len(), 3);
    assert!(rule.run_log.iter().all(|e| e.status == RunStatus::Committed));
}

#[tokio::test]
async fn test_sweep_catches_up_but_never_twice_for_today() {
    let f = fixture().await;
    let created = f
        .scheduler
        .create_rule(rule(f.tenant, Cadence::Daily, date(2025, 3, 7), RuleOptions::default()), at(2025, 3, 8, 12, 0))
        .await
        .unwrap();
    assert_eq!(created.next_run_at, at(2025, 3, 8, 0, 0));

    // Two days behind on the morning of the 10th.
    let now = at(2025, 3, 10, 8, 0);
    let first = f.scheduler.run_due(TenantScope::All, now).await.unwrap();
    let second = f.scheduler.run_due(TenantScope::All, now).await.unwrap();
    let third = f.scheduler.run_due(TenantScope::All, now).await.unwrap();

    // The 8th and 9th are catch-ups; the 10th waits for the next day.
    assert_eq!((first.committed, second.committed, third.committed), (1, 1, 0));
    assert_eq!(third.skipped, 1);
    let outcome = f.scheduler.run_one(created.id, true, now).await.unwrap();
    assert!(matches!(outcome, RunOutcome::Previewed { run_date, .. } if run_date == date(2025, 3, 10)));

    let next_day = f.scheduler.run_due(TenantScope::All, at(2025, 3, 11, 0, 30)).await.unwrap();
    assert_eq!(next_day.committed, 1);
    assert_eq!(f.ledger.journals(f.tenant).await.len(), 3);
}

#[tokio::test]
async fn test_rule_not_due_is_left_alone() {
    let f = fixture().await;
    let created = f
        .scheduler
        .create_rule(rule(f.tenant, Cadence::Monthly, date(2025, 1, 31), end_of_month()), at(2025, 1, 31, 10, 0))
        .await
        .unwrap();

    let report = f.scheduler.run_due(TenantScope::All, at(2025, 2, 27, 23, 59)).await.unwrap();

    assert_eq!(report.considered, 0);
    assert!(f.ledger.journals(f.tenant).await.is_empty());
    assert_eq!(f.scheduler.rule(created.id).await.unwrap(), created);
}

#[tokio::test]
async fn test_soft_pause_skips_until_its_date() {
    let f = fixture().await;
    let options = RuleOptions {
        pause_until: Some(date(2025, 3, 15)),
        ..RuleOptions::default()
    };
    let created = f
        .scheduler
        .create_rule(rule(f.tenant, Cadence::Daily, date(2025, 3, 9), options), at(2025, 3, 10, 0, 0))
        .await
        .unwrap();

    for hour in [6, 12, 18] {
        let report = f.scheduler.run_due(TenantScope::All, at(2025, 3, 10, hour, 0)).await.unwrap();
        assert_eq!(report.skipped, 1);
    }
    let rule = f.scheduler.rule(created.id).await.unwrap();
    assert_eq!(rule.next_run_at, created.next_run_at);
    assert!(rule.is_active);
    // The same skip is logged once per day.
    assert_eq!(rule.run_log.len(), 1);
    assert_eq!(rule.run_log[0].status, RunStatus::Skipped);
    assert_eq!(rule.run_log[0].detail.as_deref(), Some("paused until 2025-03-15"));

    // Lifts on the date itself.
    let report = f.scheduler.run_due(TenantScope::All, at(2025, 3, 15, 1, 0)).await.unwrap();
    assert_eq!(report.committed, 1);
    assert_eq!(f.ledger.journals(f.tenant).await[0].date, date(2025, 3, 10));
}

#[tokio::test]
async fn test_explicit_pause_resumes_on_date() {
    let f = fixture().await;
    let created = f
        .scheduler
        .create_rule(rule(f.tenant, Cadence::Daily, date(2025, 3, 9), RuleOptions::default()), at(2025, 3, 10, 0, 0))
        .await
        .unwrap();
    let paused = f
        .scheduler
        .pause(created.id, Some(date(2025, 3, 12)), at(2025, 3, 10, 0, 0))
        .await
        .unwrap();
    assert!(!paused.is_active);

    let report = f.scheduler.run_due(TenantScope::All, at(2025, 3, 11, 9, 0)).await.unwrap();
    assert_eq!(report.committed, 0);
    let outcome = f.scheduler.run_one(created.id, false, at(2025, 3, 11, 9, 0)).await.unwrap();
    assert_eq!(skipped(&outcome), &SkipReason::Inactive);

    let report = f.scheduler.run_due(TenantScope::All, at(2025, 3, 12, 9, 0)).await.unwrap();
    assert_eq!(report.committed, 1);
    let rule = f.scheduler.rule(created.id).await.unwrap();
    assert!(rule.is_active);
    assert_eq!(rule.options.resume_on, None);
}

#[tokio::test]
async fn test_pause_without_date_needs_resume() {
    let f = fixture().await;
    let created = f
        .scheduler
        .create_rule(rule(f.tenant, Cadence::Daily, date(2025, 3, 9), RuleOptions::default()), at(2025, 3, 10, 0, 0))
        .await
        .unwrap();
    f.scheduler.pause(created.id, None, at(2025, 3, 10, 0, 0)).await.unwrap();

    let report = f.scheduler.run_due(TenantScope::All, at(2026, 1, 1, 0, 0)).await.unwrap();
    assert_eq!(report.considered, 0);

    f.scheduler.resume(created.id, at(2026, 1, 1, 0, 0)).await.unwrap();
    let report = f.scheduler.run_due(TenantScope::All, at(2026, 1, 1, 0, 0)).await.unwrap();
    assert_eq!(report.committed, 1);
}

#[tokio::test]
async fn test_end_date_deactivates() {
    let f = fixture().await;
    let mut new_rule = rule(f.tenant, Cadence::Monthly, date(2025, 1, 15), RuleOptions::default());
    new_rule.end_date = Some(date(2025, 3, 20));
    let created = f.scheduler.create_rule(new_rule, at(2025, 1, 1, 0, 0)).await.unwrap();
    assert_eq!(created.next_run_at, at(2025, 1, 15, 0, 0));

    let now = at(2025, 6, 1, 0, 0);
    let mut last = None;
    for _ in 0..3 {
        last = Some(f.scheduler.run_one(created.id, false, now).await.unwrap());
    }
    match last.unwrap() {
        RunOutcome::Committed { run_date, deactivated, .. } => {
            assert_eq!(run_date, date(2025, 3, 15));
            assert!(deactivated);
        }
        other => panic!("expected a commit, got {other:?}"),
    }

    let outcome = f.scheduler.run_one(created.id, false, now).await.unwrap();
    assert_eq!(skipped(&outcome), &SkipReason::Inactive);
    assert_eq!(f.ledger.journals(f.tenant).await.len(), 3);
}

#[tokio::test]
async fn test_run_date_past_end_is_skipped_and_deactivated() {
    let f = fixture().await;
    let mut new_rule = rule(f.tenant, Cadence::Monthly, date(2025, 1, 31), end_of_month());
    new_rule.end_date = Some(date(2025, 2, 10));
    let created = f.scheduler.create_rule(new_rule, at(2025, 1, 31, 0, 0)).await.unwrap();

    let outcome = f.scheduler.run_one(created.id, false, at(2025, 3, 1, 0, 0)).await.unwrap();

    assert_eq!(skipped(&outcome), &SkipReason::PastEndDate { end_date: date(2025, 2, 10) });
    let rule = f.scheduler.rule(created.id).await.unwrap();
    assert!(!rule.is_active);
    assert_eq!(rule.run_log.len(), 1);
    assert!(f.ledger.journals(f.tenant).await.is_empty());
}

#[tokio::test]
async fn test_dry_run_matches_commit_and_writes_nothing() {
    let f = fixture().await;
    let template = ExpenseTemplate {
        description: Some("Monthly hosting".into()),
        tax: Some(TaxSettings::Percentage { rate: dec!(8.25) }),
        payment_status: crate::ledger::types::PaymentStatus::Unpaid,
        ..ExpenseTemplate::new("AWS", dec!(108.25))
    };
    let mut new_rule = rule(f.tenant, Cadence::Monthly, date(2025, 1, 31), end_of_month());
    new_rule.template = PayloadTemplate::Expense(template);
    let created = f.scheduler.create_rule(new_rule, at(2025, 1, 31, 0, 0)).await.unwrap();
    let now = at(2025, 3, 1, 0, 0);

    let RunOutcome::Previewed { run_date, preview } = f.scheduler.run_one(created.id, true, now).await.unwrap()
    else {
        panic!("expected a preview");
    };
    assert_eq!(run_date, date(2025, 2, 28));
    assert!(!preview.already_posted);
    assert!(f.ledger.journals(f.tenant).await.is_empty());
    assert_eq!(f.scheduler.rule(created.id).await.unwrap(), created);

    let RunOutcome::Committed { result, .. } = f.scheduler.run_one(created.id, false, now).await.unwrap()
    else {
        panic!("expected a commit");
    };
    let predicted: Vec<(String, Side, Decimal)> = preview
        .entries
        .iter()
        .map(|e| (e.account_code.clone(), e.side, e.amount))
        .collect();
    let posted: Vec<(String, Side, Decimal)> = result
        .entries
        .iter()
        .map(|e| (e.account_code.clone(), e.side, e.amount))
        .collect();
    assert_eq!(predicted, posted);
    assert_eq!(preview.reference, result.reference);
    assert!(posted.contains(&(codes::HOSTING.to_string(), Side::Debit, dec!(100.00))));
    assert!(posted.contains(&(codes::ACCOUNTS_PAYABLE.to_string(), Side::Credit, dec!(108.25))));
}

#[tokio::test]
async fn test_failures_are_isolated_per_rule() {
    let f = fixture().await;
    // A tenant with no chart: every posting fails.
    let orphan = TenantId::new();
    let broken = f
        .scheduler
        .create_rule(rule(orphan, Cadence::Daily, date(2025, 3, 1), RuleOptions::default()), at(2025, 3, 1, 0, 0))
        .await
        .unwrap();
    let healthy = f
        .scheduler
        .create_rule(rule(f.tenant, Cadence::Daily, date(2025, 3, 1), RuleOptions::default()), at(2025, 3, 1, 0, 0))
        .await
        .unwrap();

    let report = f.scheduler.run_due(TenantScope::All, at(2025, 3, 2, 6, 0)).await.unwrap();

    assert_eq!((report.committed, report.failed), (1, 1));
    let broken = f.scheduler.rule(broken.id).await.unwrap();
    assert_eq!(broken.next_run_at, at(2025, 3, 2, 0, 0));
    assert_eq!(broken.run_log.last().unwrap().status, RunStatus::Failed);
    assert_eq!(
        f.scheduler.rule(healthy.id).await.unwrap().next_run_at,
        at(2025, 3, 3, 0, 0)
    );
}

#[tokio::test]
async fn test_tenant_scope() {
    let f = fixture().await;
    let other = TenantId::new();
    f.ledger.seed_chart(other, crate::chart::standard_chart(other)).await;
    for tenant in [f.tenant, other] {
        f.scheduler
            .create_rule(rule(tenant, Cadence::Daily, date(2025, 3, 1), RuleOptions::default()), at(2025, 3, 1, 0, 0))
            .await
            .unwrap();
    }

    let report = f
        .scheduler
        .run_due(TenantScope::Tenant(other), at(2025, 3, 2, 6, 0))
        .await
        .unwrap();

    assert_eq!(report.considered, 1);
    assert_eq!(f.ledger.journals(other).await.len(), 1);
    assert!(f.ledger.journals(f.tenant).await.is_empty());
}

#[tokio::test]
async fn test_concurrent_sweeps_fire_once() {
    let f = fixture().await;
    let created = f
        .scheduler
        .create_rule(rule(f.tenant, Cadence::Daily, date(2025, 3, 9), RuleOptions::default()), at(2025, 3, 10, 0, 0))
        .await
        .unwrap();
    // A second process sharing the stores but not the in-process locks.
    let other = scheduler_over(&f.ledger, &f.rules);
    let now = at(2025, 3, 10, 6, 0);

    let (a, b, c) = tokio::join!(
        f.scheduler.run_due(TenantScope::All, now),
        f.scheduler.run_due(TenantScope::All, now),
        other.run_due(TenantScope::All, now),
    );
    let (a, b, c) = (a.unwrap(), b.unwrap(), c.unwrap());

    assert_eq!(f.ledger.journals(f.tenant).await.len(), 1);
    assert!(a.committed + b.committed + c.committed >= 1);
    let rule = f.rules.get(created.id).await.unwrap().unwrap();
    assert_eq!(rule.next_run_at, at(2025, 3, 11, 0, 0));
}

#[tokio::test]
async fn test_time_zone_aligns_midnight() {
    let f = fixture().await;
    let tz: Tz = "America/New_York".parse().unwrap();
    f.ledger
        .set_profile(TenantProfile {
            tenant_id: f.tenant,
            tax_regime: TaxRegime::SalesTax,
            time_zone: Some(tz),
        })
        .await;
    let created = f
        .scheduler
        .create_rule(rule(f.tenant, Cadence::Monthly, date(2025, 1, 31), end_of_month()), at(2025, 1, 31, 12, 0))
        .await
        .unwrap();
    assert_eq!(created.next_run_at, at(2025, 2, 28, 5, 0));

    // Still the 27th in New York.
    let early = f.scheduler.run_due(TenantScope::All, at(2025, 2, 28, 4, 30)).await.unwrap();
    assert_eq!(early.considered, 0);

    let report = f.scheduler.run_due(TenantScope::All, at(2025, 2, 28, 5, 30)).await.unwrap();
    assert_eq!(report.committed, 1);
    assert_eq!(f.ledger.journals(f.tenant).await[0].date, date(2025, 2, 28));
    // March 31 midnight falls in daylight time.
    assert_eq!(
        f.scheduler.rule(created.id).await.unwrap().next_run_at,
        at(2025, 3, 31, 4, 0)
    );
}

#[tokio::test]
async fn test_update_reschedules() {
    let f = fixture().await;
    let created = f
        .scheduler
        .create_rule(rule(f.tenant, Cadence::Monthly, date(2025, 1, 10), RuleOptions::default()), at(2025, 1, 10, 0, 0))
        .await
        .unwrap();
    assert_eq!(created.next_run_at, at(2025, 2, 10, 0, 0));

    let update = RuleUpdate {
        options: Some(RuleOptions {
            nth_week: Some(3),
            nth_weekday: Some(Weekday::Fri),
            ..RuleOptions::default()
        }),
        ..RuleUpdate::default()
    };
    let updated = f.scheduler.update_rule(created.id, update, at(2025, 1, 12, 0, 0)).await.unwrap();
    assert_eq!(updated.next_run_at, at(2025, 2, 21, 0, 0));

    let renamed = f
        .scheduler
        .update_rule(
            created.id,
            RuleUpdate {
                name: Some("Stationery".into()),
                ..RuleUpdate::default()
            },
            at(2025, 1, 13, 0, 0),
        )
        .await
        .unwrap();
    assert_eq!(renamed.name, "Stationery");
    assert_eq!(renamed.next_run_at, updated.next_run_at);
}

#[tokio::test]
async fn test_invalid_rules_are_rejected() {
    let f = fixture().await;
    let options = RuleOptions {
        nth_week: Some(2),
        ..RuleOptions::default()
    };
    let err = f
        .scheduler
        .create_rule(rule(f.tenant, Cadence::Monthly, date(2025, 1, 1), options), at(2025, 1, 1, 0, 0))
        .await
        .unwrap_err();

    assert!(matches!(&err, SchedulerError::InvalidRule(fields) if fields[0].field == "options.nth_weekday"));
    assert!(f.scheduler.rules(f.tenant).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_delete() {
    let f = fixture().await;
    let created = f
        .scheduler
        .create_rule(rule(f.tenant, Cadence::Daily, date(2025, 3, 9), RuleOptions::default()), at(2025, 3, 10, 0, 0))
        .await
        .unwrap();

    f.scheduler.delete(created.id).await.unwrap();

    assert!(matches!(
        f.scheduler.run_one(created.id, false, at(2025, 3, 10, 1, 0)).await,
        Err(SchedulerError::RuleNotFound(id)) if id == created.id
    ));
    assert!(matches!(
        f.scheduler.delete(created.id).await,
        Err(SchedulerError::RuleNotFound(_))
    ));
}
