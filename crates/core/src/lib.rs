//! Core posting engine for Tally.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! Persistence goes through the store traits in `ledger`, `schedule` and
//! `depreciation`; in-memory implementations live next to them.
//!
//! # Modules
//!
//! - `calendar` - Month arithmetic with explicit clamping
//! - `chart` - Chart of accounts, tenant profiles and system accounts
//! - `resolver` - Which account a transaction line should hit
//! - `posting` - Events and the pure builders turning them into entries
//! - `inventory` - FIFO lot ledger
//! - `ledger` - Journals, invariants and the idempotent ledger writer
//! - `depreciation` - Straight-line depreciation and its batch runner
//! - `schedule` - Recurring rules and the scheduler

pub mod calendar;
pub mod chart;
pub mod depreciation;
pub mod inventory;
pub mod ledger;
pub mod posting;
pub mod resolver;
pub mod schedule;
