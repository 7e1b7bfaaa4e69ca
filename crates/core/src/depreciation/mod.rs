//! Straight-line depreciation of fixed assets.
//!
//! - [`Asset`]: the depreciable record and its terminal state
//! - [`straight_line_charge`]: the monthly charge, clamped to what is left
//! - [`runner`]: the batch job feeding the ledger writer

pub mod runner;

use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tally_shared::types::money::{DEPRECIATION_EPSILON, round_cents};
use tally_shared::types::{AssetId, TenantId};

use crate::calendar::YearMonth;

pub use runner::{AssetStore, DepreciationReport, DepreciationRunner};

/// Depreciation method. Only straight-line is supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DepreciationMethod {
    /// Equal monthly charges over the useful life.
    #[default]
    StraightLine,
}

impl DepreciationMethod {
    /// Storage name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::StraightLine => "straight_line",
        }
    }
}

impl FromStr for DepreciationMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "straight_line" => Ok(Self::StraightLine),
            _ => Err(format!("Unknown depreciation method: {s}")),
        }
    }
}

/// Lifecycle of a depreciable asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetStatus {
    /// Still being depreciated.
    Active,
    /// Terminal: nothing left to depreciate.
    FullyDepreciated,
}

impl AssetStatus {
    /// Storage name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::FullyDepreciated => "fully_depreciated",
        }
    }
}

impl FromStr for AssetStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "fully_depreciated" => Ok(Self::FullyDepreciated),
            _ => Err(format!("Unknown asset status: {s}")),
        }
    }
}

/// A fixed asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    /// Unique identifier.
    pub id: AssetId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Display name.
    pub name: String,
    /// Optional asset category.
    pub category: Option<String>,
    /// Acquisition cost.
    pub cost: Decimal,
    /// Value left at the end of the useful life, at most `cost`.
    pub residual_value: Decimal,
    /// Useful life in months.
    pub useful_life_months: u32,
    /// Method.
    pub method: DepreciationMethod,
    /// Depreciation posted so far.
    pub accumulated_depreciation: Decimal,
    /// Lifecycle state.
    pub status: AssetStatus,
    /// Date of the next charge.
    pub next_run_on: NaiveDate,
    /// Day of month the schedule keeps, clamped in shorter months.
    pub schedule_day: u32,
}

impl Asset {
    /// Depreciable base not yet charged.
    #[must_use]
    pub fn remaining_base(&self) -> Decimal {
        self.cost - self.residual_value - self.accumulated_depreciation
    }

    /// Returns true once the remaining base is within the terminal threshold.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.remaining_base() <= DEPRECIATION_EPSILON
    }

    /// Records a posted charge and moves the schedule forward.
    ///
    /// The asset becomes fully depreciated when nothing is left; the
    /// next run date is then left unchanged.
    pub fn apply_charge(&mut self, charge: Decimal) {
        self.accumulated_depreciation += charge;
        if self.is_exhausted() {
            self.status = AssetStatus::FullyDepreciated;
        } else if let Some(next) = next_run_on(self.next_run_on, self.schedule_day) {
            self.next_run_on = next;
        }
    }
}

/// Monthly straight-line charge, clamped to the remaining base.
///
/// Returns zero for an exhausted asset or a zero useful life.
#[must_use]
pub fn straight_line_charge(asset: &Asset) -> Decimal {
    if asset.useful_life_months == 0 || asset.is_exhausted() {
        return Decimal::ZERO;
    }
    let monthly = round_cents(
        (asset.cost - asset.residual_value) / Decimal::from(asset.useful_life_months),
    );
    monthly.min(round_cents(asset.remaining_base())).max(Decimal::ZERO)
}

/// `schedule_day` of the month after `date`, clamped to that month's length.
///
/// A schedule on the 31st runs Jan 31, Feb 28, Mar 31.
#[must_use]
pub fn next_run_on(date: NaiveDate, schedule_day: u32) -> Option<NaiveDate> {
    YearMonth::of(date).next().day(schedule_day)
}
