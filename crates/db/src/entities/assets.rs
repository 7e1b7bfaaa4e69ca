//! `SeaORM` Entity for assets table.

use chrono::Utc;
use sea_orm::Set;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use tally_core::depreciation::{Asset, AssetStatus, DepreciationMethod};
use tally_core::ledger::StoreError;
use tally_shared::types::{AssetId, TenantId};

use crate::error::corrupt;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "assets")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub category: Option<String>,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub cost: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub residual_value: Decimal,
    pub useful_life_months: i32,
    pub method: String,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub accumulated_depreciation: Decimal,
    pub status: String,
    pub next_run_on: Date,
    pub schedule_day: i16,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Converts the row into the domain asset.
    pub fn into_asset(self) -> Result<Asset, StoreError> {
        let useful_life_months = u32::try_from(self.useful_life_months)
            .map_err(|e| corrupt("assets.useful_life_months", e))?;
        let method = self
            .method
            .parse::<DepreciationMethod>()
            .map_err(|e| corrupt("assets.method", e))?;
        let schedule_day =
            u32::try_from(self.schedule_day).map_err(|e| corrupt("assets.schedule_day", e))?;
        let status = self
            .status
            .parse::<AssetStatus>()
            .map_err(|e| corrupt("assets.status", e))?;
        Ok(Asset {
            id: AssetId::from_uuid(self.id),
            tenant_id: TenantId::from_uuid(self.tenant_id),
            name: self.name,
            category: self.category,
            cost: self.cost,
            residual_value: self.residual_value,
            useful_life_months,
            method,
            accumulated_depreciation: self.accumulated_depreciation,
            status,
            next_run_on: self.next_run_on,
            schedule_day,
        })
    }
}

impl TryFrom<&Asset> for ActiveModel {
    type Error = StoreError;

    fn try_from(asset: &Asset) -> Result<Self, Self::Error> {
        let useful_life_months = i32::try_from(asset.useful_life_months)
            .map_err(|e| corrupt("assets.useful_life_months", e))?;
        let schedule_day =
            i16::try_from(asset.schedule_day).map_err(|e| corrupt("assets.schedule_day", e))?;
        let now = Utc::now().fixed_offset();
        Ok(Self {
            id: Set(asset.id.into_inner()),
            tenant_id: Set(asset.tenant_id.into_inner()),
            name: Set(asset.name.clone()),
            category: Set(asset.category.clone()),
            cost: Set(asset.cost),
            residual_value: Set(asset.residual_value),
            useful_life_months: Set(useful_life_months),
            method: Set(asset.method.as_str().to_string()),
            accumulated_depreciation: Set(asset.accumulated_depreciation),
            status: Set(asset.status.as_str().to_string()),
            next_run_on: Set(asset.next_run_on),
            schedule_day: Set(schedule_day),
            created_at: Set(now),
            updated_at: Set(now),
        })
    }
}
