//! `SeaORM` Entity for tenant_profiles table.

use chrono::Utc;
use chrono_tz::Tz;
use sea_orm::Set;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use tally_core::chart::{TaxRegime, TenantProfile};
use tally_core::ledger::StoreError;
use tally_shared::types::TenantId;

use crate::error::corrupt;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "tenant_profiles")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub tenant_id: Uuid,
    pub tax_regime: String,
    pub time_zone: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Converts the row into the domain profile.
    pub fn into_profile(self) -> Result<TenantProfile, StoreError> {
        let time_zone = self
            .time_zone
            .map(|name| {
                name.parse::<Tz>()
                    .map_err(|e| corrupt("tenant_profiles.time_zone", e))
            })
            .transpose()?;
        Ok(TenantProfile {
            tenant_id: TenantId::from_uuid(self.tenant_id),
            tax_regime: TaxRegime::parse_or_default(&self.tax_regime),
            time_zone,
        })
    }
}

impl From<&TenantProfile> for ActiveModel {
    fn from(profile: &TenantProfile) -> Self {
        let now = Utc::now().fixed_offset();
        Self {
            tenant_id: Set(profile.tenant_id.into_inner()),
            tax_regime: Set(profile.tax_regime.as_str().to_string()),
            time_zone: Set(profile.time_zone.map(|tz| tz.name().to_string())),
            created_at: Set(now),
            updated_at: Set(now),
        }
    }
}
