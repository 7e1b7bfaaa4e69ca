//! Tenant posting settings.

use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{DatabaseConnection, DbErr, EntityTrait};
use tally_core::chart::TenantProfile;
use tally_core::ledger::StoreError;
use tally_shared::types::TenantId;

use crate::entities::tenant_profiles;
use crate::error::store_error;

/// Reads and writes [`TenantProfile`] rows.
#[derive(Debug, Clone)]
pub struct TenantProfileRepository {
    db: DatabaseConnection,
}

impl TenantProfileRepository {
    /// Creates a new repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// The stored profile, or the defaults when the tenant has none.
    pub async fn get(&self, tenant_id: TenantId) -> Result<TenantProfile, StoreError> {
        match tenant_profiles::Entity::find_by_id(tenant_id.into_inner())
            .one(&self.db)
            .await
            .map_err(store_error)?
        {
            Some(model) => model.into_profile(),
            None => Ok(TenantProfile::default_for(tenant_id)),
        }
    }

    /// Inserts or replaces a tenant's profile.
    pub async fn upsert(&self, profile: &TenantProfile) -> Result<(), DbErr> {
        let mut model = tenant_profiles::ActiveModel::from(profile);
        model.updated_at = sea_orm::Set(Utc::now().fixed_offset());
        tenant_profiles::Entity::insert(model)
            .on_conflict(
                OnConflict::column(tenant_profiles::Column::TenantId)
                    .update_columns([
                        tenant_profiles::Column::TaxRegime,
                        tenant_profiles::Column::TimeZone,
                        tenant_profiles::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;
        Ok(())
    }
}
