//! `SeaORM` Entity for accounts table.

use chrono::Utc;
use sea_orm::Set;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use tally_core::chart::{Account, AccountType};
use tally_core::ledger::{Side, StoreError};
use tally_shared::types::{AccountId, TenantId};

use crate::error::corrupt;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "accounts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub code: String,
    pub name: String,
    pub account_type: String,
    pub normal_balance: String,
    pub parent_code: Option<String>,
    pub is_active: bool,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::ledger_entries::Entity")]
    LedgerEntries,
}

impl Related<super::ledger_entries::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::LedgerEntries.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Converts the row into a chart account.
    pub fn into_account(self) -> Result<Account, StoreError> {
        let account_type = self
            .account_type
            .parse::<AccountType>()
            .map_err(|e| corrupt("accounts.account_type", e))?;
        let normal_balance = self
            .normal_balance
            .parse::<Side>()
            .map_err(|e| corrupt("accounts.normal_balance", e))?;
        Ok(Account {
            id: AccountId::from_uuid(self.id),
            tenant_id: TenantId::from_uuid(self.tenant_id),
            code: self.code,
            name: self.name,
            account_type,
            normal_balance,
            parent_code: self.parent_code,
            is_active: self.is_active,
        })
    }
}

impl From<&Account> for ActiveModel {
    fn from(account: &Account) -> Self {
        let now = Utc::now().fixed_offset();
        Self {
            id: Set(account.id.into_inner()),
            tenant_id: Set(account.tenant_id.into_inner()),
            code: Set(account.code.clone()),
            name: Set(account.name.clone()),
            account_type: Set(account.account_type.as_str().to_string()),
            normal_balance: Set(account.normal_balance.as_str().to_string()),
            parent_code: Set(account.parent_code.clone()),
            is_active: Set(account.is_active),
            created_at: Set(now),
            updated_at: Set(now),
        }
    }
}
