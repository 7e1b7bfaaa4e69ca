//! `SeaORM` Entity for ledger_entries table.

use sea_orm::Set;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use tally_core::ledger::{LedgerEntry, Side, StoreError};
use tally_shared::types::{AccountId, EntryId, JournalId, TenantId};

use crate::error::corrupt;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "ledger_entries")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub journal_id: Uuid,
    pub tenant_id: Uuid,
    pub line_no: i32,
    pub account_id: Uuid,
    pub account_code: String,
    pub side: String,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub amount: Decimal,
    pub description: Option<String>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::journals::Entity",
        from = "Column::JournalId",
        to = "super::journals::Column::Id"
    )]
    Journals,
    #[sea_orm(
        belongs_to = "super::accounts::Entity",
        from = "Column::AccountId",
        to = "super::accounts::Column::Id"
    )]
    Accounts,
}

impl Related<super::journals::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Journals.def()
    }
}

impl Related<super::accounts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Accounts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Converts the row into a ledger entry.
    pub fn into_entry(self) -> Result<LedgerEntry, StoreError> {
        let side = self
            .side
            .parse::<Side>()
            .map_err(|e| corrupt("ledger_entries.side", e))?;
        Ok(LedgerEntry {
            id: EntryId::from_uuid(self.id),
            journal_id: JournalId::from_uuid(self.journal_id),
            account_id: AccountId::from_uuid(self.account_id),
            account_code: self.account_code,
            side,
            amount: self.amount,
            description: self.description,
        })
    }

    /// Active model for entry `line_no` of a journal.
    pub fn active(
        tenant_id: TenantId,
        line_no: i32,
        entry: &LedgerEntry,
        created_at: DateTimeWithTimeZone,
    ) -> ActiveModel {
        ActiveModel {
            id: Set(entry.id.into_inner()),
            journal_id: Set(entry.journal_id.into_inner()),
            tenant_id: Set(tenant_id.into_inner()),
            line_no: Set(line_no),
            account_id: Set(entry.account_id.into_inner()),
            account_code: Set(entry.account_code.clone()),
            side: Set(entry.side.as_str().to_string()),
            amount: Set(entry.amount),
            description: Set(entry.description.clone()),
            created_at: Set(created_at),
        }
    }
}
