//! `SeaORM` Entity for journals table.

use sea_orm::Set;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use tally_core::ledger::{Journal, JournalKind, PostingMetadata, StoreError};
use tally_shared::types::{JournalId, TenantId};

use crate::error::corrupt;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "journals")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub date: Date,
    pub description: String,
    pub reference: String,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub amount: Decimal,
    pub kind: String,
    #[sea_orm(column_type = "JsonBinary")]
    pub metadata: Json,
    pub created_at: DateTimeWithTimeZone,
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
    /// Assembles the journal from its header row and entry rows.
    ///
    /// Entries are expected in `line_no` order.
    pub fn into_journal(
        self,
        entries: Vec<super::ledger_entries::Model>,
    ) -> Result<Journal, StoreError> {
        let kind = self
            .kind
            .parse::<JournalKind>()
            .map_err(|e| corrupt("journals.kind", e))?;
        let metadata: PostingMetadata =
            serde_json::from_value(self.metadata).map_err(|e| corrupt("journals.metadata", e))?;
        let entries = entries
            .into_iter()
            .map(super::ledger_entries::Model::into_entry)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Journal {
            id: JournalId::from_uuid(self.id),
            tenant_id: TenantId::from_uuid(self.tenant_id),
            date: self.date,
            description: self.description,
            reference: self.reference,
            amount: self.amount,
            kind,
            metadata,
            created_at: self.created_at.to_utc(),
            entries,
        })
    }
}

impl TryFrom<&Journal> for ActiveModel {
    type Error = StoreError;

    fn try_from(journal: &Journal) -> Result<Self, Self::Error> {
        let metadata = serde_json::to_value(&journal.metadata)
            .map_err(|e| corrupt("journals.metadata", e))?;
        Ok(Self {
            id: Set(journal.id.into_inner()),
            tenant_id: Set(journal.tenant_id.into_inner()),
            date: Set(journal.date),
            description: Set(journal.description.clone()),
            reference: Set(journal.reference.clone()),
            amount: Set(journal.amount),
            kind: Set(journal.kind.as_str().to_string()),
            metadata: Set(metadata),
            created_at: Set(journal.created_at.fixed_offset()),
        })
    }
}
