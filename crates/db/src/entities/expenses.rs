//! `SeaORM` Entity for expenses table.

use chrono::Utc;
use sea_orm::Set;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use tally_core::ledger::{ExpenseRecord, PaymentStatus, StoreError};
use tally_shared::types::{ExpenseId, JournalId, TenantId};

use crate::error::corrupt;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "expenses")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub journal_id: Uuid,
    pub vendor: String,
    pub description: Option<String>,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub total: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub amount_paid: Decimal,
    pub status: String,
    pub is_refund: bool,
    pub date: Date,
    pub due_date: Option<Date>,
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub tax: Option<Json>,
    #[sea_orm(column_type = "JsonBinary")]
    pub line_items: Json,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::journals::Entity",
        from = "Column::JournalId",
        to = "super::journals::Column::Id"
    )]
    Journals,
}

impl Related<super::journals::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Journals.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Converts the row into the domain record.
    pub fn into_record(self) -> Result<ExpenseRecord, StoreError> {
        let status = self
            .status
            .parse::<PaymentStatus>()
            .map_err(|e| corrupt("expenses.status", e))?;
        let tax = self
            .tax
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| corrupt("expenses.tax", e))?;
        let line_items =
            serde_json::from_value(self.line_items).map_err(|e| corrupt("expenses.line_items", e))?;
        Ok(ExpenseRecord {
            id: ExpenseId::from_uuid(self.id),
            tenant_id: TenantId::from_uuid(self.tenant_id),
            journal_id: JournalId::from_uuid(self.journal_id),
            vendor: self.vendor,
            description: self.description,
            total: self.total,
            amount_paid: self.amount_paid,
            status,
            is_refund: self.is_refund,
            date: self.date,
            due_date: self.due_date,
            tax,
            line_items,
        })
    }
}

impl TryFrom<&ExpenseRecord> for ActiveModel {
    type Error = StoreError;

    fn try_from(record: &ExpenseRecord) -> Result<Self, Self::Error> {
        let tax = record
            .tax
            .as_ref()
            .map(serde_json::to_value)
            .transpose()
            .map_err(|e| corrupt("expenses.tax", e))?;
        let line_items =
            serde_json::to_value(&record.line_items).map_err(|e| corrupt("expenses.line_items", e))?;
        let now = Utc::now().fixed_offset();
        Ok(Self {
            id: Set(record.id.into_inner()),
            tenant_id: Set(record.tenant_id.into_inner()),
            journal_id: Set(record.journal_id.into_inner()),
            vendor: Set(record.vendor.clone()),
            description: Set(record.description.clone()),
            total: Set(record.total),
            amount_paid: Set(record.amount_paid),
            status: Set(record.status.as_str().to_string()),
            is_refund: Set(record.is_refund),
            date: Set(record.date),
            due_date: Set(record.due_date),
            tax: Set(tax),
            line_items: Set(line_items),
            created_at: Set(now),
            updated_at: Set(now),
        })
    }
}
