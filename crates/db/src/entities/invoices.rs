//! `SeaORM` Entity for invoices table.

use chrono::Utc;
use sea_orm::Set;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use tally_core::ledger::{InvoiceRecord, PaymentStatus, StoreError};
use tally_shared::types::{InvoiceId, JournalId, TenantId};

use crate::error::corrupt;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "invoices")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub journal_id: Uuid,
    pub customer: String,
    pub invoice_number: Option<String>,
    pub normalized_number: Option<String>,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub total: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub amount_paid: Decimal,
    pub status: String,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub discount: Decimal,
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
    pub fn into_record(self) -> Result<InvoiceRecord, StoreError> {
        let status = self
            .status
            .parse::<PaymentStatus>()
            .map_err(|e| corrupt("invoices.status", e))?;
        let tax = self
            .tax
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| corrupt("invoices.tax", e))?;
        let line_items =
            serde_json::from_value(self.line_items).map_err(|e| corrupt("invoices.line_items", e))?;
        Ok(InvoiceRecord {
            id: InvoiceId::from_uuid(self.id),
            tenant_id: TenantId::from_uuid(self.tenant_id),
            journal_id: JournalId::from_uuid(self.journal_id),
            customer: self.customer,
            invoice_number: self.invoice_number,
            normalized_number: self.normalized_number,
            total: self.total,
            amount_paid: self.amount_paid,
            status,
            discount: self.discount,
            date: self.date,
            due_date: self.due_date,
            tax,
            line_items,
        })
    }
}

impl TryFrom<&InvoiceRecord> for ActiveModel {
    type Error = StoreError;

    fn try_from(record: &InvoiceRecord) -> Result<Self, Self::Error> {
        let tax = record
            .tax
            .as_ref()
            .map(serde_json::to_value)
            .transpose()
            .map_err(|e| corrupt("invoices.tax", e))?;
        let line_items =
            serde_json::to_value(&record.line_items).map_err(|e| corrupt("invoices.line_items", e))?;
        let now = Utc::now().fixed_offset();
        Ok(Self {
            id: Set(record.id.into_inner()),
            tenant_id: Set(record.tenant_id.into_inner()),
            journal_id: Set(record.journal_id.into_inner()),
            customer: Set(record.customer.clone()),
            invoice_number: Set(record.invoice_number.clone()),
            normalized_number: Set(record.normalized_number.clone()),
            total: Set(record.total),
            amount_paid: Set(record.amount_paid),
            status: Set(record.status.as_str().to_string()),
            discount: Set(record.discount),
            date: Set(record.date),
            due_date: Set(record.due_date),
            tax: Set(tax),
            line_items: Set(line_items),
            created_at: Set(now),
            updated_at: Set(now),
        })
    }
}
