//! `SeaORM` Entity for inventory_lots table.

use sea_orm::Set;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use tally_core::inventory::InventoryLot;
use tally_shared::types::{InventoryLotId, JournalId, ProductId, TenantId};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "inventory_lots")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub product_id: Uuid,
    pub received_on: Date,
    pub received_at: DateTimeWithTimeZone,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub quantity: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub remaining_qty: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub unit_cost: Decimal,
    pub journal_id: Option<Uuid>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::inventory_txns::Entity")]
    InventoryTxns,
}

impl Related<super::inventory_txns::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::InventoryTxns.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for InventoryLot {
    fn from(model: Model) -> Self {
        Self {
            id: InventoryLotId::from_uuid(model.id),
            tenant_id: TenantId::from_uuid(model.tenant_id),
            product_id: ProductId::from_uuid(model.product_id),
            received_on: model.received_on,
            received_at: model.received_at.to_utc(),
            quantity: model.quantity,
            remaining_qty: model.remaining_qty,
            unit_cost: model.unit_cost,
            journal_id: model.journal_id.map(JournalId::from_uuid),
        }
    }
}

impl From<&InventoryLot> for ActiveModel {
    fn from(lot: &InventoryLot) -> Self {
        Self {
            id: Set(lot.id.into_inner()),
            tenant_id: Set(lot.tenant_id.into_inner()),
            product_id: Set(lot.product_id.into_inner()),
            received_on: Set(lot.received_on),
            received_at: Set(lot.received_at.fixed_offset()),
            quantity: Set(lot.quantity),
            remaining_qty: Set(lot.remaining_qty),
            unit_cost: Set(lot.unit_cost),
            journal_id: Set(lot.journal_id.map(JournalId::into_inner)),
        }
    }
}
