//! `SeaORM` Entity for inventory_txns table.

use chrono::Utc;
use sea_orm::Set;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use tally_core::inventory::InventoryTxn;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "inventory_txns")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub lot_id: Uuid,
    pub product_id: Uuid,
    pub journal_id: Uuid,
    pub kind: String,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub quantity: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub unit_cost: Decimal,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::inventory_lots::Entity",
        from = "Column::LotId",
        to = "super::inventory_lots::Column::Id"
    )]
    InventoryLots,
}

impl Related<super::inventory_lots::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::InventoryLots.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&InventoryTxn> for ActiveModel {
    fn from(txn: &InventoryTxn) -> Self {
        Self {
            id: Set(txn.id.into_inner()),
            tenant_id: Set(txn.tenant_id.into_inner()),
            lot_id: Set(txn.lot_id.into_inner()),
            product_id: Set(txn.product_id.into_inner()),
            journal_id: Set(txn.journal_id.into_inner()),
            kind: Set(txn.kind.as_str().to_string()),
            quantity: Set(txn.quantity),
            unit_cost: Set(txn.unit_cost),
            created_at: Set(Utc::now().fixed_offset()),
        }
    }
}
