//! FIFO lot ledger for inventory-tracked products.
//!
//! Lots are consumed oldest-first. The ledger works on a snapshot of the
//! lots loaded (and, in the writer, locked) inside the posting's unit of
//! work, and reports which lots changed so the store can persist them.

use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tally_shared::types::money::{round_cents, round_unit_cost};
use tally_shared::types::{InventoryLotId, InventoryTxnId, JournalId, ProductId, TenantId};

/// A receipt batch of one product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryLot {
    /// Unique identifier.
    pub id: InventoryLotId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Product received.
    pub product_id: ProductId,
    /// Receipt date, the primary FIFO key.
    pub received_on: NaiveDate,
    /// Receipt instant, breaks ties within a day.
    pub received_at: DateTime<Utc>,
    /// Quantity received.
    pub quantity: Decimal,
    /// Quantity not yet consumed.
    pub remaining_qty: Decimal,
    /// Cost per unit, four decimal places.
    pub unit_cost: Decimal,
    /// Journal that received the lot.
    pub journal_id: Option<JournalId>,
}

impl InventoryLot {
    /// A new full lot with `unit_cost = amount / quantity`.
    #[must_use]
    pub fn receipt(
        tenant_id: TenantId,
        product_id: ProductId,
        received_on: NaiveDate,
        quantity: Decimal,
        amount: Decimal,
    ) -> Self {
        let unit_cost = if quantity > Decimal::ZERO {
            round_unit_cost(amount / quantity)
        } else {
            Decimal::ZERO
        };
        Self {
            id: InventoryLotId::new(),
            tenant_id,
            product_id,
            received_on,
            received_at: Utc::now(),
            quantity,
            remaining_qty: quantity,
            unit_cost,
            journal_id: None,
        }
    }

    fn fifo_key(&self) -> (NaiveDate, DateTime<Utc>, InventoryLotId) {
        (self.received_on, self.received_at, self.id)
    }
}

/// Direction of an inventory movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InventoryTxnKind {
    /// Quantity added by a purchase.
    Receipt,
    /// Quantity removed by a sale.
    Consumption,
}

impl InventoryTxnKind {
    /// Storage name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Receipt => "receipt",
            Self::Consumption => "consumption",
        }
    }
}

impl FromStr for InventoryTxnKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "receipt" => Ok(Self::Receipt),
            "consumption" => Ok(Self::Consumption),
            _ => Err(format!("Unknown inventory movement: {s}")),
        }
    }
}

/// An audit row for one lot movement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryTxn {
    /// Unique identifier.
    pub id: InventoryTxnId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Lot moved.
    pub lot_id: InventoryLotId,
    /// Product moved.
    pub product_id: ProductId,
    /// Journal that caused the movement.
    pub journal_id: JournalId,
    /// Receipt or consumption.
    pub kind: InventoryTxnKind,
    /// Quantity moved, positive.
    pub quantity: Decimal,
    /// Unit cost of the lot.
    pub unit_cost: Decimal,
}

/// Quantity taken from one lot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LotConsumption {
    /// Lot consumed.
    pub lot_id: InventoryLotId,
    /// Product of the lot.
    pub product_id: ProductId,
    /// Quantity taken.
    pub quantity: Decimal,
    /// Unit cost of the lot.
    pub unit_cost: Decimal,
}

/// Result of consuming a quantity of one product.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConsumeOutcome {
    /// Lots taken from, oldest first.
    pub consumptions: Vec<LotConsumption>,
    /// Quantity no lot could cover.
    pub shortfall: Decimal,
}

impl ConsumeOutcome {
    /// Cost of the consumed quantity, rounded to cents.
    #[must_use]
    pub fn cost(&self) -> Decimal {
        round_cents(
            self.consumptions
                .iter()
                .map(|c| c.quantity * c.unit_cost)
                .sum(),
        )
    }
}

/// Working set of lots per product with FIFO consumption.
#[derive(Debug, Clone, Default)]
pub struct LotLedger {
    lots: BTreeMap<ProductId, Vec<InventoryLot>>,
    dirty: BTreeSet<InventoryLotId>,
}

impl LotLedger {
    /// An empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the existing lots of one product, replacing any loaded earlier.
    pub fn load(&mut self, product_id: ProductId, mut lots: Vec<InventoryLot>) {
        lots.sort_by_key(InventoryLot::fifo_key);
        self.lots.insert(product_id, lots);
    }

    /// Quantity still available for a product.
    #[must_use]
    pub fn available(&self, product_id: ProductId) -> Decimal {
        self.lots
            .get(&product_id)
            .map_or(Decimal::ZERO, |lots| lots.iter().map(|l| l.remaining_qty).sum())
    }

    /// Takes `quantity` of a product from the oldest lots first.
    ///
    /// A partial take reduces the lot's `remaining_qty`; an exhausted lot
    /// stays at zero. Whatever no lot covers is reported as shortfall.
    pub fn consume(&mut self, product_id: ProductId, quantity: Decimal) -> ConsumeOutcome {
        let mut outcome = ConsumeOutcome::default();
        let mut needed = quantity.max(Decimal::ZERO);

        if let Some(lots) = self.lots.get_mut(&product_id) {
            for lot in lots.iter_mut() {
                if needed <= Decimal::ZERO {
                    break;
                }
                if lot.remaining_qty <= Decimal::ZERO {
                    continue;
                }
                let take = needed.min(lot.remaining_qty);
                lot.remaining_qty -= take;
                needed -= take;
                self.dirty.insert(lot.id);
                outcome.consumptions.push(LotConsumption {
                    lot_id: lot.id,
                    product_id,
                    quantity: take,
                    unit_cost: lot.unit_cost,
                });
            }
        }

        outcome.shortfall = needed;
        outcome
    }

    /// Existing lots whose remaining quantity changed.
    #[must_use]
    pub fn changed_lots(&self) -> Vec<InventoryLot> {
        self.lots
            .values()
            .flatten()
            .filter(|lot| self.dirty.contains(&lot.id))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, d).unwrap()
    }

    fn lot(tenant: TenantId, product: ProductId, on: u32, qty: Decimal, cost: Decimal) -> InventoryLot {
        InventoryLot::receipt(tenant, product, day(on), qty, qty * cost)
    }

    #[test]
    fn test_receipt_unit_cost() {
        let lot = InventoryLot::receipt(TenantId::new(), ProductId::new(), day(1), dec!(3), dec!(10));
        assert_eq!(lot.unit_cost, dec!(3.3333));
        assert_eq!(lot.remaining_qty, dec!(3));
    }

    #[test]
    fn test_consume_oldest_first_with_partial_lot() {
        let tenant = TenantId::new();
        let product = ProductId::new();
        let newer = lot(tenant, product, 5, dec!(10), dec!(3));
        let older = lot(tenant, product, 1, dec!(4), dec!(2));
        let mut ledger = LotLedger::new();
        ledger.load(product, vec![newer.clone(), older.clone()]);

        let outcome = ledger.consume(product, dec!(6));
        assert_eq!(outcome.shortfall, Decimal::ZERO);
        assert_eq!(outcome.consumptions.len(), 2);
        assert_eq!(outcome.consumptions[0].lot_id, older.id);
        assert_eq!(outcome.consumptions[0].quantity, dec!(4));
        assert_eq!(outcome.consumptions[1].lot_id, newer.id);
        assert_eq!(outcome.consumptions[1].quantity, dec!(2));
        // 4 x 2 + 2 x 3
        assert_eq!(outcome.cost(), dec!(14.00));
        assert_eq!(ledger.available(product), dec!(8));

        let changed = ledger.changed_lots();
        assert_eq!(changed.len(), 2);
        assert!(changed.iter().any(|l| l.id == older.id && l.remaining_qty == Decimal::ZERO));
        assert!(changed.iter().any(|l| l.id == newer.id && l.remaining_qty == dec!(8)));
    }

    #[test]
    fn test_shortfall_is_reported_not_fatal() {
        let tenant = TenantId::new();
        let product = ProductId::new();
        let mut ledger = LotLedger::new();
        ledger.load(product, vec![lot(tenant, product, 1, dec!(2), dec!(5))]);

        let outcome = ledger.consume(product, dec!(5));
        assert_eq!(outcome.shortfall, dec!(3));
        assert_eq!(outcome.cost(), dec!(10.00));
        assert_eq!(ledger.available(product), Decimal::ZERO);

        let unknown = ledger.consume(ProductId::new(), dec!(1));
        assert!(unknown.consumptions.is_empty());
        assert_eq!(unknown.shortfall, dec!(1));
    }
}
