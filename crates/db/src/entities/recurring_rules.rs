//! `SeaORM` Entity for recurring_rules table.

use sea_orm::Set;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use tally_core::ledger::StoreError;
use tally_core::schedule::{Cadence, RecurringRule};
use tally_shared::types::{RecurringRuleId, TenantId};

use crate::error::corrupt;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "recurring_rules")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub cadence: String,
    pub start_date: Date,
    pub end_date: Option<Date>,
    #[sea_orm(column_type = "JsonBinary")]
    pub options: Json,
    pub next_run_at: DateTimeWithTimeZone,
    pub last_run_at: Option<DateTimeWithTimeZone>,
    pub is_active: bool,
    #[sea_orm(column_type = "JsonBinary")]
    pub template: Json,
    #[sea_orm(column_type = "JsonBinary")]
    pub run_log: Json,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Converts the row into the domain rule.
    pub fn into_rule(self) -> Result<RecurringRule, StoreError> {
        let cadence = Cadence::parse(&self.cadence)
            .ok_or_else(|| corrupt("recurring_rules.cadence", &self.cadence))?;
        Ok(RecurringRule {
            id: RecurringRuleId::from_uuid(self.id),
            tenant_id: TenantId::from_uuid(self.tenant_id),
            name: self.name,
            cadence,
            start_date: self.start_date,
            end_date: self.end_date,
            options: serde_json::from_value(self.options)
                .map_err(|e| corrupt("recurring_rules.options", e))?,
            next_run_at: self.next_run_at.to_utc(),
            last_run_at: self.last_run_at.map(|at| at.to_utc()),
            is_active: self.is_active,
            template: serde_json::from_value(self.template)
                .map_err(|e| corrupt("recurring_rules.template", e))?,
            run_log: serde_json::from_value(self.run_log)
                .map_err(|e| corrupt("recurring_rules.run_log", e))?,
            created_at: self.created_at.to_utc(),
            updated_at: self.updated_at.to_utc(),
        })
    }
}

impl TryFrom<&RecurringRule> for ActiveModel {
    type Error = StoreError;

    fn try_from(rule: &RecurringRule) -> Result<Self, Self::Error> {
        let json = |column: &str, value: serde_json::Result<Json>| {
            value.map_err(|e| corrupt(column, e))
        };
        Ok(Self {
            id: Set(rule.id.into_inner()),
            tenant_id: Set(rule.tenant_id.into_inner()),
            name: Set(rule.name.clone()),
            cadence: Set(rule.cadence.as_str().to_string()),
            start_date: Set(rule.start_date),
            end_date: Set(rule.end_date),
            options: Set(json("recurring_rules.options", serde_json::to_value(&rule.options))?),
            next_run_at: Set(rule.next_run_at.fixed_offset()),
            last_run_at: Set(rule.last_run_at.map(|at| at.fixed_offset())),
            is_active: Set(rule.is_active),
            template: Set(json("recurring_rules.template", serde_json::to_value(&rule.template))?),
            run_log: Set(json("recurring_rules.run_log", serde_json::to_value(&rule.run_log))?),
            created_at: Set(rule.created_at.fixed_offset()),
            updated_at: Set(rule.updated_at.fixed_offset()),
        })
    }
}
