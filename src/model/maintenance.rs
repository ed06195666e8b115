use crate::model::{generate_id, Id, Sort};
use chrono::{DateTime, SubsecRound, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A maintenance record ("manutenção") performed on one vehicle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceRecord {
    #[serde(default = "generate_id")]
    pub id: Id,
    pub vehicle_id: Id,
    #[serde(default = "recorded_now")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub description: String,
    #[serde(default, with = "rust_decimal::serde::float")]
    pub cost: Decimal,
}

/// Current time at the precision PostgreSQL keeps for `TIMESTAMPTZ`.
pub fn recorded_now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

impl MaintenanceRecord {
    pub fn new(vehicle_id: Id, description: &str, cost: Decimal) -> Self {
        Self {
            id: generate_id(),
            vehicle_id,
            timestamp: recorded_now(),
            description: description.to_string(),
            cost,
        }
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp.trunc_subsecs(6);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaintenanceOrder {
    Timestamp,
    Cost,
}

impl MaintenanceOrder {
    pub fn column(&self) -> &'static str {
        match self {
            MaintenanceOrder::Timestamp => "performed_at",
            MaintenanceOrder::Cost => "cost",
        }
    }
}

/// Most recent first.
impl Default for Sort<MaintenanceOrder> {
    fn default() -> Self {
        Sort::desc(MaintenanceOrder::Timestamp)
    }
}
