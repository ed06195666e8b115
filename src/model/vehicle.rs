use crate::model::{generate_id, Id, Sort};
use serde::{Deserialize, Serialize};

pub const MIN_YEAR: i32 = 2000;
pub const MAX_YEAR: i32 = 2100;

/// A vehicle ("moto") assigned to exactly one branch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vehicle {
    #[serde(default = "generate_id")]
    pub id: Id,
    #[serde(default)]
    pub plate: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub year: i32,
    pub branch_id: Id,
}

impl Vehicle {
    pub fn new(plate: &str, model: &str, year: i32, branch_id: Id) -> Self {
        Self {
            id: generate_id(),
            plate: plate.to_string(),
            model: model.to_string(),
            year,
            branch_id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VehicleOrder {
    Plate,
    Model,
    Year,
}

impl VehicleOrder {
    pub fn column(&self) -> &'static str {
        match self {
            VehicleOrder::Plate => "plate",
            VehicleOrder::Model => "model",
            VehicleOrder::Year => "year",
        }
    }
}

impl Default for Sort<VehicleOrder> {
    fn default() -> Self {
        Sort::asc(VehicleOrder::Plate)
    }
}
