use crate::model::{generate_id, Id, Sort, DEFAULT_REGION};
use serde::{Deserialize, Serialize};

/// A physical branch ("filial") of the fleet. Owns zero or more vehicles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Branch {
    #[serde(default = "generate_id")]
    pub id: Id,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub city: String,
    #[serde(default = "default_region")]
    pub region: String,
}

fn default_region() -> String {
    DEFAULT_REGION.to_string()
}

impl Branch {
    pub fn new(name: &str, address: &str, city: &str) -> Self {
        Self {
            id: generate_id(),
            name: name.to_string(),
            address: address.to_string(),
            city: city.to_string(),
            region: default_region(),
        }
    }

    pub fn with_region(mut self, region: &str) -> Self {
        self.region = region.to_string();
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BranchOrder {
    Name,
    City,
}

impl BranchOrder {
    pub fn column(&self) -> &'static str {
        match self {
            BranchOrder::Name => "name",
            BranchOrder::City => "city",
        }
    }
}

impl Default for Sort<BranchOrder> {
    fn default() -> Self {
        Sort::asc(BranchOrder::Name)
    }
}
