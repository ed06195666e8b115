use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type Id = Uuid;

/// Default region assigned to branches that omit one
pub const DEFAULT_REGION: &str = "SP";

pub fn generate_id() -> Id {
    Uuid::new_v4()
}

/// Kinds of records held by the fleet store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Branch,
    Vehicle,
    Maintenance,
}

impl EntityKind {
    pub fn label(&self) -> &'static str {
        match self {
            EntityKind::Branch => "Branch",
            EntityKind::Vehicle => "Vehicle",
            EntityKind::Maintenance => "Maintenance record",
        }
    }
}

/// Sort specification for list queries: an order key plus direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sort<K> {
    pub key: K,
    pub descending: bool,
}

impl<K> Sort<K> {
    pub fn asc(key: K) -> Self {
        Self {
            key,
            descending: false,
        }
    }

    pub fn desc(key: K) -> Self {
        Self {
            key,
            descending: true,
        }
    }

    pub fn direction_sql(&self) -> &'static str {
        if self.descending {
            "DESC"
        } else {
            "ASC"
        }
    }
}
