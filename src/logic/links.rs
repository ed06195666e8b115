use serde::Serialize;
use std::collections::BTreeMap;

use crate::model::{Branch, Id, MaintenanceRecord, Vehicle};

pub const BRANCHES_PATH: &str = "/branches";
pub const VEHICLES_PATH: &str = "/vehicles";
pub const MAINTENANCE_PATH: &str = "/maintenance";

/// Relation name → path.
pub type Links = BTreeMap<&'static str, String>;

pub fn branch_path(id: &Id) -> String {
    format!("{}/{}", BRANCHES_PATH, id)
}

pub fn vehicle_path(id: &Id) -> String {
    format!("{}/{}", VEHICLES_PATH, id)
}

pub fn maintenance_path(id: &Id) -> String {
    format!("{}/{}", MAINTENANCE_PATH, id)
}

/// Entities that can describe their own relations from the identity fields
/// they already carry.
pub trait Linked {
    fn self_path(&self) -> String;
    fn links(&self) -> Links;
}

impl Linked for Branch {
    fn self_path(&self) -> String {
        branch_path(&self.id)
    }

    fn links(&self) -> Links {
        Links::from([
            ("self", self.self_path()),
            ("vehicles", format!("{}/vehicles", self.self_path())),
        ])
    }
}

impl Linked for Vehicle {
    fn self_path(&self) -> String {
        vehicle_path(&self.id)
    }

    fn links(&self) -> Links {
        Links::from([
            ("self", self.self_path()),
            ("branch", branch_path(&self.branch_id)),
            ("maintenance", format!("{}/maintenance", self.self_path())),
        ])
    }
}

impl Linked for MaintenanceRecord {
    fn self_path(&self) -> String {
        maintenance_path(&self.id)
    }

    fn links(&self) -> Links {
        Links::from([
            ("self", self.self_path()),
            ("vehicle", vehicle_path(&self.vehicle_id)),
        ])
    }
}

/// An entity serialized together with its `_links` mapping.
#[derive(Debug, Clone, Serialize)]
pub struct Resource<T> {
    #[serde(flatten)]
    pub item: T,
    #[serde(rename = "_links")]
    pub links: Links,
}

impl<T: Linked> Resource<T> {
    pub fn new(item: T) -> Self {
        let links = item.links();
        Self { item, links }
    }
}

pub fn with_links<T: Linked>(items: Vec<T>) -> Vec<Resource<T>> {
    items.into_iter().map(Resource::new).collect()
}
