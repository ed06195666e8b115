use anyhow::Result;
use itertools::Itertools;
use parking_lot::RwLock;
use std::cmp::Ordering;
use std::collections::HashMap;

use crate::model::{
    Branch, BranchOrder, Id, MaintenanceOrder, MaintenanceRecord, Sort, Vehicle, VehicleOrder,
};
use crate::store::traits::{
    BranchStore, DeleteOutcome, MaintenanceStore, Store, VehicleStore, WriteOutcome,
};

#[derive(Debug, Default)]
struct Tables {
    branches: HashMap<Id, Branch>,
    vehicles: HashMap<Id, Vehicle>,
    maintenance: HashMap<Id, MaintenanceRecord>,
}

impl Tables {
    fn plate_taken(&self, plate: &str, except: Option<&Id>) -> bool {
        self.vehicles
            .values()
            .any(|v| v.plate == plate && Some(&v.id) != except)
    }
}

/// Process-local store. Every mutation checks its preconditions and applies
/// the change under a single write lock, so check-then-act is atomic.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn directed(ordering: Ordering, descending: bool) -> Ordering {
    if descending {
        ordering.reverse()
    } else {
        ordering
    }
}

fn compare_branches(sort: &Sort<BranchOrder>, a: &Branch, b: &Branch) -> Ordering {
    let primary = match sort.key {
        BranchOrder::Name => a.name.cmp(&b.name),
        BranchOrder::City => a.city.cmp(&b.city),
    };
    directed(primary, sort.descending).then_with(|| a.id.cmp(&b.id))
}

fn compare_vehicles(sort: &Sort<VehicleOrder>, a: &Vehicle, b: &Vehicle) -> Ordering {
    let primary = match sort.key {
        VehicleOrder::Plate => a.plate.cmp(&b.plate),
        VehicleOrder::Model => a.model.cmp(&b.model),
        VehicleOrder::Year => a.year.cmp(&b.year),
    };
    directed(primary, sort.descending).then_with(|| a.id.cmp(&b.id))
}

fn compare_maintenance(
    sort: &Sort<MaintenanceOrder>,
    a: &MaintenanceRecord,
    b: &MaintenanceRecord,
) -> Ordering {
    let primary = match sort.key {
        MaintenanceOrder::Timestamp => a.timestamp.cmp(&b.timestamp),
        MaintenanceOrder::Cost => a.cost.cmp(&b.cost),
    };
    directed(primary, sort.descending).then_with(|| a.id.cmp(&b.id))
}

fn window<'a, T: Clone + 'a>(
    items: impl Iterator<Item = &'a T>,
    offset: i64,
    limit: i64,
) -> Vec<T> {
    items
        .skip(offset.max(0) as usize)
        .take(limit.max(0) as usize)
        .cloned()
        .collect()
}

#[async_trait::async_trait]
impl BranchStore for MemoryStore {
    async fn list_branches(
        &self,
        sort: Sort<BranchOrder>,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Branch>> {
        let tables = self.tables.read();
        let sorted = tables
            .branches
            .values()
            .sorted_by(|a, b| compare_branches(&sort, a, b));
        Ok(window(sorted, offset, limit))
    }

    async fn count_branches(&self) -> Result<i64> {
        Ok(self.tables.read().branches.len() as i64)
    }

    async fn get_branch(&self, id: &Id) -> Result<Option<Branch>> {
        Ok(self.tables.read().branches.get(id).cloned())
    }

    async fn branch_exists(&self, id: &Id) -> Result<bool> {
        Ok(self.tables.read().branches.contains_key(id))
    }

    async fn insert_branch(&self, branch: Branch) -> Result<WriteOutcome> {
        let mut tables = self.tables.write();
        if tables.branches.contains_key(&branch.id) {
            return Ok(WriteOutcome::DuplicateId);
        }
        tables.branches.insert(branch.id, branch);
        Ok(WriteOutcome::Applied)
    }

    async fn replace_branch(&self, branch: Branch) -> Result<WriteOutcome> {
        let mut tables = self.tables.write();
        match tables.branches.get_mut(&branch.id) {
            Some(current) => {
                *current = branch;
                Ok(WriteOutcome::Applied)
            }
            None => Ok(WriteOutcome::NotFound),
        }
    }

    async fn delete_branch(&self, id: &Id) -> Result<DeleteOutcome> {
        let mut tables = self.tables.write();
        if !tables.branches.contains_key(id) {
            return Ok(DeleteOutcome::NotFound);
        }

        let dependents = tables
            .vehicles
            .values()
            .filter(|v| &v.branch_id == id)
            .count() as u64;
        if dependents > 0 {
            return Ok(DeleteOutcome::Restricted { dependents });
        }

        tables.branches.remove(id);
        Ok(DeleteOutcome::Deleted { cascaded: 0 })
    }
}

#[async_trait::async_trait]
impl VehicleStore for MemoryStore {
    async fn list_vehicles(
        &self,
        sort: Sort<VehicleOrder>,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Vehicle>> {
        let tables = self.tables.read();
        let sorted = tables
            .vehicles
            .values()
            .sorted_by(|a, b| compare_vehicles(&sort, a, b));
        Ok(window(sorted, offset, limit))
    }

    async fn count_vehicles(&self) -> Result<i64> {
        Ok(self.tables.read().vehicles.len() as i64)
    }

    async fn list_vehicles_for_branch(&self, branch_id: &Id) -> Result<Vec<Vehicle>> {
        let sort = Sort::<VehicleOrder>::default();
        let tables = self.tables.read();
        Ok(tables
            .vehicles
            .values()
            .filter(|v| &v.branch_id == branch_id)
            .sorted_by(|a, b| compare_vehicles(&sort, a, b))
            .cloned()
            .collect())
    }

    async fn count_vehicles_for_branch(&self, branch_id: &Id) -> Result<i64> {
        let tables = self.tables.read();
        Ok(tables
            .vehicles
            .values()
            .filter(|v| &v.branch_id == branch_id)
            .count() as i64)
    }

    async fn get_vehicle(&self, id: &Id) -> Result<Option<Vehicle>> {
        Ok(self.tables.read().vehicles.get(id).cloned())
    }

    async fn vehicle_exists(&self, id: &Id) -> Result<bool> {
        Ok(self.tables.read().vehicles.contains_key(id))
    }

    async fn plate_in_use(&self, plate: &str, except: Option<&Id>) -> Result<bool> {
        Ok(self.tables.read().plate_taken(plate, except))
    }

    async fn insert_vehicle(&self, vehicle: Vehicle) -> Result<WriteOutcome> {
        let mut tables = self.tables.write();
        if !tables.branches.contains_key(&vehicle.branch_id) {
            return Ok(WriteOutcome::MissingReference);
        }
        if tables.plate_taken(&vehicle.plate, None) {
            return Ok(WriteOutcome::DuplicatePlate);
        }
        if tables.vehicles.contains_key(&vehicle.id) {
            return Ok(WriteOutcome::DuplicateId);
        }
        tables.vehicles.insert(vehicle.id, vehicle);
        Ok(WriteOutcome::Applied)
    }

    async fn replace_vehicle(&self, vehicle: Vehicle) -> Result<WriteOutcome> {
        let mut tables = self.tables.write();
        if !tables.vehicles.contains_key(&vehicle.id) {
            return Ok(WriteOutcome::NotFound);
        }
        if !tables.branches.contains_key(&vehicle.branch_id) {
            return Ok(WriteOutcome::MissingReference);
        }
        if tables.plate_taken(&vehicle.plate, Some(&vehicle.id)) {
            return Ok(WriteOutcome::DuplicatePlate);
        }
        tables.vehicles.insert(vehicle.id, vehicle);
        Ok(WriteOutcome::Applied)
    }

    async fn delete_vehicle(&self, id: &Id) -> Result<DeleteOutcome> {
        let mut tables = self.tables.write();
        if tables.vehicles.remove(id).is_none() {
            return Ok(DeleteOutcome::NotFound);
        }

        let before = tables.maintenance.len();
        tables.maintenance.retain(|_, m| &m.vehicle_id != id);
        let cascaded = (before - tables.maintenance.len()) as u64;

        Ok(DeleteOutcome::Deleted { cascaded })
    }
}

#[async_trait::async_trait]
impl MaintenanceStore for MemoryStore {
    async fn list_maintenance(
        &self,
        sort: Sort<MaintenanceOrder>,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<MaintenanceRecord>> {
        let tables = self.tables.read();
        let sorted = tables
            .maintenance
            .values()
            .sorted_by(|a, b| compare_maintenance(&sort, a, b));
        Ok(window(sorted, offset, limit))
    }

    async fn count_maintenance(&self) -> Result<i64> {
        Ok(self.tables.read().maintenance.len() as i64)
    }

    async fn list_maintenance_for_vehicle(
        &self,
        vehicle_id: &Id,
        sort: Sort<MaintenanceOrder>,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<MaintenanceRecord>> {
        let tables = self.tables.read();
        let sorted = tables
            .maintenance
            .values()
            .filter(|m| &m.vehicle_id == vehicle_id)
            .sorted_by(|a, b| compare_maintenance(&sort, a, b));
        Ok(window(sorted, offset, limit))
    }

    async fn count_maintenance_for_vehicle(&self, vehicle_id: &Id) -> Result<i64> {
        let tables = self.tables.read();
        Ok(tables
            .maintenance
            .values()
            .filter(|m| &m.vehicle_id == vehicle_id)
            .count() as i64)
    }

    async fn get_maintenance(&self, id: &Id) -> Result<Option<MaintenanceRecord>> {
        Ok(self.tables.read().maintenance.get(id).cloned())
    }

    async fn insert_maintenance(&self, record: MaintenanceRecord) -> Result<WriteOutcome> {
        let mut tables = self.tables.write();
        if !tables.vehicles.contains_key(&record.vehicle_id) {
            return Ok(WriteOutcome::MissingReference);
        }
        if tables.maintenance.contains_key(&record.id) {
            return Ok(WriteOutcome::DuplicateId);
        }
        tables.maintenance.insert(record.id, record);
        Ok(WriteOutcome::Applied)
    }

    async fn replace_maintenance(&self, record: MaintenanceRecord) -> Result<WriteOutcome> {
        let mut tables = self.tables.write();
        if !tables.maintenance.contains_key(&record.id) {
            return Ok(WriteOutcome::NotFound);
        }
        if !tables.vehicles.contains_key(&record.vehicle_id) {
            return Ok(WriteOutcome::MissingReference);
        }
        tables.maintenance.insert(record.id, record);
        Ok(WriteOutcome::Applied)
    }

    async fn delete_maintenance(&self, id: &Id) -> Result<DeleteOutcome> {
        match self.tables.write().maintenance.remove(id) {
            Some(_) => Ok(DeleteOutcome::Deleted { cascaded: 0 }),
            None => Ok(DeleteOutcome::NotFound),
        }
    }
}

impl Store for MemoryStore {}
