use crate::model::{
    Branch, BranchOrder, Id, MaintenanceOrder, MaintenanceRecord, Sort, Vehicle, VehicleOrder,
};
use anyhow::Result;

/// Result of an insert or replace once the store has re-checked its
/// preconditions inside the write's own transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Applied,
    /// Replace target does not exist.
    NotFound,
    /// Insert carries an id that is already taken.
    DuplicateId,
    /// Another vehicle already holds the plate.
    DuplicatePlate,
    /// The parent (branch or vehicle) the record points at does not exist.
    MissingReference,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// Row removed, along with `cascaded` dependent rows.
    Deleted { cascaded: u64 },
    NotFound,
    /// Row kept because `dependents` rows still reference it.
    Restricted { dependents: u64 },
}

#[async_trait::async_trait]
pub trait BranchStore: Send + Sync {
    async fn list_branches(
        &self,
        sort: Sort<BranchOrder>,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Branch>>;
    async fn count_branches(&self) -> Result<i64>;
    async fn get_branch(&self, id: &Id) -> Result<Option<Branch>>;
    async fn branch_exists(&self, id: &Id) -> Result<bool>;
    async fn insert_branch(&self, branch: Branch) -> Result<WriteOutcome>;
    async fn replace_branch(&self, branch: Branch) -> Result<WriteOutcome>;
    /// Removes a branch unless a vehicle still references it.
    async fn delete_branch(&self, id: &Id) -> Result<DeleteOutcome>;
}

#[async_trait::async_trait]
pub trait VehicleStore: Send + Sync {
    async fn list_vehicles(
        &self,
        sort: Sort<VehicleOrder>,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Vehicle>>;
    async fn count_vehicles(&self) -> Result<i64>;
    /// All vehicles of one branch, by plate.
    async fn list_vehicles_for_branch(&self, branch_id: &Id) -> Result<Vec<Vehicle>>;
    async fn count_vehicles_for_branch(&self, branch_id: &Id) -> Result<i64>;
    async fn get_vehicle(&self, id: &Id) -> Result<Option<Vehicle>>;
    async fn vehicle_exists(&self, id: &Id) -> Result<bool>;
    /// Whether any vehicle other than `except` holds `plate`.
    async fn plate_in_use(&self, plate: &str, except: Option<&Id>) -> Result<bool>;
    async fn insert_vehicle(&self, vehicle: Vehicle) -> Result<WriteOutcome>;
    async fn replace_vehicle(&self, vehicle: Vehicle) -> Result<WriteOutcome>;
    /// Removes a vehicle together with all of its maintenance records, atomically.
    async fn delete_vehicle(&self, id: &Id) -> Result<DeleteOutcome>;
}

#[async_trait::async_trait]
pub trait MaintenanceStore: Send + Sync {
    async fn list_maintenance(
        &self,
        sort: Sort<MaintenanceOrder>,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<MaintenanceRecord>>;
    async fn count_maintenance(&self) -> Result<i64>;
    async fn list_maintenance_for_vehicle(
        &self,
        vehicle_id: &Id,
        sort: Sort<MaintenanceOrder>,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<MaintenanceRecord>>;
    async fn count_maintenance_for_vehicle(&self, vehicle_id: &Id) -> Result<i64>;
    async fn get_maintenance(&self, id: &Id) -> Result<Option<MaintenanceRecord>>;
    async fn insert_maintenance(&self, record: MaintenanceRecord) -> Result<WriteOutcome>;
    async fn replace_maintenance(&self, record: MaintenanceRecord) -> Result<WriteOutcome>;
    async fn delete_maintenance(&self, id: &Id) -> Result<DeleteOutcome>;
}

pub trait Store: BranchStore + VehicleStore + MaintenanceStore + Send + Sync {}
