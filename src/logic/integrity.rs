//! Gatekeeper for every mutation of the fleet store.
//!
//! Each operation validates the incoming record, pre-checks existence and
//! uniqueness through the store's read side, then hands the write to the
//! store. The store re-checks the same preconditions inside the write's own
//! transaction, so the pre-checks only give early, cheap answers; the
//! outcome returned by the store decides.

use chrono::SubsecRound;
use log::{debug, info, warn};

use crate::error::{FleetError, FleetResult};
use crate::model::{
    Branch, EntityKind, Id, MaintenanceRecord, Vehicle, MAX_YEAR, MIN_YEAR,
};
use crate::store::traits::{DeleteOutcome, Store, WriteOutcome};

pub const MAX_BRANCH_NAME: usize = 120;
pub const MAX_ADDRESS: usize = 200;
pub const MAX_CITY: usize = 50;
pub const MAX_REGION: usize = 2;
pub const MAX_PLATE: usize = 20;
pub const MAX_MODEL: usize = 50;
pub const MAX_DESCRIPTION: usize = 200;

fn require(value: &str, field: &str) -> FleetResult<()> {
    if value.trim().is_empty() {
        return Err(FleetError::validation(format!("{} is required", field)));
    }
    Ok(())
}

fn max_len(value: &str, field: &str, max: usize) -> FleetResult<()> {
    if value.chars().count() > max {
        return Err(FleetError::validation(format!(
            "{} must be at most {} characters",
            field, max
        )));
    }
    Ok(())
}

fn check_branch_fields(branch: &Branch) -> FleetResult<()> {
    require(&branch.name, "name")?;
    require(&branch.address, "address")?;
    require(&branch.city, "city")?;
    max_len(&branch.name, "name", MAX_BRANCH_NAME)?;
    max_len(&branch.address, "address", MAX_ADDRESS)?;
    max_len(&branch.city, "city", MAX_CITY)?;
    max_len(&branch.region, "region", MAX_REGION)
}

fn check_vehicle_fields(vehicle: &Vehicle) -> FleetResult<()> {
    if vehicle.plate.trim().is_empty() || vehicle.model.trim().is_empty() {
        return Err(FleetError::validation("plate and model are required"));
    }
    max_len(&vehicle.plate, "plate", MAX_PLATE)?;
    max_len(&vehicle.model, "model", MAX_MODEL)?;
    if !(MIN_YEAR..=MAX_YEAR).contains(&vehicle.year) {
        return Err(FleetError::validation(format!(
            "year must be between {} and {}",
            MIN_YEAR, MAX_YEAR
        )));
    }
    Ok(())
}

fn check_maintenance_fields(record: &MaintenanceRecord) -> FleetResult<()> {
    require(&record.description, "description")?;
    max_len(&record.description, "description", MAX_DESCRIPTION)?;
    if record.cost.is_sign_negative() && !record.cost.is_zero() {
        return Err(FleetError::validation("cost must not be negative"));
    }
    Ok(())
}

fn check_identity(path_id: &Id, body_id: &Id) -> FleetResult<()> {
    if path_id != body_id {
        return Err(FleetError::validation(format!(
            "Body id '{}' does not match path id '{}'",
            body_id, path_id
        )));
    }
    Ok(())
}

fn plate_conflict(plate: &str) -> FleetError {
    FleetError::conflict(format!("Plate '{}' is already registered", plate))
}

fn missing_branch(id: &Id) -> FleetError {
    FleetError::validation(format!("Branch '{}' does not exist", id))
}

fn missing_vehicle(id: &Id) -> FleetError {
    FleetError::validation(format!("Vehicle '{}' does not exist", id))
}

fn duplicate_id(kind: EntityKind, id: &Id) -> FleetError {
    FleetError::conflict(format!("{} '{}' already exists", kind.label(), id))
}

/// Integrity-checked create/replace/delete for branches, vehicles and
/// maintenance records.
pub struct IntegrityValidator;

impl IntegrityValidator {
    pub async fn create_branch<S: Store>(store: &S, branch: Branch) -> FleetResult<Branch> {
        check_branch_fields(&branch)?;

        match store.insert_branch(branch.clone()).await? {
            WriteOutcome::Applied => {
                info!("Created branch {} ({})", branch.id, branch.name);
                Ok(branch)
            }
            WriteOutcome::DuplicateId => Err(duplicate_id(EntityKind::Branch, &branch.id)),
            other => Err(anyhow::anyhow!("Unexpected branch insert outcome: {:?}", other).into()),
        }
    }

    pub async fn update_branch<S: Store>(
        store: &S,
        path_id: &Id,
        branch: Branch,
    ) -> FleetResult<Branch> {
        check_identity(path_id, &branch.id)?;
        if !store.branch_exists(path_id).await? {
            return Err(FleetError::not_found(EntityKind::Branch, path_id));
        }
        check_branch_fields(&branch)?;

        match store.replace_branch(branch.clone()).await? {
            WriteOutcome::Applied => {
                info!("Replaced branch {}", branch.id);
                Ok(branch)
            }
            WriteOutcome::NotFound => Err(FleetError::not_found(EntityKind::Branch, path_id)),
            other => Err(anyhow::anyhow!("Unexpected branch replace outcome: {:?}", other).into()),
        }
    }

    /// Restricted: fails with a conflict while any vehicle belongs to the branch.
    pub async fn delete_branch<S: Store>(store: &S, id: &Id) -> FleetResult<()> {
        if !store.branch_exists(id).await? {
            return Err(FleetError::not_found(EntityKind::Branch, id));
        }
        let vehicles = store.count_vehicles_for_branch(id).await?;
        if vehicles > 0 {
            warn!("Refusing to delete branch {}: {} vehicle(s) attached", id, vehicles);
            return Err(FleetError::conflict(format!(
                "Branch '{}' still has {} vehicle(s)",
                id, vehicles
            )));
        }

        match store.delete_branch(id).await? {
            DeleteOutcome::Deleted { .. } => {
                info!("Deleted branch {}", id);
                Ok(())
            }
            DeleteOutcome::NotFound => Err(FleetError::not_found(EntityKind::Branch, id)),
            DeleteOutcome::Restricted { dependents } => {
                warn!("Branch {} gained {} vehicle(s) before delete", id, dependents);
                Err(FleetError::conflict(format!(
                    "Branch '{}' still has {} vehicle(s)",
                    id, dependents
                )))
            }
        }
    }

    pub async fn create_vehicle<S: Store>(store: &S, vehicle: Vehicle) -> FleetResult<Vehicle> {
        check_vehicle_fields(&vehicle)?;
        if store.plate_in_use(&vehicle.plate, None).await? {
            debug!("Rejecting vehicle {}: plate {} taken", vehicle.id, vehicle.plate);
            return Err(plate_conflict(&vehicle.plate));
        }
        if !store.branch_exists(&vehicle.branch_id).await? {
            return Err(missing_branch(&vehicle.branch_id));
        }

        match store.insert_vehicle(vehicle.clone()).await? {
            WriteOutcome::Applied => {
                info!("Created vehicle {} ({})", vehicle.id, vehicle.plate);
                Ok(vehicle)
            }
            WriteOutcome::DuplicatePlate => Err(plate_conflict(&vehicle.plate)),
            WriteOutcome::MissingReference => Err(missing_branch(&vehicle.branch_id)),
            WriteOutcome::DuplicateId => Err(duplicate_id(EntityKind::Vehicle, &vehicle.id)),
            WriteOutcome::NotFound => {
                Err(anyhow::anyhow!("Unexpected vehicle insert outcome: NotFound").into())
            }
        }
    }

    /// Replaces a vehicle; the branch reference and plate uniqueness are
    /// re-validated just like on create.
    pub async fn update_vehicle<S: Store>(
        store: &S,
        path_id: &Id,
        vehicle: Vehicle,
    ) -> FleetResult<Vehicle> {
        check_identity(path_id, &vehicle.id)?;
        if !store.vehicle_exists(path_id).await? {
            return Err(FleetError::not_found(EntityKind::Vehicle, path_id));
        }
        check_vehicle_fields(&vehicle)?;
        if store.plate_in_use(&vehicle.plate, Some(&vehicle.id)).await? {
            return Err(plate_conflict(&vehicle.plate));
        }
        if !store.branch_exists(&vehicle.branch_id).await? {
            return Err(missing_branch(&vehicle.branch_id));
        }

        match store.replace_vehicle(vehicle.clone()).await? {
            WriteOutcome::Applied => {
                info!("Replaced vehicle {}", vehicle.id);
                Ok(vehicle)
            }
            WriteOutcome::NotFound => Err(FleetError::not_found(EntityKind::Vehicle, path_id)),
            WriteOutcome::DuplicatePlate => Err(plate_conflict(&vehicle.plate)),
            WriteOutcome::MissingReference => Err(missing_branch(&vehicle.branch_id)),
            WriteOutcome::DuplicateId => Err(duplicate_id(EntityKind::Vehicle, &vehicle.id)),
        }
    }

    /// Deletes the vehicle and all of its maintenance records in one step.
    /// Returns how many maintenance records went with it.
    pub async fn delete_vehicle<S: Store>(store: &S, id: &Id) -> FleetResult<u64> {
        match store.delete_vehicle(id).await? {
            DeleteOutcome::Deleted { cascaded } => {
                info!("Deleted vehicle {} and {} maintenance record(s)", id, cascaded);
                Ok(cascaded)
            }
            DeleteOutcome::NotFound => Err(FleetError::not_found(EntityKind::Vehicle, id)),
            DeleteOutcome::Restricted { .. } => {
                Err(anyhow::anyhow!("Vehicle delete cannot be restricted").into())
            }
        }
    }

    /// The timestamp is kept to microsecond precision, the finest the
    /// PostgreSQL backend stores, so the echoed record equals what a later
    /// read returns.
    pub async fn create_maintenance<S: Store>(
        store: &S,
        mut record: MaintenanceRecord,
    ) -> FleetResult<MaintenanceRecord> {
        record.timestamp = record.timestamp.trunc_subsecs(6);
        if !store.vehicle_exists(&record.vehicle_id).await? {
            return Err(missing_vehicle(&record.vehicle_id));
        }
        check_maintenance_fields(&record)?;

        match store.insert_maintenance(record.clone()).await? {
            WriteOutcome::Applied => {
                info!("Recorded maintenance {} for vehicle {}", record.id, record.vehicle_id);
                Ok(record)
            }
            WriteOutcome::MissingReference => Err(missing_vehicle(&record.vehicle_id)),
            WriteOutcome::DuplicateId => Err(duplicate_id(EntityKind::Maintenance, &record.id)),
            other => Err(
                anyhow::anyhow!("Unexpected maintenance insert outcome: {:?}", other).into(),
            ),
        }
    }

    /// Replaces a maintenance record; the vehicle reference is re-validated.
    pub async fn update_maintenance<S: Store>(
        store: &S,
        path_id: &Id,
        mut record: MaintenanceRecord,
    ) -> FleetResult<MaintenanceRecord> {
        check_identity(path_id, &record.id)?;
        record.timestamp = record.timestamp.trunc_subsecs(6);
        if store.get_maintenance(path_id).await?.is_none() {
            return Err(FleetError::not_found(EntityKind::Maintenance, path_id));
        }
        check_maintenance_fields(&record)?;
        if !store.vehicle_exists(&record.vehicle_id).await? {
            return Err(missing_vehicle(&record.vehicle_id));
        }

        match store.replace_maintenance(record.clone()).await? {
            WriteOutcome::Applied => {
                info!("Replaced maintenance record {}", record.id);
                Ok(record)
            }
            WriteOutcome::NotFound => {
                Err(FleetError::not_found(EntityKind::Maintenance, path_id))
            }
            WriteOutcome::MissingReference => Err(missing_vehicle(&record.vehicle_id)),
            other => Err(
                anyhow::anyhow!("Unexpected maintenance replace outcome: {:?}", other).into(),
            ),
        }
    }

    pub async fn delete_maintenance<S: Store>(store: &S, id: &Id) -> FleetResult<()> {
        match store.delete_maintenance(id).await? {
            DeleteOutcome::Deleted { .. } => {
                info!("Deleted maintenance record {}", id);
                Ok(())
            }
            DeleteOutcome::NotFound => Err(FleetError::not_found(EntityKind::Maintenance, id)),
            DeleteOutcome::Restricted { .. } => {
                Err(anyhow::anyhow!("Maintenance delete cannot be restricted").into())
            }
        }
    }
}
