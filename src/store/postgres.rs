use anyhow::{Context, Result};
use sqlx::{
    postgres::{PgPoolOptions, PgRow},
    PgPool, Row,
};

use crate::model::{
    Branch, BranchOrder, Id, MaintenanceOrder, MaintenanceRecord, Sort, Vehicle, VehicleOrder,
};
use crate::store::traits::{
    BranchStore, DeleteOutcome, MaintenanceStore, Store, VehicleStore, WriteOutcome,
};

const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";
const PLATE_CONSTRAINT: &str = "vehicles_plate_key";

const BRANCH_COLUMNS: &str = "id, name, address, city, region";
const VEHICLE_COLUMNS: &str = "id, plate, model, year, branch_id";
const MAINTENANCE_COLUMNS: &str = "id, vehicle_id, performed_at, description, cost";

#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Create a new PostgreSQL store with the given database URL
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .context("Failed to create PostgreSQL connection pool")?;

        Ok(Self { pool })
    }

    /// Run database migrations
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("Failed to run database migrations")?;
        Ok(())
    }
}

/// Constraint violations the database reports on its own; they back up
/// the in-transaction checks when two writers race.
enum Violation {
    Unique(Option<String>),
    ForeignKey,
}

fn violation(err: &sqlx::Error) -> Option<Violation> {
    let sqlx::Error::Database(db_err) = err else {
        return None;
    };
    match db_err.code().as_deref() {
        Some(UNIQUE_VIOLATION) => Some(Violation::Unique(
            db_err.constraint().map(|c| c.to_string()),
        )),
        Some(FOREIGN_KEY_VIOLATION) => Some(Violation::ForeignKey),
        _ => None,
    }
}

fn vehicle_write_outcome(err: sqlx::Error, action: &'static str) -> Result<WriteOutcome> {
    match violation(&err) {
        Some(Violation::Unique(Some(constraint))) if constraint == PLATE_CONSTRAINT => {
            Ok(WriteOutcome::DuplicatePlate)
        }
        Some(Violation::Unique(_)) => Ok(WriteOutcome::DuplicateId),
        Some(Violation::ForeignKey) => Ok(WriteOutcome::MissingReference),
        None => Err(err).context(action),
    }
}

fn branch_from_row(row: &PgRow) -> Result<Branch, sqlx::Error> {
    Ok(Branch {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        address: row.try_get("address")?,
        city: row.try_get("city")?,
        region: row.try_get("region")?,
    })
}

fn vehicle_from_row(row: &PgRow) -> Result<Vehicle, sqlx::Error> {
    Ok(Vehicle {
        id: row.try_get("id")?,
        plate: row.try_get("plate")?,
        model: row.try_get("model")?,
        year: row.try_get("year")?,
        branch_id: row.try_get("branch_id")?,
    })
}

fn maintenance_from_row(row: &PgRow) -> Result<MaintenanceRecord, sqlx::Error> {
    Ok(MaintenanceRecord {
        id: row.try_get("id")?,
        vehicle_id: row.try_get("vehicle_id")?,
        timestamp: row.try_get("performed_at")?,
        description: row.try_get("description")?,
        cost: row.try_get("cost")?,
    })
}

fn collect_rows<T>(
    rows: Vec<PgRow>,
    map: fn(&PgRow) -> Result<T, sqlx::Error>,
) -> Result<Vec<T>> {
    rows.iter()
        .map(map)
        .collect::<Result<Vec<_>, _>>()
        .context("Failed to decode row")
}

#[async_trait::async_trait]
impl BranchStore for PostgresStore {
    async fn list_branches(
        &self,
        sort: Sort<BranchOrder>,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Branch>> {
        let sql = format!(
            "SELECT {} FROM branches ORDER BY {} {}, id ASC LIMIT $1 OFFSET $2",
            BRANCH_COLUMNS,
            sort.key.column(),
            sort.direction_sql()
        );
        let rows = sqlx::query(&sql)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .context("Failed to list branches")?;

        collect_rows(rows, branch_from_row)
    }

    async fn count_branches(&self) -> Result<i64> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM branches")
            .fetch_one(&self.pool)
            .await
            .context("Failed to count branches")
    }

    async fn get_branch(&self, id: &Id) -> Result<Option<Branch>> {
        let sql = format!("SELECT {} FROM branches WHERE id = $1", BRANCH_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch branch")?;

        let Some(row) = row else {
            return Ok(None);
        };

        Ok(Some(branch_from_row(&row).context("Failed to decode branch")?))
    }

    async fn branch_exists(&self, id: &Id) -> Result<bool> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM branches WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .context("Failed to check branch existence")
    }

    async fn insert_branch(&self, branch: Branch) -> Result<WriteOutcome> {
        let result = sqlx::query(
            "INSERT INTO branches (id, name, address, city, region) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(branch.id)
        .bind(&branch.name)
        .bind(&branch.address)
        .bind(&branch.city)
        .bind(&branch.region)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(WriteOutcome::Applied),
            Err(err) => match violation(&err) {
                Some(Violation::Unique(_)) => Ok(WriteOutcome::DuplicateId),
                _ => Err(err).context("Failed to insert branch"),
            },
        }
    }

    async fn replace_branch(&self, branch: Branch) -> Result<WriteOutcome> {
        let result = sqlx::query(
            r#"
            UPDATE branches
            SET name = $2, address = $3, city = $4, region = $5
            WHERE id = $1
            "#,
        )
        .bind(branch.id)
        .bind(&branch.name)
        .bind(&branch.address)
        .bind(&branch.city)
        .bind(&branch.region)
        .execute(&self.pool)
        .await
        .context("Failed to replace branch")?;

        if result.rows_affected() == 0 {
            return Ok(WriteOutcome::NotFound);
        }
        Ok(WriteOutcome::Applied)
    }

    async fn delete_branch(&self, id: &Id) -> Result<DeleteOutcome> {
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;

        // Blocks vehicle inserts that hold FOR SHARE on the same branch.
        let locked = sqlx::query("SELECT id FROM branches WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .context("Failed to lock branch")?;
        if locked.is_none() {
            return Ok(DeleteOutcome::NotFound);
        }

        let dependents =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM vehicles WHERE branch_id = $1")
                .bind(id)
                .fetch_one(&mut *tx)
                .await
                .context("Failed to count branch vehicles")?;
        if dependents > 0 {
            return Ok(DeleteOutcome::Restricted {
                dependents: dependents as u64,
            });
        }

        let result = sqlx::query("DELETE FROM branches WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await;
        if let Err(err) = result {
            return match violation(&err) {
                Some(Violation::ForeignKey) => Ok(DeleteOutcome::Restricted { dependents: 1 }),
                _ => Err(err).context("Failed to delete branch"),
            };
        }

        tx.commit().await.context("Failed to commit branch delete")?;
        Ok(DeleteOutcome::Deleted { cascaded: 0 })
    }
}

#[async_trait::async_trait]
impl VehicleStore for PostgresStore {
    async fn list_vehicles(
        &self,
        sort: Sort<VehicleOrder>,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Vehicle>> {
        let sql = format!(
            "SELECT {} FROM vehicles ORDER BY {} {}, id ASC LIMIT $1 OFFSET $2",
            VEHICLE_COLUMNS,
            sort.key.column(),
            sort.direction_sql()
        );
        let rows = sqlx::query(&sql)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .context("Failed to list vehicles")?;

        collect_rows(rows, vehicle_from_row)
    }

    async fn count_vehicles(&self) -> Result<i64> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM vehicles")
            .fetch_one(&self.pool)
            .await
            .context("Failed to count vehicles")
    }

    async fn list_vehicles_for_branch(&self, branch_id: &Id) -> Result<Vec<Vehicle>> {
        let sql = format!(
            "SELECT {} FROM vehicles WHERE branch_id = $1 ORDER BY plate ASC, id ASC",
            VEHICLE_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(branch_id)
            .fetch_all(&self.pool)
            .await
            .context("Failed to list branch vehicles")?;

        collect_rows(rows, vehicle_from_row)
    }

    async fn count_vehicles_for_branch(&self, branch_id: &Id) -> Result<i64> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM vehicles WHERE branch_id = $1")
            .bind(branch_id)
            .fetch_one(&self.pool)
            .await
            .context("Failed to count branch vehicles")
    }

    async fn get_vehicle(&self, id: &Id) -> Result<Option<Vehicle>> {
        let sql = format!("SELECT {} FROM vehicles WHERE id = $1", VEHICLE_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch vehicle")?;

        let Some(row) = row else {
            return Ok(None);
        };

        Ok(Some(vehicle_from_row(&row).context("Failed to decode vehicle")?))
    }

    async fn vehicle_exists(&self, id: &Id) -> Result<bool> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM vehicles WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .context("Failed to check vehicle existence")
    }

    async fn plate_in_use(&self, plate: &str, except: Option<&Id>) -> Result<bool> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM vehicles WHERE plate = $1 AND ($2::uuid IS NULL OR id <> $2))",
        )
        .bind(plate)
        .bind(except.copied())
        .fetch_one(&self.pool)
        .await
        .context("Failed to check plate")
    }

    async fn insert_vehicle(&self, vehicle: Vehicle) -> Result<WriteOutcome> {
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;

        // Holding FOR SHARE keeps the branch alive until this insert commits.
        let branch = sqlx::query("SELECT id FROM branches WHERE id = $1 FOR SHARE")
            .bind(vehicle.branch_id)
            .fetch_optional(&mut *tx)
            .await
            .context("Failed to lock branch")?;
        if branch.is_none() {
            return Ok(WriteOutcome::MissingReference);
        }

        let taken = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM vehicles WHERE plate = $1)",
        )
        .bind(&vehicle.plate)
        .fetch_one(&mut *tx)
        .await
        .context("Failed to check plate")?;
        if taken {
            return Ok(WriteOutcome::DuplicatePlate);
        }

        let result = sqlx::query(
            "INSERT INTO vehicles (id, plate, model, year, branch_id) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(vehicle.id)
        .bind(&vehicle.plate)
        .bind(&vehicle.model)
        .bind(vehicle.year)
        .bind(vehicle.branch_id)
        .execute(&mut *tx)
        .await;
        if let Err(err) = result {
            return vehicle_write_outcome(err, "Failed to insert vehicle");
        }

        tx.commit().await.context("Failed to commit vehicle insert")?;
        Ok(WriteOutcome::Applied)
    }

    async fn replace_vehicle(&self, vehicle: Vehicle) -> Result<WriteOutcome> {
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;

        let current = sqlx::query("SELECT id FROM vehicles WHERE id = $1 FOR UPDATE")
            .bind(vehicle.id)
            .fetch_optional(&mut *tx)
            .await
            .context("Failed to lock vehicle")?;
        if current.is_none() {
            return Ok(WriteOutcome::NotFound);
        }

        let branch = sqlx::query("SELECT id FROM branches WHERE id = $1 FOR SHARE")
            .bind(vehicle.branch_id)
            .fetch_optional(&mut *tx)
            .await
            .context("Failed to lock branch")?;
        if branch.is_none() {
            return Ok(WriteOutcome::MissingReference);
        }

        let taken = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM vehicles WHERE plate = $1 AND id <> $2)",
        )
        .bind(&vehicle.plate)
        .bind(vehicle.id)
        .fetch_one(&mut *tx)
        .await
        .context("Failed to check plate")?;
        if taken {
            return Ok(WriteOutcome::DuplicatePlate);
        }

        let result = sqlx::query(
            r#"
            UPDATE vehicles
            SET plate = $2, model = $3, year = $4, branch_id = $5
            WHERE id = $1
            "#,
        )
        .bind(vehicle.id)
        .bind(&vehicle.plate)
        .bind(&vehicle.model)
        .bind(vehicle.year)
        .bind(vehicle.branch_id)
        .execute(&mut *tx)
        .await;
        if let Err(err) = result {
            return vehicle_write_outcome(err, "Failed to replace vehicle");
        }

        tx.commit().await.context("Failed to commit vehicle replace")?;
        Ok(WriteOutcome::Applied)
    }

    async fn delete_vehicle(&self, id: &Id) -> Result<DeleteOutcome> {
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;

        let locked = sqlx::query("SELECT id FROM vehicles WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .context("Failed to lock vehicle")?;
        if locked.is_none() {
            return Ok(DeleteOutcome::NotFound);
        }

        // Explicit so the cascade does not depend on the schema's ON DELETE clause.
        let cascaded = sqlx::query("DELETE FROM maintenance_records WHERE vehicle_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .context("Failed to delete vehicle maintenance records")?
            .rows_affected();

        sqlx::query("DELETE FROM vehicles WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .context("Failed to delete vehicle")?;

        tx.commit().await.context("Failed to commit vehicle delete")?;
        Ok(DeleteOutcome::Deleted { cascaded })
    }
}

#[async_trait::async_trait]
impl MaintenanceStore for PostgresStore {
    async fn list_maintenance(
        &self,
        sort: Sort<MaintenanceOrder>,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<MaintenanceRecord>> {
        let sql = format!(
            "SELECT {} FROM maintenance_records ORDER BY {} {}, id ASC LIMIT $1 OFFSET $2",
            MAINTENANCE_COLUMNS,
            sort.key.column(),
            sort.direction_sql()
        );
        let rows = sqlx::query(&sql)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .context("Failed to list maintenance records")?;

        collect_rows(rows, maintenance_from_row)
    }

    async fn count_maintenance(&self) -> Result<i64> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM maintenance_records")
            .fetch_one(&self.pool)
            .await
            .context("Failed to count maintenance records")
    }

    async fn list_maintenance_for_vehicle(
        &self,
        vehicle_id: &Id,
        sort: Sort<MaintenanceOrder>,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<MaintenanceRecord>> {
        let sql = format!(
            "SELECT {} FROM maintenance_records WHERE vehicle_id = $1 ORDER BY {} {}, id ASC LIMIT $2 OFFSET $3",
            MAINTENANCE_COLUMNS,
            sort.key.column(),
            sort.direction_sql()
        );
        let rows = sqlx::query(&sql)
            .bind(vehicle_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .context("Failed to list vehicle maintenance records")?;

        collect_rows(rows, maintenance_from_row)
    }

    async fn count_maintenance_for_vehicle(&self, vehicle_id: &Id) -> Result<i64> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM maintenance_records WHERE vehicle_id = $1",
        )
        .bind(vehicle_id)
        .fetch_one(&self.pool)
        .await
        .context("Failed to count vehicle maintenance records")
    }

    async fn get_maintenance(&self, id: &Id) -> Result<Option<MaintenanceRecord>> {
        let sql = format!(
            "SELECT {} FROM maintenance_records WHERE id = $1",
            MAINTENANCE_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch maintenance record")?;

        let Some(row) = row else {
            return Ok(None);
        };

        Ok(Some(
            maintenance_from_row(&row).context("Failed to decode maintenance record")?,
        ))
    }

    async fn insert_maintenance(&self, record: MaintenanceRecord) -> Result<WriteOutcome> {
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;

        let vehicle = sqlx::query("SELECT id FROM vehicles WHERE id = $1 FOR SHARE")
            .bind(record.vehicle_id)
            .fetch_optional(&mut *tx)
            .await
            .context("Failed to lock vehicle")?;
        if vehicle.is_none() {
            return Ok(WriteOutcome::MissingReference);
        }

        let result = sqlx::query(
            r#"
            INSERT INTO maintenance_records (id, vehicle_id, performed_at, description, cost)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(record.id)
        .bind(record.vehicle_id)
        .bind(record.timestamp)
        .bind(&record.description)
        .bind(record.cost)
        .execute(&mut *tx)
        .await;
        if let Err(err) = result {
            return match violation(&err) {
                Some(Violation::Unique(_)) => Ok(WriteOutcome::DuplicateId),
                Some(Violation::ForeignKey) => Ok(WriteOutcome::MissingReference),
                None => Err(err).context("Failed to insert maintenance record"),
            };
        }

        tx.commit().await.context("Failed to commit maintenance insert")?;
        Ok(WriteOutcome::Applied)
    }

    async fn replace_maintenance(&self, record: MaintenanceRecord) -> Result<WriteOutcome> {
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;

        let current = sqlx::query("SELECT id FROM maintenance_records WHERE id = $1 FOR UPDATE")
            .bind(record.id)
            .fetch_optional(&mut *tx)
            .await
            .context("Failed to lock maintenance record")?;
        if current.is_none() {
            return Ok(WriteOutcome::NotFound);
        }

        let vehicle = sqlx::query("SELECT id FROM vehicles WHERE id = $1 FOR SHARE")
            .bind(record.vehicle_id)
            .fetch_optional(&mut *tx)
            .await
            .context("Failed to lock vehicle")?;
        if vehicle.is_none() {
            return Ok(WriteOutcome::MissingReference);
        }

        sqlx::query(
            r#"
            UPDATE maintenance_records
            SET vehicle_id = $2, performed_at = $3, description = $4, cost = $5
            WHERE id = $1
            "#,
        )
        .bind(record.id)
        .bind(record.vehicle_id)
        .bind(record.timestamp)
        .bind(&record.description)
        .bind(record.cost)
        .execute(&mut *tx)
        .await
        .context("Failed to replace maintenance record")?;

        tx.commit().await.context("Failed to commit maintenance replace")?;
        Ok(WriteOutcome::Applied)
    }

    async fn delete_maintenance(&self, id: &Id) -> Result<DeleteOutcome> {
        let result = sqlx::query("DELETE FROM maintenance_records WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete maintenance record")?;

        if result.rows_affected() == 0 {
            return Ok(DeleteOutcome::NotFound);
        }
        Ok(DeleteOutcome::Deleted { cascaded: 0 })
    }
}

impl Store for PostgresStore {}
