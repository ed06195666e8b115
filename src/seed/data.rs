use anyhow::Result;
use chrono::{Duration, Utc};
use log::info;
use rust_decimal::Decimal;

use crate::logic::IntegrityValidator;
use crate::model::{Branch, MaintenanceRecord, Vehicle};
use crate::store::traits::Store;

/// Loads the demonstration fleet: two branches, three vehicles and a short
/// maintenance history. Skipped entirely when any branch already exists so
/// user data is never mixed with the demo set.
pub async fn load_seed_data<S: Store>(store: &S) -> Result<()> {
    if store.count_branches().await? > 0 {
        info!("Branches already present - skipping seed data");
        return Ok(());
    }

    let centro = IntegrityValidator::create_branch(
        store,
        Branch::new("Filial Centro", "Rua A, 100", "São Paulo"),
    )
    .await?;
    let zona_sul = IntegrityValidator::create_branch(
        store,
        Branch::new("Filial Zona Sul", "Av. B, 200", "São Paulo"),
    )
    .await?;

    let cg = IntegrityValidator::create_vehicle(
        store,
        Vehicle::new("ABC1D23", "Honda CG 160", 2022, centro.id),
    )
    .await?;
    IntegrityValidator::create_vehicle(
        store,
        Vehicle::new("EFG4H56", "Yamaha Factor 150", 2021, centro.id),
    )
    .await?;
    let biz = IntegrityValidator::create_vehicle(
        store,
        Vehicle::new("IJK7L89", "Honda Biz 125", 2020, zona_sul.id),
    )
    .await?;

    let now = Utc::now();
    let history = [
        (cg.id, 10, "Troca de óleo", 120),
        (cg.id, 5, "Ajuste de corrente", 80),
        (biz.id, 2, "Pastilha de freio", 150),
    ];
    for (vehicle_id, days_ago, description, cost) in history {
        let record = MaintenanceRecord::new(vehicle_id, description, Decimal::from(cost))
            .at(now - Duration::days(days_ago));
        IntegrityValidator::create_maintenance(store, record).await?;
    }

    info!("Seeded 2 branches, 3 vehicles and {} maintenance records", history.len());
    Ok(())
}
