use axum::{routing::get, Router};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

use crate::api::handlers;
use crate::store::traits::Store;

pub fn create_router<S: Store + 'static>() -> Router<Arc<S>> {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Branches
        .route(
            "/branches",
            get(handlers::list_branches::<S>).post(handlers::create_branch::<S>),
        )
        .route(
            "/branches/:id",
            get(handlers::get_branch::<S>)
                .put(handlers::replace_branch::<S>)
                .delete(handlers::delete_branch::<S>),
        )
        .route(
            "/branches/:id/vehicles",
            get(handlers::list_branch_vehicles::<S>),
        )
        // Vehicles
        .route(
            "/vehicles",
            get(handlers::list_vehicles::<S>).post(handlers::create_vehicle::<S>),
        )
        .route(
            "/vehicles/:id",
            get(handlers::get_vehicle::<S>)
                .put(handlers::replace_vehicle::<S>)
                .delete(handlers::delete_vehicle::<S>),
        )
        .route(
            "/vehicles/:id/maintenance",
            get(handlers::list_vehicle_maintenance::<S>),
        )
        // Maintenance records
        .route(
            "/maintenance",
            get(handlers::list_maintenance::<S>).post(handlers::create_maintenance::<S>),
        )
        .route(
            "/maintenance/:id",
            get(handlers::get_maintenance::<S>)
                .put(handlers::replace_maintenance::<S>)
                .delete(handlers::delete_maintenance::<S>),
        )
        .layer(ServiceBuilder::new().layer(CorsLayer::very_permissive()))
}
