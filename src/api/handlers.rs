use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
};
use log::error;
use serde::Serialize;
use std::sync::Arc;

use crate::api::extractors::{EntityId, JsonBody, ListParams};
use crate::error::{FleetError, FleetResult};
use crate::logic::{FleetQueries, IntegrityValidator, Linked, Page, RequestTarget, Resource};
use crate::model::{
    Branch, BranchOrder, MaintenanceOrder, MaintenanceRecord, Vehicle, VehicleOrder,
};
use crate::store::traits::Store;

pub type AppState<S> = Arc<S>;

/// Simple health check endpoint
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: &str) -> Self {
        Self {
            error: message.to_string(),
        }
    }
}

impl IntoResponse for FleetError {
    fn into_response(self) -> Response {
        let status = match &self {
            FleetError::InvalidPagination(_) | FleetError::Validation(_) => StatusCode::BAD_REQUEST,
            FleetError::Conflict(_) => StatusCode::CONFLICT,
            FleetError::NotFound(_) => return StatusCode::NOT_FOUND.into_response(),
            FleetError::Store(e) => {
                error!("Store failure: {:#}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(ErrorResponse::new(&self.to_string()))).into_response()
    }
}

/// `201 Created` with a `Location` header pointing at the new resource.
fn created<T: Linked + Serialize>(item: T) -> Response {
    let location = item.self_path();
    (
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(Resource::new(item)),
    )
        .into_response()
}

// Branches

pub async fn list_branches<S: Store>(
    State(store): State<AppState<S>>,
    params: ListParams<BranchOrder>,
) -> FleetResult<Json<Page<Branch>>> {
    let ListParams { path, raw_query, query } = params;
    let target = RequestTarget {
        path: &path,
        query: raw_query.as_deref(),
    };
    let page = FleetQueries::list_branches(&*store, &query?, target).await?;
    Ok(Json(page))
}

pub async fn get_branch<S: Store>(
    State(store): State<AppState<S>>,
    EntityId(id): EntityId,
) -> FleetResult<Json<Resource<Branch>>> {
    Ok(Json(FleetQueries::get_branch(&*store, &id).await?))
}

pub async fn list_branch_vehicles<S: Store>(
    State(store): State<AppState<S>>,
    EntityId(id): EntityId,
) -> FleetResult<Json<Vec<Resource<Vehicle>>>> {
    Ok(Json(FleetQueries::branch_vehicles(&*store, &id).await?))
}

pub async fn create_branch<S: Store>(
    State(store): State<AppState<S>>,
    JsonBody(branch): JsonBody<Branch>,
) -> FleetResult<Response> {
    let branch = IntegrityValidator::create_branch(&*store, branch).await?;
    Ok(created(branch))
}

pub async fn replace_branch<S: Store>(
    State(store): State<AppState<S>>,
    EntityId(id): EntityId,
    JsonBody(branch): JsonBody<Branch>,
) -> FleetResult<StatusCode> {
    IntegrityValidator::update_branch(&*store, &id, branch).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_branch<S: Store>(
    State(store): State<AppState<S>>,
    EntityId(id): EntityId,
) -> FleetResult<StatusCode> {
    IntegrityValidator::delete_branch(&*store, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// Vehicles

pub async fn list_vehicles<S: Store>(
    State(store): State<AppState<S>>,
    params: ListParams<VehicleOrder>,
) -> FleetResult<Json<Page<Vehicle>>> {
    let ListParams { path, raw_query, query } = params;
    let target = RequestTarget {
        path: &path,
        query: raw_query.as_deref(),
    };
    let page = FleetQueries::list_vehicles(&*store, &query?, target).await?;
    Ok(Json(page))
}

pub async fn get_vehicle<S: Store>(
    State(store): State<AppState<S>>,
    EntityId(id): EntityId,
) -> FleetResult<Json<Resource<Vehicle>>> {
    Ok(Json(FleetQueries::get_vehicle(&*store, &id).await?))
}

pub async fn list_vehicle_maintenance<S: Store>(
    State(store): State<AppState<S>>,
    EntityId(id): EntityId,
    params: ListParams<MaintenanceOrder>,
) -> FleetResult<Json<Page<MaintenanceRecord>>> {
    let ListParams { path, raw_query, query } = params;
    let query = match query {
        Ok(query) => query,
        Err(err) => {
            // An unknown vehicle is reported ahead of a malformed query string.
            FleetQueries::get_vehicle(&*store, &id).await?;
            return Err(err);
        }
    };
    let target = RequestTarget {
        path: &path,
        query: raw_query.as_deref(),
    };
    let page = FleetQueries::vehicle_maintenance(&*store, &id, &query, target).await?;
    Ok(Json(page))
}

pub async fn create_vehicle<S: Store>(
    State(store): State<AppState<S>>,
    JsonBody(vehicle): JsonBody<Vehicle>,
) -> FleetResult<Response> {
    let vehicle = IntegrityValidator::create_vehicle(&*store, vehicle).await?;
    Ok(created(vehicle))
}

pub async fn replace_vehicle<S: Store>(
    State(store): State<AppState<S>>,
    EntityId(id): EntityId,
    JsonBody(vehicle): JsonBody<Vehicle>,
) -> FleetResult<StatusCode> {
    IntegrityValidator::update_vehicle(&*store, &id, vehicle).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_vehicle<S: Store>(
    State(store): State<AppState<S>>,
    EntityId(id): EntityId,
) -> FleetResult<StatusCode> {
    IntegrityValidator::delete_vehicle(&*store, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// Maintenance records

pub async fn list_maintenance<S: Store>(
    State(store): State<AppState<S>>,
    params: ListParams<MaintenanceOrder>,
) -> FleetResult<Json<Page<MaintenanceRecord>>> {
    let ListParams { path, raw_query, query } = params;
    let target = RequestTarget {
        path: &path,
        query: raw_query.as_deref(),
    };
    let page = FleetQueries::list_maintenance(&*store, &query?, target).await?;
    Ok(Json(page))
}

pub async fn get_maintenance<S: Store>(
    State(store): State<AppState<S>>,
    EntityId(id): EntityId,
) -> FleetResult<Json<Resource<MaintenanceRecord>>> {
    Ok(Json(FleetQueries::get_maintenance(&*store, &id).await?))
}

pub async fn create_maintenance<S: Store>(
    State(store): State<AppState<S>>,
    JsonBody(record): JsonBody<MaintenanceRecord>,
) -> FleetResult<Response> {
    let record = IntegrityValidator::create_maintenance(&*store, record).await?;
    Ok(created(record))
}

pub async fn replace_maintenance<S: Store>(
    State(store): State<AppState<S>>,
    EntityId(id): EntityId,
    JsonBody(record): JsonBody<MaintenanceRecord>,
) -> FleetResult<StatusCode> {
    IntegrityValidator::update_maintenance(&*store, &id, record).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_maintenance<S: Store>(
    State(store): State<AppState<S>>,
    EntityId(id): EntityId,
) -> FleetResult<StatusCode> {
    IntegrityValidator::delete_maintenance(&*store, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}
