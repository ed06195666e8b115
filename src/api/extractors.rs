use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Path, Query, Request},
    http::request::Parts,
    Json,
};
use serde::de::DeserializeOwned;

use crate::error::{FleetError, FleetResult};
use crate::logic::listing::ListQuery;
use crate::model::Id;

/// The `:id` segment of an entity route.
///
/// A segment that is not a UUID cannot name any stored entity, so it is
/// rejected as not found rather than as a bad request.
#[derive(Debug, Clone, Copy)]
pub struct EntityId(pub Id);

#[async_trait]
impl<S> FromRequestParts<S> for EntityId
where
    S: Send + Sync,
{
    type Rejection = FleetError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| FleetError::validation(rejection.body_text()))?;

        Id::parse_str(&raw)
            .map(EntityId)
            .map_err(|_| FleetError::NotFound(format!("'{}' is not a valid id", raw)))
    }
}

/// JSON request body whose decoding failures surface as validation errors.
#[derive(Debug)]
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = FleetError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| FleetError::validation(rejection.body_text()))?;
        Ok(JsonBody(value))
    }
}

/// Paging and ordering parameters of a collection request, together with
/// the path and raw query they came from.
///
/// A malformed query string does not reject the request here; the handler
/// decides when to surface it, so that a missing parent can be reported
/// first.
#[derive(Debug)]
pub struct ListParams<K> {
    pub path: String,
    pub raw_query: Option<String>,
    pub query: FleetResult<ListQuery<K>>,
}

/// A query string that fails to decode is a paging error when one of the
/// paging parameters is not an integer, and a plain validation error
/// otherwise (for example an unknown `orderBy`).
fn query_error(raw_query: Option<&str>, message: String) -> FleetError {
    let bad_paging = raw_query
        .unwrap_or_default()
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .any(|(key, value)| {
            (key == "pageNumber" || key == "pageSize") && value.parse::<i64>().is_err()
        });
    if bad_paging {
        FleetError::InvalidPagination(message)
    } else {
        FleetError::Validation(message)
    }
}

#[async_trait]
impl<S, K> FromRequestParts<S> for ListParams<K>
where
    S: Send + Sync,
    K: DeserializeOwned + Send,
{
    type Rejection = FleetError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let query = Query::<ListQuery<K>>::from_request_parts(parts, state)
            .await
            .map(|Query(query)| query)
            .map_err(|rejection| query_error(parts.uri.query(), rejection.body_text()));

        Ok(ListParams {
            path: parts.uri.path().to_string(),
            raw_query: parts.uri.query().map(str::to_string),
            query,
        })
    }
}
