use serde::{Deserialize, Serialize};

use crate::error::{FleetError, FleetResult};
use crate::logic::links::{with_links, Resource};
use crate::logic::pagination::{
    navigation_links, NavigationLinks, PageRequest, DEFAULT_PAGE_NUMBER, DEFAULT_PAGE_SIZE,
};
use crate::model::{
    Branch, BranchOrder, EntityKind, Id, MaintenanceOrder, MaintenanceRecord, Sort, Vehicle,
    VehicleOrder,
};
use crate::store::traits::Store;

fn default_page_number() -> i64 {
    DEFAULT_PAGE_NUMBER
}

fn default_page_size() -> i64 {
    DEFAULT_PAGE_SIZE
}

/// Query string of a paginated, sortable collection.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery<K> {
    #[serde(default = "default_page_number")]
    pub page_number: i64,
    #[serde(default = "default_page_size")]
    pub page_size: i64,
    pub order_by: Option<K>,
    pub descending: Option<bool>,
}

impl<K> Default for ListQuery<K> {
    fn default() -> Self {
        Self {
            page_number: DEFAULT_PAGE_NUMBER,
            page_size: DEFAULT_PAGE_SIZE,
            order_by: None,
            descending: None,
        }
    }
}

impl<K: Copy> ListQuery<K>
where
    Sort<K>: Default,
{
    pub fn page(&self) -> FleetResult<PageRequest> {
        PageRequest::new(self.page_number, self.page_size)
    }

    /// Requested ordering, falling back to the entity's default order.
    pub fn sort(&self) -> Sort<K> {
        let default = Sort::<K>::default();
        match (self.order_by, self.descending) {
            (Some(key), descending) => Sort {
                key,
                descending: descending.unwrap_or(false),
            },
            (None, Some(descending)) => Sort {
                key: default.key,
                descending,
            },
            (None, None) => default,
        }
    }
}

/// Where the collection was requested from; navigation links are built on it.
#[derive(Debug, Clone, Copy)]
pub struct RequestTarget<'a> {
    pub path: &'a str,
    pub query: Option<&'a str>,
}

/// One page of a collection with item and navigation links.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<Resource<T>>,
    pub total_count: i64,
    #[serde(rename = "_links")]
    pub links: NavigationLinks,
}

/// Read-only access to the fleet store. Nothing here writes.
pub struct FleetQueries;

impl FleetQueries {
    pub async fn list_branches<S: Store>(
        store: &S,
        query: &ListQuery<BranchOrder>,
        target: RequestTarget<'_>,
    ) -> FleetResult<Page<Branch>> {
        let page = query.page()?;
        let total_count = store.count_branches().await?;
        let window = page.window(total_count)?;
        let items = store
            .list_branches(query.sort(), window.offset, window.limit)
            .await?;

        Ok(Page {
            items: with_links(items),
            total_count,
            links: navigation_links(target.path, target.query, page.page_number(), window.total_pages),
        })
    }

    pub async fn get_branch<S: Store>(store: &S, id: &Id) -> FleetResult<Resource<Branch>> {
        store
            .get_branch(id)
            .await?
            .map(Resource::new)
            .ok_or_else(|| FleetError::not_found(EntityKind::Branch, id))
    }

    /// Every vehicle of a branch, unpaginated.
    pub async fn branch_vehicles<S: Store>(
        store: &S,
        branch_id: &Id,
    ) -> FleetResult<Vec<Resource<Vehicle>>> {
        if !store.branch_exists(branch_id).await? {
            return Err(FleetError::not_found(EntityKind::Branch, branch_id));
        }
        Ok(with_links(store.list_vehicles_for_branch(branch_id).await?))
    }

    pub async fn list_vehicles<S: Store>(
        store: &S,
        query: &ListQuery<VehicleOrder>,
        target: RequestTarget<'_>,
    ) -> FleetResult<Page<Vehicle>> {
        let page = query.page()?;
        let total_count = store.count_vehicles().await?;
        let window = page.window(total_count)?;
        let items = store
            .list_vehicles(query.sort(), window.offset, window.limit)
            .await?;

        Ok(Page {
            items: with_links(items),
            total_count,
            links: navigation_links(target.path, target.query, page.page_number(), window.total_pages),
        })
    }

    pub async fn get_vehicle<S: Store>(store: &S, id: &Id) -> FleetResult<Resource<Vehicle>> {
        store
            .get_vehicle(id)
            .await?
            .map(Resource::new)
            .ok_or_else(|| FleetError::not_found(EntityKind::Vehicle, id))
    }

    /// Maintenance history of one vehicle, always most recent first; any
    /// `orderBy`/`descending` in the query is ignored. An unknown vehicle is
    /// reported before any pagination problem.
    pub async fn vehicle_maintenance<S: Store>(
        store: &S,
        vehicle_id: &Id,
        query: &ListQuery<MaintenanceOrder>,
        target: RequestTarget<'_>,
    ) -> FleetResult<Page<MaintenanceRecord>> {
        if !store.vehicle_exists(vehicle_id).await? {
            return Err(FleetError::not_found(EntityKind::Vehicle, vehicle_id));
        }
        let page = query.page()?;
        let total_count = store.count_maintenance_for_vehicle(vehicle_id).await?;
        let window = page.window(total_count)?;
        let items = store
            .list_maintenance_for_vehicle(
                vehicle_id,
                Sort::<MaintenanceOrder>::default(),
                window.offset,
                window.limit,
            )
            .await?;

        Ok(Page {
            items: with_links(items),
            total_count,
            links: navigation_links(target.path, target.query, page.page_number(), window.total_pages),
        })
    }

    pub async fn list_maintenance<S: Store>(
        store: &S,
        query: &ListQuery<MaintenanceOrder>,
        target: RequestTarget<'_>,
    ) -> FleetResult<Page<MaintenanceRecord>> {
        let page = query.page()?;
        let total_count = store.count_maintenance().await?;
        let window = page.window(total_count)?;
        let items = store
            .list_maintenance(query.sort(), window.offset, window.limit)
            .await?;

        Ok(Page {
            items: with_links(items),
            total_count,
            links: navigation_links(target.path, target.query, page.page_number(), window.total_pages),
        })
    }

    pub async fn get_maintenance<S: Store>(
        store: &S,
        id: &Id,
    ) -> FleetResult<Resource<MaintenanceRecord>> {
        store
            .get_maintenance(id)
            .await?
            .map(Resource::new)
            .ok_or_else(|| FleetError::not_found(EntityKind::Maintenance, id))
    }
}
