use neomoto::MemoryStore;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::net::TcpListener;

// Test client wrapper for making API calls
struct TestClient {
    client: Client,
    base_url: String,
}

impl TestClient {
    fn new(base_url: String) -> Self {
        Self {
            client: Client::new(),
            base_url,
        }
    }

    async fn post(&self, path: &str, json: Value) -> reqwest::Result<reqwest::Response> {
        self.client
            .post(&format!("{}{}", self.base_url, path))
            .json(&json)
            .send()
            .await
    }

    async fn put(&self, path: &str, json: Value) -> reqwest::Result<reqwest::Response> {
        self.client
            .put(&format!("{}{}", self.base_url, path))
            .json(&json)
            .send()
            .await
    }

    async fn get(&self, path: &str) -> reqwest::Result<reqwest::Response> {
        self.client
            .get(&format!("{}{}", self.base_url, path))
            .send()
            .await
    }

    async fn delete(&self, path: &str) -> reqwest::Result<reqwest::Response> {
        self.client
            .delete(&format!("{}{}", self.base_url, path))
            .send()
            .await
    }

    async fn get_json(&self, path: &str) -> Value {
        let response = self.get(path).await.expect("request failed");
        assert_eq!(response.status(), StatusCode::OK, "GET {}", path);
        response.json().await.expect("invalid JSON")
    }

    /// POSTs and returns the created resource, asserting 201 + Location.
    async fn create(&self, path: &str, json: Value) -> Value {
        let response = self.post(path, json).await.expect("request failed");
        assert_eq!(response.status(), StatusCode::CREATED, "POST {}", path);
        let location = response
            .headers()
            .get("location")
            .expect("missing Location header")
            .to_str()
            .unwrap()
            .to_string();
        let body: Value = response.json().await.expect("invalid JSON");
        assert_eq!(body["_links"]["self"], location);
        body
    }
}

/// Starts the API on an ephemeral port backed by a fresh in-memory store.
async fn spawn_app() -> TestClient {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    tokio::spawn(neomoto::serve(Arc::new(MemoryStore::new()), listener));
    TestClient::new(format!("http://{}", address))
}

async fn create_branch(client: &TestClient, name: &str) -> Value {
    client
        .create(
            "/branches",
            json!({"name": name, "address": "Rua A, 100", "city": "São Paulo"}),
        )
        .await
}

async fn create_vehicle(client: &TestClient, plate: &str, branch_id: &Value) -> Value {
    client
        .create(
            "/vehicles",
            json!({"plate": plate, "model": "Honda CG 160", "year": 2022, "branchId": branch_id}),
        )
        .await
}

async fn create_record(client: &TestClient, vehicle_id: &Value, timestamp: &str) -> Value {
    client
        .create(
            "/maintenance",
            json!({
                "vehicleId": vehicle_id,
                "timestamp": timestamp,
                "description": "Troca de óleo",
                "cost": 120.5
            }),
        )
        .await
}

async fn assert_empty_not_found(response: reqwest::Response) {
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(response.text().await.unwrap().is_empty());
}

async fn assert_bad_request(response: reqwest::Response) {
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"].as_str().is_some_and(|m| !m.is_empty()));
}

#[tokio::test]
async fn test_health_check() {
    let client = spawn_app().await;
    let body = client.get_json("/health").await;
    assert_eq!(body["status"], "healthy");
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn test_branch_paging_and_navigation_links() {
    let client = spawn_app().await;
    for i in 0..25 {
        create_branch(&client, &format!("Filial {:02}", i)).await;
    }

    let first = client.get_json("/branches?pageNumber=1&pageSize=10").await;
    assert_eq!(first["totalCount"], 25);
    assert_eq!(first["items"].as_array().unwrap().len(), 10);
    assert_eq!(first["items"][0]["name"], "Filial 00");
    assert_eq!(first["_links"]["self"], "/branches?pageNumber=1&pageSize=10");
    assert_eq!(first["_links"]["next"], "/branches?pageNumber=2&pageSize=10");
    assert_eq!(first["_links"]["last"], "/branches?pageNumber=3&pageSize=10");
    assert!(first["_links"].get("prev").is_none());
    assert!(first["_links"].get("first").is_none());

    let last = client.get_json("/branches?pageNumber=3&pageSize=10").await;
    assert_eq!(last["items"].as_array().unwrap().len(), 5);
    assert_eq!(last["_links"]["prev"], "/branches?pageNumber=2&pageSize=10");
    assert_eq!(last["_links"]["first"], "/branches?pageNumber=1&pageSize=10");
    assert!(last["_links"].get("next").is_none());

    let beyond = client.get_json("/branches?pageNumber=9&pageSize=10").await;
    assert!(beyond["items"].as_array().unwrap().is_empty());
    assert_eq!(beyond["totalCount"], 25);

    let defaults = client.get_json("/branches").await;
    assert_eq!(defaults["items"].as_array().unwrap().len(), 10);
    assert_eq!(defaults["_links"]["self"], "/branches?pageNumber=1");
}

#[tokio::test]
async fn test_invalid_pagination_is_rejected() {
    let client = spawn_app().await;
    for path in [
        "/branches?pageNumber=0&pageSize=10",
        "/vehicles?pageNumber=1&pageSize=0",
        "/maintenance?pageNumber=1&pageSize=101",
        "/branches?pageNumber=abc",
    ] {
        assert_bad_request(client.get(path).await.unwrap()).await;
    }
}

#[tokio::test]
async fn test_created_resources_round_trip_with_links() {
    let client = spawn_app().await;
    let branch = create_branch(&client, "Filial Centro").await;
    assert_eq!(branch["region"], "SP");
    let branch_id = branch["id"].as_str().unwrap();
    assert_eq!(branch["_links"]["vehicles"], format!("/branches/{}/vehicles", branch_id));

    let vehicle = create_vehicle(&client, "ABC1D23", &branch["id"]).await;
    let vehicle_id = vehicle["id"].as_str().unwrap();
    assert_eq!(vehicle["_links"]["branch"], format!("/branches/{}", branch_id));
    assert_eq!(
        vehicle["_links"]["maintenance"],
        format!("/vehicles/{}/maintenance", vehicle_id)
    );

    let record = create_record(&client, &vehicle["id"], "2025-01-10T10:00:00Z").await;
    assert_eq!(record["_links"]["vehicle"], format!("/vehicles/{}", vehicle_id));

    let fetched = client
        .get_json(&format!("/maintenance/{}", record["id"].as_str().unwrap()))
        .await;
    assert_eq!(fetched, record);
    assert_eq!(fetched["cost"].as_f64(), Some(120.5));

    let fetched = client.get_json(&format!("/vehicles/{}", vehicle_id)).await;
    assert_eq!(fetched, vehicle);
}

#[tokio::test]
async fn test_plate_is_unique_until_released() {
    let client = spawn_app().await;
    let branch = create_branch(&client, "Filial Centro").await;
    let first = create_vehicle(&client, "ABC1D23", &branch["id"]).await;

    let duplicate = client
        .post(
            "/vehicles",
            json!({"plate": "ABC1D23", "model": "Yamaha Factor 150", "year": 2021, "branchId": branch["id"]}),
        )
        .await
        .unwrap();
    assert_eq!(duplicate.status(), StatusCode::CONFLICT);

    let deleted = client
        .delete(&format!("/vehicles/{}", first["id"].as_str().unwrap()))
        .await
        .unwrap();
    assert_eq!(deleted.status(), StatusCode::NO_CONTENT);

    create_vehicle(&client, "ABC1D23", &branch["id"]).await;
}

#[tokio::test]
async fn test_dangling_references_are_rejected() {
    let client = spawn_app().await;
    let missing = json!(uuid::Uuid::new_v4());

    let response = client
        .post(
            "/vehicles",
            json!({"plate": "ABC1D23", "model": "Honda CG 160", "year": 2022, "branchId": missing}),
        )
        .await
        .unwrap();
    assert_bad_request(response).await;

    let response = client
        .post(
            "/maintenance",
            json!({"vehicleId": missing, "description": "Troca de óleo", "cost": 120}),
        )
        .await
        .unwrap();
    assert_bad_request(response).await;

    let listed = client.get_json("/vehicles").await;
    assert_eq!(listed["totalCount"], 0);
}

#[tokio::test]
async fn test_branch_delete_is_restricted_by_vehicles() {
    let client = spawn_app().await;
    let branch = create_branch(&client, "Filial Centro").await;
    let branch_path = format!("/branches/{}", branch["id"].as_str().unwrap());
    let vehicle = create_vehicle(&client, "ABC1D23", &branch["id"]).await;

    let response = client.delete(&branch_path).await.unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    client.get_json(&branch_path).await;

    let vehicles = client.get_json(&format!("{}/vehicles", branch_path)).await;
    assert_eq!(vehicles.as_array().unwrap().len(), 1);
    assert_eq!(vehicles[0]["plate"], "ABC1D23");

    client
        .delete(&format!("/vehicles/{}", vehicle["id"].as_str().unwrap()))
        .await
        .unwrap();
    let response = client.delete(&branch_path).await.unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_empty_not_found(client.get(&branch_path).await.unwrap()).await;
}

#[tokio::test]
async fn test_vehicle_delete_cascades_to_maintenance() {
    let client = spawn_app().await;
    let branch = create_branch(&client, "Filial Centro").await;
    let vehicle = create_vehicle(&client, "ABC1D23", &branch["id"]).await;
    let vehicle_path = format!("/vehicles/{}", vehicle["id"].as_str().unwrap());
    let first = create_record(&client, &vehicle["id"], "2025-01-01T08:00:00Z").await;
    let second = create_record(&client, &vehicle["id"], "2025-02-01T08:00:00Z").await;

    let response = client.delete(&vehicle_path).await.unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    for record in [first, second] {
        let path = format!("/maintenance/{}", record["id"].as_str().unwrap());
        assert_empty_not_found(client.get(&path).await.unwrap()).await;
    }
    assert_empty_not_found(
        client
            .get(&format!("{}/maintenance", vehicle_path))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(client.get_json("/maintenance").await["totalCount"], 0);
}

#[tokio::test]
async fn test_vehicle_maintenance_is_most_recent_first() {
    let client = spawn_app().await;
    let branch = create_branch(&client, "Filial Centro").await;
    let vehicle = create_vehicle(&client, "ABC1D23", &branch["id"]).await;
    for timestamp in [
        "2025-01-05T08:00:00Z",
        "2025-03-05T08:00:00Z",
        "2025-02-05T08:00:00Z",
    ] {
        create_record(&client, &vehicle["id"], timestamp).await;
    }

    let path = format!("/vehicles/{}/maintenance", vehicle["id"].as_str().unwrap());
    let page = client.get_json(&path).await;
    let stamps: Vec<&str> = page["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["timestamp"].as_str().unwrap())
        .collect();
    assert_eq!(stamps.len(), 3);
    assert!(stamps[0].starts_with("2025-03-05"));
    assert!(stamps[1].starts_with("2025-02-05"));
    assert!(stamps[2].starts_with("2025-01-05"));
    assert_eq!(page["_links"]["self"], format!("{}?pageNumber=1", path));

    // The per-vehicle history ignores ordering parameters.
    let reordered = client
        .get_json(&format!("{}?orderBy=cost&descending=false", path))
        .await;
    let again: Vec<&str> = reordered["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["timestamp"].as_str().unwrap())
        .collect();
    assert_eq!(again, stamps);
}

#[tokio::test]
async fn test_unknown_vehicle_wins_over_bad_paging() {
    let client = spawn_app().await;
    let path = format!("/vehicles/{}/maintenance?pageNumber=0", uuid::Uuid::new_v4());
    assert_empty_not_found(client.get(&path).await.unwrap()).await;
}

#[tokio::test]
async fn test_replace_rules() {
    let client = spawn_app().await;
    let branch = create_branch(&client, "Filial Centro").await;
    let other = create_branch(&client, "Filial Zona Sul").await;
    let vehicle = create_vehicle(&client, "ABC1D23", &branch["id"]).await;
    create_vehicle(&client, "EFG4H56", &branch["id"]).await;
    let vehicle_id = vehicle["id"].as_str().unwrap();
    let vehicle_path = format!("/vehicles/{}", vehicle_id);

    // Body id must match the path.
    let response = client
        .put(
            &vehicle_path,
            json!({"id": uuid::Uuid::new_v4(), "plate": "ABC1D23", "model": "Honda CG 160", "year": 2022, "branchId": branch["id"]}),
        )
        .await
        .unwrap();
    assert_bad_request(response).await;

    // Unknown target.
    let unknown = uuid::Uuid::new_v4();
    let response = client
        .put(
            &format!("/vehicles/{}", unknown),
            json!({"id": unknown, "plate": "ZZZ9Z99", "model": "Honda CG 160", "year": 2022, "branchId": branch["id"]}),
        )
        .await
        .unwrap();
    assert_empty_not_found(response).await;

    // Plate held by another vehicle.
    let response = client
        .put(
            &vehicle_path,
            json!({"id": vehicle_id, "plate": "EFG4H56", "model": "Honda CG 160", "year": 2022, "branchId": branch["id"]}),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // Branch that does not exist.
    let response = client
        .put(
            &vehicle_path,
            json!({"id": vehicle_id, "plate": "ABC1D23", "model": "Honda CG 160", "year": 2022, "branchId": uuid::Uuid::new_v4()}),
        )
        .await
        .unwrap();
    assert_bad_request(response).await;

    // Move to another branch, keeping its own plate.
    let response = client
        .put(
            &vehicle_path,
            json!({"id": vehicle_id, "plate": "ABC1D23", "model": "Honda CG 160 Titan", "year": 2023, "branchId": other["id"]}),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let fetched = client.get_json(&vehicle_path).await;
    assert_eq!(fetched["model"], "Honda CG 160 Titan");
    assert_eq!(fetched["branchId"], other["id"]);
    assert_eq!(
        fetched["_links"]["branch"],
        format!("/branches/{}", other["id"].as_str().unwrap())
    );
}

#[tokio::test]
async fn test_branch_replace_rules() {
    let client = spawn_app().await;
    let branch = create_branch(&client, "Filial Centro").await;
    let branch_id = branch["id"].as_str().unwrap();
    let branch_path = format!("/branches/{}", branch_id);

    let response = client
        .put(
            &branch_path,
            json!({"id": uuid::Uuid::new_v4(), "name": "Filial Centro", "address": "Rua A, 100", "city": "São Paulo"}),
        )
        .await
        .unwrap();
    assert_bad_request(response).await;

    let unknown = uuid::Uuid::new_v4();
    let response = client
        .put(
            &format!("/branches/{}", unknown),
            json!({"id": unknown, "name": "Filial Norte", "address": "Rua B, 200", "city": "Campinas"}),
        )
        .await
        .unwrap();
    assert_empty_not_found(response).await;

    let response = client
        .put(
            &branch_path,
            json!({"id": branch_id, "name": "Filial Paulista", "address": "Av. Paulista, 1000", "city": "São Paulo", "region": "SP"}),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let fetched = client.get_json(&branch_path).await;
    assert_eq!(fetched["name"], "Filial Paulista");
    assert_eq!(fetched["address"], "Av. Paulista, 1000");
}

#[tokio::test]
async fn test_maintenance_replace_rules() {
    let client = spawn_app().await;
    let branch = create_branch(&client, "Filial Centro").await;
    let vehicle = create_vehicle(&client, "ABC1D23", &branch["id"]).await;
    let record = create_record(&client, &vehicle["id"], "2025-01-10T10:00:00Z").await;
    let record_id = record["id"].as_str().unwrap();
    let record_path = format!("/maintenance/{}", record_id);

    let response = client
        .put(
            &record_path,
            json!({"id": uuid::Uuid::new_v4(), "vehicleId": vehicle["id"], "timestamp": "2025-01-10T10:00:00Z", "description": "Troca de óleo", "cost": 120.5}),
        )
        .await
        .unwrap();
    assert_bad_request(response).await;

    let unknown = uuid::Uuid::new_v4();
    let response = client
        .put(
            &format!("/maintenance/{}", unknown),
            json!({"id": unknown, "vehicleId": vehicle["id"], "timestamp": "2025-01-10T10:00:00Z", "description": "Troca de óleo", "cost": 120.5}),
        )
        .await
        .unwrap();
    assert_empty_not_found(response).await;

    // Vehicle that does not exist.
    let response = client
        .put(
            &record_path,
            json!({"id": record_id, "vehicleId": uuid::Uuid::new_v4(), "timestamp": "2025-01-10T10:00:00Z", "description": "Troca de óleo", "cost": 120.5}),
        )
        .await
        .unwrap();
    assert_bad_request(response).await;

    let response = client
        .put(
            &record_path,
            json!({"id": record_id, "vehicleId": vehicle["id"], "timestamp": "2025-01-11T09:00:00Z", "description": "Troca de óleo e filtro", "cost": 180.0}),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let fetched = client.get_json(&record_path).await;
    assert_eq!(fetched["description"], "Troca de óleo e filtro");
    assert_eq!(fetched["cost"].as_f64(), Some(180.0));
    assert!(fetched["timestamp"].as_str().unwrap().starts_with("2025-01-11T09:00:00"));
}

#[tokio::test]
async fn test_deleting_absent_entities_is_not_found() {
    let client = spawn_app().await;
    for collection in ["branches", "vehicles", "maintenance"] {
        let path = format!("/{}/{}", collection, uuid::Uuid::new_v4());
        assert_empty_not_found(client.delete(&path).await.unwrap()).await;
    }

    let branch = create_branch(&client, "Filial Centro").await;
    let vehicle = create_vehicle(&client, "ABC1D23", &branch["id"]).await;
    let record = create_record(&client, &vehicle["id"], "2025-01-10T10:00:00Z").await;
    let record_path = format!("/maintenance/{}", record["id"].as_str().unwrap());

    let response = client.delete(&record_path).await.unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_empty_not_found(client.delete(&record_path).await.unwrap()).await;
    assert_empty_not_found(client.get(&record_path).await.unwrap()).await;
}

#[tokio::test]
async fn test_sub_microsecond_timestamps_echo_what_is_stored() {
    let client = spawn_app().await;
    let branch = create_branch(&client, "Filial Centro").await;
    let vehicle = create_vehicle(&client, "ABC1D23", &branch["id"]).await;
    let record = create_record(&client, &vehicle["id"], "2025-01-10T10:00:00.123456789Z").await;
    assert_eq!(record["timestamp"], "2025-01-10T10:00:00.123456Z");

    let fetched = client
        .get_json(&format!("/maintenance/{}", record["id"].as_str().unwrap()))
        .await;
    assert_eq!(fetched, record);
}

#[tokio::test]
async fn test_vehicle_ordering_parameters() {
    let client = spawn_app().await;
    let branch = create_branch(&client, "Filial Centro").await;
    for (plate, year) in [("AAA1A11", 2020), ("BBB2B22", 2024), ("CCC3C33", 2022)] {
        client
            .create(
                "/vehicles",
                json!({"plate": plate, "model": "Honda Biz 125", "year": year, "branchId": branch["id"]}),
            )
            .await;
    }

    let by_plate = client.get_json("/vehicles").await;
    assert_eq!(by_plate["items"][0]["plate"], "AAA1A11");

    let by_year = client.get_json("/vehicles?orderBy=year&descending=true").await;
    let years: Vec<i64> = by_year["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v["year"].as_i64().unwrap())
        .collect();
    assert_eq!(years, vec![2024, 2022, 2020]);

    assert_bad_request(client.get("/vehicles?orderBy=color").await.unwrap()).await;
}

#[tokio::test]
async fn test_malformed_bodies_and_ids() {
    let client = spawn_app().await;

    let response = client
        .post("/branches", json!({"address": "Rua A, 100", "city": "São Paulo"}))
        .await
        .unwrap();
    assert_bad_request(response).await;

    let response = client
        .post(
            "/branches",
            json!({"name": "Filial Centro", "address": "Rua A, 100", "city": "São Paulo", "region": "SAO"}),
        )
        .await
        .unwrap();
    assert_bad_request(response).await;

    assert_empty_not_found(client.get("/vehicles/not-a-uuid").await.unwrap()).await;
    assert_empty_not_found(client.get(&format!("/branches/{}/vehicles", uuid::Uuid::new_v4())).await.unwrap()).await;
}
