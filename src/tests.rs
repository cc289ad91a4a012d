//! Integration tests for the UNIBUS backend.

use std::sync::Arc;

use reqwest::Client;
use serde_json::{json, Value};
use tempfile::TempDir;

use crate::config::Config;
use crate::db::{init_database, Repository};
use crate::dispatch::DispatchEngine;
use crate::{create_router, AppState};

/// Test fixture for integration tests.
struct TestFixture {
    client: Client,
    base_url: String,
    _temp_dir: TempDir,
}

impl TestFixture {
    async fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.sqlite");

        // Initialize database
        let pool = init_database(&db_path).await.expect("Failed to init DB");
        let repo = Arc::new(Repository::new(pool.clone()));
        let dispatch = Arc::new(DispatchEngine::new(pool));

        // Create config
        let config = Config {
            db_path,
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            log_level: "warn".to_string(),
        };

        let state = AppState {
            repo,
            dispatch,
            config: Arc::new(config),
        };

        let app = create_router(state);

        // Bind to random port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind");
        let addr = listener.local_addr().expect("Failed to get addr");
        let base_url = format!("http://{}", addr);

        // Spawn server
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Wait for server to start
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        TestFixture {
            client: Client::new(),
            base_url,
            _temp_dir: temp_dir,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn create_student(&self, name: &str, email: &str, school: &str) -> Value {
        let resp = self
            .client
            .post(self.url("/api/students"))
            .json(&json!({
                "fullName": name,
                "school": school,
                "class": "5A",
                "email": email,
                "enrollmentNumber": format!("EN-{}", email),
                "guardianName": "Guardian",
                "guardianPhone": "81990000000",
                "password": "senha123"
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 201);
        resp.json().await.unwrap()
    }

    async fn create_driver(&self, name: &str, email: &str, route_ref: Option<&str>) -> Value {
        let resp = self
            .client
            .post(self.url("/api/drivers"))
            .json(&json!({
                "fullName": name,
                "email": email,
                "phone": "81991111111",
                "routeRef": route_ref
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 201);
        resp.json().await.unwrap()
    }

    async fn create_route(&self, name: &str, stops: Value) -> Value {
        let resp = self
            .client
            .post(self.url("/api/routes"))
            .json(&json!({
                "name": name,
                "busNumber": "12",
                "shift": "morning",
                "stops": stops
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 201);
        resp.json().await.unwrap()
    }

    /// Profile id for a student, looked up from the listing.
    async fn student_profile_id(&self, student_id: &str) -> String {
        let resp = self
            .client
            .get(self.url("/api/students"))
            .send()
            .await
            .unwrap();
        let body: Value = resp.json().await.unwrap();
        body["data"]
            .as_array()
            .unwrap()
            .iter()
            .find(|s| s["id"] == student_id)
            .map(|s| s["profileId"].as_str().unwrap().to_string())
            .expect("student not in listing")
    }

    async fn driver_profile_id(&self, driver_id: &str) -> String {
        let resp = self
            .client
            .get(self.url("/api/drivers"))
            .send()
            .await
            .unwrap();
        let body: Value = resp.json().await.unwrap();
        body["data"]
            .as_array()
            .unwrap()
            .iter()
            .find(|d| d["id"] == driver_id)
            .map(|d| d["profileId"].as_str().unwrap().to_string())
            .expect("driver not in listing")
    }

    async fn enroll(&self, student_id: &str, route_id: &str) -> reqwest::Response {
        self.client
            .post(self.url("/api/subscriptions"))
            .json(&json!({ "studentId": student_id, "routeId": route_id }))
            .send()
            .await
            .unwrap()
    }

    async fn inbox(&self, profile_id: &str) -> Vec<Value> {
        let resp = self
            .client
            .get(self.url(&format!("/api/notifications/inbox/{}", profile_id)))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        let body: Value = resp.json().await.unwrap();
        body["data"].as_array().unwrap().clone()
    }
}

#[tokio::test]
async fn test_health_check() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .get(fixture.url("/health"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "OK");
}

// ==================== ROUTE TESTS ====================

#[tokio::test]
async fn test_route_create_and_list() {
    let fixture = TestFixture::new().await;

    let created = fixture
        .create_route(
            "Rota Centro",
            json!([
                { "name": "Praça Central", "latitude": -8.28, "longitude": -35.99, "time": "06:30" },
                { "name": "Terminal" },
                { "name": "Escola Municipal", "type": "destination" }
            ]),
        )
        .await;
    assert_eq!(created["success"], true);
    let route_id = created["data"]["routeId"].as_str().unwrap();
    assert!(!route_id.is_empty());

    let resp = fixture
        .client
        .get(fixture.url("/api/routes"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    let routes = body["data"].as_array().unwrap();
    assert_eq!(routes.len(), 1);

    let route = &routes[0];
    assert_eq!(route["name"], "Rota Centro");
    assert_eq!(route["active"], true);

    // Stop order preserved, positional kinds filled in, explicit kept
    let stops = route["stops"].as_array().unwrap();
    assert_eq!(stops.len(), 3);
    assert_eq!(stops[0]["name"], "Praça Central");
    assert_eq!(stops[0]["type"], "origin");
    assert_eq!(stops[0]["time"], "06:30");
    assert_eq!(stops[1]["type"], "stop");
    assert_eq!(stops[2]["type"], "destination");
    assert_eq!(
        stops.iter().map(|s| s["id"].as_i64().unwrap()).collect::<Vec<_>>(),
        vec![1, 2, 3]
    );
}

#[tokio::test]
async fn test_route_create_requires_name() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .post(fixture.url("/api/routes"))
        .json(&json!({ "name": "  ", "stops": [] }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_route_detail_school_already_on_route() {
    let fixture = TestFixture::new().await;

    let route = fixture
        .create_route(
            "Rota Escola",
            json!([{ "name": "Praça Central" }, { "name": "Escola Modelo" }]),
        )
        .await;
    let route_id = route["data"]["routeId"].as_str().unwrap().to_string();

    let student = fixture
        .create_student("Ana Souza", "ana@example.com", "Escola Modelo")
        .await;
    let student_id = student["data"]["studentId"].as_str().unwrap();

    let resp = fixture
        .client
        .get(fixture.url(&format!(
            "/api/routes/{}/students/{}",
            route_id, student_id
        )))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();

    // School matched an existing stop, so nothing was appended
    let stops = body["data"]["stops"].as_array().unwrap();
    assert_eq!(stops.len(), 2);
    assert_eq!(stops[0]["type"], "origin");
    assert_eq!(stops[1]["type"], "destination");
    assert_eq!(body["data"]["destination"]["name"], "Escola Modelo");
}

#[tokio::test]
async fn test_route_detail_appends_school_with_stable_coords() {
    let fixture = TestFixture::new().await;

    let route = fixture
        .create_route("Rota Sitio", json!([{ "name": "Praça Central" }]))
        .await;
    let route_id = route["data"]["routeId"].as_str().unwrap().to_string();

    let student = fixture
        .create_student("Bia Lima", "bia@example.com", "Colégio São José")
        .await;
    let student_id = student["data"]["studentId"].as_str().unwrap().to_string();

    let path = format!("/api/routes/{}/students/{}", route_id, student_id);

    let first: Value = fixture
        .client
        .get(fixture.url(&path))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let stops = first["data"]["stops"].as_array().unwrap();
    assert_eq!(stops.len(), 2);
    assert_eq!(stops[1]["name"], "Colégio São José");
    assert_eq!(stops[1]["type"], "destination");
    let lat = stops[1]["latitude"].as_f64().unwrap();
    let lng = stops[1]["longitude"].as_f64().unwrap();
    assert!((lat - (-8.28179)).abs() < 0.02);
    assert!((lng - (-35.99857)).abs() < 0.02);

    // Synthesized coordinates are stable across fetches
    let second: Value = fixture
        .client
        .get(fixture.url(&path))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(second["data"]["destination"]["latitude"], json!(lat));
    assert_eq!(second["data"]["destination"]["longitude"], json!(lng));
}

#[tokio::test]
async fn test_route_detail_unknown_route() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .get(fixture.url("/api/routes/nope/students/nobody"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

// ==================== STUDENT TESTS ====================

#[tokio::test]
async fn test_student_register_and_login() {
    let fixture = TestFixture::new().await;

    fixture
        .create_student("Ana Souza", "ana@example.com", "Escola Modelo")
        .await;

    let resp = fixture
        .client
        .post(fixture.url("/api/students/login"))
        .json(&json!({ "email": "ana@example.com", "password": "senha123" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["fullName"], "Ana Souza");
    assert_eq!(body["data"]["school"], "Escola Modelo");
    // The password hash never leaves the store
    assert!(body["data"].get("password").is_none());
    assert!(body["data"].get("passwordHash").is_none());
}

#[tokio::test]
async fn test_student_register_missing_fields() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .post(fixture.url("/api/students"))
        .json(&json!({ "fullName": "Ana Souza", "email": "ana@example.com" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    let message = body["error"]["message"].as_str().unwrap();
    assert!(message.contains("school"));
    assert!(message.contains("guardianName"));
}

#[tokio::test]
async fn test_student_duplicate_email_conflict() {
    let fixture = TestFixture::new().await;

    fixture
        .create_student("Ana Souza", "ana@example.com", "Escola Modelo")
        .await;

    let resp = fixture
        .client
        .post(fixture.url("/api/students"))
        .json(&json!({
            "fullName": "Outra Ana",
            "school": "Escola Modelo",
            "class": "5B",
            "email": "ana@example.com",
            "enrollmentNumber": "EN-2",
            "guardianName": "Guardian",
            "guardianPhone": "81990000000",
            "password": "senha456"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 409);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "CONFLICT");
}

#[tokio::test]
async fn test_student_login_wrong_password() {
    let fixture = TestFixture::new().await;

    fixture
        .create_student("Ana Souza", "ana@example.com", "Escola Modelo")
        .await;

    let resp = fixture
        .client
        .post(fixture.url("/api/students/login"))
        .json(&json!({ "email": "ana@example.com", "password": "wrong" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
    assert_eq!(body["error"]["message"], "Invalid email or password");
}

#[tokio::test]
async fn test_student_login_unknown_email_same_message() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .post(fixture.url("/api/students/login"))
        .json(&json!({ "email": "ghost@example.com", "password": "whatever" }))
        .send()
        .await
        .unwrap();
    // Unknown account and bad password are indistinguishable
    assert_eq!(resp.status(), 401);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["message"], "Invalid email or password");
}

// ==================== DRIVER TESTS ====================

#[tokio::test]
async fn test_driver_default_password_login() {
    let fixture = TestFixture::new().await;

    fixture
        .create_driver("Carlos Motorista", "carlos@example.com", None)
        .await;

    // Registration without a password falls back to the onboarding default
    let resp = fixture
        .client
        .post(fixture.url("/api/drivers/login"))
        .json(&json!({ "email": "carlos@example.com", "password": "123456" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["fullName"], "Carlos Motorista");
    assert_eq!(body["data"]["active"], true);
}

#[tokio::test]
async fn test_driver_partial_update() {
    let fixture = TestFixture::new().await;

    let created = fixture
        .create_driver("Carlos Motorista", "carlos@example.com", Some("Rota Centro"))
        .await;
    let driver_id = created["data"]["driverId"].as_str().unwrap().to_string();

    let resp = fixture
        .client
        .put(fixture.url(&format!("/api/drivers/{}", driver_id)))
        .json(&json!({ "busPlate": "KGZ-1234", "password": "nova-senha" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    // Untouched fields survive the partial update
    assert_eq!(body["data"]["fullName"], "Carlos Motorista");
    assert_eq!(body["data"]["routeRef"], "Rota Centro");
    assert_eq!(body["data"]["busPlate"], "KGZ-1234");

    // Old password stops working, new one takes over
    let old = fixture
        .client
        .post(fixture.url("/api/drivers/login"))
        .json(&json!({ "email": "carlos@example.com", "password": "123456" }))
        .send()
        .await
        .unwrap();
    assert_eq!(old.status(), 401);

    let new = fixture
        .client
        .post(fixture.url("/api/drivers/login"))
        .json(&json!({ "email": "carlos@example.com", "password": "nova-senha" }))
        .send()
        .await
        .unwrap();
    assert_eq!(new.status(), 200);
}

#[tokio::test]
async fn test_driver_update_unknown_id() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .put(fixture.url("/api/drivers/nope"))
        .json(&json!({ "phone": "81992222222" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

// ==================== ADMIN TESTS ====================

#[tokio::test]
async fn test_admin_register_login_list() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .post(fixture.url("/api/admins"))
        .json(&json!({
            "schoolName": "Escola Modelo",
            "managerName": "Dona Maria",
            "position": "Diretora",
            "email": "gestao@example.com",
            "password": "gestao123"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    let created: Value = resp.json().await.unwrap();
    assert!(!created["data"]["adminId"].as_str().unwrap().is_empty());

    let login = fixture
        .client
        .post(fixture.url("/api/admins/login"))
        .json(&json!({ "email": "gestao@example.com", "password": "gestao123" }))
        .send()
        .await
        .unwrap();
    assert_eq!(login.status(), 200);
    let body: Value = login.json().await.unwrap();
    assert_eq!(body["data"]["schoolName"], "Escola Modelo");
    assert_eq!(body["data"]["managerName"], "Dona Maria");

    let list = fixture
        .client
        .get(fixture.url("/api/admins"))
        .send()
        .await
        .unwrap();
    let body: Value = list.json().await.unwrap();
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_admin_register_requires_school_name() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .post(fixture.url("/api/admins"))
        .json(&json!({
            "managerName": "Dona Maria",
            "email": "gestao@example.com",
            "password": "gestao123"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

// ==================== SUBSCRIPTION TESTS ====================

#[tokio::test]
async fn test_enroll_and_duplicate_conflict() {
    let fixture = TestFixture::new().await;

    let route = fixture
        .create_route("Rota Centro", json!([{ "name": "Praça" }, { "name": "Escola" }]))
        .await;
    let route_id = route["data"]["routeId"].as_str().unwrap().to_string();
    let student = fixture
        .create_student("Ana Souza", "ana@example.com", "Escola Modelo")
        .await;
    let student_id = student["data"]["studentId"].as_str().unwrap().to_string();

    let first = fixture.enroll(&student_id, &route_id).await;
    assert_eq!(first.status(), 201);
    let body: Value = first.json().await.unwrap();
    assert_eq!(body["data"]["status"], "active");

    // Second active enrollment for the same pair is rejected
    let second = fixture.enroll(&student_id, &route_id).await;
    assert_eq!(second.status(), 409);
    let body: Value = second.json().await.unwrap();
    assert_eq!(body["error"]["code"], "CONFLICT");

    let resp = fixture
        .client
        .get(fixture.url(&format!("/api/subscriptions/by-route/{}", route_id)))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    let subscribers = body["data"].as_array().unwrap();
    assert_eq!(subscribers.len(), 1);
    assert_eq!(subscribers[0]["fullName"], "Ana Souza");
}

#[tokio::test]
async fn test_unenroll_then_reenroll() {
    let fixture = TestFixture::new().await;

    let route = fixture
        .create_route("Rota Centro", json!([{ "name": "Praça" }]))
        .await;
    let route_id = route["data"]["routeId"].as_str().unwrap().to_string();
    let student = fixture
        .create_student("Ana Souza", "ana@example.com", "Escola Modelo")
        .await;
    let student_id = student["data"]["studentId"].as_str().unwrap().to_string();

    assert_eq!(fixture.enroll(&student_id, &route_id).await.status(), 201);

    let resp = fixture
        .client
        .delete(fixture.url(&format!(
            "/api/subscriptions?studentId={}&routeId={}",
            student_id, route_id
        )))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = fixture
        .client
        .get(fixture.url(&format!("/api/subscriptions/by-student/{}", student_id)))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert!(body["data"].as_array().unwrap().is_empty());

    // Cancelled rows do not block a fresh enrollment
    assert_eq!(fixture.enroll(&student_id, &route_id).await.status(), 201);
}

#[tokio::test]
async fn test_routes_by_student() {
    let fixture = TestFixture::new().await;

    let route_a = fixture
        .create_route("Rota A", json!([{ "name": "Praça" }]))
        .await;
    let route_b = fixture
        .create_route("Rota B", json!([{ "name": "Terminal" }]))
        .await;
    let student = fixture
        .create_student("Ana Souza", "ana@example.com", "Escola Modelo")
        .await;
    let student_id = student["data"]["studentId"].as_str().unwrap().to_string();

    fixture
        .enroll(&student_id, route_a["data"]["routeId"].as_str().unwrap())
        .await;
    fixture
        .enroll(&student_id, route_b["data"]["routeId"].as_str().unwrap())
        .await;

    let resp = fixture
        .client
        .get(fixture.url(&format!("/api/subscriptions/by-student/{}", student_id)))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    let routes = body["data"].as_array().unwrap();
    assert_eq!(routes.len(), 2);
    assert_eq!(routes[0]["name"], "Rota A");
    assert_eq!(routes[1]["name"], "Rota B");
}

// ==================== NOTIFICATION TESTS ====================

#[tokio::test]
async fn test_dispatch_all_reaches_students_and_drivers() {
    let fixture = TestFixture::new().await;

    let student = fixture
        .create_student("Ana Souza", "ana@example.com", "Escola Modelo")
        .await;
    let student_id = student["data"]["studentId"].as_str().unwrap().to_string();
    let driver = fixture
        .create_driver("Carlos Motorista", "carlos@example.com", None)
        .await;
    let driver_id = driver["data"]["driverId"].as_str().unwrap().to_string();

    let resp = fixture
        .client
        .post(fixture.url("/api/notifications/send"))
        .json(&json!({
            "audienceType": "all",
            "title": "Aviso geral",
            "message": "Sem aula amanhã",
            "priority": "high"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["recipientCount"], 2);
    let send_id = body["data"]["sendId"].as_str().unwrap().to_string();

    // Both inboxes carry a materialized delivery for the send
    let student_profile = fixture.student_profile_id(&student_id).await;
    let entries = fixture.inbox(&student_profile).await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["sendId"], send_id.as_str());
    assert_eq!(entries[0]["title"], "Aviso geral");
    assert_eq!(entries[0]["priority"], "high");
    assert_eq!(entries[0]["read"], false);
    assert!(entries[0]["deliveryId"].is_string());

    let driver_profile = fixture.driver_profile_id(&driver_id).await;
    let entries = fixture.inbox(&driver_profile).await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["sendId"], send_id.as_str());
}

#[tokio::test]
async fn test_dispatch_students_route_filter() {
    let fixture = TestFixture::new().await;

    let route = fixture
        .create_route("Rota Centro", json!([{ "name": "Praça" }]))
        .await;
    let route_id = route["data"]["routeId"].as_str().unwrap().to_string();

    let enrolled = fixture
        .create_student("Ana Souza", "ana@example.com", "Escola Modelo")
        .await;
    let enrolled_id = enrolled["data"]["studentId"].as_str().unwrap().to_string();
    fixture
        .create_student("Bia Lima", "bia@example.com", "Escola Modelo")
        .await;

    fixture.enroll(&enrolled_id, &route_id).await;

    let resp = fixture
        .client
        .post(fixture.url("/api/notifications/send"))
        .json(&json!({
            "audienceType": "students",
            "title": "Mudança de horário",
            "message": "Saída às 6h",
            "routes": [route_id]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    // Only the enrolled student is reached
    assert_eq!(body["data"]["recipientCount"], 1);
}

#[tokio::test]
async fn test_dispatch_drivers_by_route_name() {
    let fixture = TestFixture::new().await;

    let route = fixture
        .create_route("Rota Centro", json!([{ "name": "Praça" }]))
        .await;
    let route_id = route["data"]["routeId"].as_str().unwrap().to_string();

    fixture
        .create_driver("Carlos Motorista", "carlos@example.com", Some("Rota Centro"))
        .await;
    fixture
        .create_driver("Diego Motorista", "diego@example.com", Some("Rota Sul"))
        .await;

    // Route filter resolves drivers through the route-name reference
    let resp = fixture
        .client
        .post(fixture.url("/api/notifications/send"))
        .json(&json!({
            "audienceType": "drivers",
            "title": "Manutenção",
            "message": "Troca de veículo na Rota Centro",
            "routes": [route_id]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["recipientCount"], 1);
}

#[tokio::test]
async fn test_dispatch_deactivated_driver_no_recipients() {
    let fixture = TestFixture::new().await;

    let driver = fixture
        .create_driver("Carlos Motorista", "carlos@example.com", None)
        .await;
    let driver_id = driver["data"]["driverId"].as_str().unwrap().to_string();

    // Deactivate through the partial update
    let resp = fixture
        .client
        .put(fixture.url(&format!("/api/drivers/{}", driver_id)))
        .json(&json!({ "active": false }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = fixture
        .client
        .post(fixture.url("/api/notifications/send"))
        .json(&json!({
            "audienceType": "drivers",
            "title": "Escala",
            "message": "Plantão de sábado",
            "drivers": [driver_id]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "NO_RECIPIENTS");

    // The rolled-back send never shows up in history
    let resp = fixture
        .client
        .get(fixture.url("/api/notifications/history"))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert!(body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_dispatch_requires_title_and_message() {
    let fixture = TestFixture::new().await;

    fixture
        .create_student("Ana Souza", "ana@example.com", "Escola Modelo")
        .await;

    let resp = fixture
        .client
        .post(fixture.url("/api/notifications/send"))
        .json(&json!({ "audienceType": "all", "title": "  ", "message": "corpo" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_mark_read_idempotent() {
    let fixture = TestFixture::new().await;

    let student = fixture
        .create_student("Ana Souza", "ana@example.com", "Escola Modelo")
        .await;
    let student_id = student["data"]["studentId"].as_str().unwrap().to_string();

    fixture
        .client
        .post(fixture.url("/api/notifications/send"))
        .json(&json!({
            "audienceType": "students",
            "title": "Aviso",
            "message": "Leia-me"
        }))
        .send()
        .await
        .unwrap();

    let profile_id = fixture.student_profile_id(&student_id).await;
    let entries = fixture.inbox(&profile_id).await;
    let delivery_id = entries[0]["deliveryId"].as_str().unwrap().to_string();

    for _ in 0..2 {
        let resp = fixture
            .client
            .put(fixture.url(&format!("/api/notifications/{}/read", delivery_id)))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
    }

    let entries = fixture.inbox(&profile_id).await;
    assert_eq!(entries[0]["read"], true);
}

#[tokio::test]
async fn test_mark_read_unknown_delivery() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .put(fixture.url("/api/notifications/nope/read"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn test_history_aggregates() {
    let fixture = TestFixture::new().await;

    let student = fixture
        .create_student("Ana Souza", "ana@example.com", "Escola Modelo")
        .await;
    let student_id = student["data"]["studentId"].as_str().unwrap().to_string();
    fixture
        .create_driver("Carlos Motorista", "carlos@example.com", None)
        .await;

    let resp = fixture
        .client
        .post(fixture.url("/api/notifications/send"))
        .json(&json!({
            "audienceType": "all",
            "title": "Aviso geral",
            "message": "Conteúdo"
        }))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    let send_id = body["data"]["sendId"].as_str().unwrap().to_string();

    // One of the two recipients reads theirs
    let profile_id = fixture.student_profile_id(&student_id).await;
    let entries = fixture.inbox(&profile_id).await;
    let delivery_id = entries[0]["deliveryId"].as_str().unwrap();
    fixture
        .client
        .put(fixture.url(&format!("/api/notifications/{}/read", delivery_id)))
        .send()
        .await
        .unwrap();

    let resp = fixture
        .client
        .get(fixture.url("/api/notifications/history"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    let sends = body["data"].as_array().unwrap();
    assert_eq!(sends.len(), 1);
    assert_eq!(sends[0]["id"], send_id.as_str());
    assert_eq!(sends[0]["totalRecipients"], 2);
    assert_eq!(sends[0]["readCount"], 1);
}

#[tokio::test]
async fn test_delete_send_clears_inbox() {
    let fixture = TestFixture::new().await;

    let student = fixture
        .create_student("Ana Souza", "ana@example.com", "Escola Modelo")
        .await;
    let student_id = student["data"]["studentId"].as_str().unwrap().to_string();

    let resp = fixture
        .client
        .post(fixture.url("/api/notifications/send"))
        .json(&json!({
            "audienceType": "students",
            "title": "Efêmero",
            "message": "Some logo"
        }))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    let send_id = body["data"]["sendId"].as_str().unwrap().to_string();

    let resp = fixture
        .client
        .delete(fixture.url(&format!("/api/notifications/sends/{}", send_id)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let profile_id = fixture.student_profile_id(&student_id).await;
    assert!(fixture.inbox(&profile_id).await.is_empty());

    // Deleting again is a no-op, not an error
    let resp = fixture
        .client
        .delete(fixture.url(&format!("/api/notifications/sends/{}", send_id)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
}
