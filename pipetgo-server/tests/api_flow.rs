//! Router-level tests over the in-memory store

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{HeaderMap, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use pipetgo_server::auth::SessionKeys;
use pipetgo_server::{build_router, AppState, MemoryStore};

struct TestApp {
    router: Router,
}

struct Reply {
    status: StatusCode,
    headers: HeaderMap,
    body: Value,
}

impl TestApp {
    fn new() -> Self {
        Self::with_state(AppState::new(
            Arc::new(MemoryStore::with_demo_data()),
            SessionKeys::new("integration-secret", 30),
        ))
    }

    fn with_state(state: AppState) -> Self {
        Self {
            router: build_router(Arc::new(state), false),
        }
    }

    async fn call(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Reply {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        Reply {
            status,
            headers,
            body,
        }
    }

    async fn get(&self, uri: &str, token: Option<&str>) -> Reply {
        self.call(Method::GET, uri, token, None).await
    }

    async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> Reply {
        self.call(Method::POST, uri, token, Some(body)).await
    }

    async fn patch(&self, uri: &str, token: Option<&str>, body: Value) -> Reply {
        self.call(Method::PATCH, uri, token, Some(body)).await
    }

    /// Email-only sign-in for the seeded demo accounts.
    async fn login(&self, email: &str) -> String {
        let reply = self
            .post("/api/auth/signin", None, json!({ "email": email }))
            .await;
        assert_eq!(reply.status, StatusCode::OK, "{:?}", reply.body);
        reply.body["token"].as_str().unwrap().to_owned()
    }

    async fn service_id(&self, pricing_mode: &str) -> String {
        let reply = self.get("/api/services?format=legacy", None).await;
        reply
            .body
            .as_array()
            .unwrap()
            .iter()
            .find(|s| s["pricingMode"] == pricing_mode)
            .map(|s| s["id"].as_str().unwrap().to_owned())
            .unwrap()
    }
}

fn order_body(service_id: &str) -> Value {
    json!({
        "serviceId": service_id,
        "sampleDescription": "Three sealed bottles of drinking water",
        "clientDetails": {
            "contactEmail": "client@pipetgo.test",
            "shippingAddress": {
                "street": "12 Ayala Ave",
                "city": "Makati",
                "postal": "1226"
            }
        }
    })
}

#[tokio::test]
async fn health_is_public() {
    let app = TestApp::new();
    let reply = app.get("/health", None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["status"], "ok");
}

#[tokio::test]
async fn signin_sets_cookie_and_session_reads_it() {
    let app = TestApp::new();
    let reply = app
        .post("/api/auth/signin", None, json!({ "email": "client@pipetgo.test" }))
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["passwordSetupRequired"], true);
    assert!(reply.body["user"].get("passwordHash").is_none());

    let cookie = reply.headers["set-cookie"].to_str().unwrap();
    assert!(cookie.starts_with("pipetgo_session="));
    assert!(cookie.contains("HttpOnly"));
    let cookie_pair = cookie.split(';').next().unwrap().to_owned();

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/auth/session")
                .header("cookie", cookie_pair)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn session_requires_auth() {
    let app = TestApp::new();
    assert_eq!(app.get("/api/auth/session", None).await.status, StatusCode::UNAUTHORIZED);
    assert_eq!(
        app.get("/api/auth/session", Some("forged.token")).await.status,
        StatusCode::UNAUTHORIZED
    );
}

#[tokio::test]
async fn unknown_email_is_401() {
    let app = TestApp::new();
    let reply = app
        .post("/api/auth/signin", None, json!({ "email": "ghost@pipetgo.test" }))
        .await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert_eq!(reply.body["error"], "unauthorized");
}

#[tokio::test]
async fn signup_is_rate_limited_with_headers() {
    let app = TestApp::new();
    for i in 0..3 {
        let reply = app
            .post(
                "/api/auth/signup",
                None,
                json!({
                    "name": "Rate Tester",
                    "email": format!("rate{i}@pipetgo.test"),
                    "role": "CLIENT",
                    "password": "Sampl3Pass"
                }),
            )
            .await;
        assert_eq!(reply.status, StatusCode::CREATED, "{:?}", reply.body);
    }

    let reply = app
        .post(
            "/api/auth/signup",
            None,
            json!({
                "name": "Rate Tester",
                "email": "rate9@pipetgo.test",
                "role": "CLIENT",
                "password": "Sampl3Pass"
            }),
        )
        .await;
    assert_eq!(reply.status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(reply.headers["x-ratelimit-limit"], "3");
    assert_eq!(reply.headers["x-ratelimit-remaining"], "0");
    assert!(reply.headers.contains_key("retry-after"));
}

#[tokio::test]
async fn rate_limiting_can_be_switched_off() {
    let app = TestApp::with_state(
        AppState::new(
            Arc::new(MemoryStore::with_demo_data()),
            SessionKeys::new("integration-secret", 30),
        )
        .with_rate_limiting(false),
    );
    for _ in 0..10 {
        let reply = app
            .post("/api/auth/signin", None, json!({ "email": "ghost@pipetgo.test" }))
            .await;
        assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    }
}

#[tokio::test]
async fn malformed_json_and_ids_are_400() {
    let app = TestApp::new();
    let token = app.login("lab@pipetgo.test").await;

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/api/services")
                .header("authorization", format!("Bearer {token}"))
                .header("content-type", "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let reply = app.get("/api/services/not-a-uuid", Some(&token)).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.body["error"], "validation_error");
}

#[tokio::test]
async fn catalog_filters_and_pagination() {
    let app = TestApp::new();

    let reply = app.get("/api/services?pageSize=2", None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["items"].as_array().unwrap().len(), 2);
    assert_eq!(reply.body["pagination"]["totalPages"], 2);

    let reply = app.get("/api/services?search=PLATE", None).await;
    let items = reply.body["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["name"], "Total Plate Count");
    assert!(items[0]["lab"]["name"].is_string());

    let reply = app
        .get("/api/services?category=Chemical%20Analysis", None)
        .await;
    assert_eq!(reply.body["pagination"]["totalCount"], 1);

    let reply = app.get("/api/services?labId=nope", None).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn service_management_roles() {
    let app = TestApp::new();
    let lab = app.login("lab@pipetgo.test").await;
    let client = app.login("client@pipetgo.test").await;

    let body = json!({
        "name": "Aflatoxin Screening",
        "category": "Food Safety",
        "pricingMode": "FIXED",
        "pricePerUnit": 4200,
        "turnaroundDays": 10
    });

    assert_eq!(
        app.post("/api/services", None, body.clone()).await.status,
        StatusCode::UNAUTHORIZED
    );
    assert_eq!(
        app.post("/api/services", Some(&client), body.clone()).await.status,
        StatusCode::FORBIDDEN
    );

    let created = app.post("/api/services", Some(&lab), body).await;
    assert_eq!(created.status, StatusCode::CREATED);
    assert_eq!(created.body["unitType"], "per_sample");
    let id = created.body["id"].as_str().unwrap().to_owned();

    let missing_price = app
        .post(
            "/api/services",
            Some(&lab),
            json!({ "name": "No Price", "category": "Other", "pricingMode": "HYBRID" }),
        )
        .await;
    assert_eq!(missing_price.status, StatusCode::BAD_REQUEST);
    assert!(!missing_price.body["details"].as_array().unwrap().is_empty());

    assert_eq!(
        app.get(&format!("/api/services/{id}"), Some(&client)).await.status,
        StatusCode::UNAUTHORIZED
    );
    let toggled = app
        .patch(&format!("/api/services/{id}"), Some(&lab), json!({ "active": false }))
        .await;
    assert_eq!(toggled.status, StatusCode::OK);
    assert_eq!(toggled.body["active"], false);

    // inactive services drop out of the default catalog but not active=all
    let reply = app.get("/api/services", None).await;
    assert_eq!(reply.body["pagination"]["totalCount"], 3);
    let reply = app.get("/api/services?active=all", None).await;
    assert_eq!(reply.body["pagination"]["totalCount"], 4);

    let bulk = app
        .post(
            "/api/services/bulk",
            Some(&lab),
            json!({ "serviceIds": [id], "action": "enable" }),
        )
        .await;
    assert_eq!(bulk.status, StatusCode::OK);
    assert_eq!(bulk.body["message"], "1 service enabled");
}

#[tokio::test]
async fn fixed_order_lifecycle() {
    let app = TestApp::new();
    let client = app.login("client@pipetgo.test").await;
    let lab = app.login("lab@pipetgo.test").await;
    let service = app.service_id("FIXED").await;

    // labs cannot place orders
    assert_eq!(
        app.post("/api/orders", Some(&lab), order_body(&service)).await.status,
        StatusCode::UNAUTHORIZED
    );

    let placed = app.post("/api/orders", Some(&client), order_body(&service)).await;
    assert_eq!(placed.status, StatusCode::CREATED, "{:?}", placed.body);
    assert_eq!(placed.body["status"], "PENDING");
    assert_eq!(placed.body["quotedPrice"], 3500.0);
    assert_eq!(placed.body["clientDetails"]["shippingAddress"]["country"], "Philippines");
    let id = placed.body["id"].as_str().unwrap().to_owned();
    let uri = format!("/api/orders/{id}");

    assert_eq!(
        app.patch(&uri, Some(&client), json!({ "status": "ACKNOWLEDGED" })).await.status,
        StatusCode::FORBIDDEN
    );
    assert_eq!(
        app.patch(&uri, Some(&lab), json!({ "status": "COMPLETED" })).await.status,
        StatusCode::CONFLICT
    );
    assert_eq!(
        app.patch(&uri, Some(&lab), json!({ "status": "PENDING" })).await.status,
        StatusCode::BAD_REQUEST
    );

    for status in ["ACKNOWLEDGED", "IN_PROGRESS"] {
        let reply = app.patch(&uri, Some(&lab), json!({ "status": status })).await;
        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(reply.body["status"], status);
    }
    let done = app
        .patch(
            &uri,
            Some(&lab),
            json!({
                "status": "COMPLETED",
                "resultFileUrl": "https://files.pipetgo.test/r/1.pdf",
                "resultFileName": "report.pdf"
            }),
        )
        .await;
    assert_eq!(done.status, StatusCode::OK);
    assert_eq!(done.body["attachments"][0]["attachmentType"], "result");

    let stats = app.get("/api/orders/stats", Some(&client)).await;
    assert_eq!(stats.body["total"], 1);
    assert_eq!(stats.body["byStatus"]["COMPLETED"], 1);

    let dash = app.get("/api/dashboard", Some(&client)).await;
    assert_eq!(dash.body["role"], "CLIENT");
    assert_eq!(dash.body["stats"]["totalSpent"], 3500.0);

    let missing = app
        .patch(
            &format!("/api/orders/{}", uuid::Uuid::new_v4()),
            Some(&lab),
            json!({ "status": "ACKNOWLEDGED" }),
        )
        .await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn quote_required_order_flow() {
    let app = TestApp::new();
    let client = app.login("client@pipetgo.test").await;
    let lab = app.login("lab@pipetgo.test").await;
    let admin = app.login("admin@pipetgo.test").await;
    let service = app.service_id("QUOTE_REQUIRED").await;

    let placed = app.post("/api/orders", Some(&client), order_body(&service)).await;
    assert_eq!(placed.body["status"], "QUOTE_REQUESTED");
    assert!(placed.body["quotedPrice"].is_null());
    let id = placed.body["id"].as_str().unwrap().to_owned();

    let quote = json!({ "quotedPrice": 8000, "quoteNotes": "Includes 3 replicates", "estimatedTurnaroundDays": 14 });
    assert_eq!(
        app.post(&format!("/api/orders/{id}/quote"), Some(&admin), quote.clone()).await.status,
        StatusCode::FORBIDDEN
    );
    let bad = app
        .post(&format!("/api/orders/{id}/quote"), Some(&lab), json!({ "quotedPrice": 0 }))
        .await;
    assert_eq!(bad.status, StatusCode::BAD_REQUEST);

    let quoted = app.post(&format!("/api/orders/{id}/quote"), Some(&lab), quote).await;
    assert_eq!(quoted.status, StatusCode::OK);
    assert_eq!(quoted.body["status"], "QUOTE_PROVIDED");

    let reject_without_reason = app
        .post(&format!("/api/orders/{id}/approve-quote"), Some(&client), json!({ "approved": false }))
        .await;
    assert_eq!(reject_without_reason.status, StatusCode::BAD_REQUEST);

    let rejected = app
        .post(
            &format!("/api/orders/{id}/approve-quote"),
            Some(&client),
            json!({ "approved": false, "rejectionReason": "Budget is lower than the quoted amount" }),
        )
        .await;
    assert_eq!(rejected.status, StatusCode::OK);
    assert_eq!(rejected.body["status"], "QUOTE_REJECTED");

    let again = app
        .post(&format!("/api/orders/{id}/approve-quote"), Some(&client), json!({ "approved": true }))
        .await;
    assert_eq!(again.status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn other_clients_cannot_see_orders() {
    let app = TestApp::new();
    let client = app.login("client@pipetgo.test").await;
    let service = app.service_id("HYBRID").await;
    let placed = app.post("/api/orders", Some(&client), order_body(&service)).await;
    assert_eq!(placed.body["status"], "PENDING");
    let id = placed.body["id"].as_str().unwrap().to_owned();

    let signup = app
        .post(
            "/api/auth/signup",
            None,
            json!({
                "name": "Other Client",
                "email": "other@pipetgo.test",
                "role": "CLIENT",
                "password": "Sampl3Pass"
            }),
        )
        .await;
    let other = signup.body["token"].as_str().unwrap().to_owned();

    let reply = app
        .post(
            &format!("/api/orders/{id}/request-custom-quote"),
            Some(&other),
            json!({ "reason": "Need a bulk discount for 50 samples" }),
        )
        .await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert_eq!(reply.body["message"], "Order not found or access denied");

    let listed = app.get("/api/orders", Some(&other)).await;
    assert!(listed.body.as_array().unwrap().is_empty());

    let mine = app
        .post(
            &format!("/api/orders/{id}/request-custom-quote"),
            Some(&client),
            json!({ "reason": "Need a bulk discount for 50 samples" }),
        )
        .await;
    assert_eq!(mine.status, StatusCode::OK);
    assert_eq!(mine.body["status"], "QUOTE_REQUESTED");
}

#[tokio::test]
async fn analytics_access() {
    let app = TestApp::new();
    let client = app.login("client@pipetgo.test").await;
    let lab = app.login("lab@pipetgo.test").await;

    assert_eq!(app.get("/api/analytics", None).await.status, StatusCode::UNAUTHORIZED);
    assert_eq!(
        app.get("/api/analytics", Some(&client)).await.status,
        StatusCode::FORBIDDEN
    );

    let reply = app.get("/api/analytics?timeframe=allTime", Some(&lab)).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["revenue"]["growth"], 0.0);
    assert_eq!(reply.body["orders"]["monthlyVolume"].as_array().unwrap().len(), 12);
}

#[tokio::test]
async fn lab_profile_round_trip() {
    let app = TestApp::new();
    let lab = app.login("lab@pipetgo.test").await;

    let mine = app.get("/api/labs/mine", Some(&lab)).await;
    assert_eq!(mine.status, StatusCode::OK);

    let saved = app
        .call(
            Method::PUT,
            "/api/labs/mine",
            Some(&lab),
            Some(json!({
                "name": "Davao Microbiology Center",
                "location": {
                    "address": "45 Roxas Avenue",
                    "city": "Davao City",
                    "state": "Davao del Sur",
                    "country": "Philippines",
                    "postalCode": "8000",
                    "coordinates": { "lat": 7.07, "lng": 125.61 }
                },
                "certifications": ["ISO/IEC 17025", "FDA Accredited"]
            })),
        )
        .await;
    assert_eq!(saved.status, StatusCode::OK, "{:?}", saved.body);
    assert_eq!(saved.body["id"], mine.body["id"]);
    assert_eq!(saved.body["location"]["postalCode"], "8000");
}

#[tokio::test]
async fn lab_admins_cannot_touch_another_lab() {
    let app = TestApp::new();
    let client = app.login("client@pipetgo.test").await;
    let lab = app.login("lab@pipetgo.test").await;
    let service = app.service_id("QUOTE_REQUIRED").await;

    let placed = app.post("/api/orders", Some(&client), order_body(&service)).await;
    assert_eq!(placed.status, StatusCode::CREATED);
    let order = placed.body["id"].as_str().unwrap().to_owned();

    let signup = app
        .post(
            "/api/auth/signup",
            None,
            json!({
                "name": "Rival Admin",
                "email": "rival@pipetgo.test",
                "role": "LAB_ADMIN",
                "password": "Sampl3Pass"
            }),
        )
        .await;
    assert_eq!(signup.status, StatusCode::CREATED);
    let rival = signup.body["token"].as_str().unwrap().to_owned();

    let rival_lab = app
        .call(
            Method::PUT,
            "/api/labs/mine",
            Some(&rival),
            Some(json!({
                "name": "Iloilo Testing Services",
                "location": {
                    "address": "8 General Luna St",
                    "city": "Iloilo City",
                    "state": "Iloilo",
                    "country": "Philippines",
                    "postalCode": "5000"
                }
            })),
        )
        .await;
    assert_eq!(rival_lab.status, StatusCode::OK, "{:?}", rival_lab.body);

    let update = app
        .patch(
            &format!("/api/orders/{order}"),
            Some(&rival),
            json!({ "status": "ACKNOWLEDGED" }),
        )
        .await;
    assert_eq!(update.status, StatusCode::FORBIDDEN);

    let quote = app
        .post(
            &format!("/api/orders/{order}/quote"),
            Some(&rival),
            json!({ "quotedPrice": 4200, "estimatedTurnaroundDays": 5 }),
        )
        .await;
    assert_eq!(quote.status, StatusCode::NOT_FOUND);

    let svc = format!("/api/services/{service}");
    assert_eq!(app.get(&svc, Some(&rival)).await.status, StatusCode::NOT_FOUND);
    assert_eq!(
        app.patch(&svc, Some(&rival), json!({ "active": false })).await.status,
        StatusCode::NOT_FOUND
    );

    let bulk = app
        .post(
            "/api/services/bulk",
            Some(&rival),
            json!({ "serviceIds": [service], "action": "disable" }),
        )
        .await;
    assert_eq!(bulk.status, StatusCode::FORBIDDEN);

    let listed = app.get("/api/orders", Some(&rival)).await;
    assert_eq!(listed.status, StatusCode::OK);
    assert!(listed.body.as_array().unwrap().is_empty());
    let stats = app.get("/api/orders/stats", Some(&rival)).await;
    assert_eq!(stats.body["total"], 0);

    // nothing the rival tried took effect
    let owned = app.get(&svc, Some(&lab)).await;
    assert_eq!(owned.status, StatusCode::OK);
    assert_eq!(owned.body["active"], true);
    let mine = app.get("/api/orders", Some(&lab)).await;
    let orders = mine.body.as_array().unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0]["status"], "QUOTE_REQUESTED");
}
