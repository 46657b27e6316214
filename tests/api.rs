//! End-to-end tests of the HTTP surface.
//!
//! The router runs against in-memory collaborators (`MemoryStore`,
//! `MemoryDenylist`, `StaticCredentialStore`), so no PostgreSQL or Redis
//! is needed: `cargo test --test api`.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use listings::auth::credentials::StaticCredentialStore;
use listings::auth::denylist::MemoryDenylist;
use listings::auth::jwt::JwtManager;
use listings::auth::scopes::{ScopeTable, READ, WRITE};
use listings::auth::Authenticator;
use listings::search::PageLimits;
use listings::service::ListingService;
use listings::store::memory::MemoryStore;
use listings::AppState;

const ADMIN: (&str, &str) = ("admin-client", "admin-secret");
const READER: (&str, &str) = ("reader-client", "reader-secret");

fn app() -> Router {
    let credentials = StaticCredentialStore::default()
        .with_client(ADMIN.0, ADMIN.1, &[READ, WRITE])
        .and_then(|s| s.with_client(READER.0, READER.1, &[READ]))
        .unwrap();
    let auth = Authenticator::new(
        JwtManager::new(b"integration-test-secret", 3600),
        ScopeTable::default(),
        Arc::new(MemoryDenylist::new()),
        Arc::new(credentials),
    );
    let service = ListingService::new(Arc::new(MemoryStore::new()), PageLimits::default());
    listings::app(AppState::new(service, auth))
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

async fn login(app: &Router, client: (&str, &str)) -> String {
    let (status, body) = send(
        app,
        Method::POST,
        "/v1/auth/login",
        None,
        Some(json!({ "clientId": client.0, "clientSecret": client.1 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login failed: {}", body);
    body["accessToken"].as_str().unwrap().to_string()
}

fn listing_body(title: &str, price: f64) -> Value {
    json!({
        "title": title,
        "address": format!("{} Avenue 100", title),
        "squareMeters": 120,
        "bedrooms": 3,
        "bathrooms": 2,
        "lifeQualityIndex": 7.5,
        "hasPorch": true,
        "poolType": "none",
        "barbequeArea": "own",
        "parkingSpace": "garage",
        "status": "ON_SALE",
        "currency": "USD",
        "price": price,
    })
}

async fn create(app: &Router, token: &str, title: &str, price: f64) -> i64 {
    let (status, body) = send(
        app,
        Method::POST,
        "/v1/real-estate-listing",
        Some(token),
        Some(listing_body(title, price)),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "create failed: {}", body);
    body["id"].as_i64().unwrap()
}

mod auth_tests {
    use super::*;

    /// A request without a bearer token never reaches the handler.
    #[tokio::test]
    async fn test_missing_token_is_unauthorized() {
        let app = app();
        let (status, body) = send(&app, Method::GET, "/v1/real-estate-listing", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, json!({ "message": "Unauthorized" }));
    }

    #[tokio::test]
    async fn test_garbage_token_is_unauthorized() {
        let app = app();
        let (status, _) = send(
            &app,
            Method::GET,
            "/v1/real-estate-listing/1",
            Some("not.a.jwt"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_token_signed_with_other_secret_is_unauthorized() {
        let app = app();
        let foreign = JwtManager::new(b"someone-else", 3600)
            .issue(ADMIN.0, &[READ.to_string()])
            .unwrap();
        let (status, _) = send(
            &app,
            Method::GET,
            "/v1/real-estate-listing",
            Some(&foreign),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_login_returns_token_scopes_and_lifetime() {
        let app = app();
        let (status, body) = send(
            &app,
            Method::POST,
            "/v1/auth/login",
            None,
            Some(json!({ "clientId": READER.0, "clientSecret": READER.1 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["accessToken"].as_str().unwrap().split('.').count() == 3);
        assert_eq!(body["scopes"], json!([READ]));
        assert_eq!(body["expiresIn"], 3600);
    }

    #[tokio::test]
    async fn test_login_with_wrong_secret_is_forbidden() {
        let app = app();
        let (status, body) = send(
            &app,
            Method::POST,
            "/v1/auth/login",
            None,
            Some(json!({ "clientId": READER.0, "clientSecret": ADMIN.1 })),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body, json!({ "message": "Invalid credentials" }));
    }

    #[tokio::test]
    async fn test_login_body_is_validated() {
        let app = app();
        let (status, body) = send(
            &app,
            Method::POST,
            "/v1/auth/login",
            None,
            Some(json!({ "clientId": "", "clientSecret": "" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Invalid request");
        let errors = body["validationErrors"].as_array().unwrap();
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().any(|e| e["path"] == json!(["clientSecret"])));

        let (status, body) = send(
            &app,
            Method::POST,
            "/v1/auth/login",
            None,
            Some(json!({ "clientId": "admin-client" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["validationErrors"][0]["path"], json!(["body"]));
        assert!(body["validationErrors"][0]["error"]
            .as_str()
            .unwrap()
            .contains("clientSecret"));
    }

    /// A read-only client is turned away from write routes.
    #[tokio::test]
    async fn test_read_only_client_cannot_delete() {
        let app = app();
        let admin = login(&app, ADMIN).await;
        let id = create(&app, &admin, "Read Only Target", 100.0).await;

        let reader = login(&app, READER).await;
        let (status, _) = send(
            &app,
            Method::GET,
            &format!("/v1/real-estate-listing/{}", id),
            Some(&reader),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(
            &app,
            Method::DELETE,
            "/v1/real-estate-listing/5",
            Some(&reader),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, json!({ "message": "Unauthorized" }));
    }

    #[tokio::test]
    async fn test_logout_revokes_token() {
        let app = app();
        let token = login(&app, ADMIN).await;

        let (status, body) = send(&app, Method::POST, "/v1/auth/logout", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Token invalidated successfully");

        let (status, _) =
            send(&app, Method::GET, "/v1/real-estate-listing", Some(&token), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let fresh = login(&app, ADMIN).await;
        let (status, _) =
            send(&app, Method::GET, "/v1/real-estate-listing", Some(&fresh), None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_logout_without_token_is_unprocessable() {
        let app = app();
        let (status, body) = send(&app, Method::POST, "/v1/auth/logout", None, None).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["message"], "Could not invalidate token");
    }
}

mod listing_tests {
    use super::*;

    #[tokio::test]
    async fn test_create_records_initial_history() {
        let app = app();
        let token = login(&app, ADMIN).await;
        let id = create(&app, &token, "Sunny Loft", 250000.0).await;

        let (status, body) = send(
            &app,
            Method::GET,
            &format!("/v1/real-estate-listing/{}/history", id),
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"].as_array().unwrap().len(), 1);
        assert_eq!(body["status"][0]["status"], "ON_SALE");
        assert_eq!(body["price"].as_array().unwrap().len(), 1);
        assert_eq!(body["price"][0]["currency"], "USD");
    }

    #[tokio::test]
    async fn test_get_returns_listing_in_camel_case() {
        let app = app();
        let token = login(&app, ADMIN).await;
        let id = create(&app, &token, "Corner House", 1234.5).await;

        let (status, body) = send(
            &app,
            Method::GET,
            &format!("/v1/real-estate-listing/{}", id),
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["title"], "Corner House");
        assert_eq!(body["squareMeters"], 120);
        assert_eq!(body["parkingSpace"], "garage");
        assert_eq!(body["price"].as_f64(), Some(1234.5));
        assert!(body.get("isActive").is_none());
        assert!(body["createdAt"].is_string());
    }

    /// Price and currency changes add one price row and no status row.
    #[tokio::test]
    async fn test_update_price_appends_price_history_only() {
        let app = app();
        let token = login(&app, ADMIN).await;
        let id = create(&app, &token, "Harbour View", 100.0).await;

        let (status, body) = send(
            &app,
            Method::PATCH,
            &format!("/v1/real-estate-listing/{}", id),
            Some(&token),
            Some(json!({ "price": 150, "currency": "EUR" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Listing updated successfully");

        let (_, history) = send(
            &app,
            Method::GET,
            &format!("/v1/real-estate-listing/{}/history", id),
            Some(&token),
            None,
        )
        .await;
        assert_eq!(history["status"].as_array().unwrap().len(), 1);
        let prices = history["price"].as_array().unwrap();
        assert_eq!(prices.len(), 2);
        assert_eq!(prices[1]["price"].as_f64(), Some(150.0));
        assert_eq!(prices[1]["currency"], "EUR");
    }

    #[tokio::test]
    async fn test_update_status_appends_status_history() {
        let app = app();
        let token = login(&app, ADMIN).await;
        let id = create(&app, &token, "Old Mill", 100.0).await;

        let (status, _) = send(
            &app,
            Method::PATCH,
            &format!("/v1/real-estate-listing/{}", id),
            Some(&token),
            Some(json!({ "status": "SOLD" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (_, history) = send(
            &app,
            Method::GET,
            &format!("/v1/real-estate-listing/{}/history", id),
            Some(&token),
            None,
        )
        .await;
        assert_eq!(history["status"].as_array().unwrap().len(), 2);
        assert_eq!(history["status"][1]["status"], "SOLD");
        assert_eq!(history["price"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_rejects_empty_and_unknown_fields() {
        let app = app();
        let token = login(&app, ADMIN).await;
        let id = create(&app, &token, "Quiet Street", 100.0).await;
        let uri = format!("/v1/real-estate-listing/{}", id);

        let (status, body) = send(&app, Method::PATCH, &uri, Some(&token), Some(json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["validationErrors"][0]["path"], json!(["body"]));

        let (status, body) = send(
            &app,
            Method::PATCH,
            &uri,
            Some(&token),
            Some(json!({ "isActive": false })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["validationErrors"][0]["path"], json!(["body"]));
        assert!(body["validationErrors"][0]["error"]
            .as_str()
            .unwrap()
            .contains("isActive"));
    }

    #[tokio::test]
    async fn test_update_missing_listing_is_unprocessable() {
        let app = app();
        let token = login(&app, ADMIN).await;
        let (status, body) = send(
            &app,
            Method::PATCH,
            "/v1/real-estate-listing/42",
            Some(&token),
            Some(json!({ "bedrooms": 4 })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["message"], "Could not update listing");
    }

    #[tokio::test]
    async fn test_create_duplicate_title_is_unprocessable() {
        let app = app();
        let token = login(&app, ADMIN).await;
        create(&app, &token, "Twin Peaks", 100.0).await;

        let (status, body) = send(
            &app,
            Method::POST,
            "/v1/real-estate-listing/",
            Some(&token),
            Some(listing_body("Twin Peaks", 200.0)),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["message"], "Could not create listing");
    }

    #[tokio::test]
    async fn test_create_reports_each_invalid_field() {
        let app = app();
        let token = login(&app, ADMIN).await;
        let mut body = listing_body("Broken", 100.0);
        body["bedrooms"] = json!(0);
        body["title"] = json!("");
        body["squareMeters"] = json!(2.5);
        body["price"] = json!(10.555);

        let (status, response) = send(
            &app,
            Method::POST,
            "/v1/real-estate-listing",
            Some(&token),
            Some(body),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let mut paths: Vec<String> = response["validationErrors"]
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["path"][0].as_str().unwrap().to_string())
            .collect();
        paths.sort();
        assert_eq!(paths, vec!["bedrooms", "price", "squareMeters", "title"]);
    }

    #[tokio::test]
    async fn test_create_rejects_unknown_enum_value_at_body() {
        let app = app();
        let token = login(&app, ADMIN).await;
        let mut body = listing_body("Foreign", 100.0);
        body["currency"] = json!("GBP");

        let (status, response) = send(
            &app,
            Method::POST,
            "/v1/real-estate-listing",
            Some(&token),
            Some(body),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(response["validationErrors"][0]["path"], json!(["body"]));
    }

    #[tokio::test]
    async fn test_create_accepts_integral_floats() {
        let app = app();
        let token = login(&app, ADMIN).await;
        let mut body = listing_body("Round Numbers", 100.0);
        body["bedrooms"] = json!(3.0);
        body["squareMeters"] = json!(120.0);

        let (status, created) = send(
            &app,
            Method::POST,
            "/v1/real-estate-listing",
            Some(&token),
            Some(body),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{}", created);
        assert_eq!(created["bedrooms"], 3);
        assert_eq!(created["squareMeters"], 120);
    }

    /// Deleted and never-created listings both read as "no content".
    #[tokio::test]
    async fn test_soft_deleted_and_missing_listings_are_no_content() {
        let app = app();
        let token = login(&app, ADMIN).await;
        let id = create(&app, &token, "Short Lived", 100.0).await;
        let uri = format!("/v1/real-estate-listing/{}", id);

        let (status, body) = send(&app, Method::DELETE, &uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Listing deleted successfully");

        let (status, body) = send(&app, Method::GET, &uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert_eq!(body, Value::Null);

        let (status, _) = send(
            &app,
            Method::GET,
            "/v1/real-estate-listing/999",
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, body) = send(&app, Method::DELETE, &uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["message"], "Could not delete listing");
    }

    #[tokio::test]
    async fn test_invalid_id_is_bad_request() {
        let app = app();
        let token = login(&app, ADMIN).await;
        for uri in [
            "/v1/real-estate-listing/abc",
            "/v1/real-estate-listing/0",
            "/v1/real-estate-listing/2147483648",
        ] {
            let (status, body) = send(&app, Method::GET, uri, Some(&token), None).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
            assert_eq!(body["validationErrors"][0]["path"], json!(["id"]));
        }
    }

    #[tokio::test]
    async fn test_undecodable_id_is_json_bad_request() {
        let app = app();
        let token = login(&app, ADMIN).await;
        for method in [Method::GET, Method::DELETE] {
            let (status, body) = send(
                &app,
                method,
                "/v1/real-estate-listing/%FF",
                Some(&token),
                None,
            )
            .await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["message"], "Invalid request");
            assert_eq!(body["validationErrors"][0]["path"], json!(["id"]));
        }
    }

    #[tokio::test]
    async fn test_integral_float_id_is_accepted() {
        let app = app();
        let token = login(&app, ADMIN).await;
        let id = create(&app, &token, "Float Id", 100.0).await;
        let uri = format!("/v1/real-estate-listing/{}.0", id);
        let (status, body) = send(&app, Method::GET, &uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], id);
    }
}

mod search_tests {
    use super::*;

    #[tokio::test]
    async fn test_title_like_returns_matches_with_full_total() {
        let app = app();
        let token = login(&app, ADMIN).await;
        for i in 0..12 {
            create(&app, &token, &format!("Lake House {}", i), 1000.0 + i as f64).await;
        }
        create(&app, &token, "City Flat", 500.0).await;

        let (status, body) = send(
            &app,
            Method::GET,
            "/v1/real-estate-listing?titleLike=House",
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let results = body["results"].as_array().unwrap();
        assert_eq!(results.len(), 10);
        assert_eq!(body["total"], 12);
        assert!(results
            .iter()
            .all(|r| r["title"].as_str().unwrap().contains("House")));
    }

    #[tokio::test]
    async fn test_equal_price_bounds_match_exactly() {
        let app = app();
        let token = login(&app, ADMIN).await;
        create(&app, &token, "Cheap", 99.99).await;
        create(&app, &token, "Exact", 100.0).await;
        create(&app, &token, "Pricey", 100.01).await;

        let (status, body) = send(
            &app,
            Method::GET,
            "/v1/real-estate-listing?minPrice=100&maxPrice=100",
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 1);
        assert_eq!(body["results"][0]["title"], "Exact");
    }

    #[tokio::test]
    async fn test_inverted_range_is_bad_request() {
        let app = app();
        let token = login(&app, ADMIN).await;
        let (status, body) = send(
            &app,
            Method::GET,
            "/v1/real-estate-listing?minPrice=200&maxPrice=100",
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["validationErrors"][0]["path"], json!(["minPrice"]));
    }

    #[tokio::test]
    async fn test_unknown_parameter_is_bad_request() {
        let app = app();
        let token = login(&app, ADMIN).await;
        let (status, body) = send(
            &app,
            Method::GET,
            "/v1/real-estate-listing/?isActive=false",
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["validationErrors"][0]["path"], json!(["query"]));
        assert!(body["validationErrors"][0]["error"]
            .as_str()
            .unwrap()
            .contains("isActive"));
    }

    #[tokio::test]
    async fn test_integral_float_counts_are_accepted() {
        let app = app();
        let token = login(&app, ADMIN).await;
        create(&app, &token, "Three Rooms", 100.0).await;

        let (status, body) = send(
            &app,
            Method::GET,
            "/v1/real-estate-listing?minBedrooms=3.0&maxBedrooms=3",
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{}", body);
        assert_eq!(body["total"], 1);

        let (status, body) = send(
            &app,
            Method::GET,
            "/v1/real-estate-listing?minBedrooms=2.5",
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["validationErrors"][0]["path"], json!(["minBedrooms"]));
    }

    #[tokio::test]
    async fn test_order_limit_and_offset() {
        let app = app();
        let token = login(&app, ADMIN).await;
        for (title, price) in [("A", 300.0), ("B", 100.0), ("C", 200.0)] {
            create(&app, &token, title, price).await;
        }

        let (status, body) = send(
            &app,
            Method::GET,
            "/v1/real-estate-listing?orderBy=price&orderDirection=asc&limit=2&offset=1",
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 3);
        let titles: Vec<&str> = body["results"]
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["title"].as_str().unwrap())
            .collect();
        assert_eq!(titles, vec!["C", "A"]);
    }

    #[tokio::test]
    async fn test_deleted_listings_never_match() {
        let app = app();
        let token = login(&app, ADMIN).await;
        let id = create(&app, &token, "Gone Soon", 100.0).await;
        create(&app, &token, "Staying", 100.0).await;
        send(
            &app,
            Method::DELETE,
            &format!("/v1/real-estate-listing/{}", id),
            Some(&token),
            None,
        )
        .await;

        let (_, body) = send(&app, Method::GET, "/v1/real-estate-listing", Some(&token), None).await;
        assert_eq!(body["total"], 1);
        assert_eq!(body["results"][0]["title"], "Staying");
    }
}

mod surface_tests {
    use super::*;

    #[tokio::test]
    async fn test_health_endpoints_need_no_token() {
        let app = app();
        for uri in ["/healthz", "/readyz"] {
            let response = app
                .clone()
                .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }
    }

    #[tokio::test]
    async fn test_responses_carry_request_id_and_security_headers() {
        let app = app();
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/v1/real-estate-listing")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let headers = response.headers();
        assert!(headers.contains_key("x-request-id"));
        assert_eq!(headers["x-content-type-options"], "nosniff");
        assert_eq!(headers["x-frame-options"], "DENY");
    }

    #[tokio::test]
    async fn test_unknown_route_is_not_found() {
        let app = app();
        let (status, _) = send(&app, Method::GET, "/v2/anything", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
