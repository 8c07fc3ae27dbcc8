//! Application router configuration with protected and unprotected route definitions.

use std::path::Path;

use axum::{
    Router, middleware,
    routing::{any, get, post},
};
use tower_http::{cors::CorsLayer, services::ServeDir};

use crate::{
    AppState, Error,
    auth::{auth_guard, post_log_in},
    endpoints,
    import::bulk_import_endpoint,
    report::get_balance_sheet_endpoint,
    resource::{RESOURCES, resource_routes},
    seed::seed_endpoint,
};

/// Return a router with all the app's routes.
///
/// Unknown paths under `/api` and requests with the wrong method for a route
/// get a JSON error. Other paths are served from `static_dir`.
pub fn build_router(state: AppState, static_dir: &Path) -> Router {
    let unprotected_routes = Router::new().route(endpoints::LOG_IN, post(post_log_in));

    let protected_routes = RESOURCES
        .into_iter()
        .fold(Router::new(), |router, resource| {
            router.merge(resource_routes(resource))
        })
        .route(endpoints::SEED, post(seed_endpoint))
        .route(endpoints::BULK_IMPORT, post(bulk_import_endpoint))
        .route(endpoints::BALANCE_SHEET, get(get_balance_sheet_endpoint))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_guard));

    protected_routes
        .merge(unprotected_routes)
        .route(endpoints::API_FALLBACK, any(api_not_found))
        .method_not_allowed_fallback(method_not_allowed)
        .fallback_service(ServeDir::new(static_dir))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn api_not_found() -> Error {
    Error::NotFound
}

async fn method_not_allowed() -> Error {
    Error::MethodNotAllowed
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use axum::http::{
        HeaderValue, StatusCode,
        header::{ACCESS_CONTROL_ALLOW_ORIGIN, ORIGIN},
    };
    use axum_test::TestServer;
    use serde_json::{Value, json};

    use crate::{
        build_router, endpoints,
        test_utils::{must_create_test_state, must_create_user, must_log_in},
    };

    fn get_test_server() -> TestServer {
        let state = must_create_test_state();
        must_create_user("manager", &state);
        let app = build_router(state, Path::new("public"));

        TestServer::new(app).expect("Could not create test server.")
    }

    #[tokio::test]
    async fn api_routes_require_token() {
        let server = get_test_server();

        for path in [
            "/api/apartments",
            "/api/owners",
            "/api/tenants",
            "/api/maintenance_payments",
            "/api/transactions",
            endpoints::BALANCE_SHEET,
        ] {
            let response = server.get(path).await;

            response.assert_status_unauthorized();
            response.assert_json(&json!({"error": "No token"}));
        }
    }

    #[tokio::test]
    async fn import_then_balance_sheet() {
        let server = get_test_server();
        let token = must_log_in(&server, "manager").await;

        let response = server
            .post(endpoints::BULK_IMPORT)
            .authorization_bearer(&token)
            .json(&json!({"rows": [
                {"date": "2024-03-01", "description": "Rent", "amount": 100, "type": "credit"},
                {"date": "2024-03-02", "description": "Cleaning", "amount": 50, "type": "debit"},
            ]}))
            .await;
        response.assert_status_ok();
        response.assert_json(&json!({"imported": 2}));

        let response = server
            .get(endpoints::BALANCE_SHEET)
            .authorization_bearer(&token)
            .await;

        response.assert_status_ok();
        response.assert_json(&json!({
            "assets": {"bankBalance": 50.0, "maintenanceReceivable": 0.0},
            "totalAssets": 50.0,
        }));
    }

    #[tokio::test]
    async fn failed_import_persists_nothing() {
        let server = get_test_server();
        let token = must_log_in(&server, "manager").await;

        server
            .post(endpoints::BULK_IMPORT)
            .authorization_bearer(&token)
            .json(&json!({"rows": [
                {"date": "2024-03-01", "description": "Rent", "amount": 100, "type": "credit"},
                {"date": "2024-03-02", "description": "Cleaning", "type": "debit"},
            ]}))
            .await
            .assert_status_bad_request();

        server
            .get("/api/transactions")
            .authorization_bearer(&token)
            .await
            .assert_json(&json!([]));
    }

    #[tokio::test]
    async fn crud_round_trip() {
        let server = get_test_server();
        let token = must_log_in(&server, "manager").await;

        let created = server
            .post("/api/owners")
            .authorization_bearer(&token)
            .json(&json!({"name": "Priya", "email": "priya@example.com"}))
            .await;
        created.assert_status(StatusCode::CREATED);
        let id = created.json::<Value>()["id"].as_i64().unwrap();

        server
            .put(&endpoints::format_endpoint(
                &endpoints::resource_item("owners"),
                id,
            ))
            .authorization_bearer(&token)
            .json(&json!({"phone": "555-0101"}))
            .await
            .assert_status_ok();

        server
            .get("/api/owners")
            .authorization_bearer(&token)
            .await
            .assert_json(&json!([{
                "id": id,
                "name": "Priya",
                "email": "priya@example.com",
                "phone": "555-0101",
                "apartment_id": null,
            }]));

        server
            .delete(&endpoints::format_endpoint(
                &endpoints::resource_item("owners"),
                id,
            ))
            .authorization_bearer(&token)
            .await
            .assert_json(&json!({"success": true}));
    }

    #[tokio::test]
    async fn seed_then_seed_again() {
        let server = get_test_server();
        let token = must_log_in(&server, "manager").await;

        let first = server
            .post(endpoints::SEED)
            .authorization_bearer(&token)
            .await;
        let second = server
            .post(endpoints::SEED)
            .authorization_bearer(&token)
            .await;

        first.assert_status_ok();
        first.assert_json(&json!({"message": "Sample data seeded"}));
        second.assert_status_ok();
        second.assert_json(&json!({"message": "Sample data already present"}));
    }

    #[tokio::test]
    async fn log_in_does_not_require_token() {
        let server = get_test_server();

        let response = server
            .post(endpoints::LOG_IN)
            .json(&json!({"username": "manager", "password": "wrong"}))
            .await;

        response.assert_status_unauthorized();
        response.assert_json(&json!({"error": "Invalid credentials"}));
    }

    #[tokio::test]
    async fn cors_allows_any_origin() {
        let server = get_test_server();

        let response = server
            .post(endpoints::LOG_IN)
            .add_header(ORIGIN, HeaderValue::from_static("http://localhost:5173"))
            .json(&json!({"username": "manager", "password": "wrong"}))
            .await;

        assert_eq!(response.header(ACCESS_CONTROL_ALLOW_ORIGIN), "*");
    }

    #[tokio::test]
    async fn unknown_api_path_is_json_not_found() {
        let server = get_test_server();
        let token = must_log_in(&server, "manager").await;

        let response = server
            .get("/api/reports/profit-loss")
            .authorization_bearer(&token)
            .await;

        response.assert_status_not_found();
        response.assert_json(&json!({"error": "the requested resource could not be found"}));
    }

    #[tokio::test]
    async fn wrong_method_is_json_method_not_allowed() {
        let server = get_test_server();
        let token = must_log_in(&server, "manager").await;

        let response = server
            .get(&endpoints::format_endpoint(
                &endpoints::resource_item("apartments"),
                1,
            ))
            .authorization_bearer(&token)
            .await;

        response.assert_status(StatusCode::METHOD_NOT_ALLOWED);
        response.assert_json(&json!({"error": "method not allowed"}));
    }

    #[tokio::test]
    async fn unknown_path_falls_through_to_static_files() {
        let server = get_test_server();

        server
            .get("/this-file-does-not-exist.html")
            .await
            .assert_status_not_found();
    }
}
