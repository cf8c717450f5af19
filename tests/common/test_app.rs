//! Test application setup utilities
//!
//! Spins up the full router against a throwaway SQLite database and drives it
//! with in-process requests (no sockets).

use std::sync::atomic::{AtomicU64, Ordering};

use axum::{
    body::Body,
    http::{header, Request},
    Router,
};
use tower::ServiceExt;

use salon_admin::{
    api,
    config::{AppConfig, AuthConfig, BookingConfig, DatabaseConfig, LoggingConfig, ServerConfig},
    db,
    services::AuditLogger,
    AppState,
};

static DB_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Test application wrapper for integration testing
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
}

impl TestApp {
    /// Create a new test application with a throwaway database
    pub async fn new() -> Self {
        Self::with_config(test_config()).await
    }

    /// Create a new test application with custom configuration
    pub async fn with_config(config: AppConfig) -> Self {
        let db = db::init_pool(&config.database)
            .await
            .expect("Failed to initialize test database");

        let audit = AuditLogger::spawn(db.clone());

        let state = AppState {
            config,
            db,
            audit,
        };

        // Same assembly as the server, minus rate limiting (oneshot requests
        // carry no peer address)
        let router = Router::new()
            .nest("/api/v1", api::public_routes())
            .nest(
                "/api/v1",
                api::protected_routes().layer(axum::middleware::from_fn_with_state(
                    state.clone(),
                    salon_admin::middleware::auth::auth_middleware,
                )),
            )
            .with_state(state.clone());

        Self { router, state }
    }

    /// Log in and return the session cookie value, panicking on failure
    pub async fn login(&self, username: &str, password: &str) -> String {
        let response = self
            .post_json(
                "/api/v1/auth/login",
                serde_json::json!({ "username": username, "password": password }),
            )
            .await;
        response.assert_ok();
        response
            .session_cookie()
            .expect("login response did not set a session cookie")
    }

    pub async fn get(&self, uri: &str) -> TestResponse {
        self.request(
            Request::builder()
                .method("GET")
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    pub async fn get_auth(&self, uri: &str, session: &str) -> TestResponse {
        self.request(with_session(
            Request::builder()
                .method("GET")
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
            session,
        ))
        .await
    }

    pub async fn post_json(&self, uri: &str, body: serde_json::Value) -> TestResponse {
        self.request(json_request("POST", uri, body)).await
    }

    pub async fn post_json_auth(
        &self,
        uri: &str,
        body: serde_json::Value,
        session: &str,
    ) -> TestResponse {
        self.request(with_session(json_request("POST", uri, body), session))
            .await
    }

    pub async fn put_json_auth(
        &self,
        uri: &str,
        body: serde_json::Value,
        session: &str,
    ) -> TestResponse {
        self.request(with_session(json_request("PUT", uri, body), session))
            .await
    }

    pub async fn patch_auth(&self, uri: &str, session: &str) -> TestResponse {
        self.request(with_session(
            Request::builder()
                .method("PATCH")
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
            session,
        ))
        .await
    }

    pub async fn delete_auth(&self, uri: &str, session: &str) -> TestResponse {
        self.request(with_session(
            Request::builder()
                .method("DELETE")
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
            session,
        ))
        .await
    }

    /// Make an arbitrary request
    pub async fn request(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to execute request");

        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read response body");

        TestResponse {
            status,
            headers,
            body,
        }
    }
}

fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn with_session(request: Request<Body>, session: &str) -> Request<Body> {
    let (mut parts, body) = request.into_parts();
    parts.headers.insert(
        header::COOKIE,
        format!("token={}", session).parse().unwrap(),
    );
    Request::from_parts(parts, body)
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: axum::http::StatusCode,
    pub headers: axum::http::HeaderMap,
    pub body: bytes::Bytes,
}

impl TestResponse {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).to_string()
    }

    pub fn json<T: serde::de::DeserializeOwned>(&self) -> T {
        serde_json::from_slice(&self.body).expect("Failed to parse response as JSON")
    }

    /// Extract the session cookie value from Set-Cookie, if any
    pub fn session_cookie(&self) -> Option<String> {
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find_map(|v| {
                let rest = v.strip_prefix("token=")?;
                let value = rest.split(';').next()?.to_string();
                if value.is_empty() {
                    None
                } else {
                    Some(value)
                }
            })
    }

    pub fn assert_status(&self, expected: axum::http::StatusCode) -> &Self {
        assert_eq!(
            self.status,
            expected,
            "Expected status {}, got {}. Body: {}",
            expected,
            self.status,
            self.text()
        );
        self
    }

    pub fn assert_ok(&self) -> &Self {
        self.assert_status(axum::http::StatusCode::OK)
    }

    pub fn assert_created(&self) -> &Self {
        self.assert_status(axum::http::StatusCode::CREATED)
    }

    pub fn assert_bad_request(&self) -> &Self {
        self.assert_status(axum::http::StatusCode::BAD_REQUEST)
    }

    pub fn assert_unauthorized(&self) -> &Self {
        self.assert_status(axum::http::StatusCode::UNAUTHORIZED)
    }

    pub fn assert_forbidden(&self) -> &Self {
        self.assert_status(axum::http::StatusCode::FORBIDDEN)
    }

    pub fn assert_not_found(&self) -> &Self {
        self.assert_status(axum::http::StatusCode::NOT_FOUND)
    }
}

/// Create a test configuration with a unique temporary SQLite database
pub fn test_config() -> AppConfig {
    let db_path = format!(
        "/tmp/salon_admin_test_{}_{}.db",
        std::process::id(),
        DB_COUNTER.fetch_add(1, Ordering::SeqCst)
    );

    AppConfig {
        server: ServerConfig::default(),
        auth: AuthConfig {
            jwt_secret: "test-secret-that-is-at-least-32-characters-long".to_string(),
            session_ttl_days: 3,
            password_min_length: 8,
            secure_cookies: false,
        },
        database: DatabaseConfig {
            url: format!("sqlite://{}", db_path),
            max_connections: 5,
            connect_timeout_secs: 5,
        },
        logging: LoggingConfig::default(),
        booking: BookingConfig::default(),
    }
}
