#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, Response};
use staffgate::db::{AccountStatus, Database, NewAccount, Role};
use staffgate::jwt::JwtConfig;
use staffgate::{ServerConfig, create_app, password};
use tower::ServiceExt;

/// Secret shared by the test app and directly-minted tokens.
pub const TEST_SECRET: &[u8] = b"test-jwt-secret-long-enough-for-hs256";

pub const TEST_ACCESS_TTL: u64 = 900;
pub const TEST_REFRESH_TTL: u64 = 3600;

/// Create a test app with an in-memory database.
pub async fn create_test_app() -> (axum::Router, Database) {
    create_test_app_with_rotation(true).await
}

pub async fn create_test_app_with_rotation(rotate_refresh: bool) -> (axum::Router, Database) {
    let db = Database::open(":memory:")
        .await
        .expect("Failed to open test database");
    let config = ServerConfig {
        db: db.clone(),
        jwt_secret: TEST_SECRET.to_vec(),
        access_ttl_secs: TEST_ACCESS_TTL,
        refresh_ttl_secs: TEST_REFRESH_TTL,
        rotate_refresh,
        secure_cookies: false,
        cors_origin: None,
    };
    (create_app(&config), db)
}

/// A codec matching the test app's signing configuration, for minting
/// tokens directly in tests.
pub fn test_jwt() -> JwtConfig {
    JwtConfig::with_lifetimes(TEST_SECRET, TEST_ACCESS_TTL, TEST_REFRESH_TTL)
}

/// Seed an account and return its id.
pub async fn seed_account(
    db: &Database,
    email: &str,
    pass: &str,
    role: Role,
    status: AccountStatus,
) -> String {
    let hash = password::hash_password(pass).unwrap();
    db.users()
        .create(
            &NewAccount {
                email,
                password_hash: &hash,
                role,
                client_id: Some("client-1"),
                status,
            },
            1_700_000_000,
        )
        .await
        .unwrap()
}

pub fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

/// Log in through the API and return the response.
pub async fn do_login(app: &axum::Router, email: &str, pass: &str) -> Response<Body> {
    app.clone()
        .oneshot(json_request(
            "POST",
            "/auth/login",
            serde_json::json!({ "email": email, "password": pass }),
        ))
        .await
        .unwrap()
}

/// Extract Set-Cookie headers from a response.
pub fn extract_set_cookies(response: &Response<Body>) -> Vec<String> {
    response
        .headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .collect()
}

/// Pull the value of a named cookie out of Set-Cookie headers.
pub fn cookie_value(cookies: &[String], name: &str) -> Option<String> {
    let prefix = format!("{}=", name);
    cookies.iter().find_map(|c| {
        let rest = c.strip_prefix(&prefix)?;
        let value = rest.split(';').next().unwrap_or("");
        if value.is_empty() {
            None
        } else {
            Some(value.to_string())
        }
    })
}

/// Check if cookies contain a token being cleared (Max-Age=0).
pub fn has_cleared_cookie(cookies: &[String], cookie_name: &str) -> bool {
    cookies
        .iter()
        .any(|c| c.starts_with(&format!("{}=", cookie_name)) && c.contains("Max-Age=0"))
}

/// Read the response body as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
