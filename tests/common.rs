#![allow(dead_code)]

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, Response};
use axum::Router;
use quota_gate::{
    app::{build_router, AppState},
    auth::session::{seal_oauth_session, OAuthAssertion},
    config::{AppConfig, AuthCfg, DbCfg, ServerCfg, StoreBackend},
    repos::memory::{MemoryCredentialStore, MemoryProfileStore},
};
use tower_cookies::Key;

pub const ADMIN_CODE: &str = "admin-test-code";

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
}

pub fn test_config(admin_code: Option<&str>, production: bool) -> AppConfig {
    AppConfig {
        server: ServerCfg {
            bind_addr: "127.0.0.1:0".to_string(),
            cookie_key_base64: String::new(),
            session_ttl_minutes: 60,
        },
        db: DbCfg { backend: StoreBackend::Memory, url: String::new() },
        auth: AuthCfg { admin_code: admin_code.map(str::to_string), production },
    }
}

pub fn memory_app_with(config: AppConfig) -> TestApp {
    let state = AppState::new(
        config,
        Key::generate(),
        MemoryCredentialStore::new(),
        MemoryProfileStore::new(),
    );
    TestApp { router: build_router(state.clone()), state }
}

pub fn memory_app() -> TestApp {
    memory_app_with(test_config(Some(ADMIN_CODE), false))
}

impl TestApp {
    pub async fn send(&self, req: Request<Body>) -> Response<Body> {
        use tower::ServiceExt; // for `oneshot`
        self.router.clone().oneshot(req).await.unwrap()
    }

    /// Cookie header value carrying a provider-sealed OAuth session.
    pub fn oauth_cookie(&self, assertion: &OAuthAssertion) -> String {
        let c = seal_oauth_session(&self.state.cookie_key, assertion).expect("seal oauth cookie");
        format!("{}={}", c.name(), c.value())
    }
}

pub fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut b = Request::get(uri);
    if let Some(c) = cookie {
        b = b.header(header::COOKIE, c);
    }
    b.body(Body::empty()).unwrap()
}

pub fn post_json(uri: &str, body: serde_json::Value, cookie: Option<&str>) -> Request<Body> {
    let mut b = Request::post(uri).header(header::CONTENT_TYPE, "application/json");
    if let Some(c) = cookie {
        b = b.header(header::COOKIE, c);
    }
    b.body(Body::from(serde_json::to_vec(&body).unwrap())).unwrap()
}

pub fn post_empty(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut b = Request::post(uri);
    if let Some(c) = cookie {
        b = b.header(header::COOKIE, c);
    }
    b.body(Body::empty()).unwrap()
}

pub fn admin_request(method: &str, uri: &str, code: &str, body: Option<serde_json::Value>) -> Request<Body> {
    let b = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", code));
    match body {
        Some(v) => b
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&v).unwrap()))
            .unwrap(),
        None => b.body(Body::empty()).unwrap(),
    }
}

/// Collapse all `Set-Cookie` headers into one `Cookie` header value.
pub fn cookies_from(resp: &Response<Body>) -> Option<String> {
    let pairs: Vec<String> = resp
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|v| v.split(';').next())
        .map(|s| s.trim().to_string())
        .collect();
    if pairs.is_empty() { None } else { Some(pairs.join("; ")) }
}

pub async fn json_body(resp: Response<Body>) -> serde_json::Value {
    let bytes = to_bytes(resp.into_body(), 1024 * 1024).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
