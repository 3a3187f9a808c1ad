#![allow(dead_code)]

use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use axum::body::Body;
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Map, Value};
use tower::ServiceExt;

use fueled_api::config::AppConfig;
use fueled_api::database::MemoryStore;
use fueled_api::{app, AppState};

/// Router wired to a fresh in-memory store.
pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub state: AppState,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    /// `data` of a success envelope.
    pub fn data(&self) -> &Value {
        &self.body["data"]
    }

    pub fn set_cookie(&self) -> Option<&str> {
        self.headers
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
    }
}

pub fn test_app() -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let state = AppState::new(AppConfig::development(), store.clone()).expect("development config has a secret");
    TestApp {
        router: app(state.clone()),
        store,
        state,
    }
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> Result<TestResponse> {
        let response = self.router.clone().oneshot(request).await?;
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).context("response body was not JSON")?
        };
        Ok(TestResponse { status, headers, body })
    }

    pub async fn get(&self, uri: &str) -> Result<TestResponse> {
        self.send(Request::get(uri).body(Body::empty())?).await
    }

    pub async fn delete(&self, uri: &str) -> Result<TestResponse> {
        self.send(Request::delete(uri).body(Body::empty())?).await
    }

    pub async fn json(&self, method: Method, uri: &str, body: Value) -> Result<TestResponse> {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))?;
        self.send(request).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> Result<TestResponse> {
        self.json(Method::POST, uri, body).await
    }

    pub async fn put(&self, uri: &str, body: Value) -> Result<TestResponse> {
        self.json(Method::PUT, uri, body).await
    }

    /// Request carrying `cookie` as the `Cookie` header.
    pub async fn with_cookie(&self, method: Method, uri: &str, cookie: &str) -> Result<TestResponse> {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::COOKIE, cookie)
            .body(Body::empty())?;
        self.send(request).await
    }

    /// Log in through `/jwt` and return the `token=...` cookie pair.
    pub async fn login(&self, email: &str) -> Result<String> {
        let response = self.post("/jwt", json!({ "email": email })).await?;
        anyhow::ensure!(response.status == StatusCode::OK, "login failed: {:?}", response.body);
        let cookie = response.set_cookie().context("no session cookie")?;
        Ok(cookie.split(';').next().unwrap_or_default().to_string())
    }

    pub async fn post_meal(&self, title: &str, meal_type: &str, price: f64) -> Result<String> {
        let response = self
            .post("/post-meal", json!({ "title": title, "mealType": meal_type, "price": price }))
            .await?;
        anyhow::ensure!(response.status == StatusCode::OK, "post-meal failed: {:?}", response.body);
        inserted_id(&response)
    }
}

pub fn inserted_id(response: &TestResponse) -> Result<String> {
    response.data()["insertedId"]
        .as_str()
        .map(str::to_string)
        .context("missing insertedId")
}

pub fn titles(list: &Value) -> Vec<String> {
    list.as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|m| m["title"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

pub fn object(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap_or_default()
}

/// The server binary running on a free port with the in-memory store.
pub struct TestServer {
    pub base_url: String,
    child: Child,
}

impl TestServer {
    pub async fn start() -> Result<Self> {
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let child = Command::new(env!("CARGO_BIN_EXE_fueled-api"))
            .args(["--memory", "--port", &port.to_string()])
            .env("APP_ENV", "development")
            .env("TOKEN_SEC", "integration-secret")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::inherit())
            .spawn()
            .context("failed to spawn server binary")?;

        let server = Self {
            base_url: format!("http://127.0.0.1:{}", port),
            child,
        };
        server.wait_ready(Duration::from_secs(10)).await?;
        Ok(server)
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = reqwest::Client::new();
        let deadline = Instant::now() + timeout;
        let url = format!("{}/health", self.base_url);
        while Instant::now() < deadline {
            if let Ok(resp) = client.get(&url).send().await {
                if resp.status().is_success() {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(150)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}
