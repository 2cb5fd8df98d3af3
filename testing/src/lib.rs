//! In-process fake of the admin backend for end-to-end tests.
//!
//! `FakeBackend` binds an actix-web server to an ephemeral local port, checks
//! the bearer token the way the real auth middleware does, records every
//! request and answers with scripted responses. The server lives on the test's
//! actix runtime and stops when the `FakeBackend` is dropped.

pub mod fixtures;

use actix_web::http::Method;
use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer};
use anyhow::{Context, Result};
use client::{ClientConfig, HttpApi, Session};
use serde_json::Value;
use shared::models::auth::Role;
use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// Token the fake backend accepts.
pub const TEST_TOKEN: &str = "test-session-token";

/// One request as the fake backend saw it.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub query: String,
    pub authorization: Option<String>,
    pub body: Option<Value>,
}

impl RecordedRequest {
    /// Decoded query parameters in request order.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        self.query
            .split('&')
            .filter(|pair| !pair.is_empty())
            .map(|pair| {
                let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
                (decode(key), decode(value))
            })
            .collect()
    }

    pub fn param(&self, key: &str) -> Option<String> {
        self.query_pairs()
            .into_iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }
}

fn decode(raw: &str) -> String {
    let raw = raw.replace('+', " ");
    urlencoding::decode(&raw)
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| raw.clone())
}

/// Scripted reply for one route.
#[derive(Debug, Clone)]
pub struct FakeResponse {
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
    pub delay: Duration,
}

impl FakeResponse {
    pub fn json(body: Value) -> Self {
        Self::json_status(200, body)
    }

    pub fn json_status(status: u16, body: Value) -> Self {
        Self {
            status,
            content_type: "application/json",
            body: body.to_string(),
            delay: Duration::ZERO,
        }
    }

    /// Non-JSON body, e.g. a proxy's HTML error page.
    pub fn text(status: u16, body: &str) -> Self {
        Self {
            status,
            content_type: "text/html; charset=utf-8",
            body: body.to_string(),
            delay: Duration::ZERO,
        }
    }

    pub fn csv(body: &str) -> Self {
        Self {
            status: 200,
            content_type: "text/csv",
            body: body.to_string(),
            delay: Duration::ZERO,
        }
    }

    pub fn no_content() -> Self {
        Self {
            status: 204,
            content_type: "text/plain",
            body: String::new(),
            delay: Duration::ZERO,
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[derive(Default)]
struct Route {
    queued: VecDeque<FakeResponse>,
    fallback: Option<FakeResponse>,
}

#[derive(Default)]
struct FakeState {
    routes: HashMap<(String, String), Route>,
    requests: Vec<RecordedRequest>,
}

type SharedState = Arc<Mutex<FakeState>>;

fn lock(state: &SharedState) -> std::sync::MutexGuard<'_, FakeState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

async fn handle(req: HttpRequest, body: web::Bytes, state: web::Data<SharedState>) -> HttpResponse {
    let authorization = req
        .headers()
        .get("Authorization")
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    let recorded = RecordedRequest {
        method: req.method().to_string(),
        path: req.path().to_string(),
        query: req.query_string().to_string(),
        authorization: authorization.clone(),
        body: serde_json::from_slice(&body).ok(),
    };
    log::debug!("fake backend: {} {}?{}", recorded.method, recorded.path, recorded.query);

    let authorized = authorization.as_deref() == Some(format!("Bearer {}", TEST_TOKEN).as_str());
    let reply = {
        let mut state = lock(state.get_ref());
        state.requests.push(recorded.clone());
        if !authorized {
            None
        } else {
            state
                .routes
                .get_mut(&(recorded.method.clone(), recorded.path.clone()))
                .and_then(|route| route.queued.pop_front().or_else(|| route.fallback.clone()))
        }
    };

    if !authorized {
        return HttpResponse::Unauthorized().json(serde_json::json!({"message": "Not authenticated"}));
    }

    match reply {
        Some(reply) => {
            if !reply.delay.is_zero() {
                actix_rt::time::sleep(reply.delay).await;
            }
            let status = actix_web::http::StatusCode::from_u16(reply.status)
                .unwrap_or(actix_web::http::StatusCode::INTERNAL_SERVER_ERROR);
            HttpResponse::build(status)
                .content_type(reply.content_type)
                .body(reply.body)
        }
        None => HttpResponse::NotFound().json(serde_json::json!({
            "message": format!("No route for {} {}", recorded.method, recorded.path)
        })),
    }
}

/// Running fake backend.
pub struct FakeBackend {
    addr: SocketAddr,
    state: SharedState,
    server: actix_web::dev::ServerHandle,
}

impl FakeBackend {
    /// Starts the server on `127.0.0.1` with an OS-assigned port. Must run
    /// inside an actix runtime (`#[actix_rt::test]`).
    pub async fn start() -> Result<Self> {
        let state: SharedState = Arc::default();
        let data = web::Data::new(state.clone());

        let server = HttpServer::new(move || {
            App::new()
                .app_data(data.clone())
                .default_service(web::to(handle))
        })
        .workers(1)
        .disable_signals()
        .bind(("127.0.0.1", 0))
        .context("Failed to bind fake backend")?;

        let addr = server
            .addrs()
            .first()
            .copied()
            .context("Fake backend has no bound address")?;
        let running = server.run();
        let server_handle = running.handle();
        actix_rt::spawn(running);

        log::info!("Fake backend listening on http://{}", addr);
        Ok(Self {
            addr,
            state,
            server: server_handle,
        })
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Queues one reply for `method path`; queued replies are used in order.
    pub fn push(&self, method: Method, path: &str, response: FakeResponse) -> &Self {
        lock(&self.state)
            .routes
            .entry((method.to_string(), path.to_string()))
            .or_default()
            .queued
            .push_back(response);
        self
    }

    /// Reply used whenever nothing is queued for `method path`.
    pub fn always(&self, method: Method, path: &str, response: FakeResponse) -> &Self {
        lock(&self.state)
            .routes
            .entry((method.to_string(), path.to_string()))
            .or_default()
            .fallback = Some(response);
        self
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        lock(&self.state).requests.clone()
    }

    pub fn requests_to(&self, method: Method, path: &str) -> Vec<RecordedRequest> {
        let method = method.to_string();
        self.requests()
            .into_iter()
            .filter(|r| r.method == method && r.path == path)
            .collect()
    }

    /// Client configuration pointing at this server with a short debounce.
    pub fn config(&self) -> ClientConfig {
        ClientConfig {
            api_url: self.url(),
            debounce: Duration::from_millis(50),
            request_timeout: Duration::from_secs(5),
            token: Some(TEST_TOKEN.to_string()),
            ..ClientConfig::default()
        }
    }

    pub fn http_api(&self) -> Result<HttpApi> {
        Ok(HttpApi::new(&self.config())?)
    }

    /// Stops accepting connections and waits for the workers to exit.
    pub async fn shutdown(self) {
        self.server.stop(true).await;
    }
}

impl Drop for FakeBackend {
    fn drop(&mut self) {
        // Sends the stop command; the returned future only reports completion.
        drop(self.server.stop(false));
    }
}

/// Session holding the token the fake backend accepts.
pub fn signed_in(role: Role) -> Session {
    Session::signed_in(TEST_TOKEN, role)
}

/// Installs `env_logger` once for tests that do not use `test_log`.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("Ava%20Stone", "Ava Stone")]
    #[case("Ava+Stone", "Ava Stone")]
    #[case("2024-03-01", "2024-03-01")]
    #[case("%E2%9C%93", "\u{2713}")]
    fn test_decode(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(decode(raw), expected);
    }

    #[test]
    fn test_query_pairs_decode() {
        let request = RecordedRequest {
            method: "GET".into(),
            path: "/api/admin/tickets".into(),
            query: "customer=Ava%20Stone&status=pending&page=1".into(),
            authorization: None,
            body: None,
        };
        assert_eq!(
            request.query_pairs(),
            vec![
                ("customer".to_string(), "Ava Stone".to_string()),
                ("status".to_string(), "pending".to_string()),
                ("page".to_string(), "1".to_string()),
            ]
        );
        assert_eq!(request.param("status").as_deref(), Some("pending"));
        assert_eq!(request.param("limit"), None);
    }
}
