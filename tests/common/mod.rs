//! In-process stand-in for the LMS, recording every request it receives.

#![allow(dead_code)]

use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use tokio::net::TcpListener;

use goose::config::GooseConfiguration;
use goose::prelude::GooseUser;
use gumdrop::Options;
use reqwest::Url;

use ora_loadtest::client::HttpSession;
use ora_loadtest::config::LoadConfig;
use ora_loadtest::page::PageDriver;

pub const CSRF_TOKEN: &str = "csrf-token-1";
pub const REFERER_HOST: &str = "https://courses.dev.edx.org/";

#[derive(Debug, Clone)]
pub struct Recorded {
  pub method: Method,
  pub path: String,
  pub query: Option<String>,
  pub headers: HeaderMap,
  pub body: String,
}

impl Recorded {
  pub fn json(&self) -> serde_json::Value {
    serde_json::from_str(&self.body).expect("request body is JSON")
  }

  pub fn header(&self, name: &str) -> Option<&str> {
    self.headers.get(name).and_then(|v| v.to_str().ok())
  }
}

#[derive(Default)]
struct Inner {
  requests: Mutex<Vec<Recorded>>,
  auth_status: AtomicU16,
  slow: Mutex<Vec<(String, Duration)>>,
  failing: Mutex<Option<String>>,
  submit_reply: Mutex<String>,
}

#[derive(Clone)]
pub struct MockLms {
  inner: Arc<Inner>,
}

impl MockLms {
  pub fn new() -> Self {
    let inner = Inner::default();
    inner.auth_status.store(200, Ordering::SeqCst);
    *inner.submit_reply.lock().unwrap() = r#"[true, "7a1c-uuid", 1]"#.into();
    Self { inner: Arc::new(inner) }
  }

  pub fn set_auth_status(&self, status: u16) {
    self.inner.auth_status.store(status, Ordering::SeqCst);
  }

  /// Delay every request whose path ends with `suffix`; adds to earlier calls.
  pub fn set_slow(&self, suffix: &str, delay: Duration) {
    self.inner.slow.lock().unwrap().push((suffix.to_string(), delay));
  }

  /// Answer 500 to every request whose path ends with `suffix`.
  pub fn set_failing(&self, suffix: &str) {
    *self.inner.failing.lock().unwrap() = Some(suffix.to_string());
  }

  pub fn set_submit_reply(&self, body: &str) {
    *self.inner.submit_reply.lock().unwrap() = body.to_string();
  }

  pub fn requests(&self) -> Vec<Recorded> {
    self.inner.requests.lock().unwrap().clone()
  }

  pub fn count(&self, method: Method, path_suffix: &str) -> usize {
    self
      .requests()
      .iter()
      .filter(|r| r.method == method && r.path.ends_with(path_suffix))
      .count()
  }

  pub fn last(&self, method: Method, path_suffix: &str) -> Option<Recorded> {
    self
      .requests()
      .into_iter()
      .rev()
      .find(|r| r.method == method && r.path.ends_with(path_suffix))
  }

  /// Serve on an ephemeral port; returns the host URL with a trailing slash.
  pub async fn start(&self) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = Router::new().fallback(handle).with_state(self.clone());
    tokio::spawn(async move {
      axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}/")
  }
}

async fn handle(State(lms): State<MockLms>, method: Method, uri: Uri, headers: HeaderMap, body: String) -> Response {
  let path = uri.path().to_string();
  lms.inner.requests.lock().unwrap().push(Recorded {
    method: method.clone(),
    path: path.clone(),
    query: uri.query().map(str::to_string),
    headers,
    body,
  });

  let delay = lms
    .inner
    .slow
    .lock()
    .unwrap()
    .iter()
    .find(|(suffix, _)| path.ends_with(suffix.as_str()))
    .map(|(_, delay)| *delay);
  if let Some(delay) = delay {
    tokio::time::sleep(delay).await;
  }

  if path == "/auto_auth" {
    let status = StatusCode::from_u16(lms.inner.auth_status.load(Ordering::SeqCst)).unwrap();
    if status != StatusCode::OK {
      return (status, "denied").into_response();
    }
    return Response::builder()
      .status(StatusCode::OK)
      .header(header::SET_COOKIE, format!("csrftoken={CSRF_TOKEN}; Path=/"))
      .header(header::SET_COOKIE, "sessionid=s-1; Path=/; HttpOnly")
      .body(Body::from("logged in"))
      .unwrap();
  }

  if method == Method::POST && path.ends_with("/handler/submit") {
    let reply = lms.inner.submit_reply.lock().unwrap().clone();
    return ([(header::CONTENT_TYPE, "application/json")], reply).into_response();
  }

  let failing = lms.inner.failing.lock().unwrap().clone();
  if failing.is_some_and(|suffix| path.ends_with(&suffix)) {
    return (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response();
  }

  (StatusCode::OK, "<div>ok</div>").into_response()
}

pub fn config(host: &str) -> LoadConfig {
  LoadConfig { host: host.to_string(), referer_host: REFERER_HOST.into(), ..LoadConfig::default() }
}

/// A goose user outside any attack: requests work, metrics go nowhere.
pub fn goose_user(host: &str) -> GooseUser {
  let args = ["--co-mitigation", "disabled"];
  let configuration = GooseConfiguration::parse_args_default(&args).unwrap();
  GooseUser::single(Url::parse(host).unwrap(), &configuration).unwrap()
}

/// A standalone goose user with its session attached and a logged-out driver.
pub fn driver(cfg: &LoadConfig) -> (GooseUser, PageDriver) {
  let mut user = goose_user(&cfg.host);
  let session = HttpSession::attach(&mut user, cfg).unwrap();
  let page = PageDriver::new(session, &cfg.problem, &cfg.referer_host).unwrap();
  (user, page)
}
