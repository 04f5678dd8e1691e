//! Per-virtual-user HTTP session on top of a goose user.
//!
//! Each virtual user gets its own reqwest client whose cookie jar we keep a
//! handle on, so the LMS session and csrftoken survive across requests and the
//! token can be read back. Requests sent through [`HttpSession::get`] and
//! [`HttpSession::post`] go through `GooseUser::request`, which records them in
//! goose's metrics.
//!
//! NOTE: credentials are attached per request and never logged.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use goose::prelude::*;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::HeaderMap;
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::Serialize;
use tracing::{debug, instrument};

use crate::config::{BasicAuth, LoadConfig};
use crate::error::LoadError;

pub const USER_AGENT: &str = concat!("ora-loadtest/", env!("CARGO_PKG_VERSION"));

/// Status and body of a fully read response.
#[derive(Debug, Clone)]
pub struct Reply {
  pub status: StatusCode,
  pub body: String,
}

#[derive(Clone)]
pub struct HttpSession {
  jar: Arc<Jar>,
  auth: Option<BasicAuth>,
}

impl HttpSession {
  /// Swap the goose user's client for one built from the load-test config.
  ///
  /// The new client starts with an empty jar; anything the previous client
  /// stored is gone.
  pub fn attach(user: &mut GooseUser, cfg: &LoadConfig) -> Result<Self, LoadError> {
    let jar = Arc::new(Jar::default());
    user.client = Client::builder()
      .cookie_provider(jar.clone())
      .timeout(cfg.request_timeout())
      .danger_accept_invalid_certs(!cfg.verify_tls)
      .user_agent(USER_AGENT)
      .build()?;

    Ok(Self { jar, auth: cfg.basic_auth.clone() })
  }

  /// Current value of a cookie visible at `base`.
  pub fn cookie(&self, base: &Url, name: &str) -> Option<String> {
    let header = self.jar.cookies(base)?;
    let raw = header.to_str().ok()?;
    raw
      .split(';')
      .filter_map(|pair| pair.trim().split_once('='))
      .find(|(k, _)| *k == name)
      .map(|(_, v)| v.to_string())
  }

  /// GET `path` relative to the goose host, recorded under `name`.
  pub async fn get(
    &self,
    user: &mut GooseUser,
    name: &str,
    path: &str,
    query: &[(&str, &str)],
  ) -> Result<Reply, LoadError> {
    let builder = user.get_request_builder(&GooseMethod::Get, path)?.query(query);
    self.send(user, GooseMethod::Get, name, path, builder).await
  }

  /// POST `payload` as JSON to `path`, recorded under `name`.
  pub async fn post<P: Serialize + ?Sized>(
    &self,
    user: &mut GooseUser,
    name: &str,
    path: &str,
    headers: HeaderMap,
    payload: &P,
  ) -> Result<Reply, LoadError> {
    let builder = user.get_request_builder(&GooseMethod::Post, path)?.headers(headers).json(payload);
    self.send(user, GooseMethod::Post, name, path, builder).await
  }

  /// A GET on the user's client that does not borrow the user.
  ///
  /// The returned future owns everything it needs, so it can be spawned and
  /// left running. goose only records requests made through the user, so
  /// these are reported in the logs instead.
  pub fn detached_get(
    &self,
    user: &GooseUser,
    path: &str,
  ) -> Result<impl Future<Output = Result<StatusCode, LoadError>> + Send + 'static, LoadError> {
    let url = user
      .base_url
      .join(path)
      .map_err(|e| LoadError::InvalidUrl { url: path.to_string(), reason: e.to_string() })?;
    let request = self.authorize(user.client.get(url.clone()));

    Ok(async move {
      let started = Instant::now();
      let result = request.send().await;
      let elapsed = started.elapsed();
      match result {
        Ok(resp) => {
          let status = resp.status();
          debug!(target: "page", path = url.path(), status = status.as_u16(), ?elapsed, "Detached request finished");
          Ok(status)
        }
        Err(e) => {
          debug!(target: "page", path = url.path(), error = %e, ?elapsed, "Detached request failed");
          Err(e.into())
        }
      }
    })
  }

  fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
    match &self.auth {
      Some(a) => builder.basic_auth(&a.user, Some(&a.password)),
      None => builder,
    }
  }

  /// Send through goose and read the body.
  ///
  /// Non-2xx replies are returned (goose records them as failures); only
  /// transport errors come back as `Err`.
  #[instrument(level = "debug", skip(self, user, builder))]
  async fn send(
    &self,
    user: &mut GooseUser,
    method: GooseMethod,
    name: &str,
    path: &str,
    builder: RequestBuilder,
  ) -> Result<Reply, LoadError> {
    let request = GooseRequest::builder()
      .method(method)
      .path(path)
      .name(name)
      .set_request_builder(self.authorize(builder))
      .build();

    let goose = user.request(request).await?;
    let response = goose.response?;
    let status = response.status();
    let body = response.text().await?;
    debug!(target: "page", status = status.as_u16(), body_len = body.len(), "Response");
    Ok(Reply { status, body })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use goose::config::GooseConfiguration;
  use gumdrop::Options;

  fn user(host: &str) -> GooseUser {
    let args: [&str; 0] = [];
    let configuration = GooseConfiguration::parse_args_default(&args).unwrap();
    GooseUser::single(Url::parse(host).unwrap(), &configuration).unwrap()
  }

  #[test]
  fn reads_cookies_from_jar() {
    let mut user = user("http://lms.local/");
    let s = HttpSession::attach(&mut user, &LoadConfig::default()).unwrap();
    assert_eq!(s.cookie(&user.base_url, "csrftoken"), None);

    let url = Url::parse("http://lms.local/auto_auth").unwrap();
    s.jar.add_cookie_str("sessionid=abc; Path=/", &url);
    s.jar.add_cookie_str("csrftoken=tok-1; Path=/", &url);
    assert_eq!(s.cookie(&user.base_url, "csrftoken").as_deref(), Some("tok-1"));
    assert_eq!(s.cookie(&user.base_url, "sessionid").as_deref(), Some("abc"));
  }

  #[test]
  fn each_attach_gets_a_fresh_jar() {
    let mut user = user("http://lms.local/");
    let first = HttpSession::attach(&mut user, &LoadConfig::default()).unwrap();
    first.jar.add_cookie_str("csrftoken=old; Path=/", &user.base_url);

    let second = HttpSession::attach(&mut user, &LoadConfig::default()).unwrap();
    assert_eq!(second.cookie(&user.base_url, "csrftoken"), None);
  }

  #[test]
  fn detached_get_resolves_fixture_paths_onto_host() {
    let mut user = user("http://lms.local:8000/");
    let s = HttpSession::attach(&mut user, &LoadConfig::default()).unwrap();
    assert!(s
      .detached_get(&user, "courses/ora2/2/2/xblock/i4x:;_;_ora2;_2;_openassessment;_c4/handler/render_grade")
      .is_ok());
  }
}
