//! Interactions with the OpenAssessment block's pages for one virtual user.
//!
//! `PageDriver` holds the user's HTTP session and the selected problem fixture.
//! It tracks whether the session is logged in and exposes one method per user
//! action; every method takes the goose user the requests are issued through.
//! Transport failures are recorded by goose and propagate as
//! `LoadError::Transport`; nothing here retries.

use std::time::Duration;

use goose::prelude::*;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE, REFERER};
use reqwest::{StatusCode, Url};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::client::{HttpSession, Reply};
use crate::error::LoadError;
use crate::fanout::{join_with_deadline, FanOutcome};
use crate::fixtures::{self, ProblemFixture};
use crate::protocol::{
  classify_submit_reply, PeerAssessmentPayload, SelfAssessmentPayload, SubmissionPayload, SubmitOutcome,
};
use crate::util::{trunc_for_log, with_trailing_slash};

/// Ceiling for the concurrent render-step fetches in [`PageDriver::load_steps`].
pub const STEP_LOAD_CEILING: Duration = Duration::from_millis(500);

const AUTO_AUTH_PATH: &str = "auto_auth";
const COURSEWARE_REQUEST: &str = "courseware";
const CSRF_COOKIE: &str = "csrftoken";
const CSRF_HEADER: &str = "x-csrftoken";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
  Unauthenticated,
  Authenticated,
}

/// Result of one render-step fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepOutcome {
  pub handler: &'static str,
  pub outcome: FanOutcome<StatusCode>,
}

#[derive(Clone)]
pub struct PageDriver {
  session: HttpSession,
  fixture: &'static ProblemFixture,
  referer: String,
  state: SessionState,
}

impl PageDriver {
  /// Fails with `UnknownProblem` if `problem` is not in the fixture registry.
  pub fn new(session: HttpSession, problem: &str, referer_host: &str) -> Result<Self, LoadError> {
    let fixture = fixtures::lookup(problem)?;
    let referer = referer_for(referer_host, fixture.base_url)?;
    Ok(Self { session, fixture, referer, state: SessionState::Unauthenticated })
  }

  pub fn fixture(&self) -> &'static ProblemFixture {
    self.fixture
  }

  pub fn referer(&self) -> &str {
    &self.referer
  }

  pub fn state(&self) -> SessionState {
    self.state
  }

  pub fn is_authenticated(&self) -> bool {
    self.state == SessionState::Authenticated
  }

  /// Log in as a fresh auto-generated user enrolled in the fixture's course.
  ///
  /// Only an exact 200 counts as logged in. A transport error leaves the
  /// session unauthenticated and is returned.
  #[instrument(level = "info", skip(self, user), fields(course_id = %self.fixture.course_id))]
  pub async fn authenticate(&mut self, user: &mut GooseUser) -> Result<SessionState, LoadError> {
    self.state = SessionState::Unauthenticated;
    let reply = self
      .session
      .get(user, AUTO_AUTH_PATH, AUTO_AUTH_PATH, &[("course_id", self.fixture.course_id)])
      .await?;
    if reply.status == StatusCode::OK {
      self.state = SessionState::Authenticated;
      debug!(target: "page", "Logged in");
    } else {
      info!(target: "page", status = reply.status.as_u16(), "auto_auth refused; staying logged out");
    }
    Ok(self.state)
  }

  /// Load the courseware page, then every render step in parallel.
  ///
  /// The page GET is not checked. Render steps share a [`STEP_LOAD_CEILING`]
  /// deadline; the ones still in flight are abandoned and reported as timed out.
  #[instrument(level = "info", skip(self, user), fields(problem = %self.fixture.name))]
  pub async fn load_steps(&mut self, user: &mut GooseUser) -> Result<Vec<StepOutcome>, LoadError> {
    self.session.get(user, COURSEWARE_REQUEST, self.fixture.base_url, &[]).await?;

    let handlers = self.fixture.render_step_handlers;
    let fetches = handlers
      .iter()
      .map(|handler| self.session.detached_get(user, &self.handler_url(handler)))
      .collect::<Result<Vec<_>, _>>()?;

    let outcomes = join_with_deadline(fetches, STEP_LOAD_CEILING).await;
    let steps: Vec<StepOutcome> = handlers
      .iter()
      .copied()
      .zip(outcomes)
      .map(|(handler, outcome)| StepOutcome { handler, outcome })
      .collect();

    for step in &steps {
      match &step.outcome {
        FanOutcome::Completed(status) if !status.is_success() => {
          warn!(target: "page", handler = step.handler, status = status.as_u16(), "Render step failed")
        }
        FanOutcome::Errored(reason) => warn!(target: "page", handler = step.handler, %reason, "Render step errored"),
        FanOutcome::TimedOut => debug!(target: "page", handler = step.handler, "Abandoned slow render step"),
        FanOutcome::Completed(_) => {}
      }
    }
    Ok(steps)
  }

  /// Submit a filler-text response.
  ///
  /// The handler answers 200 even when it refuses (e.g. this identity already
  /// submitted); such refusals are logged, never treated as failures.
  #[instrument(level = "info", skip(self, user), fields(problem = %self.fixture.name))]
  pub async fn submit_response(&mut self, user: &mut GooseUser) -> Result<SubmitOutcome, LoadError> {
    let payload = {
      let mut rng = rand::thread_rng();
      SubmissionPayload::random(&mut rng)
    };
    let reply = self.post_json(user, "submit", &payload).await?;

    let outcome = classify_submit_reply(&reply.body);
    match &outcome {
      SubmitOutcome::Rejected(reason) => {
        warn!(target: "page", user = user.weighted_users_index, %reason, "Submission refused by handler");
      }
      SubmitOutcome::Unrecognized if reply.status.is_success() => {
        debug!(target: "page", body = %trunc_for_log(&reply.body, 120), "Unrecognized submit reply");
      }
      _ => {}
    }
    Ok(outcome)
  }

  /// Assess a peer. `continue_grading` asks for more peers than required.
  #[instrument(level = "info", skip(self, user), fields(problem = %self.fixture.name))]
  pub async fn peer_assess(&mut self, user: &mut GooseUser, continue_grading: bool) -> Result<StatusCode, LoadError> {
    let payload = {
      let mut rng = rand::thread_rng();
      PeerAssessmentPayload::random(self.fixture, continue_grading, &mut rng)
    };
    let reply = self.post_json(user, "peer_assess", &payload).await?;
    Ok(reply.status)
  }

  #[instrument(level = "info", skip(self, user), fields(problem = %self.fixture.name))]
  pub async fn self_assess(&mut self, user: &mut GooseUser) -> Result<StatusCode, LoadError> {
    let payload = {
      let mut rng = rand::thread_rng();
      SelfAssessmentPayload::random(self.fixture, &mut rng)
    };
    let reply = self.post_json(user, "self_assess", &payload).await?;
    Ok(reply.status)
  }

  /// Full path of an XBlock handler: base handler URL + name, unvalidated.
  pub fn handler_url(&self, handler: &str) -> String {
    format!("{}{}", self.fixture.base_handler_url, handler)
  }

  /// Headers for a POST, including the CSRF token from the user's cookie jar.
  pub fn post_headers(&self, user: &GooseUser) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

    let token = self.session.cookie(&user.base_url, CSRF_COOKIE).unwrap_or_default();
    headers.insert(CSRF_HEADER, HeaderValue::from_str(&token).unwrap_or_else(|_| HeaderValue::from_static("")));
    if let Ok(referer) = HeaderValue::from_str(&self.referer) {
      headers.insert(REFERER, referer);
    }
    headers
  }

  async fn post_json<P: Serialize>(&self, user: &mut GooseUser, handler: &str, payload: &P) -> Result<Reply, LoadError> {
    let headers = self.post_headers(user);
    self.session.post(user, handler, &self.handler_url(handler), headers, payload).await
  }
}

/// `referer_host` joined with the fixture's page path, with or without a
/// trailing slash on the host.
fn referer_for(referer_host: &str, base_url: &str) -> Result<String, LoadError> {
  let referer = Url::parse(&with_trailing_slash(referer_host)).and_then(|root| root.join(base_url));
  referer
    .map(String::from)
    .map_err(|e| LoadError::InvalidUrl { url: referer_host.to_string(), reason: e.to_string() })
}
