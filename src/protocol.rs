//! Request bodies posted to the OpenAssessment handlers (serde ready),
//! plus best-effort parsing of the submit handler's reply.

use std::collections::BTreeMap;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use serde_json::Value;

use crate::fixtures::ProblemFixture;
use crate::util::paragraphs;

/// Body for the `submit` handler.
#[derive(Debug, Clone, Serialize)]
pub struct SubmissionPayload {
  pub submission: String,
}

impl SubmissionPayload {
  /// 1..=10 paragraphs of filler text.
  pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
    let count = rng.gen_range(1..=10);
    Self { submission: paragraphs(rng, count) }
  }
}

/// Body for the `peer_assess` handler.
#[derive(Debug, Clone, Serialize)]
pub struct PeerAssessmentPayload {
  pub options_selected: BTreeMap<String, String>,
  pub overall_feedback: String,
  pub criterion_feedback: BTreeMap<String, String>,
  /// Ask for more peers than the required minimum. Omitted when false.
  #[serde(skip_serializing_if = "std::ops::Not::not")]
  pub continue_grading: bool,
}

impl PeerAssessmentPayload {
  pub fn random<R: Rng + ?Sized>(fixture: &ProblemFixture, continue_grading: bool, rng: &mut R) -> Self {
    let options_selected = select_random_options(fixture, rng);
    let count = rng.gen_range(1..=3);
    Self {
      options_selected,
      overall_feedback: paragraphs(rng, count),
      criterion_feedback: BTreeMap::new(),
      continue_grading,
    }
  }
}

/// Body for the `self_assess` handler.
#[derive(Debug, Clone, Serialize)]
pub struct SelfAssessmentPayload {
  pub options_selected: BTreeMap<String, String>,
}

impl SelfAssessmentPayload {
  pub fn random<R: Rng + ?Sized>(fixture: &ProblemFixture, rng: &mut R) -> Self {
    Self { options_selected: select_random_options(fixture, rng) }
  }
}

/// One random option per rubric criterion.
pub fn select_random_options<R: Rng + ?Sized>(fixture: &ProblemFixture, rng: &mut R) -> BTreeMap<String, String> {
  fixture
    .rubric
    .iter()
    .filter_map(|c| c.options.choose(rng).map(|o| (c.name.to_string(), o.to_string())))
    .collect()
}

/// What the submit handler said about our submission.
///
/// The handler answers 200 even when it refuses the submission
/// (typically because this identity already submitted once).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
  Accepted,
  Rejected(String),
  Unrecognized,
}

/// Classify a submit reply body.
///
/// Accepts both reply shapes the handler has used: a JSON array
/// `[success, code_or_uuid, ...]` and an object `{"success": bool, "msg": ...}`.
pub fn classify_submit_reply(body: &str) -> SubmitOutcome {
  let Ok(value) = serde_json::from_str::<Value>(body) else {
    return SubmitOutcome::Unrecognized;
  };
  match &value {
    Value::Array(items) => match items.first() {
      Some(Value::Bool(true)) => SubmitOutcome::Accepted,
      Some(Value::Bool(false)) => SubmitOutcome::Rejected(reason_of(items.get(1), items.get(2))),
      _ => SubmitOutcome::Unrecognized,
    },
    Value::Object(map) => match map.get("success") {
      Some(Value::Bool(true)) => SubmitOutcome::Accepted,
      Some(Value::Bool(false)) => SubmitOutcome::Rejected(reason_of(map.get("msg"), None)),
      _ => SubmitOutcome::Unrecognized,
    },
    _ => SubmitOutcome::Unrecognized,
  }
}

fn reason_of(code: Option<&Value>, detail: Option<&Value>) -> String {
  let text = |v: Option<&Value>| match v {
    Some(Value::String(s)) => Some(s.clone()),
    Some(Value::Null) | None => None,
    Some(other) => Some(other.to_string()),
  };
  match (text(code), text(detail)) {
    (Some(c), Some(d)) => format!("{c}: {d}"),
    (Some(c), None) => c,
    (None, Some(d)) => d,
    (None, None) => "unspecified".into(),
  }
}
