//! Static problem fixtures installed in the course under test.
//!
//! Each entry mirrors the course fixture loaded into the LMS: course id, the
//! courseware page hosting the OpenAssessment block, the block's handler base
//! and its rubric. The table is fixed at build time.

use crate::error::LoadError;

/// One rubric criterion and its selectable option labels, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Criterion {
  pub name: &'static str,
  pub options: &'static [&'static str],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProblemFixture {
  pub name: &'static str,
  pub course_id: &'static str,
  /// Courseware page (path fragment relative to the host).
  pub base_url: &'static str,
  /// Handler prefix; handler names are appended verbatim.
  pub base_handler_url: &'static str,
  pub rubric: &'static [Criterion],
  pub render_step_handlers: &'static [&'static str],
}

const FOUR_POINT: &[&str] = &["Needs work", "Acceptable", "Good", "Excellent"];

static PROBLEMS: &[ProblemFixture] = &[ProblemFixture {
  name: "example_based",
  course_id: "ora2/2/2",
  base_url: "courses/ora2/2/2/courseware/f9b93ea79bde48f2b1ba3af4c266eee5/3ea9cec511bb476dad832d8ee0d8d16a/",
  base_handler_url: "courses/ora2/2/2/xblock/i4x:;_;_ora2;_2;_openassessment;_c4a52fe0b6ec4d20a7ac973e143b70eb/handler/",
  rubric: &[
    Criterion { name: "Intelligibility", options: FOUR_POINT },
    Criterion { name: "Clarity", options: FOUR_POINT },
    Criterion { name: "Understanding", options: FOUR_POINT },
    Criterion { name: "Support", options: FOUR_POINT },
    Criterion { name: "Depth", options: FOUR_POINT },
    Criterion { name: "Interpretation", options: FOUR_POINT },
    Criterion { name: "Comparison", options: FOUR_POINT },
  ],
  render_step_handlers: &["render_submission", "render_grade"],
}];

/// Find a fixture by problem name.
pub fn lookup(name: &str) -> Result<&'static ProblemFixture, LoadError> {
  PROBLEMS
    .iter()
    .find(|p| p.name == name)
    .ok_or_else(|| LoadError::UnknownProblem(name.to_string()))
}

/// Registered problem names, in table order.
pub fn names() -> impl Iterator<Item = &'static str> {
  PROBLEMS.iter().map(|p| p.name)
}

pub fn all() -> &'static [ProblemFixture] {
  PROBLEMS
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::HashSet;

  #[test]
  fn example_based_is_registered() {
    let p = lookup("example_based").unwrap();
    assert_eq!(p.course_id, "ora2/2/2");
    assert_eq!(p.rubric.len(), 7);
    assert_eq!(p.render_step_handlers, &["render_submission", "render_grade"]);
  }

  #[test]
  fn unknown_problem_fails() {
    match lookup("peer_only") {
      Err(LoadError::UnknownProblem(name)) => assert_eq!(name, "peer_only"),
      other => panic!("expected UnknownProblem, got {other:?}"),
    }
  }

  #[test]
  fn fixtures_are_well_formed() {
    for p in all() {
      assert!(p.base_handler_url.ends_with('/'), "{}", p.name);
      let names: HashSet<_> = p.rubric.iter().map(|c| c.name).collect();
      assert_eq!(names.len(), p.rubric.len(), "duplicate criterion in {}", p.name);
      assert!(p.rubric.iter().all(|c| !c.options.is_empty()));
    }
    assert!(names().any(|n| n == "example_based"));
  }
}
