//! Small utility helpers used across modules.

use rand::seq::SliceRandom;
use rand::Rng;

/// Separator placed between generated paragraphs.
pub const PARAGRAPH_SEP: &str = "\n\n";

const LOREM_WORDS: &[&str] = &[
  "lorem", "ipsum", "dolor", "sit", "amet", "consectetur", "adipiscing", "elit",
  "sed", "do", "eiusmod", "tempor", "incididunt", "ut", "labore", "et", "dolore",
  "magna", "aliqua", "enim", "ad", "minim", "veniam", "quis", "nostrud",
  "exercitation", "ullamco", "laboris", "nisi", "aliquip", "ex", "ea", "commodo",
  "consequat", "duis", "aute", "irure", "in", "reprehenderit", "voluptate",
  "velit", "esse", "cillum", "fugiat", "nulla", "pariatur", "excepteur", "sint",
  "occaecat", "cupidatat", "non", "proident", "sunt", "culpa", "qui", "officia",
  "deserunt", "mollit", "anim", "id", "est", "laborum",
];

/// One filler sentence: capitalized, 6..=16 words, ends with a period.
pub fn sentence<R: Rng + ?Sized>(rng: &mut R) -> String {
  let len = rng.gen_range(6..=16);
  let mut words: Vec<&str> = Vec::with_capacity(len);
  for _ in 0..len {
    words.push(LOREM_WORDS.choose(rng).copied().unwrap_or("lorem"));
  }
  let mut out = words.join(" ");
  if let Some(first) = out.get(0..1) {
    let upper = first.to_ascii_uppercase();
    out.replace_range(0..1, &upper);
  }
  out.push('.');
  out
}

/// One filler paragraph of 3..=7 sentences.
pub fn paragraph<R: Rng + ?Sized>(rng: &mut R) -> String {
  let n = rng.gen_range(3..=7);
  (0..n).map(|_| sentence(rng)).collect::<Vec<_>>().join(" ")
}

/// `count` filler paragraphs joined by [`PARAGRAPH_SEP`].
pub fn paragraphs<R: Rng + ?Sized>(rng: &mut R, count: usize) -> String {
  (0..count).map(|_| paragraph(rng)).collect::<Vec<_>>().join(PARAGRAPH_SEP)
}

/// Log-safe truncation for large strings.
/// Avoids spamming logs with huge response payloads.
pub fn trunc_for_log(s: &str, max: usize) -> String {
  if s.len() <= max {
    return s.to_string();
  }
  let mut cut = max;
  while !s.is_char_boundary(cut) {
    cut -= 1;
  }
  format!("{}… ({} bytes total)", &s[..cut], s.len())
}

/// URL roots are joined onto, so they need the slash.
pub fn with_trailing_slash(url: &str) -> String {
  if url.ends_with('/') {
    url.to_string()
  } else {
    format!("{url}/")
  }
}
