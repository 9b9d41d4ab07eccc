//! Line classification.

use regex::Regex;

use crate::config::{compile_title_pattern, validate_title_max, SegmenterConfig};
use crate::error::Result;

/// Class of a single canonical line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineClass {
    /// Empty after trimming; carries no information.
    Blank,
    /// A chapter or section heading.
    Title,
    /// Anything else: body text.
    Content,
}

/// Decides whether a line is a title.
///
/// A line is a title when it is at most `max_chars` code points long
/// **and** matches the title pattern. The length gate runs first.
#[derive(Debug, Clone)]
pub struct TitleClassifier {
    max_chars: usize,
    pattern: Regex,
}

impl TitleClassifier {
    /// Build a classifier from an already compiled pattern.
    #[must_use]
    pub fn new(max_chars: usize, pattern: Regex) -> Self {
        Self { max_chars, pattern }
    }

    /// Build a classifier from segmenter settings.
    pub fn from_config(config: &SegmenterConfig) -> Result<Self> {
        validate_title_max(config.title_max)?;
        let pattern = compile_title_pattern(&config.title_pattern)?;
        Ok(Self::new(config.title_max, pattern))
    }

    #[must_use]
    pub fn max_chars(&self) -> usize {
        self.max_chars
    }

    /// Classify a line. Leading and trailing whitespace is ignored.
    #[must_use]
    pub fn classify(&self, line: &str) -> LineClass {
        let line = line.trim();
        if line.is_empty() {
            return LineClass::Blank;
        }
        if self.is_title(line) {
            LineClass::Title
        } else {
            LineClass::Content
        }
    }

    fn is_title(&self, line: &str) -> bool {
        // At most `max_chars` code points, without walking a whole paragraph.
        let within_limit = line.chars().nth(self.max_chars).is_none();
        within_limit && self.pattern.is_match(line)
    }
}

impl Default for TitleClassifier {
    #[allow(clippy::expect_used)] // The default pattern is a tested constant
    fn default() -> Self {
        Self::from_config(&SegmenterConfig::default()).expect("default title pattern compiles")
    }
}
