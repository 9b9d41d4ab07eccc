//! Configuration constants and validation functions.

use regex::Regex;
use std::sync::LazyLock;

use crate::error::{Result, TxtbookError};

/// Number of bytes inspected when sniffing the input encoding.
pub const PEEK_SIZE: usize = 1024;

/// Default maximum length of a title line, in Unicode code points.
pub const DEFAULT_TITLE_MAX: usize = 35;

/// Default title pattern.
///
/// Matches, within the first 8 characters of a line, numbered chapter or
/// section markers in Chinese or English ("第十二章", "Chapter 3",
/// "Section 2", "Page 7"), a short label led by 1-4 ASCII digits, or one of the
/// prologue markers 引子, 楔子, 章节目录.
pub const DEFAULT_TITLE_PATTERN: &str = r"^.{0,8}(第.{1,20}(章|节)|(S|s)ection.{1,20}|(C|c)hapter.{1,20}|(P|p)age.{1,20})|^[0-9]{1,4}.{0,20}$|^引子|^楔子|^章节目录";

/// Title given to a section that never saw a title line ("body text").
pub const DEFAULT_SECTION_TITLE: &str = "章节正文";

/// Default language tag for the book metadata.
pub const DEFAULT_LANG: &str = "zh";

/// Default author written into the book metadata.
pub const DEFAULT_AUTHOR: &str = "Orchid";

/// Stylesheet shipped with every book.
pub const PAGE_STYLES_CSS: &str = "
.title {text-align:center}
.content {text-indent: 2em}
";

/// Location of the stylesheet inside the package, relative to the OPF.
pub const STYLESHEET_HREF: &str = "style/page_styles.css";

/// Environment variable overriding the maximum title length.
pub const ENV_TITLE_MAX: &str = "TXTBOOK_TITLE_MAX";

/// Environment variable overriding the title pattern.
pub const ENV_TITLE_PATTERN: &str = "TXTBOOK_TITLE_PATTERN";

/// Language tag pattern: a 2-3 letter primary tag with optional subtags.
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static LANG_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z]{2,3}(-[A-Za-z0-9]{1,8})*$").expect("valid regex")
});

/// What to do with a title line that arrives before any content.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LeadingTitlePolicy {
    /// The title names the first section and becomes its heading.
    #[default]
    Seed,
    /// The title is discarded; the first section ends up with the placeholder title.
    Drop,
}

/// Settings for the segmentation engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmenterConfig {
    /// Longest line, in code points, that may still be a title.
    pub title_max: usize,
    /// Regular expression a title line must match.
    pub title_pattern: String,
    /// Handling of a title line seen while nothing has been collected yet.
    pub leading_title: LeadingTitlePolicy,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            title_max: DEFAULT_TITLE_MAX,
            title_pattern: DEFAULT_TITLE_PATTERN.to_string(),
            leading_title: LeadingTitlePolicy::default(),
        }
    }
}

impl SegmenterConfig {
    /// Build a config from the process environment, falling back to defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup.
    ///
    /// Malformed values are reported instead of silently replaced by defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_TITLE_MAX) {
            config.title_max = parse_title_max(&raw).map_err(|_| {
                TxtbookError::Config(format!("{ENV_TITLE_MAX} must be a positive integer, got '{raw}'"))
            })?;
        }

        if let Some(pattern) = lookup(ENV_TITLE_PATTERN) {
            validate_title_pattern(&pattern)?;
            config.title_pattern = pattern;
        }

        Ok(config)
    }

    #[must_use]
    pub fn with_title_max(mut self, title_max: usize) -> Self {
        self.title_max = title_max;
        self
    }

    #[must_use]
    pub fn with_title_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.title_pattern = pattern.into();
        self
    }

    #[must_use]
    pub fn with_leading_title(mut self, policy: LeadingTitlePolicy) -> Self {
        self.leading_title = policy;
        self
    }

    /// Check every field.
    pub fn validate(&self) -> Result<()> {
        validate_title_max(self.title_max)?;
        validate_title_pattern(&self.title_pattern)
    }
}

/// Parse a maximum title length given as text.
///
/// # Examples
/// ```
/// use txtbook::config::parse_title_max;
///
/// assert_eq!(parse_title_max("35").unwrap(), 35);
/// assert!(parse_title_max("0").is_err());
/// assert!(parse_title_max("many").is_err());
/// ```
pub fn parse_title_max(raw: &str) -> Result<usize> {
    let value: usize = raw
        .trim()
        .parse()
        .map_err(|_| TxtbookError::InvalidTitleMax(raw.to_string()))?;
    validate_title_max(value)?;
    Ok(value)
}

/// Validate the maximum title length.
pub fn validate_title_max(title_max: usize) -> Result<()> {
    if title_max == 0 {
        return Err(TxtbookError::InvalidTitleMax(title_max.to_string()));
    }
    Ok(())
}

/// Validate that a title pattern compiles.
///
/// # Examples
/// ```
/// use txtbook::config::{validate_title_pattern, DEFAULT_TITLE_PATTERN};
///
/// assert!(validate_title_pattern(DEFAULT_TITLE_PATTERN).is_ok());
/// assert!(validate_title_pattern("(unclosed").is_err());
/// ```
pub fn validate_title_pattern(pattern: &str) -> Result<()> {
    compile_title_pattern(pattern).map(|_| ())
}

/// Compile a title pattern, mapping failures to [`TxtbookError::InvalidTitlePattern`].
pub fn compile_title_pattern(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|source| TxtbookError::InvalidTitlePattern {
        pattern: pattern.to_string(),
        source,
    })
}

/// Validate a language tag such as `zh`, `en` or `zh-Hans`.
pub fn validate_lang(lang: &str) -> Result<()> {
    if LANG_PATTERN.is_match(lang) {
        Ok(())
    } else {
        Err(TxtbookError::InvalidLanguage(lang.to_string()))
    }
}

/// Validate that a book name can serve as the output file stem.
pub fn validate_book_name(name: &str) -> Result<()> {
    let trimmed = name.trim();
    if trimmed.is_empty()
        || trimmed == "."
        || trimmed == ".."
        || trimmed.contains(['/', '\\'])
        || trimmed.contains('\0')
    {
        return Err(TxtbookError::InvalidBookName(name.to_string()));
    }
    Ok(())
}
