//! Section type produced by the segmentation engine.

use super::fragment::{render_body, Fragment};

/// A titled run of body fragments, in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    /// Detected title line, or the placeholder for untitled text.
    pub title: String,

    /// Body fragments. Titled sections start with their heading.
    pub body: Vec<Fragment>,
}

impl Section {
    /// Create a new section.
    #[must_use]
    pub fn new(title: impl Into<String>, body: Vec<Fragment>) -> Self {
        Self {
            title: title.into(),
            body,
        }
    }

    /// Render the body as XHTML.
    #[must_use]
    pub fn to_html(&self) -> String {
        render_body(&self.body)
    }

    /// Number of non-heading fragments.
    #[must_use]
    pub fn content_len(&self) -> usize {
        self.body.iter().filter(|f| !f.is_heading()).count()
    }
}
