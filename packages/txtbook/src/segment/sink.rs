//! The seam between segmentation and packaging.

use super::fragment::Fragment;
use super::types::Section;
use crate::error::Result;

/// Opaque stylesheet reference owned by a packaging collaborator.
///
/// The engine never looks inside; it hands the same value back with every
/// section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StyleRef(String);

impl StyleRef {
    #[must_use]
    pub fn new(href: impl Into<String>) -> Self {
        Self(href.into())
    }

    /// A reference meaning "no stylesheet".
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_none(&self) -> bool {
        self.0.is_empty()
    }
}

/// Receives sealed sections in source order.
///
/// `emit_section` is called once per section, including exactly once for
/// the trailing section at end of input when there is one.
pub trait SectionSink {
    /// Accept one sealed section.
    fn emit_section(&mut self, body: &[Fragment], title: &str, style: &StyleRef) -> Result<()>;
}

/// Collects sections in memory.
impl SectionSink for Vec<Section> {
    fn emit_section(&mut self, body: &[Fragment], title: &str, _style: &StyleRef) -> Result<()> {
        self.push(Section::new(title, body.to_vec()));
        Ok(())
    }
}
