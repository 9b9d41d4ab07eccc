//! Segmentation state machine.

use super::classify::{LineClass, TitleClassifier};
use super::fragment::{render_content, Fragment};
use super::sink::{SectionSink, StyleRef};
use super::types::Section;
use crate::config::{LeadingTitlePolicy, SegmenterConfig, DEFAULT_SECTION_TITLE};
use crate::error::Result;

/// Counters collected while segmenting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SegmentStats {
    pub lines: usize,
    pub blank_lines: usize,
    pub title_lines: usize,
    pub content_lines: usize,
    /// Title lines discarded because nothing had been collected yet.
    pub dropped_titles: usize,
    pub sections: usize,
}

/// Folds classified lines into sections.
///
/// The engine owns one open buffer (a title plus body fragments). A title
/// line seals the buffer and opens the next one; the end of input seals
/// whatever is left.
#[derive(Debug)]
pub struct SegmentEngine {
    classifier: TitleClassifier,
    leading_title: LeadingTitlePolicy,
    title: String,
    body: Vec<Fragment>,
    stats: SegmentStats,
}

impl SegmentEngine {
    #[must_use]
    pub fn new(classifier: TitleClassifier, leading_title: LeadingTitlePolicy) -> Self {
        Self {
            classifier,
            leading_title,
            title: String::new(),
            body: Vec::new(),
            stats: SegmentStats::default(),
        }
    }

    /// Build an engine from segmenter settings.
    pub fn from_config(config: &SegmenterConfig) -> Result<Self> {
        let classifier = TitleClassifier::from_config(config)?;
        Ok(Self::new(classifier, config.leading_title))
    }

    /// Feed one line. Returns the previous section if this line sealed it.
    pub fn push(&mut self, line: &str) -> Option<Section> {
        let line = line.trim();
        self.stats.lines += 1;

        match self.classifier.classify(line) {
            LineClass::Blank => {
                self.stats.blank_lines += 1;
                None
            }
            LineClass::Title => {
                self.stats.title_lines += 1;
                self.on_title(line)
            }
            LineClass::Content => {
                self.stats.content_lines += 1;
                self.body.push(render_content(line));
                None
            }
        }
    }

    /// Seal and return the open section, if it holds anything.
    ///
    /// The engine is back in its initial state afterwards.
    pub fn finish(&mut self) -> Option<Section> {
        if self.body.is_empty() {
            self.title.clear();
            return None;
        }
        Some(self.seal())
    }

    #[must_use]
    pub fn stats(&self) -> SegmentStats {
        self.stats
    }

    fn on_title(&mut self, line: &str) -> Option<Section> {
        if self.body.is_empty() {
            match self.leading_title {
                LeadingTitlePolicy::Seed => self.open(line),
                LeadingTitlePolicy::Drop => {
                    self.stats.dropped_titles += 1;
                    tracing::warn!(title = %line, "Dropping title seen before any content");
                }
            }
            return None;
        }

        let sealed = self.seal();
        self.open(line);
        Some(sealed)
    }

    fn open(&mut self, title: &str) {
        self.title = title.to_string();
        self.body.push(Fragment::Heading(title.to_string()));
    }

    fn seal(&mut self) -> Section {
        let mut title = std::mem::take(&mut self.title);
        if title.is_empty() {
            title = DEFAULT_SECTION_TITLE.to_string();
        }
        let body = std::mem::take(&mut self.body);
        self.stats.sections += 1;
        tracing::debug!(
            index = self.stats.sections,
            title = %title,
            fragments = body.len(),
            "Sealed section"
        );
        Section::new(title, body)
    }
}

/// Run every line of `lines` through `engine`, handing sealed sections to `sink`.
///
/// The trailing section, if any, is emitted exactly once after the input
/// is exhausted. The first read error aborts the run.
pub fn segment<I, S>(
    lines: I,
    engine: &mut SegmentEngine,
    sink: &mut S,
    style: &StyleRef,
) -> Result<SegmentStats>
where
    I: IntoIterator<Item = Result<String>>,
    S: SectionSink + ?Sized,
{
    for line in lines {
        let line = line?;
        if let Some(section) = engine.push(&line) {
            sink.emit_section(&section.body, &section.title, style)?;
        }
    }

    if let Some(section) = engine.finish() {
        sink.emit_section(&section.body, &section.title, style)?;
    }

    Ok(engine.stats())
}
