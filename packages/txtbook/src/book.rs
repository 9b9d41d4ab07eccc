//! Book service that ties all components together.

use std::path::{Path, PathBuf};

use crate::config::{validate_book_name, validate_lang, SegmenterConfig, DEFAULT_AUTHOR, DEFAULT_LANG};
use crate::encoding::CanonicalReader;
use crate::epub::{BookMetadata, EpubWriter};
use crate::error::Result;
use crate::segment::{segment, SegmentEngine, SegmentStats, StyleRef};
use crate::split::SplitWriter;

/// Inputs for [`build_book`].
#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub input: PathBuf,
    pub book_name: String,
    pub output_dir: PathBuf,
    pub cover: Option<PathBuf>,
    pub author: String,
    pub lang: String,
    pub description: Option<String>,
    pub segmenter: SegmenterConfig,
}

impl BuildOptions {
    /// Options with the default author, language and segmenter, writing to
    /// the current directory.
    #[must_use]
    pub fn new(input: impl Into<PathBuf>, book_name: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            book_name: book_name.into(),
            output_dir: PathBuf::from("."),
            cover: None,
            author: DEFAULT_AUTHOR.to_string(),
            lang: DEFAULT_LANG.to_string(),
            description: None,
            segmenter: SegmenterConfig::default(),
        }
    }

    #[must_use]
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    #[must_use]
    pub fn with_cover(mut self, cover: impl Into<PathBuf>) -> Self {
        self.cover = Some(cover.into());
        self
    }

    #[must_use]
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = author.into();
        self
    }

    #[must_use]
    pub fn with_lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = lang.into();
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn with_segmenter(mut self, segmenter: SegmenterConfig) -> Self {
        self.segmenter = segmenter;
        self
    }

    /// Check everything that can be checked before touching the input.
    pub fn validate(&self) -> Result<()> {
        validate_book_name(&self.book_name)?;
        validate_lang(&self.lang)?;
        self.segmenter.validate()
    }
}

/// Outcome of [`build_book`].
#[derive(Debug, Clone)]
pub struct BuildReport {
    pub output: PathBuf,
    pub encoding: &'static str,
    pub sections: usize,
    pub stats: SegmentStats,
}

/// Convert a plain-text file into an EPUB book.
///
/// # Returns
/// A [`BuildReport`] with the path of the saved `.epub`, the detected
/// encoding and segmentation counters.
pub fn build_book(options: &BuildOptions) -> Result<BuildReport> {
    options.validate()?;

    let mut engine = SegmentEngine::from_config(&options.segmenter)?;

    let mut metadata = BookMetadata::new(options.book_name.trim())
        .with_author(&options.author)
        .with_lang(&options.lang);
    if let Some(description) = &options.description {
        metadata = metadata.with_description(description);
    }

    // Cover problems should surface before the input is read
    let mut writer = EpubWriter::create(&options.output_dir, metadata)?;
    if let Some(cover) = &options.cover {
        writer.set_cover(cover)?;
    }

    let reader = CanonicalReader::open(&options.input)?;
    let encoding = reader.encoding().name();
    let style = writer.style_ref();

    let stats = segment(reader, &mut engine, &mut writer, &style)?;
    let sections = writer.chapter_count();
    let output = writer.finish()?;

    tracing::info!(
        input = %options.input.display(),
        encoding,
        sections,
        "Built book"
    );

    Ok(BuildReport {
        output,
        encoding,
        sections,
        stats,
    })
}

/// Inputs for [`split_book`].
#[derive(Debug, Clone)]
pub struct SplitOptions {
    pub input: PathBuf,
    /// Target directory; defaults to the input's file stem.
    pub output_dir: Option<PathBuf>,
    pub segmenter: SegmenterConfig,
}

impl SplitOptions {
    #[must_use]
    pub fn new(input: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output_dir: None,
            segmenter: SegmenterConfig::default(),
        }
    }

    #[must_use]
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    #[must_use]
    pub fn with_segmenter(mut self, segmenter: SegmenterConfig) -> Self {
        self.segmenter = segmenter;
        self
    }

    /// The directory sections will be written to.
    #[must_use]
    pub fn resolved_output_dir(&self) -> PathBuf {
        self.output_dir
            .clone()
            .unwrap_or_else(|| default_split_dir(&self.input))
    }
}

/// Outcome of [`split_book`].
#[derive(Debug, Clone)]
pub struct SplitReport {
    pub output_dir: PathBuf,
    pub index: PathBuf,
    pub encoding: &'static str,
    pub sections: usize,
    pub stats: SegmentStats,
}

/// Split a plain-text file into one text file per section.
pub fn split_book(options: &SplitOptions) -> Result<SplitReport> {
    options.segmenter.validate()?;

    let mut engine = SegmentEngine::from_config(&options.segmenter)?;
    let reader = CanonicalReader::open(&options.input)?;
    let encoding = reader.encoding().name();

    let output_dir = options.resolved_output_dir();
    let mut writer = SplitWriter::create(&output_dir)?
        .with_source(options.input.display().to_string(), encoding);

    let stats = segment(reader, &mut engine, &mut writer, &StyleRef::none())?;
    let sections = writer.entries().len();
    let index = writer.finish()?;

    Ok(SplitReport {
        output_dir,
        index,
        encoding,
        sections,
        stats,
    })
}

fn default_split_dir(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "sections".to_string());
    PathBuf::from(stem)
}
