//! txtbook - Split plain-text novels into chapters and package them as EPUB.
//!
//! Plain-text novels come in whatever encoding the uploader's editor used
//! and carry no structure beyond chapter headings written as ordinary
//! lines. This crate normalizes the encoding, detects the headings and
//! hands each chapter to a packaging backend.
//!
//! # Example
//!
//! ```
//! use txtbook::segment::{segment, Section, SegmentEngine, StyleRef};
//! use txtbook::SegmenterConfig;
//!
//! let mut engine = SegmentEngine::from_config(&SegmenterConfig::default()).unwrap();
//! let mut sections: Vec<Section> = Vec::new();
//! let lines = ["第一章 风起", "夜色渐深。", "第二章 云涌", "天亮了。"]
//!     .map(|l| Ok(l.to_string()));
//!
//! segment(lines, &mut engine, &mut sections, &StyleRef::none()).unwrap();
//! assert_eq!(sections.len(), 2);
//! assert_eq!(sections[1].title, "第二章 云涌");
//! ```
//!
//! # Architecture
//!
//! - [`config`]: Configuration constants and validation
//! - [`error`]: Error types and Result alias
//! - [`encoding`]: Encoding detection and the canonical line reader
//! - [`segment`]: Line classification and the segmentation engine
//! - [`epub`]: EPUB packaging
//! - [`split`]: One text file per chapter plus a YAML index
//! - [`book`]: Book service tying the pieces together
//! - [`cli`]: Command-line interface

pub mod book;
pub mod cli;
pub mod config;
pub mod encoding;
pub mod epub;
pub mod error;
pub mod segment;
pub mod split;

// Re-export main functions
pub use book::{build_book, split_book, BuildOptions, BuildReport, SplitOptions, SplitReport};

// Re-export commonly used items
pub use config::{LeadingTitlePolicy, SegmenterConfig};
pub use encoding::CanonicalReader;
pub use epub::{BookMetadata, EpubWriter};
pub use error::{Result, TxtbookError};
pub use segment::{Fragment, Section, SectionSink, StyleRef};
pub use split::SplitWriter;
