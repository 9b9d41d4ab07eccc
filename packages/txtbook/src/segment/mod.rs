//! Chapter segmentation for flat plain-text documents.
//!
//! Each canonical line is classified on its own (see [`TitleClassifier`]),
//! then [`SegmentEngine`] folds the classified lines into ordered
//! [`Section`]s. [`segment`] drives a whole input through the engine and
//! hands every sealed section to a [`SectionSink`].

mod classify;
mod engine;
mod fragment;
mod sink;
mod types;

pub use classify::{LineClass, TitleClassifier};
pub use engine::{segment, SegmentEngine, SegmentStats};
pub use fragment::{render_body, render_content, Fragment};
pub use sink::{SectionSink, StyleRef};
pub use types::Section;
