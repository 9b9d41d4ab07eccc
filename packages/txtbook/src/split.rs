//! Plain-text splitting.
//!
//! [`SplitWriter`] writes every section to its own numbered text file and
//! finishes with an `index.yaml` manifest listing them in order.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tempfile::NamedTempFile;

use crate::error::{Result, TxtbookError};
use crate::segment::{Fragment, SectionSink, StyleRef};

/// File name of the manifest written next to the section files.
pub const INDEX_FILE: &str = "index.yaml";

/// Manifest entry for one section file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexEntry {
    pub number: usize,
    pub title: String,
    pub file: String,
    /// Body fragments, not counting the heading.
    pub fragments: usize,
}

#[derive(Debug, Serialize)]
struct SplitIndex<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    source: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    encoding: Option<&'a str>,
    sections: &'a [IndexEntry],
}

/// Writes sections as numbered `.txt` files.
#[derive(Debug)]
pub struct SplitWriter {
    output_dir: PathBuf,
    source: Option<String>,
    encoding: Option<String>,
    entries: Vec<IndexEntry>,
}

impl SplitWriter {
    /// Prepare `output_dir`, creating it if needed.
    pub fn create(output_dir: &Path) -> Result<Self> {
        fs::create_dir_all(output_dir)?;
        Ok(Self {
            output_dir: output_dir.to_path_buf(),
            source: None,
            encoding: None,
            entries: Vec::new(),
        })
    }

    /// Record where the text came from in the manifest.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>, encoding: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self.encoding = Some(encoding.into());
        self
    }

    #[must_use]
    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    /// Write the manifest. Returns its path.
    pub fn finish(self) -> Result<PathBuf> {
        let index = SplitIndex {
            source: self.source.as_deref(),
            encoding: self.encoding.as_deref(),
            sections: &self.entries,
        };
        let yaml = serde_yaml_ng::to_string(&index)?;
        let content = format!("---\n{yaml}");

        let path = self.output_dir.join(INDEX_FILE);
        write_atomic(&path, content.as_bytes())?;

        tracing::info!(
            path = %path.display(),
            sections = self.entries.len(),
            "Saved split index"
        );
        Ok(path)
    }
}

impl SectionSink for SplitWriter {
    fn emit_section(&mut self, body: &[Fragment], title: &str, _style: &StyleRef) -> Result<()> {
        let number = self.entries.len() + 1;
        let file = format!("{number:04}.txt");

        let text = section_text(title, body);
        write_atomic(&self.output_dir.join(&file), text.as_bytes())?;

        self.entries.push(IndexEntry {
            number,
            title: title.to_string(),
            file,
            fragments: body.iter().filter(|f| !f.is_heading()).count(),
        });
        Ok(())
    }
}

/// Title, a blank line, then one line per body fragment.
fn section_text(title: &str, body: &[Fragment]) -> String {
    let mut out = String::with_capacity(title.len() + 2);
    out.push_str(title);
    out.push_str("\n\n");
    for fragment in body.iter().filter(|f| !f.is_heading()) {
        out.push_str(fragment.text());
        out.push('\n');
    }
    out
}

/// Write `content` to `path` via a temp file in the same directory, sync, then rename.
///
/// The temp file is removed on every error path.
fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
    let dir = path.parent().unwrap_or(Path::new("."));
    let mut staging = NamedTempFile::new_in(dir)?;
    staging.write_all(content)?;
    staging.as_file().sync_all()?;

    staging
        .persist(path)
        .map_err(|e| TxtbookError::Io(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[test]
    fn test_section_text_skips_heading() {
        let body = [
            Fragment::Heading("第一章".into()),
            Fragment::Paragraph("一".into()),
            Fragment::Raw("***".into()),
        ];
        assert_eq!(section_text("第一章", &body), "第一章\n\n一\n***\n");
    }

    #[test]
    fn test_split_writes_files_and_index() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("chapters");
        let mut writer = SplitWriter::create(&out)
            .unwrap()
            .with_source("novel.txt", "GBK");
        let style = StyleRef::none();

        writer
            .emit_section(
                &[Fragment::Paragraph("preface".into())],
                "章节正文",
                &style,
            )
            .unwrap();
        writer
            .emit_section(
                &[
                    Fragment::Heading("Chapter 1".into()),
                    Fragment::Paragraph("a".into()),
                    Fragment::Paragraph("b".into()),
                ],
                "Chapter 1",
                &style,
            )
            .unwrap();

        assert_eq!(
            writer.entries()[1],
            IndexEntry {
                number: 2,
                title: "Chapter 1".into(),
                file: "0002.txt".into(),
                fragments: 2,
            }
        );

        let index = writer.finish().unwrap();
        assert_eq!(index, out.join(INDEX_FILE));

        assert_eq!(
            fs::read_to_string(out.join("0002.txt")).unwrap(),
            "Chapter 1\n\na\nb\n"
        );

        let yaml = fs::read_to_string(&index).unwrap();
        assert!(yaml.starts_with("---\n"));
        assert!(yaml.contains("source: novel.txt"));
        assert!(yaml.contains("encoding: GBK"));
        assert!(yaml.contains("file: 0001.txt"));
        assert!(yaml.contains("title: Chapter 1"));

        // No temp files left behind
        let mut names: Vec<String> = fs::read_dir(&out)
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names, vec!["0001.txt", "0002.txt", INDEX_FILE]);
    }

    #[test]
    fn test_empty_split_writes_empty_index() {
        let dir = tempdir().unwrap();
        let writer = SplitWriter::create(dir.path()).unwrap();
        let index = writer.finish().unwrap();
        let yaml = fs::read_to_string(index).unwrap();
        assert!(yaml.contains("sections: []"));
        assert!(!yaml.contains("source:"));
    }

    #[test]
    fn test_write_atomic_failure_leaves_no_temp_file() {
        let dir = tempdir().unwrap();
        // A directory in the way makes the final rename fail
        let blocked = dir.path().join("0001.txt");
        fs::create_dir(&blocked).unwrap();

        assert!(write_atomic(&blocked, b"text").is_err());

        let names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["0001.txt".to_string()]);
        assert!(blocked.is_dir());
    }

    #[test]
    fn test_write_atomic_replaces_existing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("x.txt");
        fs::write(&path, "old").unwrap();
        write_atomic(&path, b"new").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "new");
    }
}
