//! End-to-end integration tests for the txtbook pipeline.
//!
//! Runs the fixture novel through encoding detection, segmentation and
//! both packaging backends.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use encoding_rs::GBK;
use pretty_assertions::assert_eq;
use tempfile::tempdir;
use txtbook::config::DEFAULT_SECTION_TITLE;
use txtbook::segment::{segment, Fragment, Section, SegmentEngine, StyleRef};
use txtbook::{
    build_book, split_book, BuildOptions, CanonicalReader, LeadingTitlePolicy, SegmenterConfig,
    SplitOptions,
};

const EXPECTED_TITLES: [&str; 5] = [
    DEFAULT_SECTION_TITLE,
    "引子",
    "第一章 风起",
    "第二章 云涌",
    "第三章 归来",
];

fn fixture_path() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("novel.txt")
}

/// Run the segmentation pipeline on a file.
fn segment_file(path: &Path, config: &SegmenterConfig) -> Vec<Section> {
    let reader = CanonicalReader::open(path).expect("Failed to open input");
    let mut engine = SegmentEngine::from_config(config).expect("Failed to build engine");
    let mut sections: Vec<Section> = Vec::new();
    segment(reader, &mut engine, &mut sections, &StyleRef::none()).expect("Segmentation failed");
    sections
}

fn titles(sections: &[Section]) -> Vec<&str> {
    sections.iter().map(|s| s.title.as_str()).collect()
}

#[test]
fn test_pipeline_section_titles() {
    let sections = segment_file(&fixture_path(), &SegmenterConfig::default());
    assert_eq!(titles(&sections), EXPECTED_TITLES);
}

#[test]
fn test_pipeline_front_matter_section() {
    let sections = segment_file(&fixture_path(), &SegmenterConfig::default());
    assert_eq!(
        sections[0].body,
        vec![
            Fragment::Paragraph("《山城旧事》".into()),
            Fragment::Paragraph("作者：佚名".into()),
        ]
    );
}

#[test]
fn test_pipeline_chapter_bodies() {
    let sections = segment_file(&fixture_path(), &SegmenterConfig::default());

    // Every titled section opens with its own heading
    for section in &sections[1..] {
        assert_eq!(section.body[0], Fragment::Heading(section.title.clone()));
    }

    let chapter_one = &sections[2];
    assert_eq!(chapter_one.content_len(), 4);
    assert_eq!(
        chapter_one.body.last(),
        Some(&Fragment::Raw("=====".into()))
    );
    assert_eq!(sections[4].content_len(), 1);
}

#[test]
fn test_pipeline_preserves_every_non_blank_line() {
    let text = fs::read_to_string(fixture_path()).unwrap();
    let expected: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();

    let sections = segment_file(&fixture_path(), &SegmenterConfig::default());
    let flattened: Vec<&str> = sections
        .iter()
        .flat_map(|s| s.body.iter().map(Fragment::text))
        .collect();
    assert_eq!(flattened, expected);
}

#[test]
fn test_pipeline_gbk_matches_utf8() {
    let text = fs::read_to_string(fixture_path()).unwrap();
    let (bytes, _, unmappable) = GBK.encode(&text);
    assert!(!unmappable);

    let dir = tempdir().unwrap();
    let path = dir.path().join("novel-gbk.txt");
    fs::write(&path, &bytes).unwrap();

    let reader = CanonicalReader::open(&path).unwrap();
    assert_ne!(reader.encoding(), encoding_rs::UTF_8);

    let gbk_sections = segment_file(&path, &SegmenterConfig::default());
    let utf8_sections = segment_file(&fixture_path(), &SegmenterConfig::default());
    assert_eq!(gbk_sections, utf8_sections);
}

#[test]
fn test_pipeline_drop_policy_only_affects_leading_titles() {
    // The fixture opens with body text, so nothing is dropped
    let config = SegmenterConfig::default().with_leading_title(LeadingTitlePolicy::Drop);
    let sections = segment_file(&fixture_path(), &config);
    assert_eq!(titles(&sections), EXPECTED_TITLES);

    let dir = tempdir().unwrap();
    let path = dir.path().join("leading.txt");
    fs::write(&path, "第一章 开端\n正文。\n第二章 继续\n更多正文。\n").unwrap();

    let seeded = segment_file(&path, &SegmenterConfig::default());
    assert_eq!(titles(&seeded), vec!["第一章 开端", "第二章 继续"]);

    let dropped = segment_file(&path, &config);
    assert_eq!(titles(&dropped), vec![DEFAULT_SECTION_TITLE, "第二章 继续"]);
}

#[test]
fn test_pipeline_custom_title_policy() {
    let config = SegmenterConfig::default()
        .with_title_pattern("^第.章")
        .with_title_max(10);
    let sections = segment_file(&fixture_path(), &config);
    // 引子 no longer counts as a title
    assert_eq!(
        titles(&sections),
        vec![
            DEFAULT_SECTION_TITLE,
            "第一章 风起",
            "第二章 云涌",
            "第三章 归来"
        ]
    );
}

#[test]
fn test_build_book_from_fixture() {
    let dir = tempdir().unwrap();
    let report = build_book(
        &BuildOptions::new(fixture_path(), "山城旧事")
            .with_output_dir(dir.path())
            .with_author("佚名"),
    )
    .unwrap();

    assert_eq!(report.sections, 5);
    assert_eq!(report.encoding, "UTF-8");
    assert_eq!(report.stats.sections, 5);

    let mut archive = zip::ZipArchive::new(fs::File::open(&report.output).unwrap()).unwrap();
    for n in 1..=5 {
        let name = format!("OEBPS/text/chapter_{n:04}.xhtml");
        assert!(archive.by_name(&name).is_ok(), "missing {name}");
    }
    assert!(archive.by_name("OEBPS/text/chapter_0006.xhtml").is_err());

    let mut nav = String::new();
    archive
        .by_name("OEBPS/nav.xhtml")
        .unwrap()
        .read_to_string(&mut nav)
        .unwrap();
    let positions: Vec<usize> = EXPECTED_TITLES
        .iter()
        .map(|t| nav.find(&format!(">{t}</a>")).unwrap())
        .collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]));

    let mut opf = String::new();
    archive
        .by_name("OEBPS/content.opf")
        .unwrap()
        .read_to_string(&mut opf)
        .unwrap();
    assert!(opf.contains("<dc:creator>佚名</dc:creator>"));
}

#[test]
fn test_split_book_from_fixture() {
    let dir = tempdir().unwrap();
    let out = dir.path().join("chapters");
    let report = split_book(&SplitOptions::new(fixture_path()).with_output_dir(&out)).unwrap();

    assert_eq!(report.sections, 5);

    let index: serde_yaml_ng::Value =
        serde_yaml_ng::from_str(&fs::read_to_string(&report.index).unwrap()).unwrap();
    let entries = index["sections"].as_sequence().unwrap();
    assert_eq!(entries.len(), 5);
    assert_eq!(entries[2]["title"].as_str(), Some("第一章 风起"));
    assert_eq!(entries[2]["file"].as_str(), Some("0003.txt"));

    let chapter = fs::read_to_string(out.join("0005.txt")).unwrap();
    assert!(chapter.starts_with("第三章 归来\n\n三年之后"));
}

#[test]
fn test_empty_input() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("empty.txt");
    fs::write(&path, "").unwrap();

    assert!(segment_file(&path, &SegmenterConfig::default()).is_empty());

    let report = build_book(&BuildOptions::new(&path, "empty").with_output_dir(dir.path())).unwrap();
    // No sections, but the book still gets a placeholder chapter
    assert_eq!(report.sections, 0);
    let mut archive = zip::ZipArchive::new(fs::File::open(&report.output).unwrap()).unwrap();
    assert!(archive.by_name("OEBPS/text/chapter_0001.xhtml").is_ok());

    let split = split_book(&SplitOptions::new(&path).with_output_dir(dir.path().join("s"))).unwrap();
    assert_eq!(split.sections, 0);
}
