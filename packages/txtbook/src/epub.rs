//! EPUB packaging.
//!
//! [`EpubWriter`] is a [`SectionSink`]: every emitted section is streamed
//! into the archive as one XHTML chapter. [`EpubWriter::finish`] adds the
//! stylesheet, cover, navigation documents and package file, then moves
//! the archive into place.
//!
//! The archive is built in a temporary file next to the destination and
//! renamed over it only once complete, so a failed run never leaves a
//! partial `.epub` behind.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use html_escape::{encode_double_quoted_attribute, encode_text};
use tempfile::NamedTempFile;
use uuid::Uuid;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::config::{
    validate_book_name, validate_lang, DEFAULT_AUTHOR, DEFAULT_LANG, DEFAULT_SECTION_TITLE,
    PAGE_STYLES_CSS, STYLESHEET_HREF,
};
use crate::error::{Result, TxtbookError};
use crate::segment::{render_body, Fragment, SectionSink, StyleRef};

const MIMETYPE: &str = "application/epub+zip";
const ROOT_DIR: &str = "OEBPS";
const CONTAINER_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>
"#;

/// Descriptive metadata written into the package document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookMetadata {
    pub title: String,
    pub author: String,
    pub lang: String,
    pub description: Option<String>,
    /// Unique identifier, a `urn:uuid:` unless set explicitly.
    pub identifier: String,
}

impl BookMetadata {
    /// Metadata with the default author and language and a fresh identifier.
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            author: DEFAULT_AUTHOR.to_string(),
            lang: DEFAULT_LANG.to_string(),
            description: None,
            identifier: format!("urn:uuid:{}", Uuid::new_v4()),
        }
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
    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = identifier.into();
        self
    }
}

/// Map a cover image extension to its media type.
///
/// # Examples
/// ```
/// use txtbook::epub::cover_media_type;
///
/// assert_eq!(cover_media_type("JPG"), Some("image/jpeg"));
/// assert_eq!(cover_media_type("bmp"), None);
/// ```
#[must_use]
pub fn cover_media_type(extension: &str) -> Option<&'static str> {
    match extension.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "svg" => Some("image/svg+xml"),
        _ => None,
    }
}

#[derive(Debug)]
struct Cover {
    href: String,
    media_type: &'static str,
    bytes: Vec<u8>,
}

#[derive(Debug)]
struct Chapter {
    id: String,
    href: String,
    title: String,
}

/// Streams sections into an EPUB archive.
pub struct EpubWriter {
    zip: ZipWriter<NamedTempFile>,
    metadata: BookMetadata,
    destination: PathBuf,
    cover: Option<Cover>,
    chapters: Vec<Chapter>,
}

impl std::fmt::Debug for EpubWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EpubWriter")
            .field("metadata", &self.metadata)
            .field("destination", &self.destination)
            .field("chapters", &self.chapters.len())
            .finish_non_exhaustive()
    }
}

impl EpubWriter {
    /// Start a book that will be saved as `<output_dir>/<title>.epub`.
    ///
    /// `output_dir` must exist. The archive is staged in a temporary file in
    /// the same directory.
    pub fn create(output_dir: &Path, metadata: BookMetadata) -> Result<Self> {
        validate_book_name(&metadata.title)?;
        validate_lang(&metadata.lang)?;

        let destination = output_dir.join(format!("{}.epub", metadata.title.trim()));
        let staging = NamedTempFile::new_in(output_dir)?;

        let mut zip = ZipWriter::new(staging);
        // Readers sniff the first entry, so it must be stored uncompressed.
        let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        zip.start_file("mimetype", stored)?;
        zip.write_all(MIMETYPE.as_bytes())?;

        Ok(Self {
            zip,
            metadata,
            destination,
            cover: None,
            chapters: Vec::new(),
        })
    }

    /// Embed a cover image. The format is taken from the file extension.
    pub fn set_cover(&mut self, path: &Path) -> Result<()> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let media_type = cover_media_type(&extension)
            .ok_or_else(|| TxtbookError::UnsupportedCover(path.display().to_string()))?;

        let bytes = fs::read(path).map_err(|source| TxtbookError::Cover {
            path: path.to_path_buf(),
            source,
        })?;

        self.cover = Some(Cover {
            href: format!("images/cover.{extension}"),
            media_type,
            bytes,
        });
        Ok(())
    }

    /// The stylesheet reference to pass along with every section.
    #[must_use]
    pub fn style_ref(&self) -> StyleRef {
        StyleRef::new(STYLESHEET_HREF)
    }

    /// Where the finished book will be saved.
    #[must_use]
    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Number of chapters written so far.
    #[must_use]
    pub fn chapter_count(&self) -> usize {
        self.chapters.len()
    }

    /// Write the remaining package files and move the book into place.
    ///
    /// Returns the path of the saved `.epub`.
    pub fn finish(mut self) -> Result<PathBuf> {
        if self.chapters.is_empty() {
            tracing::warn!("No sections were produced, writing an empty placeholder chapter");
            let style = self.style_ref();
            self.write_chapter(&[], DEFAULT_SECTION_TITLE, &style)?;
        }

        let options = SimpleFileOptions::default();

        self.zip.start_file("META-INF/container.xml", options)?;
        self.zip.write_all(CONTAINER_XML.as_bytes())?;

        self.zip
            .start_file(format!("{ROOT_DIR}/{STYLESHEET_HREF}"), options)?;
        self.zip.write_all(PAGE_STYLES_CSS.as_bytes())?;

        if let Some(cover) = &self.cover {
            self.zip
                .start_file(format!("{ROOT_DIR}/{}", cover.href), options)?;
            self.zip.write_all(&cover.bytes)?;
        }

        let nav = self.nav_document();
        self.zip.start_file(format!("{ROOT_DIR}/nav.xhtml"), options)?;
        self.zip.write_all(nav.as_bytes())?;

        let ncx = self.ncx_document();
        self.zip.start_file(format!("{ROOT_DIR}/toc.ncx"), options)?;
        self.zip.write_all(ncx.as_bytes())?;

        let opf = self.package_document();
        self.zip.start_file(format!("{ROOT_DIR}/content.opf"), options)?;
        self.zip.write_all(opf.as_bytes())?;

        let staging = self.zip.finish()?;
        staging.as_file().sync_all()?;

        // Replaces any existing book of the same name
        staging
            .persist(&self.destination)
            .map_err(|e| TxtbookError::Io(e.error))?;

        tracing::info!(
            path = %self.destination.display(),
            chapters = self.chapters.len(),
            "Saved EPUB"
        );
        Ok(self.destination)
    }

    fn write_chapter(&mut self, body: &[Fragment], title: &str, style: &StyleRef) -> Result<()> {
        let number = self.chapters.len() + 1;
        let chapter = Chapter {
            id: format!("chapter_{number:04}"),
            href: format!("text/chapter_{number:04}.xhtml"),
            title: title.to_string(),
        };

        let xhtml = chapter_document(&self.metadata.lang, title, body, style);
        self.zip.start_file(
            format!("{ROOT_DIR}/{}", chapter.href),
            SimpleFileOptions::default(),
        )?;
        self.zip.write_all(xhtml.as_bytes())?;

        self.chapters.push(chapter);
        Ok(())
    }

    fn package_document(&self) -> String {
        let meta = &self.metadata;
        let modified = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");

        let mut out = String::new();
        out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        out.push_str(
            "<package xmlns=\"http://www.idpf.org/2007/opf\" version=\"3.0\" unique-identifier=\"book-id\">\n",
        );
        out.push_str("  <metadata xmlns:dc=\"http://purl.org/dc/elements/1.1/\">\n");
        out.push_str(&format!(
            "    <dc:identifier id=\"book-id\">{}</dc:identifier>\n",
            encode_text(&meta.identifier)
        ));
        out.push_str(&format!("    <dc:title>{}</dc:title>\n", encode_text(&meta.title)));
        out.push_str(&format!(
            "    <dc:creator>{}</dc:creator>\n",
            encode_text(&meta.author)
        ));
        out.push_str(&format!(
            "    <dc:language>{}</dc:language>\n",
            encode_text(&meta.lang)
        ));
        if let Some(description) = &meta.description {
            out.push_str(&format!(
                "    <dc:description>{}</dc:description>\n",
                encode_text(description)
            ));
        }
        out.push_str(&format!(
            "    <meta property=\"dcterms:modified\">{modified}</meta>\n"
        ));
        if self.cover.is_some() {
            out.push_str("    <meta name=\"cover\" content=\"cover-image\"/>\n");
        }
        out.push_str("  </metadata>\n");

        out.push_str("  <manifest>\n");
        out.push_str(
            "    <item id=\"nav\" href=\"nav.xhtml\" media-type=\"application/xhtml+xml\" properties=\"nav\"/>\n",
        );
        out.push_str(
            "    <item id=\"ncx\" href=\"toc.ncx\" media-type=\"application/x-dtbncx+xml\"/>\n",
        );
        out.push_str(&format!(
            "    <item id=\"page-styles\" href=\"{STYLESHEET_HREF}\" media-type=\"text/css\"/>\n"
        ));
        if let Some(cover) = &self.cover {
            out.push_str(&format!(
                "    <item id=\"cover-image\" href=\"{}\" media-type=\"{}\" properties=\"cover-image\"/>\n",
                cover.href, cover.media_type
            ));
        }
        for chapter in &self.chapters {
            out.push_str(&format!(
                "    <item id=\"{}\" href=\"{}\" media-type=\"application/xhtml+xml\"/>\n",
                chapter.id, chapter.href
            ));
        }
        out.push_str("  </manifest>\n");

        out.push_str("  <spine toc=\"ncx\">\n");
        for chapter in &self.chapters {
            out.push_str(&format!("    <itemref idref=\"{}\"/>\n", chapter.id));
        }
        out.push_str("  </spine>\n");
        out.push_str("</package>\n");
        out
    }

    fn nav_document(&self) -> String {
        let lang = encode_double_quoted_attribute(&self.metadata.lang);
        let mut out = String::new();
        out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<!DOCTYPE html>\n");
        out.push_str(&format!(
            "<html xmlns=\"http://www.w3.org/1999/xhtml\" xmlns:epub=\"http://www.idpf.org/2007/ops\" lang=\"{lang}\" xml:lang=\"{lang}\">\n"
        ));
        out.push_str(&format!(
            "<head>\n<title>{}</title>\n</head>\n<body>\n",
            encode_text(&self.metadata.title)
        ));
        out.push_str("<nav epub:type=\"toc\" id=\"toc\">\n<ol>\n");
        for chapter in &self.chapters {
            out.push_str(&format!(
                "<li><a href=\"{}\">{}</a></li>\n",
                chapter.href,
                encode_text(&chapter.title)
            ));
        }
        out.push_str("</ol>\n</nav>\n</body>\n</html>\n");
        out
    }

    fn ncx_document(&self) -> String {
        let mut out = String::new();
        out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        out.push_str("<ncx xmlns=\"http://www.daisy.org/z3986/2005/ncx/\" version=\"2005-1\">\n");
        out.push_str(&format!(
            "<head>\n<meta name=\"dtb:uid\" content=\"{}\"/>\n</head>\n",
            encode_double_quoted_attribute(&self.metadata.identifier)
        ));
        out.push_str(&format!(
            "<docTitle><text>{}</text></docTitle>\n<navMap>\n",
            encode_text(&self.metadata.title)
        ));
        for (i, chapter) in self.chapters.iter().enumerate() {
            let order = i + 1;
            out.push_str(&format!(
                "<navPoint id=\"nav_{order}\" playOrder=\"{order}\"><navLabel><text>{}</text></navLabel><content src=\"{}\"/></navPoint>\n",
                encode_text(&chapter.title),
                chapter.href
            ));
        }
        out.push_str("</navMap>\n</ncx>\n");
        out
    }
}

impl SectionSink for EpubWriter {
    fn emit_section(&mut self, body: &[Fragment], title: &str, style: &StyleRef) -> Result<()> {
        self.write_chapter(body, title, style)
    }
}

/// Build the XHTML document for one chapter.
fn chapter_document(lang: &str, title: &str, body: &[Fragment], style: &StyleRef) -> String {
    let lang = encode_double_quoted_attribute(lang);
    let stylesheet = if style.is_none() {
        String::new()
    } else {
        format!(
            "<link rel=\"stylesheet\" type=\"text/css\" href=\"../{}\"/>\n",
            encode_double_quoted_attribute(style.as_str())
        )
    };

    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<!DOCTYPE html>\n\
         <html xmlns=\"http://www.w3.org/1999/xhtml\" lang=\"{lang}\" xml:lang=\"{lang}\">\n\
         <head>\n<title>{}</title>\n{stylesheet}</head>\n<body>\n{}\n</body>\n</html>\n",
        encode_text(title),
        render_body(body)
    )
}
