//! Character encoding detection and conversion to a canonical line stream.
//!
//! The first [`PEEK_SIZE`] bytes are sniffed:
//! - a byte order mark wins outright
//! - a prefix that is valid UTF-8 is read as UTF-8
//! - anything else goes to chardetng's statistical guess
//!
//! A prefix that is pure ASCII decides nothing: the whole input is read
//! and sniffed again, so a GBK body behind an ASCII banner is still found.
//!
//! UTF-8 input is streamed line by line without transformation. Any other
//! encoding is decoded in one pass with encoding_rs and served from memory.

use std::fs::File;
use std::io::{BufRead, BufReader, Cursor, Read};
use std::path::{Path, PathBuf};

use chardetng::EncodingDetector;
use encoding_rs::{Encoding, GB18030, UTF_8, WINDOWS_1252};

use crate::config::PEEK_SIZE;
use crate::error::{Result, TxtbookError};

const BOM: char = '\u{feff}';

/// Guess the encoding of a byte prefix.
///
/// `complete` tells the detector whether `prefix` is the whole input.
pub fn sniff_encoding(prefix: &[u8], complete: bool) -> &'static Encoding {
    if let Some((encoding, _bom_len)) = Encoding::for_bom(prefix) {
        return encoding;
    }

    if is_utf8_prefix(prefix, complete) {
        return UTF_8;
    }

    let mut detector = EncodingDetector::new();
    detector.feed(prefix, complete);
    detector.guess(None, true)
}

/// Apply the corpus calibration to a sniffed encoding.
///
/// For the plain-text novels this tool targets, a windows-1252 guess almost
/// always means the detector gave up on GBK-family text, so it is read as
/// GB18030 instead.
pub fn calibrate(encoding: &'static Encoding) -> &'static Encoding {
    if encoding == WINDOWS_1252 {
        GB18030
    } else {
        encoding
    }
}

/// Check whether `prefix` is UTF-8, tolerating a sequence cut off by the peek window.
fn is_utf8_prefix(prefix: &[u8], complete: bool) -> bool {
    match std::str::from_utf8(prefix) {
        Ok(_) => true,
        Err(e) => !complete && e.error_len().is_none(),
    }
}

/// Sequential reader over the canonical (decoded, trimmed) lines of an input.
pub struct CanonicalReader {
    inner: Box<dyn BufRead>,
    encoding: &'static Encoding,
    source: PathBuf,
    buf: Vec<u8>,
    at_start: bool,
}

impl std::fmt::Debug for CanonicalReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CanonicalReader")
            .field("encoding", &self.encoding.name())
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

impl CanonicalReader {
    /// Open a text file and prepare it for line reading.
    ///
    /// # Errors
    ///
    /// [`TxtbookError::InputOpen`] if the file cannot be opened,
    /// [`TxtbookError::InputRead`] if reading it fails.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|source| TxtbookError::InputOpen {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_reader(file, path)
    }

    /// Wrap an arbitrary byte source. `source` names it in error messages.
    pub fn from_reader<R>(mut reader: R, source: impl Into<PathBuf>) -> Result<Self>
    where
        R: Read + 'static,
    {
        let source = source.into();
        let read_error = |e: std::io::Error| TxtbookError::InputRead {
            path: source.clone(),
            source: e,
        };

        let mut prefix = Vec::with_capacity(PEEK_SIZE);
        (&mut reader)
            .take(PEEK_SIZE as u64)
            .read_to_end(&mut prefix)
            .map_err(read_error)?;
        let complete = prefix.len() < PEEK_SIZE;

        let sniffed = sniff_encoding(&prefix, complete);
        let encoding = calibrate(sniffed);
        if encoding != sniffed {
            tracing::debug!(
                sniffed = sniffed.name(),
                using = encoding.name(),
                "Overriding sniffed encoding"
            );
        }

        // A pure ASCII window says nothing about the rest of the file
        let undecided = encoding == UTF_8 && !complete && prefix.is_ascii();

        if encoding == UTF_8 && !undecided {
            tracing::info!(encoding = encoding.name(), source = %source.display(), "Reading input");
            let inner: Box<dyn BufRead> = Box::new(BufReader::new(Cursor::new(prefix).chain(reader)));
            return Ok(Self::new(inner, encoding, source));
        }

        let mut bytes = prefix;
        reader.read_to_end(&mut bytes).map_err(read_error)?;

        let encoding = if undecided {
            let sniffed = sniff_encoding(&bytes, true);
            tracing::debug!(
                sniffed = sniffed.name(),
                "ASCII-only prefix, sniffed the whole input"
            );
            calibrate(sniffed)
        } else {
            encoding
        };

        let (text, used, had_errors) = encoding.decode(&bytes);
        if had_errors {
            tracing::warn!(
                encoding = used.name(),
                source = %source.display(),
                "Input contained malformed sequences, replaced with U+FFFD"
            );
        }
        tracing::info!(encoding = used.name(), bytes = bytes.len(), source = %source.display(), "Decoded input");

        let inner: Box<dyn BufRead> = Box::new(Cursor::new(text.into_owned().into_bytes()));
        Ok(Self::new(inner, used, source))
    }

    fn new(inner: Box<dyn BufRead>, encoding: &'static Encoding, source: PathBuf) -> Self {
        Self {
            inner,
            encoding,
            source,
            buf: Vec::new(),
            at_start: true,
        }
    }

    /// The encoding the input is being decoded with.
    #[must_use]
    pub fn encoding(&self) -> &'static Encoding {
        self.encoding
    }

    /// Read the next line with surrounding whitespace removed.
    ///
    /// Returns `Ok(None)` once the input is exhausted.
    pub fn next_line(&mut self) -> Result<Option<String>> {
        self.buf.clear();
        let n = self
            .inner
            .read_until(b'\n', &mut self.buf)
            .map_err(|source| TxtbookError::InputRead {
                path: self.source.clone(),
                source,
            })?;
        if n == 0 {
            return Ok(None);
        }

        let text = String::from_utf8_lossy(&self.buf);
        let mut line = text.trim();
        if self.at_start {
            self.at_start = false;
            line = line.strip_prefix(BOM).unwrap_or(line).trim_start();
        }
        Ok(Some(line.to_string()))
    }
}

impl Iterator for CanonicalReader {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_line().transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use encoding_rs::{GBK, UTF_16LE};
    use pretty_assertions::assert_eq;

    fn read_all(bytes: Vec<u8>) -> (Vec<String>, &'static Encoding) {
        let reader = CanonicalReader::from_reader(Cursor::new(bytes), "test").unwrap();
        let encoding = reader.encoding();
        let lines = reader.collect::<Result<Vec<_>>>().unwrap();
        (lines, encoding)
    }

    #[test]
    fn test_sniff_ascii_is_utf8() {
        assert_eq!(sniff_encoding(b"Hello, world!", true), UTF_8);
    }

    #[test]
    fn test_sniff_empty_is_utf8() {
        assert_eq!(sniff_encoding(b"", true), UTF_8);
    }

    #[test]
    fn test_sniff_bom() {
        assert_eq!(sniff_encoding(&[0xEF, 0xBB, 0xBF, b'a'], true), UTF_8);
        assert_eq!(sniff_encoding(&[0xFF, 0xFE, b'a', 0x00], true), UTF_16LE);
    }

    #[test]
    fn test_sniff_tolerates_cut_sequence() {
        // "中" is E4 B8 AD; drop the last byte as if the peek window ended there.
        let bytes = [b'a', 0xE4, 0xB8];
        assert_eq!(sniff_encoding(&bytes, false), UTF_8);
        assert!(!is_utf8_prefix(&bytes, true));
    }

    #[test]
    fn test_calibrate_overrides_windows_1252() {
        assert_eq!(calibrate(WINDOWS_1252), GB18030);
        assert_eq!(calibrate(UTF_8), UTF_8);
        assert_eq!(calibrate(GBK), GBK);
    }

    #[test]
    fn test_utf8_lines_are_trimmed() {
        let (lines, encoding) = read_all("  第一章 开始 \r\n\t正文。\n\n最后一行".as_bytes().to_vec());
        assert_eq!(encoding, UTF_8);
        assert_eq!(lines, vec!["第一章 开始", "正文。", "", "最后一行"]);
    }

    #[test]
    fn test_utf8_bom_is_dropped() {
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice("Chapter 1\nText".as_bytes());
        let (lines, encoding) = read_all(bytes);
        assert_eq!(encoding, UTF_8);
        assert_eq!(lines, vec!["Chapter 1", "Text"]);
    }

    #[test]
    fn test_utf8_round_trip_across_peek_window() {
        // Long enough that the peek window splits a multi-byte character.
        let line = "天地玄黄，宇宙洪荒。日月盈昃，辰宿列张。";
        let text: String = (0..100).map(|i| format!("{line}{i}\n")).collect();
        let (lines, encoding) = read_all(text.clone().into_bytes());

        assert_eq!(encoding, UTF_8);
        assert_eq!(lines.len(), 100);
        assert_eq!(lines.join("\n") + "\n", text);
        assert!(lines.iter().all(|l| !l.contains('\u{FFFD}')));
    }

    #[test]
    fn test_utf16_with_bom_is_decoded() {
        let mut bytes = vec![0xFF, 0xFE];
        for unit in "Chapter 1\nHello".encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        let (lines, encoding) = read_all(bytes);
        assert_eq!(encoding, UTF_16LE);
        assert_eq!(lines, vec!["Chapter 1", "Hello"]);
    }

    #[test]
    fn test_gbk_text_is_decoded() {
        let text = "第一章 风起\n\
                    夜色渐深，城中的灯火一盏一盏地熄灭了。他站在窗前，望着远处的山影，心中思绪万千。\n\
                    第二章 云涌\n\
                    第二天清晨，薄雾笼罩着整个小镇。街上行人稀少，只有卖早点的小贩在吆喝着。\n"
            .repeat(6);
        let (bytes, _, unmappable) = GBK.encode(&text);
        assert!(!unmappable);

        let (lines, encoding) = read_all(bytes.into_owned());
        assert_ne!(encoding, UTF_8);
        assert_eq!(lines.join("\n") + "\n", text);
    }

    #[test]
    fn test_invalid_utf8_after_window_is_replaced() {
        let mut bytes = "中文\n".repeat(PEEK_SIZE).into_bytes();
        bytes.extend_from_slice(&[b'x', 0xFF, b'y', b'\n']);
        let (lines, encoding) = read_all(bytes);
        assert_eq!(encoding, UTF_8);
        assert_eq!(lines.last().map(String::as_str), Some("x\u{FFFD}y"));
    }

    #[test]
    fn test_gbk_after_ascii_banner_is_decoded() {
        let banner: String = (0..30)
            .map(|i| format!("Downloaded from the text archive, line {i:02} of the banner\n"))
            .collect();
        assert!(banner.len() > PEEK_SIZE);

        let body = "第一章 风起\n\
                    夜色渐深，城中的灯火一盏一盏地熄灭了。他站在窗前，望着远处的山影，心中思绪万千。\n\
                    第二章 云涌\n\
                    第二天清晨，薄雾笼罩着整个小镇。街上行人稀少，只有卖早点的小贩在吆喝着。\n"
            .repeat(4);
        let (encoded, _, unmappable) = GBK.encode(&body);
        assert!(!unmappable);

        let mut bytes = banner.clone().into_bytes();
        bytes.extend_from_slice(&encoded);

        let (lines, encoding) = read_all(bytes);
        assert_ne!(encoding, UTF_8);
        assert_eq!(lines.join("\n") + "\n", banner + &body);
        assert!(lines.iter().all(|l| !l.contains('\u{FFFD}')));
    }

    #[test]
    fn test_utf8_after_ascii_window_stays_utf8() {
        let mut text = "ascii only\n".repeat(PEEK_SIZE / 8);
        text.push_str("第一章 风起\n正文。\n");

        let (lines, encoding) = read_all(text.clone().into_bytes());
        assert_eq!(encoding, UTF_8);
        assert_eq!(lines.join("\n") + "\n", text);
    }

    #[test]
    fn test_short_ascii_input_is_utf8() {
        let (lines, encoding) = read_all(b"Chapter 1\nHello".to_vec());
        assert_eq!(encoding, UTF_8);
        assert_eq!(lines, vec!["Chapter 1", "Hello"]);
    }

    #[test]
    fn test_open_missing_file() {
        let err = CanonicalReader::open(Path::new("/this/file/does/not/exist.txt")).unwrap_err();
        assert!(matches!(err, TxtbookError::InputOpen { .. }));
    }

    #[test]
    fn test_open_file() {
        use std::io::Write;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("book.txt");
        {
            let mut f = File::create(&path).unwrap();
            f.write_all("Chapter 1\nIt begins.\n".as_bytes()).unwrap();
        }
        let mut reader = CanonicalReader::open(&path).unwrap();
        assert_eq!(reader.next_line().unwrap().as_deref(), Some("Chapter 1"));
        assert_eq!(reader.next_line().unwrap().as_deref(), Some("It begins."));
        assert_eq!(reader.next_line().unwrap(), None);
        assert_eq!(reader.next_line().unwrap(), None);
    }
}
