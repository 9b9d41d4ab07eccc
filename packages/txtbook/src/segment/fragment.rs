//! Body fragments and their HTML rendering.

const PARAGRAPH_START: &str = r#"<p class="content">"#;
const PARAGRAPH_END: &str = "</p>";
const HEADING_START: &str = r#"<h3 class="title">"#;
const HEADING_END: &str = "</h3>";

/// Line endings that mark a separator or hand-made markup line.
const CONTINUATION_MARKERS: [&str; 4] = ["==", "**", "--", "//"];

/// One rendered unit of a section body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fragment {
    /// The section title, shown as a centred heading.
    Heading(String),
    /// An indented body paragraph.
    Paragraph(String),
    /// A separator line passed through without a wrapper.
    Raw(String),
}

/// Turn a content line into its fragment.
///
/// Lines ending in `==`, `**`, `--` or `//` are kept raw; everything else
/// becomes a paragraph.
///
/// # Examples
/// ```
/// use txtbook::segment::{render_content, Fragment};
///
/// assert_eq!(render_content("Hello."), Fragment::Paragraph("Hello.".into()));
/// assert_eq!(render_content("*****"), Fragment::Raw("*****".into()));
/// ```
#[must_use]
pub fn render_content(line: &str) -> Fragment {
    if CONTINUATION_MARKERS.iter().any(|m| line.ends_with(m)) {
        Fragment::Raw(line.to_string())
    } else {
        Fragment::Paragraph(line.to_string())
    }
}

impl Fragment {
    /// The unwrapped source text.
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::Heading(t) | Self::Paragraph(t) | Self::Raw(t) => t,
        }
    }

    #[must_use]
    pub fn is_heading(&self) -> bool {
        matches!(self, Self::Heading(_))
    }

    /// Append the XHTML form of this fragment to `out`.
    pub fn write_html(&self, out: &mut String) {
        match self {
            Self::Heading(t) => {
                out.push_str(HEADING_START);
                out.push_str(&html_escape::encode_text(t));
                out.push_str(HEADING_END);
            }
            Self::Paragraph(t) => {
                out.push_str(PARAGRAPH_START);
                out.push_str(&html_escape::encode_text(t));
                out.push_str(PARAGRAPH_END);
            }
            Self::Raw(t) => out.push_str(&html_escape::encode_text(t)),
        }
    }

    #[must_use]
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        self.write_html(&mut out);
        out
    }
}

/// Render a fragment sequence as an XHTML body, one fragment per line.
#[must_use]
pub fn render_body(fragments: &[Fragment]) -> String {
    let mut out = String::new();
    for (i, fragment) in fragments.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        fragment.write_html(&mut out);
    }
    out
}
