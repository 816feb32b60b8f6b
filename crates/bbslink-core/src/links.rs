//! Link detection inside styled spans.
//!
//! A link is `http://` or `https://` followed by non-whitespace. Link
//! sub-spans keep the color of the span they were found in.

use std::sync::LazyLock;

use regex::Regex;

use crate::ansi::{Color, StyledSpan};

#[allow(clippy::expect_used, reason = "constant pattern")]
static URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://\S+").expect("URL pattern is valid"));

/// A display span that may be a link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkSpan {
    /// Visible text
    pub text: String,
    /// Foreground color
    pub style: Color,
    /// Whether the text is a URL
    pub is_link: bool,
}

/// Split one styled span into link and non-link pieces. Never emits empty
/// pieces.
pub fn split_links(span: &StyledSpan) -> Vec<LinkSpan> {
    let mut out = Vec::new();
    let mut last = 0;
    for m in URL.find_iter(&span.text) {
        if m.start() > last {
            out.push(LinkSpan {
                text: span.text[last..m.start()].to_string(),
                style: span.style,
                is_link: false,
            });
        }
        out.push(LinkSpan { text: m.as_str().to_string(), style: span.style, is_link: true });
        last = m.end();
    }
    if last < span.text.len() {
        out.push(LinkSpan { text: span.text[last..].to_string(), style: span.style, is_link: false });
    }
    out
}

/// Split every span of a rendered line.
pub fn split_line(spans: &[StyledSpan]) -> Vec<LinkSpan> {
    spans.iter().flat_map(split_links).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_inside_text() {
        let span = StyledSpan::new("see https://example.org/x now", Color::Cyan);
        let parts = split_links(&span);
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0].text, "see ");
        assert!(!parts[0].is_link);
        assert_eq!(parts[1].text, "https://example.org/x");
        assert!(parts[1].is_link);
        assert_eq!(parts[1].style, Color::Cyan);
        assert_eq!(parts[2].text, " now");
    }

    #[test]
    fn text_without_links_is_one_piece() {
        let parts = split_links(&StyledSpan::new("no links here", Color::Normal));
        assert_eq!(parts.len(), 1);
        assert!(!parts[0].is_link);
    }

    #[test]
    fn whole_span_link() {
        let parts = split_links(&StyledSpan::new("http://a.b", Color::Red));
        assert_eq!(
            parts,
            vec![LinkSpan { text: "http://a.b".into(), style: Color::Red, is_link: true }]
        );
    }

    #[test]
    fn split_line_preserves_order() {
        let spans =
            vec![StyledSpan::new("a ", Color::Red), StyledSpan::new("http://x.y b", Color::Blue)];
        let texts: Vec<_> = split_line(&spans).into_iter().map(|s| s.text).collect();
        assert_eq!(texts, vec!["a ", "http://x.y", " b"]);
    }
}
