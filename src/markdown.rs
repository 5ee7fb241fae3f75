//! Converts stored Markdown into HTML for page bodies and into plain text for
//! summaries, meta descriptions, and feed content. Both conversions are pure.

use crate::textrenderer::push_text;
use pulldown_cmark::{html, Options, Parser};

/// The number of characters kept by [`meta_description`].
pub const META_DESCRIPTION_LENGTH: usize = 160;

// Only CommonMark is enabled. Fenced code blocks are part of CommonMark, so
// ```` ```rust ```` renders as `<pre><code class="language-rust">`.
fn options() -> Options {
    Options::empty()
}

/// Converts markdown to HTML.
pub fn to_html(markdown: &str) -> String {
    let mut out = String::with_capacity(markdown.len() + markdown.len() / 2);
    html::push_html(&mut out, Parser::new_ext(markdown, options()));
    out
}

/// Converts markdown to plain prose. All markup is dropped; text and code are
/// kept verbatim and block elements end with a newline.
pub fn to_plain_text(markdown: &str) -> String {
    let mut out = String::with_capacity(markdown.len());
    push_text(&mut out, Parser::new_ext(markdown, options()));
    out.trim().to_owned()
}

/// Returns at most the first `max_chars` characters of `text`. The cut always
/// lands on a character boundary.
pub fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((i, _)) => &text[..i],
        None => text,
    }
}

/// The plain text of `markdown`, truncated to [`META_DESCRIPTION_LENGTH`]
/// characters.
pub fn meta_description(markdown: &str) -> String {
    truncate(&to_plain_text(markdown), META_DESCRIPTION_LENGTH).to_owned()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_fenced_code_with_language() {
        let html = to_html("```rust\nfn main() {}\n```\n");
        assert!(
            html.contains(r#"<pre><code class="language-rust">fn main() {}"#),
            "unexpected html: {}",
            html
        );
    }

    #[test]
    fn test_fenced_code_without_language() {
        let html = to_html("```\nplain\n```\n");
        assert!(html.contains("<pre><code>plain"), "unexpected html: {}", html);
    }

    #[test]
    fn test_html_paragraphs_and_emphasis() {
        assert_eq!(
            "<h1>Hi</h1>\n<p>some <em>text</em></p>\n",
            to_html("# Hi\n\nsome *text*")
        );
    }

    #[test]
    fn test_plain_text_strips_markup() {
        assert_eq!(
            "Title\nSome bold and a link.\nlast",
            to_plain_text("# Title\n\nSome **bold** and [a link](https://example.org).\n\n_last_")
        );
    }

    #[test]
    fn test_plain_text_keeps_code_and_drops_html() {
        assert_eq!(
            "use x;\nkeep this",
            to_plain_text("```rust\nuse x;\n```\n\n<div>\n\nkeep <span>this</span>\n\n</div>")
        );
    }

    #[test]
    fn test_plain_text_does_not_escape() {
        assert_eq!("a < b & c", to_plain_text("a < b & c"));
    }

    #[test]
    fn test_plain_text_lists() {
        assert_eq!("one\ntwo", to_plain_text("- one\n- two\n"));
    }

    #[test]
    fn test_truncate_multibyte() {
        let text = "é".repeat(200);
        let truncated = truncate(&text, META_DESCRIPTION_LENGTH);
        assert_eq!(META_DESCRIPTION_LENGTH, truncated.chars().count());
        assert!(truncated.chars().all(|c| c == 'é'));
    }

    #[test]
    fn test_meta_description_length() {
        let markdown = format!("# Heading\n\n{}", "ünïcödé ".repeat(40));
        let description = meta_description(&markdown);
        assert_eq!(META_DESCRIPTION_LENGTH, description.chars().count());
        assert!(description.starts_with("Heading\nünïcödé"));
    }

    #[test]
    fn test_meta_description_short_content_unchanged() {
        assert_eq!("short", meta_description("*short*"));
    }
}
