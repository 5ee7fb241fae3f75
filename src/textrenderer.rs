//! Renders markdown [`Event`]s into plain text. Structurally this mirrors the
//! HTML renderer in [`pulldown_cmark::html`], except that tags produce no
//! output of their own: only text survives, and block boundaries become
//! newlines. Text is written verbatim, not HTML-escaped; the template layer
//! escapes it with [`crate::value::text`] and the Atom writer escapes feed
//! content.

use pulldown_cmark::{CowStr, Event, Tag};

struct TextRenderer {
    /// Nesting depth of footnote definitions. Their text is dropped so that
    /// notes don't leak into the middle of a summary.
    skip_depth: usize,
}

impl<'a> TextRenderer {
    fn new() -> Self {
        TextRenderer { skip_depth: 0 }
    }

    fn on_event(&mut self, out: &mut String, event: Event<'a>) {
        match event {
            Event::Start(tag) => self.on_start(tag),
            Event::End(tag) => self.on_end(out, tag),
            Event::Text(text) | Event::Code(text) => self.on_text(out, text),
            Event::Html(_) => {}
            Event::FootnoteReference(_) => {}
            Event::SoftBreak | Event::HardBreak => self.on_text(out, CowStr::from("\n")),
            Event::Rule => self.end_block(out),
            Event::TaskListMarker(_) => {}
        }
    }

    fn on_start(&mut self, tag: Tag<'a>) {
        if let Tag::FootnoteDefinition(_) = tag {
            self.skip_depth += 1;
        }
    }

    fn on_end(&mut self, out: &mut String, tag: Tag<'a>) {
        match tag {
            Tag::FootnoteDefinition(_) => {
                self.skip_depth = self.skip_depth.saturating_sub(1);
            }
            Tag::Paragraph
            | Tag::Heading(_)
            | Tag::BlockQuote
            | Tag::CodeBlock(_)
            | Tag::List(_)
            | Tag::Item
            | Tag::TableHead
            | Tag::TableRow
            | Tag::Table(_) => self.end_block(out),
            Tag::TableCell => self.on_text(out, CowStr::from(" ")),
            Tag::Emphasis
            | Tag::Strong
            | Tag::Strikethrough
            | Tag::Link(_, _, _)
            | Tag::Image(_, _, _) => {}
        }
    }

    fn on_text(&mut self, out: &mut String, text: CowStr) {
        if self.skip_depth == 0 {
            out.push_str(&text);
        }
    }

    // Terminates the current block with a single newline. Nested blocks (a
    // paragraph inside a list item) end at the same point, so repeated calls
    // must not stack blank lines.
    fn end_block(&mut self, out: &mut String) {
        if self.skip_depth == 0 && !out.is_empty() && !out.ends_with('\n') {
            out.push('\n');
        }
    }
}

/// Converts [`Event`]s into plain text, appending to `out`.
pub fn push_text<'a, I>(out: &mut String, events: I)
where
    I: Iterator<Item = Event<'a>>,
{
    let mut renderer = TextRenderer::new();
    for event in events {
        renderer.on_event(out, event);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pulldown_cmark::{Options, Parser};

    fn render(markdown: &str, options: Options) -> String {
        let mut out = String::new();
        push_text(&mut out, Parser::new_ext(markdown, options));
        out
    }

    #[test]
    fn test_blocks_end_with_single_newline() {
        assert_eq!("a\nb\n", render("- a\n\n- b\n", Options::empty()));
    }

    #[test]
    fn test_footnote_definitions_dropped() {
        assert_eq!(
            "body\n",
            render("body[^1]\n\n[^1]: note\n", Options::ENABLE_FOOTNOTES)
        );
    }

    #[test]
    fn test_table_cells_separated() {
        let text = render("| a | b |\n|---|---|\n| 1 | 2 |\n", Options::ENABLE_TABLES);
        assert_eq!("a b \n1 2 \n", text);
    }

    #[test]
    fn test_image_alt_text_kept() {
        assert_eq!("see a cat\n", render("see ![a cat](cat.png)", Options::empty()));
    }
}
