//! Markup-aware paragraph splitting.
//!
//! A body field is cut into fragments at top-level block boundaries so that
//! content inserted between two fragments never lands inside an open element.
//! Element structure comes from `lol_html`: one rewriting pass marks candidate
//! cut points in a copy of the input, and a second pass turns the marks into
//! fragment lengths. Fragments are borrowed slices of the input and
//! concatenating them in order reproduces the input byte-for-byte.

use std::{cell::RefCell, ops::Range, rc::Rc};

use lol_html::errors::RewritingError;
use lol_html::html_content::{ContentType, EndTag};
use lol_html::{
    HandlerResult, RewriteStrSettings, doc_comments, doc_text, element, rewrite_str,
};
use tracing::warn;

const BLOCK_ELEMENTS: &[&str] = &[
    "address",
    "article",
    "aside",
    "audio",
    "blockquote",
    "details",
    "dialog",
    "div",
    "dl",
    "drupal-entity",
    "drupal-media",
    "fieldset",
    "figure",
    "footer",
    "form",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "header",
    "hgroup",
    "hr",
    "iframe",
    "main",
    "nav",
    "ol",
    "p",
    "pre",
    "section",
    "table",
    "ul",
    "video",
];

/// Markers written into the rewritten copy. They are Unicode noncharacters,
/// so they never appear in real content; input that does carry one is left as
/// a single fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    /// A fragment may end here.
    Cut,
    /// Top-level text, where blank lines also end a fragment.
    TextOpen,
    TextClose,
    /// Top-level comments, which attach to whatever follows them.
    QuietOpen,
    QuietClose,
}

impl Mark {
    const ALL: [Mark; 5] = [
        Mark::Cut,
        Mark::TextOpen,
        Mark::TextClose,
        Mark::QuietOpen,
        Mark::QuietClose,
    ];

    fn as_str(self) -> &'static str {
        match self {
            Mark::Cut => "\u{FDD0}",
            Mark::TextOpen => "\u{FDD1}",
            Mark::TextClose => "\u{FDD2}",
            Mark::QuietOpen => "\u{FDD3}",
            Mark::QuietClose => "\u{FDD4}",
        }
    }

    fn from_char(ch: char) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|mark| mark.as_str().starts_with(ch))
    }
}

/// Split `text` into paragraph fragments.
///
/// A fragment ends after the end tag of a top-level block element, around a
/// top-level void block element (`<hr>`), or at a blank line in bare
/// top-level text. An open `<p>` is closed by the next block element, and a
/// run of end tags with nothing else stays with the fragment before it.
/// Whitespace following a boundary stays with the fragment it follows.
/// Whitespace-only input produces a single fragment; empty input produces
/// none.
pub fn split_paragraphs(text: &str) -> Vec<&str> {
    if text.is_empty() {
        return Vec::new();
    }
    if text.chars().any(|ch| Mark::from_char(ch).is_some()) {
        warn!("Body contains reserved marker characters; kept as one fragment");
        return vec![text];
    }

    let marked = match mark_boundaries(text) {
        Ok(marked) => marked,
        Err(error) => {
            warn!(error = %error, "Body markup could not be scanned; kept as one fragment");
            return vec![text];
        }
    };

    let unmarked: String = marked
        .chars()
        .filter(|ch| Mark::from_char(*ch).is_none())
        .collect();
    if unmarked != text {
        warn!("Body was altered while scanning; kept as one fragment");
        return vec![text];
    }

    let mut ranges: Vec<Range<usize>> = Vec::new();
    let mut start = 0;
    for len in fragment_lengths(&marked) {
        let range = start..start + len;
        start = range.end;
        match ranges.last_mut() {
            Some(previous) if is_stray_close(&text[range.clone()]) => previous.end = range.end,
            _ => ranges.push(range),
        }
    }
    ranges.into_iter().map(|range| &text[range]).collect()
}

/// Elements that are currently open, innermost last.
#[derive(Default)]
struct OpenElements {
    stack: Vec<(u64, String)>,
    next_id: u64,
}

impl OpenElements {
    fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    fn top_is(&self, name: &str) -> bool {
        self.stack.last().is_some_and(|(_, open)| open == name)
    }

    fn pop(&mut self) {
        self.stack.pop();
    }

    fn push(&mut self, name: String) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.stack.push((id, name));
        id
    }

    /// Closes element `id` along with anything still open inside it. Returns
    /// true when that leaves nothing open. Elements already closed
    /// implicitly are ignored.
    fn close(&mut self, id: u64) -> bool {
        match self.stack.iter().rposition(|(open, _)| *open == id) {
            Some(index) => {
                self.stack.truncate(index);
                self.stack.is_empty()
            }
            None => false,
        }
    }
}

fn mark_boundaries(text: &str) -> Result<String, RewritingError> {
    let open = Rc::new(RefCell::new(OpenElements::default()));

    rewrite_str(
        text,
        RewriteStrSettings {
            element_content_handlers: vec![element!("*", {
                let open = Rc::clone(&open);
                move |el| {
                    let name = el.tag_name();
                    let block = is_block(&name);
                    let mut elements = open.borrow_mut();

                    // An open `<p>` is implicitly closed by the next block element.
                    if block && elements.top_is("p") {
                        elements.pop();
                    }
                    let top_level = elements.is_empty();
                    if block && top_level {
                        el.before(Mark::Cut.as_str(), ContentType::Html);
                    }

                    match el.end_tag_handlers() {
                        Some(handlers) => {
                            let id = elements.push(name);
                            let open = Rc::clone(&open);
                            handlers.push(Box::new(
                                move |end: &mut EndTag<'_>| -> HandlerResult {
                                    if open.borrow_mut().close(id) && block {
                                        end.after(Mark::Cut.as_str(), ContentType::Html);
                                    }
                                    Ok(())
                                },
                            ) as _);
                        }
                        None if block && top_level => {
                            el.after(Mark::Cut.as_str(), ContentType::Html);
                        }
                        None => {}
                    }
                    Ok(())
                }
            })],
            document_content_handlers: vec![
                doc_text!({
                    let open = Rc::clone(&open);
                    move |chunk| {
                        if open.borrow().is_empty() && !chunk.as_str().is_empty() {
                            chunk.before(Mark::TextOpen.as_str(), ContentType::Html);
                            chunk.after(Mark::TextClose.as_str(), ContentType::Html);
                        }
                        Ok(())
                    }
                }),
                doc_comments!({
                    let open = Rc::clone(&open);
                    move |comment| {
                        if open.borrow().is_empty() {
                            comment.before(Mark::QuietOpen.as_str(), ContentType::Html);
                            comment.after(Mark::QuietClose.as_str(), ContentType::Html);
                        }
                        Ok(())
                    }
                }),
            ],
            ..RewriteStrSettings::default()
        },
    )
}

/// Byte lengths of the fragments described by a marked copy of the input.
fn fragment_lengths(marked: &str) -> Vec<usize> {
    let mut lengths = Vec::new();
    let mut current = 0;
    let mut has_content = false;
    let mut pending_cut = false;
    let mut in_text = false;
    let mut quiet = false;

    for (index, ch) in marked.char_indices() {
        if let Some(mark) = Mark::from_char(ch) {
            match mark {
                Mark::Cut => pending_cut |= has_content,
                Mark::TextOpen => in_text = true,
                Mark::TextClose => in_text = false,
                Mark::QuietOpen => quiet = true,
                Mark::QuietClose => quiet = false,
            }
            continue;
        }

        if ch.is_ascii_whitespace() {
            if ch == '\n'
                && in_text
                && has_content
                && blank_line_follows(&marked[index + ch.len_utf8()..])
            {
                pending_cut = true;
            }
        } else {
            if pending_cut {
                lengths.push(current);
                current = 0;
                pending_cut = false;
                has_content = false;
            }
            has_content |= !quiet;
        }
        current += ch.len_utf8();
    }

    if current > 0 {
        lengths.push(current);
    }
    lengths
}

/// Whether `rest`, which follows a newline, starts with optional horizontal
/// whitespace and another newline. Text chunk boundaries are skipped.
fn blank_line_follows(rest: &str) -> bool {
    rest.chars()
        .find(|ch| {
            !matches!(ch, ' ' | '\t' | '\r')
                && !matches!(Mark::from_char(*ch), Some(Mark::TextOpen | Mark::TextClose))
        })
        .is_some_and(|ch| ch == '\n')
}

/// Whether `fragment` holds nothing but end tags, such as a `</p>` left over
/// after its paragraph was closed implicitly.
fn is_stray_close(fragment: &str) -> bool {
    let mut rest = fragment.trim_start();
    if rest.is_empty() {
        return false;
    }
    while !rest.is_empty() {
        let Some(tail) = rest.strip_prefix("</") else {
            return false;
        };
        let Some(end) = tail.find('>') else {
            return false;
        };
        rest = tail[end + 1..].trim_start();
    }
    true
}

fn is_block(name: &str) -> bool {
    BLOCK_ELEMENTS.contains(&name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_top_level_paragraphs() {
        let text = "<p>One</p>\n<p>Two</p>\n<p>Three</p>\n";
        assert_eq!(
            split_paragraphs(text),
            vec!["<p>One</p>\n", "<p>Two</p>\n", "<p>Three</p>\n"]
        );
    }

    #[test]
    fn concatenation_reproduces_input() {
        let text = "Intro line\n\n<h2 class=\"x\">Heading</h2><p>a <em>b</em></p>\r\n\r\n<ul><li>x</li></ul>  tail";
        let fragments = split_paragraphs(text);
        assert_eq!(fragments.concat(), text);
        assert_eq!(fragments.len(), 5);
        assert_eq!(fragments[4], "tail");
    }

    #[test]
    fn nested_blocks_do_not_split() {
        let text = "<div><p>a</p><p>b</p></div><p>c</p>";
        assert_eq!(split_paragraphs(text), vec!["<div><p>a</p><p>b</p></div>", "<p>c</p>"]);
    }

    #[test]
    fn blank_lines_split_bare_text() {
        let text = "first\n\nsecond\n \nthird";
        assert_eq!(split_paragraphs(text), vec!["first\n\n", "second\n \n", "third"]);
    }

    #[test]
    fn single_newline_does_not_split_bare_text() {
        assert_eq!(split_paragraphs("one\ntwo"), vec!["one\ntwo"]);
    }

    #[test]
    fn blank_lines_inside_blocks_are_ignored() {
        let text = "<blockquote>\n\nquoted\n\n</blockquote>\n\n<p>after</p>";
        assert_eq!(
            split_paragraphs(text),
            vec!["<blockquote>\n\nquoted\n\n</blockquote>\n\n", "<p>after</p>"]
        );
    }

    #[test]
    fn attribute_values_with_angle_brackets_are_skipped() {
        let text = "<p title=\"a > b\">x</p><p data-x='</p>'>y</p>";
        assert_eq!(
            split_paragraphs(text),
            vec!["<p title=\"a > b\">x</p>", "<p data-x='</p>'>y</p>"]
        );
    }

    #[test]
    fn horizontal_rule_is_its_own_fragment() {
        let text = "<p>a</p><hr />\n<p>b</p>";
        assert_eq!(split_paragraphs(text), vec!["<p>a</p>", "<hr />\n", "<p>b</p>"]);
    }

    #[test]
    fn unclosed_paragraph_closed_by_next_block() {
        let text = "<p>a<p>b</p>";
        assert_eq!(split_paragraphs(text), vec!["<p>a", "<p>b</p>"]);
    }

    #[test]
    fn bare_text_before_block_is_separate() {
        assert_eq!(
            split_paragraphs("lead <strong>in</strong><p>body</p>"),
            vec!["lead <strong>in</strong>", "<p>body</p>"]
        );
    }

    #[test]
    fn comments_and_scripts_do_not_split() {
        let text = "<!-- <p>x</p> --><p>a</p><script>if (a < b) { w('</p>\\n\\n'); }</script><p>b</p>";
        let fragments = split_paragraphs(text);
        assert_eq!(fragments.concat(), text);
        assert_eq!(
            fragments,
            vec![
                "<!-- <p>x</p> --><p>a</p>",
                "<script>if (a < b) { w('</p>\\n\\n'); }</script>",
                "<p>b</p>",
            ]
        );
    }

    #[test]
    fn uppercase_tags_are_recognised() {
        assert_eq!(split_paragraphs("<P>a</P><DIV>b</DIV>"), vec!["<P>a</P>", "<DIV>b</DIV>"]);
    }

    #[test]
    fn leading_whitespace_stays_with_first_fragment() {
        assert_eq!(
            split_paragraphs("\n\n  <p>a</p>\n\n"),
            vec!["\n\n  <p>a</p>\n\n"]
        );
    }

    #[test]
    fn empty_and_blank_inputs() {
        assert!(split_paragraphs("").is_empty());
        assert_eq!(split_paragraphs("  \n "), vec!["  \n "]);
    }

    #[test]
    fn stray_angle_bracket_is_text() {
        let text = "a < b\n\n<p>c</p> tail";
        assert_eq!(split_paragraphs(text), vec!["a < b\n\n", "<p>c</p> ", "tail"]);
    }

    #[test]
    fn self_closing_slash_does_not_close_a_div() {
        let text = "<div/><p>a</p><p>b</p></div><p>c</p>";
        assert_eq!(
            split_paragraphs(text),
            vec!["<div/><p>a</p><p>b</p></div>", "<p>c</p>"]
        );
    }

    #[test]
    fn end_tag_of_implicitly_closed_paragraph_is_not_a_fragment() {
        let text = "<p>a<ul><li>x</li></ul></p><p>b</p>";
        assert_eq!(
            split_paragraphs(text),
            vec!["<p>a", "<ul><li>x</li></ul></p>", "<p>b</p>"]
        );
    }

    #[test]
    fn reserved_marker_characters_keep_body_whole() {
        let text = "<p>a</p>\u{FDD0}<p>b</p>";
        assert_eq!(split_paragraphs(text), vec![text]);
    }

    #[test]
    fn end_tag_runs_are_recognised() {
        assert!(is_stray_close("</p>"));
        assert!(is_stray_close(" </em>\n</p> "));
        assert!(!is_stray_close("</p><p>b</p>"));
        assert!(!is_stray_close("  "));
    }

    #[test]
    fn multibyte_text_is_sliced_on_char_boundaries() {
        let text = "<p>基线</p>\n<p>对齐 ok</p>";
        assert_eq!(split_paragraphs(text), vec!["<p>基线</p>\n", "<p>对齐 ok</p>"]);
    }
}
