//! Text cleanup shared by the transcript and outbound delivery.

/// Delimiter that legacy Telegram Markdown needs balanced.
const MARKDOWN_DELIMITER: char = '_';

/// How a piece of outbound text should be rendered by Telegram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Markup {
    Plain,
    Markdown,
}

/// Normalize text before it enters the transcript or leaves the model.
///
/// Strips a leading byte-order mark, folds CRLF/CR line endings to LF and
/// drops control characters other than newline and tab.
pub fn normalize(text: &str) -> String {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut result = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                result.push('\n');
            }
            '\n' | '\t' => result.push(c),
            c if c.is_control() => {}
            c => result.push(c),
        }
    }
    result
}

/// Check outbound Markdown and substitute a diagnostic if it would not render.
///
/// An odd number of `_` breaks Telegram's legacy Markdown parser, so such
/// text is replaced by a plain-text notice instead of being sent as is.
pub fn guard_markdown(text: &str) -> (String, Markup) {
    let delimiters = text.chars().filter(|&c| c == MARKDOWN_DELIMITER).count();
    if delimiters % 2 != 0 {
        let notice = format!("The string '{text}' is not valid markdown and was not sent.");
        (notice, Markup::Plain)
    } else {
        (text.to_string(), Markup::Markdown)
    }
}

/// Cut text to at most `max_chars` characters for log previews.
pub fn preview(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_passes_plain_text() {
        assert_eq!(normalize("hello"), "hello");
        assert_eq!(normalize("a\n\nb"), "a\n\nb");
        assert_eq!(normalize("Привіт 🔥"), "Привіт 🔥");
    }

    #[test]
    fn test_normalize_line_endings() {
        assert_eq!(normalize("one\r\ntwo\rthree"), "one\ntwo\nthree");
    }

    #[test]
    fn test_normalize_strips_bom_and_controls() {
        assert_eq!(normalize("\u{feff}prompt"), "prompt");
        assert_eq!(normalize("a\u{0}b\u{7}c\td"), "abc\td");
    }

    #[test]
    fn test_guard_even_underscores_pass() {
        let (text, markup) = guard_markdown("_italic_ text");
        assert_eq!(text, "_italic_ text");
        assert_eq!(markup, Markup::Markdown);
    }

    #[test]
    fn test_guard_odd_underscores_replaced() {
        let (text, markup) = guard_markdown("snake_case");
        assert_eq!(markup, Markup::Plain);
        assert_ne!(text, "snake_case");
        assert!(text.contains("not valid markdown"));
    }

    #[test]
    fn test_guard_no_underscores() {
        let (_, markup) = guard_markdown("plain");
        assert_eq!(markup, Markup::Markdown);
    }

    #[test]
    fn test_preview_is_char_safe() {
        assert_eq!(preview("ééééé", 3), "ééé");
        assert_eq!(preview("hi", 50), "hi");
    }
}
