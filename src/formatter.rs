//! Section formatter: truncation, markup escaping and line numbering.
//!
//! The order of operations is fixed: the text is cut to the line limit first,
//! the kept text is escaped as a whole, and only then is each line numbered.
//! Numbering never sees a half-escaped line and escaping never touches the
//! line-number gutter.

use crate::file::{CandidateFile, FileContent};

/// Line limit applied when nothing else is configured.
pub const DEFAULT_MAX_LINES: usize = 2000;

const NUMBER_WIDTH: usize = 4;
const SEPARATOR: &str = " | ";

/// One file's rendering-ready listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattedSection {
    /// 1-based position in the document
    pub index: usize,

    /// Relative path with `/` separators
    pub path: String,

    /// Numbered lines, followed by the truncation notice if any
    pub lines: Vec<String>,

    /// Encoding the content was decoded with
    pub encoding: &'static str,

    /// True if the content was decoded with replacement characters
    pub degraded: bool,

    /// Number of source lines dropped by truncation
    pub omitted_lines: usize,
}

impl FormattedSection {
    /// Returns true if the source exceeded the line limit.
    #[must_use]
    pub const fn is_truncated(&self) -> bool {
        self.omitted_lines > 0
    }

    /// Number of numbered content lines, excluding the truncation notice.
    #[must_use]
    pub const fn numbered_lines(&self) -> usize {
        if self.is_truncated() {
            self.lines.len() - 1
        } else {
            self.lines.len()
        }
    }

    /// The section as one newline-joined block.
    #[must_use]
    pub fn block(&self) -> String {
        self.lines.join("\n")
    }
}

/// Turns decoded file content into a [`FormattedSection`].
#[derive(Debug, Clone, Copy)]
pub struct SectionFormatter {
    max_lines: usize,
}

impl Default for SectionFormatter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LINES)
    }
}

impl SectionFormatter {
    /// Creates a formatter keeping at most `max_lines` lines per file.
    #[must_use]
    pub const fn new(max_lines: usize) -> Self {
        Self { max_lines }
    }

    /// Formats one file's content.
    #[must_use]
    pub fn format(
        &self,
        file: &CandidateFile,
        index: usize,
        content: FileContent,
    ) -> FormattedSection {
        let source_lines = split_lines(&content.text);
        let omitted_lines = source_lines.len().saturating_sub(self.max_lines);
        let kept = &source_lines[..source_lines.len() - omitted_lines];

        let escaped = escape_markup(&kept.join("\n"));
        let mut lines: Vec<String> = escaped
            .split('\n')
            .enumerate()
            .map(|(i, line)| number_line(i + 1, line))
            .collect();

        if omitted_lines > 0 {
            lines.push(truncation_notice(omitted_lines));
        }

        FormattedSection {
            index,
            path: file.display_path(),
            lines,
            encoding: content.encoding,
            degraded: content.degraded,
            omitted_lines,
        }
    }
}

/// Splits text into lines on `\n`.
///
/// A single trailing newline terminates the last line instead of opening an
/// empty one. Empty text is one empty line.
fn split_lines(text: &str) -> Vec<&str> {
    let body = text.strip_suffix('\n').unwrap_or(text);
    body.split('\n').collect()
}

/// Replaces `&`, `<` and `>` with entity references.
#[must_use]
pub fn escape_markup(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            other => out.push(other),
        }
    }
    out
}

fn number_line(number: usize, line: &str) -> String {
    let line = if line.is_empty() { " " } else { line };
    format!("{number:>NUMBER_WIDTH$}{SEPARATOR}{line}")
}

/// The synthetic line appended after a truncated listing.
#[must_use]
pub fn truncation_notice(omitted: usize) -> String {
    format!("... (truncated, {omitted} more line(s))")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn section_for(text: &str) -> FormattedSection {
        let file = CandidateFile::new("src/a.py", "/repo/src/a.py");
        SectionFormatter::default().format(&file, 1, FileContent::new(text, "utf-8"))
    }

    fn numbered(count: usize) -> String {
        (1..=count).map(|i| format!("line {i}\n")).collect()
    }

    #[test]
    fn test_numbering_format() {
        let section = section_for("first\nsecond");
        assert_eq!(section.lines, vec!["   1 | first", "   2 | second"]);
        assert_eq!(section.path, "src/a.py");
        assert_eq!(section.index, 1);
    }

    #[test]
    fn test_empty_file_is_single_space_line() {
        let section = section_for("");
        assert_eq!(section.lines, vec!["   1 |  "]);
        assert!(!section.is_truncated());
    }

    #[test]
    fn test_blank_lines_keep_separator() {
        let section = section_for("a\n\nb\n");
        assert_eq!(section.lines, vec!["   1 | a", "   2 |  ", "   3 | b"]);
    }

    #[test]
    fn test_trailing_newline_does_not_add_line() {
        assert_eq!(section_for("x\n").lines.len(), 1);
        assert_eq!(section_for("x\n\n").lines.len(), 2);
    }

    #[test]
    fn test_exactly_max_lines_not_truncated() {
        let section = section_for(&numbered(DEFAULT_MAX_LINES));
        assert_eq!(section.lines.len(), DEFAULT_MAX_LINES);
        assert!(!section.is_truncated());
        assert!(!section.block().contains("truncated"));
    }

    #[test]
    fn test_one_over_max_lines_truncated() {
        let section = section_for(&numbered(DEFAULT_MAX_LINES + 1));

        assert_eq!(section.omitted_lines, 1);
        assert_eq!(section.numbered_lines(), DEFAULT_MAX_LINES);
        assert_eq!(section.lines.len(), DEFAULT_MAX_LINES + 1);
        assert_eq!(section.lines.last().unwrap(), "... (truncated, 1 more line(s))");
        assert_eq!(section.lines[DEFAULT_MAX_LINES - 1], "2000 | line 2000");
        assert_eq!(section.block().matches("truncated").count(), 1);
    }

    #[test]
    fn test_custom_limit() {
        let file = CandidateFile::new("big.txt", "/repo/big.txt");
        let section =
            SectionFormatter::new(3).format(&file, 7, FileContent::new(numbered(10), "utf-8"));

        assert_eq!(section.index, 7);
        assert_eq!(section.omitted_lines, 7);
        assert_eq!(section.lines.len(), 4);
        assert!(section.lines[3].contains("7 more line(s)"));
    }

    #[test]
    fn test_escaping() {
        let section = section_for("<script>&</script>");
        let block = section.block();

        assert_eq!(section.lines, vec!["   1 | &lt;script&gt;&amp;&lt;/script&gt;"]);
        assert!(!block.contains('<'));
        assert!(!block.contains('>'));
        assert_eq!(block.matches('&').count(), block.matches("&amp;").count() + 4);
    }

    #[test]
    fn test_escape_does_not_double_escape() {
        assert_eq!(escape_markup("&lt;"), "&amp;lt;");
        assert_eq!(escape_markup("a && b"), "a &amp;&amp; b");
    }

    #[test]
    fn test_degraded_flag_carried() {
        let file = CandidateFile::new("blob.txt", "/repo/blob.txt");
        let section = SectionFormatter::default().format(
            &file,
            2,
            FileContent::degraded("\u{FFFD}\u{FFFD}", "utf-8 (with errors)"),
        );
        assert!(section.degraded);
        assert_eq!(section.encoding, "utf-8 (with errors)");
        assert!(!section.lines.is_empty());
    }

    #[test]
    fn test_formatting_is_deterministic() {
        let text = "fn a() {}\n\n<T>\n";
        assert_eq!(section_for(text), section_for(text));
    }
}
