//! Document assembler: turns the ordered file list into a linear element stream.
//!
//! Layout of the stream:
//!
//! 1. title block and run metadata
//! 2. table of contents, then a page break
//! 3. one section per file in table-of-contents order, each followed by a page break
//!
//! A file whose section cannot be produced is replaced by an error notice at
//! the same position, so the table of contents and the sections always
//! agree on numbering.

use crate::{
    error::{Error, Result},
    file::CandidateFile,
    formatter::FormattedSection,
};
use serde::Serialize;
use std::path::Path;
use tracing::{debug, warn};

/// Heading printed at the top of the document.
pub const DOCUMENT_TITLE: &str = "SOURCE CODE LISTING";

/// Heading of the table of contents.
pub const TOC_HEADING: &str = "TABLE OF CONTENTS";

/// One node of the assembled document.
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentElement {
    /// Document title
    Title(String),
    /// A `label: value` metadata line
    Meta {
        /// Label, printed bold
        label: String,
        /// Value
        value: String,
    },
    /// A plain heading
    Heading(String),
    /// A table-of-contents line
    TocEntry {
        /// 1-based sequence index
        index: usize,
        /// Relative path
        path: String,
    },
    /// The header of a file section
    SectionHeader {
        /// 1-based sequence index, equal to the matching TOC entry
        index: usize,
        /// Relative path
        path: String,
        /// Encoding used to decode the file
        encoding: String,
        /// True if the content was decoded with replacement characters
        degraded: bool,
    },
    /// A monospace block printed line by line
    Preformatted(Vec<String>),
    /// Visible replacement for a section that failed
    ErrorNotice {
        /// 1-based sequence index of the failed file
        index: usize,
        /// Relative path
        path: String,
        /// What went wrong
        message: String,
    },
    /// A horizontal separator
    Rule,
    /// Vertical space in points
    Spacer(f32),
    /// Start a new page
    PageBreak,
}

impl DocumentElement {
    /// Text of a title, heading or header, as it is printed.
    #[must_use]
    pub fn heading_text(&self) -> Option<String> {
        match self {
            Self::Title(text) | Self::Heading(text) => Some(text.clone()),
            Self::TocEntry { index, path } => Some(format!("{index:>4}. {path}")),
            Self::SectionHeader { index, path, .. } => Some(format!("[{index}] {path}")),
            _ => None,
        }
    }
}

/// Metadata printed under the title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentMetadata {
    /// Repository name, usually the root directory name
    pub repository: String,
    /// Generation timestamp, already formatted
    pub generated_at: String,
}

impl DocumentMetadata {
    /// Metadata stamped with the current local time.
    #[must_use]
    pub fn now(repository: impl Into<String>) -> Self {
        Self {
            repository: repository.into(),
            generated_at: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }

    /// Repository name for a root directory.
    #[must_use]
    pub fn repository_name(root: &Path) -> String {
        root.file_name().map_or_else(
            || root.display().to_string(),
            |name| name.to_string_lossy().into_owned(),
        )
    }
}

/// Counts collected while assembling.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AssemblyStats {
    /// Files declared in the table of contents
    pub total: usize,
    /// Sections formatted successfully
    pub formatted: usize,
    /// Sections decoded with replacement characters
    pub degraded: usize,
    /// Sections cut at the line limit
    pub truncated: usize,
    /// Sections replaced by an error notice
    pub failed: usize,
}

/// The assembled element stream.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Elements in output order
    pub elements: Vec<DocumentElement>,
    /// Counts collected while assembling
    pub stats: AssemblyStats,
}

impl Document {
    /// Indices listed in the table of contents, in order.
    #[must_use]
    pub fn toc_indices(&self) -> Vec<usize> {
        self.elements
            .iter()
            .filter_map(|e| match e {
                DocumentElement::TocEntry { index, .. } => Some(*index),
                _ => None,
            })
            .collect()
    }

    /// Indices of sections and error notices, in order.
    #[must_use]
    pub fn section_indices(&self) -> Vec<usize> {
        self.elements
            .iter()
            .filter_map(|e| match e {
                DocumentElement::SectionHeader { index, .. }
                | DocumentElement::ErrorNotice { index, .. } => Some(*index),
                _ => None,
            })
            .collect()
    }
}

/// Receives progress after each file has been processed.
pub trait ProgressObserver {
    /// Called once per file with its 1-based index, the total and its path.
    fn on_file(&mut self, current: usize, total: usize, path: &Path);
}

impl<F> ProgressObserver for F
where
    F: FnMut(usize, usize, &Path),
{
    fn on_file(&mut self, current: usize, total: usize, path: &Path) {
        self(current, total, path);
    }
}

/// Observer that ignores all progress.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressObserver for NoProgress {
    fn on_file(&mut self, _current: usize, _total: usize, _path: &Path) {}
}

/// Builds a [`Document`] from an ordered file list.
#[derive(Debug, Clone)]
pub struct Assembler {
    metadata: DocumentMetadata,
}

impl Assembler {
    /// Creates an assembler with the given metadata.
    #[must_use]
    pub const fn new(metadata: DocumentMetadata) -> Self {
        Self { metadata }
    }

    /// Assembles the document.
    ///
    /// `produce` is called once per file, in order, with the file and its
    /// 1-based index. An `Err` from it becomes an error notice in place of the
    /// section; it never stops assembly.
    pub fn assemble<F>(
        &self,
        files: &[CandidateFile],
        mut produce: F,
        observer: &mut dyn ProgressObserver,
    ) -> Document
    where
        F: FnMut(&CandidateFile, usize) -> Result<FormattedSection>,
    {
        let total = files.len();
        let mut stats = AssemblyStats {
            total,
            ..AssemblyStats::default()
        };
        let mut elements = self.front_matter(files);

        for (offset, file) in files.iter().enumerate() {
            let index = offset + 1;

            match produce(file, index) {
                Ok(section) => {
                    stats.formatted += 1;
                    if section.degraded {
                        stats.degraded += 1;
                    }
                    if section.is_truncated() {
                        stats.truncated += 1;
                    }
                    push_section(&mut elements, section);
                }
                Err(e) => {
                    let error = Error::section(&file.relative_path, &e);
                    warn!(
                        index,
                        path = %file.relative_path.display(),
                        error = %error,
                        "Section replaced by error notice"
                    );
                    stats.failed += 1;
                    elements.push(DocumentElement::ErrorNotice {
                        index,
                        path: file.display_path(),
                        message: error.to_string(),
                    });
                    elements.push(DocumentElement::PageBreak);
                }
            }

            observer.on_file(index, total, &file.absolute_path);
        }

        debug!(
            total = stats.total,
            failed = stats.failed,
            degraded = stats.degraded,
            elements = elements.len(),
            "Assembled document"
        );

        Document { elements, stats }
    }

    fn front_matter(&self, files: &[CandidateFile]) -> Vec<DocumentElement> {
        let mut elements = vec![
            DocumentElement::Title(DOCUMENT_TITLE.to_string()),
            DocumentElement::Spacer(10.0),
            meta("Repository", &self.metadata.repository),
            meta("Generated", &self.metadata.generated_at),
            meta("Total Files", &files.len().to_string()),
            DocumentElement::Spacer(20.0),
            DocumentElement::Rule,
            DocumentElement::Heading(TOC_HEADING.to_string()),
            DocumentElement::Rule,
            DocumentElement::Spacer(10.0),
        ];

        elements.extend(
            files
                .iter()
                .enumerate()
                .map(|(offset, file)| DocumentElement::TocEntry {
                    index: offset + 1,
                    path: file.display_path(),
                }),
        );
        elements.push(DocumentElement::PageBreak);
        elements
    }
}

fn meta(label: &str, value: &str) -> DocumentElement {
    DocumentElement::Meta {
        label: label.to_string(),
        value: value.to_string(),
    }
}

fn push_section(elements: &mut Vec<DocumentElement>, section: FormattedSection) {
    elements.push(DocumentElement::Rule);
    elements.push(DocumentElement::SectionHeader {
        index: section.index,
        path: section.path,
        encoding: section.encoding.to_string(),
        degraded: section.degraded,
    });
    elements.push(DocumentElement::Rule);
    elements.push(DocumentElement::Spacer(5.0));
    elements.push(DocumentElement::Preformatted(section.lines));
    elements.push(DocumentElement::Spacer(10.0));
    elements.push(DocumentElement::PageBreak);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::FileContent;
    use crate::formatter::SectionFormatter;

    fn files(names: &[&str]) -> Vec<CandidateFile> {
        names
            .iter()
            .map(|n| CandidateFile::new(*n, format!("/repo/{n}")))
            .collect()
    }

    fn metadata() -> DocumentMetadata {
        DocumentMetadata {
            repository: "repo".to_string(),
            generated_at: "2024-01-01 00:00:00".to_string(),
        }
    }

    fn ok_section(file: &CandidateFile, index: usize) -> Result<FormattedSection> {
        Ok(SectionFormatter::default().format(file, index, FileContent::new("x = 1\n", "utf-8")))
    }

    #[test]
    fn test_toc_and_sections_agree() {
        let files = files(&["a.py", "b/c.md", "d.rs"]);
        let doc = Assembler::new(metadata()).assemble(&files, ok_section, &mut NoProgress);

        assert_eq!(doc.toc_indices(), vec![1, 2, 3]);
        assert_eq!(doc.section_indices(), vec![1, 2, 3]);
        assert_eq!(doc.stats.total, 3);
        assert!(doc.elements.contains(&DocumentElement::Meta {
            label: "Total Files".to_string(),
            value: "3".to_string(),
        }));
    }

    #[test]
    fn test_page_breaks_after_toc_and_each_section() {
        let files = files(&["a.py", "b.py"]);
        let doc = Assembler::new(metadata()).assemble(&files, ok_section, &mut NoProgress);

        let breaks = doc
            .elements
            .iter()
            .filter(|e| matches!(e, DocumentElement::PageBreak))
            .count();
        assert_eq!(breaks, 3);
        assert_eq!(doc.elements.last(), Some(&DocumentElement::PageBreak));
        assert_eq!(doc.elements.first(), Some(&DocumentElement::Title(DOCUMENT_TITLE.to_string())));
    }

    #[test]
    fn test_one_failure_among_five_is_isolated() {
        let files = files(&["1.rs", "2.rs", "3.rs", "4.rs", "5.rs"]);
        let produce = |file: &CandidateFile, index: usize| {
            if index == 3 {
                Err(Error::config("formatter exploded"))
            } else {
                ok_section(file, index)
            }
        };
        let doc = Assembler::new(metadata()).assemble(&files, produce, &mut NoProgress);

        assert_eq!(doc.toc_indices(), vec![1, 2, 3, 4, 5]);
        assert_eq!(doc.section_indices(), vec![1, 2, 3, 4, 5]);
        assert_eq!(doc.stats.formatted, 4);
        assert_eq!(doc.stats.failed, 1);

        let headers = doc
            .elements
            .iter()
            .filter(|e| matches!(e, DocumentElement::SectionHeader { .. }))
            .count();
        assert_eq!(headers, 4);

        let notice = doc
            .elements
            .iter()
            .find_map(|e| match e {
                DocumentElement::ErrorNotice {
                    index,
                    path,
                    message,
                } => Some((*index, path.clone(), message.clone())),
                _ => None,
            })
            .unwrap();
        assert_eq!(notice.0, 3);
        assert_eq!(notice.1, "3.rs");
        assert!(notice.2.contains("formatter exploded"));
    }

    #[test]
    fn test_progress_called_once_per_file_in_order() {
        let files = files(&["a.py", "b.py", "c.py"]);
        let mut seen = Vec::new();
        let mut observer = |current: usize, total: usize, path: &Path| {
            seen.push((current, total, path.to_path_buf()));
        };

        Assembler::new(metadata()).assemble(&files, ok_section, &mut observer);

        assert_eq!(seen.len(), 3);
        assert_eq!(seen[0], (1, 3, "/repo/a.py".into()));
        assert_eq!(seen[2].0, 3);
    }

    #[test]
    fn test_degraded_and_truncated_counts() {
        let files = files(&["a.txt", "b.txt"]);
        let produce = |file: &CandidateFile, index: usize| {
            let content = if index == 1 {
                FileContent::degraded("\u{FFFD}", "utf-8 (with errors)")
            } else {
                FileContent::new("1\n2\n3\n", "utf-8")
            };
            Ok(SectionFormatter::new(2).format(file, index, content))
        };
        let doc = Assembler::new(metadata()).assemble(&files, produce, &mut NoProgress);

        assert_eq!(doc.stats.degraded, 1);
        assert_eq!(doc.stats.truncated, 1);
    }

    #[test]
    fn test_heading_text() {
        let entry = DocumentElement::TocEntry { index: 12, path: "src/lib.rs".to_string() };
        let header = DocumentElement::SectionHeader {
            index: 12,
            path: "src/lib.rs".to_string(),
            encoding: "utf-8".to_string(),
            degraded: false,
        };
        assert_eq!(entry.heading_text().unwrap(), "  12. src/lib.rs");
        assert_eq!(header.heading_text().unwrap(), "[12] src/lib.rs");
        assert_eq!(DocumentElement::PageBreak.heading_text(), None);
    }

    #[test]
    fn test_repository_name() {
        assert_eq!(DocumentMetadata::repository_name(Path::new("/home/me/project")), "project");
    }
}
