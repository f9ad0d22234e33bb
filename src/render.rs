//! Renderers: serialize an assembled [`Document`] to an output file.
//!
//! Page breaks in the element stream are honoured literally. The only breaks a
//! renderer adds on its own are continuation pages for content that does not
//! fit on one page. A break on a page that has no content yet is ignored, so
//! the trailing break after the last section never produces a blank page.

use crate::{
    config::{Config, OutputFormat, PageLayout},
    document::{Document, DocumentElement},
    error::{Error, Result},
};
use printpdf::{BuiltinFont, Mm, Op, PdfDocument, PdfPage, PdfSaveOptions, Point, Pt, TextItem};
use serde::Serialize;
use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};
use tracing::{debug, info};

const MM_TO_PT: f32 = 72.0 / 25.4;
const TAB_WIDTH: usize = 4;
const TEXT_RULE_WIDTH: usize = 70;
const DEGRADED_NOTE: &str = "(decoded with replacement characters)";

/// What a renderer produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderReport {
    /// Path of the written document
    pub output_path: PathBuf,
    /// Final size in bytes
    pub bytes: u64,
    /// Number of pages
    pub pages: usize,
}

impl RenderReport {
    /// Size as `x.x KB`, or `x.x MB` above one mebibyte.
    #[must_use]
    pub fn human_size(&self) -> String {
        human_size(self.bytes)
    }
}

/// Formats a byte count as `x.x KB` or `x.x MB`.
#[must_use]
pub fn human_size(bytes: u64) -> String {
    const MIB: u64 = 1024 * 1024;

    #[allow(clippy::cast_precision_loss)]
    let value = bytes as f64;
    if bytes > MIB {
        format!("{:.1} MB", value / MIB as f64)
    } else {
        format!("{:.1} KB", value / 1024.0)
    }
}

/// Serializes a document to a file.
pub trait Renderer {
    /// Writes `document` to `output` and reports the result.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Render`] if the document cannot be serialized or written.
    fn render(&self, document: &Document, output: &Path) -> Result<RenderReport>;
}

/// Picks the renderer for the configured output format.
#[must_use]
pub fn renderer_for(config: &Config) -> Box<dyn Renderer> {
    match config.format {
        OutputFormat::Pdf => Box::new(PdfRenderer::new(config.layout)),
        OutputFormat::Text => Box::new(TextRenderer::new()),
    }
}

/// One-line text of an element, as both renderers print it.
fn line_text(element: &DocumentElement) -> Option<String> {
    match element {
        DocumentElement::Meta { label, value } => Some(format!("{label}: {value}")),
        DocumentElement::SectionHeader {
            degraded: true, ..
        } => element
            .heading_text()
            .map(|text| format!("{text} {DEGRADED_NOTE}")),
        DocumentElement::ErrorNotice { message, .. } => Some(message.clone()),
        other => other.heading_text(),
    }
}

// ============================================================================
// PDF
// ============================================================================

#[derive(Debug, Clone)]
struct TextStyle {
    font: BuiltinFont,
    size: f32,
    leading: f32,
    indent: f32,
    /// Average glyph advance as a fraction of the font size
    advance: f32,
}

const TITLE: TextStyle = TextStyle {
    font: BuiltinFont::HelveticaBold,
    size: 18.0,
    leading: 22.0,
    indent: 0.0,
    advance: 0.6,
};
const HEADING: TextStyle = TextStyle {
    font: BuiltinFont::HelveticaBold,
    size: 10.0,
    leading: 14.0,
    indent: 0.0,
    advance: 0.6,
};
const BODY: TextStyle = TextStyle {
    font: BuiltinFont::Helvetica,
    size: 10.0,
    leading: 12.0,
    indent: 0.0,
    advance: 0.55,
};
const TOC: TextStyle = TextStyle {
    font: BuiltinFont::Courier,
    size: 8.0,
    leading: 11.0,
    indent: 0.0,
    advance: 0.6,
};
const RULE: TextStyle = TextStyle {
    font: BuiltinFont::Courier,
    size: 8.0,
    leading: 10.0,
    indent: 0.0,
    advance: 0.6,
};
const CODE: TextStyle = TextStyle {
    font: BuiltinFont::Courier,
    size: 7.0,
    leading: 9.0,
    indent: 5.0,
    advance: 0.6,
};

impl TextStyle {
    /// How many glyphs fit on one line of `width` points.
    fn columns(&self, width: f32) -> usize {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let columns = ((width - self.indent) / (self.size * self.advance)).floor() as usize;
        columns.max(1)
    }
}

/// Renders documents to PDF using the built-in Helvetica and Courier fonts.
#[derive(Debug, Clone)]
pub struct PdfRenderer {
    layout: PageLayout,
    title: String,
}

impl PdfRenderer {
    /// Creates a PDF renderer for the given page layout.
    #[must_use]
    pub fn new(layout: PageLayout) -> Self {
        Self {
            layout,
            title: crate::document::DOCUMENT_TITLE.to_string(),
        }
    }

    /// Lays the document out into pages.
    fn paginate(&self, document: &Document) -> Vec<PdfPage> {
        let mut pages = PageCursor::new(self.layout);

        for element in &document.elements {
            match element {
                DocumentElement::Title(text) => pages.write_centered(text, &TITLE),
                DocumentElement::Heading(_) | DocumentElement::SectionHeader { .. } => {
                    if let Some(text) = line_text(element) {
                        pages.write_wrapped(&text, &HEADING);
                    }
                }
                DocumentElement::Meta { .. } | DocumentElement::ErrorNotice { .. } => {
                    if let Some(text) = line_text(element) {
                        pages.write_wrapped(&text, &BODY);
                    }
                }
                DocumentElement::TocEntry { .. } => {
                    if let Some(text) = line_text(element) {
                        pages.write_wrapped(&text, &TOC);
                    }
                }
                DocumentElement::Preformatted(lines) => {
                    for line in lines {
                        pages.write_wrapped(line, &CODE);
                    }
                }
                DocumentElement::Rule => {
                    let rule = "-".repeat(RULE.columns(pages.usable_width));
                    pages.write_line(rule, &RULE);
                }
                DocumentElement::Spacer(points) => pages.skip(*points),
                DocumentElement::PageBreak => pages.break_page(),
            }
        }

        pages.finish()
    }
}

impl Renderer for PdfRenderer {
    fn render(&self, document: &Document, output: &Path) -> Result<RenderReport> {
        let pages = self.paginate(document);
        let page_count = pages.len();

        let mut warnings = Vec::new();
        let bytes = PdfDocument::new(&self.title)
            .with_pages(pages)
            .save(&PdfSaveOptions::default(), &mut warnings);

        debug!(pages = page_count, warnings = warnings.len(), "Serialized PDF");

        let size = write_atomic(output, &bytes)?;
        info!(path = %output.display(), bytes = size, pages = page_count, "Wrote PDF");

        Ok(RenderReport {
            output_path: output.to_path_buf(),
            bytes: size,
            pages: page_count,
        })
    }
}

/// Tracks the write position while filling pages top to bottom.
struct PageCursor {
    width_mm: f32,
    height_mm: f32,
    page_height: f32,
    top: f32,
    left: f32,
    usable_width: f32,
    usable_height: f32,
    /// Distance from the top of the content area to the next line
    y: f32,
    ops: Vec<Op>,
    has_content: bool,
    pages: Vec<PdfPage>,
}

impl PageCursor {
    fn new(layout: PageLayout) -> Self {
        let (width_mm, height_mm) = layout.size.dimensions_mm();
        Self {
            width_mm,
            height_mm,
            page_height: height_mm * MM_TO_PT,
            top: layout.margins.top * MM_TO_PT,
            left: layout.margins.left * MM_TO_PT,
            usable_width: layout.usable_width_mm() * MM_TO_PT,
            usable_height: layout.usable_height_mm() * MM_TO_PT,
            y: 0.0,
            ops: Vec::new(),
            has_content: false,
            pages: Vec::new(),
        }
    }

    fn write_wrapped(&mut self, text: &str, style: &TextStyle) {
        let columns = style.columns(self.usable_width);
        for piece in wrap(&pdf_safe(text), columns) {
            self.write_line(piece, style);
        }
    }

    fn write_centered(&mut self, text: &str, style: &TextStyle) {
        let text = pdf_safe(text);
        #[allow(clippy::cast_precision_loss)]
        let width = text.chars().count() as f32 * style.size * style.advance;
        let offset = ((self.usable_width - width) / 2.0).max(0.0);
        self.place(text, style, offset);
    }

    fn write_line(&mut self, text: String, style: &TextStyle) {
        self.place(text, style, style.indent);
    }

    fn place(&mut self, text: String, style: &TextStyle, offset: f32) {
        if self.has_content && self.y + style.leading > self.usable_height {
            self.break_page();
        }

        let baseline = self.page_height - self.top - self.y - style.size;
        self.ops.push(Op::StartTextSection);
        self.ops.push(Op::SetTextCursor {
            pos: Point {
                x: Pt(self.left + offset),
                y: Pt(baseline),
            },
        });
        self.ops.push(Op::SetFontSizeBuiltinFont {
            size: Pt(style.size),
            font: style.font.clone(),
        });
        self.ops.push(Op::WriteTextBuiltinFont {
            items: vec![TextItem::Text(text)],
            font: style.font.clone(),
        });
        self.ops.push(Op::EndTextSection);

        self.y += style.leading;
        self.has_content = true;
    }

    fn skip(&mut self, points: f32) {
        if self.has_content {
            self.y = (self.y + points).min(self.usable_height);
        }
    }

    fn break_page(&mut self) {
        if !self.has_content {
            return;
        }
        let ops = std::mem::take(&mut self.ops);
        self.pages
            .push(PdfPage::new(Mm(self.width_mm), Mm(self.height_mm), ops));
        self.y = 0.0;
        self.has_content = false;
    }

    fn finish(mut self) -> Vec<PdfPage> {
        self.break_page();
        if self.pages.is_empty() {
            self.pages
                .push(PdfPage::new(Mm(self.width_mm), Mm(self.height_mm), Vec::new()));
        }
        self.pages
    }
}

/// Replaces characters the built-in fonts cannot show.
///
/// Tabs expand to spaces. Printable ASCII and the Latin-1 supplement, which
/// WinAnsi encodes at the same code points, pass through; anything else
/// becomes `?`.
fn pdf_safe(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\t' => out.extend(std::iter::repeat_n(' ', TAB_WIDTH)),
            ' '..='~' | '\u{A0}'..='\u{FF}' => out.push(ch),
            _ => out.push('?'),
        }
    }
    out
}

/// Hard-wraps a line every `columns` characters. Always yields at least one piece.
fn wrap(text: &str, columns: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() {
        return vec![String::new()];
    }
    chars
        .chunks(columns.max(1))
        .map(|chunk| chunk.iter().collect())
        .collect()
}

// ============================================================================
// Plain text
// ============================================================================

/// Renders documents to plain UTF-8 text with form feeds between pages.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextRenderer;

impl TextRenderer {
    /// Creates a text renderer.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Renders the document to a string and counts its pages.
    #[must_use]
    pub fn render_to_string(&self, document: &Document) -> (String, usize) {
        let mut out = String::new();
        let mut pages = 0;
        let mut page_has_content = false;

        for element in &document.elements {
            match element {
                DocumentElement::PageBreak => {
                    if page_has_content {
                        out.push('\x0c');
                        out.push('\n');
                        pages += 1;
                        page_has_content = false;
                    }
                    continue;
                }
                DocumentElement::Spacer(_) => {
                    if page_has_content {
                        out.push('\n');
                    }
                    continue;
                }
                DocumentElement::Rule => {
                    out.push_str(&"-".repeat(TEXT_RULE_WIDTH));
                    out.push('\n');
                }
                DocumentElement::Preformatted(lines) => {
                    for line in lines {
                        out.push_str(line);
                        out.push('\n');
                    }
                }
                other => {
                    if let Some(text) = line_text(other) {
                        out.push_str(&text);
                        out.push('\n');
                    }
                }
            }
            page_has_content = true;
        }

        if page_has_content || pages == 0 {
            pages += 1;
        }

        (out, pages)
    }
}

impl Renderer for TextRenderer {
    fn render(&self, document: &Document, output: &Path) -> Result<RenderReport> {
        let (text, pages) = self.render_to_string(document);
        let size = write_atomic(output, text.as_bytes())?;
        info!(path = %output.display(), bytes = size, pages, "Wrote text listing");

        Ok(RenderReport {
            output_path: output.to_path_buf(),
            bytes: size,
            pages,
        })
    }
}

// ============================================================================
// Output
// ============================================================================

/// Writes a file atomically and returns its final size.
///
/// # Process
///
/// 1. Creates the parent directory if needed
/// 2. Writes content to `<name>.tmp` next to the target
/// 3. Syncs the temporary file to disk
/// 4. Renames it over the target path
fn write_atomic(path: &Path, content: &[u8]) -> Result<u64> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| Error::render(path, e))?;
    }

    let mut temp_name = path
        .file_name()
        .ok_or_else(|| Error::render(path, "output path has no file name"))?
        .to_os_string();
    temp_name.push(".tmp");
    let temp_path = path.with_file_name(temp_name);

    let written = fs::File::create(&temp_path).and_then(|mut file| {
        file.write_all(content)?;
        file.sync_all()
    });

    if let Err(e) = written.and_then(|()| fs::rename(&temp_path, path)) {
        let _ = fs::remove_file(&temp_path);
        return Err(Error::render(path, e));
    }

    fs::metadata(path)
        .map(|m| m.len())
        .map_err(|e| Error::render(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Assembler, DocumentMetadata, NoProgress};
    use crate::file::{CandidateFile, FileContent};
    use crate::formatter::SectionFormatter;
    use assert_fs::prelude::*;

    fn sample_document(count: usize) -> Document {
        let files: Vec<CandidateFile> = (1..=count)
            .map(|i| CandidateFile::new(format!("f{i}.rs"), format!("/repo/f{i}.rs")))
            .collect();
        let metadata = DocumentMetadata {
            repository: "repo".to_string(),
            generated_at: "2024-01-01 00:00:00".to_string(),
        };
        Assembler::new(metadata).assemble(
            &files,
            |file, index| {
                Ok(SectionFormatter::default().format(
                    file,
                    index,
                    FileContent::new("fn main() {\n\tlet x = 1 < 2;\n}\n", "utf-8"),
                ))
            },
            &mut NoProgress,
        )
    }

    #[test]
    fn test_pdf_has_magic_header() {
        let temp = assert_fs::TempDir::new().unwrap();
        let output = temp.child("listing.pdf");

        let report = PdfRenderer::new(PageLayout::default())
            .render(&sample_document(2), output.path())
            .unwrap();

        let bytes = fs::read(output.path()).unwrap();
        assert_eq!(&bytes[0..4], b"%PDF");
        assert_eq!(report.bytes, bytes.len() as u64);
        // table of contents plus one page per file
        assert_eq!(report.pages, 3);
        assert!(!temp.child("listing.pdf.tmp").exists());
    }

    #[test]
    fn test_long_file_flows_onto_more_pages() {
        let files = vec![CandidateFile::new("big.txt", "/repo/big.txt")];
        let metadata = DocumentMetadata {
            repository: "repo".to_string(),
            generated_at: "now".to_string(),
        };
        let text: String = (1..=500).map(|i| format!("{i}\n")).collect();
        let document = Assembler::new(metadata).assemble(
            &files,
            |file, index| {
                let content = FileContent::new(text.clone(), "utf-8");
                Ok(SectionFormatter::default().format(file, index, content))
            },
            &mut NoProgress,
        );

        let pages = PdfRenderer::new(PageLayout::default()).paginate(&document);
        // 500 lines at 9pt leading need several A4 pages after the contents page
        assert!(pages.len() > 3);
    }

    #[test]
    fn test_text_renderer_page_breaks() {
        let (text, pages) = TextRenderer::new().render_to_string(&sample_document(2));

        assert_eq!(pages, 3);
        assert_eq!(text.matches('\x0c').count(), 3);
        assert!(text.starts_with("SOURCE CODE LISTING\n"));
        assert!(text.contains("   1. f1.rs\n"));
        assert!(text.contains("[2] f2.rs\n"));
        assert!(text.contains("   2 | \tlet x = 1 &lt; 2;\n"));
    }

    #[test]
    fn test_text_renderer_shows_notice() {
        let files = vec![CandidateFile::new("bad.rs", "/repo/bad.rs")];
        let metadata = DocumentMetadata {
            repository: "repo".to_string(),
            generated_at: "now".to_string(),
        };
        let document = Assembler::new(metadata).assemble(
            &files,
            |_, _| Err(Error::config("boom")),
            &mut NoProgress,
        );

        let (text, _) = TextRenderer::new().render_to_string(&document);
        assert!(text.contains("Error reading file 'bad.rs'"));
    }

    #[test]
    fn test_unwritable_destination_is_render_error() {
        let temp = assert_fs::TempDir::new().unwrap();
        let blocker = temp.child("blocker");
        blocker.write_str("not a directory").unwrap();

        let err = TextRenderer::new()
            .render(&sample_document(1), &blocker.path().join("out.txt"))
            .unwrap_err();

        assert!(matches!(err, Error::Render { .. }));
    }

    #[test]
    fn test_pdf_safe_and_wrap() {
        assert_eq!(pdf_safe("a\tb"), "a    b");
        assert_eq!(pdf_safe("café │"), "café ?");
        assert_eq!(pdf_safe("naïve ÿ 한"), "naïve ÿ ?");
        assert_eq!(pdf_safe("\u{7F}\u{85}"), "??");
        assert_eq!(wrap("abcdefg", 3), vec!["abc", "def", "g"]);
        assert_eq!(wrap("", 3), vec![String::new()]);
    }

    #[test]
    fn test_human_size() {
        assert_eq!(human_size(512), "0.5 KB");
        assert_eq!(human_size(2048), "2.0 KB");
        assert_eq!(human_size(3 * 1024 * 1024), "3.0 MB");
    }
}
