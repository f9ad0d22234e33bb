//! # repo-pdf
//!
//! Renders a source repository into one paginated listing: a title block, a
//! table of contents and one numbered section per file.
//!
//! ## Features
//!
//! - Directory pruning with built-in exclusion lists and glob patterns
//! - Encoding fallback chain that never fails on undecodable bytes
//! - Per-file error isolation: an unreadable file becomes a visible notice
//! - PDF output with built-in fonts, or plain text with form feeds
//! - Atomic output writes
//!
//! ## Quick Start
//!
//! ```no_run
//! use repo_pdf::{Config, OutputFormat, Pipeline};
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = Config::builder()
//!     .root_dir("./my-project")
//!     .output_path("listing.pdf")
//!     .format(OutputFormat::Pdf)
//!     .max_lines(2000)
//!     .build()?;
//!
//! Pipeline::new(config)?.run()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! The library follows a pipeline architecture:
//! 1. **Selector**: Walks the root, pruning excluded directories
//! 2. **Loader**: Reads and decodes each file
//! 3. **Formatter**: Truncates, escapes and numbers lines
//! 4. **Assembler**: Builds the element stream with the table of contents
//! 5. **Renderer**: Paginates and writes the document

#![warn(
    missing_docs,
    rust_2018_idioms,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery
)]
#![allow(clippy::module_name_repetitions)]

mod config;
mod document;
mod error;
mod file;
mod filter;
mod formatter;
mod loader;
mod pipeline;
mod render;
mod scanner;

pub use config::{
    Config, ConfigBuilder, Margins, OutputFormat, PageLayout, PageSize, validate_root,
};
pub use document::{
    Assembler, AssemblyStats, DOCUMENT_TITLE, Document, DocumentElement, DocumentMetadata,
    NoProgress, ProgressObserver, TOC_HEADING,
};
pub use error::{Error, Result, RootProblem};
pub use file::{CandidateFile, FileContent};
pub use filter::SelectionPolicy;
pub use formatter::{
    DEFAULT_MAX_LINES, FormattedSection, SectionFormatter, escape_markup, truncation_notice,
};
pub use loader::{ContentLoader, DEGRADED_ENCODING, TextEncoding};
pub use pipeline::{Pipeline, PipelineStats};
pub use render::{PdfRenderer, RenderReport, Renderer, TextRenderer, human_size, renderer_for};

/// Runs the complete listing pipeline with the given configuration.
///
/// This is the main entry point for the library.
///
/// # Errors
///
/// Returns an error if:
/// - Configuration is invalid
/// - Root directory doesn't exist or is not a directory
/// - No listable files are found
/// - The output cannot be written
///
/// # Examples
///
/// ```no_run
/// use repo_pdf::{Config, run};
///
/// # fn main() -> anyhow::Result<()> {
/// let config = Config::builder()
///     .root_dir(".")
///     .build()?;
///
/// let stats = run(config)?;
/// println!("{} files written to {}", stats.total_files, stats.output_path.display());
/// # Ok(())
/// # }
/// ```
pub fn run(config: Config) -> Result<PipelineStats> {
    Pipeline::new(config)?.run()
}
