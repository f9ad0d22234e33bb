use crate::{
    config::Config,
    document::{Assembler, Document, DocumentMetadata, NoProgress, ProgressObserver},
    error::{Error, Result},
    file::CandidateFile,
    formatter::SectionFormatter,
    loader::ContentLoader,
    render::{RenderReport, Renderer, human_size, renderer_for},
    scanner::Selector,
};
use serde::Serialize;
use std::{
    fs,
    path::{Path, PathBuf},
    time::{Duration, Instant},
};
use tracing::{debug, info, instrument, warn};

/// Statistics collected during pipeline execution.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineStats {
    /// Files listed in the table of contents
    pub total_files: usize,

    /// Sections formatted successfully
    pub formatted_files: usize,

    /// Sections decoded with replacement characters
    pub degraded_files: usize,

    /// Sections cut at the line limit
    pub truncated_files: usize,

    /// Sections replaced by an error notice
    pub failed_files: usize,

    /// Path of the written document
    pub output_path: PathBuf,

    /// Size of the written document in bytes
    pub output_bytes: u64,

    /// Pages in the written document
    pub pages: usize,

    /// Total execution time
    pub duration: Duration,

    /// Time spent selecting files
    pub select_duration: Duration,

    /// Time spent loading, formatting and assembling
    pub assemble_duration: Duration,

    /// Time spent rendering and writing
    pub render_duration: Duration,
}

impl PipelineStats {
    fn new(
        document: &Document,
        report: RenderReport,
        duration: Duration,
        select_duration: Duration,
        assemble_duration: Duration,
        render_duration: Duration,
    ) -> Self {
        let stats = document.stats;
        Self {
            total_files: stats.total,
            formatted_files: stats.formatted,
            degraded_files: stats.degraded,
            truncated_files: stats.truncated,
            failed_files: stats.failed,
            output_path: report.output_path,
            output_bytes: report.bytes,
            pages: report.pages,
            duration,
            select_duration,
            assemble_duration,
            render_duration,
        }
    }

    /// Output size as `x.x KB` or `x.x MB`.
    #[must_use]
    pub fn human_size(&self) -> String {
        human_size(self.output_bytes)
    }
}

/// Main pipeline orchestrator for turning a repository into one listing.
pub struct Pipeline {
    config: Config,
    selector: Selector,
    loader: ContentLoader,
    formatter: SectionFormatter,
    renderer: Box<dyn Renderer>,
}

impl Pipeline {
    /// Creates a new pipeline with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration validation fails
    /// - The selection policy does not compile
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let selector = Selector::new(&config.selection)?;
        let loader = ContentLoader::new(config.encodings.clone());
        let formatter = SectionFormatter::new(config.max_lines);
        let renderer = renderer_for(&config);

        Ok(Self {
            config,
            selector,
            loader,
            formatter,
            renderer,
        })
    }

    /// Executes the complete pipeline without progress reporting.
    ///
    /// # Errors
    ///
    /// See [`Pipeline::run_with_progress`].
    pub fn run(self) -> Result<PipelineStats> {
        self.run_with_progress(&mut NoProgress)
    }

    /// Executes the complete pipeline and returns statistics.
    ///
    /// # Process
    ///
    /// 1. **Select**: Walks the root and picks the files to list
    /// 2. **Assemble**: Loads and formats each file into the document
    /// 3. **Render**: Serializes the document to the output path
    ///
    /// `observer` is called once after each file has been processed.
    ///
    /// # Errors
    ///
    /// Returns an error if the root is invalid, no file is selected or the
    /// output cannot be written. A single file that cannot be read never
    /// fails the run; its section becomes an error notice.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use repo_pdf::{Config, Pipeline};
    ///
    /// # fn main() -> anyhow::Result<()> {
    /// let config = Config::builder()
    ///     .root_dir("./my-project")
    ///     .build()?;
    ///
    /// let mut report = |current: usize, total: usize, _: &std::path::Path| {
    ///     eprintln!("{current}/{total}");
    /// };
    /// let stats = Pipeline::new(config)?.run_with_progress(&mut report)?;
    /// println!("{} files, {}", stats.total_files, stats.human_size());
    /// # Ok(())
    /// # }
    /// ```
    #[instrument(skip(self, observer), fields(root_dir = %self.config.root_dir.display()))]
    pub fn run_with_progress(self, observer: &mut dyn ProgressObserver) -> Result<PipelineStats> {
        let start_time = Instant::now();

        info!("Starting pipeline execution");

        // Stage 1: Selecting
        info!("Stage 1/3: Selecting files...");
        let select_start = Instant::now();
        let files = self.select()?;
        let select_duration = select_start.elapsed();

        info!(
            "✓ Selected {} files in {:.2}s",
            files.len(),
            select_duration.as_secs_f64()
        );

        // Stage 2: Assembling
        info!("Stage 2/3: Assembling document...");
        let assemble_start = Instant::now();
        let document = self.assemble(&files, observer);
        let assemble_duration = assemble_start.elapsed();

        if document.stats.failed > 0 {
            warn!(
                "  {} file(s) could not be read and were replaced by error notices",
                document.stats.failed
            );
        }
        info!(
            "✓ Assembled {} sections in {:.2}s",
            document.stats.total,
            assemble_duration.as_secs_f64()
        );

        // Stage 3: Rendering
        info!("Stage 3/3: Rendering {}...", self.config.format);
        let render_start = Instant::now();
        let report = self.renderer.render(&document, &self.config.output_path)?;
        let render_duration = render_start.elapsed();

        info!(
            "✓ Wrote {} ({} pages, {}) in {:.2}s",
            report.output_path.display(),
            report.pages,
            report.human_size(),
            render_duration.as_secs_f64()
        );

        let total_duration = start_time.elapsed();
        info!(
            "✓ Pipeline completed successfully in {:.2}s",
            total_duration.as_secs_f64()
        );

        Ok(PipelineStats::new(
            &document,
            report,
            total_duration,
            select_duration,
            assemble_duration,
            render_duration,
        ))
    }

    /// Executes the selection stage, leaving out the output file itself.
    fn select(&self) -> Result<Vec<CandidateFile>> {
        let mut files = self.selector.select(&self.config.root_dir)?;

        if let Some(output) = canonical_output(&self.config.output_path) {
            let output_name = output.file_name().unwrap_or_default();
            files.retain(|file| {
                let is_output = file.file_name().as_os_str() == output_name
                    && fs::canonicalize(&file.absolute_path).is_ok_and(|path| path == output);
                if is_output {
                    debug!("Leaving previous output {} out of the listing", output.display());
                }
                !is_output
            });
        }

        if files.is_empty() {
            return Err(Error::no_files(&self.config.root_dir));
        }
        Ok(files)
    }

    /// Executes the assembly stage.
    fn assemble(&self, files: &[CandidateFile], observer: &mut dyn ProgressObserver) -> Document {
        let root = fs::canonicalize(&self.config.root_dir)
            .unwrap_or_else(|_| self.config.root_dir.clone());
        let metadata = DocumentMetadata::now(DocumentMetadata::repository_name(&root));

        Assembler::new(metadata).assemble(
            files,
            |file, index| {
                let content = self.loader.load(file)?;
                Ok(self.formatter.format(file, index, content))
            },
            observer,
        )
    }
}

fn canonical_output(output: &Path) -> Option<PathBuf> {
    fs::canonicalize(output).ok()
}
