use anyhow::Context;
use clap::Parser;
use repo_pdf::{
    Config, Margins, OutputFormat, PageSize, Pipeline, PipelineStats, ProgressObserver,
    SelectionPolicy, TextEncoding,
};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const BAR_WIDTH: usize = 30;
const NAME_WIDTH: usize = 30;

#[derive(Parser, Debug)]
#[command(
    name = "repo-pdf",
    version,
    author,
    about = "Render a source repository into one paginated code listing",
    long_about = "Render a source repository into one paginated code listing.\n\n\
    This tool walks a directory, skips build output, dependencies and hidden \
    directories, and writes every source file into a single document with a \
    table of contents and line-numbered sections.\n\n\
    USAGE EXAMPLES:\n  \
      # List the current directory into repository_code.pdf\n  \
      repo-pdf\n\n  \
      # List a project into a chosen file\n  \
      repo-pdf ./my-project listing.pdf\n\n  \
      # Plain text, letter paper, short sections\n  \
      repo-pdf ./src --format text --page-size letter --max-lines 500"
)]
struct Cli {
    /// Root directory of the repository to list
    #[arg(default_value = ".", value_name = "REPO_PATH")]
    repo_path: PathBuf,

    /// Output file [default: repository_code.pdf, or .txt with --format text]
    #[arg(value_name = "OUTPUT")]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "pdf")]
    format: CliFormat,

    /// Max numbered lines per file
    #[arg(long, default_value_t = repo_pdf::DEFAULT_MAX_LINES)]
    max_lines: usize,

    /// Paper size for PDF output
    #[arg(long, value_enum, default_value = "a4")]
    page_size: CliPageSize,

    /// Page margin on every side, in millimetres
    #[arg(long, default_value_t = 15.0, value_name = "MM")]
    margin: f32,

    /// Extra directory name or glob to skip (can be used multiple times)
    #[arg(long = "exclude-dir", value_name = "NAME")]
    exclude_dirs: Vec<String>,

    /// Extra file name to skip (can be used multiple times)
    #[arg(long = "exclude-file", value_name = "NAME")]
    exclude_files: Vec<String>,

    /// Extra file extension to list, without the dot (can be used multiple times)
    #[arg(long = "ext", value_name = "EXT")]
    extensions: Vec<String>,

    /// Extra extensionless file name to list, e.g. Procfile (can be used multiple times)
    #[arg(long = "name", value_name = "NAME")]
    filenames: Vec<String>,

    /// Encoding to try, in order (can be used multiple times)
    ///
    /// Replaces the default order utf-8, utf-8-sig, cp949, latin-1.
    #[arg(long = "encoding", value_name = "NAME")]
    encodings: Vec<TextEncoding>,

    /// Don't draw the progress bar
    #[arg(short, long)]
    quiet: bool,

    /// Print run statistics as JSON
    #[arg(long)]
    json: bool,

    /// Verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum CliFormat {
    Pdf,
    Text,
}

impl From<CliFormat> for OutputFormat {
    fn from(f: CliFormat) -> Self {
        match f {
            CliFormat::Pdf => Self::Pdf,
            CliFormat::Text => Self::Text,
        }
    }
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum CliPageSize {
    A4,
    Letter,
    Legal,
}

impl From<CliPageSize> for PageSize {
    fn from(p: CliPageSize) -> Self {
        match p {
            CliPageSize::A4 => Self::A4,
            CliPageSize::Letter => Self::Letter,
            CliPageSize::Legal => Self::Legal,
        }
    }
}

/// Console progress bar redrawn in place on stderr.
struct ProgressBar;

impl ProgressObserver for ProgressBar {
    fn on_file(&mut self, current: usize, total: usize, path: &Path) {
        let mut stderr = std::io::stderr().lock();
        let _ = write!(stderr, "\r{}", progress_line(current, total, path));
        if current == total {
            let _ = writeln!(stderr);
        }
        let _ = stderr.flush();
    }
}

fn progress_line(current: usize, total: usize, path: &Path) -> String {
    let filled = if total == 0 { BAR_WIDTH } else { BAR_WIDTH * current / total };
    let name = path
        .file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());

    format!(
        "[{}{}] {current}/{total} {:<NAME_WIDTH$}",
        "█".repeat(filled),
        "░".repeat(BAR_WIDTH - filled),
        shorten(&name)
    )
}

fn shorten(name: &str) -> String {
    if name.chars().count() > NAME_WIDTH {
        let head: String = name.chars().take(NAME_WIDTH - 3).collect();
        format!("{head}...")
    } else {
        name.to_string()
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = setup_tracing(cli.verbose) {
        eprintln!("Error: {e:#}");
        return ExitCode::FAILURE;
    }

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            let code = e
                .downcast_ref::<repo_pdf::Error>()
                .map_or(1, repo_pdf::Error::exit_code);
            ExitCode::from(code)
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let format = OutputFormat::from(cli.format);
    let output = cli
        .output
        .unwrap_or_else(|| PathBuf::from(format!("repository_code.{}", format.extension())));

    let selection = SelectionPolicy::default()
        .also_exclude_directories(cli.exclude_dirs)
        .also_exclude_files(cli.exclude_files)
        .also_extensions(cli.extensions)
        .also_filenames(cli.filenames);

    let mut builder = Config::builder()
        .root_dir(cli.repo_path)
        .output_path(output)
        .format(format)
        .max_lines(cli.max_lines)
        .page_size(cli.page_size.into())
        .margins(Margins::uniform(cli.margin))
        .selection(selection);

    if !cli.encodings.is_empty() {
        builder = builder.encodings(cli.encodings);
    }

    let config = builder.build().context("Failed to build configuration")?;

    let pipeline = Pipeline::new(config).context("Failed to create pipeline")?;
    let stats = if cli.quiet {
        pipeline.run()
    } else {
        pipeline.run_with_progress(&mut ProgressBar)
    }
    .context("Listing failed")?;

    if cli.json {
        let json = serde_json::to_string_pretty(&stats).context("Failed to serialize statistics")?;
        println!("{json}");
    } else {
        print_report(&stats);
    }

    Ok(())
}

fn print_report(stats: &PipelineStats) {
    println!("✓ Listing created: {}", stats.output_path.display());
    println!("  Size:  {}", stats.human_size());
    println!("  Pages: {}", stats.pages);
    println!("  Files: {}", stats.total_files);
    if stats.degraded_files > 0 {
        println!("  Decoded with replacement characters: {}", stats.degraded_files);
    }
    if stats.truncated_files > 0 {
        println!("  Truncated: {}", stats.truncated_files);
    }
    if stats.failed_files > 0 {
        println!("  ⚠ Replaced by error notices: {}", stats.failed_files);
    }
}

fn setup_tracing(verbosity: u8) -> anyhow::Result<()> {
    let filter = match verbosity {
        0 => EnvFilter::new("repo_pdf=warn"),
        1 => EnvFilter::new("repo_pdf=info"),
        2 => EnvFilter::new("repo_pdf=debug"),
        _ => EnvFilter::new("repo_pdf=trace"),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_writer(std::io::stderr),
        )
        .try_init()
        .context("Failed to install log subscriber")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_positional_defaults() {
        let cli = Cli::try_parse_from(["repo-pdf"]).unwrap();
        assert_eq!(cli.repo_path, PathBuf::from("."));
        assert!(cli.output.is_none());
        assert_eq!(cli.max_lines, 2000);
    }

    #[test]
    fn test_encoding_flags_parse() {
        let args = ["repo-pdf", "--encoding", "utf-8", "--encoding", "euc-kr"];
        let cli = Cli::try_parse_from(args).unwrap();
        assert_eq!(cli.encodings, vec![TextEncoding::Utf8, TextEncoding::Cp949]);
        assert!(Cli::try_parse_from(["repo-pdf", "--encoding", "klingon"]).is_err());
    }

    #[test]
    fn test_shorten_long_names() {
        assert_eq!(shorten("main.rs"), "main.rs");
        let long = "a_really_long_file_name_for_testing.rs";
        let short = shorten(long);
        assert_eq!(short.chars().count(), 30);
        assert!(short.ends_with("..."));
    }

    #[test]
    fn test_progress_line() {
        let line = progress_line(1, 2, Path::new("/repo/src/lib.rs"));
        let expected = format!("[{}{}] 1/2 lib.rs", "█".repeat(15), "░".repeat(15));
        assert!(line.starts_with(&expected));
    }
}
