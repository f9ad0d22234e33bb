use crate::error::{Error, Result, RootProblem};
use crate::filter::SelectionPolicy;
use crate::formatter::DEFAULT_MAX_LINES;
use crate::loader::TextEncoding;
use std::fmt;
use std::path::{Path, PathBuf};

const DEFAULT_OUTPUT: &str = "repository_code.pdf";
const DEFAULT_MARGIN_MM: f32 = 15.0;
const MIN_USABLE_MM: f32 = 20.0;

/// Output format of the rendered document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// PDF with built-in fonts
    #[default]
    Pdf,
    /// Plain UTF-8 text, pages separated by form feeds
    Text,
}

impl OutputFormat {
    /// Returns the file extension for this format.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Text => "txt",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pdf => f.write_str("PDF"),
            Self::Text => f.write_str("text"),
        }
    }
}

/// Paper size.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum PageSize {
    /// 210 × 297 mm
    #[default]
    A4,
    /// 8.5 × 11 in
    Letter,
    /// 8.5 × 14 in
    Legal,
    /// Any size, in millimetres
    Custom {
        /// Width in millimetres
        width_mm: f32,
        /// Height in millimetres
        height_mm: f32,
    },
}

impl PageSize {
    /// Width and height in millimetres.
    #[must_use]
    pub const fn dimensions_mm(self) -> (f32, f32) {
        match self {
            Self::A4 => (210.0, 297.0),
            Self::Letter => (215.9, 279.4),
            Self::Legal => (215.9, 355.6),
            Self::Custom {
                width_mm,
                height_mm,
            } => (width_mm, height_mm),
        }
    }
}

/// Page margins in millimetres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Margins {
    /// Top margin
    pub top: f32,
    /// Right margin
    pub right: f32,
    /// Bottom margin
    pub bottom: f32,
    /// Left margin
    pub left: f32,
}

impl Margins {
    /// The same margin on all four sides.
    #[must_use]
    pub const fn uniform(mm: f32) -> Self {
        Self {
            top: mm,
            right: mm,
            bottom: mm,
            left: mm,
        }
    }
}

impl Default for Margins {
    fn default() -> Self {
        Self::uniform(DEFAULT_MARGIN_MM)
    }
}

/// Page size plus margins.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PageLayout {
    /// Paper size
    pub size: PageSize,
    /// Margins
    pub margins: Margins,
}

impl PageLayout {
    /// Width available for content, in millimetres.
    #[must_use]
    pub fn usable_width_mm(&self) -> f32 {
        self.size.dimensions_mm().0 - self.margins.left - self.margins.right
    }

    /// Height available for content, in millimetres.
    #[must_use]
    pub fn usable_height_mm(&self) -> f32 {
        self.size.dimensions_mm().1 - self.margins.top - self.margins.bottom
    }

    /// Validates that the margins leave room for content.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for negative margins or a content area
    /// smaller than 20 mm in either direction.
    pub fn validate(&self) -> Result<()> {
        let m = self.margins;
        if [m.top, m.right, m.bottom, m.left].iter().any(|v| !v.is_finite() || *v < 0.0) {
            return Err(Error::config("Margins must be finite and non-negative"));
        }

        if self.usable_width_mm() < MIN_USABLE_MM || self.usable_height_mm() < MIN_USABLE_MM {
            let (w, h) = self.size.dimensions_mm();
            return Err(Error::config(format!(
                "Margins leave no room for content on a {w} x {h} mm page"
            )));
        }

        Ok(())
    }
}

/// Configuration for one listing run.
///
/// Use [`Config::builder()`] to construct a new configuration.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct Config {
    /// Root directory to list
    pub root_dir: PathBuf,

    /// Output document path
    pub output_path: PathBuf,

    /// Output format
    pub format: OutputFormat,

    /// Which directories are pruned and which files are listed
    pub selection: SelectionPolicy,

    /// Maximum numbered lines per file
    pub max_lines: usize,

    /// Encodings tried in order when decoding a file
    pub encodings: Vec<TextEncoding>,

    /// Page size and margins
    pub layout: PageLayout,
}

impl Config {
    /// Creates a new configuration builder.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use repo_pdf::Config;
    ///
    /// let config = Config::builder()
    ///     .root_dir("./my-project")
    ///     .output_path("listing.pdf")
    ///     .max_lines(500)
    ///     .build()
    ///     .expect("valid configuration");
    /// ```
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Root directory doesn't exist or is not a directory
    /// - The line limit is zero or no encoding is configured
    /// - The output path is empty or an existing directory
    /// - The page layout leaves no room for content
    pub fn validate(&self) -> Result<()> {
        validate_root(&self.root_dir)?;

        if self.max_lines == 0 {
            return Err(Error::config("max_lines must be greater than 0"));
        }

        if self.encodings.is_empty() {
            return Err(Error::config("At least one encoding must be configured"));
        }

        if self.output_path.as_os_str().is_empty() {
            return Err(Error::config("Output path must not be empty"));
        }

        if self.output_path.is_dir() {
            return Err(Error::config(format!(
                "Output path is a directory: {}",
                self.output_path.display()
            )));
        }

        self.layout.validate()
    }
}

/// Checks that `root` exists and is a directory.
///
/// # Errors
///
/// Returns [`Error::InvalidRoot`] otherwise.
pub fn validate_root(root: &Path) -> Result<()> {
    if !root.exists() {
        return Err(Error::invalid_root(root, RootProblem::Missing));
    }

    if !root.is_dir() {
        return Err(Error::invalid_root(root, RootProblem::NotADirectory));
    }

    Ok(())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root_dir: PathBuf::from("."),
            output_path: PathBuf::from(DEFAULT_OUTPUT),
            format: OutputFormat::Pdf,
            selection: SelectionPolicy::default(),
            max_lines: DEFAULT_MAX_LINES,
            encodings: TextEncoding::DEFAULT_ORDER.to_vec(),
            layout: PageLayout::default(),
        }
    }
}

/// Builder for creating a [`Config`].
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    root_dir: Option<PathBuf>,
    output_path: Option<PathBuf>,
    format: Option<OutputFormat>,
    selection: Option<SelectionPolicy>,
    max_lines: Option<usize>,
    encodings: Option<Vec<TextEncoding>>,
    page_size: Option<PageSize>,
    margins: Option<Margins>,
}

impl ConfigBuilder {
    /// Sets the root directory to list.
    #[must_use]
    pub fn root_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.root_dir = Some(path.into());
        self
    }

    /// Sets the output document path.
    #[must_use]
    pub fn output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = Some(path.into());
        self
    }

    /// Sets the output format.
    #[must_use]
    pub fn format(mut self, format: OutputFormat) -> Self {
        self.format = Some(format);
        self
    }

    /// Sets the file selection policy.
    #[must_use]
    pub fn selection(mut self, policy: SelectionPolicy) -> Self {
        self.selection = Some(policy);
        self
    }

    /// Sets the maximum numbered lines per file.
    #[must_use]
    pub fn max_lines(mut self, lines: usize) -> Self {
        self.max_lines = Some(lines);
        self
    }

    /// Sets the encodings tried, in order.
    #[must_use]
    pub fn encodings(mut self, encodings: Vec<TextEncoding>) -> Self {
        self.encodings = Some(encodings);
        self
    }

    /// Sets the paper size.
    #[must_use]
    pub fn page_size(mut self, size: PageSize) -> Self {
        self.page_size = Some(size);
        self
    }

    /// Sets all four margins.
    #[must_use]
    pub fn margins(mut self, margins: Margins) -> Self {
        self.margins = Some(margins);
        self
    }

    /// Builds the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails.
    pub fn build(self) -> Result<Config> {
        let config = Config {
            root_dir: self.root_dir.unwrap_or_else(|| PathBuf::from(".")),
            output_path: self
                .output_path
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT)),
            format: self.format.unwrap_or_default(),
            selection: self.selection.unwrap_or_default(),
            max_lines: self.max_lines.unwrap_or(DEFAULT_MAX_LINES),
            encodings: self
                .encodings
                .unwrap_or_else(|| TextEncoding::DEFAULT_ORDER.to_vec()),
            layout: PageLayout {
                size: self.page_size.unwrap_or_default(),
                margins: self.margins.unwrap_or_default(),
            },
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;

    #[test]
    fn test_default_config() {
        let temp = assert_fs::TempDir::new().unwrap();
        let config = Config::builder().root_dir(temp.path()).build().unwrap();

        assert_eq!(config.max_lines, DEFAULT_MAX_LINES);
        assert_eq!(config.format, OutputFormat::Pdf);
        assert_eq!(config.layout.size, PageSize::A4);
        assert_eq!(config.layout.margins, Margins::uniform(15.0));
        assert_eq!(config.encodings, TextEncoding::DEFAULT_ORDER.to_vec());
    }

    #[test]
    fn test_missing_root_dir() {
        let result = Config::builder()
            .root_dir("/nonexistent/path/that/should/not/exist")
            .build();

        assert!(matches!(
            result,
            Err(Error::InvalidRoot { problem: RootProblem::Missing, .. })
        ));
    }

    #[test]
    fn test_root_is_a_file() {
        let temp = assert_fs::TempDir::new().unwrap();
        let file = temp.child("main.rs");
        file.write_str("fn main() {}").unwrap();

        let result = Config::builder().root_dir(file.path()).build();

        assert!(matches!(
            result,
            Err(Error::InvalidRoot { problem: RootProblem::NotADirectory, .. })
        ));
    }

    #[test]
    fn test_zero_max_lines() {
        let temp = assert_fs::TempDir::new().unwrap();
        let result = Config::builder().root_dir(temp.path()).max_lines(0).build();

        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[test]
    fn test_empty_encodings() {
        let temp = assert_fs::TempDir::new().unwrap();
        let result = Config::builder()
            .root_dir(temp.path())
            .encodings(Vec::new())
            .build();

        assert!(result.is_err());
    }

    #[test]
    fn test_output_path_is_directory() {
        let temp = assert_fs::TempDir::new().unwrap();
        let result = Config::builder()
            .root_dir(temp.path())
            .output_path(temp.path())
            .build();

        assert!(result.is_err());
    }

    #[test]
    fn test_margins_too_large() {
        let temp = assert_fs::TempDir::new().unwrap();
        let result = Config::builder()
            .root_dir(temp.path())
            .margins(Margins::uniform(100.0))
            .build();

        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[test]
    fn test_usable_area() {
        let layout = PageLayout {
            size: PageSize::Custom {
                width_mm: 100.0,
                height_mm: 200.0,
            },
            margins: Margins {
                top: 10.0,
                right: 5.0,
                bottom: 20.0,
                left: 15.0,
            },
        };

        assert!((layout.usable_width_mm() - 80.0).abs() < f32::EPSILON);
        assert!((layout.usable_height_mm() - 170.0).abs() < f32::EPSILON);
        assert!(layout.validate().is_ok());
    }
}
