use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using the library's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Why a root path was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootProblem {
    /// Nothing exists at the path
    Missing,
    /// The path exists but is not a directory
    NotADirectory,
}

impl fmt::Display for RootProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => f.write_str("does not exist"),
            Self::NotADirectory => f.write_str("is not a directory"),
        }
    }
}

/// Error types for the repo-pdf library.
#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum Error {
    /// Root path is missing or not a directory.
    #[error("Root path '{path}' {problem}")]
    InvalidRoot {
        /// Path that was given as the root
        path: PathBuf,
        /// What is wrong with it
        problem: RootProblem,
    },

    /// No file under the root passed the selection policy.
    #[error("No source files found in '{path}'. Check the extension and exclusion settings.")]
    NoFiles {
        /// Directory that was scanned
        path: PathBuf,
    },

    /// IO error with context about the file path.
    #[error("IO error accessing '{path}': {message}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// Error message
        message: String,
    },

    /// Loading or formatting one file failed. Never aborts a run.
    #[error("Error reading file '{path}': {message}")]
    SectionFormat {
        /// Relative path of the file
        path: PathBuf,
        /// Error message
        message: String,
    },

    /// Writing the output document failed.
    #[error("Failed to render '{path}': {message}")]
    Render {
        /// Output path
        path: PathBuf,
        /// Error message
        message: String,
    },

    /// Configuration validation error.
    #[error("Invalid configuration: {message}")]
    Config {
        /// Detailed error message
        message: String,
    },
}

impl Error {
    /// Creates an IO error with path context.
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            message: source.to_string(),
        }
    }

    /// Creates a configuration error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates an invalid root error.
    #[must_use]
    pub fn invalid_root(path: impl Into<PathBuf>, problem: RootProblem) -> Self {
        Self::InvalidRoot {
            path: path.into(),
            problem,
        }
    }

    /// Creates a no files error.
    #[must_use]
    pub fn no_files(path: impl Into<PathBuf>) -> Self {
        Self::NoFiles { path: path.into() }
    }

    /// Creates a render error.
    #[must_use]
    pub fn render(path: impl Into<PathBuf>, message: impl fmt::Display) -> Self {
        Self::Render {
            path: path.into(),
            message: message.to_string(),
        }
    }

    /// Wraps any per-file failure as a section error.
    ///
    /// An IO error keeps only its message so the path is not repeated.
    #[must_use]
    pub fn section(path: impl Into<PathBuf>, source: &Self) -> Self {
        let message = match source {
            Self::Io { message, .. } | Self::SectionFormat { message, .. } => message.clone(),
            other => other.to_string(),
        };
        Self::SectionFormat {
            path: path.into(),
            message,
        }
    }

    /// Returns true if this error aborts a whole run.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !matches!(self, Self::SectionFormat { .. } | Self::Io { .. })
    }

    /// Process exit code used by the command line front end.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::InvalidRoot {
                problem: RootProblem::Missing,
                ..
            } => 2,
            Self::InvalidRoot {
                problem: RootProblem::NotADirectory,
                ..
            } => 3,
            Self::NoFiles { .. } => 4,
            Self::Render { .. } => 5,
            _ => 1,
        }
    }
}
