//! Inclusion and exclusion policy for the file selector.
//!
//! [`SelectionPolicy`] is the user-facing description of which directories
//! are pruned and which files are listed. [`FileFilter`] is its compiled form
//! used while walking.

use crate::error::{Error, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use once_cell::sync::Lazy;
use std::collections::HashSet;
use std::ffi::OsStr;
use std::path::Path;

static DEFAULT_EXCLUDE_DIRS: Lazy<Vec<&'static str>> = Lazy::new(|| {
    vec![
        "node_modules", ".git", ".svn", ".hg", "vendor", "dist", "build", "out",
        "__pycache__", ".pytest_cache", ".mypy_cache", ".idea", ".vscode", ".vs",
        "coverage", ".nyc_output", ".next", ".nuxt", ".output", "target", "bin", "obj",
        "venv", "env", ".env", "eggs", "*.egg-info",
    ]
});

static DEFAULT_EXCLUDE_FILES: Lazy<Vec<&'static str>> = Lazy::new(|| {
    vec![
        "package-lock.json", "yarn.lock", "pnpm-lock.yaml", "Cargo.lock", "poetry.lock",
        "Pipfile.lock", ".DS_Store", "Thumbs.db",
    ]
});

static DEFAULT_EXTENSIONS: Lazy<Vec<&'static str>> = Lazy::new(|| {
    vec![
        // web
        "js", "jsx", "ts", "tsx", "mjs", "cjs", "html", "htm", "css", "scss", "sass", "less",
        "vue", "svelte",
        // languages
        "py", "pyw", "java", "c", "h", "cpp", "hpp", "cc", "cxx", "hxx", "cs", "go", "rs", "rb",
        "erb", "php", "swift", "kt", "kts", "scala", "r", "lua", "pl", "pm", "sh", "bash", "zsh",
        "fish", "ps1", "psm1", "bat", "cmd",
        // data and config
        "json", "xml", "yaml", "yml", "toml", "ini", "cfg", "conf", "sql", "graphql", "gql",
        // docs
        "md", "markdown", "rst", "txt",
        // misc
        "dockerfile", "makefile",
    ]
});

static DEFAULT_FILENAMES: Lazy<Vec<&'static str>> =
    Lazy::new(|| vec!["dockerfile", "makefile", "jenkinsfile", "rakefile"]);

/// Which directories are pruned and which files are listed.
///
/// The default reproduces the built-in lists of common source, config and
/// documentation extensions and the usual build/vendor directories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionPolicy {
    exclude_directories: Vec<String>,
    exclude_files: Vec<String>,
    extensions: Vec<String>,
    filenames: Vec<String>,
    hidden_marker: Option<char>,
}

impl Default for SelectionPolicy {
    fn default() -> Self {
        Self {
            exclude_directories: to_owned(&DEFAULT_EXCLUDE_DIRS),
            exclude_files: to_owned(&DEFAULT_EXCLUDE_FILES),
            extensions: to_owned(&DEFAULT_EXTENSIONS),
            filenames: to_owned(&DEFAULT_FILENAMES),
            hidden_marker: Some('.'),
        }
    }
}

fn to_owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

impl SelectionPolicy {
    /// Creates a policy that matches nothing and prunes only hidden directories.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            exclude_directories: Vec::new(),
            exclude_files: Vec::new(),
            extensions: Vec::new(),
            filenames: Vec::new(),
            hidden_marker: Some('.'),
        }
    }

    /// Replaces the pruned directory names. Entries may be globs such as `*.egg-info`.
    #[must_use]
    pub fn exclude_directories(mut self, names: Vec<String>) -> Self {
        self.exclude_directories = names;
        self
    }

    /// Replaces the excluded exact filenames.
    #[must_use]
    pub fn exclude_files(mut self, names: Vec<String>) -> Self {
        self.exclude_files = names;
        self
    }

    /// Replaces the allowed extensions (case-insensitive, leading dot optional).
    #[must_use]
    pub fn extensions(mut self, extensions: Vec<String>) -> Self {
        self.extensions = extensions;
        self
    }

    /// Replaces the allowed extensionless filenames (case-insensitive).
    #[must_use]
    pub fn filenames(mut self, names: Vec<String>) -> Self {
        self.filenames = names;
        self
    }

    /// Adds pruned directory names on top of the current ones.
    #[must_use]
    pub fn also_exclude_directories(mut self, names: impl IntoIterator<Item = String>) -> Self {
        self.exclude_directories.extend(names);
        self
    }

    /// Adds excluded filenames on top of the current ones.
    #[must_use]
    pub fn also_exclude_files(mut self, names: impl IntoIterator<Item = String>) -> Self {
        self.exclude_files.extend(names);
        self
    }

    /// Adds allowed extensions on top of the current ones.
    #[must_use]
    pub fn also_extensions(mut self, extensions: impl IntoIterator<Item = String>) -> Self {
        self.extensions.extend(extensions);
        self
    }

    /// Adds allowed extensionless filenames on top of the current ones.
    #[must_use]
    pub fn also_filenames(mut self, names: impl IntoIterator<Item = String>) -> Self {
        self.filenames.extend(names);
        self
    }

    /// Sets the leading character that marks a directory as hidden, or disables it.
    #[must_use]
    pub const fn hidden_marker(mut self, marker: Option<char>) -> Self {
        self.hidden_marker = marker;
        self
    }
}

/// Compiled [`SelectionPolicy`].
#[derive(Debug, Clone)]
pub(crate) struct FileFilter {
    exact_directories: HashSet<String>,
    directory_patterns: GlobSet,
    exclude_files: HashSet<String>,
    extensions: HashSet<String>,
    filenames: HashSet<String>,
    hidden_marker: Option<char>,
}

impl FileFilter {
    /// Compiles a policy.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if a directory glob is invalid.
    pub(crate) fn new(policy: &SelectionPolicy) -> Result<Self> {
        let (patterns, exact): (Vec<&String>, Vec<&String>) = policy
            .exclude_directories
            .iter()
            .partition(|name| is_glob(name));

        Ok(Self {
            exact_directories: exact.into_iter().cloned().collect(),
            directory_patterns: Self::build_globset(&patterns)?,
            exclude_files: policy.exclude_files.iter().cloned().collect(),
            extensions: policy
                .extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_lowercase())
                .collect(),
            filenames: policy.filenames.iter().map(|n| n.to_lowercase()).collect(),
            hidden_marker: policy.hidden_marker,
        })
    }

    fn build_globset(patterns: &[&String]) -> Result<GlobSet> {
        let mut builder = GlobSetBuilder::new();

        for pattern in patterns {
            let glob = Glob::new(pattern).map_err(|e| {
                Error::config(format!("Invalid directory pattern '{pattern}': {e}"))
            })?;
            builder.add(glob);
        }

        builder
            .build()
            .map_err(|e| Error::config(format!("Failed to build directory patterns: {e}")))
    }

    /// Returns true if a directory with this name must not be descended into.
    pub(crate) fn prunes_directory(&self, name: &OsStr) -> bool {
        let name = name.to_string_lossy();

        if let Some(marker) = self.hidden_marker {
            if name.starts_with(marker) {
                return true;
            }
        }

        self.exact_directories.contains(&*name)
            || self.directory_patterns.is_match(&*name)
    }

    /// Returns true if a regular file at this path belongs in the listing.
    pub(crate) fn includes_file(&self, path: &Path) -> bool {
        let Some(name) = path.file_name().map(OsStr::to_string_lossy) else {
            return false;
        };

        if self.exclude_files.contains(&*name) {
            return false;
        }

        let by_extension = path
            .extension()
            .map(|ext| self.extensions.contains(&ext.to_string_lossy().to_lowercase()))
            .unwrap_or(false);

        by_extension || self.filenames.contains(&name.to_lowercase())
    }
}

fn is_glob(name: &str) -> bool {
    name.contains(['*', '?', '[', '{'])
}
