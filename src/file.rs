use std::path::{Path, PathBuf};

/// A file selected for the listing.
///
/// Ordering compares relative paths component by component, which is the
/// order used for the table of contents and the sections.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CandidateFile {
    /// Relative path from the root directory
    pub relative_path: PathBuf,

    /// Absolute path to the file
    pub absolute_path: PathBuf,
}

impl CandidateFile {
    /// Creates a new candidate.
    #[must_use]
    pub fn new(relative_path: impl Into<PathBuf>, absolute_path: impl Into<PathBuf>) -> Self {
        Self {
            relative_path: relative_path.into(),
            absolute_path: absolute_path.into(),
        }
    }

    /// Relative path with `/` separators, as printed in the document.
    #[must_use]
    pub fn display_path(&self) -> String {
        self.relative_path
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }

    /// File name component, falling back to the relative path.
    #[must_use]
    pub fn file_name(&self) -> &Path {
        self.relative_path
            .file_name()
            .map_or(self.relative_path.as_path(), Path::new)
    }
}

/// Decoded text of one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileContent {
    /// Decoded text with `\n` line endings
    pub text: String,

    /// Name of the encoding that produced `text`
    pub encoding: &'static str,

    /// True when no configured encoding fit and bytes were replaced
    pub degraded: bool,
}

impl FileContent {
    /// Creates content decoded cleanly with the named encoding.
    #[must_use]
    pub fn new(text: impl Into<String>, encoding: &'static str) -> Self {
        Self {
            text: text.into(),
            encoding,
            degraded: false,
        }
    }

    /// Creates content recovered with replacement characters.
    #[must_use]
    pub fn degraded(text: impl Into<String>, encoding: &'static str) -> Self {
        Self {
            text: text.into(),
            encoding,
            degraded: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_path_uses_forward_slashes() {
        let file = CandidateFile::new(
            Path::new("src").join("core").join("mod.rs"),
            "/repo/src/core/mod.rs",
        );
        assert_eq!(file.display_path(), "src/core/mod.rs");
        assert_eq!(file.file_name(), Path::new("mod.rs"));
    }

    #[test]
    fn test_ordering_is_component_wise() {
        let mut files = vec![
            CandidateFile::new("b/c.md", "/r/b/c.md"),
            CandidateFile::new("a.py", "/r/a.py"),
            CandidateFile::new("b-x.rs", "/r/b-x.rs"),
            CandidateFile::new("B.rs", "/r/B.rs"),
        ];
        files.sort();

        let order: Vec<_> = files.iter().map(CandidateFile::display_path).collect();
        // "b" sorts before "b-x.rs" as a component, uppercase before lowercase
        assert_eq!(order, vec!["B.rs", "a.py", "b/c.md", "b-x.rs"]);
    }

    #[test]
    fn test_file_content_flags() {
        assert!(!FileContent::new("x", "utf-8").degraded);
        assert!(FileContent::degraded("x", "utf-8 (with errors)").degraded);
    }
}
