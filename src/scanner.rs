use crate::{
    config::validate_root,
    error::{Error, Result},
    file::CandidateFile,
    filter::{FileFilter, SelectionPolicy},
};
use std::path::Path;
use tracing::{debug, trace, warn};
use walkdir::{DirEntry, WalkDir};

/// Statistics collected during selection.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct SelectStats {
    /// Directories pruned by the policy
    pub pruned_directories: usize,

    /// Regular files seen
    pub seen_files: usize,

    /// Files accepted
    pub selected_files: usize,

    /// Entries that could not be read
    pub errors: usize,
}

/// Walks a root directory and collects the files to list.
#[derive(Debug, Clone)]
pub(crate) struct Selector {
    filter: FileFilter,
}

impl Selector {
    /// Creates a selector from a policy.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the policy does not compile.
    pub(crate) fn new(policy: &SelectionPolicy) -> Result<Self> {
        Ok(Self {
            filter: FileFilter::new(policy)?,
        })
    }

    /// Selects every listable file under `root`, sorted by relative path.
    ///
    /// Excluded directories are never descended into. Symbolic links to
    /// directories are not followed; symbolic links to files are listed like
    /// regular files. Entries that cannot be read are logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `root` is missing or not a directory
    /// - No file passes the policy
    pub(crate) fn select(&self, root: &Path) -> Result<Vec<CandidateFile>> {
        validate_root(root)?;

        debug!("Starting scan of {}", root.display());
        let mut stats = SelectStats::default();
        let mut files = Vec::new();
        let mut pruned = 0;

        let walker = WalkDir::new(root)
            .follow_links(false)
            .into_iter()
            .filter_entry(|entry| {
                let prune = self.is_pruned(entry);
                if prune {
                    trace!("Pruning {}", entry.path().display());
                    pruned += 1;
                }
                !prune
            });

        for result in walker {
            let entry = match result {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Walk error: {}", e);
                    stats.errors += 1;
                    continue;
                }
            };

            if !is_listable(&entry) {
                continue;
            }
            stats.seen_files += 1;

            if !self.filter.includes_file(entry.path()) {
                trace!("Skipping {}", entry.path().display());
                continue;
            }

            let relative_path = pathdiff::diff_paths(entry.path(), root)
                .unwrap_or_else(|| entry.path().to_path_buf());
            files.push(CandidateFile::new(relative_path, entry.path()));
        }

        stats.selected_files = files.len();
        stats.pruned_directories = pruned;

        debug!(
            "Scan complete: {} seen, {} selected, {} pruned directories, {} errors",
            stats.seen_files, stats.selected_files, stats.pruned_directories, stats.errors
        );

        if files.is_empty() {
            return Err(Error::no_files(root));
        }

        // Component-wise ordering, so "a/b" sorts before "a.b"
        files.sort();
        Ok(files)
    }

    fn is_pruned(&self, entry: &DirEntry) -> bool {
        entry.depth() > 0
            && entry.file_type().is_dir()
            && self.filter.prunes_directory(entry.file_name())
    }
}

/// Regular files, and symbolic links that resolve to a regular file.
fn is_listable(entry: &DirEntry) -> bool {
    entry.file_type().is_file() || (entry.path_is_symlink() && entry.path().is_file())
}
