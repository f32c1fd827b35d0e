//! Path filtering for watch events.
//!
//! The watcher observes a whole directory but only cares about one file in
//! it. A [`FileFilter`] decides, per event path, whether the event concerns
//! the watched file.
//!
//! # Examples
//!
//! ```
//! use rf_watcher::{FileFilter, FileNameFilter};
//! use camino::Utf8Path;
//!
//! let filter = FileNameFilter::new("refuel.txt");
//!
//! assert!(filter.should_process(Utf8Path::new("/data/refuel.txt")));
//! assert!(!filter.should_process(Utf8Path::new("/data/refuel.txt.swp")));
//! assert!(!filter.should_process(Utf8Path::new("/data/other.txt")));
//! ```

use camino::Utf8Path;

/// A predicate over event paths.
///
/// Filters run on the blocking watcher thread, so they must be [`Send`],
/// [`Sync`] and `'static`.
pub trait FileFilter: Send + Sync + 'static {
    /// Returns `true` if an event on `path` should count as a change.
    fn should_process(&self, path: &Utf8Path) -> bool;
}

/// Accepts paths whose final component equals a given file name.
///
/// The comparison is exact and case-sensitive; the directory part of the
/// event path is not inspected (the watcher only sees one directory).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileNameFilter {
    file_name: String,
}

impl FileNameFilter {
    /// Creates a filter for `file_name`.
    #[must_use]
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
        }
    }

    /// The accepted file name.
    #[inline]
    #[must_use]
    pub fn file_name(&self) -> &str {
        &self.file_name
    }
}

impl FileFilter for FileNameFilter {
    #[inline]
    fn should_process(&self, path: &Utf8Path) -> bool {
        path.file_name() == Some(self.file_name.as_str())
    }
}
