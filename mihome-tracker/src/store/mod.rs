//! Persisted scan results.
//!
//! Three plain-text files make up the feed:
//!
//! | File | Content |
//! |------|---------|
//! | cumulative list | `"<version> <packageUrl>"` per line, newest first |
//! | cursor | highest build number processed, decimal, no newline |
//! | latest pointer | package URL of the newest version, no newline |
//!
//! The files are read once before a scan ([`ResultStore::load`]) and written
//! at most once after it ([`ResultStore::apply`]). Deciding *what* to write is
//! a pure function ([`merge`]) so the policies can be tested without disk.

mod merge;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::version::{BundleVersion, VersionRecord};

pub use merge::{merge, MergePlan, MergePolicy};

/// Default cumulative list filename.
pub const DEFAULT_ALL_FILE: &str = "MiHome-iOS.all.txt";

/// Default cursor filename.
pub const DEFAULT_CURSOR_FILE: &str = "MiHome-iOS.cache.txt";

/// Default latest pointer filename.
pub const DEFAULT_LATEST_FILE: &str = "MiHome-iOS.latest.txt";

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Local filesystem or content errors. All of them are fatal for a run.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Failed to read a store file.
    #[error("failed to read {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },

    /// Failed to write a store file.
    #[error("failed to write {}: {source}", path.display())]
    Write { path: PathBuf, source: io::Error },

    /// A line of the cumulative list has an unparseable version.
    #[error("{}:{line}: {reason}", path.display())]
    InvalidRecord {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    /// The cursor file does not hold a build number.
    #[error("cursor file {} holds {value:?}, expected a build number", path.display())]
    InvalidCursor { path: PathBuf, value: String },
}

/// Locations of the three store files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorePaths {
    pub all: PathBuf,
    pub cursor: PathBuf,
    pub latest: PathBuf,
}

impl StorePaths {
    /// Default filenames inside `dir`.
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            all: dir.join(DEFAULT_ALL_FILE),
            cursor: dir.join(DEFAULT_CURSOR_FILE),
            latest: dir.join(DEFAULT_LATEST_FILE),
        }
    }
}

/// Store contents as read at the start of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreState {
    /// Parsed cumulative list, in file order.
    pub records: Vec<VersionRecord>,
    /// Cumulative list exactly as read, for verbatim prepending and change
    /// detection.
    pub all_content: String,
    /// Highest build processed so far; 0 when there is no cursor file.
    pub cursor: u64,
    /// Current latest pointer, if any.
    pub latest: Option<String>,
}

impl StoreState {
    /// First record of the cumulative list.
    pub fn top(&self) -> Option<&VersionRecord> {
        self.records.first()
    }
}

/// Reads and writes the store files.
#[derive(Debug, Clone)]
pub struct ResultStore {
    paths: StorePaths,
}

impl ResultStore {
    /// Create a store over the given paths.
    pub fn new(paths: StorePaths) -> Self {
        Self { paths }
    }

    /// Store file locations.
    pub fn paths(&self) -> &StorePaths {
        &self.paths
    }

    /// Read all three files. Missing files are treated as empty.
    pub fn load(&self) -> StoreResult<StoreState> {
        let all_content = read_optional(&self.paths.all)?.unwrap_or_default();
        let records = parse_records(&self.paths.all, &all_content)?;
        let cursor = self.load_cursor()?;
        let latest = read_optional(&self.paths.latest)?
            .and_then(|content| first_line(&content).map(str::to_string));

        debug!(
            records = records.len(),
            cursor,
            latest = latest.as_deref().unwrap_or("-"),
            "loaded store"
        );

        Ok(StoreState {
            records,
            all_content,
            cursor,
            latest,
        })
    }

    fn load_cursor(&self) -> StoreResult<u64> {
        let content = match read_optional(&self.paths.cursor)? {
            Some(content) => content,
            None => return Ok(0),
        };

        match first_line(&content) {
            None => Ok(0),
            Some(value) => value.parse().map_err(|_| StoreError::InvalidCursor {
                path: self.paths.cursor.clone(),
                value: value.to_string(),
            }),
        }
    }

    /// Write the files a plan marks as changed. Returns how many were written.
    pub fn apply(&self, plan: &MergePlan) -> StoreResult<usize> {
        let mut written = 0;

        if let Some(ref content) = plan.all {
            write_file(&self.paths.all, content)?;
            written += 1;
        }
        if let Some(cursor) = plan.cursor {
            write_file(&self.paths.cursor, &cursor.to_string())?;
            written += 1;
        }
        if let Some(ref latest) = plan.latest {
            write_file(&self.paths.latest, latest)?;
            written += 1;
        }

        if written > 0 {
            info!(files = written, "store updated");
        }
        Ok(written)
    }
}

/// Render records as cumulative list content, one terminated line each.
pub fn render_records<'a>(records: impl IntoIterator<Item = &'a VersionRecord>) -> String {
    records.into_iter().fold(String::new(), |mut out, record| {
        out.push_str(&record.to_line());
        out.push('\n');
        out
    })
}

fn parse_records(path: &Path, content: &str) -> StoreResult<Vec<VersionRecord>> {
    let mut records = Vec::new();

    for (index, line) in content.lines().enumerate() {
        let mut fields = line.split_whitespace();
        let (version, url) = match (fields.next(), fields.next()) {
            (Some(version), Some(url)) => (version, url),
            (None, _) => continue,
            (Some(_), None) => {
                warn!(path = %path.display(), line = index + 1, "skipping incomplete record");
                continue;
            }
        };

        let version =
            version
                .parse::<BundleVersion>()
                .map_err(|e| StoreError::InvalidRecord {
                    path: path.to_path_buf(),
                    line: index + 1,
                    reason: e.to_string(),
                })?;
        records.push(VersionRecord::new(version, url));
    }

    Ok(records)
}

fn first_line(content: &str) -> Option<&str> {
    content
        .lines()
        .next()
        .map(str::trim)
        .filter(|line| !line.is_empty())
}

fn read_optional(path: &Path) -> StoreResult<Option<String>> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(StoreError::Read {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

fn write_file(path: &Path, content: &str) -> StoreResult<()> {
    let write_error = |source| StoreError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(write_error)?;
    }
    fs::write(path, content).map_err(write_error)?;
    debug!(path = %path.display(), bytes = content.len(), "wrote store file");
    Ok(())
}
