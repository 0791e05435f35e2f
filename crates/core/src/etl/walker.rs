//! File discovery and the per-file transaction loop

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, info_span, warn};

use super::config::{FileErrorPolicy, LoadMode};
use super::error::EtlError;
use super::loader::{process_log_file, process_song_file};
use super::progress::LoadProgress;
use super::stats::LoadStats;
use crate::store::Store;

/// A discovered input file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredFile {
    pub path: PathBuf,
    /// File size in bytes
    pub size: u64,
}

/// Which loader a directory's files go through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Song,
    Log,
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileKind::Song => write!(f, "song"),
            FileKind::Log => write!(f, "log"),
        }
    }
}

/// Find the files under `root` matching `pattern`, sorted by path
///
/// A relative pattern is matched below `root`; `**` descends into
/// subdirectories. Unreadable entries are logged and skipped.
pub fn discover_files(root: &Path, pattern: &str) -> Result<Vec<DiscoveredFile>, EtlError> {
    if !root.is_dir() {
        return Err(EtlError::DirectoryNotFound(root.to_path_buf()));
    }

    let full_pattern = if Path::new(pattern).is_absolute() {
        pattern.to_string()
    } else {
        root.join(pattern).display().to_string()
    };

    let entries = glob::glob(&full_pattern)
        .map_err(|e| EtlError::InvalidPattern(format!("{}: {}", pattern, e)))?;

    let mut files = Vec::new();
    for entry in entries {
        match entry {
            Ok(path) => {
                if path.is_file() {
                    let metadata = fs::metadata(&path)?;
                    files.push(DiscoveredFile {
                        path,
                        size: metadata.len(),
                    });
                }
            }
            Err(e) => {
                warn!("Error accessing path: {}", e);
            }
        }
    }

    files.sort_by(|a, b| a.path.cmp(&b.path));

    Ok(files)
}

/// Settings for one pass over a directory
#[derive(Debug, Clone)]
pub struct DirectoryPass<'a> {
    pub root: &'a Path,
    pub pattern: &'a str,
    pub kind: FileKind,
    pub mode: LoadMode,
    pub page_size: usize,
    pub on_file_error: FileErrorPolicy,
    pub progress: bool,
}

/// Load every file of a directory, one transaction per file
///
/// A file that fails is rolled back. Under [`FileErrorPolicy::Skip`] its error
/// is recorded and the pass goes on; under [`FileErrorPolicy::Abort`], or when
/// the error came from the store, the pass stops with that error. Files
/// committed before the failure stay committed.
pub fn process_directory<S: Store + ?Sized>(
    store: &mut S,
    pass: &DirectoryPass<'_>,
) -> Result<LoadStats, EtlError> {
    let _span = info_span!("directory_pass", kind = %pass.kind, root = %pass.root.display())
        .entered();
    let start = std::time::Instant::now();

    let files = discover_files(pass.root, pass.pattern)?;
    info!("{} files found in {}", files.len(), pass.root.display());

    let mut stats = LoadStats::new();
    stats.files_found = files.len();

    let progress = LoadProgress::new(files.len() as u64, &pass.kind.to_string(), pass.progress);

    for (i, file) in files.iter().enumerate() {
        let _file_span = info_span!("file", path = %file.path.display()).entered();

        store.begin()?;
        let result = match pass.kind {
            FileKind::Song => process_song_file(&mut *store, &file.path),
            FileKind::Log => process_log_file(&mut *store, &file.path, pass.mode, pass.page_size),
        };

        match result {
            Ok(file_stats) => {
                store.commit()?;
                stats.add_file(&file_stats, file.size);
                progress.inc_file();
                progress.update_songplays(stats.songplays_inserted as u64);
                debug!("{}/{} files processed", i + 1, files.len());
            }
            Err(e) => {
                let rolled_back = store.rollback();

                if e.is_fatal() || pass.on_file_error == FileErrorPolicy::Abort {
                    if let Err(rollback_error) = rolled_back {
                        warn!("Rollback failed: {}", rollback_error);
                    }
                    progress.finish_error(&format!("{} failed", file.path.display()));
                    return Err(e);
                }
                rolled_back?;

                warn!("Skipping {}: {}", file.path.display(), e);
                stats.files_failed += 1;
                stats.add_error(format!("{}: {}", file.path.display(), e));
                progress.skip_file(&file.path.display().to_string());
            }
        }
    }

    stats.duration = start.elapsed();
    progress.finish_success(&format!(
        "{}/{} {} files processed",
        stats.files_processed,
        stats.files_found,
        pass.kind
    ));
    info!(
        files = stats.files_processed,
        failed = stats.files_failed,
        songplays = stats.songplays_inserted,
        duration_ms = stats.duration.as_millis() as u64,
        "Directory pass completed"
    );

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::TempDir;

    fn touch(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        let mut file = File::create(path).unwrap();
        writeln!(file, "{}", content).unwrap();
    }

    #[test]
    fn test_discover_files_recursive_and_sorted() {
        let dir = TempDir::new().unwrap();
        touch(&dir.path().join("B/b.json"), "{}");
        touch(&dir.path().join("A/B/a.json"), "{}");
        touch(&dir.path().join("top.json"), "{}");
        touch(&dir.path().join("notes.txt"), "ignored");

        let files = discover_files(dir.path(), "**/*.json").unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|f| f.path.strip_prefix(dir.path()).unwrap().to_path_buf())
            .collect();

        assert_eq!(
            names,
            vec![
                PathBuf::from("A/B/a.json"),
                PathBuf::from("B/b.json"),
                PathBuf::from("top.json"),
            ]
        );
        assert!(files.iter().all(|f| f.size > 0));
    }

    #[test]
    fn test_discover_missing_directory() {
        let dir = TempDir::new().unwrap();
        let result = discover_files(&dir.path().join("missing"), "**/*.json");
        assert!(matches!(result, Err(EtlError::DirectoryNotFound(_))));
    }

    #[test]
    fn test_discover_invalid_pattern() {
        let dir = TempDir::new().unwrap();
        let result = discover_files(dir.path(), "[");
        assert!(matches!(result, Err(EtlError::InvalidPattern(_))));
    }

    #[test]
    fn test_discover_empty_directory() {
        let dir = TempDir::new().unwrap();
        assert!(discover_files(dir.path(), "**/*.json").unwrap().is_empty());
    }
}
