//! Local media files, ordered by creation time.

use std::{
    path::{Path, PathBuf},
    time::SystemTime,
};

use tracing::{debug, warn};

use crate::error::SyncError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Absolute path of the file.
    pub path: PathBuf,
    pub file_name: String,
    /// Creation time, or modification time where the platform has no
    /// creation time.
    pub created: SystemTime,
}

#[derive(Debug, Default)]
pub struct Inventory {
    /// Oldest first.
    pub entries: Vec<FileEntry>,
    /// Entries left out because their metadata could not be read.
    pub warnings: Vec<String>,
}

impl Inventory {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// List the regular files of `dir` with the given extension (case-insensitive,
/// without the leading dot), oldest first.
pub async fn list(dir: &Path, extension: &str) -> Result<Inventory, SyncError> {
    let fs_error = |source| SyncError::Filesystem {
        path: dir.to_path_buf(),
        source,
    };
    let root = tokio::fs::canonicalize(dir).await.map_err(fs_error)?;
    let mut reader = tokio::fs::read_dir(&root).await.map_err(fs_error)?;

    let mut inventory = Inventory::default();
    while let Some(entry) = reader.next_entry().await.map_err(fs_error)? {
        let path = entry.path();
        if !has_extension(&path, extension) {
            continue;
        }

        let metadata = match tokio::fs::metadata(&path).await {
            Ok(metadata) => metadata,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "cannot read file metadata, skipping");
                inventory
                    .warnings
                    .push(format!("{}: {err}", path.display()));
                continue;
            }
        };
        if !metadata.is_file() {
            continue;
        }

        let created = match metadata.created().or_else(|_| metadata.modified()) {
            Ok(time) => time,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "file has no usable timestamp, skipping");
                inventory
                    .warnings
                    .push(format!("{}: {err}", path.display()));
                continue;
            }
        };

        let file_name = entry.file_name().to_string_lossy().into_owned();
        inventory.entries.push(FileEntry {
            path,
            file_name,
            created,
        });
    }

    order_by_creation(&mut inventory.entries);
    debug!(dir = %root.display(), files = inventory.len(), "listed local files");
    Ok(inventory)
}

/// Stable: entries with equal timestamps keep their listing order.
pub fn order_by_creation(entries: &mut [FileEntry]) {
    entries.sort_by_key(|entry| entry.created);
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn entry(name: &str, secs: u64) -> FileEntry {
        FileEntry {
            path: PathBuf::from("/media").join(name),
            file_name: name.to_owned(),
            created: SystemTime::UNIX_EPOCH + Duration::from_secs(secs),
        }
    }

    #[test]
    fn ordering_is_stable_on_ties() {
        let mut entries = vec![entry("c", 30), entry("a", 10), entry("b2", 20), entry("b1", 20)];
        order_by_creation(&mut entries);
        let names: Vec<_> = entries.iter().map(|e| e.file_name.as_str()).collect();
        assert_eq!(names, ["a", "b2", "b1", "c"]);
    }

    #[test]
    fn extension_match_ignores_case() {
        assert!(has_extension(Path::new("/x/a.MKV"), "mkv"));
        assert!(has_extension(Path::new("/x/a.mkv"), "mkv"));
        assert!(!has_extension(Path::new("/x/a.mkv.part"), "mkv"));
        assert!(!has_extension(Path::new("/x/mkv"), "mkv"));
    }

    #[tokio::test]
    async fn lists_matching_files_oldest_first() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["first.mkv", "notes.txt", "second.MKV", "third.mkv"] {
            std::fs::write(dir.path().join(name), name).unwrap();
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        std::fs::create_dir(dir.path().join("folder.mkv")).unwrap();

        let inventory = list(dir.path(), "mkv").await.unwrap();
        let names: Vec<_> = inventory
            .entries
            .iter()
            .map(|e| e.file_name.as_str())
            .collect();
        assert_eq!(names, ["first.mkv", "second.MKV", "third.mkv"]);
        assert!(inventory.entries.iter().all(|e| e.path.is_absolute()));
        assert!(inventory.warnings.is_empty());
    }

    #[tokio::test]
    async fn missing_directory_is_a_filesystem_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = list(&dir.path().join("nope"), "mkv").await.unwrap_err();
        assert!(matches!(err, SyncError::Filesystem { .. }));
    }
}
