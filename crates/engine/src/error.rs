use std::{io, path::PathBuf};

use cardsync_connect::ConnectError;

/// Run-level failures. Per-record and per-stage problems are not errors at
/// this level; they are counted in the reports instead.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Bad source folder, missing or read-only copy directory, empty deck name.
    #[error("{0}")]
    Preparation(String),

    #[error("cannot read directory {path:?}: {source}")]
    Filesystem { path: PathBuf, source: io::Error },

    #[error("fetching notes of deck \"{deck}\" failed: {source}")]
    Fetch { deck: String, source: ConnectError },

    #[error("invalid input file {path:?}: {cause}")]
    Input { path: PathBuf, cause: String },

    #[error("cannot write {path:?}: {source}")]
    Output { path: PathBuf, source: io::Error },
}
