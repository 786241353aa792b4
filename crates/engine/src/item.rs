use std::{
    fmt,
    path::{Path, PathBuf},
};

use serde::Serialize;

use crate::{fetcher::KeyedRecord, inventory::FileEntry};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Rename,
    Copy,
    Update,
}

impl Stage {
    pub const ALL: [Stage; 3] = [Stage::Rename, Stage::Copy, Stage::Update];

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Rename => "rename",
            Stage::Copy => "copy",
            Stage::Update => "update",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum StageStatus {
    #[default]
    Pending,
    Succeeded,
    Skipped,
    Failed(String),
}

impl StageStatus {
    /// Succeeded or skipped: later stages may run.
    pub fn is_done(&self) -> bool {
        matches!(self, StageStatus::Succeeded | StageStatus::Skipped)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, StageStatus::Failed(_))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemStatus {
    pub rename: StageStatus,
    pub copy: StageStatus,
    pub update: StageStatus,
}

impl ItemStatus {
    pub fn get(&self, stage: Stage) -> &StageStatus {
        match stage {
            Stage::Rename => &self.rename,
            Stage::Copy => &self.copy,
            Stage::Update => &self.update,
        }
    }

    pub(crate) fn set(&mut self, stage: Stage, status: StageStatus) {
        match stage {
            Stage::Rename => self.rename = status,
            Stage::Copy => self.copy = status,
            Stage::Update => self.update = status,
        }
    }
}

/// One file paired with one record, plus everything the stages need.
#[derive(Debug, Clone)]
pub struct PairItem {
    /// Position in both sorted lists.
    pub index: usize,
    pub file: FileEntry,
    pub record: KeyedRecord,
    /// `{token}.{extension}`.
    pub target_name: String,
    /// The file's own directory joined with `target_name`.
    pub target_path: PathBuf,
    /// Copy directory joined with `target_name`.
    pub copy_path: PathBuf,
    /// Value written to the update field.
    pub payload: String,
    pub(crate) current_path: PathBuf,
    pub(crate) status: ItemStatus,
}

impl PairItem {
    pub fn status(&self) -> &ItemStatus {
        &self.status
    }

    /// Where the file is now: the target path once renamed.
    pub fn current_path(&self) -> &Path {
        &self.current_path
    }
}
