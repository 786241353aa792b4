//! Positional pairing of sorted files with fetched records.
//!
//! There is no content matching: the i-th oldest file goes with the i-th
//! record in store order, and surplus entries on the longer side are left
//! alone.

use std::{fmt, path::PathBuf};

use serde::Serialize;
use tracing::warn;

use crate::{
    fetcher::KeyedRecord,
    inventory::FileEntry,
    item::{ItemStatus, PairItem},
};

#[derive(Debug, Clone)]
pub struct PairLayout {
    /// Without the leading dot.
    pub extension: String,
    pub copy_dir: PathBuf,
    /// `{name}` is replaced by the target file name.
    pub payload_template: String,
}

impl PairLayout {
    pub fn target_name(&self, token: &str) -> String {
        format!("{token}.{}", self.extension)
    }

    pub fn payload(&self, target_name: &str) -> String {
        self.payload_template.replace("{name}", target_name)
    }
}

/// The list that was cut short.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Files,
    Records,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Mismatch {
    pub files: usize,
    pub records: usize,
    pub truncated: Side,
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let surplus = self.files.abs_diff(self.records);
        let side = match self.truncated {
            Side::Files => "files",
            Side::Records => "records",
        };
        write!(
            f,
            "{} files vs {} records, {surplus} {side} left unpaired",
            self.files, self.records
        )
    }
}

#[derive(Debug)]
pub struct Pairing {
    pub items: Vec<PairItem>,
    pub matched: usize,
    pub mismatch: Option<Mismatch>,
}

pub fn pair(files: Vec<FileEntry>, records: Vec<KeyedRecord>, layout: &PairLayout) -> Pairing {
    let mismatch = match files.len().cmp(&records.len()) {
        std::cmp::Ordering::Equal => None,
        std::cmp::Ordering::Greater => Some(Side::Files),
        std::cmp::Ordering::Less => Some(Side::Records),
    }
    .map(|truncated| Mismatch {
        files: files.len(),
        records: records.len(),
        truncated,
    });
    if let Some(mismatch) = &mismatch {
        warn!(%mismatch, "file and record counts differ, pairing the shorter length");
    }

    let items: Vec<PairItem> = files
        .into_iter()
        .zip(records)
        .enumerate()
        .map(|(index, (file, record))| {
            let target_name = layout.target_name(&record.token);
            let target_path = file
                .path
                .parent()
                .map(|dir| dir.join(&target_name))
                .unwrap_or_else(|| PathBuf::from(&target_name));
            PairItem {
                index,
                copy_path: layout.copy_dir.join(&target_name),
                payload: layout.payload(&target_name),
                current_path: file.path.clone(),
                target_path,
                target_name,
                file,
                record,
                status: ItemStatus::default(),
            }
        })
        .collect();

    Pairing {
        matched: items.len(),
        items,
        mismatch,
    }
}
