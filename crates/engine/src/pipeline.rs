//! Rename → copy → remote update, one item at a time.
//!
//! A failed rename stops its item: copy and update stay pending and are
//! reported as blocked. Copy and update failures are recorded and the run
//! moves on. In a dry run nothing on disk or in the store is changed.

use std::{collections::BTreeMap, io, path::Path, time::Duration};

use cardsync_connect::CardStore;
use tracing::{debug, info, warn};

use crate::{
    item::{PairItem, Stage, StageStatus},
    pacing::Pacer,
    report::RunReport,
};

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub dry_run: bool,
    /// Note field receiving the payload.
    pub update_field: String,
    /// Run the update stage even when the copy failed.
    pub continue_on_copy_failure: bool,
    pub update_delay: Duration,
    pub delay_before_first: bool,
}

pub struct MutationPipeline<'a, S: ?Sized> {
    store: &'a S,
    options: PipelineOptions,
    pacer: Pacer,
}

impl<'a, S: CardStore + ?Sized> MutationPipeline<'a, S> {
    pub fn new(store: &'a S, options: PipelineOptions) -> Self {
        let pacer = if options.dry_run {
            Pacer::disabled()
        } else {
            Pacer::new(options.update_delay, options.delay_before_first)
        };
        Self {
            store,
            options,
            pacer,
        }
    }

    pub async fn run(&mut self, items: &mut [PairItem], report: &mut RunReport) {
        for item in items.iter_mut() {
            self.process(item, report).await;
        }
        info!(
            items = items.len(),
            failures = report.failures.len(),
            dry_run = self.options.dry_run,
            "pipeline finished"
        );
    }

    async fn process(&mut self, item: &mut PairItem, report: &mut RunReport) {
        let renamed = self.rename(item).await;
        settle(item, Stage::Rename, renamed, report);

        if !item.status.rename.is_done() {
            warn!(index = item.index, file = %item.file.file_name, "rename failed, item blocked");
            report.stage_finished(item, Stage::Copy, &StageStatus::Pending);
            report.stage_finished(item, Stage::Update, &StageStatus::Pending);
            return;
        }

        let copied = self.copy(item).await;
        settle(item, Stage::Copy, copied, report);

        if item.status.copy.is_failed() && !self.options.continue_on_copy_failure {
            report.stage_finished(item, Stage::Update, &StageStatus::Pending);
            return;
        }

        let updated = self.update(item).await;
        settle(item, Stage::Update, updated, report);
    }

    async fn rename(&self, item: &mut PairItem) -> StageStatus {
        if item.current_path == item.target_path {
            debug!(index = item.index, target = %item.target_name, "already named, skipping rename");
            return StageStatus::Skipped;
        }

        if self.options.dry_run {
            let taken = path_exists(&item.target_path).await.unwrap_or(false);
            info!(
                index = item.index,
                from = %item.current_path.display(),
                to = %item.target_path.display(),
                target_exists = taken,
                "dry run: would rename"
            );
            return StageStatus::Succeeded;
        }

        match path_exists(&item.target_path).await {
            Ok(true) => return StageStatus::Failed("target already exists".to_owned()),
            Ok(false) => {}
            Err(err) => return StageStatus::Failed(format!("cannot probe target: {err}")),
        }

        match tokio::fs::rename(&item.current_path, &item.target_path).await {
            Ok(()) => {
                info!(
                    index = item.index,
                    from = %item.current_path.display(),
                    to = %item.target_path.display(),
                    "renamed"
                );
                item.current_path = item.target_path.clone();
                StageStatus::Succeeded
            }
            Err(err) => StageStatus::Failed(format!("rename failed: {err}")),
        }
    }

    async fn copy(&self, item: &PairItem) -> StageStatus {
        if already_copied(&item.current_path, &item.copy_path).await {
            debug!(index = item.index, dest = %item.copy_path.display(), "already copied, skipping");
            return StageStatus::Skipped;
        }

        if self.options.dry_run {
            info!(
                index = item.index,
                from = %item.current_path.display(),
                to = %item.copy_path.display(),
                "dry run: would copy"
            );
            return StageStatus::Succeeded;
        }

        match tokio::fs::copy(&item.current_path, &item.copy_path).await {
            Ok(bytes) => {
                info!(index = item.index, dest = %item.copy_path.display(), bytes, "copied");
                StageStatus::Succeeded
            }
            Err(err) => StageStatus::Failed(format!("copy failed: {err}")),
        }
    }

    async fn update(&mut self, item: &PairItem) -> StageStatus {
        let field = self.options.update_field.as_str();
        let note_id = item.record.record.id;

        if item.record.record.field(field) == Some(item.payload.as_str()) {
            debug!(index = item.index, note_id, field, "field already holds payload, skipping");
            return StageStatus::Skipped;
        }

        if self.options.dry_run {
            info!(index = item.index, note_id, field, payload = %item.payload, "dry run: would update note");
            return StageStatus::Succeeded;
        }

        self.pacer.ready().await;
        let fields = BTreeMap::from([(field.to_owned(), item.payload.clone())]);
        match self.store.update_note_fields(note_id, &fields).await {
            Ok(()) => {
                info!(index = item.index, note_id, field, payload = %item.payload, "note updated");
                StageStatus::Succeeded
            }
            Err(err) => StageStatus::Failed(err.to_string()),
        }
    }
}

fn settle(item: &mut PairItem, stage: Stage, status: StageStatus, report: &mut RunReport) {
    if let StageStatus::Failed(reason) = &status {
        warn!(index = item.index, file = %item.file.file_name, %stage, %reason, "stage failed");
    }
    report.stage_finished(item, stage, &status);
    item.status.set(stage, status);
}

async fn path_exists(path: &Path) -> io::Result<bool> {
    tokio::fs::try_exists(path).await
}

/// A destination of the same length written no earlier than the source was
/// last modified counts as the copy. Contents are not compared, and an older
/// file of the same size is copied over.
async fn already_copied(source: &Path, dest: &Path) -> bool {
    let (Ok(source), Ok(dest)) = (tokio::fs::metadata(source).await, tokio::fs::metadata(dest).await)
    else {
        return false;
    };
    if !dest.is_file() || source.len() != dest.len() {
        return false;
    }
    match (source.modified(), dest.modified()) {
        (Ok(source), Ok(dest)) => dest >= source,
        _ => true,
    }
}
