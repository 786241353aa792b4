//! Run summaries, printed for humans or serialized as one JSON document.

use std::fmt;

use cardsync_connect::NoteId;
use serde::Serialize;

use crate::{
    item::{PairItem, Stage, StageStatus},
    pairer::Mismatch,
};

pub const REPORT_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StageCounts {
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Never attempted because an earlier stage of the item failed.
    pub blocked: usize,
}

impl StageCounts {
    fn total(&self) -> usize {
        self.succeeded + self.skipped + self.failed + self.blocked
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StageReport {
    pub rename: StageCounts,
    pub copy: StageCounts,
    pub update: StageCounts,
}

impl StageReport {
    pub fn get(&self, stage: Stage) -> &StageCounts {
        match stage {
            Stage::Rename => &self.rename,
            Stage::Copy => &self.copy,
            Stage::Update => &self.update,
        }
    }

    fn get_mut(&mut self, stage: Stage) -> &mut StageCounts {
        match stage {
            Stage::Rename => &mut self.rename,
            Stage::Copy => &mut self.copy,
            Stage::Update => &mut self.update,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageFailure {
    pub index: usize,
    pub note_id: NoteId,
    pub file: String,
    pub stage: Stage,
    pub reason: String,
}

/// Outcome of one media run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub schema_version: u32,
    pub deck: String,
    pub dry_run: bool,
    pub files_found: usize,
    pub records_fetched: usize,
    pub records_excluded: usize,
    /// Notes whose token code was (re)generated during this run.
    pub tokens_generated: Option<usize>,
    pub matched: usize,
    pub mismatch: Option<Mismatch>,
    pub stages: StageReport,
    pub failures: Vec<StageFailure>,
    pub warnings: Vec<String>,
}

impl RunReport {
    pub fn new(deck: &str, dry_run: bool) -> Self {
        Self {
            schema_version: REPORT_SCHEMA_VERSION,
            deck: deck.to_owned(),
            dry_run,
            files_found: 0,
            records_fetched: 0,
            records_excluded: 0,
            tokens_generated: None,
            matched: 0,
            mismatch: None,
            stages: StageReport::default(),
            failures: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Called by the pipeline once a stage of `item` has settled.
    pub(crate) fn stage_finished(&mut self, item: &PairItem, stage: Stage, status: &StageStatus) {
        let counts = self.stages.get_mut(stage);
        match status {
            StageStatus::Succeeded => counts.succeeded += 1,
            StageStatus::Skipped => counts.skipped += 1,
            StageStatus::Failed(reason) => {
                counts.failed += 1;
                self.failures.push(StageFailure {
                    index: item.index,
                    note_id: item.record.record.id,
                    file: item.file.file_name.clone(),
                    stage,
                    reason: reason.clone(),
                });
            }
            StageStatus::Pending => counts.blocked += 1,
        }
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    /// Non-zero only when a stage failed outside a dry run.
    pub fn exit_code(&self) -> i32 {
        if self.has_failures() && !self.dry_run { 1 } else { 0 }
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = if self.dry_run { " (dry run)" } else { "" };
        writeln!(f, "Deck \"{}\"{mode}", self.deck)?;
        writeln!(
            f,
            "  files found: {}, records fetched: {} ({} excluded), pairs: {}",
            self.files_found, self.records_fetched, self.records_excluded, self.matched
        )?;
        if let Some(generated) = self.tokens_generated {
            writeln!(f, "  token codes generated: {generated}")?;
        }
        if let Some(mismatch) = &self.mismatch {
            writeln!(f, "  mismatch: {mismatch}")?;
        }
        for stage in Stage::ALL {
            let counts = self.stages.get(stage);
            if counts.total() == 0 {
                continue;
            }
            writeln!(
                f,
                "  {stage:<7} succeeded {}, skipped {}, failed {}, blocked {}",
                counts.succeeded, counts.skipped, counts.failed, counts.blocked
            )?;
        }
        for failure in &self.failures {
            writeln!(
                f,
                "  ! #{} {} (note {}) {}: {}",
                failure.index, failure.file, failure.note_id, failure.stage, failure.reason
            )?;
        }
        for warning in &self.warnings {
            writeln!(f, "  warning: {warning}")?;
        }
        Ok(())
    }
}

/// Outcome of the token, tag, deck and export workflows.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub schema_version: u32,
    pub workflow: &'static str,
    pub dry_run: bool,
    pub processed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub excluded: usize,
    pub failures: Vec<String>,
}

impl BatchReport {
    pub fn new(workflow: &'static str, dry_run: bool) -> Self {
        Self {
            schema_version: REPORT_SCHEMA_VERSION,
            workflow,
            dry_run,
            processed: 0,
            skipped: 0,
            failed: 0,
            excluded: 0,
            failures: Vec::new(),
        }
    }

    pub(crate) fn fail(&mut self, message: String) {
        self.failed += 1;
        self.failures.push(message);
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }

    pub fn exit_code(&self) -> i32 {
        if self.has_failures() && !self.dry_run { 1 } else { 0 }
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = if self.dry_run { " (dry run)" } else { "" };
        writeln!(
            f,
            "{}{mode}: processed {}, skipped {}, failed {}, excluded {}",
            self.workflow, self.processed, self.skipped, self.failed, self.excluded
        )?;
        for failure in &self.failures {
            writeln!(f, "  ! {failure}")?;
        }
        Ok(())
    }
}
