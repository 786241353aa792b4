use std::path::{Path, PathBuf};

use cardsync_connect::CardStore;
use tracing::{info, warn};

use crate::{
    error::SyncError,
    fetcher::{Fetched, KeyedRecord, Record, RecordFetcher, key_records},
    inventory,
    naming::deck_name_from_input,
    pairer::{PairLayout, pair},
    pipeline::{MutationPipeline, PipelineOptions},
    report::RunReport,
    settings::Settings,
    token::TokenCodeGenerator,
};

const WRITE_PROBE: &str = ".cardsync-write-probe";

/// One invocation of the media pipeline.
#[derive(Debug, Clone)]
pub struct MediaJob {
    pub folder: PathBuf,
    /// Raw deck input; `Prelims::165` is turned into `Prelims-165`.
    pub deck: String,
    /// Overrides `media.copy_dir` from the settings.
    pub copy_dir: Option<PathBuf>,
    pub dry_run: bool,
    /// Name files after freshly generated token codes instead of the stored
    /// key field.
    pub generate_tokens: bool,
    /// Overrides `media.continue_on_copy_failure` when set.
    pub stop_on_copy_failure: bool,
}

/// Pair the files of `job.folder` with the notes of the deck and run every
/// pair through rename, copy and note update.
pub async fn run_media<S: CardStore + ?Sized>(
    store: &S,
    settings: &Settings,
    job: &MediaJob,
) -> Result<RunReport, SyncError> {
    let deck = deck_name_from_input(&job.deck)
        .ok_or_else(|| SyncError::Preparation("deck name is empty".to_owned()))?;
    let copy_dir = job
        .copy_dir
        .clone()
        .or_else(|| settings.media.copy_dir.clone())
        .ok_or_else(|| {
            SyncError::Preparation(
                "no copy directory: pass --copy-dir or set media.copy_dir".to_owned(),
            )
        })?;
    prepare(&job.folder, &copy_dir, job.dry_run).await?;

    let media = &settings.media;
    let fetcher = RecordFetcher::new(store);
    let (fetched, listed) = tokio::join!(
        fetcher.fetch(&deck),
        inventory::list(&job.folder, media.extension())
    );
    let fetched = fetched?;
    let listed = listed?;

    let mut report = RunReport::new(&deck, job.dry_run);
    report.files_found = listed.len();
    report.warnings = listed.warnings;

    let keyed = if job.generate_tokens {
        let keyed = keyed_by_generated_code(fetched, settings);
        report.tokens_generated = Some(keyed.items.len());
        keyed
    } else {
        key_records(fetched, &media.key_field)
    };
    report.records_fetched = keyed.items.len() + keyed.excluded;
    report.records_excluded = keyed.excluded;

    let no_records = keyed.items.is_empty();
    let no_files = listed.entries.is_empty();
    let layout = PairLayout {
        extension: media.extension().to_owned(),
        copy_dir,
        payload_template: media.payload_template.clone(),
    };
    let mut pairing = pair(listed.entries, keyed.items, &layout);
    report.matched = pairing.matched;
    report.mismatch = pairing.mismatch;

    if no_records {
        warn!(deck = %deck, "no usable notes in deck, nothing to do");
        return Ok(report);
    }
    if no_files {
        warn!(folder = %job.folder.display(), "no matching files in folder, nothing to do");
        return Ok(report);
    }

    let options = PipelineOptions {
        dry_run: job.dry_run,
        update_field: media.update_field.clone(),
        continue_on_copy_failure: media.continue_on_copy_failure && !job.stop_on_copy_failure,
        update_delay: settings.pacing.update_delay(),
        delay_before_first: media.delay_before_first,
    };
    info!(deck = %deck, pairs = pairing.matched, dry_run = job.dry_run, "starting pipeline");
    MutationPipeline::new(store, options)
        .run(&mut pairing.items, &mut report)
        .await;

    Ok(report)
}

/// Key records by the code generated from their tags; rejected records count
/// as excluded.
fn keyed_by_generated_code(fetched: Fetched<Record>, settings: &Settings) -> Fetched<KeyedRecord> {
    let generation = TokenCodeGenerator::new(&settings.tokens).generate(&fetched.items);
    let mut keyed = Fetched {
        items: Vec::with_capacity(generation.tokens.len()),
        excluded: fetched.excluded + generation.errored(),
    };
    let mut codes = generation.tokens.into_iter().peekable();
    for record in fetched.items {
        if codes.peek().is_some_and(|token| token.note_id == record.id) {
            if let Some(token) = codes.next() {
                keyed.items.push(KeyedRecord {
                    token: token.code.to_string(),
                    record,
                });
            }
        }
    }
    keyed
}

async fn prepare(folder: &Path, copy_dir: &Path, dry_run: bool) -> Result<(), SyncError> {
    match tokio::fs::metadata(folder).await {
        Ok(meta) if meta.is_dir() => {}
        Ok(_) => {
            return Err(SyncError::Preparation(format!(
                "source folder {} is not a directory",
                folder.display()
            )));
        }
        Err(err) => {
            return Err(SyncError::Preparation(format!(
                "source folder {} is not accessible: {err}",
                folder.display()
            )));
        }
    }

    match tokio::fs::metadata(copy_dir).await {
        Ok(meta) if meta.is_dir() => {}
        Ok(_) => {
            return Err(SyncError::Preparation(format!(
                "copy directory {} is not a directory",
                copy_dir.display()
            )));
        }
        Err(err) => {
            return Err(SyncError::Preparation(format!(
                "copy directory {} is not accessible: {err}",
                copy_dir.display()
            )));
        }
    }

    if !dry_run {
        let probe = copy_dir.join(WRITE_PROBE);
        tokio::fs::write(&probe, b"").await.map_err(|err| {
            SyncError::Preparation(format!(
                "copy directory {} is not writable: {err}",
                copy_dir.display()
            ))
        })?;
        if let Err(err) = tokio::fs::remove_file(&probe).await {
            warn!(path = %probe.display(), error = %err, "cannot remove write probe");
        }
    }
    Ok(())
}
