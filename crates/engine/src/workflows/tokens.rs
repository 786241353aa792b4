use std::collections::BTreeMap;

use cardsync_connect::CardStore;
use tracing::{info, warn};

use crate::{
    error::SyncError,
    fetcher::RecordFetcher,
    naming::deck_name_from_input,
    pacing::Pacer,
    report::BatchReport,
    settings::Settings,
    token::TokenCodeGenerator,
};

/// Generate token codes for the notes of `deck` and store the changed ones
/// with `updateNote`.
pub async fn run_tokens<S: CardStore + ?Sized>(
    store: &S,
    settings: &Settings,
    deck: &str,
    dry_run: bool,
) -> Result<BatchReport, SyncError> {
    let deck = deck_name_from_input(deck)
        .ok_or_else(|| SyncError::Preparation("deck name is empty".to_owned()))?;
    let fetched = RecordFetcher::new(store).fetch(&deck).await?;

    let scheme = &settings.tokens;
    let generation = TokenCodeGenerator::new(scheme).generate(&fetched.items);

    let mut report = BatchReport::new("tokens", dry_run);
    report.excluded = fetched.excluded + generation.errored();
    report.skipped = generation.skipped();

    if dry_run {
        for token in generation.pending_updates() {
            info!(note_id = token.note_id, code = %token.code, "dry run: would store token code");
            report.processed += 1;
        }
        return Ok(report);
    }

    if generation.processed() == 0 {
        info!(deck = %deck, "all token codes up to date");
        return Ok(report);
    }

    tokio::time::sleep(settings.pacing.initial_delay()).await;
    let mut pacer = Pacer::new(settings.pacing.update_delay(), false);
    for token in generation.pending_updates() {
        pacer.ready().await;
        let code = token.code.to_string();
        let fields = BTreeMap::from([(scheme.field.clone(), code.clone())]);
        match store.update_note(token.note_id, &fields).await {
            Ok(()) => {
                info!(note_id = token.note_id, code = %code, "token code stored");
                report.processed += 1;
            }
            Err(err) => {
                warn!(note_id = token.note_id, error = %err, "cannot store token code");
                report.fail(format!("note {}: {err}", token.note_id));
            }
        }
    }
    Ok(report)
}
