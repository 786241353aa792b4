use cardsync_connect::CardStore;
use tracing::{info, warn};

use crate::{error::SyncError, naming::tag_deck_name, report::BatchReport, settings::Settings};

/// Move every card tagged `tag` out of the source decks into a deck named
/// after the tag.
///
/// `processed` counts moved cards, `skipped` counts source decks without a
/// matching card, `failed` counts failed lookups and batches.
pub async fn run_move_tagged<S: CardStore + ?Sized>(
    store: &S,
    settings: &Settings,
    tag: &str,
    source_decks: &[String],
    dry_run: bool,
) -> Result<BatchReport, SyncError> {
    let tag = tag.trim();
    if tag.is_empty() {
        return Err(SyncError::Preparation("tag is empty".to_owned()));
    }
    let decks = if source_decks.is_empty() {
        settings.decks.source_decks.as_slice()
    } else {
        source_decks
    };
    let target = tag_deck_name(tag);
    let pause = settings.pacing.deck_delay();
    let batch_size = settings.decks.move_batch_size.max(1);

    let mut report = BatchReport::new("move-tagged", dry_run);
    info!(tag, target = %target, decks = decks.len(), "moving tagged cards");

    for (position, deck) in decks.iter().enumerate() {
        if position > 0 && !dry_run {
            tokio::time::sleep(pause).await;
        }

        let query = format!("deck:\"{deck}\" tag:\"{tag}\"");
        let cards = match store.find_cards(&query).await {
            Ok(cards) => cards,
            Err(err) => {
                warn!(deck = %deck, error = %err, "card lookup failed");
                report.fail(format!("deck {deck}: {err}"));
                continue;
            }
        };
        if cards.is_empty() {
            info!(deck = %deck, "no tagged cards");
            report.skipped += 1;
            continue;
        }

        if dry_run {
            info!(deck = %deck, cards = cards.len(), target = %target, "dry run: would move cards");
            report.processed += cards.len();
            continue;
        }

        tokio::time::sleep(pause).await;
        for batch in cards.chunks(batch_size) {
            match store.change_deck(batch, &target).await {
                Ok(()) => {
                    info!(deck = %deck, cards = batch.len(), target = %target, "moved batch");
                    report.processed += batch.len();
                }
                Err(err) => {
                    warn!(deck = %deck, cards = batch.len(), error = %err, "batch move failed");
                    report.fail(format!("deck {deck}, {} cards: {err}", batch.len()));
                }
            }
        }
    }
    Ok(report)
}
