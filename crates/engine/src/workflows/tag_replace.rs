use std::path::Path;

use cardsync_connect::{CardStore, NoteId};
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::{error::SyncError, pacing::Pacer, report::BatchReport, settings::Settings};

/// One entry of the input file: `{"noteId": 1, "chosenTag": "GI::Polity"}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagChoice {
    pub note_id: NoteId,
    pub chosen_tag: String,
}

/// Parse the input file. Entries without a note id or a tag are returned as
/// errors in place so they can be counted.
pub fn parse_choices(path: &Path, raw: &str) -> Result<Vec<Result<TagChoice, String>>, SyncError> {
    let entries: Vec<Value> = serde_json::from_str(raw).map_err(|err| SyncError::Input {
        path: path.to_path_buf(),
        cause: err.to_string(),
    })?;

    Ok(entries
        .into_iter()
        .map(|entry| {
            let preview = entry.to_string();
            match serde_json::from_value::<TagChoice>(entry) {
                Ok(choice) if choice.note_id != 0 && !choice.chosen_tag.trim().is_empty() => {
                    Ok(choice)
                }
                _ => Err(format!("invalid entry {preview}")),
            }
        })
        .collect())
}

/// Replace `tag` (default: the generic tag from the settings) on each listed
/// note with the note's chosen tag.
pub async fn run_replace_tags<S: CardStore + ?Sized>(
    store: &S,
    settings: &Settings,
    input: &Path,
    tag: Option<&str>,
    dry_run: bool,
) -> Result<BatchReport, SyncError> {
    let raw = tokio::fs::read_to_string(input)
        .await
        .map_err(|err| SyncError::Input {
            path: input.to_path_buf(),
            cause: err.to_string(),
        })?;
    let choices = parse_choices(input, &raw)?;
    let generic = tag.unwrap_or(settings.decks.generic_tag.as_str());

    let mut report = BatchReport::new("replace-tags", dry_run);
    if choices.is_empty() {
        info!(input = %input.display(), "no entries in input file");
        return Ok(report);
    }

    if !dry_run {
        tokio::time::sleep(settings.pacing.initial_delay()).await;
    }
    let mut pacer = if dry_run {
        Pacer::disabled()
    } else {
        Pacer::new(settings.pacing.update_delay(), false)
    };

    for choice in choices {
        let choice = match choice {
            Ok(choice) => choice,
            Err(reason) => {
                warn!(%reason, "skipping input entry");
                report.excluded += 1;
                continue;
            }
        };

        if dry_run {
            info!(note_id = choice.note_id, from = generic, to = %choice.chosen_tag, "dry run: would replace tag");
            report.processed += 1;
            continue;
        }

        pacer.ready().await;
        match store
            .replace_tags(&[choice.note_id], generic, &choice.chosen_tag)
            .await
        {
            Ok(()) => {
                info!(note_id = choice.note_id, to = %choice.chosen_tag, "tag replaced");
                report.processed += 1;
            }
            Err(err) => {
                warn!(note_id = choice.note_id, error = %err, "tag replacement failed");
                report.fail(format!("note {}: {err}", choice.note_id));
            }
        }
    }
    Ok(report)
}
