use std::path::Path;

use cardsync_connect::CardStore;
use serde_json::{Map, Value};
use tracing::info;

use crate::{
    error::SyncError,
    fetcher::{Record, RecordFetcher},
    naming::deck_name_from_input,
    report::BatchReport,
};

/// `{"noteId": .., "tags": [..], "<field>": "<value>", ..}`
pub fn flatten(record: &Record) -> Value {
    let mut object = Map::new();
    object.insert("noteId".to_owned(), Value::from(record.id));
    object.insert("tags".to_owned(), Value::from(record.tags.clone()));
    for (name, value) in &record.fields {
        if name == "noteId" || name == "tags" {
            continue;
        }
        object.insert(name.clone(), Value::from(value.as_str()));
    }
    Value::Object(object)
}

/// Write the notes of `deck` to `output` as a pretty-printed JSON array.
pub async fn run_export<S: CardStore + ?Sized>(
    store: &S,
    deck: &str,
    output: &Path,
) -> Result<BatchReport, SyncError> {
    let deck = deck_name_from_input(deck)
        .ok_or_else(|| SyncError::Preparation("deck name is empty".to_owned()))?;
    let fetched = RecordFetcher::new(store).fetch(&deck).await?;

    let notes: Vec<Value> = fetched.items.iter().map(flatten).collect();
    let encoded = serde_json::to_string_pretty(&notes).map_err(|err| SyncError::Output {
        path: output.to_path_buf(),
        source: err.into(),
    })?;
    tokio::fs::write(output, encoded)
        .await
        .map_err(|source| SyncError::Output {
            path: output.to_path_buf(),
            source,
        })?;
    info!(deck = %deck, notes = notes.len(), output = %output.display(), "exported notes");

    let mut report = BatchReport::new("export", false);
    report.processed = notes.len();
    report.excluded = fetched.excluded;
    Ok(report)
}
