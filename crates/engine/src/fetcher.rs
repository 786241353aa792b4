//! Records of one deck, fetched in store order.

use std::collections::{BTreeMap, HashSet};

use cardsync_connect::{CardStore, NoteId, deck_query};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::{error::SyncError, naming::sanitize_file_stem};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub id: NoteId,
    pub tags: Vec<String>,
    /// Field name → value.
    pub fields: BTreeMap<String, String>,
}

impl Record {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

/// A record together with the file-name token taken from its key field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyedRecord {
    pub record: Record,
    pub token: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fetched<T> {
    /// In the order the store returned them.
    pub items: Vec<T>,
    /// Entries left out (undecodable, missing id, duplicate, no key).
    pub excluded: usize,
}

impl<T> Default for Fetched<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            excluded: 0,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawNote {
    #[serde(default)]
    note_id: Option<NoteId>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    fields: BTreeMap<String, RawField>,
}

#[derive(Deserialize)]
struct RawField {
    #[serde(default)]
    value: String,
}

pub struct RecordFetcher<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S: CardStore + ?Sized> RecordFetcher<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// All valid notes of `deck`. A deck the store does not know yields
    /// nothing.
    pub async fn fetch(&self, deck: &str) -> Result<Fetched<Record>, SyncError> {
        let raw = self
            .store
            .notes_info(&deck_query(deck))
            .await
            .map_err(|source| SyncError::Fetch {
                deck: deck.to_owned(),
                source,
            })?;
        let fetched = decode_records(raw);
        info!(
            deck,
            records = fetched.items.len(),
            excluded = fetched.excluded,
            "fetched deck notes"
        );
        Ok(fetched)
    }

    /// Notes of `deck` carrying a usable value in `key_field`.
    pub async fn fetch_keyed(
        &self,
        deck: &str,
        key_field: &str,
    ) -> Result<Fetched<KeyedRecord>, SyncError> {
        let fetched = self.fetch(deck).await?;
        Ok(key_records(fetched, key_field))
    }
}

pub(crate) fn decode_records(raw: Vec<Value>) -> Fetched<Record> {
    let mut fetched = Fetched::default();
    let mut seen = HashSet::new();

    for (position, value) in raw.into_iter().enumerate() {
        let note: RawNote = match serde_json::from_value(value) {
            Ok(note) => note,
            Err(err) => {
                warn!(position, error = %err, "cannot decode note, skipping");
                fetched.excluded += 1;
                continue;
            }
        };
        let id = match note.note_id {
            Some(id) if id != 0 => id,
            _ => {
                warn!(position, "note without id, skipping");
                fetched.excluded += 1;
                continue;
            }
        };
        if !seen.insert(id) {
            warn!(note_id = id, position, "duplicate note id, skipping");
            fetched.excluded += 1;
            continue;
        }

        fetched.items.push(Record {
            id,
            tags: note.tags,
            fields: note
                .fields
                .into_iter()
                .map(|(name, field)| (name, field.value))
                .collect(),
        });
    }
    fetched
}

pub(crate) fn key_records(fetched: Fetched<Record>, key_field: &str) -> Fetched<KeyedRecord> {
    let mut keyed = Fetched {
        items: Vec::with_capacity(fetched.items.len()),
        excluded: fetched.excluded,
    };

    for record in fetched.items {
        let Some(raw) = record.field(key_field).filter(|v| !v.is_empty()) else {
            warn!(note_id = record.id, field = key_field, "note has no key value, skipping");
            keyed.excluded += 1;
            continue;
        };

        let token = sanitize_file_stem(raw);
        if token.is_empty() {
            warn!(note_id = record.id, raw, "key value is empty after sanitizing, skipping");
            keyed.excluded += 1;
            continue;
        }
        if token != raw.trim() {
            warn!(note_id = record.id, raw, sanitized = %token, "key value sanitized");
        } else {
            debug!(note_id = record.id, token = %token, "keyed note");
        }

        keyed.items.push(KeyedRecord { record, token });
    }
    keyed
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn note(id: Value, token: &str) -> Value {
        json!({
            "noteId": id,
            "tags": ["Prelims::10"],
            "fields": {
                "TokenNo": {"value": token, "order": 0},
                "Video": {"value": "", "order": 1}
            }
        })
    }

    #[test]
    fn decoding_keeps_order_and_excludes_invalid_entries() {
        let raw = vec![
            note(json!(30), "c"),
            note(json!(10), "a"),
            json!("not a note"),
            note(json!(0), "zero"),
            json!({"tags": []}),
            note(json!(30), "dup"),
            note(json!(20), "b"),
        ];

        let fetched = decode_records(raw);
        let ids: Vec<_> = fetched.items.iter().map(|r| r.id).collect();
        assert_eq!(ids, [30, 10, 20]);
        assert_eq!(fetched.excluded, 4);
        assert_eq!(fetched.items[0].field("TokenNo"), Some("c"));
        assert_eq!(fetched.items[0].tags, ["Prelims::10"]);
    }

    #[test]
    fn keying_sanitizes_and_drops_empty_tokens() {
        let fetched = decode_records(vec![
            note(json!(1), " 01-10-01-01 "),
            note(json!(2), ""),
            note(json!(3), "a/b"),
            note(json!(4), "  "),
            json!({"noteId": 5, "tags": [], "fields": {}}),
        ]);

        let keyed = key_records(fetched, "TokenNo");
        let tokens: Vec<_> = keyed
            .items
            .iter()
            .map(|k| (k.record.id, k.token.as_str()))
            .collect();
        assert_eq!(tokens, [(1, "01-10-01-01"), (3, "a_b")]);
        assert_eq!(keyed.excluded, 3);
    }

    #[test]
    fn keying_sanitizes_before_trimming() {
        let fetched = decode_records(vec![note(json!(1), "\tX"), note(json!(2), "Y\n")]);
        let keyed = key_records(fetched, "TokenNo");
        let tokens: Vec<_> = keyed.items.iter().map(|k| k.token.as_str()).collect();
        assert_eq!(tokens, ["_X", "Y_"]);
    }

    #[test]
    fn empty_fetch_defaults_without_item_bounds() {
        let fetched: Fetched<Record> = Fetched::default();
        assert!(fetched.items.is_empty());
        assert_eq!(fetched.excluded, 0);
    }
}
