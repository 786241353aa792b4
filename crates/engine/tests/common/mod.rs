#![allow(dead_code)]

use std::{
    collections::{HashMap, HashSet},
    path::Path,
    sync::Mutex,
    time::Duration,
};

use cardsync_connect::{Action, CardStore, ConnectError, NoteId};
use cardsync_engine::settings::{PacingSettings, Settings};
use serde_json::{Value, json};

/// In-memory card store. Field updates are applied to the stored notes so a
/// second run sees the result of the first.
#[derive(Default)]
pub struct MockStore {
    pub notes: Mutex<Vec<Value>>,
    pub cards: Mutex<HashMap<String, Vec<i64>>>,
    pub failing_notes: Mutex<HashSet<NoteId>>,
    pub calls: Mutex<Vec<(Action, Value)>>,
}

impl MockStore {
    pub fn with_notes(notes: Vec<Value>) -> Self {
        Self {
            notes: Mutex::new(notes),
            ..Self::default()
        }
    }

    pub fn fail_note(&self, id: NoteId) {
        self.failing_notes.lock().unwrap().insert(id);
    }

    pub fn calls(&self) -> Vec<(Action, Value)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn mutations(&self) -> Vec<(Action, Value)> {
        self.calls()
            .into_iter()
            .filter(|(action, _)| action.is_mutation())
            .collect()
    }

    pub fn field(&self, id: NoteId, field: &str) -> Option<String> {
        self.notes
            .lock()
            .unwrap()
            .iter()
            .find(|note| note["noteId"] == id)
            .and_then(|note| note["fields"][field]["value"].as_str().map(str::to_owned))
    }

    fn apply_fields(&self, params: &Value) {
        let id = &params["note"]["id"];
        let Some(fields) = params["note"]["fields"].as_object() else {
            return;
        };
        let mut notes = self.notes.lock().unwrap();
        if let Some(note) = notes.iter_mut().find(|note| &note["noteId"] == id) {
            for (name, value) in fields {
                note["fields"][name] = json!({ "value": value, "order": 0 });
            }
        }
    }
}

#[async_trait::async_trait]
impl CardStore for MockStore {
    async fn invoke(&self, action: Action, params: Value) -> Result<Value, ConnectError> {
        self.calls.lock().unwrap().push((action, params.clone()));

        match action {
            Action::NotesInfo => Ok(Value::Array(self.notes.lock().unwrap().clone())),
            Action::FindCards => {
                let query = params["query"].as_str().unwrap_or_default();
                let cards = self.cards.lock().unwrap().get(query).cloned().unwrap_or_default();
                Ok(json!(cards))
            }
            Action::UpdateNoteFields | Action::UpdateNote => {
                let id = params["note"]["id"].as_i64().unwrap_or_default();
                if self.failing_notes.lock().unwrap().contains(&id) {
                    return Err(ConnectError::Remote {
                        action,
                        message: "collection is not available".to_owned(),
                    });
                }
                self.apply_fields(&params);
                Ok(Value::Null)
            }
            Action::ReplaceTags | Action::ChangeDeck => Ok(Value::Null),
        }
    }
}

pub fn note(id: NoteId, tags: &[&str], token: &str) -> Value {
    json!({
        "noteId": id,
        "tags": tags,
        "fields": {
            "TokenNo": {"value": token, "order": 0},
            "Video": {"value": "", "order": 1}
        }
    })
}

pub fn fast_settings() -> Settings {
    Settings {
        pacing: PacingSettings {
            update_delay_ms: 0,
            initial_delay_ms: 0,
            deck_delay_ms: 0,
        },
        ..Settings::default()
    }
}

/// Create files in order with a pause in between so their timestamps differ.
pub async fn create_files(dir: &Path, names: &[&str]) {
    for name in names {
        std::fs::write(dir.join(name), format!("video {name}")).unwrap();
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
}

pub fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
