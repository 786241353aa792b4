use std::collections::BTreeMap;

use serde_json::{Value, json};

use crate::{
    action::Action,
    client::AnkiConnect,
    error::ConnectError,
    transport::Transport,
};

pub type NoteId = i64;
pub type CardId = i64;

/// The operations the sync engine needs from a card store.
///
/// Only [`CardStore::invoke`] has to be provided; the typed helpers build the
/// parameter bags and decode the results on top of it.
#[async_trait::async_trait]
pub trait CardStore: Send + Sync {
    async fn invoke(&self, action: Action, params: Value) -> Result<Value, ConnectError>;

    /// Raw `notesInfo` entries for a search query, in the order returned.
    async fn notes_info(&self, query: &str) -> Result<Vec<Value>, ConnectError> {
        let result = self.invoke(Action::NotesInfo, json!({ "query": query })).await?;
        match result {
            Value::Null => Ok(Vec::new()),
            Value::Array(notes) => Ok(notes),
            other => Err(unexpected(Action::NotesInfo, "an array of notes", &other)),
        }
    }

    async fn find_cards(&self, query: &str) -> Result<Vec<CardId>, ConnectError> {
        let result = self.invoke(Action::FindCards, json!({ "query": query })).await?;
        if result.is_null() {
            return Ok(Vec::new());
        }
        serde_json::from_value(result).map_err(|e| ConnectError::MalformedResponse {
            action: Action::FindCards,
            cause: e.to_string(),
        })
    }

    async fn update_note_fields(
        &self,
        note: NoteId,
        fields: &BTreeMap<String, String>,
    ) -> Result<(), ConnectError> {
        self.invoke(
            Action::UpdateNoteFields,
            json!({ "note": { "id": note, "fields": fields } }),
        )
        .await?;
        Ok(())
    }

    async fn update_note(
        &self,
        note: NoteId,
        fields: &BTreeMap<String, String>,
    ) -> Result<(), ConnectError> {
        self.invoke(
            Action::UpdateNote,
            json!({ "note": { "id": note, "fields": fields } }),
        )
        .await?;
        Ok(())
    }

    async fn replace_tags(
        &self,
        notes: &[NoteId],
        tag_to_replace: &str,
        replace_with_tag: &str,
    ) -> Result<(), ConnectError> {
        self.invoke(
            Action::ReplaceTags,
            json!({
                "notes": notes,
                "tag_to_replace": tag_to_replace,
                "replace_with_tag": replace_with_tag,
            }),
        )
        .await?;
        Ok(())
    }

    async fn change_deck(&self, cards: &[CardId], deck: &str) -> Result<(), ConnectError> {
        self.invoke(Action::ChangeDeck, json!({ "cards": cards, "deck": deck }))
            .await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl<T: Transport> CardStore for AnkiConnect<T> {
    async fn invoke(&self, action: Action, params: Value) -> Result<Value, ConnectError> {
        self.request(action, params).await
    }
}

fn unexpected(action: Action, expected: &str, got: &Value) -> ConnectError {
    let preview: String = got.to_string().chars().take(120).collect();
    ConnectError::MalformedResponse {
        action,
        cause: format!("expected {expected}, got {preview}"),
    }
}
