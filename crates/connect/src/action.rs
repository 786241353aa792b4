use std::fmt;

/// AnkiConnect API version sent with every request.
pub const API_VERSION: u8 = 6;

/// Remote error substring meaning the queried deck does not exist.
pub const DECK_NOT_FOUND: &str = "deck was not found";
/// Remote error substrings meaning the mutated note or card no longer exists.
pub const ITEM_NOT_FOUND: [&str; 2] = ["note was not found", "card was not found"];

/// The AnkiConnect actions this workspace issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// Query the notes of a collection.
    NotesInfo,
    /// Query card ids matching a search.
    FindCards,
    /// Set a subset of fields on one note.
    UpdateNoteFields,
    /// Replace the fields (and optionally tags) of one note.
    UpdateNote,
    /// Swap one tag for another on a set of notes.
    ReplaceTags,
    /// Move a batch of cards to another deck.
    ChangeDeck,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Action::NotesInfo => "notesInfo",
            Action::FindCards => "findCards",
            Action::UpdateNoteFields => "updateNoteFields",
            Action::UpdateNote => "updateNote",
            Action::ReplaceTags => "replaceTags",
            Action::ChangeDeck => "changeDeck",
        }
    }

    /// Read-only actions; a missing deck yields an empty result for these.
    pub fn is_query(self) -> bool {
        matches!(self, Action::NotesInfo | Action::FindCards)
    }

    pub fn is_mutation(self) -> bool {
        !self.is_query()
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Builds the `deck:"<name>"` search used by the query actions.
pub fn deck_query(deck: &str) -> String {
    format!("deck:\"{deck}\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_and_mutation_are_disjoint() {
        for action in [
            Action::NotesInfo,
            Action::FindCards,
            Action::UpdateNoteFields,
            Action::UpdateNote,
            Action::ReplaceTags,
            Action::ChangeDeck,
        ] {
            assert_ne!(action.is_query(), action.is_mutation(), "{action}");
        }
    }

    #[test]
    fn wire_names_match_ankiconnect() {
        assert_eq!(Action::NotesInfo.to_string(), "notesInfo");
        assert_eq!(Action::UpdateNoteFields.to_string(), "updateNoteFields");
        assert_eq!(Action::ChangeDeck.to_string(), "changeDeck");
    }

    #[test]
    fn deck_query_quotes_name() {
        assert_eq!(deck_query("Prelims-165"), "deck:\"Prelims-165\"");
    }
}
