//! Name transforms shared by the workflows.

const ILLEGAL_FILE_CHARS: [char; 9] = ['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Deck name used when a tag sanitizes to nothing.
pub const FALLBACK_TAG_DECK: &str = "Tagged-Cards-Deck";

/// Replace characters that are illegal in file names (and control
/// characters) with `_`, then trim.
pub fn sanitize_file_stem(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if ILLEGAL_FILE_CHARS.contains(&c) || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect::<String>()
        .trim()
        .to_owned()
}

/// Turn command-line deck input into a deck name.
///
/// `Prelims::165` becomes `Prelims-165`; anything that is not
/// `<prefix>::<digits>` is used as given after trimming. Returns `None` when
/// nothing is left.
pub fn deck_name_from_input(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Some((prefix, number)) = trimmed.rsplit_once("::") {
        if !prefix.is_empty() && !number.is_empty() && number.chars().all(|c| c.is_ascii_digit())
        {
            return Some(format!("{prefix}-{number}"));
        }
    }

    Some(trimmed.to_owned())
}

/// Deck name derived from a tag when moving tagged cards.
pub fn tag_deck_name(tag: &str) -> String {
    let flattened = tag.replace("::", "-");
    let sanitized: String = flattened
        .chars()
        .map(|c| if ILLEGAL_FILE_CHARS.contains(&c) { '_' } else { c })
        .collect();
    let sanitized = sanitized.trim();
    if sanitized.is_empty() {
        FALLBACK_TAG_DECK.to_owned()
    } else {
        sanitized.to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_replaces_illegal_and_control_chars() {
        assert_eq!(sanitize_file_stem("01-10-01-01"), "01-10-01-01");
        assert_eq!(sanitize_file_stem(" a/b:c*d \t"), "a_b_c_d _");
        assert_eq!(sanitize_file_stem("x\u{0007}y"), "x_y");
        assert_eq!(sanitize_file_stem("   "), "");
    }

    #[test]
    fn sanitize_trims_surrounding_spaces() {
        assert_eq!(sanitize_file_stem("  01-10-01-01  "), "01-10-01-01");
        assert_eq!(sanitize_file_stem(" a b "), "a b");
    }

    #[test]
    fn deck_input_with_number_suffix_is_flattened() {
        assert_eq!(deck_name_from_input("Prelims::165").as_deref(), Some("Prelims-165"));
        assert_eq!(deck_name_from_input("  Mains::5 ").as_deref(), Some("Mains-5"));
        assert_eq!(deck_name_from_input("A::B::12").as_deref(), Some("A::B-12"));
    }

    #[test]
    fn deck_input_without_number_is_kept() {
        assert_eq!(
            deck_name_from_input("Custom Study Session").as_deref(),
            Some("Custom Study Session")
        );
        assert_eq!(deck_name_from_input("Prelims::abc").as_deref(), Some("Prelims::abc"));
        assert_eq!(deck_name_from_input("::12").as_deref(), Some("::12"));
        assert_eq!(deck_name_from_input("   "), None);
    }

    #[test]
    fn tag_deck_name_flattens_hierarchy() {
        assert_eq!(tag_deck_name("Prelims::163"), "Prelims-163");
        assert_eq!(tag_deck_name("a/b"), "a_b");
        assert_eq!(tag_deck_name("  "), FALLBACK_TAG_DECK);
    }
}
