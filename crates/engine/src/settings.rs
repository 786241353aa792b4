//! Operator settings, loadable from a TOML file.
//!
//! Every section is optional; missing keys keep their defaults.
//!
//! ```toml
//! [media]
//! extension = "mkv"
//! copy_dir = "/home/me/.local/share/Anki2/User 1/collection.media"
//!
//! [pacing]
//! update_delay_ms = 1000
//!
//! [tokens.groups]
//! MATH = "01"
//! HIST = "05"
//! ```

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};

use crate::token::TokenScheme;

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("cannot read settings file {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("cannot parse settings file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid settings: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub media: MediaSettings,
    pub tokens: TokenScheme,
    pub decks: DeckSettings,
    pub pacing: PacingSettings,
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let raw = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let settings = Self::from_toml(&raw).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        settings.validate().map_err(SettingsError::Invalid)?;
        Ok(settings)
    }

    pub fn from_toml(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }

    /// Validate configuration values, returning an error message on failure.
    pub fn validate(&self) -> Result<(), String> {
        let extension = self.media.extension.trim_start_matches('.');
        if extension.is_empty() || extension.contains(['/', '\\']) {
            return Err(format!(
                "media.extension must be a bare extension, got {:?}",
                self.media.extension
            ));
        }
        if self.media.key_field.trim().is_empty() {
            return Err("media.key_field must not be empty".to_string());
        }
        if self.media.update_field.trim().is_empty() {
            return Err("media.update_field must not be empty".to_string());
        }
        if !self.media.payload_template.contains("{name}") {
            return Err(format!(
                "media.payload_template must contain {{name}}, got {:?}",
                self.media.payload_template
            ));
        }
        if self.decks.move_batch_size == 0 {
            return Err("decks.move_batch_size must be > 0".to_string());
        }
        if self.decks.source_decks.is_empty() {
            return Err("decks.source_decks must list at least one deck".to_string());
        }
        if self.tokens.field.trim().is_empty() {
            return Err("tokens.field must not be empty".to_string());
        }
        if self.tokens.ordinal_width == 0 {
            return Err("tokens.ordinal_width must be > 0".to_string());
        }
        if self.tokens.tiers.is_empty() || self.tokens.groups.is_empty() {
            return Err("tokens.tiers and tokens.groups must not be empty".to_string());
        }
        for (prefix, code) in self.tokens.tiers.iter().chain(&self.tokens.groups) {
            if prefix.contains("::") || prefix.trim().is_empty() {
                return Err(format!("token prefix {prefix:?} is not a plain tag name"));
            }
            if code.chars().count() != 2 {
                return Err(format!(
                    "token code for {prefix:?} must be two characters, got {code:?}"
                ));
            }
        }
        if let Some(shared) = self
            .tokens
            .tiers
            .keys()
            .find(|prefix| self.tokens.groups.contains_key(*prefix))
        {
            return Err(format!("{shared:?} is both a tier and a group prefix"));
        }
        Ok(())
    }
}

/// Media pipeline settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaSettings {
    /// Extension of the listed and renamed files (default: `mkv`).
    pub extension: String,
    /// Note field whose value names the file (default: `TokenNo`).
    pub key_field: String,
    /// Note field receiving the payload (default: `Video`).
    pub update_field: String,
    /// `{name}` is replaced by the target file name.
    pub payload_template: String,
    /// Media directory of the card store profile. Required outside dry-run
    /// unless given on the command line.
    pub copy_dir: Option<PathBuf>,
    pub default_deck: String,
    /// Run the remote update even when the copy failed (default: true).
    pub continue_on_copy_failure: bool,
    /// Also pause before the first remote update of a run.
    pub delay_before_first: bool,
}

impl Default for MediaSettings {
    fn default() -> Self {
        Self {
            extension: "mkv".to_string(),
            key_field: "TokenNo".to_string(),
            update_field: "Video".to_string(),
            payload_template: "[sound:{name}]".to_string(),
            copy_dir: None,
            default_deck: "Custom Study Session".to_string(),
            continue_on_copy_failure: true,
            delay_before_first: false,
        }
    }
}

impl MediaSettings {
    pub fn extension(&self) -> &str {
        self.extension.trim_start_matches('.')
    }
}

/// Deck maintenance settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeckSettings {
    /// Decks searched when moving tagged cards.
    pub source_decks: Vec<String>,
    /// Cards per `changeDeck` call (default: 500).
    pub move_batch_size: usize,
    /// Tag replaced by `replace-tags` (default: `GI`).
    pub generic_tag: String,
}

impl Default for DeckSettings {
    fn default() -> Self {
        Self {
            source_decks: ["MATH", "ENG", "GK", "GI"]
                .into_iter()
                .map(String::from)
                .collect(),
            move_batch_size: 500,
            generic_tag: "GI".to_string(),
        }
    }
}

/// Pauses between remote mutations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PacingSettings {
    /// Between consecutive note updates (default: 1000).
    pub update_delay_ms: u64,
    /// Before the first update of a batch workflow (default: 1000).
    pub initial_delay_ms: u64,
    /// Between decks when moving cards (default: 3000).
    pub deck_delay_ms: u64,
}

impl Default for PacingSettings {
    fn default() -> Self {
        Self {
            update_delay_ms: 1000,
            initial_delay_ms: 1000,
            deck_delay_ms: 3000,
        }
    }
}

impl PacingSettings {
    pub fn update_delay(&self) -> Duration {
        Duration::from_millis(self.update_delay_ms)
    }

    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    pub fn deck_delay(&self) -> Duration {
        Duration::from_millis(self.deck_delay_ms)
    }
}
