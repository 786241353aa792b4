use std::{fmt::Display, path::PathBuf, str::FromStr};

use cardsync_connect::DEFAULT_URL;
use cardsync_engine::workflows::{
    MediaJob, run_export, run_media, run_move_tagged, run_replace_tags, run_tokens,
};
use clap::{ArgAction, Parser as ClapParser, Subcommand as ClapSubcommand};
use tracing::{Level, info};

use crate::{
    initializers::{init_client, init_tracing, load_settings},
    report::emit_report,
};

#[allow(clippy::upper_case_acronyms)]
#[derive(ClapParser)]
#[command(
    name = "cardsync",
    version,
    about = "Pair local media files with AnkiConnect notes and keep both in sync"
)]
pub struct CLI {
    #[command(flatten)]
    pub opts: Options,
    #[command(subcommand)]
    pub command: Subcommand,
}

#[derive(ClapParser, Debug, Clone)]
pub struct Options {
    #[arg(
        long = "anki.url",
        default_value = DEFAULT_URL,
        value_name = "URL",
        help = "AnkiConnect endpoint.",
        help_heading = "Connection options",
        env = "CARDSYNC_ANKI_URL",
        global = true
    )]
    pub anki_url: String,
    #[arg(
        long = "anki.timeout-secs",
        default_value_t = 60,
        value_name = "SECONDS",
        value_parser = clap::value_parser!(u64).range(1..=600),
        help = "Per-request timeout (1-600). A timed out request is retried once.",
        help_heading = "Connection options",
        env = "CARDSYNC_ANKI_TIMEOUT_SECS",
        global = true
    )]
    pub anki_timeout_secs: u64,
    #[arg(
        long = "config",
        value_name = "TOML_FILE",
        help = "Settings file with field names, delays, decks and the token scheme.",
        env = "CARDSYNC_CONFIG",
        global = true
    )]
    pub config: Option<PathBuf>,
    #[arg(
        long = "log.level",
        default_value_t = Level::INFO,
        value_name = "LOG_LEVEL",
        env = "CARDSYNC_LOG_LEVEL",
        help = "The verbosity level used for logs.",
        long_help = "Possible values: info, debug, trace, warn, error",
        help_heading = "Output options",
        global = true
    )]
    pub log_level: Level,
    #[arg(
        long = "log.color",
        default_value_t = LogColor::Auto,
        help = "Output logs with ANSI color codes.",
        long_help = "Possible values: auto, always, never",
        help_heading = "Output options",
        env = "CARDSYNC_LOG_COLOR",
        global = true
    )]
    pub log_color: LogColor,
    #[arg(
        long = "json",
        action = ArgAction::SetTrue,
        help = "Print the run report (or the failure) as one JSON document on stdout.",
        help_heading = "Output options",
        global = true
    )]
    pub json: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            anki_url: DEFAULT_URL.to_owned(),
            anki_timeout_secs: 60,
            config: None,
            log_level: Level::INFO,
            log_color: LogColor::default(),
            json: false,
        }
    }
}

#[derive(ClapSubcommand, Debug)]
pub enum Subcommand {
    #[command(
        name = "media",
        about = "Rename, copy and link media files to the notes of a deck"
    )]
    Media {
        #[arg(long = "folder", value_name = "DIR", help = "Folder holding the media files.")]
        folder: PathBuf,
        #[arg(
            long = "deck",
            value_name = "DECK",
            help = "Deck to pair with. `Group::Number` is read as `Group-Number`.",
            long_help = "Defaults to media.default_deck from the settings (\"Custom Study Session\")."
        )]
        deck: Option<String>,
        #[arg(
            long = "copy-dir",
            value_name = "DIR",
            help = "Media directory of the Anki profile. Overrides media.copy_dir.",
            env = "CARDSYNC_COPY_DIR"
        )]
        copy_dir: Option<PathBuf>,
        #[arg(long = "dry-run", action = ArgAction::SetTrue, help = "Log what would change without touching files or notes.")]
        dry_run: bool,
        #[arg(long = "generate-tokens", action = ArgAction::SetTrue, help = "Name files after token codes generated from note tags.")]
        generate_tokens: bool,
        #[arg(long = "stop-on-copy-failure", action = ArgAction::SetTrue, help = "Skip the note update of an item whose copy failed.")]
        stop_on_copy_failure: bool,
    },
    #[command(name = "tokens", about = "Generate token codes from tags and store them on the notes")]
    Tokens {
        #[arg(long = "deck", value_name = "DECK")]
        deck: String,
        #[arg(long = "dry-run", action = ArgAction::SetTrue)]
        dry_run: bool,
    },
    #[command(
        name = "move-tagged",
        about = "Move cards carrying a tag into a deck named after the tag"
    )]
    MoveTagged {
        #[arg(long = "tag", value_name = "TAG")]
        tag: String,
        #[arg(
            long = "source-deck",
            value_name = "DECK",
            num_args = 1..,
            help = "Decks to search. Defaults to decks.source_decks from the settings."
        )]
        source_decks: Vec<String>,
        #[arg(long = "dry-run", action = ArgAction::SetTrue)]
        dry_run: bool,
    },
    #[command(
        name = "replace-tags",
        about = "Replace a generic tag with the tag chosen per note in a JSON file"
    )]
    ReplaceTags {
        #[arg(long = "input", value_name = "JSON_FILE", help = "Array of {\"noteId\", \"chosenTag\"} entries.")]
        input: PathBuf,
        #[arg(long = "tag", value_name = "TAG", help = "Tag to replace. Defaults to decks.generic_tag (GI).")]
        tag: Option<String>,
        #[arg(long = "dry-run", action = ArgAction::SetTrue)]
        dry_run: bool,
    },
    #[command(name = "export", about = "Write the notes of a deck to a JSON file")]
    Export {
        #[arg(long = "deck", value_name = "DECK")]
        deck: String,
        #[arg(long = "output", value_name = "JSON_FILE")]
        output: PathBuf,
    },
}

impl Subcommand {
    /// Run the command and return the process exit code.
    pub async fn run(self, opts: &Options) -> eyre::Result<i32> {
        init_tracing(opts);
        let settings = load_settings(opts)?;
        let client = init_client(opts);
        info!(url = %opts.anki_url, "using AnkiConnect");

        let code = match self {
            Subcommand::Media {
                folder,
                deck,
                copy_dir,
                dry_run,
                generate_tokens,
                stop_on_copy_failure,
            } => {
                let job = MediaJob {
                    folder,
                    deck: deck.unwrap_or_else(|| settings.media.default_deck.clone()),
                    copy_dir,
                    dry_run,
                    generate_tokens,
                    stop_on_copy_failure,
                };
                let report = run_media(&client, &settings, &job).await?;
                emit_report(opts.json, &report)?;
                report.exit_code()
            }
            Subcommand::Tokens { deck, dry_run } => {
                let report = run_tokens(&client, &settings, &deck, dry_run).await?;
                emit_report(opts.json, &report)?;
                report.exit_code()
            }
            Subcommand::MoveTagged {
                tag,
                source_decks,
                dry_run,
            } => {
                let report =
                    run_move_tagged(&client, &settings, &tag, &source_decks, dry_run).await?;
                emit_report(opts.json, &report)?;
                report.exit_code()
            }
            Subcommand::ReplaceTags {
                input,
                tag,
                dry_run,
            } => {
                let report =
                    run_replace_tags(&client, &settings, &input, tag.as_deref(), dry_run).await?;
                emit_report(opts.json, &report)?;
                report.exit_code()
            }
            Subcommand::Export { deck, output } => {
                let report = run_export(&client, &deck, &output).await?;
                emit_report(opts.json, &report)?;
                report.exit_code()
            }
        };
        Ok(code)
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub enum LogColor {
    #[default]
    Auto,
    Always,
    Never,
}

impl Display for LogColor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogColor::Auto => write!(f, "auto"),
            LogColor::Always => write!(f, "always"),
            LogColor::Never => write!(f, "never"),
        }
    }
}

impl FromStr for LogColor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(LogColor::Auto),
            "always" => Ok(LogColor::Always),
            "never" => Ok(LogColor::Never),
            _ => Err(format!(
                "Invalid log color '{s}'. Expected: auto, always, or never"
            )),
        }
    }
}
