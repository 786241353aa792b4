//! End-to-end operations behind the command-line subcommands.

pub mod deck_move;
pub mod export;
pub mod media;
pub mod tag_replace;
pub mod tokens;

pub use deck_move::run_move_tagged;
pub use export::run_export;
pub use media::{MediaJob, run_media};
pub use tag_replace::{TagChoice, run_replace_tags};
pub use tokens::run_tokens;
