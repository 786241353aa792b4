//! Pairing of local media files with study-card notes, and the staged
//! rename → copy → update pipeline that applies each pair.

pub mod error;
pub mod fetcher;
pub mod inventory;
pub mod item;
pub mod naming;
pub mod pacing;
pub mod pairer;
pub mod pipeline;
pub mod report;
pub mod settings;
pub mod token;
pub mod workflows;

pub use error::SyncError;
pub use fetcher::{Fetched, KeyedRecord, Record, RecordFetcher};
pub use inventory::{FileEntry, Inventory};
pub use item::{ItemStatus, PairItem, Stage, StageStatus};
pub use pairer::{Mismatch, PairLayout, Pairing, Side, pair};
pub use pipeline::{MutationPipeline, PipelineOptions};
pub use report::{BatchReport, RunReport, StageCounts};
pub use settings::{Settings, SettingsError};
pub use token::{TokenCode, TokenCodeGenerator, TokenGeneration, TokenScheme};
