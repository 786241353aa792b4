//! Token codes derived from note tags.
//!
//! A token code has the form `{tier}-{sequence}-{group}-{ordinal}`:
//!
//! * `tier`: two-character code of the first tier tag (`Prelims::10` → `01`),
//! * `sequence`: the integer carried by that tier tag (`10`),
//! * `group`: two-character code of the first group tag (`MATH` → `01`),
//! * `ordinal`: zero-padded position of the note among the notes sharing the
//!   same `(tier, sequence, group)` key, counted in fetch order from 1.
//!
//! Given the same notes in the same order the generated codes are identical.

use std::{
    collections::{BTreeMap, HashMap},
    fmt,
};

use cardsync_connect::NoteId;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::fetcher::Record;

/// Prefix enumerations and formatting of token codes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenScheme {
    /// Note field holding the stored code.
    pub field: String,
    /// Minimum digits of the ordinal.
    pub ordinal_width: usize,
    /// Tier tag prefix → code. Tier tags carry the sequence: `Prelims::10`.
    pub tiers: BTreeMap<String, String>,
    /// Group tag prefix → code. Matches `MATH` as well as `MATH::Algebra`.
    pub groups: BTreeMap<String, String>,
}

impl Default for TokenScheme {
    fn default() -> Self {
        let pairs = |entries: &[(&str, &str)]| {
            entries
                .iter()
                .map(|(prefix, code)| ((*prefix).to_owned(), (*code).to_owned()))
                .collect()
        };
        Self {
            field: "TokenNo".to_owned(),
            ordinal_width: 2,
            tiers: pairs(&[("Prelims", "01"), ("Mains", "02")]),
            groups: pairs(&[("MATH", "01"), ("GI", "02"), ("ENG", "03"), ("GK", "04")]),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TokenCode {
    pub tier: String,
    pub sequence: u64,
    pub group: String,
    pub ordinal: u32,
    width: usize,
}

impl TokenCode {
    pub fn new(tier: &str, sequence: u64, group: &str, ordinal: u32, width: usize) -> Self {
        Self {
            tier: tier.to_owned(),
            sequence,
            group: group.to_owned(),
            ordinal,
            width,
        }
    }
}

impl fmt::Display for TokenCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}-{}-{:0width$}",
            self.tier,
            self.sequence,
            self.group,
            self.ordinal,
            width = self.width
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    MissingTier,
    MissingGroup,
    MalformedSequence { tag: String },
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::MissingTier => f.write_str("no tier tag"),
            RejectReason::MissingGroup => f.write_str("no group tag"),
            RejectReason::MalformedSequence { tag } => {
                write!(f, "tier tag {tag:?} does not carry an integer")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedToken {
    pub note_id: NoteId,
    pub code: TokenCode,
    /// The note already stores this exact code.
    pub unchanged: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedRecord {
    pub note_id: NoteId,
    pub reason: RejectReason,
}

/// Outcome of one generation pass, in fetch order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenGeneration {
    pub tokens: Vec<GeneratedToken>,
    pub rejected: Vec<RejectedRecord>,
}

impl TokenGeneration {
    /// Tokens that differ from what the note stores.
    pub fn pending_updates(&self) -> impl Iterator<Item = &GeneratedToken> {
        self.tokens.iter().filter(|token| !token.unchanged)
    }

    pub fn processed(&self) -> usize {
        self.pending_updates().count()
    }

    pub fn skipped(&self) -> usize {
        self.tokens.iter().filter(|token| token.unchanged).count()
    }

    pub fn errored(&self) -> usize {
        self.rejected.len()
    }

    pub fn code_for(&self, note_id: NoteId) -> Option<&TokenCode> {
        self.tokens
            .iter()
            .find(|token| token.note_id == note_id)
            .map(|token| &token.code)
    }
}

/// Per-key ordinal counters of one generation pass.
#[derive(Debug, Default)]
pub struct OrdinalCounters {
    counters: HashMap<(String, u64, String), u32>,
}

impl OrdinalCounters {
    pub fn next(&mut self, tier: &str, sequence: u64, group: &str) -> u32 {
        let counter = self
            .counters
            .entry((tier.to_owned(), sequence, group.to_owned()))
            .or_insert(0);
        *counter += 1;
        *counter
    }
}

pub struct TokenCodeGenerator<'a> {
    scheme: &'a TokenScheme,
}

impl<'a> TokenCodeGenerator<'a> {
    pub fn new(scheme: &'a TokenScheme) -> Self {
        Self { scheme }
    }

    pub fn generate(&self, records: &[Record]) -> TokenGeneration {
        let mut counters = OrdinalCounters::default();
        let mut generation = TokenGeneration::default();

        for record in records {
            let (tier, sequence, group) = match self.classify(record) {
                Ok(parts) => parts,
                Err(reason) => {
                    warn!(note_id = record.id, %reason, "cannot derive token code, skipping note");
                    generation.rejected.push(RejectedRecord {
                        note_id: record.id,
                        reason,
                    });
                    continue;
                }
            };

            let ordinal = counters.next(tier, sequence, group);
            let code = TokenCode::new(tier, sequence, group, ordinal, self.scheme.ordinal_width);
            let rendered = code.to_string();
            let unchanged = record.field(&self.scheme.field) == Some(rendered.as_str());

            generation.tokens.push(GeneratedToken {
                note_id: record.id,
                code,
                unchanged,
            });
        }

        info!(
            processed = generation.processed(),
            skipped = generation.skipped(),
            errors = generation.errored(),
            "token generation finished"
        );
        generation
    }

    /// First tier tag and first group tag of the record, scanned once.
    fn classify<'r>(&'r self, record: &Record) -> Result<(&'r str, u64, &'r str), RejectReason> {
        let mut tier: Option<(&str, u64)> = None;
        let mut group: Option<&str> = None;

        for tag in &record.tags {
            let (prefix, value) = match tag.split_once("::") {
                // `Tier::10::Sub` carries sequence 10.
                Some((prefix, rest)) => (prefix, rest.split("::").next()),
                None => (tag.as_str(), None),
            };

            if tier.is_none() {
                if let (Some(code), Some(value)) = (self.scheme.tiers.get(prefix), value) {
                    let sequence = value.trim().parse::<u64>().map_err(|_| {
                        RejectReason::MalformedSequence { tag: tag.clone() }
                    })?;
                    tier = Some((code.as_str(), sequence));
                    continue;
                }
            }

            if group.is_none() {
                if let Some(code) = self.scheme.groups.get(prefix) {
                    group = Some(code.as_str());
                }
            }
        }

        let (tier, sequence) = tier.ok_or(RejectReason::MissingTier)?;
        let group = group.ok_or(RejectReason::MissingGroup)?;
        Ok((tier, sequence, group))
    }
}
