//! Finished-match records
//!
//! Keeps the most recent matches as a bounded list, persisted as JSON.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::sim::Side;

/// Maximum number of finished matches to keep
pub const MAX_MATCH_RECORDS: usize = 20;

/// The outcome of one finished match
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    /// `None` is a draw
    pub winner: Option<Side>,
    pub white_total: i32,
    pub black_total: i32,
    /// Rounds actually played
    pub rounds: u32,
    /// RNG seed the match ran with, for reproduction
    pub seed: u64,
}

/// Bounded history of finished matches, newest first
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MatchHistory {
    pub records: Vec<MatchRecord>,
}

impl MatchHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a finished match, dropping the oldest entry past the cap
    pub fn add(&mut self, record: MatchRecord) {
        self.records.insert(0, record);
        self.records.truncate(MAX_MATCH_RECORDS);
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn latest(&self) -> Option<&MatchRecord> {
        self.records.first()
    }

    /// Wins for a side across the stored history
    pub fn wins(&self, side: Side) -> usize {
        self.records
            .iter()
            .filter(|r| r.winner == Some(side))
            .count()
    }

    /// Load history from a JSON file; a missing or unreadable file starts
    /// fresh
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(json) => match serde_json::from_str::<MatchHistory>(&json) {
                Ok(history) => {
                    log::info!("loaded {} match records", history.records.len());
                    history
                }
                Err(err) => {
                    log::warn!("match history unreadable, starting fresh: {err}");
                    Self::new()
                }
            },
            Err(_) => {
                log::info!("no match history found, starting fresh");
                Self::new()
            }
        }
    }

    /// Save history as pretty JSON
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidData, err))?;
        std::fs::write(path, json)?;
        log::info!("match history saved ({} records)", self.records.len());
        Ok(())
    }
}
