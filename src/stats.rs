//! Cycle journal
//!
//! Appends one JSON line per evaluation cycle so runs can be reviewed after
//! the fact. Amounts are written as decimal strings of smallest units.

use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Local;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::dex::Side;
use crate::error::CycleError;
use crate::trader::CycleOutcome;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleRecord {
    pub timestamp: String,
    /// A, B, or manual
    pub source: String,
    /// dropped | no_opportunity | not_profitable | executed | failed
    pub outcome: String,
    pub divergence_pct: Option<String>,
    pub direction: Option<String>,
    pub size: Option<String>,
    pub amount_in: Option<String>,
    pub amount_out: Option<String>,
    pub quote_net: Option<String>,
    pub realized_net: Option<String>,
    pub live: Option<bool>,
    pub tx_hash: Option<String>,
    pub error: Option<String>,
}

impl CycleRecord {
    fn empty(source: Option<Side>, outcome: &str) -> Self {
        Self {
            timestamp: Local::now().to_rfc3339(),
            source: source.map_or_else(|| "manual".to_string(), |side| side.to_string()),
            outcome: outcome.to_string(),
            divergence_pct: None,
            direction: None,
            size: None,
            amount_in: None,
            amount_out: None,
            quote_net: None,
            realized_net: None,
            live: None,
            tx_hash: None,
            error: None,
        }
    }

    pub fn new(source: Option<Side>, result: &Result<CycleOutcome, CycleError>) -> Self {
        match result {
            Ok(CycleOutcome::Dropped) => Self::empty(source, "dropped"),
            Ok(CycleOutcome::NoOpportunity { divergence }) => Self {
                divergence_pct: Some(divergence.to_string()),
                ..Self::empty(source, "no_opportunity")
            },
            Ok(CycleOutcome::NotProfitable {
                opportunity,
                decision,
            }) => Self {
                divergence_pct: Some(opportunity.divergence.to_string()),
                direction: Some(opportunity.direction.to_string()),
                size: Some(decision.size.to_string()),
                amount_in: Some(decision.amount_in.to_string()),
                amount_out: Some(decision.amount_out.to_string()),
                quote_net: Some(decision.net.to_string()),
                error: decision.liquidity_error.as_ref().map(|e| e.to_string()),
                ..Self::empty(source, "not_profitable")
            },
            Ok(CycleOutcome::Executed {
                opportunity,
                decision,
                receipt,
            }) => Self {
                divergence_pct: Some(opportunity.divergence.to_string()),
                direction: Some(opportunity.direction.to_string()),
                size: Some(decision.size.to_string()),
                amount_in: Some(decision.amount_in.to_string()),
                amount_out: Some(decision.amount_out.to_string()),
                quote_net: Some(decision.net.to_string()),
                realized_net: Some(receipt.net.to_string()),
                live: Some(receipt.live),
                tx_hash: receipt.tx.as_ref().map(|tx| tx.tx_hash.clone()),
                ..Self::empty(source, "executed")
            },
            Err(e) => Self {
                error: Some(e.to_string()),
                ..Self::empty(source, "failed")
            },
        }
    }
}

/// JSON Lines writer shared by all cycles
pub struct CycleJournal {
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
}

impl CycleJournal {
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, record: &CycleRecord) -> io::Result<()> {
        let line = serde_json::to_string(record)?;
        let mut writer = self.writer.lock();
        writeln!(writer, "{}", line)?;
        writer.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VenueError;
    use crate::math::Fixed;

    #[test]
    fn test_appends_one_line_per_cycle() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cycles.jsonl");
        let journal = CycleJournal::open(&path).unwrap();

        let quiet: Result<CycleOutcome, CycleError> = Ok(CycleOutcome::NoOpportunity {
            divergence: "0.1".parse::<Fixed>().unwrap(),
        });
        let failed: Result<CycleOutcome, CycleError> = Err(CycleError::Venue(VenueError::Timeout {
            venue: "Sushiswap".to_string(),
        }));
        journal.append(&CycleRecord::new(Some(Side::A), &quiet)).unwrap();
        journal.append(&CycleRecord::new(Some(Side::B), &failed)).unwrap();

        let contents = std::fs::read_to_string(journal.path()).unwrap();
        let records: Vec<CycleRecord> = contents
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].outcome, "no_opportunity");
        assert_eq!(records[0].divergence_pct.as_deref(), Some("0.1"));
        assert_eq!(records[1].source, "B");
        assert_eq!(records[1].outcome, "failed");
        assert_eq!(
            records[1].error.as_deref(),
            Some("Sushiswap: reserve read timed out")
        );
    }
}
