// ============================================================
// Layer 6 — History Log
// ============================================================
// Per-epoch loss log for one experiment, kept as a headerless
// CSV so rows can be appended across resumed runs:
//
//   0,187.412300,171.904100
//   1,160.118200,152.337600
//   ...
//
// Columns are (epoch, loss, val_loss); names are supplied here
// when reading, not stored in the file. The row count is the
// number of completed epochs.
//
// Reference: Rust Book §12 (I/O and File Handling)
//            csv crate documentation

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

/// One row of the history file
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    /// 0-based epoch index, continuing across resumed runs
    pub epoch:    usize,
    /// Mean training loss (negative ELBO)
    pub loss:     f64,
    /// Mean loss on the held-out split
    pub val_loss: f64,
}

impl HistoryRecord {
    pub fn new(epoch: usize, loss: f64, val_loss: f64) -> Self {
        Self { epoch, loss, val_loss }
    }

    /// Returns true if this epoch improved over the previous best val_loss
    pub fn is_improvement(&self, best_val_loss: f64) -> bool {
        self.val_loss < best_val_loss
    }
}

/// Reads and appends the history CSV of one experiment.
pub struct HistoryLog {
    path: PathBuf,
}

impl HistoryLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// All rows in file order. `None` when no history file exists.
    pub fn read(&self) -> Result<Option<Vec<HistoryRecord>>> {
        if !self.exists() {
            return Ok(None);
        }

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .trim(csv::Trim::All)
            .from_path(&self.path)
            .with_context(|| format!("Cannot open history '{}'", self.path.display()))?;

        let rows = reader
            .deserialize::<HistoryRecord>()
            .collect::<Result<Vec<_>, _>>()
            .with_context(|| format!("Malformed history '{}'", self.path.display()))?;

        Ok(Some(rows))
    }

    /// Append one row, creating the file (and its directory) if needed.
    pub fn append(&self, r: &HistoryRecord) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)?;
        }

        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Cannot append to history '{}'", self.path.display()))?;

        writeln!(f, "{},{:.6},{:.6}", r.epoch, r.loss, r.val_loss)?;

        tracing::debug!(
            "Logged epoch {}: loss={:.4}, val_loss={:.4}",
            r.epoch, r.loss, r.val_loss,
        );
        Ok(())
    }
}

/// Lowest val_loss in `rows`, or +∞ when there are none
pub fn best_val_loss(rows: &[HistoryRecord]) -> f64 {
    rows.iter().map(|r| r.val_loss).fold(f64::INFINITY, f64::min)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_improvement() {
        let r = HistoryRecord::new(2, 2.5, 2.3);
        assert!(r.is_improvement(3.0));
        assert!(!r.is_improvement(2.0));
    }

    #[test]
    fn test_missing_file_means_no_history() {
        let tmp = tempfile::tempdir().unwrap();
        let log = HistoryLog::new(tmp.path().join("none.csv"));
        assert!(log.read().unwrap().is_none());
    }

    #[test]
    fn test_empty_file_has_no_rows() {
        let tmp  = tempfile::tempdir().unwrap();
        let path = tmp.path().join("empty.csv");
        fs::write(&path, "").unwrap();
        assert_eq!(HistoryLog::new(&path).read().unwrap(), Some(vec![]));
    }

    #[test]
    fn test_append_creates_dir_and_keeps_order() {
        let tmp = tempfile::tempdir().unwrap();
        let log = HistoryLog::new(tmp.path().join("history/run.csv"));
        log.append(&HistoryRecord::new(0, 10.0, 9.5)).unwrap();
        log.append(&HistoryRecord::new(1, 8.0, 8.25)).unwrap();

        let text = fs::read_to_string(log.path()).unwrap();
        assert_eq!(text, "0,10.000000,9.500000\n1,8.000000,8.250000\n");

        let rows = log.read().unwrap().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1], HistoryRecord::new(1, 8.0, 8.25));
        assert_eq!(best_val_loss(&rows), 8.25);
    }

    #[test]
    fn test_five_hundred_rows_are_counted() {
        let tmp = tempfile::tempdir().unwrap();
        let log = HistoryLog::new(tmp.path().join("h.csv"));
        for e in 0..500 {
            log.append(&HistoryRecord::new(e, 1.0, 1.0)).unwrap();
        }
        assert_eq!(log.read().unwrap().unwrap().len(), 500);
    }

    #[test]
    fn test_garbage_row_is_an_error() {
        let tmp  = tempfile::tempdir().unwrap();
        let path = tmp.path().join("bad.csv");
        fs::write(&path, "0,1.0,1.0\nnot,a,row\n").unwrap();
        assert!(HistoryLog::new(&path).read().is_err());
    }

    #[test]
    fn test_best_of_nothing_is_infinite() {
        assert!(best_val_loss(&[]).is_infinite());
    }
}
