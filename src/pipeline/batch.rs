//! Batch analysis over all donors.

use super::{Analyzer, Diagnostic, Scope};
use crate::data::{DonorRecords, ResultRow, ResultTable};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// How a batch run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    /// Every donor was analyzed and produced rows.
    Completed,
    /// Every donor was analyzed but nothing was produced.
    NothingToReport,
    /// Stopped before donor `processed + 1` of `total`.
    Cancelled { processed: usize, total: usize },
}

/// Result table of a batch run plus how the run ended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchOutcome {
    pub table: ResultTable,
    pub status: RunStatus,
}

impl BatchOutcome {
    fn finished(table: ResultTable) -> Self {
        let status = if table.is_empty() {
            RunStatus::NothingToReport
        } else {
            RunStatus::Completed
        };
        Self { table, status }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.status, RunStatus::Cancelled { .. })
    }
}

impl Analyzer<'_> {
    /// Analyze donors in input order.
    ///
    /// Progress is reported before each donor and cancellation is checked
    /// there too; a cancelled run returns the rows accumulated so far.
    pub fn analyze_batch(&self, donors: &[DonorRecords]) -> BatchOutcome {
        let total = donors.len();
        let mut table = ResultTable::new();

        for (i, (donor_id, records)) in donors.iter().enumerate() {
            if self.is_cancelled() {
                return self.cancelled(table, i, total);
            }
            self.sink.progress(i, total, donor_id);
            table.extend(self.analyze_donor(donor_id, records));
        }

        self.finished(table, total)
    }

    /// Analyze donors concurrently, reassembling rows in input order.
    ///
    /// The table is identical to [`Analyzer::analyze_batch`]. Cancellation is
    /// checked as each donor starts; donors already running finish, and the
    /// returned table holds the longest completed prefix of the input.
    pub fn analyze_batch_parallel(&self, donors: &[DonorRecords]) -> BatchOutcome {
        let total = donors.len();
        let per_donor: Vec<Option<Vec<ResultRow>>> = donors
            .par_iter()
            .enumerate()
            .map(|(i, (donor_id, records))| {
                if self.is_cancelled() {
                    return None;
                }
                self.sink.progress(i, total, donor_id);
                Some(self.analyze_donor(donor_id, records))
            })
            .collect();

        let mut table = ResultTable::new();
        for (i, rows) in per_donor.into_iter().enumerate() {
            match rows {
                Some(rows) => table.extend(rows),
                None => return self.cancelled(table, i, total),
            }
        }

        self.finished(table, total)
    }

    fn finished(&self, table: ResultTable, total: usize) -> BatchOutcome {
        let outcome = BatchOutcome::finished(table);
        self.emit(Diagnostic::info(
            Scope::default(),
            format!(
                "analysis complete: {} row(s) from {} donor(s)",
                outcome.table.len(),
                total
            ),
        ));
        outcome
    }

    fn cancelled(&self, table: ResultTable, processed: usize, total: usize) -> BatchOutcome {
        self.emit(Diagnostic::warning(
            Scope::default(),
            format!("analysis cancelled after {} of {} donor(s)", processed, total),
        ));
        BatchOutcome {
            table,
            status: RunStatus::Cancelled { processed, total },
        }
    }
}
