//! Result rows and the flat result table.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Condition name used for every row of a simple-mode plate.
pub const DEFAULT_CONDITION: &str = "default";

/// Stimulus-versus-control statistics attached to a non-control row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    /// One-sided two-sample test p-value (stimulus > control).
    pub t_test_p: f64,
    /// Stimulation index.
    pub si: f64,
    /// Background-subtracted spots per million plated cells.
    pub sfc: f64,
    /// Poisson right-tail probability per stimulus replicate.
    pub poisson_p_values: Vec<f64>,
    /// Mean of `poisson_p_values`; `NaN` when there are none.
    pub poisson_average: f64,
    /// Positive immune response call.
    pub positive: bool,
}

/// One output row: a control or a stimulus on one donor/plate/cytokine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRow {
    pub donor_id: String,
    pub plate: String,
    /// Experimental condition group, [`DEFAULT_CONDITION`] in simple mode.
    pub condition: String,
    pub species: String,
    pub cytokine: String,
    pub stimulus: String,
    /// Raw replicate spot counts, missing wells included as `NaN`.
    pub sfu_values: Vec<f64>,
    pub average: f64,
    pub std: f64,
    /// `None` for control rows.
    pub comparison: Option<Comparison>,
}

impl ResultRow {
    /// Whether this row describes a control sample.
    pub fn is_control(&self) -> bool {
        self.comparison.is_none()
    }

    /// Positive response call; control rows are never positive.
    pub fn is_positive(&self) -> bool {
        self.comparison.as_ref().is_some_and(|c| c.positive)
    }

    /// Number of Poisson replicate columns this row fills.
    pub fn n_poisson(&self) -> usize {
        self.comparison
            .as_ref()
            .map_or(0, |c| c.poisson_p_values.len())
    }
}

/// The concatenation of all result rows of a run, in generation order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultTable {
    pub rows: Vec<ResultRow>,
}

/// Below this magnitude values are written in exponent form.
const EXPONENT_BELOW: f64 = 1e-6;

fn fmt_value(v: f64) -> String {
    if v.is_nan() {
        String::new()
    } else if v != 0.0 && v.abs() < EXPONENT_BELOW {
        format!("{:e}", v)
    } else {
        v.to_string()
    }
}

fn fmt_values(values: &[f64]) -> String {
    let inner: Vec<String> = values
        .iter()
        .map(|v| if v.is_nan() { "nan".to_string() } else { v.to_string() })
        .collect();
    format!("[{}]", inner.join(", "))
}

impl ResultTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rows(rows: Vec<ResultRow>) -> Self {
        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResultRow> {
        self.rows.iter()
    }

    /// Append rows, preserving their order.
    pub fn extend(&mut self, rows: impl IntoIterator<Item = ResultRow>) {
        self.rows.extend(rows);
    }

    /// Rows with a positive call.
    pub fn positives(&self) -> Vec<&ResultRow> {
        self.rows.iter().filter(|r| r.is_positive()).collect()
    }

    /// Rows for one donor.
    pub fn for_donor<'a>(&'a self, donor_id: &'a str) -> impl Iterator<Item = &'a ResultRow> + 'a {
        self.rows.iter().filter(move |r| r.donor_id == donor_id)
    }

    /// Widest Poisson replicate count across rows.
    pub fn max_replicates(&self) -> usize {
        self.rows.iter().map(ResultRow::n_poisson).max().unwrap_or(0)
    }

    /// Column headers of the flat table.
    pub fn header(&self) -> Vec<String> {
        let mut header: Vec<String> = [
            "Donor ID",
            "Plate",
            "Experimental Condition",
            "Species",
            "Cytokine",
            "Stimulus",
            "SFU Values",
            "Average",
            "STD",
            "t-test p-value",
            "SI",
            "SFCs Normalized Per Million Cells",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        header.extend((1..=self.max_replicates()).map(|i| format!("P{}", i)));
        header.push("Poisson Average".to_string());
        header.push("Positive Response".to_string());
        header
    }

    fn record(row: &ResultRow, n_poisson: usize) -> Vec<String> {
        let mut fields = vec![
            row.donor_id.clone(),
            row.plate.clone(),
            row.condition.clone(),
            row.species.clone(),
            row.cytokine.clone(),
            row.stimulus.clone(),
            fmt_values(&row.sfu_values),
            fmt_value(row.average),
            fmt_value(row.std),
        ];
        match &row.comparison {
            Some(c) => {
                fields.push(fmt_value(c.t_test_p));
                fields.push(fmt_value(c.si));
                fields.push(fmt_value(c.sfc));
                for i in 0..n_poisson {
                    fields.push(c.poisson_p_values.get(i).map_or_else(String::new, |&p| fmt_value(p)));
                }
                fields.push(fmt_value(c.poisson_average));
                fields.push(c.positive.to_string());
            }
            None => {
                fields.extend(std::iter::repeat(String::new()).take(n_poisson + 5));
            }
        }
        fields
    }

    /// Write the flat table with the given delimiter.
    pub fn write_delimited<W: Write>(&self, writer: W, delimiter: u8) -> Result<()> {
        let mut wtr = csv::WriterBuilder::new()
            .delimiter(delimiter)
            .from_writer(writer);
        let n_poisson = self.max_replicates();
        wtr.write_record(self.header())?;
        for row in &self.rows {
            wtr.write_record(Self::record(row, n_poisson))?;
        }
        wtr.flush()?;
        Ok(())
    }

    /// Write results to TSV file.
    pub fn to_tsv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.write_delimited(File::create(path)?, b'\t')
    }

    /// Write results to CSV file.
    pub fn to_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.write_delimited(File::create(path)?, b',')
    }

    /// Write results as pretty JSON.
    pub fn to_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Counts for reporting.
    pub fn summary(&self) -> TableSummary {
        let mut donors: Vec<&str> = Vec::new();
        for row in &self.rows {
            if !donors.contains(&row.donor_id.as_str()) {
                donors.push(&row.donor_id);
            }
        }
        TableSummary {
            rows: self.len(),
            donors: donors.len(),
            controls: self.rows.iter().filter(|r| r.is_control()).count(),
            comparisons: self.rows.iter().filter(|r| !r.is_control()).count(),
            positives: self.positives().len(),
        }
    }
}

impl IntoIterator for ResultTable {
    type Item = ResultRow;
    type IntoIter = std::vec::IntoIter<ResultRow>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}

/// Row counts of a result table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSummary {
    pub rows: usize,
    pub donors: usize,
    pub controls: usize,
    pub comparisons: usize,
    pub positives: usize,
}

impl std::fmt::Display for TableSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Result rows:        {}", self.rows)?;
        writeln!(f, "Donors:             {}", self.donors)?;
        writeln!(f, "Control rows:       {}", self.controls)?;
        writeln!(f, "Stimulus rows:      {}", self.comparisons)?;
        writeln!(f, "Positive responses: {}", self.positives)?;
        Ok(())
    }
}
