//! Raw per-well records from a plate-reader export.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A stimulus cell as it appears in a source table, before normalization.
///
/// Exports mix text labels (`"PHA"`) with numeric ones (`4990.67`, peptide
/// concentrations or pool ids). Converting through [`LabelValue::into_label`]
/// happens once at ingestion so the analyzers only ever compare strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LabelValue {
    /// Text label.
    Text(String),
    /// Numeric label.
    Number(f64),
    /// Empty cell.
    Missing,
}

impl LabelValue {
    /// Check if this is a missing value.
    pub fn is_missing(&self) -> bool {
        match self {
            LabelValue::Missing => true,
            LabelValue::Text(s) => s.is_empty(),
            LabelValue::Number(v) => v.is_nan(),
        }
    }

    /// Normalize to a string label; `None` for missing cells.
    ///
    /// Text is kept verbatim, surrounding whitespace included, so it is
    /// compared against configured labels exactly.
    pub fn into_label(self) -> Option<String> {
        match self {
            LabelValue::Text(s) if s.is_empty() => None,
            LabelValue::Text(s) => Some(s),
            LabelValue::Number(v) if v.is_nan() => None,
            LabelValue::Number(v) => Some(v.to_string()),
            LabelValue::Missing => None,
        }
    }
}

impl From<&str> for LabelValue {
    fn from(s: &str) -> Self {
        LabelValue::Text(s.to_string())
    }
}

impl From<String> for LabelValue {
    fn from(s: String) -> Self {
        LabelValue::Text(s)
    }
}

impl From<f64> for LabelValue {
    fn from(v: f64) -> Self {
        LabelValue::Number(v)
    }
}

impl From<i64> for LabelValue {
    fn from(v: i64) -> Self {
        LabelValue::Number(v as f64)
    }
}

impl<T: Into<LabelValue>> From<Option<T>> for LabelValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(LabelValue::Missing)
    }
}

/// One well: the unit of aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WellRecord {
    /// Donor identifier.
    pub donor: String,
    /// Plate identifier.
    pub plate: String,
    /// Normalized stimulus label; `None` for unlabeled wells.
    pub stimulus: Option<String>,
    /// Secreting population, `"<channel code> Total"` for channel totals.
    pub population: String,
    /// Spot count; `NaN` when the reader reported nothing.
    pub sfu: f64,
}

impl WellRecord {
    pub fn new(
        donor: impl Into<String>,
        plate: impl Into<String>,
        stimulus: impl Into<LabelValue>,
        population: impl Into<String>,
        sfu: f64,
    ) -> Self {
        Self {
            donor: donor.into(),
            plate: plate.into(),
            stimulus: stimulus.into().into_label(),
            population: population.into(),
            sfu,
        }
    }

    /// Stimulus label, if present.
    pub fn stimulus(&self) -> Option<&str> {
        self.stimulus.as_deref()
    }

    /// Whether the spot count is missing.
    pub fn is_missing(&self) -> bool {
        self.sfu.is_nan()
    }
}

/// All records for one donor.
pub type DonorRecords = (String, Vec<WellRecord>);

/// Partition records by a key, keeping first-seen key order and record order.
pub fn group_by_key<'a, K, F>(records: &'a [WellRecord], key: F) -> Vec<(K, Vec<&'a WellRecord>)>
where
    K: Eq + std::hash::Hash + Clone,
    F: Fn(&'a WellRecord) -> K,
{
    let mut index: HashMap<K, usize> = HashMap::new();
    let mut groups: Vec<(K, Vec<&'a WellRecord>)> = Vec::new();
    for record in records {
        let k = key(record);
        match index.get(&k) {
            Some(&i) => groups[i].1.push(record),
            None => {
                index.insert(k.clone(), groups.len());
                groups.push((k, vec![record]));
            }
        }
    }
    groups
}

/// Split a mixed table into per-donor tables in first-seen donor order.
///
/// Records with an empty donor id are dropped.
pub fn split_by_donor(records: Vec<WellRecord>) -> Vec<DonorRecords> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut donors: Vec<DonorRecords> = Vec::new();
    for record in records {
        if record.donor.trim().is_empty() {
            continue;
        }
        match index.get(&record.donor) {
            Some(&i) => donors[i].1.push(record),
            None => {
                index.insert(record.donor.clone(), donors.len());
                donors.push((record.donor.clone(), vec![record]));
            }
        }
    }
    donors
}

/// Merge donor tables that share an id, keeping first-seen donor order.
pub fn merge_donors(sets: Vec<DonorRecords>) -> Vec<DonorRecords> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut merged: Vec<DonorRecords> = Vec::new();
    for (donor, records) in sets {
        match index.get(&donor) {
            Some(&i) => merged[i].1.extend(records),
            None => {
                index.insert(donor.clone(), merged.len());
                merged.push((donor, records));
            }
        }
    }
    merged
}
