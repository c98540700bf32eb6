//! Summary profile of a well export.

use crate::config::channel_code;
use crate::data::WellRecord;
use serde::{Deserialize, Serialize};

/// Spot count range over non-missing wells.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SfuRange {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    /// Number of wells with a spot count.
    pub count: usize,
}

/// What a well export contains, in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WellProfile {
    /// Total number of records.
    pub n_records: usize,
    /// Distinct donor ids (empty ids excluded).
    pub donors: Vec<String>,
    /// Distinct plate ids.
    pub plates: Vec<String>,
    /// Distinct stimulus labels (missing labels excluded).
    pub stimuli: Vec<String>,
    /// Distinct secreting-population labels.
    pub populations: Vec<String>,
    /// Channel codes taken from `"<code> Total"` populations.
    pub channel_codes: Vec<String>,
    /// Spot count range; `None` when every well is missing.
    pub sfu: Option<SfuRange>,
    /// Wells without a spot count.
    pub n_missing_sfu: usize,
    /// Wells without a stimulus label.
    pub n_unlabeled: usize,
}

impl WellProfile {
    pub fn has_donor(&self, donor: &str) -> bool {
        self.donors.iter().any(|d| d == donor)
    }

    pub fn has_plate(&self, plate: &str) -> bool {
        self.plates.iter().any(|p| p == plate)
    }

    pub fn has_stimulus(&self, stimulus: &str) -> bool {
        self.stimuli.iter().any(|s| s == stimulus)
    }

    pub fn has_channel(&self, code: &str) -> bool {
        self.channel_codes.iter().any(|c| c == code)
    }

    /// Stimulus labels containing `fragment`.
    pub fn stimuli_containing<'a>(&'a self, fragment: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.stimuli
            .iter()
            .map(String::as_str)
            .filter(move |s| s.contains(fragment))
    }

    /// Fraction of wells with a missing spot count.
    pub fn missing_fraction(&self) -> f64 {
        if self.n_records == 0 {
            0.0
        } else {
            self.n_missing_sfu as f64 / self.n_records as f64
        }
    }
}

impl std::fmt::Display for WellProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Well Export Profile")?;
        writeln!(f, "  Records:      {}", self.n_records)?;
        writeln!(f, "  Donors:       {} ({})", self.donors.len(), self.donors.join(", "))?;
        writeln!(f, "  Plates:       {} ({})", self.plates.len(), self.plates.join(", "))?;
        writeln!(f, "  Stimuli:      {}", self.stimuli.len())?;
        writeln!(f, "  Channels:     {}", self.channel_codes.join(", "))?;
        writeln!(f, "  Unlabeled:    {}", self.n_unlabeled)?;
        writeln!(
            f,
            "  Missing SFU:  {} ({:.1}%)",
            self.n_missing_sfu,
            self.missing_fraction() * 100.0
        )?;
        match &self.sfu {
            Some(range) => writeln!(
                f,
                "  SFU range:    {:.1} - {:.1} (mean {:.2}, n = {})",
                range.min, range.max, range.mean, range.count
            )?,
            None => writeln!(f, "  SFU range:    no spot counts")?,
        }
        Ok(())
    }
}

fn push_unique(seen: &mut Vec<String>, value: &str) {
    if !seen.iter().any(|v| v == value) {
        seen.push(value.to_string());
    }
}

/// Profile a set of well records.
pub fn profile_wells(records: &[WellRecord]) -> WellProfile {
    let mut profile = WellProfile {
        n_records: records.len(),
        ..WellProfile::default()
    };

    let mut sum = 0.0;
    let mut count = 0usize;
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;

    for record in records {
        if !record.donor.trim().is_empty() {
            push_unique(&mut profile.donors, &record.donor);
        }
        push_unique(&mut profile.plates, &record.plate);
        match record.stimulus() {
            Some(stim) => push_unique(&mut profile.stimuli, stim),
            None => profile.n_unlabeled += 1,
        }
        push_unique(&mut profile.populations, &record.population);
        if let Some(code) = channel_code(&record.population) {
            push_unique(&mut profile.channel_codes, code);
        }

        if record.is_missing() {
            profile.n_missing_sfu += 1;
        } else {
            sum += record.sfu;
            count += 1;
            min = min.min(record.sfu);
            max = max.max(record.sfu);
        }
    }

    if count > 0 {
        profile.sfu = Some(SfuRange {
            min,
            max,
            mean: sum / count as f64,
            count,
        });
    }
    profile
}
