//! Per-donor analysis across cytokine channels.

use super::Analyzer;
use crate::config::population_label;
use crate::data::{group_by_key, ResultRow, WellRecord};
use tracing::debug;

impl Analyzer<'_> {
    /// Analyze every configured cytokine channel of one donor.
    ///
    /// Channels are visited in configuration order and plates in first-seen
    /// order within each channel. A channel absent from the data adds nothing.
    pub fn analyze_donor(&self, donor_id: &str, records: &[WellRecord]) -> Vec<ResultRow> {
        let mut rows = Vec::new();
        for (cytokine, code) in self.config.cytokines.iter() {
            let population = population_label(code);
            let channel: Vec<WellRecord> = records
                .iter()
                .filter(|r| r.population == population)
                .cloned()
                .collect();
            if channel.is_empty() {
                debug!(donor = donor_id, %cytokine, channel = %code, "no wells for channel");
                continue;
            }

            for (_plate, plate_records) in group_by_key(&channel, |r| r.plate.as_str()) {
                rows.extend(self.analyze_plate(donor_id, cytokine, &plate_records));
            }
        }
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AssayConfig;

    fn record(plate: &str, stim: &str, population: &str, sfu: f64) -> WellRecord {
        WellRecord::new("D1", plate, stim, population, sfu)
    }

    #[test]
    fn test_channels_then_plates_in_order() {
        let config = AssayConfig::new(200_000, 20.0, "DMSO")
            .with_cytokine("IL-10", "LED550")
            .with_cytokine("IFNg", "LED490")
            .with_cytokine("TNFa", "LED700");
        let analyzer = Analyzer::new(&config).unwrap();
        let records = vec![
            record("plate_2", "DMSO", "LED490 Total", 5.0),
            record("plate_1", "DMSO", "LED490 Total", 6.0),
            record("plate_2", "PHA", "LED490 Total", 40.0),
            record("plate_1", "PHA", "LED490 Total", 42.0),
            record("plate_1", "DMSO", "LED550 Total", 3.0),
            record("plate_1", "PHA", "LED550 Total", 9.0),
            record("plate_1", "PHA", "LED550 Spots", 9.0),
        ];
        let rows = analyzer.analyze_donor("D1", &records);

        let keys: Vec<(&str, &str, &str)> = rows
            .iter()
            .map(|r| (r.cytokine.as_str(), r.plate.as_str(), r.stimulus.as_str()))
            .collect();
        assert_eq!(
            keys,
            vec![
                ("IL-10", "plate_1", "DMSO"),
                ("IL-10", "plate_1", "PHA"),
                ("IFNg", "plate_2", "DMSO"),
                ("IFNg", "plate_2", "PHA"),
                ("IFNg", "plate_1", "DMSO"),
                ("IFNg", "plate_1", "PHA"),
            ]
        );
        assert!(rows.iter().all(|r| r.donor_id == "D1"));
        assert_eq!(rows[1].sfu_values, vec![9.0]);
    }

    #[test]
    fn test_donor_without_matching_channel() {
        let config = AssayConfig::new(200_000, 20.0, "DMSO").with_cytokine("IFNg", "LED490");
        let analyzer = Analyzer::new(&config).unwrap();
        let records = vec![record("plate_1", "DMSO", "LED640 Total", 5.0)];
        assert!(analyzer.analyze_donor("D1", &records).is_empty());
    }
}
