//! Per-plate analysis in simple or grouped layout.

use super::{Analyzer, Diagnostic, Scope};
use crate::compare::descriptive::{drop_missing, mean, std_population};
use crate::compare::{classify, compute};
use crate::config::{ConditionGroup, PlateConditions};
use crate::data::{Comparison, ResultRow, WellRecord, DEFAULT_CONDITION};
use tracing::debug;

/// Identifying columns shared by every row of one plate.
struct PlateContext<'r> {
    donor_id: &'r str,
    cytokine: &'r str,
    plate: &'r str,
    species: &'r str,
}

impl PlateContext<'_> {
    fn scope(&self) -> Scope {
        Scope::donor(self.donor_id).plate(self.plate)
    }

    fn row(&self, condition: &str, stimulus: &str, values: Vec<f64>) -> ResultRow {
        let present = drop_missing(&values);
        ResultRow {
            donor_id: self.donor_id.to_string(),
            plate: self.plate.to_string(),
            condition: condition.to_string(),
            species: self.species.to_string(),
            cytokine: self.cytokine.to_string(),
            stimulus: stimulus.to_string(),
            average: mean(&present),
            std: std_population(&present),
            sfu_values: values,
            comparison: None,
        }
    }
}

fn sfu_where(records: &[&WellRecord], pred: impl Fn(&str) -> bool) -> Vec<f64> {
    records
        .iter()
        .filter(|r| r.stimulus().is_some_and(&pred))
        .map(|r| r.sfu)
        .collect()
}

impl Analyzer<'_> {
    /// Analyze one plate of one donor for one cytokine channel.
    ///
    /// `records` are the plate's wells for that channel. A plate listed under
    /// `experimental_conditions` is analyzed per group; any other plate is
    /// analyzed in simple mode against the default control.
    pub fn analyze_plate(
        &self,
        donor_id: &str,
        cytokine: &str,
        records: &[&WellRecord],
    ) -> Vec<ResultRow> {
        let Some(first) = records.first() else {
            return Vec::new();
        };
        let ctx = PlateContext {
            donor_id,
            cytokine,
            plate: &first.plate,
            species: self.config.species(&first.plate),
        };

        match self.config.plate_conditions(ctx.plate) {
            Some(groups) => self.analyze_grouped(&ctx, groups, records),
            None => {
                if self.config.has_conditions() {
                    self.emit(Diagnostic::warning(
                        ctx.scope(),
                        format!(
                            "plate '{}' has no groups under experimental_conditions; using simple mode",
                            ctx.plate
                        ),
                    ));
                }
                self.analyze_simple(&ctx, records)
            }
        }
    }

    fn analyze_grouped(
        &self,
        ctx: &PlateContext<'_>,
        groups: &PlateConditions,
        records: &[&WellRecord],
    ) -> Vec<ResultRow> {
        let mut rows = Vec::new();
        for (name, group) in groups.iter() {
            rows.extend(self.analyze_group(ctx, name, group, records));
        }
        rows
    }

    fn analyze_group(
        &self,
        ctx: &PlateContext<'_>,
        name: &str,
        group: &ConditionGroup,
        records: &[&WellRecord],
    ) -> Vec<ResultRow> {
        let control = group.control.as_str();
        let control_values = sfu_where(records, |s| s == control);
        if control_values.is_empty() {
            self.emit(Diagnostic::warning(
                ctx.scope().group(name).stimulus(control),
                format!(
                    "control '{}' for group '{}' not found on plate '{}'; skipping group",
                    control, name, ctx.plate
                ),
            ));
            return Vec::new();
        }

        let mut rows = vec![ctx.row(name, control, control_values.clone())];
        for stimulus in &group.stimuli {
            let stimulus = stimulus.as_str();
            let stim_values = sfu_where(records, |s| s == stimulus);
            if stim_values.is_empty() {
                self.emit(Diagnostic::warning(
                    ctx.scope().group(name).stimulus(stimulus),
                    format!(
                        "stimulus '{}' for group '{}' not found on plate '{}'; skipping stimulus",
                        stimulus, name, ctx.plate
                    ),
                ));
                continue;
            }
            rows.push(self.compare_row(ctx, name, stimulus, &control_values, stim_values));
        }
        rows
    }

    fn analyze_simple(&self, ctx: &PlateContext<'_>, records: &[&WellRecord]) -> Vec<ResultRow> {
        let control = self.config.control_stim.as_str();
        let control_values = sfu_where(records, |s| s.contains(control));

        let mut stimuli: Vec<&str> = Vec::new();
        for record in records {
            if let Some(stim) = record.stimulus() {
                if !stim.contains(control) && !stimuli.contains(&stim) {
                    stimuli.push(stim);
                }
            }
        }
        debug!(
            donor = ctx.donor_id,
            plate = ctx.plate,
            controls = control_values.len(),
            stimuli = stimuli.len(),
            "simple-mode plate"
        );

        let mut rows = vec![ctx.row(DEFAULT_CONDITION, control, control_values.clone())];
        for stimulus in stimuli {
            let stim_values = sfu_where(records, |s| s == stimulus);
            rows.push(self.compare_row(ctx, DEFAULT_CONDITION, stimulus, &control_values, stim_values));
        }
        rows
    }

    fn compare_row(
        &self,
        ctx: &PlateContext<'_>,
        condition: &str,
        stimulus: &str,
        control_values: &[f64],
        stim_values: Vec<f64>,
    ) -> ResultRow {
        let stat = compute(control_values, &stim_values, self.config.cells_per_well);
        let positive = classify(&stat, self.config.sfc_cutoff);
        let poisson_average = stat.poisson_average();
        let mut row = ctx.row(condition, stimulus, stim_values);
        row.comparison = Some(Comparison {
            t_test_p: stat.t_test_p,
            si: stat.si,
            sfc: stat.sfc,
            poisson_p_values: stat.poisson_p_values,
            poisson_average,
            positive,
        });
        row
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AssayConfig;
    use crate::pipeline::CollectingSink;

    fn wells(plate: &str, layout: &[(&str, Vec<f64>)]) -> Vec<WellRecord> {
        layout
            .iter()
            .flat_map(|(stim, values)| {
                values
                    .iter()
                    .map(move |&v| WellRecord::new("D1", plate, *stim, "LED490 Total", v))
            })
            .collect()
    }

    fn simple_config() -> AssayConfig {
        AssayConfig::new(200_000, 20.0, "DMSO")
            .with_cytokine("IFNg", "LED490")
            .with_plate("plate_1", "S. aureus")
    }

    #[test]
    fn test_simple_plate() {
        let config = simple_config();
        let analyzer = Analyzer::new(&config).unwrap();
        let records = wells(
            "plate_1",
            &[
                ("DMSO", vec![5.0, 8.0, 6.0]),
                ("PHA", vec![45.0, 52.0, 48.0]),
                ("LPS", vec![35.0, 40.0, 38.0]),
                ("Medium", vec![2.0, 3.0, 1.0]),
            ],
        );
        let refs: Vec<&WellRecord> = records.iter().collect();
        let rows = analyzer.analyze_plate("D1", "IFNg", &refs);

        let labels: Vec<&str> = rows.iter().map(|r| r.stimulus.as_str()).collect();
        assert_eq!(labels, vec!["DMSO", "PHA", "LPS", "Medium"]);
        assert!(rows[0].is_control());
        assert_eq!(rows[0].species, "S. aureus");
        assert!(rows.iter().all(|r| r.condition == DEFAULT_CONDITION));
        assert!(rows[1].is_positive());
        assert!(rows[2].is_positive());
        assert!(!rows[3].is_positive());
    }

    #[test]
    fn test_simple_control_is_substring_match() {
        let config = simple_config();
        let analyzer = Analyzer::new(&config).unwrap();
        let records = wells(
            "plate_1",
            &[("DMSO_a", vec![5.0]), ("DMSO_b", vec![7.0]), ("PHA", vec![50.0, 60.0])],
        );
        let refs: Vec<&WellRecord> = records.iter().collect();
        let rows = analyzer.analyze_plate("D1", "IFNg", &refs);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].stimulus, "DMSO");
        assert_eq!(rows[0].sfu_values, vec![5.0, 7.0]);
        assert_eq!(rows[0].average, 6.0);
    }

    #[test]
    fn test_simple_plate_without_control_keeps_empty_control_row() {
        let config = simple_config();
        let analyzer = Analyzer::new(&config).unwrap();
        let records = wells("plate_1", &[("PHA", vec![50.0, 60.0])]);
        let refs: Vec<&WellRecord> = records.iter().collect();
        let rows = analyzer.analyze_plate("D1", "IFNg", &refs);
        assert_eq!(rows.len(), 2);
        assert!(rows[0].sfu_values.is_empty());
        assert!(rows[0].average.is_nan());
        let comparison = rows[1].comparison.as_ref().unwrap();
        assert_eq!(comparison.t_test_p, 1.0);
        assert_eq!(comparison.poisson_p_values, vec![1.0, 1.0]);
        assert!(!comparison.positive);
    }

    #[test]
    fn test_grouped_plate_skips_missing_pieces() {
        let conditions = vec![
            ("g1", ConditionGroup::new("CTRL_1", ["A", "MISSING"])),
            ("g2", ConditionGroup::new("CTRL_2", ["B"])),
        ]
        .into_iter()
        .collect();
        let config = simple_config().with_plate_conditions("plate_1", conditions);
        let sink = CollectingSink::new();
        let analyzer = Analyzer::new(&config).unwrap().with_sink(&sink);
        let records = wells(
            "plate_1",
            &[("CTRL_1", vec![4.0, 5.0]), ("A", vec![30.0, 35.0]), ("B", vec![9.0])],
        );
        let refs: Vec<&WellRecord> = records.iter().collect();
        let rows = analyzer.analyze_plate("D1", "IFNg", &refs);

        let labels: Vec<(&str, &str)> = rows
            .iter()
            .map(|r| (r.condition.as_str(), r.stimulus.as_str()))
            .collect();
        assert_eq!(labels, vec![("g1", "CTRL_1"), ("g1", "A")]);

        let warnings = sink.warnings();
        assert_eq!(warnings.len(), 2);
        assert_eq!(warnings[0].scope.stimulus.as_deref(), Some("MISSING"));
        assert_eq!(warnings[1].scope.group.as_deref(), Some("g2"));
        assert!(warnings[1].message.contains("skipping group"));
    }

    #[test]
    fn test_grouped_control_is_exact_match() {
        let conditions = vec![("g1", ConditionGroup::new("DMSO", ["A"]))]
            .into_iter()
            .collect();
        let config = simple_config().with_plate_conditions("plate_1", conditions);
        let sink = CollectingSink::new();
        let analyzer = Analyzer::new(&config).unwrap().with_sink(&sink);
        let records = wells("plate_1", &[("DMSO_1", vec![4.0]), ("A", vec![30.0])]);
        let refs: Vec<&WellRecord> = records.iter().collect();
        assert!(analyzer.analyze_plate("D1", "IFNg", &refs).is_empty());
        assert_eq!(sink.warnings().len(), 1);
    }

    #[test]
    fn test_unlisted_plate_falls_back_with_warning() {
        let conditions = vec![("g1", ConditionGroup::new("CTRL_1", ["A"]))]
            .into_iter()
            .collect();
        let config = simple_config().with_plate_conditions("plate_2", conditions);
        let sink = CollectingSink::new();
        let analyzer = Analyzer::new(&config).unwrap().with_sink(&sink);
        let records = wells("plate_1", &[("DMSO", vec![4.0, 6.0]), ("PHA", vec![30.0, 40.0])]);
        let refs: Vec<&WellRecord> = records.iter().collect();
        let rows = analyzer.analyze_plate("D1", "IFNg", &refs);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].condition, DEFAULT_CONDITION);
        assert_eq!(sink.warnings().len(), 1);
        assert_eq!(sink.warnings()[0].scope.plate.as_deref(), Some("plate_1"));
    }

    #[test]
    fn test_plate_with_empty_groups_falls_back_with_warning() {
        let config = AssayConfig::from_yaml(
            r#"
cells_per_well: 200000
sfc_cutoff: 20
control_stim: DMSO
cytokines:
  IFNg: LED490
experimental_conditions:
  plate_1: {}
  plate_2:
    g1:
      control: CTRL_1
      stimuli: [A]
"#,
        )
        .unwrap();
        let sink = CollectingSink::new();
        let analyzer = Analyzer::new(&config).unwrap().with_sink(&sink);
        let records = wells("plate_1", &[("DMSO", vec![4.0, 6.0]), ("PHA", vec![30.0, 40.0])]);
        let refs: Vec<&WellRecord> = records.iter().collect();
        let rows = analyzer.analyze_plate("D1", "IFNg", &refs);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].stimulus, "DMSO");
        assert_eq!(rows[1].condition, DEFAULT_CONDITION);
        assert!(rows[1].comparison.is_some());
        let warnings = sink.warnings();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].message.contains("using simple mode"));
    }

    #[test]
    fn test_numeric_grouped_labels_match_data() {
        let config = AssayConfig::from_yaml(
            r#"
cells_per_well: 200000
sfc_cutoff: 20
control_stim: DMSO
cytokines:
  IFNg: LED490
experimental_conditions:
  plate_1:
    g1:
      control: 100
      stimuli: [4990.67]
"#,
        )
        .unwrap();
        let sink = CollectingSink::new();
        let analyzer = Analyzer::new(&config).unwrap().with_sink(&sink);
        let records = wells(
            "plate_1",
            &[("100", vec![4.0, 6.0]), ("4990.67", vec![50.0, 60.0])],
        );
        let refs: Vec<&WellRecord> = records.iter().collect();
        let rows = analyzer.analyze_plate("D1", "IFNg", &refs);

        let labels: Vec<(&str, &str)> = rows
            .iter()
            .map(|r| (r.condition.as_str(), r.stimulus.as_str()))
            .collect();
        assert_eq!(labels, vec![("g1", "100"), ("g1", "4990.67")]);
        assert!(rows[1].is_positive());
        assert!(sink.warnings().is_empty());
    }

    #[test]
    fn test_empty_plate() {
        let config = simple_config();
        let analyzer = Analyzer::new(&config).unwrap();
        assert!(analyzer.analyze_plate("D1", "IFNg", &[]).is_empty());
    }
}
