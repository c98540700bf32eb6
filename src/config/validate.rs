//! Configuration checks, on their own and against a profiled well export.
//!
//! Unlike [`AssayConfig::check`], these never fail: every problem becomes a
//! [`Finding`] in a [`ValidationReport`] so a user sees all issues at once.

use super::AssayConfig;
use crate::profile::WellProfile;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Cell counts below this are plausible typos.
const LOW_CELL_COUNT: u64 = 1000;

const CHANNEL_CODE_PATTERN: &str = r"^LED\d{3}$";

fn is_channel_code(code: &str) -> bool {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(CHANNEL_CODE_PATTERN).ok())
        .as_ref()
        .is_some_and(|re| re.is_match(code))
}

/// How serious a finding is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tag = match self {
            Severity::Info => "ok",
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        f.pad(tag)
    }
}

/// One validation message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub severity: Severity,
    pub message: String,
}

/// Ordered list of findings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub findings: Vec<Finding>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, severity: Severity, message: impl Into<String>) {
        self.findings.push(Finding {
            severity,
            message: message.into(),
        });
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.push(Severity::Info, message);
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        self.push(Severity::Warning, message);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.push(Severity::Error, message);
    }

    /// Whether any finding is an error.
    pub fn has_errors(&self) -> bool {
        self.findings.iter().any(|f| f.severity == Severity::Error)
    }

    /// Findings of one severity.
    pub fn with_severity(&self, severity: Severity) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(move |f| f.severity == severity)
    }

    /// Append another report's findings.
    pub fn merge(&mut self, other: ValidationReport) {
        self.findings.extend(other.findings);
    }
}

impl std::fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for finding in &self.findings {
            writeln!(f, "[{:>7}] {}", finding.severity, finding.message)?;
        }
        Ok(())
    }
}

/// Validate a configuration without looking at any data.
pub fn validate_config(config: &AssayConfig) -> ValidationReport {
    let mut report = ValidationReport::new();

    if config.cells_per_well == 0 {
        report.error("cell count must be positive");
    } else if config.cells_per_well < LOW_CELL_COUNT {
        report.warning(format!("cell count is very low ({})", config.cells_per_well));
    } else {
        report.info(format!("cells plated: {}", config.cells_per_well));
    }

    if config.sfc_cutoff.is_nan() || config.sfc_cutoff < 0.0 {
        report.error(format!("SFC cutoff cannot be negative ({})", config.sfc_cutoff));
    } else {
        report.info(format!("SFC cutoff: {}", config.sfc_cutoff));
    }

    if config.control_stim.trim().is_empty() {
        report.error("control stimulus cannot be empty");
    } else {
        report.info(format!("control stimulus: '{}'", config.control_stim));
    }

    validate_cytokines(config, &mut report);
    validate_plates(config, &mut report);
    validate_conditions(config, &mut report);
    report
}

fn validate_cytokines(config: &AssayConfig, report: &mut ValidationReport) {
    if config.cytokines.is_empty() {
        report.error("at least one cytokine mapping is required");
        return;
    }

    let mut valid = 0;
    for (name, code) in config.cytokines.iter() {
        if name.trim().is_empty() {
            report.warning("empty cytokine name found");
        } else if code.trim().is_empty() {
            report.warning(format!("empty channel code for cytokine '{}'", name));
        } else if !is_channel_code(code) {
            report.warning(format!(
                "invalid channel code for '{}': '{}' (expected LED###)",
                name, code
            ));
        } else {
            valid += 1;
        }
    }
    if valid == 0 {
        report.error("no valid cytokine mappings found");
    } else {
        report.info(format!("found {} valid cytokine mapping(s)", valid));
    }

    let mut codes: Vec<&str> = config
        .cytokines
        .values()
        .map(String::as_str)
        .filter(|c| !c.is_empty())
        .collect();
    let n_codes = codes.len();
    codes.sort_unstable();
    codes.dedup();
    if codes.len() != n_codes {
        report.warning("duplicate channel codes found");
    }
}

fn validate_plates(config: &AssayConfig, report: &mut ValidationReport) {
    if config.plates.is_empty() {
        report.error("at least one plate mapping is required");
        return;
    }

    let mut valid = 0;
    for (plate, species) in config.plates.iter() {
        if plate.trim().is_empty() {
            report.warning("empty plate id found");
        } else if species.trim().is_empty() {
            report.warning(format!("empty species for plate '{}'", plate));
        } else {
            valid += 1;
        }
    }
    if valid == 0 {
        report.error("no valid plate mappings found");
    } else {
        report.info(format!("found {} valid plate mapping(s)", valid));
    }
}

fn validate_conditions(config: &AssayConfig, report: &mut ValidationReport) {
    let conditions = match &config.experimental_conditions {
        Some(c) if !c.is_empty() => c,
        _ => {
            report.info("no experimental conditions specified (using simple mode)");
            return;
        }
    };

    let mut total_groups = 0;
    for (plate, groups) in conditions.iter() {
        if plate.trim().is_empty() {
            report.warning("empty plate id in experimental conditions");
            continue;
        }

        let mut plate_groups = 0;
        for (name, group) in groups.iter() {
            if name.trim().is_empty() {
                report.warning(format!("empty group name in plate '{}'", plate));
                continue;
            }
            if group.control.trim().is_empty() {
                report.error(format!("empty control for group '{}' in plate '{}'", name, plate));
                continue;
            }
            if group.stimuli.is_empty() {
                report.error(format!(
                    "at least one stimulus required for group '{}' in plate '{}'",
                    name, plate
                ));
                continue;
            }
            let named = group.stimuli.iter().filter(|s| !s.trim().is_empty()).count();
            if named != group.stimuli.len() {
                report.warning(format!(
                    "empty stimulus names found in group '{}', plate '{}'",
                    name, plate
                ));
            }
            if named == 0 {
                report.error(format!("no valid stimuli for group '{}' in plate '{}'", name, plate));
                continue;
            }
            plate_groups += 1;
        }

        if plate_groups == 0 {
            report.error(format!("no valid groups found for plate '{}'", plate));
        }
        total_groups += plate_groups;
    }

    if total_groups == 0 {
        report.error("no valid experimental groups found");
    } else {
        report.info(format!("found {} experimental group(s)", total_groups));
    }
}

/// Validate a configuration against what a well export actually contains.
pub fn validate_config_for_data(config: &AssayConfig, profile: &WellProfile) -> ValidationReport {
    let mut report = ValidationReport::new();

    let control = config.control_stim.as_str();
    if profile.has_stimulus(control) {
        report.info(format!("control stimulus '{}' found in data", control));
    } else {
        let similar: Vec<&str> = profile.stimuli_containing(control).take(3).collect();
        if similar.is_empty() {
            report.error(format!("control stimulus '{}' not found in data", control));
        } else {
            report.warning(format!(
                "control stimulus '{}' not found exactly, similar: {}",
                control,
                similar.join(", ")
            ));
        }
    }

    if !config.plates.is_empty() {
        let (matching, missing): (Vec<&str>, Vec<&str>) = config
            .plates
            .keys()
            .map(|p| p.as_str())
            .partition(|p| profile.has_plate(p));
        if !missing.is_empty() {
            report.warning(format!("plates in config but not in data: {}", missing.join(", ")));
        }
        if matching.is_empty() {
            report.error("no matching plates between config and data");
        } else {
            report.info(format!("matching plates: {}", matching.join(", ")));
        }
    }

    let (matching, missing): (Vec<&str>, Vec<&str>) = config
        .cytokines
        .values()
        .map(String::as_str)
        .partition(|c| profile.has_channel(c));
    if !missing.is_empty() {
        report.warning(format!("channels in config but not in data: {}", missing.join(", ")));
    }
    if !matching.is_empty() {
        report.info(format!("matching channels: {}", matching.join(", ")));
    }

    if let Some(conditions) = &config.experimental_conditions {
        for (plate, groups) in conditions.iter() {
            if !profile.has_plate(plate) {
                report.warning(format!("experimental-condition plate '{}' not in data", plate));
                continue;
            }
            for (name, group) in groups.iter() {
                if !profile.has_stimulus(&group.control) {
                    report.warning(format!(
                        "control '{}' of group '{}' (plate '{}') not in data",
                        group.control, name, plate
                    ));
                }
                let absent: Vec<&str> = group
                    .stimuli
                    .iter()
                    .map(|s| s.as_str())
                    .filter(|s| !profile.has_stimulus(s))
                    .collect();
                if !absent.is_empty() {
                    report.warning(format!(
                        "stimuli of group '{}' (plate '{}') not in data: {}",
                        name,
                        plate,
                        absent.join(", ")
                    ));
                }
            }
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConditionGroup, PlateConditions};
    use crate::data::WellRecord;
    use crate::profile::profile_wells;

    fn messages(report: &ValidationReport, severity: Severity) -> Vec<String> {
        report.with_severity(severity).map(|f| f.message.clone()).collect()
    }

    #[test]
    fn test_example_config_is_valid() {
        let report = validate_config(&AssayConfig::example());
        assert!(!report.has_errors(), "{}", report);
        assert_eq!(report.with_severity(Severity::Warning).count(), 0);
    }

    #[test]
    fn test_basic_settings() {
        let config = AssayConfig::new(0, -1.0, " ").with_cytokine("IFNg", "LED490");
        let report = validate_config(&config);
        let errors = messages(&report, Severity::Error);
        assert!(errors.iter().any(|m| m.contains("cell count")));
        assert!(errors.iter().any(|m| m.contains("SFC cutoff")));
        assert!(errors.iter().any(|m| m.contains("control stimulus")));

        let low = AssayConfig::new(500, 10.0, "DMSO")
            .with_cytokine("IFNg", "LED490")
            .with_plate("plate_1", "S. aureus");
        let report = validate_config(&low);
        assert!(!report.has_errors());
        assert!(messages(&report, Severity::Warning)[0].contains("very low"));
    }

    #[test]
    fn test_channel_codes() {
        let config = AssayConfig::new(200_000, 10.0, "DMSO")
            .with_cytokine("IFNg", "LED490")
            .with_cytokine("IL-10", "LED490")
            .with_cytokine("IL-2", "blue")
            .with_plate("plate_1", "S. aureus");
        let report = validate_config(&config);
        let warnings = messages(&report, Severity::Warning);
        assert!(warnings.iter().any(|m| m.contains("'blue'")));
        assert!(warnings.iter().any(|m| m.contains("duplicate")));
        assert!(!report.has_errors());

        let bad = AssayConfig::new(200_000, 10.0, "DMSO")
            .with_cytokine("IFNg", "LED49")
            .with_plate("plate_1", "S. aureus");
        assert!(validate_config(&bad).has_errors());
    }

    #[test]
    fn test_plates_and_groups() {
        let groups: PlateConditions = vec![
            ("ok", ConditionGroup::new("DMSO", ["A"])),
            ("no_stimuli", ConditionGroup::new("DMSO", Vec::<&str>::new())),
            ("no_control", ConditionGroup::new("", ["B"])),
        ]
        .into_iter()
        .collect();
        let config = AssayConfig::new(200_000, 10.0, "DMSO")
            .with_cytokine("IFNg", "LED490")
            .with_plate("plate_1", "")
            .with_plate_conditions("plate_1", groups);
        let report = validate_config(&config);
        let errors = messages(&report, Severity::Error);
        assert!(errors.iter().any(|m| m.contains("no valid plate mappings")));
        assert!(errors.iter().any(|m| m.contains("'no_stimuli'")));
        assert!(errors.iter().any(|m| m.contains("'no_control'")));
        assert!(messages(&report, Severity::Info)
            .iter()
            .any(|m| m == "found 1 experimental group(s)"));
    }

    fn profile() -> WellProfile {
        profile_wells(&[
            WellRecord::new("D1", "plate_1", "DMSO_G1", "LED490 Total", 5.0),
            WellRecord::new("D1", "plate_1", "STIM_G1_A", "LED490 Total", 40.0),
            WellRecord::new("D1", "plate_2", "DMSO_G1", "LED490 Total", 5.0),
            WellRecord::new("D1", "plate_2", "STIM_G1_A", "LED490 Total", 40.0),
        ])
    }

    #[test]
    fn test_config_for_data() {
        let report = validate_config_for_data(&AssayConfig::example(), &profile());
        assert!(!report.has_errors(), "{}", report);
        let warnings = messages(&report, Severity::Warning);
        assert!(warnings.iter().any(|m| m.contains("not found exactly, similar: DMSO_G1")));
        assert!(warnings.iter().any(|m| m.contains("LED550")));
        assert!(warnings.iter().any(|m| m.contains("DMSO_G2")));
        assert!(warnings.iter().any(|m| m.contains("STIM_G1_B")));
    }

    #[test]
    fn test_config_for_data_errors() {
        let config = AssayConfig::new(200_000, 10.0, "PBS")
            .with_cytokine("IFNg", "LED490")
            .with_plate("plate_9", "S. aureus");
        let report = validate_config_for_data(&config, &profile());
        let errors = messages(&report, Severity::Error);
        assert_eq!(errors.len(), 2);
        assert!(errors[0].contains("'PBS' not found"));
        assert!(errors[1].contains("no matching plates"));
    }

    #[test]
    fn test_report_merge_and_display() {
        let mut report = ValidationReport::new();
        report.info("fine");
        let mut other = ValidationReport::new();
        other.error("broken");
        report.merge(other);
        assert!(report.has_errors());
        let text = report.to_string();
        assert!(text.contains("[     ok] fine"));
        assert!(text.contains("[  error] broken"));
    }
}
