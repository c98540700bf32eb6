//! Assay configuration for FluoroSpot analysis.
//!
//! An [`AssayConfig`] is loaded once per run (usually from YAML) and is
//! read-only while the analysis runs.
//!
//! ```yaml
//! cells_per_well: 200000
//! sfc_cutoff: 20
//! control_stim: DMSO
//! cytokines:
//!   IFNg: LED490
//!   IL-10: LED550
//! plates:
//!   plate_1: S. pneumoniae
//! experimental_conditions:
//!   plate_1:
//!     vaccine:
//!       control: DMSO_G1
//!       stimuli: [STIM_A, STIM_B]
//! ```

mod ordered;
mod suggest;
mod validate;

pub use ordered::{Label, OrderedMap};
pub use suggest::{suggest_config, ConfigSuggestion};
pub use validate::{
    validate_config, validate_config_for_data, Finding, Severity, ValidationReport,
};

use crate::error::{FluoroError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Population label suffix used by the plate reader for a channel's total count.
pub const POPULATION_SUFFIX: &str = " Total";

/// One independent control/stimuli subset on a grouped plate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionGroup {
    /// Exact stimulus label of this group's control wells.
    pub control: Label,
    /// Stimulus labels compared against `control`, in analysis order.
    #[serde(default)]
    pub stimuli: Vec<Label>,
}

impl ConditionGroup {
    pub fn new<I, S>(control: impl Into<Label>, stimuli: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Label>,
    {
        Self {
            control: control.into(),
            stimuli: stimuli.into_iter().map(Into::into).collect(),
        }
    }
}

/// Group name -> group layout for one plate.
pub type PlateConditions = OrderedMap<ConditionGroup>;

/// Process-wide assay parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssayConfig {
    /// Cells plated per well; spot counts are scaled to spots per million cells.
    pub cells_per_well: u64,
    /// Minimum normalized SFC for a positive call.
    pub sfc_cutoff: f64,
    /// Default control label (substring-matched in simple mode).
    pub control_stim: Label,
    /// Cytokine display name -> channel code (e.g. `IFNg: LED490`).
    pub cytokines: OrderedMap<String>,
    /// Plate id -> species/annotation label.
    #[serde(default)]
    pub plates: OrderedMap<String>,
    /// Plate id -> grouped layout. Plates absent here use simple mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experimental_conditions: Option<OrderedMap<PlateConditions>>,
}

impl AssayConfig {
    /// Create a simple-mode configuration with no plates or groups.
    pub fn new(cells_per_well: u64, sfc_cutoff: f64, control_stim: impl Into<Label>) -> Self {
        Self {
            cells_per_well,
            sfc_cutoff,
            control_stim: control_stim.into(),
            cytokines: OrderedMap::new(),
            plates: OrderedMap::new(),
            experimental_conditions: None,
        }
    }

    /// Add a cytokine channel.
    pub fn with_cytokine(mut self, name: &str, channel_code: &str) -> Self {
        self.cytokines.insert(name, channel_code.to_string());
        self
    }

    /// Add a plate annotation.
    pub fn with_plate(mut self, plate_id: &str, species: &str) -> Self {
        self.plates.insert(plate_id, species.to_string());
        self
    }

    /// Add a grouped layout for one plate.
    pub fn with_plate_conditions(mut self, plate_id: &str, conditions: PlateConditions) -> Self {
        self.experimental_conditions
            .get_or_insert_with(OrderedMap::new)
            .insert(plate_id, conditions);
        self
    }

    /// Load from YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(FluoroError::from)
    }

    /// Load from a YAML file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml(&yaml)
    }

    /// Save to YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(FluoroError::from)
    }

    /// Hard checks that make an analysis run meaningless if violated.
    ///
    /// These are the only configuration problems that abort a run; everything
    /// else is reported by [`validate_config`] and tolerated by the analyzers.
    pub fn check(&self) -> Result<()> {
        if self.cells_per_well == 0 {
            return Err(FluoroError::InvalidConfig(
                "cells_per_well must be positive".to_string(),
            ));
        }
        if self.sfc_cutoff.is_nan() || self.sfc_cutoff < 0.0 {
            return Err(FluoroError::InvalidConfig(format!(
                "sfc_cutoff must be a non-negative number, got {}",
                self.sfc_cutoff
            )));
        }
        if self.control_stim.trim().is_empty() {
            return Err(FluoroError::InvalidConfig(
                "control_stim cannot be empty".to_string(),
            ));
        }
        if self.cytokines.is_empty() {
            return Err(FluoroError::InvalidConfig(
                "at least one cytokine mapping is required".to_string(),
            ));
        }
        Ok(())
    }

    /// Species/annotation label for a plate, empty when unmapped.
    pub fn species(&self, plate_id: &str) -> &str {
        self.plates.get(plate_id).map(String::as_str).unwrap_or("")
    }

    /// Whether any grouped layouts are configured.
    pub fn has_conditions(&self) -> bool {
        self.experimental_conditions
            .as_ref()
            .is_some_and(|c| !c.is_empty())
    }

    /// Grouped layout for a plate, if configured with at least one group.
    pub fn plate_conditions(&self, plate_id: &str) -> Option<&PlateConditions> {
        self.experimental_conditions
            .as_ref()
            .and_then(|c| c.get(plate_id))
            .filter(|groups| !groups.is_empty())
    }

    /// The example configuration written by `fluorospot example`.
    pub fn example() -> Self {
        let vaccine = ConditionGroup::new("DMSO_G1", ["STIM_G1_A", "STIM_G1_B"]);
        let booster = ConditionGroup::new("DMSO_G2", ["STIM_G2_A", "STIM_G2_B"]);
        let conditions: PlateConditions = vec![("vaccine", vaccine), ("booster", booster)]
            .into_iter()
            .collect();

        Self::new(200_000, 20.0, "DMSO")
            .with_cytokine("IFNg", "LED490")
            .with_cytokine("IL-10", "LED550")
            .with_plate("plate_1", "S. pneumoniae")
            .with_plate("plate_2", "S. aureus")
            .with_plate_conditions("plate_2", conditions)
    }
}

/// Secreting-population label for a channel code (`LED490` -> `LED490 Total`).
pub fn population_label(channel_code: &str) -> String {
    format!("{}{}", channel_code, POPULATION_SUFFIX)
}

/// Channel code of a `"<code> Total"` population label.
pub fn channel_code(population: &str) -> Option<&str> {
    population.strip_suffix(POPULATION_SUFFIX)
}
