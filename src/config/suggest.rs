//! Draft configuration inferred from a profiled well export.

use super::{AssayConfig, Label, OrderedMap};
use crate::profile::WellProfile;
use serde::{Deserialize, Serialize};

/// Control labels in order of preference (case-insensitive substring match).
const CONTROL_CANDIDATES: [&str; 5] = ["DMSO", "Control", "Negative", "PBS", "Medium"];

/// Usual cytokine read on each plate-reader channel.
const KNOWN_CHANNELS: [(&str, &str); 4] = [
    ("LED490", "IFNg"),
    ("LED550", "IL-10"),
    ("LED640", "IL-17"),
    ("LED700", "TNFa"),
];

const UNKNOWN_SPECIES: &str = "Unknown species";

/// Configuration values guessed from data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigSuggestion {
    /// First stimulus label that looks like a control.
    pub control_stim: Option<Label>,
    /// Cytokine name -> channel code, one per channel seen in the data.
    pub cytokines: OrderedMap<String>,
    /// Every plate seen, with a placeholder species.
    pub plates: OrderedMap<String>,
}

impl ConfigSuggestion {
    /// Complete the suggestion into a configuration.
    ///
    /// Without a control candidate the control label falls back to `DMSO`.
    pub fn into_config(self, cells_per_well: u64, sfc_cutoff: f64) -> AssayConfig {
        let control = self
            .control_stim
            .unwrap_or_else(|| Label::new(CONTROL_CANDIDATES[0]));
        let mut config = AssayConfig::new(cells_per_well, sfc_cutoff, control);
        config.cytokines = self.cytokines;
        config.plates = self.plates;
        config
    }
}

/// Display name for a channel code.
pub fn cytokine_for_channel(code: &str) -> String {
    KNOWN_CHANNELS
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, name)| name.to_string())
        .unwrap_or_else(|| format!("Cytokine_{}", code.replace("LED", "")))
}

/// Suggest control, cytokine and plate settings from a well profile.
pub fn suggest_config(profile: &WellProfile) -> ConfigSuggestion {
    let control_stim = CONTROL_CANDIDATES.iter().find_map(|candidate| {
        let needle = candidate.to_lowercase();
        profile
            .stimuli
            .iter()
            .find(|s| s.to_lowercase().contains(&needle))
            .map(|s| Label::new(s.as_str()))
    });

    let cytokines = profile
        .channel_codes
        .iter()
        .map(|code| (cytokine_for_channel(code), code.clone()))
        .collect();

    let plates = profile
        .plates
        .iter()
        .map(|plate| (plate.as_str(), UNKNOWN_SPECIES.to_string()))
        .collect();

    ConfigSuggestion {
        control_stim,
        cytokines,
        plates,
    }
}
