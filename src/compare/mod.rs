//! Stimulus-versus-control statistics.
//!
//! [`compute`] turns the replicate spot counts of one stimulus and its control
//! into a [`StatResult`]: normalized spot count, per-replicate Poisson
//! significance, a one-sided two-sample test and the stimulation index.
//! [`classify`] applies the positive-response rule to a result. Neither ever
//! fails; degenerate inputs produce conservative defaults.

pub mod descriptive;

use crate::test::{poisson_right_tail, test_levene, test_t_student, test_t_welch, Alternative};
use descriptive::{all_equal, drop_missing, mean};
use serde::{Deserialize, Serialize};

/// Significance level for the variance check and the response call.
pub const ALPHA: f64 = 0.05;

/// Minimum stimulation index for a positive response.
pub const MIN_STIMULATION_INDEX: f64 = 2.0;

/// Floor applied to the control mean before normalizing.
const CONTROL_FLOOR: f64 = 1.0;

/// Floor applied to the Poisson background rate.
const LAMBDA_FLOOR: f64 = 2.0;

/// Statistics for one stimulus against its control.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatResult {
    /// One-sided p-value for stimulus mean > control mean.
    pub t_test_p: f64,
    /// Stimulation index, `mean(stim) / max(mean(control), 1)`.
    pub si: f64,
    /// `P(X >= v)` under the control rate, one per stimulus replicate.
    pub poisson_p_values: Vec<f64>,
    /// Background-subtracted spots per million cells, never negative.
    pub sfc: f64,
}

impl StatResult {
    /// Result for a comparison without usable data.
    pub fn degenerate(n_stim: usize) -> Self {
        Self {
            t_test_p: 1.0,
            si: 0.0,
            poisson_p_values: vec![1.0; n_stim],
            sfc: 0.0,
        }
    }

    /// Mean of the Poisson p-values; `NaN` when there are none.
    pub fn poisson_average(&self) -> f64 {
        mean(&self.poisson_p_values)
    }
}

/// Compare stimulus replicates against control replicates.
///
/// Missing (`NaN`) replicates are dropped from both samples. If either sample
/// is then empty the degenerate result is returned, with one Poisson p-value
/// of 1.0 per original stimulus replicate.
pub fn compute(control: &[f64], stim: &[f64], cells_per_well: u64) -> StatResult {
    let control_values = drop_missing(control);
    let stim_values = drop_missing(stim);
    if control_values.is_empty() || stim_values.is_empty() || cells_per_well == 0 {
        return StatResult::degenerate(stim.len());
    }

    let control_avg = mean(&control_values).max(CONTROL_FLOOR);
    let stim_avg = mean(&stim_values);

    let sfc = ((stim_avg - control_avg) * (1_000_000.0 / cells_per_well as f64)).max(0.0);

    let lambda = control_avg.max(LAMBDA_FLOOR);
    let poisson_p_values = stim_values
        .iter()
        .map(|&v| poisson_right_tail(v, lambda))
        .collect();

    let t_test_p = one_sided_p(&control_values, &stim_values);

    let si = if control_avg > 0.0 { stim_avg / control_avg } else { 0.0 };

    StatResult {
        t_test_p,
        si,
        poisson_p_values,
        sfc,
    }
}

/// One-sided two-sample p-value for `mean(stim) > mean(control)`.
///
/// Two constant samples are decided directly. Otherwise Levene's test picks
/// between the pooled and the Welch t-test. Undefined results become 1.0.
fn one_sided_p(control: &[f64], stim: &[f64]) -> f64 {
    if all_equal(control) && all_equal(stim) {
        return if stim[0] <= control[0] { 1.0 } else { 0.0 };
    }

    let equal_var = test_levene(&[control, stim]).equal_variance(ALPHA);
    let result = if equal_var {
        test_t_student(stim, control, Alternative::Greater)
    } else {
        test_t_welch(stim, control, Alternative::Greater)
    };

    if result.is_defined() {
        result.p_value
    } else {
        1.0
    }
}

/// Positive-response call for a comparison.
///
/// Positive iff the normalized count exceeds `sfc_cutoff`, the stimulation
/// index exceeds 2, and either the t-test or the mean Poisson p-value is
/// below 0.05.
pub fn classify(stat: &StatResult, sfc_cutoff: f64) -> bool {
    let significant = stat.t_test_p < ALPHA || stat.poisson_average() < ALPHA;
    stat.sfc > sfc_cutoff && stat.si > MIN_STIMULATION_INDEX && significant
}
