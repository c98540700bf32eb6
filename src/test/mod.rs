//! Statistical hypothesis tests for stimulus-versus-control comparisons.


pub use levene::{test_levene, LeveneResult};
pub use poisson::poisson_right_tail;
pub use ttest::{test_t_student, test_t_welch, Alternative, TTestResult};
