//! Data profiling for well exports.

mod wells;

pub use wells::{profile_wells, SfuRange, WellProfile};
