//! Data structures for FluoroSpot analysis.

pub mod loader;
mod record;
mod result;

pub use loader::{load_donor_dir, load_donor_file, read_wells, read_wells_file, REQUIRED_COLUMNS};
pub use record::{group_by_key, merge_donors, split_by_donor, DonorRecords, LabelValue, WellRecord};
pub use result::{Comparison, ResultRow, ResultTable, TableSummary, DEFAULT_CONDITION};
