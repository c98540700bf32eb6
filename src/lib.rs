//! FluoroSpot Response Classification Library
//!
//! This library classifies FluoroSpot immunoassay responses: per-well spot
//! counts from a plate reader are compared against a control condition and
//! each stimulus is called a positive or negative immune response.
//!
//! # Overview
//!
//! The library is organized into composable modules:
//!
//! - **data**: Well records, export loading, and the flat result table
//! - **config**: Assay configuration, validation, and suggestion
//! - **profile**: Summary profile of a well export
//! - **compare**: Stimulus-versus-control statistics and the response call
//! - **test**: Hypothesis tests (Levene, Student/Welch t, Poisson tail)
//! - **pipeline**: Batch, donor, and plate analyzers with diagnostics
//!
//! # Example
//!
//! ```no_run
//! use fluorospot::prelude::*;
//!
//! // Load configuration and data
//! let config = AssayConfig::from_path("config.yaml").unwrap();
//! let donors = load_donor_file("export.csv").unwrap();
//!
//! // Run the analysis
//! let outcome = Analyzer::new(&config).unwrap().analyze_batch(&donors);
//! outcome.table.to_tsv("fluorospot-results.tsv").unwrap();
//! ```

pub mod compare;
pub mod config;
pub mod data;
pub mod error;
pub mod pipeline;
pub mod profile;
pub mod test;

/// Convenient re-exports for common usage.
pub mod prelude {
    pub use crate::compare::{classify, compute, StatResult};
    pub use crate::config::{
        suggest_config, validate_config, validate_config_for_data, AssayConfig, ConditionGroup,
        ConfigSuggestion, Label, OrderedMap, PlateConditions, ValidationReport,
    };
    pub use crate::data::{
        load_donor_dir, load_donor_file, read_wells, read_wells_file, DonorRecords, LabelValue,
        ResultRow, ResultTable, WellRecord,
    };
    pub use crate::error::{FluoroError, Result};
    pub use crate::pipeline::{
        Analyzer, BatchOutcome, CancellationToken, CollectingSink, Diagnostic, DiagnosticLevel,
        DiagnosticSink, RunStatus, Scope, TracingSink,
    };
    pub use crate::profile::{profile_wells, WellProfile};
}
