//! Analysis pipeline: batch -> donor -> plate -> statistics.
//!
//! An [`Analyzer`] binds a checked [`AssayConfig`] to a diagnostic sink and an
//! optional cancellation token. Each level adds its identifying columns and
//! concatenates the rows of the level below in generation order.
//!
//! ```no_run
//! use fluorospot::prelude::*;
//!
//! let config = AssayConfig::from_path("config.yaml").unwrap();
//! let donors = load_donor_dir("exports/").unwrap();
//! let outcome = Analyzer::new(&config).unwrap().analyze_batch(&donors);
//! outcome.table.to_tsv("fluorospot-results.tsv").unwrap();
//! ```

mod batch;
mod cancel;
mod diagnostics;
mod donor;
mod plate;

pub use batch::{BatchOutcome, RunStatus};
pub use cancel::CancellationToken;
pub use diagnostics::{
    CollectingSink, Diagnostic, DiagnosticLevel, DiagnosticSink, NullSink, Scope, TracingSink,
};

use crate::config::AssayConfig;
use crate::error::Result;

static DEFAULT_SINK: TracingSink = TracingSink;

/// Runs the analysis for one configuration.
#[derive(Clone)]
pub struct Analyzer<'a> {
    config: &'a AssayConfig,
    sink: &'a dyn DiagnosticSink,
    cancel: Option<CancellationToken>,
}

impl<'a> Analyzer<'a> {
    /// Create an analyzer reporting through `tracing`.
    ///
    /// Fails if the configuration does not pass [`AssayConfig::check`].
    pub fn new(config: &'a AssayConfig) -> Result<Self> {
        config.check()?;
        Ok(Self {
            config,
            sink: &DEFAULT_SINK,
            cancel: None,
        })
    }

    /// Report diagnostics and progress to `sink` instead.
    pub fn with_sink(mut self, sink: &'a dyn DiagnosticSink) -> Self {
        self.sink = sink;
        self
    }

    /// Stop between donors once `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn config(&self) -> &AssayConfig {
        self.config
    }

    fn emit(&self, diagnostic: Diagnostic) {
        self.sink.emit(diagnostic);
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancellationToken::is_cancelled)
    }
}

impl std::fmt::Debug for Analyzer<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Analyzer")
            .field("config", self.config)
            .field("cancel", &self.cancel)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FluoroError;

    #[test]
    fn test_new_rejects_bad_config() {
        let config = AssayConfig::new(0, 10.0, "DMSO").with_cytokine("IFNg", "LED490");
        assert!(matches!(Analyzer::new(&config), Err(FluoroError::InvalidConfig(_))));

        let config = AssayConfig::new(200_000, 10.0, "DMSO");
        assert!(Analyzer::new(&config).is_err());

        assert!(Analyzer::new(&AssayConfig::example()).is_ok());
    }

    #[test]
    fn test_cancellation_flag() {
        let config = AssayConfig::example();
        let token = CancellationToken::new();
        let analyzer = Analyzer::new(&config).unwrap().with_cancellation(token.clone());
        assert!(!analyzer.is_cancelled());
        token.cancel();
        assert!(analyzer.is_cancelled());
    }
}
