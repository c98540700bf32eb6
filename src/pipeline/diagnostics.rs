//! Structured diagnostics and progress reporting.
//!
//! Analyzers never print. Data-quality problems (a missing control, a
//! stimulus absent from a plate) become [`Diagnostic`] events delivered to a
//! [`DiagnosticSink`]; what the sink does with them never affects results.

use serde::{Deserialize, Serialize};
use std::sync::{Mutex, PoisonError};
use tracing::{info, warn};

/// Diagnostic severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticLevel {
    Info,
    Warning,
}

/// Where in the data a diagnostic applies.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scope {
    pub donor: Option<String>,
    pub plate: Option<String>,
    pub group: Option<String>,
    pub stimulus: Option<String>,
}

impl Scope {
    pub fn donor(donor: &str) -> Self {
        Self {
            donor: Some(donor.to_string()),
            ..Self::default()
        }
    }

    pub fn plate(mut self, plate: &str) -> Self {
        self.plate = Some(plate.to_string());
        self
    }

    pub fn group(mut self, group: &str) -> Self {
        self.group = Some(group.to_string());
        self
    }

    pub fn stimulus(mut self, stimulus: &str) -> Self {
        self.stimulus = Some(stimulus.to_string());
        self
    }
}

/// One event raised while analyzing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub level: DiagnosticLevel,
    pub scope: Scope,
    pub message: String,
}

impl Diagnostic {
    pub fn info(scope: Scope, message: impl Into<String>) -> Self {
        Self {
            level: DiagnosticLevel::Info,
            scope,
            message: message.into(),
        }
    }

    pub fn warning(scope: Scope, message: impl Into<String>) -> Self {
        Self {
            level: DiagnosticLevel::Warning,
            scope,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts = [
            ("donor", &self.scope.donor),
            ("plate", &self.scope.plate),
            ("group", &self.scope.group),
            ("stimulus", &self.scope.stimulus),
        ];
        for (name, value) in parts {
            if let Some(value) = value {
                write!(f, "{}={} ", name, value)?;
            }
        }
        write!(f, "{}", self.message)
    }
}

/// Receiver for diagnostics and per-donor progress.
///
/// Sinks are shared across worker threads by the parallel batch runner.
pub trait DiagnosticSink: Send + Sync {
    /// Receive a diagnostic.
    fn emit(&self, diagnostic: Diagnostic);

    /// Called before donor `done + 1` of `total` is analyzed.
    fn progress(&self, _done: usize, _total: usize, _donor: &str) {}
}

/// Forwards diagnostics and progress to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn emit(&self, diagnostic: Diagnostic) {
        let Diagnostic {
            level,
            scope,
            message,
        } = diagnostic;
        let donor = scope.donor.unwrap_or_default();
        let plate = scope.plate.unwrap_or_default();
        let group = scope.group.unwrap_or_default();
        let stimulus = scope.stimulus.unwrap_or_default();
        match level {
            DiagnosticLevel::Info => info!(%donor, %plate, %group, %stimulus, "{}", message),
            DiagnosticLevel::Warning => warn!(%donor, %plate, %group, %stimulus, "{}", message),
        }
    }

    fn progress(&self, done: usize, total: usize, donor: &str) {
        info!(donor, done, total, "analyzing donor {} of {}", done + 1, total);
    }
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl DiagnosticSink for NullSink {
    fn emit(&self, _diagnostic: Diagnostic) {}
}

/// Keeps every diagnostic and progress call in memory.
#[derive(Debug, Default)]
pub struct CollectingSink {
    diagnostics: Mutex<Vec<Diagnostic>>,
    progress: Mutex<Vec<(usize, usize, String)>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Diagnostics received so far, in arrival order.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.diagnostics
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Warnings received so far.
    pub fn warnings(&self) -> Vec<Diagnostic> {
        self.diagnostics()
            .into_iter()
            .filter(|d| d.level == DiagnosticLevel::Warning)
            .collect()
    }

    /// Progress calls received so far as `(done, total, donor)`.
    pub fn progress_calls(&self) -> Vec<(usize, usize, String)> {
        self.progress
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl DiagnosticSink for CollectingSink {
    fn emit(&self, diagnostic: Diagnostic) {
        self.diagnostics
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(diagnostic);
    }

    fn progress(&self, done: usize, total: usize, donor: &str) {
        self.progress
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((done, total, donor.to_string()));
    }
}
