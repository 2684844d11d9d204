//! Reporting boundary between the engine and whatever presents its messages.
//!
//! Data errors are reported as warnings and the phase continues; fatal
//! reports accompany a transition that was aborted.

use std::sync::Mutex;
use tracing::{error, warn};

pub trait Reporter: Send + Sync {
    fn report_warning(&self, message: &str);
    fn report_fatal(&self, message: &str);
}

/// Sends every report to the tracing subscriber.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn report_warning(&self, message: &str) {
        warn!(target: "circuit_sim::report", "{}", message);
    }

    fn report_fatal(&self, message: &str) {
        error!(target: "circuit_sim::report", "{}", message);
    }
}

/// Severity of a recorded report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Fatal,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Report {
    pub severity: Severity,
    pub message: String,
}

/// Logs like [`TracingReporter`] and also keeps every message so a caller
/// can return them, e.g. in an HTTP response.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    reports: Mutex<Vec<Report>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove and return everything recorded so far.
    pub fn take(&self) -> Vec<Report> {
        match self.reports.lock() {
            Ok(mut reports) => std::mem::take(&mut *reports),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }

    pub fn warnings(&self) -> Vec<String> {
        self.snapshot()
            .into_iter()
            .filter(|r| r.severity == Severity::Warning)
            .map(|r| r.message)
            .collect()
    }

    pub fn snapshot(&self) -> Vec<Report> {
        match self.reports.lock() {
            Ok(reports) => reports.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn record(&self, severity: Severity, message: &str) {
        let report = Report {
            severity,
            message: message.to_string(),
        };
        match self.reports.lock() {
            Ok(mut reports) => reports.push(report),
            Err(poisoned) => poisoned.into_inner().push(report),
        }
    }
}

impl Reporter for RecordingReporter {
    fn report_warning(&self, message: &str) {
        TracingReporter.report_warning(message);
        self.record(Severity::Warning, message);
    }

    fn report_fatal(&self, message: &str) {
        TracingReporter.report_fatal(message);
        self.record(Severity::Fatal, message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_reporter_keeps_order_and_drains() {
        let reporter = RecordingReporter::new();
        reporter.report_warning("first");
        reporter.report_fatal("second");
        reporter.report_warning("third");

        assert_eq!(reporter.warnings(), vec!["first", "third"]);

        let drained = reporter.take();
        assert_eq!(drained.len(), 3);
        assert_eq!(drained[1].severity, Severity::Fatal);
        assert!(reporter.take().is_empty());
    }
}
