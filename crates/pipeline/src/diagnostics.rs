//! Structured diagnostics mirrored to `tracing`

use tracing::{debug, error, info, warn};

use crate::result::{DiagnosticEvent, Severity, Stage};

/// Collects the diagnostic trace of one run
#[derive(Debug)]
pub(crate) struct Diagnostics {
    analysis: String,
    stage: Stage,
    events: Vec<DiagnosticEvent>,
}

impl Diagnostics {
    pub fn new(analysis: impl Into<String>) -> Self {
        Self {
            analysis: analysis.into(),
            stage: Stage::Setup,
            events: Vec::new(),
        }
    }

    /// Mark the start of `stage`; fatal errors are attributed to it
    pub fn enter(&mut self, stage: Stage) {
        debug!(analysis = %self.analysis, %stage, "entering stage");
        self.stage = stage;
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    fn record(&mut self, stage: Stage, severity: Severity, message: String) {
        self.events.push(DiagnosticEvent {
            stage,
            severity,
            message,
        });
    }

    pub fn info(&mut self, stage: Stage, message: impl Into<String>) {
        let message = message.into();
        info!(analysis = %self.analysis, %stage, "{}", message);
        self.record(stage, Severity::Info, message);
    }

    pub fn warn(&mut self, stage: Stage, message: impl Into<String>) {
        let message = message.into();
        warn!(analysis = %self.analysis, %stage, "{}", message);
        self.record(stage, Severity::Warning, message);
    }

    pub fn error(&mut self, stage: Stage, message: impl Into<String>) {
        let message = message.into();
        error!(analysis = %self.analysis, %stage, "{}", message);
        self.record(stage, Severity::Error, message);
    }

    pub fn into_events(self) -> Vec<DiagnosticEvent> {
        self.events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_keep_order_and_severity() {
        let mut diag = Diagnostics::new("a1");
        assert_eq!(diag.stage(), Stage::Setup);
        diag.enter(Stage::Alignment);
        diag.info(Stage::Alignment, "resampled");
        diag.error(diag.stage(), "failed");

        let events = diag.into_events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].severity, Severity::Info);
        assert_eq!(events[1].stage, Stage::Alignment);
        assert_eq!(events[1].message, "failed");
    }
}
