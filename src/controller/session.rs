//! Per-request session state.
//!
//! One `AnalysisSession` is created per submitted URL and owns
//! everything the UI renders: the step sequence, the activity log, and
//! the final report. Starting a new request builds a fresh session, so
//! reset-on-resubmit is structural rather than a field-by-field wipe.

use crate::models::{ContentKind, ProcessStep, ReportData};
use chrono::{DateTime, Utc};

/// One timestamped line of session activity.
#[derive(Debug, Clone)]
pub struct SessionLogEntry {
    pub at: DateTime<Utc>,
    pub message: String,
}

/// All mutable state for one in-flight analysis request.
#[derive(Debug)]
pub struct AnalysisSession {
    /// The submitted URL.
    pub url: String,
    /// Content-type classification of the URL.
    pub kind: ContentKind,
    /// Scripted progress steps, mutated in place by the timeline driver.
    pub steps: Vec<ProcessStep>,
    /// Activity log shown alongside the steps.
    pub logs: Vec<SessionLogEntry>,
    /// The parsed report, set once on successful completion.
    pub report: Option<ReportData>,
    /// When the request was submitted.
    pub started_at: DateTime<Utc>,
}

impl AnalysisSession {
    pub fn new(url: String, kind: ContentKind, steps: Vec<ProcessStep>) -> Self {
        Self {
            url,
            kind,
            steps,
            logs: Vec::new(),
            report: None,
            started_at: Utc::now(),
        }
    }

    /// Append a timestamped log line.
    pub fn log(&mut self, message: impl Into<String>) {
        self.logs.push(SessionLogEntry {
            at: Utc::now(),
            message: message.into(),
        });
    }

    /// Mark a step as the currently running one.
    pub fn activate_step(&mut self, index: usize) {
        if let Some(step) = self.steps.get_mut(index) {
            step.active = true;
        }
    }

    /// Update the sub-progress of a step that carries one.
    pub fn set_step_progress(&mut self, index: usize, pct: u8) {
        if let Some(step) = self.steps.get_mut(index) {
            if step.progress.is_some() {
                step.progress = Some(pct.min(100));
            }
        }
    }

    /// Mark a step finished; a finished scan step always shows 100.
    pub fn complete_step(&mut self, index: usize) {
        if let Some(step) = self.steps.get_mut(index) {
            step.active = false;
            step.completed = true;
            if step.progress.is_some() {
                step.progress = Some(100);
            }
        }
    }

    /// The index of the currently active step, if any.
    pub fn active_step(&self) -> Option<(usize, &ProcessStep)> {
        self.steps.iter().enumerate().find(|(_, s)| s.active)
    }

    /// How many steps have finished.
    pub fn completed_count(&self) -> usize {
        self.steps.iter().filter(|s| s.completed).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::timeline;

    fn session() -> AnalysisSession {
        let kind = ContentKind::WebPage;
        AnalysisSession::new(
            "https://example.com/a".to_string(),
            kind,
            timeline::build_steps(kind),
        )
    }

    #[test]
    fn test_step_lifecycle() {
        let mut session = session();
        session.activate_step(0);
        assert_eq!(session.active_step().map(|(i, _)| i), Some(0));

        session.complete_step(0);
        assert!(session.steps[0].completed);
        assert!(!session.steps[0].active);
        assert_eq!(session.completed_count(), 1);
        assert!(session.active_step().is_none());
    }

    #[test]
    fn test_progress_only_set_on_progress_steps() {
        let kind = ContentKind::ShortVideo;
        let mut session = AnalysisSession::new(
            "https://www.tiktok.com/@u/video/1".to_string(),
            kind,
            timeline::build_steps(kind),
        );

        // "fetch" carries no progress, "scan" does
        session.set_step_progress(0, 50);
        assert!(session.steps[0].progress.is_none());

        let scan = session.steps.iter().position(|s| s.id == "scan").unwrap();
        session.set_step_progress(scan, 50);
        assert_eq!(session.steps[scan].progress, Some(50));

        session.complete_step(scan);
        assert_eq!(session.steps[scan].progress, Some(100));
    }

    #[test]
    fn test_log_appends_in_order() {
        let mut session = session();
        session.log("first");
        session.log("second");
        assert_eq!(session.logs.len(), 2);
        assert_eq!(session.logs[0].message, "first");
        assert_eq!(session.logs[1].message, "second");
    }
}
