use serde::Serialize;

use crate::{
    analysis::{Diagnostic, LeakPattern, RetainedSize},
    Error,
};

/// Final output of an analysis session.
///
/// A self-contained value meant to be rendered or transmitted by the caller. Even a
/// failed analysis produces one (see [`AnalysisResult::degraded`]), so callers always
/// have something to display.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AnalysisResult {
    /// Plain-language explanation of the dominant retention problem
    pub root_cause: String,
    /// Remediation snippet; empty when nothing specific is suggested
    pub suggested_fix: String,
    /// Confidence in `root_cause`, in `[0, 1]`
    pub confidence: f64,
    /// Independent findings (pinning, fragmentation, ...)
    pub diagnostics: Vec<Diagnostic>,
    /// The rule that produced `root_cause`, if any fired
    pub pattern: Option<LeakPattern>,
    /// Retained-size estimates of the top candidates, largest first
    pub retained_sizes: Vec<RetainedSize>,
}

impl AnalysisResult {
    /// Root cause reported when no rule fires.
    pub const NO_PATTERN: &'static str = "No significant leak pattern detected.";

    /// Confidence reported when no rule fires.
    pub const NO_PATTERN_CONFIDENCE: f64 = 0.3;

    /// Creates the result of an analysis in which no rule fired.
    #[must_use]
    pub fn inconclusive() -> Self {
        AnalysisResult {
            root_cause: Self::NO_PATTERN.to_string(),
            suggested_fix: String::new(),
            confidence: Self::NO_PATTERN_CONFIDENCE,
            diagnostics: Vec::new(),
            pattern: None,
            retained_sizes: Vec::new(),
        }
    }

    /// Creates a zero-confidence result describing why the analysis failed.
    #[must_use]
    pub fn degraded(error: &Error) -> Self {
        let (root_cause, suggested_fix) = match error {
            Error::Cancelled => (
                "Analysis was cancelled before a diagnosis could be made.".to_string(),
                "Re-run the analysis without cancelling it.".to_string(),
            ),
            Error::SnapshotNotReady(reason) => (
                format!("The heap snapshot could not be analyzed: {reason}."),
                "Capture a new snapshot while the runtime is suspended.".to_string(),
            ),
            other => (format!("Analysis failed: {other}."), String::new()),
        };

        AnalysisResult {
            root_cause,
            suggested_fix,
            confidence: 0.0,
            ..Self::inconclusive()
        }
    }

    /// Returns `true` if a leak rule fired.
    #[must_use]
    pub fn is_conclusive(&self) -> bool {
        self.pattern.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_degraded_results() {
        let cancelled = AnalysisResult::degraded(&Error::Cancelled);
        assert_eq!(cancelled.confidence, 0.0);
        assert!(cancelled.root_cause.contains("cancelled"));
        assert!(!cancelled.is_conclusive());

        let not_ready =
            AnalysisResult::degraded(&Error::SnapshotNotReady("cannot walk the managed heap".into()));
        assert_eq!(
            not_ready.root_cause,
            "The heap snapshot could not be analyzed: cannot walk the managed heap."
        );
    }

    #[test]
    fn test_inconclusive() {
        let result = AnalysisResult::inconclusive();
        assert_eq!(result.root_cause, AnalysisResult::NO_PATTERN);
        assert!((result.confidence - 0.3).abs() < f64::EPSILON);
    }
}
