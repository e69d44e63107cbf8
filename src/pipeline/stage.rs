//! Per-request stage machine.

use std::fmt;
use std::time::Instant;

use serde::Serialize;

/// Where a request is in the pipeline.
///
/// Stages advance strictly in declaration order; `Failed` is reachable from
/// any non-terminal stage and absorbs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Received,
    Authenticated,
    RateChecked,
    Validated,
    AwaitingGeneration,
    Assessed,
    Completed,
    Failed,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Received => "received",
            Stage::Authenticated => "authenticated",
            Stage::RateChecked => "rate_checked",
            Stage::Validated => "validated",
            Stage::AwaitingGeneration => "awaiting_generation",
            Stage::Assessed => "assessed",
            Stage::Completed => "completed",
            Stage::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::Completed | Stage::Failed)
    }

    fn successor(&self) -> Option<Stage> {
        match self {
            Stage::Received => Some(Stage::Authenticated),
            Stage::Authenticated => Some(Stage::RateChecked),
            Stage::RateChecked => Some(Stage::Validated),
            Stage::Validated => Some(Stage::AwaitingGeneration),
            Stage::AwaitingGeneration => Some(Stage::Assessed),
            Stage::Assessed => Some(Stage::Completed),
            Stage::Completed | Stage::Failed => None,
        }
    }

    pub fn can_advance_to(&self, next: Stage) -> bool {
        if next == Stage::Failed {
            return !self.is_terminal();
        }
        self.successor() == Some(next)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tracks one request through the stages and logs each transition.
#[derive(Debug)]
pub struct StageTracker {
    request_id: String,
    stage: Stage,
    /// Last non-failed stage, kept for failure reporting.
    reached: Stage,
    started: Instant,
}

impl StageTracker {
    pub fn new(request_id: impl Into<String>) -> Self {
        let request_id = request_id.into();
        tracing::debug!(request_id = %request_id, stage = %Stage::Received, "Pipeline stage");
        Self {
            request_id,
            stage: Stage::Received,
            reached: Stage::Received,
            started: Instant::now(),
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Move to `next`. Out-of-order transitions are ignored and logged.
    pub fn advance(&mut self, next: Stage) {
        if !self.stage.can_advance_to(next) {
            debug_assert!(false, "invalid stage transition {} -> {}", self.stage, next);
            tracing::error!(
                request_id = %self.request_id,
                from = %self.stage,
                to = %next,
                "Invalid pipeline stage transition"
            );
            return;
        }
        if next != Stage::Failed {
            self.reached = next;
        }
        self.stage = next;
        tracing::debug!(
            request_id = %self.request_id,
            stage = %next,
            elapsed_ms = self.started.elapsed().as_millis() as u64,
            "Pipeline stage"
        );
    }

    /// Absorb into `Failed`; returns the last stage reached before failing.
    pub fn fail(&mut self) -> Stage {
        self.advance(Stage::Failed);
        self.reached
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transitions_are_one_way() {
        assert!(Stage::Received.can_advance_to(Stage::Authenticated));
        assert!(Stage::Assessed.can_advance_to(Stage::Completed));
        assert!(!Stage::Authenticated.can_advance_to(Stage::Received));
        assert!(!Stage::Received.can_advance_to(Stage::Validated));
        assert!(!Stage::Completed.can_advance_to(Stage::Failed));
        assert!(!Stage::Failed.can_advance_to(Stage::Failed));
    }

    #[test]
    fn test_every_live_stage_can_fail() {
        let mut stage = Stage::Received;
        while !stage.is_terminal() {
            assert!(stage.can_advance_to(Stage::Failed));
            stage = stage.successor().unwrap();
        }
    }

    #[test]
    fn test_tracker_reports_last_reached_stage() {
        let mut tracker = StageTracker::new("req-1");
        tracker.advance(Stage::Authenticated);
        tracker.advance(Stage::RateChecked);
        assert_eq!(tracker.fail(), Stage::RateChecked);
        assert_eq!(tracker.stage(), Stage::Failed);
    }
}
