//! # Scoring Module / 计分模块
//!
//! Folds the outcomes of a case's steps, in order, into its [`TestResult`].
//!
//! Weighted cases (any step declares a `score`) sum the scores awarded to
//! their steps, capped at the case's `meta.score`. Unweighted cases are
//! binary: full marks unless a must-pass step fails.
//!
//! 按顺序将用例各步骤的结果汇总为 [`TestResult`]。
//! 加权用例（任一步骤声明了 `score`）累加各步骤得分，并以 `meta.score` 为上限；
//! 非加权用例为二元计分：除非必过步骤失败，否则得满分。

use crate::core::config::TestCase;
use crate::core::models::{ErrorDetail, StepOutcome, StepScore, TestResult};

/// Whether the remaining steps of a case should run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Halt,
}

/// Accumulates step outcomes for one case.
/// 为单个用例累积步骤结果。
#[derive(Debug, Clone)]
pub struct ScoreAggregator {
    meta_score: f64,
    max_score: f64,
    weighted: bool,
    total: f64,
    step_scores: Vec<StepScore>,
    error_details: Vec<ErrorDetail>,
    halted: Option<String>,
}

impl ScoreAggregator {
    pub fn new(case: &TestCase) -> Self {
        Self {
            meta_score: case.meta.score,
            max_score: case.max_score(),
            weighted: case.is_weighted(),
            total: 0.0,
            step_scores: Vec::new(),
            error_details: Vec::new(),
            halted: None,
        }
    }

    /// Records the outcome of the next step.
    ///
    /// Returns [`Flow::Halt`] when a must-pass step failed; no further
    /// outcome should be recorded after that.
    pub fn record(&mut self, outcome: StepOutcome) -> Flow {
        if let Some(cap) = outcome.cap {
            self.step_scores.push(StepScore {
                label: outcome.label.clone(),
                awarded: if outcome.success { outcome.awarded } else { 0.0 },
                cap,
            });
        }

        if outcome.success {
            self.total += outcome.awarded;
            return Flow::Continue;
        }

        if let Some(detail) = outcome.detail {
            self.error_details.push(detail);
        }
        if outcome.must_pass {
            self.halted = Some(outcome.message);
            Flow::Halt
        } else {
            Flow::Continue
        }
    }

    /// Score accumulated so far, capped at `meta.score`.
    pub fn accumulated(&self) -> f64 {
        self.total.min(self.meta_score)
    }

    pub fn is_halted(&self) -> bool {
        self.halted.is_some()
    }

    /// Produces the final result of the case.
    pub fn finish(self, time: f64) -> TestResult {
        let accumulated = self.accumulated();
        let step_scores = if self.weighted {
            self.step_scores
        } else {
            Vec::new()
        };

        if let Some(message) = self.halted {
            return TestResult {
                success: false,
                message,
                time,
                score: accumulated,
                max_score: self.max_score,
                step_scores,
                error_details: self.error_details,
            };
        }

        let score = if self.weighted {
            accumulated
        } else {
            self.meta_score
        };
        let success = score > 0.0 || self.max_score == 0.0;
        let message = if success {
            "All steps completed"
        } else {
            "Some steps failed"
        };

        TestResult {
            success,
            message: message.to_string(),
            time,
            score,
            max_score: self.max_score,
            step_scores,
            error_details: self.error_details,
        }
    }

    /// The result reported for a case that was only printed, never run.
    pub fn dry_run(case: &TestCase, time: f64) -> TestResult {
        TestResult {
            success: true,
            message: "Dry run".to_string(),
            time,
            score: 0.0,
            max_score: case.max_score(),
            step_scores: Vec::new(),
            error_details: Vec::new(),
        }
    }
}
