//! # JSON Reporting Module / JSON 报告模块
//!
//! Machine-readable output: exactly one JSON object on stdout.
//!
//! 机器可读输出：在标准输出上仅输出一个 JSON 对象。

use serde::Serialize;

use crate::core::models::{ErrorDetail, Status, StepScore, TestResult, percentage, round_to};

/// One case in the JSON report.
#[derive(Debug, Serialize)]
pub struct JsonCase<'a> {
    pub name: &'a str,
    pub success: bool,
    pub status: Status,
    pub message: &'a str,
    pub time: f64,
    pub score: f64,
    pub max_score: f64,
    pub step_scores: &'a [StepScore],
    pub error_details: &'a [ErrorDetail],
}

/// The whole JSON report.
/// 完整的 JSON 报告。
#[derive(Debug, Serialize)]
pub struct JsonReport<'a> {
    pub total_score: f64,
    pub max_score: f64,
    pub percentage: f64,
    pub tests: Vec<JsonCase<'a>>,
}

impl<'a> JsonReport<'a> {
    pub fn new(names: &[&'a str], results: &'a [TestResult]) -> Self {
        let total_score: f64 = results.iter().map(|r| r.score).sum();
        let max_score: f64 = results.iter().map(|r| r.max_score).sum();
        let tests = names
            .iter()
            .zip(results)
            .map(|(name, result)| JsonCase {
                name,
                success: result.success,
                status: result.status(),
                message: &result.message,
                time: result.time,
                score: result.score,
                max_score: result.max_score,
                step_scores: &result.step_scores,
                error_details: &result.error_details,
            })
            .collect();
        Self {
            total_score: round_to(total_score, 1),
            max_score: round_to(max_score, 1),
            percentage: round_to(percentage(total_score, max_score), 1),
            tests,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
