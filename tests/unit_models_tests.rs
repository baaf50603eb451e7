//! # Models Module Unit Tests / Models 模块单元测试
//!
//! Tests the derived status of case results, the rounding helpers and the
//! serialized form of failure records.
//!
//! 测试用例结果的派生状态、取整辅助函数以及失败记录的序列化形式。

use lab_grader::core::models::{ErrorDetail, FailureKind, Status, TestResult, percentage, round_to};

fn result(success: bool, score: f64, max_score: f64) -> TestResult {
    TestResult {
        success,
        message: String::new(),
        time: 0.0,
        score,
        max_score,
        step_scores: Vec::new(),
        error_details: Vec::new(),
    }
}

#[cfg(test)]
mod status_tests {
    use super::*;

    #[test]
    fn test_status_derivation() {
        assert_eq!(result(true, 10.0, 10.0).status(), Status::Pass);
        assert_eq!(result(true, 4.0, 10.0).status(), Status::Partial);
        assert_eq!(result(false, 4.0, 10.0).status(), Status::Fail);
        assert_eq!(result(false, 10.0, 10.0).status(), Status::Fail);
    }

    #[test]
    fn test_status_display() {
        assert_eq!(Status::Partial.to_string(), "PARTIAL");
        assert_eq!(serde_json::to_string(&Status::Pass).unwrap(), "\"PASS\"");
    }
}

#[cfg(test)]
mod numeric_tests {
    use super::*;

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(13.33, 1), 13.3);
        assert_eq!(round_to(2.25, 0), 2.0);
        assert_eq!(round_to(66.666, 2), 66.67);
    }

    #[test]
    fn test_percentage() {
        assert_eq!(percentage(5.0, 10.0), 50.0);
        assert_eq!(percentage(5.0, 0.0), 0.0);
    }
}

#[cfg(test)]
mod error_detail_tests {
    use super::*;

    #[test]
    fn test_error_detail_skips_absent_fields() {
        let detail = ErrorDetail {
            step: 2,
            step_name: "run".to_string(),
            kind: FailureKind::SpecialJudgeFailure,
            error_message: "wrong".to_string(),
            command: "./main".to_string(),
            stdout: Some("out".to_string()),
            stderr: None,
            return_code: Some(0),
            expected_output: None,
        };
        let json = serde_json::to_value(&detail).unwrap();
        assert_eq!(json["kind"], "special_judge_failure");
        assert_eq!(json["stdout"], "out");
        assert!(json.get("stderr").is_none());
        assert!(json.get("expected_output").is_none());

        let back: ErrorDetail = serde_json::from_value(json).unwrap();
        assert_eq!(back, detail);
    }

    #[test]
    fn test_failure_kind_display() {
        assert_eq!(FailureKind::Timeout.to_string(), "timeout");
        assert_eq!(FailureKind::ReturnCodeMismatch.to_string(), "return code mismatch");
    }
}
