pub mod http;

use async_trait::async_trait;
use common::{JudgeOutcome, JudgeRequest, SubmissionStatus};
use tracing::warn;

use crate::entity::problem::{Problem, TestCase};

pub use http::HttpJudgeClient;

/// Error talking to the judge engine.
#[derive(Debug, thiserror::Error)]
pub enum JudgeError {
    #[error("judge engine unreachable: {0}")]
    Transport(String),
    #[error("judge engine returned an invalid response: {0}")]
    InvalidResponse(String),
}

/// Remote judge engine: executes one test case and reports the outcome.
#[async_trait]
pub trait JudgeClient: Send + Sync {
    async fn judge(&self, request: JudgeRequest) -> Result<JudgeOutcome, JudgeError>;
}

/// Aggregate result of grading a submission over a problem's test cases.
#[derive(Clone, Debug)]
pub struct GradedRun {
    pub status: SubmissionStatus,
    /// Test cases that passed within the problem's time budget.
    pub grade: i32,
    /// Total execution time, milliseconds.
    pub execution_time: i64,
    /// Total memory, kilobytes.
    pub memory_usage: i64,
    /// Failure detail when status is not Accepted.
    pub detail: Option<String>,
}

impl GradedRun {
    fn failed(status: SubmissionStatus, detail: impl Into<String>) -> Self {
        Self {
            status,
            grade: 0,
            execution_time: 0,
            memory_usage: 0,
            detail: Some(detail.into()),
        }
    }
}

/// Run the submission against every test case in order.
///
/// The first non-Accepted verdict aborts the remaining cases and the run
/// records that failure with zeroed metrics. A judge transport failure is
/// absorbed the same way as a Runtime Error run; it must never propagate
/// out of a submission path.
pub async fn grade_submission(
    client: &dyn JudgeClient,
    problem: &Problem,
    test_cases: &[TestCase],
    language_id: i32,
    source_code: &str,
) -> GradedRun {
    let cpu_time_limit = Some((problem.time_budget_ms as f64 / 1000.0).ceil());
    let mut run = GradedRun {
        status: SubmissionStatus::Accepted,
        grade: 0,
        execution_time: 0,
        memory_usage: 0,
        detail: None,
    };

    for case in test_cases {
        let request = JudgeRequest {
            language_id,
            source_code: source_code.to_string(),
            stdin: case.input.clone(),
            expected_output: case.expected_output.clone(),
            cpu_time_limit,
        };

        let outcome = match client.judge(request).await {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(problem = %problem.id, error = %err, "judge call failed, recording runtime error");
                return GradedRun::failed(SubmissionStatus::RuntimeError, err.to_string());
            }
        };

        if !outcome.verdict.is_accepted() {
            let detail = outcome
                .detail
                .unwrap_or_else(|| outcome.verdict.to_string());
            return GradedRun::failed(outcome.verdict.submission_status(), detail);
        }

        if outcome.time_ms <= problem.time_budget_ms {
            run.grade += 1;
        }
        run.execution_time += outcome.time_ms;
        run.memory_usage += outcome.memory_kb;
    }

    run
}
