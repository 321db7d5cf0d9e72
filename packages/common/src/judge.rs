use serde::{Deserialize, Deserializer, Serialize, de};

use crate::Verdict;

/// Single test-case execution request sent to the judge engine.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JudgeRequest {
    /// Judge0 language id (e.g. 71 = Python 3, 54 = C++17).
    pub language_id: i32,
    /// Full program source.
    pub source_code: String,
    /// Test case input fed to stdin.
    pub stdin: String,
    /// Expected stdout; the engine diffs against it.
    pub expected_output: String,
    /// CPU limit in seconds, derived from the problem time budget.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu_time_limit: Option<f64>,
}

/// Status object embedded in a judge engine response.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JudgeStatusBody {
    pub id: i64,
    #[serde(default)]
    pub description: String,
}

/// Raw response body from the judge engine for one test case.
///
/// `time` arrives as a decimal string of seconds ("0.002") from Judge0,
/// but numbers and null are tolerated too.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct JudgeResponse {
    pub status: Option<JudgeStatusBody>,
    #[serde(default, deserialize_with = "seconds_field")]
    pub time: Option<f64>,
    /// Peak memory in kilobytes.
    pub memory: Option<i64>,
    pub stderr: Option<String>,
    pub compile_output: Option<String>,
    pub message: Option<String>,
}

impl JudgeResponse {
    /// Verdict carried by the response, if the status id is known.
    pub fn verdict(&self) -> Option<Verdict> {
        self.status.as_ref().and_then(|s| Verdict::from_status_id(s.id))
    }

    /// Execution time converted to whole milliseconds.
    pub fn time_ms(&self) -> i64 {
        self.time.map(|t| (t * 1000.0).round() as i64).unwrap_or(0)
    }

    /// Best human-readable failure detail, mirroring the priority the
    /// platform has always shown: stderr, status description, compiler
    /// output, engine message.
    pub fn failure_detail(&self) -> String {
        self.stderr
            .clone()
            .filter(|s| !s.is_empty())
            .or_else(|| {
                self.status
                    .as_ref()
                    .map(|s| s.description.clone())
                    .filter(|s| !s.is_empty())
            })
            .or_else(|| self.compile_output.clone().filter(|s| !s.is_empty()))
            .or_else(|| self.message.clone().filter(|s| !s.is_empty()))
            .unwrap_or_else(|| "Error".to_string())
    }
}

/// Outcome of one judged test case, normalized for session accounting.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JudgeOutcome {
    pub verdict: Verdict,
    /// Execution time in milliseconds.
    pub time_ms: i64,
    /// Peak memory in kilobytes.
    pub memory_kb: i64,
    /// Failure detail when the verdict is not Accepted.
    pub detail: Option<String>,
}

impl JudgeOutcome {
    pub fn accepted(time_ms: i64, memory_kb: i64) -> Self {
        Self {
            verdict: Verdict::Accepted,
            time_ms,
            memory_kb,
            detail: None,
        }
    }

    pub fn rejected(verdict: Verdict, detail: impl Into<String>) -> Self {
        Self {
            verdict,
            time_ms: 0,
            memory_kb: 0,
            detail: Some(detail.into()),
        }
    }
}

fn seconds_field<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Num(f64),
        Str(String),
    }

    match Option::<Raw>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Raw::Num(n)) => Ok(Some(n)),
        Some(Raw::Str(s)) => s
            .parse::<f64>()
            .map(Some)
            .map_err(|_| de::Error::custom(format!("invalid time value '{s}'"))),
    }
}
