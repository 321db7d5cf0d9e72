use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Status of a submission during the judging lifecycle.
///
/// Serialized with the human-readable forms clients display directly
/// ("Wrong Answer", not "WrongAnswer").
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SubmissionStatus {
    /// Created but not judged yet.
    Pending,
    /// All test cases passed.
    Accepted,
    /// Output did not match expected output on some test case.
    #[serde(rename = "Wrong Answer")]
    WrongAnswer,
    /// Program crashed, timed out, failed to compile, or the judge
    /// could not be reached.
    #[serde(rename = "Runtime Error")]
    RuntimeError,
}

impl SubmissionStatus {
    /// Returns true if this is a final verdict (judging is complete).
    pub fn is_final(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Returns true if this is a successful verdict.
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }

    /// All possible status values.
    pub const ALL: &'static [SubmissionStatus] = &[
        Self::Pending,
        Self::Accepted,
        Self::WrongAnswer,
        Self::RuntimeError,
    ];

    /// Returns the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Accepted => "Accepted",
            Self::WrongAnswer => "Wrong Answer",
            Self::RuntimeError => "Runtime Error",
        }
    }
}

impl fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Default for SubmissionStatus {
    fn default() -> Self {
        Self::Pending
    }
}

/// Error when parsing an invalid status string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseStatusError {
    invalid: String,
}

impl fmt::Display for ParseStatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Invalid status '{}'. Valid values: {}",
            self.invalid,
            SubmissionStatus::ALL
                .iter()
                .map(|s| s.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        )
    }
}

impl std::error::Error for ParseStatusError {}

impl FromStr for SubmissionStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Accepted" => Ok(Self::Accepted),
            "Wrong Answer" => Ok(Self::WrongAnswer),
            "Runtime Error" => Ok(Self::RuntimeError),
            _ => Err(ParseStatusError {
                invalid: s.to_string(),
            }),
        }
    }
}
