use serde::{Deserialize, Serialize};
use std::fmt;

use crate::SubmissionStatus;

/// Per-test-case verdict reported by the judge engine.
///
/// Mirrors the Judge0 status table; runtime errors keep their signal
/// distinction because the raw status id is preserved in transcripts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Verdict {
    /// Not picked up by the engine yet.
    InQueue,
    /// Currently executing.
    Processing,
    Accepted,
    WrongAnswer,
    TimeLimitExceeded,
    CompilationError,
    /// Runtime error (SIGSEGV).
    RuntimeErrorSigsegv,
    /// Runtime error (SIGXFSZ).
    RuntimeErrorSigxfsz,
    /// Runtime error (SIGFPE).
    RuntimeErrorSigfpe,
    /// Runtime error (SIGABRT).
    RuntimeErrorSigabrt,
    /// Runtime error (non-zero exit code).
    RuntimeErrorNzec,
    /// Runtime error (other).
    RuntimeErrorOther,
    /// The engine itself failed.
    InternalError,
    /// Executable format error.
    ExecFormatError,
}

impl Verdict {
    /// Maps a Judge0 numeric status id to a verdict.
    pub fn from_status_id(id: i64) -> Option<Verdict> {
        match id {
            1 => Some(Self::InQueue),
            2 => Some(Self::Processing),
            3 => Some(Self::Accepted),
            4 => Some(Self::WrongAnswer),
            5 => Some(Self::TimeLimitExceeded),
            6 => Some(Self::CompilationError),
            7 => Some(Self::RuntimeErrorSigsegv),
            8 => Some(Self::RuntimeErrorSigxfsz),
            9 => Some(Self::RuntimeErrorSigfpe),
            10 => Some(Self::RuntimeErrorSigabrt),
            11 => Some(Self::RuntimeErrorNzec),
            12 => Some(Self::RuntimeErrorOther),
            13 => Some(Self::InternalError),
            14 => Some(Self::ExecFormatError),
            _ => None,
        }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }

    /// True once the engine has finished with the test case.
    pub fn is_final(&self) -> bool {
        !matches!(self, Self::InQueue | Self::Processing)
    }

    /// True for any of the runtime-error family.
    pub fn is_runtime_error(&self) -> bool {
        matches!(
            self,
            Self::RuntimeErrorSigsegv
                | Self::RuntimeErrorSigxfsz
                | Self::RuntimeErrorSigfpe
                | Self::RuntimeErrorSigabrt
                | Self::RuntimeErrorNzec
                | Self::RuntimeErrorOther
        )
    }

    /// Collapses the verdict into the submission-level status recorded
    /// when this verdict aborts judging.
    pub fn submission_status(&self) -> SubmissionStatus {
        match self {
            Self::Accepted => SubmissionStatus::Accepted,
            Self::WrongAnswer | Self::TimeLimitExceeded => SubmissionStatus::WrongAnswer,
            _ => SubmissionStatus::RuntimeError,
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::InQueue => "In Queue",
            Self::Processing => "Processing",
            Self::Accepted => "Accepted",
            Self::WrongAnswer => "Wrong Answer",
            Self::TimeLimitExceeded => "Time Limit Exceeded",
            Self::CompilationError => "Compilation Error",
            Self::RuntimeErrorSigsegv => "Runtime Error (SIGSEGV)",
            Self::RuntimeErrorSigxfsz => "Runtime Error (SIGXFSZ)",
            Self::RuntimeErrorSigfpe => "Runtime Error (SIGFPE)",
            Self::RuntimeErrorSigabrt => "Runtime Error (SIGABRT)",
            Self::RuntimeErrorNzec => "Runtime Error (NZEC)",
            Self::RuntimeErrorOther => "Runtime Error",
            Self::InternalError => "Internal Error",
            Self::ExecFormatError => "Exec Format Error",
        };
        f.write_str(s)
    }
}
