pub mod judge;
pub mod submission_status;
pub mod verdict;

pub use judge::{JudgeOutcome, JudgeRequest, JudgeResponse};
pub use submission_status::SubmissionStatus;
pub use verdict::Verdict;
