pub mod match_session;
pub mod matchmaking;
pub mod room_session;
pub mod scheduler;

pub use match_session::MatchCoordinator;
pub use matchmaking::{EnqueueOutcome, Matchmaker};
pub use room_session::{LeaveOutcome, RoomCoordinator};
pub use scheduler::DeadlineScheduler;
