pub mod matchmaking;
pub mod room;
pub mod submission;
