pub mod leaderboard;
pub mod matches;
pub mod player;
pub mod problem;
pub mod room;
pub mod submission;
