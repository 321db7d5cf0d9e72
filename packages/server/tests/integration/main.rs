mod common;

mod match_lifecycle;
mod matchmaking;
