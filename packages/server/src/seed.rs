use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::entity::player::PlayerProfile;
use crate::entity::problem::{Problem, RankBand, TestCase};
use crate::store::{ProblemCatalog, RatingStore, StoreError};

/// Rank bands seeded on startup: name, min rating, max rating.
const RANK_BANDS: &[(&str, i32, i32)] = &[
    ("Bronze", 0, 999),
    ("Silver", 1000, 1999),
    ("Gold", 2000, 2999),
    ("Platinum", 3000, 9999),
];

/// Demo problems seeded on startup, one per band:
/// title, description, band, time budget in ms, test cases (stdin, expected).
#[allow(clippy::type_complexity)]
const DEMO_PROBLEMS: &[(&str, &str, &str, i64, &[(&str, &str)])] = &[
    (
        "Sum of Two Numbers",
        "Read two integers from stdin and print their sum.",
        "Bronze",
        300_000,
        &[("1 2", "3"), ("10 -4", "6"), ("0 0", "0")],
    ),
    (
        "Reverse a String",
        "Read one line and print it reversed.",
        "Silver",
        300_000,
        &[("hello", "olleh"), ("ab", "ba"), ("racecar", "racecar")],
    ),
    (
        "Nth Fibonacci",
        "Read n and print the nth Fibonacci number (F(0) = 0).",
        "Gold",
        420_000,
        &[("0", "0"), ("7", "13"), ("20", "6765")],
    ),
    (
        "Balanced Brackets",
        "Read a bracket string and print YES if it is balanced, NO otherwise.",
        "Platinum",
        420_000,
        &[("([]{})", "YES"), ("([)]", "NO"), ("", "YES")],
    ),
];

/// Demo players seeded on startup: username, rating.
const DEMO_PLAYERS: &[(&str, i32)] = &[("alice", 1500), ("bob", 1450), ("carol", 2100)];

/// Seed rank bands, demo problems and demo players. Returns the seeded
/// players so the caller can log their ids or mint dev tokens.
pub async fn seed_demo_data(
    ratings: &dyn RatingStore,
    catalog: &dyn ProblemCatalog,
) -> Result<Vec<PlayerProfile>, StoreError> {
    for &(name, min_rating, max_rating) in RANK_BANDS {
        catalog
            .insert_band(RankBand::new(name, min_rating, max_rating))
            .await?;
    }
    info!("Seeded {} rank bands", RANK_BANDS.len());

    let mut problems_inserted = 0u32;
    for &(title, description, band, time_budget_ms, cases) in DEMO_PROBLEMS {
        let problem = Problem {
            id: Uuid::new_v4(),
            title: title.to_string(),
            description: description.to_string(),
            band: band.to_string(),
            time_budget_ms,
            end_date: None,
            created_at: Utc::now(),
        };
        let test_cases = cases
            .iter()
            .map(|&(input, expected_output)| TestCase {
                id: Uuid::new_v4(),
                problem_id: problem.id,
                input: input.to_string(),
                expected_output: expected_output.to_string(),
            })
            .collect();
        catalog.insert_problem(problem, test_cases).await?;
        problems_inserted += 1;
    }
    if problems_inserted > 0 {
        info!("Seeded {} demo problems", problems_inserted);
    }

    let mut players = Vec::with_capacity(DEMO_PLAYERS.len());
    for &(username, rating) in DEMO_PLAYERS {
        let profile = PlayerProfile::new(username, rating);
        ratings.insert(profile.clone()).await?;
        players.push(profile);
    }
    if !players.is_empty() {
        info!("Seeded {} demo players", players.len());
    }

    Ok(players)
}
