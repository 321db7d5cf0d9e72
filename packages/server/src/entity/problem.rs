use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Named rating band used to match problem difficulty to player skill.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankBand {
    pub name: String,
    pub min_rating: i32,
    pub max_rating: i32,
}

impl RankBand {
    pub fn new(name: impl Into<String>, min_rating: i32, max_rating: i32) -> Self {
        Self {
            name: name.into(),
            min_rating,
            max_rating,
        }
    }

    pub fn covers(&self, rating: i32) -> bool {
        self.min_rating <= rating && rating <= self.max_rating
    }
}

/// A problem as the catalog collaborator exposes it.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Problem {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    /// Name of the rank band this problem is pitched at.
    pub band: String,
    /// Per-test execution budget in milliseconds. Also the battle
    /// duration for rooms playing this problem.
    pub time_budget_ms: i64,
    /// Problems with an end date set are closed and never picked.
    pub end_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Problem {
    pub fn is_open(&self) -> bool {
        self.end_date.is_none()
    }
}

/// One test case of a problem.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCase {
    pub id: Uuid,
    pub problem_id: Uuid,
    pub input: String,
    pub expected_output: String,
}
