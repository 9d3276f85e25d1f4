use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

/// Aggregate over one user's results for a single test within a date window.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct TrendData {
    pub id: Uuid,
    pub user_id: Uuid,
    pub test_name: String,
    pub start_date: Date,
    pub end_date: Date,
    pub count: i32,
    pub min_value: Option<f64>,
    pub max_value: Option<f64>,
    pub average: Option<f64>,
    pub median: Option<f64>,
    pub standard_deviation: Option<f64>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewTrendData {
    pub user_id: Uuid,
    pub test_name: String,
    pub start_date: Date,
    pub end_date: Date,
    pub count: i32,
    pub min_value: Option<f64>,
    pub max_value: Option<f64>,
    pub average: Option<f64>,
    pub median: Option<f64>,
    pub standard_deviation: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TrendFilter {
    pub test_name: Option<String>,
}

impl TrendFilter {
    /// Trims the test name; a blank one filters nothing.
    pub fn normalized(mut self) -> Self {
        self.test_name = self
            .test_name
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_test_name_is_no_filter() {
        let filter = TrendFilter {
            test_name: Some("  ".into()),
        };
        assert_eq!(filter.normalized().test_name, None);

        let filter = TrendFilter {
            test_name: Some(" LDL ".into()),
        };
        assert_eq!(filter.normalized().test_name.as_deref(), Some("LDL"));
    }
}
