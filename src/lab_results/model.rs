use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct LabResult {
    pub id: Uuid,
    pub user_id: Uuid,
    pub document_id: Option<Uuid>,
    pub test_name: String,
    pub test_date: Date,
    pub result_value: f64,
    pub unit: String,
    pub reference_range_low: Option<f64>,
    pub reference_range_high: Option<f64>,
    pub lab_name: Option<String>,
    pub ordering_doctor: Option<String>,
    pub notes: Option<String>,
    pub is_abnormal: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewLabResult {
    pub user_id: Uuid,
    pub document_id: Option<Uuid>,
    pub test_name: String,
    pub test_date: Date,
    pub result_value: f64,
    pub unit: String,
    pub reference_range_low: Option<f64>,
    pub reference_range_high: Option<f64>,
    pub lab_name: Option<String>,
    pub ordering_doctor: Option<String>,
    pub notes: Option<String>,
    pub is_abnormal: bool,
}

/// Query parameters for listing lab results.
#[derive(Debug, Clone, Deserialize)]
pub struct LabResultFilter {
    pub test_name: Option<String>,
    pub from: Option<Date>,
    pub to: Option<Date>,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    50
}

impl Default for LabResultFilter {
    fn default() -> Self {
        Self {
            test_name: None,
            from: None,
            to: None,
            limit: default_limit(),
            offset: 0,
        }
    }
}

pub const MAX_LIMIT: i64 = 200;

impl LabResultFilter {
    pub fn clamped(mut self) -> Self {
        self.limit = self.limit.clamp(1, MAX_LIMIT);
        self.offset = self.offset.max(0);
        self.test_name = self
            .test_name
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
        self
    }

    pub fn matches(&self, r: &LabResult) -> bool {
        self.test_name.as_deref().map_or(true, |t| r.test_name == t)
            && self.from.map_or(true, |d| r.test_date >= d)
            && self.to.map_or(true, |d| r.test_date <= d)
    }
}

/// Whether `value` falls outside the given bounds. Missing bounds are open.
pub fn is_out_of_range(value: f64, low: Option<f64>, high: Option<f64>) -> bool {
    low.is_some_and(|l| value < l) || high.is_some_and(|h| value > h)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_check() {
        assert!(!is_out_of_range(95.0, Some(70.0), Some(99.0)));
        assert!(is_out_of_range(120.0, Some(70.0), Some(99.0)));
        assert!(is_out_of_range(60.0, Some(70.0), None));
        assert!(!is_out_of_range(60.0, None, Some(99.0)));
        assert!(!is_out_of_range(99.0, Some(70.0), Some(99.0)));
        assert!(!is_out_of_range(1.0, None, None));
    }

    #[test]
    fn filter_is_clamped() {
        let f = LabResultFilter {
            test_name: Some("  ".into()),
            limit: 10_000,
            offset: -3,
            ..Default::default()
        }
        .clamped();
        assert_eq!(f.limit, MAX_LIMIT);
        assert_eq!(f.offset, 0);
        assert_eq!(f.test_name, None);
    }

    #[test]
    fn filter_from_query_string() {
        let f: LabResultFilter =
            serde_json::from_str(r#"{"test_name":"Glucose","from":"2025-01-01"}"#).unwrap();
        assert_eq!(f.limit, 50);
        assert_eq!(f.from, Some(time::macros::date!(2025 - 01 - 01)));
    }
}
