use serde::Deserialize;
use time::Date;
use uuid::Uuid;

use super::model::NewTrendData;
use crate::{error::AppError, users::dto::blank_to_none};

#[derive(Debug, Default, Deserialize)]
pub struct CreateTrendRequest {
    pub test_name: Option<String>,
    pub start_date: Option<Date>,
    pub end_date: Option<Date>,
    pub count: Option<i32>,
    pub min_value: Option<f64>,
    pub max_value: Option<f64>,
    pub average: Option<f64>,
    pub median: Option<f64>,
    pub standard_deviation: Option<f64>,
}

impl CreateTrendRequest {
    pub fn into_new(self, user_id: Uuid) -> Result<NewTrendData, AppError> {
        let (Some(test_name), Some(start_date), Some(end_date), Some(count)) = (
            blank_to_none(self.test_name),
            self.start_date,
            self.end_date,
            self.count,
        ) else {
            return Err(AppError::validation(
                "Test name, start date, end date and count are required",
            ));
        };

        if start_date > end_date {
            return Err(AppError::validation("Start date cannot be after end date"));
        }
        if count < 0 {
            return Err(AppError::validation("Count cannot be negative"));
        }
        if let (Some(min), Some(max)) = (self.min_value, self.max_value) {
            if min > max {
                return Err(AppError::validation("Minimum cannot exceed maximum"));
            }
        }
        if self.standard_deviation.is_some_and(|sd| sd < 0.0) {
            return Err(AppError::validation("Standard deviation cannot be negative"));
        }

        Ok(NewTrendData {
            user_id,
            test_name,
            start_date,
            end_date,
            count,
            min_value: self.min_value,
            max_value: self.max_value,
            average: self.average,
            median: self.median,
            standard_deviation: self.standard_deviation,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> CreateTrendRequest {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn accepts_complete_summary() {
        let new = parse(
            r#"{"test_name":"Glucose","start_date":"2025-01-01","end_date":"2025-03-31",
                "count":3,"min_value":88,"max_value":101,"average":94.3}"#,
        )
        .into_new(Uuid::new_v4())
        .unwrap();
        assert_eq!(new.count, 3);
        assert_eq!(new.median, None);
    }

    #[test]
    fn rejects_inverted_window() {
        let err = parse(
            r#"{"test_name":"Glucose","start_date":"2025-04-01","end_date":"2025-03-31","count":0}"#,
        )
        .into_new(Uuid::new_v4())
        .unwrap_err();
        assert_eq!(err.to_string(), "Start date cannot be after end date");
    }

    #[test]
    fn rejects_missing_count() {
        let body = r#"{"test_name":"Glucose","start_date":"2025-01-01","end_date":"2025-03-31"}"#;
        let err = parse(body).into_new(Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
