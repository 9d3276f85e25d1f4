use serde::Deserialize;
use time::Date;
use uuid::Uuid;

use super::model::{is_out_of_range, LabResult, NewLabResult};
use crate::{error::AppError, field::FieldUpdate, users::dto::blank_to_none};

#[derive(Debug, Default, Deserialize)]
pub struct CreateLabResultRequest {
    pub test_name: Option<String>,
    pub test_date: Option<Date>,
    pub result_value: Option<f64>,
    pub unit: Option<String>,
    pub reference_range_low: Option<f64>,
    pub reference_range_high: Option<f64>,
    pub lab_name: Option<String>,
    pub ordering_doctor: Option<String>,
    pub notes: Option<String>,
    pub document_id: Option<Uuid>,
    pub is_abnormal: Option<bool>,
}

impl CreateLabResultRequest {
    pub fn into_new(self, user_id: Uuid) -> Result<NewLabResult, AppError> {
        let (Some(test_name), Some(test_date), Some(result_value), Some(unit)) = (
            blank_to_none(self.test_name),
            self.test_date,
            self.result_value,
            blank_to_none(self.unit),
        ) else {
            return Err(AppError::validation(
                "Test name, test date, result value and unit are required",
            ));
        };

        check_range(self.reference_range_low, self.reference_range_high)?;
        let is_abnormal = self.is_abnormal.unwrap_or_else(|| {
            is_out_of_range(
                result_value,
                self.reference_range_low,
                self.reference_range_high,
            )
        });

        Ok(NewLabResult {
            user_id,
            document_id: self.document_id,
            test_name,
            test_date,
            result_value,
            unit,
            reference_range_low: self.reference_range_low,
            reference_range_high: self.reference_range_high,
            lab_name: blank_to_none(self.lab_name),
            ordering_doctor: blank_to_none(self.ordering_doctor),
            notes: blank_to_none(self.notes),
            is_abnormal,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateLabResultRequest {
    #[serde(default)]
    pub test_name: FieldUpdate<String>,
    #[serde(default)]
    pub test_date: FieldUpdate<Date>,
    #[serde(default)]
    pub result_value: FieldUpdate<f64>,
    #[serde(default)]
    pub unit: FieldUpdate<String>,
    #[serde(default)]
    pub reference_range_low: FieldUpdate<Option<f64>>,
    #[serde(default)]
    pub reference_range_high: FieldUpdate<Option<f64>>,
    #[serde(default)]
    pub lab_name: FieldUpdate<Option<String>>,
    #[serde(default)]
    pub ordering_doctor: FieldUpdate<Option<String>>,
    #[serde(default)]
    pub notes: FieldUpdate<Option<String>>,
    #[serde(default)]
    pub document_id: FieldUpdate<Option<Uuid>>,
    #[serde(default)]
    pub is_abnormal: FieldUpdate<bool>,
}

impl UpdateLabResultRequest {
    /// Merges the set fields into `r`.
    ///
    /// `is_abnormal` is re-derived from the range when the value or range
    /// changes and the caller did not set the flag explicitly.
    pub fn apply_to(self, r: &mut LabResult) -> Result<(), AppError> {
        let measurement_changed = self.result_value.is_set()
            || self.reference_range_low.is_set()
            || self.reference_range_high.is_set();

        if let FieldUpdate::SetTo(name) = self.test_name {
            r.test_name = blank_to_none(Some(name))
                .ok_or_else(|| AppError::validation("Test name cannot be empty"))?;
        }
        if let FieldUpdate::SetTo(unit) = self.unit {
            r.unit = blank_to_none(Some(unit))
                .ok_or_else(|| AppError::validation("Unit cannot be empty"))?;
        }
        self.test_date.apply(&mut r.test_date);
        self.result_value.apply(&mut r.result_value);
        self.reference_range_low.apply(&mut r.reference_range_low);
        self.reference_range_high.apply(&mut r.reference_range_high);
        check_range(r.reference_range_low, r.reference_range_high)?;

        if let FieldUpdate::SetTo(v) = self.lab_name {
            r.lab_name = blank_to_none(v);
        }
        if let FieldUpdate::SetTo(v) = self.ordering_doctor {
            r.ordering_doctor = blank_to_none(v);
        }
        if let FieldUpdate::SetTo(v) = self.notes {
            r.notes = blank_to_none(v);
        }
        self.document_id.apply(&mut r.document_id);

        match self.is_abnormal {
            FieldUpdate::SetTo(flag) => r.is_abnormal = flag,
            FieldUpdate::Unset if measurement_changed => {
                r.is_abnormal = is_out_of_range(
                    r.result_value,
                    r.reference_range_low,
                    r.reference_range_high,
                );
            }
            FieldUpdate::Unset => {}
        }
        Ok(())
    }
}

fn check_range(low: Option<f64>, high: Option<f64>) -> Result<(), AppError> {
    match (low, high) {
        (Some(l), Some(h)) if l > h => Err(AppError::validation(
            "Reference range low cannot exceed reference range high",
        )),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::{macros::date, OffsetDateTime};

    fn stored() -> LabResult {
        let now = OffsetDateTime::now_utc();
        LabResult {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            document_id: None,
            test_name: "Glucose".into(),
            test_date: date!(2025 - 01 - 01),
            result_value: 95.0,
            unit: "mg/dL".into(),
            reference_range_low: Some(70.0),
            reference_range_high: Some(99.0),
            lab_name: Some("Quest".into()),
            ordering_doctor: None,
            notes: Some("fasting".into()),
            is_abnormal: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn create_requires_core_fields() {
        let body = r#"{"test_name":"Glucose","test_date":"2025-01-01","unit":"mg/dL"}"#;
        let req: CreateLabResultRequest = serde_json::from_str(body).unwrap();
        let err = req.into_new(Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn create_derives_abnormal_flag() {
        let req: CreateLabResultRequest = serde_json::from_str(
            r#"{"test_name":"Glucose","test_date":"2025-01-01","result_value":130,
                "unit":"mg/dL","reference_range_low":70,"reference_range_high":99}"#,
        )
        .unwrap();
        let new = req.into_new(Uuid::new_v4()).unwrap();
        assert!(new.is_abnormal);
        assert_eq!(new.result_value, 130.0);
    }

    #[test]
    fn create_respects_explicit_flag() {
        let req: CreateLabResultRequest = serde_json::from_str(
            r#"{"test_name":"Glucose","test_date":"2025-01-01","result_value":130,
                "unit":"mg/dL","reference_range_high":99,"is_abnormal":false}"#,
        )
        .unwrap();
        assert!(!req.into_new(Uuid::new_v4()).unwrap().is_abnormal);
    }

    #[test]
    fn create_rejects_inverted_range() {
        let req: CreateLabResultRequest = serde_json::from_str(
            r#"{"test_name":"Glucose","test_date":"2025-01-01","result_value":95,
                "unit":"mg/dL","reference_range_low":100,"reference_range_high":70}"#,
        )
        .unwrap();
        assert!(req.into_new(Uuid::new_v4()).is_err());
    }

    #[test]
    fn update_touches_only_given_fields() {
        let req: UpdateLabResultRequest = serde_json::from_str(r#"{"notes":null}"#).unwrap();
        let mut r = stored();
        req.apply_to(&mut r).unwrap();
        assert_eq!(r.notes, None);
        assert_eq!(r.lab_name.as_deref(), Some("Quest"));
        assert_eq!(r.result_value, 95.0);
        assert!(!r.is_abnormal);
    }

    #[test]
    fn update_rederives_flag_when_value_changes() {
        let req: UpdateLabResultRequest =
            serde_json::from_str(r#"{"result_value":150}"#).unwrap();
        let mut r = stored();
        req.apply_to(&mut r).unwrap();
        assert!(r.is_abnormal);
    }

    #[test]
    fn update_rejects_null_on_required_field() {
        assert!(serde_json::from_str::<UpdateLabResultRequest>(r#"{"unit":null}"#).is_err());
    }
}
