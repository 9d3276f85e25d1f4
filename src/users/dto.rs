use serde::Deserialize;
use time::Date;

use super::model::User;
use crate::{error::AppError, field::FieldUpdate};

/// Request body for `PUT /profile` and `PUT /profile/onboarding`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    #[serde(default)]
    pub first_name: FieldUpdate<String>,
    #[serde(default)]
    pub last_name: FieldUpdate<String>,
    #[serde(default)]
    pub date_of_birth: FieldUpdate<Option<Date>>,
    #[serde(default)]
    pub gender: FieldUpdate<Option<String>>,
    #[serde(default)]
    pub phone: FieldUpdate<Option<String>>,
}

impl UpdateProfileRequest {
    /// Merges the set fields into `user`, leaving everything else as stored.
    pub fn apply_to(self, user: &mut User) -> Result<(), AppError> {
        if let FieldUpdate::SetTo(name) = self.first_name {
            user.first_name = non_blank(name, "First name")?;
        }
        if let FieldUpdate::SetTo(name) = self.last_name {
            user.last_name = non_blank(name, "Last name")?;
        }
        self.date_of_birth.apply(&mut user.date_of_birth);
        if let FieldUpdate::SetTo(gender) = self.gender {
            user.gender = blank_to_none(gender);
        }
        if let FieldUpdate::SetTo(phone) = self.phone {
            user.phone = blank_to_none(phone);
        }
        Ok(())
    }
}

fn non_blank(value: String, label: &str) -> Result<String, AppError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::validation(format!("{label} cannot be empty")));
    }
    Ok(trimmed.to_string())
}

pub(crate) fn blank_to_none(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::{macros::date, OffsetDateTime};
    use uuid::Uuid;

    fn user() -> User {
        let now = OffsetDateTime::now_utc();
        User {
            id: Uuid::new_v4(),
            email: "jane@example.com".into(),
            password_hash: "hash".into(),
            first_name: "Janet".into(),
            last_name: "Doe".into(),
            date_of_birth: Some(date!(1990 - 05 - 01)),
            gender: Some("female".into()),
            phone: Some("555-0100".into()),
            last_login: None,
            onboarding_completed: false,
            password_reset_token: None,
            password_reset_expires: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn only_first_name_changes() {
        let req: UpdateProfileRequest = serde_json::from_str(r#"{"firstName":"Jane"}"#).unwrap();
        let mut u = user();
        req.apply_to(&mut u).unwrap();
        assert_eq!(u.first_name, "Jane");
        assert_eq!(u.last_name, "Doe");
        assert_eq!(u.date_of_birth, Some(date!(1990 - 05 - 01)));
        assert_eq!(u.phone.as_deref(), Some("555-0100"));
    }

    #[test]
    fn explicit_null_clears_optional_fields() {
        let req: UpdateProfileRequest =
            serde_json::from_str(r#"{"phone":null,"dateOfBirth":null}"#).unwrap();
        let mut u = user();
        req.apply_to(&mut u).unwrap();
        assert_eq!(u.phone, None);
        assert_eq!(u.date_of_birth, None);
        assert_eq!(u.gender.as_deref(), Some("female"));
    }

    #[test]
    fn blank_first_name_is_rejected() {
        let req: UpdateProfileRequest = serde_json::from_str(r#"{"firstName":"   "}"#).unwrap();
        let err = req.apply_to(&mut user()).unwrap_err();
        assert_eq!(err.to_string(), "First name cannot be empty");
    }
}
