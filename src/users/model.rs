use serde::Serialize;
use sqlx::FromRow;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

/// User record in the database.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String, // Argon2 PHC string, never serialized
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: Option<Date>,
    pub gender: Option<String>,
    pub phone: Option<String>,
    pub last_login: Option<OffsetDateTime>,
    pub onboarding_completed: bool,
    pub password_reset_token: Option<String>,
    pub password_reset_expires: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Fields needed to insert a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: Option<Date>,
    pub gender: Option<String>,
    pub phone: Option<String>,
}

/// Public part of the user returned to the client.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: Option<Date>,
    pub gender: Option<String>,
    pub phone: Option<String>,
    pub onboarding_completed: bool,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_login: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<&User> for PublicUser {
    fn from(u: &User) -> Self {
        Self {
            id: u.id,
            email: u.email.clone(),
            first_name: u.first_name.clone(),
            last_name: u.last_name.clone(),
            date_of_birth: u.date_of_birth,
            gender: u.gender.clone(),
            phone: u.phone.clone(),
            onboarding_completed: u.onboarding_completed,
            last_login: u.last_login,
            created_at: u.created_at,
            updated_at: u.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, datetime};

    #[test]
    fn public_user_never_leaks_secrets() {
        let user = User {
            id: Uuid::new_v4(),
            email: "test@example.com".into(),
            password_hash: "$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA".into(),
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            date_of_birth: Some(date!(1815 - 12 - 10)),
            gender: None,
            phone: None,
            last_login: None,
            onboarding_completed: false,
            password_reset_token: Some("deadbeef".into()),
            password_reset_expires: None,
            created_at: datetime!(2025-01-01 0:00 UTC),
            updated_at: datetime!(2025-01-01 0:00 UTC),
        };

        let json = serde_json::to_value(PublicUser::from(&user)).unwrap();
        let text = json.to_string();
        assert!(!text.contains("argon2"));
        assert!(!text.contains("deadbeef"));
        assert!(json.get("passwordHash").is_none());
        assert_eq!(json["firstName"], "Ada");
        assert_eq!(json["dateOfBirth"], "1815-12-10");
        assert_eq!(json["createdAt"], "2025-01-01T00:00:00Z");
        assert!(json["lastLogin"].is_null());
    }
}
