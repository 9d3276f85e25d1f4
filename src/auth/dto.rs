use serde::{Deserialize, Serialize};
use time::Date;

use crate::users::model::PublicUser;

/// Request body for user registration.
///
/// Required fields are optional here so a missing one becomes a 400 with our
/// own message instead of a deserialization error.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub date_of_birth: Option<Date>,
    pub gender: Option<String>,
    pub phone: Option<String>,
}

/// Request body for login.
#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Returned after register and login.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthData {
    pub user: PublicUser,
    pub token: String,
    pub onboarding_completed: bool,
}

#[derive(Debug, Serialize)]
pub struct MeData {
    pub user: PublicUser,
}
