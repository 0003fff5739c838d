use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::student_info::StudentInfo;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Student,
    Admin,
}

/// A stored account. `password` is a bcrypt hash; accounts created through
/// federated login hold the hash of a random string nobody knows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub profile_photo: String,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

/// The owner's own view of an account.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub profile_photo: String,
    pub created_at: DateTime<Utc>,
    pub student_info: StudentInfo,
}

impl UserView {
    pub fn new(user: &User, domain: &str) -> Self {
        Self {
            id: user.id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
            profile_photo: user.profile_photo.clone(),
            created_at: user.created_at,
            student_info: StudentInfo::from_email(&user.email, domain, Utc::now().date_naive()),
        }
    }
}

/// What anybody may see about a user: name and photo only.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicProfile {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub profile_photo: String,
}

impl PublicProfile {
    pub fn new(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            name: user.name.clone(),
            profile_photo: user.profile_photo.clone(),
        }
    }
}
