pub mod lost_found;
pub mod message;
pub mod otp;
pub mod product;
pub mod user;

use std::collections::HashMap;

use serde::Serialize;

pub use lost_found::{ItemKind, ItemStatus, LostFoundCategory, LostFoundItem, LostFoundView};
pub use message::{Message, MessageView};
pub use otp::Otp;
pub use product::{Product, ProductCategory, ProductView};
pub use user::{Role, User, UserView};

/// Minimal projection of a user embedded in other documents' views.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_photo: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl UserSummary {
    /// Name and photo, the public face of a user.
    pub fn public(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            name: user.name.clone(),
            profile_photo: Some(user.profile_photo.clone()),
            email: None,
        }
    }

    /// Name and email, used where the reader needs to reach the user.
    pub fn contact(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            name: user.name.clone(),
            profile_photo: None,
            email: Some(user.email.clone()),
        }
    }
}

/// A reference to a user as it appears in a response: either the bare id
/// or a populated summary.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum UserRef {
    Id(String),
    Summary(UserSummary),
}

/// Which fields of a referenced user to join into a read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserProjection {
    /// Leave the reference as an id.
    None,
    /// Name and profile photo.
    Public,
    /// Name and email.
    Contact,
}

impl UserProjection {
    /// Resolves `id` against already loaded users. Ids that no longer resolve
    /// stay bare.
    pub fn apply(self, id: &str, users: &HashMap<String, User>) -> UserRef {
        let user = match (self, users.get(id)) {
            (UserProjection::None, _) | (_, None) => return UserRef::Id(id.to_string()),
            (_, Some(user)) => user,
        };
        match self {
            UserProjection::Contact => UserRef::Summary(UserSummary::contact(user)),
            _ => UserRef::Summary(UserSummary::public(user)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn user() -> User {
        User {
            id: "u1".into(),
            name: "Jane".into(),
            email: "jane@iiit-bh.ac.in".into(),
            password: "hash".into(),
            role: Role::Student,
            profile_photo: "http://img/jane.png".into(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn projection_none_keeps_bare_id() {
        let users = HashMap::from([("u1".to_string(), user())]);
        assert_eq!(UserProjection::None.apply("u1", &users), UserRef::Id("u1".into()));
    }

    #[test]
    fn projection_public_and_contact_pick_fields() {
        let users = HashMap::from([("u1".to_string(), user())]);
        let public = serde_json::to_value(UserProjection::Public.apply("u1", &users)).unwrap();
        assert_eq!(
            public,
            serde_json::json!({ "_id": "u1", "name": "Jane", "profilePhoto": "http://img/jane.png" })
        );
        let contact = serde_json::to_value(UserProjection::Contact.apply("u1", &users)).unwrap();
        assert_eq!(
            contact,
            serde_json::json!({ "_id": "u1", "name": "Jane", "email": "jane@iiit-bh.ac.in" })
        );
    }

    #[test]
    fn unresolved_reference_stays_an_id() {
        let users = HashMap::new();
        assert_eq!(UserProjection::Public.apply("ghost", &users), UserRef::Id("ghost".into()));
    }
}
