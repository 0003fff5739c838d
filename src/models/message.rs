use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{User, UserProjection, UserRef};

/// A directed chat message. Never edited or deleted once stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    #[serde(rename = "_id")]
    pub id: String,
    pub sender: String,
    pub receiver: String,
    pub text: String,
    pub product_id: Option<String>,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn new(sender: &str, receiver: &str, text: String, product_id: Option<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            sender: sender.to_string(),
            receiver: receiver.to_string(),
            text,
            product_id,
            created_at: Utc::now(),
        }
    }

    /// The other party of the message as seen from `user_id`.
    pub fn partner_of(&self, user_id: &str) -> &str {
        if self.sender == user_id {
            &self.receiver
        } else {
            &self.sender
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageView {
    #[serde(rename = "_id")]
    pub id: String,
    pub sender: UserRef,
    pub receiver: UserRef,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl MessageView {
    pub fn new(message: Message, projection: UserProjection, users: &HashMap<String, User>) -> Self {
        Self {
            sender: projection.apply(&message.sender, users),
            receiver: projection.apply(&message.receiver, users),
            id: message.id,
            text: message.text,
            product_id: message.product_id,
            created_at: message.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partner_is_the_other_side() {
        let msg = Message::new("a", "b", "hi".into(), None);
        assert_eq!(msg.partner_of("a"), "b");
        assert_eq!(msg.partner_of("b"), "a");
    }
}
