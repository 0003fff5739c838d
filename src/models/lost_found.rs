use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::{User, UserProjection, UserRef};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Lost,
    Found,
}

impl FromStr for ItemKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "lost" => Ok(Self::Lost),
            "found" => Ok(Self::Found),
            _ => Err(AppError::validation("Please specify if it is lost or found")),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum LostFoundCategory {
    Electronics,
    Books,
    Identification,
    Keys,
    Clothing,
    Accessories,
    Other,
}

impl FromStr for LostFoundCategory {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Electronics" => Ok(Self::Electronics),
            "Books" => Ok(Self::Books),
            "Identification" => Ok(Self::Identification),
            "Keys" => Ok(Self::Keys),
            "Clothing" => Ok(Self::Clothing),
            "Accessories" => Ok(Self::Accessories),
            "Other" => Ok(Self::Other),
            other => Err(AppError::validation(format!("Unknown category: {}", other))),
        }
    }
}

/// `active -> claimed -> returned`. Claiming is open to any signed-in user,
/// returning is an admin action.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    #[default]
    Active,
    Claimed,
    Returned,
}

impl ItemStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ItemStatus::Active => "active",
            ItemStatus::Claimed => "claimed",
            ItemStatus::Returned => "returned",
        }
    }

    pub fn can_become(self, next: ItemStatus) -> bool {
        matches!(
            (self, next),
            (ItemStatus::Active, ItemStatus::Claimed) | (ItemStatus::Claimed, ItemStatus::Returned)
        )
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LostFoundItem {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub description: String,
    pub kind: ItemKind,
    pub category: LostFoundCategory,
    pub location: String,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub date: DateTime<Utc>,
    pub image: Option<String>,
    pub reporter: String,
    #[serde(default)]
    pub status: ItemStatus,
    pub claimed_by: Option<String>,
    pub claim_note: Option<String>,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LostFoundView {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: ItemKind,
    pub category: LostFoundCategory,
    pub location: String,
    pub date: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub reporter: UserRef,
    pub status: ItemStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claimed_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claim_note: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl LostFoundView {
    pub fn new(item: LostFoundItem, projection: UserProjection, users: &HashMap<String, User>) -> Self {
        Self {
            reporter: projection.apply(&item.reporter, users),
            id: item.id,
            title: item.title,
            description: item.description,
            kind: item.kind,
            category: item.category,
            location: item.location,
            date: item.date,
            image: item.image,
            status: item.status,
            claimed_by: item.claimed_by,
            claim_note: item.claim_note,
            created_at: item.created_at,
        }
    }
}
