use std::collections::HashMap;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::{User, UserProjection, UserRef};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ProductCategory {
    Electronics,
    Books,
    Furniture,
    Clothing,
    Other,
}

impl FromStr for ProductCategory {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Electronics" => Ok(Self::Electronics),
            "Books" => Ok(Self::Books),
            "Furniture" => Ok(Self::Furniture),
            "Clothing" => Ok(Self::Clothing),
            "Other" => Ok(Self::Other),
            other => Err(AppError::validation(format!("Unknown product category: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub image: String,
    /// Age of the item in months.
    pub condition: i32,
    pub category: ProductCategory,
    pub owner: String,
    #[serde(default)]
    pub is_sold: bool,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductView {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub image: String,
    pub condition: i32,
    pub category: ProductCategory,
    pub owner: UserRef,
    pub is_sold: bool,
    pub created_at: DateTime<Utc>,
}

impl ProductView {
    pub fn new(product: Product, projection: UserProjection, users: &HashMap<String, User>) -> Self {
        Self {
            owner: projection.apply(&product.owner, users),
            id: product.id,
            name: product.name,
            description: product.description,
            price: product.price,
            image: product.image,
            condition: product.condition,
            category: product.category,
            is_sold: product.is_sold,
            created_at: product.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_categories_only() {
        assert_eq!("Books".parse::<ProductCategory>().unwrap(), ProductCategory::Books);
        assert_eq!(" Furniture ".parse::<ProductCategory>().unwrap(), ProductCategory::Furniture);
        assert!("Keys".parse::<ProductCategory>().is_err());
        assert!("books".parse::<ProductCategory>().is_err());
    }
}
