//! Persistence for every collection. Each method is a single-document
//! operation or a single query; nothing spans documents atomically.

#[cfg(test)]
pub mod memory;
pub mod mongo;

use async_trait::async_trait;

use crate::error::AppError;
use crate::models::{ItemStatus, LostFoundItem, Message, Otp, Product, User};

pub use mongo::MongoStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProductFilter {
    Unsold,
    OwnedBy(String),
}

/// Fields written by a lost-and-found status change.
#[derive(Debug, Clone)]
pub struct StatusChange {
    pub from: ItemStatus,
    pub to: ItemStatus,
    pub claimed_by: Option<String>,
    pub claim_note: Option<String>,
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn find_user_by_id(&self, id: &str) -> Result<Option<User>, AppError>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError>;
    async fn find_users_by_ids(&self, ids: &[String]) -> Result<Vec<User>, AppError>;
    /// Fails with `AlreadyRegistered` when the email is taken.
    async fn insert_user(&self, user: &User) -> Result<(), AppError>;
    async fn set_profile_photo(&self, id: &str, url: &str) -> Result<Option<User>, AppError>;

    async fn delete_otps(&self, email: &str) -> Result<u64, AppError>;
    async fn insert_otp(&self, otp: &Otp) -> Result<(), AppError>;
    /// Only codes still inside their live window are returned.
    async fn find_otp(&self, email: &str, code: &str) -> Result<Option<Otp>, AppError>;

    async fn insert_product(&self, product: &Product) -> Result<(), AppError>;
    async fn find_product(&self, id: &str) -> Result<Option<Product>, AppError>;
    /// Newest first.
    async fn list_products(&self, filter: ProductFilter) -> Result<Vec<Product>, AppError>;
    async fn mark_product_sold(&self, id: &str) -> Result<Option<Product>, AppError>;

    async fn insert_lost_found(&self, item: &LostFoundItem) -> Result<(), AppError>;
    async fn find_lost_found(&self, id: &str) -> Result<Option<LostFoundItem>, AppError>;
    /// Newest first.
    async fn list_lost_found(&self) -> Result<Vec<LostFoundItem>, AppError>;
    /// Applies `change` only while the item is still in `change.from`.
    /// Returns the updated item, or `None` when no item matched.
    async fn change_lost_found_status(
        &self,
        id: &str,
        change: StatusChange,
    ) -> Result<Option<LostFoundItem>, AppError>;

    async fn insert_message(&self, message: &Message) -> Result<(), AppError>;
    /// Messages between `a` and `b` in either direction, oldest first.
    async fn conversation(&self, a: &str, b: &str) -> Result<Vec<Message>, AppError>;
    /// Every message sent or received by `user_id`, newest first.
    async fn messages_involving(&self, user_id: &str) -> Result<Vec<Message>, AppError>;
}
