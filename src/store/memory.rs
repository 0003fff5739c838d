//! In-process `Store` used by the test suite. Mirrors the document store's
//! behaviour where it matters: unique emails, code expiry, newest-first sorts
//! and conditional status updates.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::AppError;
use crate::models::{LostFoundItem, Message, Otp, Product, User};
use crate::store::{ProductFilter, StatusChange, Store};

#[derive(Default)]
struct Collections {
    users: Vec<User>,
    otps: Vec<Otp>,
    products: Vec<Product>,
    lost_found: Vec<LostFoundItem>,
    messages: Vec<Message>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Collections>,
    refuse_listings: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn otps_for(&self, email: &str) -> Vec<Otp> {
        let inner = self.inner.lock().unwrap();
        inner.otps.iter().filter(|o| o.email == email).cloned().collect()
    }

    pub fn user_count(&self) -> usize {
        self.inner.lock().unwrap().users.len()
    }

    /// Makes product and lost-found inserts fail like an unreachable database.
    pub fn refuse_listings(&self) {
        self.refuse_listings.store(true, Ordering::SeqCst);
    }

    fn check_listing_write(&self) -> Result<(), AppError> {
        if self.refuse_listings.load(Ordering::SeqCst) {
            return Err(AppError::Internal("store unavailable".into()));
        }
        Ok(())
    }
}

/// Newest first; among equal timestamps the later insert wins.
fn newest_first<T: Clone>(items: impl DoubleEndedIterator<Item = T>, at: impl Fn(&T) -> DateTime<Utc>) -> Vec<T> {
    let mut out: Vec<T> = items.rev().collect();
    out.sort_by_key(|item| std::cmp::Reverse(at(item)));
    out
}

#[async_trait]
impl Store for MemoryStore {
    async fn find_user_by_id(&self, id: &str) -> Result<Option<User>, AppError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_users_by_ids(&self, ids: &[String]) -> Result<Vec<User>, AppError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.users.iter().filter(|u| ids.contains(&u.id)).cloned().collect())
    }

    async fn insert_user(&self, user: &User) -> Result<(), AppError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.users.iter().any(|u| u.email == user.email) {
            return Err(AppError::AlreadyRegistered);
        }
        inner.users.push(user.clone());
        Ok(())
    }

    async fn set_profile_photo(&self, id: &str, url: &str) -> Result<Option<User>, AppError> {
        let mut inner = self.inner.lock().unwrap();
        Ok(inner.users.iter_mut().find(|u| u.id == id).map(|u| {
            u.profile_photo = url.to_string();
            u.clone()
        }))
    }

    async fn delete_otps(&self, email: &str) -> Result<u64, AppError> {
        let mut inner = self.inner.lock().unwrap();
        let before = inner.otps.len();
        inner.otps.retain(|o| o.email != email);
        Ok((before - inner.otps.len()) as u64)
    }

    async fn insert_otp(&self, otp: &Otp) -> Result<(), AppError> {
        self.inner.lock().unwrap().otps.push(otp.clone());
        Ok(())
    }

    async fn find_otp(&self, email: &str, code: &str) -> Result<Option<Otp>, AppError> {
        let mut inner = self.inner.lock().unwrap();
        let now = Utc::now();
        inner.otps.retain(|o| !o.is_expired(now));
        Ok(inner.otps.iter().find(|o| o.email == email && o.code == code).cloned())
    }

    async fn insert_product(&self, product: &Product) -> Result<(), AppError> {
        self.check_listing_write()?;
        self.inner.lock().unwrap().products.push(product.clone());
        Ok(())
    }

    async fn find_product(&self, id: &str) -> Result<Option<Product>, AppError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.products.iter().find(|p| p.id == id).cloned())
    }

    async fn list_products(&self, filter: ProductFilter) -> Result<Vec<Product>, AppError> {
        let inner = self.inner.lock().unwrap();
        let matching = inner.products.iter().filter(|p| match &filter {
            ProductFilter::Unsold => !p.is_sold,
            ProductFilter::OwnedBy(owner) => &p.owner == owner,
        });
        Ok(newest_first(matching.cloned().collect::<Vec<_>>().into_iter(), |p| p.created_at))
    }

    async fn mark_product_sold(&self, id: &str) -> Result<Option<Product>, AppError> {
        let mut inner = self.inner.lock().unwrap();
        Ok(inner.products.iter_mut().find(|p| p.id == id).map(|p| {
            p.is_sold = true;
            p.clone()
        }))
    }

    async fn insert_lost_found(&self, item: &LostFoundItem) -> Result<(), AppError> {
        self.check_listing_write()?;
        self.inner.lock().unwrap().lost_found.push(item.clone());
        Ok(())
    }

    async fn find_lost_found(&self, id: &str) -> Result<Option<LostFoundItem>, AppError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.lost_found.iter().find(|i| i.id == id).cloned())
    }

    async fn list_lost_found(&self) -> Result<Vec<LostFoundItem>, AppError> {
        let inner = self.inner.lock().unwrap();
        Ok(newest_first(inner.lost_found.iter().cloned(), |i| i.created_at))
    }

    async fn change_lost_found_status(
        &self,
        id: &str,
        change: StatusChange,
    ) -> Result<Option<LostFoundItem>, AppError> {
        let mut inner = self.inner.lock().unwrap();
        let item = match inner.lost_found.iter_mut().find(|i| i.id == id && i.status == change.from) {
            Some(item) => item,
            None => return Ok(None),
        };
        item.status = change.to;
        if change.claimed_by.is_some() {
            item.claimed_by = change.claimed_by;
            item.claim_note = change.claim_note;
        }
        Ok(Some(item.clone()))
    }

    async fn insert_message(&self, message: &Message) -> Result<(), AppError> {
        self.inner.lock().unwrap().messages.push(message.clone());
        Ok(())
    }

    async fn conversation(&self, a: &str, b: &str) -> Result<Vec<Message>, AppError> {
        let inner = self.inner.lock().unwrap();
        let mut thread: Vec<Message> = inner
            .messages
            .iter()
            .filter(|m| (m.sender == a && m.receiver == b) || (m.sender == b && m.receiver == a))
            .cloned()
            .collect();
        thread.sort_by_key(|m| m.created_at);
        Ok(thread)
    }

    async fn messages_involving(&self, user_id: &str) -> Result<Vec<Message>, AppError> {
        let inner = self.inner.lock().unwrap();
        let touching = inner
            .messages
            .iter()
            .filter(|m| m.sender == user_id || m.receiver == user_id)
            .cloned()
            .collect::<Vec<_>>();
        Ok(newest_first(touching.into_iter(), |m| m.created_at))
    }
}
