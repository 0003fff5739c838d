use std::time::Duration;

use async_trait::async_trait;
use futures_util::TryStreamExt;
use log::info;
use mongodb::bson::{doc, Document};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::{ClientOptions, IndexOptions, ReturnDocument};
use mongodb::{Client, Collection, Database, IndexModel};

use crate::error::AppError;
use crate::models::otp::OTP_TTL_SECS;
use crate::models::{LostFoundItem, Message, Otp, Product, User};
use crate::store::{ProductFilter, StatusChange, Store};

const DUPLICATE_KEY: i32 = 11000;

pub struct MongoStore {
    db: Database,
}

impl MongoStore {
    pub async fn init(uri: &str, db_name: &str) -> Result<Self, AppError> {
        let client_options = ClientOptions::parse(uri).await?;
        let client = Client::with_options(client_options)?;
        let store = MongoStore {
            db: client.database(db_name),
        };
        store.ensure_indexes().await?;
        info!("Connected to MongoDB database {}", db_name);
        Ok(store)
    }

    /// Unique emails and the store-side expiry of verification codes.
    async fn ensure_indexes(&self) -> Result<(), AppError> {
        let unique_email = IndexModel::builder()
            .keys(doc! { "email": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        self.users().create_index(unique_email).await?;

        let otp_expiry = IndexModel::builder()
            .keys(doc! { "created_at": 1 })
            .options(
                IndexOptions::builder()
                    .expire_after(Duration::from_secs(OTP_TTL_SECS as u64))
                    .build(),
            )
            .build();
        self.otps().create_index(otp_expiry).await?;
        self.otps().create_index(IndexModel::builder().keys(doc! { "email": 1 }).build()).await?;
        self.messages()
            .create_index(IndexModel::builder().keys(doc! { "sender": 1, "receiver": 1 }).build())
            .await?;
        Ok(())
    }

    fn users(&self) -> Collection<User> {
        self.db.collection("users")
    }

    fn otps(&self) -> Collection<Otp> {
        self.db.collection("otps")
    }

    fn products(&self) -> Collection<Product> {
        self.db.collection("products")
    }

    fn lost_found(&self) -> Collection<LostFoundItem> {
        self.db.collection("lostfounds")
    }

    fn messages(&self) -> Collection<Message> {
        self.db.collection("messages")
    }
}

fn newest_first() -> Document {
    doc! { "created_at": -1 }
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(write)) if write.code == DUPLICATE_KEY
    )
}

#[async_trait]
impl Store for MongoStore {
    async fn find_user_by_id(&self, id: &str) -> Result<Option<User>, AppError> {
        Ok(self.users().find_one(doc! { "_id": id }).await?)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        Ok(self.users().find_one(doc! { "email": email }).await?)
    }

    async fn find_users_by_ids(&self, ids: &[String]) -> Result<Vec<User>, AppError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let cursor = self.users().find(doc! { "_id": { "$in": ids.to_vec() } }).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn insert_user(&self, user: &User) -> Result<(), AppError> {
        match self.users().insert_one(user).await {
            Ok(_) => Ok(()),
            Err(e) if is_duplicate_key(&e) => Err(AppError::AlreadyRegistered),
            Err(e) => Err(e.into()),
        }
    }

    async fn set_profile_photo(&self, id: &str, url: &str) -> Result<Option<User>, AppError> {
        Ok(self
            .users()
            .find_one_and_update(doc! { "_id": id }, doc! { "$set": { "profile_photo": url } })
            .return_document(ReturnDocument::After)
            .await?)
    }

    async fn delete_otps(&self, email: &str) -> Result<u64, AppError> {
        Ok(self.otps().delete_many(doc! { "email": email }).await?.deleted_count)
    }

    async fn insert_otp(&self, otp: &Otp) -> Result<(), AppError> {
        self.otps().insert_one(otp).await?;
        Ok(())
    }

    async fn find_otp(&self, email: &str, code: &str) -> Result<Option<Otp>, AppError> {
        // The TTL monitor runs about once a minute, so filter on age as well.
        let otp = self.otps().find_one(doc! { "email": email, "code": code }).await?;
        Ok(otp.filter(|otp| !otp.is_expired(chrono::Utc::now())))
    }

    async fn insert_product(&self, product: &Product) -> Result<(), AppError> {
        self.products().insert_one(product).await?;
        Ok(())
    }

    async fn find_product(&self, id: &str) -> Result<Option<Product>, AppError> {
        Ok(self.products().find_one(doc! { "_id": id }).await?)
    }

    async fn list_products(&self, filter: ProductFilter) -> Result<Vec<Product>, AppError> {
        let filter = match filter {
            ProductFilter::Unsold => doc! { "is_sold": false },
            ProductFilter::OwnedBy(owner) => doc! { "owner": owner },
        };
        let cursor = self.products().find(filter).sort(newest_first()).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn mark_product_sold(&self, id: &str) -> Result<Option<Product>, AppError> {
        Ok(self
            .products()
            .find_one_and_update(doc! { "_id": id }, doc! { "$set": { "is_sold": true } })
            .return_document(ReturnDocument::After)
            .await?)
    }

    async fn insert_lost_found(&self, item: &LostFoundItem) -> Result<(), AppError> {
        self.lost_found().insert_one(item).await?;
        Ok(())
    }

    async fn find_lost_found(&self, id: &str) -> Result<Option<LostFoundItem>, AppError> {
        Ok(self.lost_found().find_one(doc! { "_id": id }).await?)
    }

    async fn list_lost_found(&self) -> Result<Vec<LostFoundItem>, AppError> {
        let cursor = self.lost_found().find(doc! {}).sort(newest_first()).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn change_lost_found_status(
        &self,
        id: &str,
        change: StatusChange,
    ) -> Result<Option<LostFoundItem>, AppError> {
        let mut set = doc! { "status": change.to.as_str() };
        if let Some(claimant) = change.claimed_by {
            set.insert("claimed_by", claimant);
            set.insert("claim_note", change.claim_note);
        }
        Ok(self
            .lost_found()
            .find_one_and_update(
                doc! { "_id": id, "status": change.from.as_str() },
                doc! { "$set": set },
            )
            .return_document(ReturnDocument::After)
            .await?)
    }

    async fn insert_message(&self, message: &Message) -> Result<(), AppError> {
        self.messages().insert_one(message).await?;
        Ok(())
    }

    async fn conversation(&self, a: &str, b: &str) -> Result<Vec<Message>, AppError> {
        let filter = doc! {
            "$or": [
                { "sender": a, "receiver": b },
                { "sender": b, "receiver": a },
            ]
        };
        let cursor = self.messages().find(filter).sort(doc! { "created_at": 1 }).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn messages_involving(&self, user_id: &str) -> Result<Vec<Message>, AppError> {
        let filter = doc! { "$or": [ { "sender": user_id }, { "receiver": user_id } ] };
        let cursor = self.messages().find(filter).sort(newest_first()).await?;
        Ok(cursor.try_collect().await?)
    }
}
