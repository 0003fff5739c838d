//! Fixtures shared by the HTTP-level tests.

use std::path::PathBuf;
use std::sync::Arc;

use actix::Actor;
use actix_web::dev::ServiceResponse;
use actix_web::test;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use tempfile::TempDir;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::auth::create_jwt;
use crate::chat_server::ChatServer;
use crate::config::{Config, EmailPolicy};
use crate::email::Mailer;
use crate::error::AppError;
use crate::identity_provider::{IdTokenVerifier, VerifiedIdentity};
use crate::models::{
    ItemKind, ItemStatus, LostFoundCategory, LostFoundItem, Product, ProductCategory, Role, User,
};
use crate::store::memory::MemoryStore;
use crate::store::Store;

pub const DOMAIN: &str = "iiit-bh.ac.in";

/// `token-outsider` resolves to a gmail address, `token-<local>` to
/// `<local>@iiit-bh.ac.in`; anything else is rejected.
pub struct FakeVerifier;

#[async_trait]
impl IdTokenVerifier for FakeVerifier {
    async fn verify(&self, id_token: &str) -> Result<VerifiedIdentity, AppError> {
        match id_token.strip_prefix("token-") {
            Some("outsider") => Ok(VerifiedIdentity {
                email: "outsider@gmail.com".into(),
                name: Some("Outsider".into()),
                picture: None,
            }),
            Some(local) if !local.is_empty() => Ok(VerifiedIdentity {
                email: format!("{}@{}", local, DOMAIN),
                name: Some(format!("Student {}", local)),
                picture: Some("https://example.com/avatar.png".into()),
            }),
            _ => Err(AppError::validation("Invalid Google Token")),
        }
    }
}

pub struct TestContext {
    pub store: Arc<MemoryStore>,
    pub config: Config,
    uploads: TempDir,
}

impl TestContext {
    pub fn new() -> Self {
        let uploads = tempfile::tempdir().expect("temp upload dir");
        let config = Config {
            mongo_uri: "mongodb://unused".into(),
            database_name: "unitrade-test".into(),
            port: 5000,
            jwt_secret: "test-secret".into(),
            google_client_id: Some("test-client".into()),
            resend_api_key: None,
            mail_from: "UniTrade <test@example.com>".into(),
            contact_recipient: format!("admin@{}", DOMAIN),
            public_base_url: "http://localhost:5000".into(),
            upload_dir: uploads.path().to_path_buf(),
            frontend_origin: "http://localhost:5173".into(),
            email_policy: EmailPolicy::new(DOMAIN).expect("valid domain"),
        };
        Self {
            store: Arc::new(MemoryStore::new()),
            config,
            uploads,
        }
    }

    pub fn upload_dir(&self) -> PathBuf {
        self.uploads.path().to_path_buf()
    }

    /// Needs a running actix system for the chat hub.
    pub fn state(&self) -> AppState {
        AppState {
            store: self.store.clone(),
            chat_server: ChatServer::new().start(),
            config: self.config.clone(),
            mailer: Mailer::new(reqwest::Client::new(), None, self.config.mail_from.clone()),
            verifier: Arc::new(FakeVerifier),
        }
    }
}

macro_rules! test_app {
    ($ctx:expr) => {
        actix_web::test::init_service(
            actix_web::App::new()
                .wrap(crate::Authentication::new(&$ctx.config.jwt_secret))
                .app_data(actix_web::web::Data::new($ctx.state()))
                .configure(crate::routes::configure),
        )
        .await
    };
}
pub(crate) use test_app;

pub fn bearer(ctx: &TestContext, user: &User) -> (&'static str, String) {
    let token = create_jwt(&user.id, &ctx.config.jwt_secret).expect("token");
    ("Authorization", format!("Bearer {}", token))
}

pub async fn json_body(resp: ServiceResponse) -> serde_json::Value {
    test::read_body_json(resp).await
}

/// Builds a `multipart/form-data` body from text fields and an optional
/// `(field, filename, bytes)` file part.
pub fn multipart_body(fields: &[(&str, &str)], file: Option<(&str, &str, &[u8])>) -> (String, Vec<u8>) {
    let mut parts: Vec<(&str, Option<&str>, &[u8])> =
        fields.iter().map(|(name, value)| (*name, None, value.as_bytes())).collect();
    if let Some((name, filename, bytes)) = file {
        parts.push((name, Some(filename), bytes));
    }
    multipart_parts(&parts)
}

/// Builds a `multipart/form-data` body from `(field, filename, bytes)` parts
/// in the given order; parts without a filename are text fields.
pub fn multipart_parts(parts: &[(&str, Option<&str>, &[u8])]) -> (String, Vec<u8>) {
    let boundary = "----unitrade-test-boundary";
    let mut body = Vec::new();
    for (name, filename, bytes) in parts {
        let header = match filename {
            Some(filename) => format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\
                 Content-Type: application/octet-stream\r\n\r\n",
                boundary, name, filename
            ),
            None => format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n",
                boundary, name
            ),
        };
        body.extend_from_slice(header.as_bytes());
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", boundary).as_bytes());
    (format!("multipart/form-data; boundary={}", boundary), body)
}

pub async fn seed_user(ctx: &TestContext, name: &str, email: &str, password: &str) -> User {
    let user = User {
        id: Uuid::new_v4().to_string(),
        name: name.into(),
        email: email.into(),
        password: bcrypt::hash(password, 4).expect("hash"),
        role: Role::Student,
        profile_photo: String::new(),
        created_at: Utc::now(),
    };
    ctx.store.insert_user(&user).await.expect("insert user");
    user
}

pub async fn seed_user_as(ctx: &TestContext, name: &str, email: &str, role: Role) -> User {
    let user = User {
        id: Uuid::new_v4().to_string(),
        name: name.into(),
        email: email.into(),
        password: bcrypt::hash("password123", 4).expect("hash"),
        role,
        profile_photo: String::new(),
        created_at: Utc::now(),
    };
    ctx.store.insert_user(&user).await.expect("insert user");
    user
}

pub async fn seed_product(ctx: &TestContext, owner: &User, name: &str, minutes_ago: i64) -> Product {
    let product = Product {
        id: Uuid::new_v4().to_string(),
        name: name.into(),
        description: format!("{} in good shape", name),
        price: 500.0,
        image: "http://localhost:5000/uploads/product-test.jpg".into(),
        condition: 3,
        category: ProductCategory::Furniture,
        owner: owner.id.clone(),
        is_sold: false,
        created_at: Utc::now() - Duration::minutes(minutes_ago),
    };
    ctx.store.insert_product(&product).await.expect("insert product");
    product
}

pub async fn seed_item(ctx: &TestContext, reporter: &User, kind: ItemKind) -> LostFoundItem {
    let now = Utc::now();
    let item = LostFoundItem {
        id: Uuid::new_v4().to_string(),
        title: "Black wallet".into(),
        description: "Leather wallet with a college ID".into(),
        kind,
        category: LostFoundCategory::Accessories,
        location: "Canteen".into(),
        date: now,
        image: None,
        reporter: reporter.id.clone(),
        status: ItemStatus::Active,
        claimed_by: None,
        claim_note: None,
        created_at: now,
    };
    ctx.store.insert_lost_found(&item).await.expect("insert item");
    item
}
