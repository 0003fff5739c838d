use std::env;
use std::path::PathBuf;

use log::info;
use regex::Regex;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Decides which email addresses may hold an account.
#[derive(Clone, Debug)]
pub struct EmailPolicy {
    domain: String,
    pattern: Regex,
}

impl EmailPolicy {
    pub fn new(domain: &str) -> Result<Self, ConfigError> {
        let domain = domain.trim().trim_start_matches('@').to_lowercase();
        let pattern = Regex::new(&format!(r"^\w+([.-]?\w+)*@{}$", regex::escape(&domain)))
            .map_err(|e| ConfigError::Invalid {
                key: "ALLOWED_EMAIL_DOMAIN",
                reason: e.to_string(),
            })?;
        Ok(Self { domain, pattern })
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn normalize(email: &str) -> String {
        email.trim().to_lowercase()
    }

    pub fn allows(&self, email: &str) -> bool {
        self.pattern.is_match(email)
    }
}

#[derive(Clone)]
pub struct Config {
    pub mongo_uri: String,
    pub database_name: String,
    pub port: u16,
    pub jwt_secret: String,
    pub google_client_id: Option<String>,
    pub resend_api_key: Option<String>,
    pub mail_from: String,
    pub contact_recipient: String,
    pub public_base_url: String,
    pub upload_dir: PathBuf,
    pub frontend_origin: String,
    pub email_policy: EmailPolicy,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        let port = match env::var("PORT") {
            Ok(raw) => raw.parse().map_err(|e: std::num::ParseIntError| ConfigError::Invalid {
                key: "PORT",
                reason: e.to_string(),
            })?,
            Err(_) => 5000,
        };
        let jwt_secret = env::var("JWT_SECRET")
            .ok()
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::Missing("JWT_SECRET"))?;
        let domain = env::var("ALLOWED_EMAIL_DOMAIN").unwrap_or_else(|_| "iiit-bh.ac.in".to_string());
        let resend_api_key = optional("RESEND_API_KEY");
        if resend_api_key.is_none() {
            info!("RESEND_API_KEY not set, outgoing email will be logged only");
        }

        Ok(Self {
            mongo_uri: env::var("MONGODB_URI").unwrap_or_else(|_| "mongodb://localhost:27017".to_string()),
            database_name: env::var("DATABASE_NAME").unwrap_or_else(|_| "unitrade".to_string()),
            port,
            jwt_secret,
            google_client_id: optional("GOOGLE_CLIENT_ID"),
            resend_api_key,
            mail_from: env::var("MAIL_FROM")
                .unwrap_or_else(|_| "UniTrade <onboarding@resend.dev>".to_string()),
            contact_recipient: env::var("CONTACT_RECIPIENT")
                .unwrap_or_else(|_| format!("admin@{}", domain.trim_start_matches('@'))),
            public_base_url: env::var("PUBLIC_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| format!("http://localhost:{}", port)),
            upload_dir: PathBuf::from(env::var("UPLOAD_DIR").unwrap_or_else(|_| "uploads".to_string())),
            frontend_origin: env::var("FRONTEND_ORIGIN")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            email_policy: EmailPolicy::new(&domain)?,
        })
    }

    /// Absolute URL under which a stored upload is served.
    pub fn upload_url(&self, file_name: &str) -> String {
        format!("{}/uploads/{}", self.public_base_url, file_name)
    }
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}
