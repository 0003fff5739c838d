use async_trait::async_trait;
use log::{debug, warn};
use serde::Deserialize;
use serde_json::Value;

use crate::error::AppError;

const TOKENINFO_URL: &str = "https://oauth2.googleapis.com/tokeninfo";

/// An identity asserted by the provider after server-side verification.
#[derive(Debug, Clone)]
pub struct VerifiedIdentity {
    pub email: String,
    pub name: Option<String>,
    pub picture: Option<String>,
}

#[async_trait]
pub trait IdTokenVerifier: Send + Sync {
    async fn verify(&self, id_token: &str) -> Result<VerifiedIdentity, AppError>;
}

/// Verifies Google ID tokens with the tokeninfo endpoint.
pub struct GoogleVerifier {
    http_client: reqwest::Client,
    client_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenInfo {
    aud: String,
    email: Option<String>,
    email_verified: Option<Value>,
    name: Option<String>,
    picture: Option<String>,
}

impl GoogleVerifier {
    pub fn new(http_client: reqwest::Client, client_id: Option<String>) -> Self {
        Self { http_client, client_id }
    }
}

fn is_true(value: &Option<Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s == "true",
        _ => false,
    }
}

#[async_trait]
impl IdTokenVerifier for GoogleVerifier {
    async fn verify(&self, id_token: &str) -> Result<VerifiedIdentity, AppError> {
        let client_id = self
            .client_id
            .as_deref()
            .ok_or_else(|| AppError::IdentityProvider("GOOGLE_CLIENT_ID is not configured".into()))?;

        let resp = self
            .http_client
            .get(TOKENINFO_URL)
            .query(&[("id_token", id_token)])
            .send()
            .await
            .map_err(|e| AppError::IdentityProvider(format!("tokeninfo unreachable: {}", e)))?;

        if !resp.status().is_success() {
            debug!("tokeninfo rejected token with {}", resp.status());
            return Err(AppError::validation("Invalid Google Token"));
        }
        let info: TokenInfo = resp
            .json()
            .await
            .map_err(|e| AppError::IdentityProvider(format!("tokeninfo parse error: {}", e)))?;

        if info.aud != client_id {
            warn!("Google token issued for another audience: {}", info.aud);
            return Err(AppError::validation("Invalid Google Token"));
        }
        let email = match info.email {
            Some(email) if is_true(&info.email_verified) => email,
            _ => return Err(AppError::validation("Google account email is not verified")),
        };

        Ok(VerifiedIdentity {
            email,
            name: info.name,
            picture: info.picture,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn email_verified_accepts_bool_and_string() {
        assert!(is_true(&Some(json!(true))));
        assert!(is_true(&Some(json!("true"))));
        assert!(!is_true(&Some(json!("false"))));
        assert!(!is_true(&None));
    }

    #[actix_web::test]
    async fn refuses_without_client_id() {
        let verifier = GoogleVerifier::new(reqwest::Client::new(), None);
        let err = verifier.verify("anything").await.unwrap_err();
        assert!(matches!(err, AppError::IdentityProvider(_)));
    }
}
