use log::{error, info};
use serde::Serialize;

use crate::error::AppError;

const RESEND_URL: &str = "https://api.resend.com/emails";

#[derive(Debug, Clone, Serialize)]
pub struct Email {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub html: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<String>,
}

/// Outbound mail through the Resend HTTP API. Without an API key every
/// message is written to the log instead.
#[derive(Clone)]
pub struct Mailer {
    http_client: reqwest::Client,
    api_key: Option<String>,
    from: String,
}

pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

impl Mailer {
    pub fn new(http_client: reqwest::Client, api_key: Option<String>, from: String) -> Self {
        Self {
            http_client,
            api_key,
            from,
        }
    }

    pub async fn send(&self, email: Email) -> Result<(), AppError> {
        let api_key = match &self.api_key {
            Some(key) => key,
            None => {
                info!(
                    "--- MOCK EMAIL --- to: {:?}, subject: {}\n{}",
                    email.to, email.subject, email.html
                );
                return Ok(());
            }
        };

        let resp = self
            .http_client
            .post(RESEND_URL)
            .bearer_auth(api_key)
            .json(&email)
            .send()
            .await
            .map_err(|e| AppError::Email(e.to_string()))?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(AppError::Email(format!("provider answered {}: {}", status, body)));
        }
        info!("Email '{}' sent to {:?}", email.subject, email.to);
        Ok(())
    }

    /// Sends in the background; failures are logged and never reach the caller.
    fn dispatch(&self, email: Email) {
        let mailer = self.clone();
        actix_web::rt::spawn(async move {
            let to = email.to.clone();
            if let Err(e) = mailer.send(email).await {
                error!("Email to {:?} failed: {}", to, e);
            }
        });
    }

    fn message(&self, to: &str, subject: &str, html: String) -> Email {
        Email {
            from: self.from.clone(),
            to: vec![to.to_string()],
            subject: subject.to_string(),
            html,
            reply_to: None,
        }
    }

    pub fn send_otp(&self, to: &str, code: &str) {
        let html = format!(
            "<div style=\"font-family: sans-serif; padding: 20px;\">\
             <h2>UniTrade Marketplace</h2>\
             <p>Use the 6-digit code below to verify your account. This code is valid for <strong>5 minutes</strong>.</p>\
             <div style=\"font-size: 24px; font-weight: bold; letter-spacing: 5px;\">{}</div>\
             <p style=\"color: #666; font-size: 12px;\">If you didn't request this, you can safely ignore this email.</p>\
             </div>",
            code
        );
        self.dispatch(self.message(to, "Your UniTrade Verification Code", html));
    }

    pub fn send_welcome(&self, to: &str, name: &str) {
        let html = format!(
            "<p>Hi <strong>{}</strong>,</p>\
             <p>Welcome to UniTrade, the campus marketplace. Your account has been successfully created.</p>\
             <p>Happy Trading!</p>",
            escape_html(name)
        );
        self.dispatch(self.message(to, "Welcome to UniTrade Marketplace!", html));
    }

    /// Contact form mail. Unlike the account mails the caller waits for it.
    pub async fn send_contact(
        &self,
        recipient: &str,
        name: &str,
        reply_to: &str,
        message: &str,
    ) -> Result<(), AppError> {
        let html = format!(
            "<h1>New Message</h1>\
             <p><strong>From:</strong> {} &lt;<a href=\"mailto:{email}\">{email}</a>&gt;</p>\
             <div style=\"white-space: pre-wrap; border-left: 4px solid #10b981; padding: 10px 20px;\">{}</div>",
            escape_html(name),
            escape_html(message),
            email = escape_html(reply_to),
        );
        let mut email = self.message(recipient, &format!("UniTrade Contact: New message from {}", name), html);
        email.reply_to = Some(reply_to.to_string());
        self.send(email).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markup() {
        assert_eq!(
            escape_html("<script>alert('x') & \"y\"</script>"),
            "&lt;script&gt;alert(&#39;x&#39;) &amp; &quot;y&quot;&lt;/script&gt;"
        );
    }

    #[actix_web::test]
    async fn unconfigured_mailer_logs_and_succeeds() {
        let mailer = Mailer::new(reqwest::Client::new(), None, "UniTrade <test@example.com>".into());
        mailer
            .send_contact("admin@iiit-bh.ac.in", "Asha", "asha@example.com", "hello")
            .await
            .unwrap();
    }

    #[test]
    fn email_serializes_without_empty_reply_to() {
        let mailer = Mailer::new(reqwest::Client::new(), None, "from@example.com".into());
        let email = mailer.message("to@example.com", "Hi", "<p>x</p>".into());
        let value = serde_json::to_value(&email).unwrap();
        assert_eq!(value["to"], serde_json::json!(["to@example.com"]));
        assert!(value.get("reply_to").is_none());
    }
}
