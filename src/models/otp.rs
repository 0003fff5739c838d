use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Seconds a verification code stays usable.
pub const OTP_TTL_SECS: i64 = 300;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Otp {
    #[serde(rename = "_id")]
    pub id: String,
    pub email: String,
    pub code: String,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

impl Otp {
    pub fn new(email: &str, code: String) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            email: email.to_string(),
            code,
            created_at: Utc::now(),
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now - self.created_at >= Duration::seconds(OTP_TTL_SECS)
    }
}

/// Draws a uniformly random six digit code.
pub fn generate_code() -> String {
    use rand::Rng;
    rand::rng().random_range(100_000..=999_999).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_six_digits() {
        for _ in 0..200 {
            let code = generate_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn expires_after_ttl() {
        let mut otp = Otp::new("a@iiit-bh.ac.in", "123456".into());
        let now = Utc::now();
        assert!(!otp.is_expired(now));
        otp.created_at = now - Duration::seconds(OTP_TTL_SECS + 1);
        assert!(otp.is_expired(now));
    }
}
