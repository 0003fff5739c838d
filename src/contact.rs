use actix_web::{web, HttpResponse};
use log::info;
use serde::Deserialize;
use serde_json::json;

use crate::app_state::AppState;
use crate::error::AppError;

#[derive(Debug, Deserialize)]
pub struct ContactRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub message: Option<String>,
}

fn filled(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// POST /api/contact
pub async fn send_contact(
    data: web::Data<AppState>,
    payload: web::Json<ContactRequest>,
) -> Result<HttpResponse, AppError> {
    let payload = payload.into_inner();
    let (name, email, message) = match (
        filled(payload.name),
        filled(payload.email),
        filled(payload.message),
    ) {
        (Some(name), Some(email), Some(message)) => (name, email, message),
        _ => return Err(AppError::validation("Please provide name, email and message")),
    };

    data.mailer
        .send_contact(&data.config.contact_recipient, &name, &email, &message)
        .await?;
    info!("Contact message from {} forwarded", email);

    Ok(HttpResponse::Ok().json(json!({
        "status": "success",
        "message": "Message sent successfully!",
    })))
}
