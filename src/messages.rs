use std::collections::HashSet;

use actix_web::{web, HttpResponse};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::app_state::AppState;
use crate::auth::AuthUser;
use crate::chat_server::Deliver;
use crate::error::AppError;
use crate::models::{Message, MessageView, UserProjection, UserSummary};
use crate::products::load_users;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub receiver_id: Option<String>,
    pub text: Option<String>,
    pub product_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentChat {
    pub partner: UserSummary,
    pub last_message: MessageView,
}

/// GET /api/messages/{otherUserId}
pub async fn get_conversation(
    data: web::Data<AppState>,
    AuthUser(user): AuthUser,
    other_user_id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let messages = data.store.conversation(&user.id, &other_user_id).await?;
    let users = load_users(
        data.store.as_ref(),
        [user.id.clone(), other_user_id.into_inner()],
        UserProjection::Public,
    )
    .await?;
    let messages: Vec<MessageView> = messages
        .into_iter()
        .map(|m| MessageView::new(m, UserProjection::Public, &users))
        .collect();
    Ok(HttpResponse::Ok().json(json!({
        "status": "success",
        "results": messages.len(),
        "data": { "messages": messages },
    })))
}

/// POST /api/messages
pub async fn send_message(
    data: web::Data<AppState>,
    AuthUser(user): AuthUser,
    payload: web::Json<SendMessageRequest>,
) -> Result<HttpResponse, AppError> {
    let payload = payload.into_inner();
    let receiver_id = payload
        .receiver_id
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty())
        .ok_or_else(|| AppError::validation("Please specify a receiver"))?;
    let text = payload
        .text
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| AppError::validation("Message text cannot be empty"))?;
    let product_id = payload.product_id.filter(|p| !p.is_empty());

    // The receiver is not looked up: a message to an unknown id is stored as is.
    let message = Message::new(&user.id, &receiver_id, text, product_id);
    data.store.insert_message(&message).await?;
    info!("Message {} from {} to {}", message.id, message.sender, message.receiver);

    let users = load_users(
        data.store.as_ref(),
        [message.sender.clone(), message.receiver.clone()],
        UserProjection::Public,
    )
    .await?;
    let sender_id = message.sender.clone();
    let view = MessageView::new(message, UserProjection::Public, &users);
    data.chat_server.do_send(Deliver {
        sender_id,
        receiver_id,
        message: view.clone(),
    });

    Ok(HttpResponse::Created().json(json!({
        "status": "success",
        "data": { "message": view },
    })))
}

/// GET /api/messages/conversations/recent
pub async fn recent_conversations(
    data: web::Data<AppState>,
    AuthUser(user): AuthUser,
) -> Result<HttpResponse, AppError> {
    let messages = data.store.messages_involving(&user.id).await?;
    debug!("Scanning {} messages for user {}", messages.len(), user.id);

    let mut seen = HashSet::new();
    let mut recent_chats = Vec::new();
    for message in messages {
        let partner_id = message.partner_of(&user.id).to_string();
        if !seen.insert(partner_id.clone()) {
            continue;
        }
        let partner = match data.store.find_user_by_id(&partner_id).await? {
            Some(partner) => partner,
            None => {
                debug!("Skipping conversation with missing user {}", partner_id);
                continue;
            }
        };
        recent_chats.push(RecentChat {
            partner: UserSummary::public(&partner),
            last_message: MessageView::new(message, UserProjection::None, &Default::default()),
        });
    }

    Ok(HttpResponse::Ok().json(json!({
        "status": "success",
        "results": recent_chats.len(),
        "data": { "recentChats": recent_chats },
    })))
}
