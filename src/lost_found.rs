use std::collections::HashMap;

use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use chrono::{DateTime, NaiveDate, Utc};
use log::{info, warn};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::auth::AuthUser;
use crate::error::AppError;
use crate::models::{
    ItemKind, ItemStatus, LostFoundCategory, LostFoundItem, LostFoundView, Role, UserProjection,
};
use crate::products::load_users;
use crate::store::StatusChange;
use crate::upload::{read_form, UploadForm};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimRequest {
    pub claim_note: Option<String>,
}

/// Accepts a full RFC 3339 timestamp or a bare `YYYY-MM-DD` date.
fn parse_date(raw: &str) -> Result<DateTime<Utc>, AppError> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .ok_or_else(|| AppError::validation(format!("Invalid date: {}", raw)))
}

fn parse_item(form: &UploadForm, reporter: &str) -> Result<LostFoundItem, AppError> {
    let title = form.required("title", "Please provide a title")?;
    let description = form.required("description", "Please provide a description")?;
    let kind: ItemKind = form
        .required("type", "Please specify if it is lost or found")?
        .parse()?;
    let category: LostFoundCategory = form
        .required("category", "Please provide a category")?
        .parse()?;
    let location = form.required("location", "Please specify where it was lost/found")?;
    let now = Utc::now();
    let date = match form.text("date") {
        Some(raw) => parse_date(raw)?,
        None => now,
    };

    Ok(LostFoundItem {
        id: Uuid::new_v4().to_string(),
        title,
        description,
        kind,
        category,
        location,
        date,
        image: form.file.as_ref().map(|f| f.url.clone()),
        reporter: reporter.to_string(),
        status: ItemStatus::Active,
        claimed_by: None,
        claim_note: None,
        created_at: now,
    })
}

fn item_response(item: LostFoundItem) -> HttpResponse {
    let view = LostFoundView::new(item, UserProjection::None, &HashMap::new());
    HttpResponse::Ok().json(json!({
        "status": "success",
        "data": { "item": view },
    }))
}

/// GET /api/lost-found
pub async fn list_items(data: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let items = data.store.list_lost_found().await?;
    let users = load_users(
        data.store.as_ref(),
        items.iter().map(|i| i.reporter.clone()),
        UserProjection::Contact,
    )
    .await?;
    let items: Vec<LostFoundView> = items
        .into_iter()
        .map(|i| LostFoundView::new(i, UserProjection::Contact, &users))
        .collect();
    Ok(HttpResponse::Ok().json(json!({
        "status": "success",
        "results": items.len(),
        "data": { "items": items },
    })))
}

/// POST /api/lost-found
pub async fn create_item(
    data: web::Data<AppState>,
    AuthUser(user): AuthUser,
    payload: Multipart,
) -> Result<HttpResponse, AppError> {
    let mut form = read_form(payload, "image", "lost-found", &data.config).await?;
    let stored = match parse_item(&form, &user.id) {
        Ok(item) => {
            let inserted = data.store.insert_lost_found(&item).await;
            inserted.map(|()| item)
        }
        Err(e) => Err(e),
    };
    let item = match stored {
        Ok(item) => item,
        Err(e) => {
            form.discard(&data.config).await;
            return Err(e);
        }
    };

    info!("User {} reported {:?} item {}", user.id, item.kind, item.id);
    let view = LostFoundView::new(item, UserProjection::None, &HashMap::new());
    Ok(HttpResponse::Created().json(json!({
        "status": "success",
        "data": { "item": view },
    })))
}

/// PATCH /api/lost-found/{id}/claim
pub async fn claim_item(
    data: web::Data<AppState>,
    AuthUser(user): AuthUser,
    item_id: web::Path<String>,
    payload: Option<web::Json<ClaimRequest>>,
) -> Result<HttpResponse, AppError> {
    let item = data
        .store
        .find_lost_found(&item_id)
        .await?
        .ok_or(AppError::NotFound("Item"))?;
    if item.status != ItemStatus::Active {
        return Err(AppError::AlreadyClaimed);
    }

    let claim_note = payload
        .and_then(|p| p.into_inner().claim_note)
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty());
    let change = StatusChange {
        from: ItemStatus::Active,
        to: ItemStatus::Claimed,
        claimed_by: Some(user.id.clone()),
        claim_note,
    };
    // Someone else may have claimed it since the read above.
    let item = data
        .store
        .change_lost_found_status(&item.id, change)
        .await?
        .ok_or(AppError::AlreadyClaimed)?;

    info!("User {} claimed item {}", user.id, item.id);
    Ok(item_response(item))
}

/// PATCH /api/lost-found/{id}/return
pub async fn mark_returned(
    data: web::Data<AppState>,
    AuthUser(user): AuthUser,
    item_id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    if user.role != Role::Admin {
        warn!("User {} tried to mark item {} returned", user.id, item_id);
        return Err(AppError::Forbidden);
    }
    let item = data
        .store
        .find_lost_found(&item_id)
        .await?
        .ok_or(AppError::NotFound("Item"))?;
    let invalid = || AppError::InvalidStatus {
        from: item.status.to_string(),
        to: ItemStatus::Returned.to_string(),
    };
    if !item.status.can_become(ItemStatus::Returned) {
        return Err(invalid());
    }

    let change = StatusChange {
        from: item.status,
        to: ItemStatus::Returned,
        claimed_by: None,
        claim_note: None,
    };
    let updated = data
        .store
        .change_lost_found_status(&item.id, change)
        .await?
        .ok_or_else(invalid)?;

    info!("Admin {} marked item {} returned", user.id, updated.id);
    Ok(item_response(updated))
}
