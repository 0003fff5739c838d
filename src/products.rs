use std::collections::HashMap;

use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use chrono::Utc;
use log::{info, warn};
use serde_json::json;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::auth::AuthUser;
use crate::error::AppError;
use crate::models::{Product, ProductCategory, ProductView, User, UserProjection};
use crate::store::{ProductFilter, Store};
use crate::upload::{read_form, UploadForm};

/// Loads every user referenced by `ids` once, keyed by id.
pub async fn load_users(
    store: &dyn Store,
    ids: impl IntoIterator<Item = String>,
    projection: UserProjection,
) -> Result<HashMap<String, User>, AppError> {
    if projection == UserProjection::None {
        return Ok(HashMap::new());
    }
    let mut ids: Vec<String> = ids.into_iter().collect();
    ids.sort();
    ids.dedup();
    let users = store.find_users_by_ids(&ids).await?;
    Ok(users.into_iter().map(|u| (u.id.clone(), u)).collect())
}

pub async fn project_products(
    store: &dyn Store,
    products: Vec<Product>,
    projection: UserProjection,
) -> Result<Vec<ProductView>, AppError> {
    let users = load_users(store, products.iter().map(|p| p.owner.clone()), projection).await?;
    Ok(products
        .into_iter()
        .map(|p| ProductView::new(p, projection, &users))
        .collect())
}

struct NewProduct {
    name: String,
    description: String,
    price: f64,
    condition: i32,
    category: ProductCategory,
}

fn parse_product(form: &UploadForm) -> Result<NewProduct, AppError> {
    let name = form.required("name", "A product must have a name")?;
    let description = form.required("description", "A product must have a description")?;
    let price: f64 = form
        .required("price", "A product must have a price")?
        .parse()
        .map_err(|_| AppError::validation("Price must be a number"))?;
    if !price.is_finite() || price < 0.0 {
        return Err(AppError::validation("Price cannot be negative"));
    }
    let condition: i32 = form
        .required("condition", "Please specify how many months old the product is")?
        .parse()
        .map_err(|_| AppError::validation("Condition must be a whole number of months"))?;
    if condition < 0 {
        return Err(AppError::validation("Condition cannot be negative"));
    }
    let category = form
        .required("category", "A product must have a category")?
        .parse()?;
    Ok(NewProduct {
        name,
        description,
        price,
        condition,
        category,
    })
}

/// GET /api/products
pub async fn list_available(data: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let products = data.store.list_products(ProductFilter::Unsold).await?;
    let products = project_products(data.store.as_ref(), products, UserProjection::Public).await?;
    Ok(HttpResponse::Ok().json(json!({
        "status": "success",
        "results": products.len(),
        "data": { "products": products },
    })))
}

/// GET /api/products/my-products
pub async fn list_mine(
    data: web::Data<AppState>,
    AuthUser(user): AuthUser,
) -> Result<HttpResponse, AppError> {
    let products = data.store.list_products(ProductFilter::OwnedBy(user.id)).await?;
    let products = project_products(data.store.as_ref(), products, UserProjection::None).await?;
    Ok(HttpResponse::Ok().json(json!({
        "status": "success",
        "results": products.len(),
        "data": { "products": products },
    })))
}

async fn insert_listing(data: &AppState, owner: &str, form: &UploadForm) -> Result<Product, AppError> {
    let image = match &form.file {
        Some(file) => file.url.clone(),
        None => return Err(AppError::MissingImage),
    };
    let fields = parse_product(form)?;
    let product = Product {
        id: Uuid::new_v4().to_string(),
        name: fields.name,
        description: fields.description,
        price: fields.price,
        image,
        condition: fields.condition,
        category: fields.category,
        owner: owner.to_string(),
        is_sold: false,
        created_at: Utc::now(),
    };
    data.store.insert_product(&product).await?;
    Ok(product)
}

/// POST /api/products
pub async fn create_product(
    data: web::Data<AppState>,
    AuthUser(user): AuthUser,
    payload: Multipart,
) -> Result<HttpResponse, AppError> {
    let mut form = read_form(payload, "image", "product", &data.config).await?;
    let product = match insert_listing(&data, &user.id, &form).await {
        Ok(product) => product,
        Err(e) => {
            form.discard(&data.config).await;
            return Err(e);
        }
    };

    info!("User {} listed product {}", user.id, product.id);
    let view = ProductView::new(product, UserProjection::None, &HashMap::new());
    Ok(HttpResponse::Created().json(json!({
        "status": "success",
        "data": { "product": view },
    })))
}

/// PATCH /api/products/{id}/sell
pub async fn mark_sold(
    data: web::Data<AppState>,
    AuthUser(user): AuthUser,
    product_id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let product = data
        .store
        .find_product(&product_id)
        .await?
        .ok_or(AppError::NotFound("Product"))?;

    if product.owner != user.id {
        warn!("User {} tried to sell product {} owned by {}", user.id, product.id, product.owner);
        return Err(AppError::Forbidden);
    }

    let product = data
        .store
        .mark_product_sold(&product.id)
        .await?
        .ok_or(AppError::NotFound("Product"))?;

    info!("Product {} marked sold", product.id);
    let view = project_products(data.store.as_ref(), vec![product], UserProjection::Public)
        .await?
        .pop();
    Ok(HttpResponse::Ok().json(json!({
        "status": "success",
        "data": { "product": view },
    })))
}
