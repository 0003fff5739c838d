use actix_multipart::Multipart;
use actix_web::{dev::Payload, web, FromRequest, HttpMessage, HttpRequest, HttpResponse};
use bcrypt::{hash, verify};
use chrono::{Duration, Utc};
use futures::future::LocalBoxFuture;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::config::EmailPolicy;
use crate::error::AppError;
use crate::models::otp::{generate_code, Otp};
use crate::models::user::PublicProfile;
use crate::models::{Role, User, UserView};
use crate::upload::read_form;

pub const TOKEN_TTL_HOURS: i64 = 24;
const BCRYPT_COST: u32 = 12;
const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
}

/// User id taken from a verified bearer token.
#[derive(Debug, Clone)]
pub struct AuthenticatedId(pub String);

// JWT Creation
pub fn create_jwt(user_id: &str, secret: &str) -> Result<String, AppError> {
    let expiration = Utc::now() + Duration::hours(TOKEN_TTL_HOURS);
    let claims = Claims {
        sub: user_id.to_string(),
        exp: expiration.timestamp() as usize,
    };
    Ok(encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_ref()))?)
}

// JWT Validation
pub fn validate_jwt(token: &str, secret: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &Validation::default(),
    )?;
    Ok(token_data.claims)
}

/// The caller's full user record, resolved from the bearer token.
pub struct AuthUser(pub User);

impl FromRequest for AuthUser {
    type Error = AppError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let user_id = req.extensions().get::<AuthenticatedId>().map(|id| id.0.clone());
        let state = req.app_data::<web::Data<AppState>>().cloned();
        Box::pin(async move {
            let user_id = user_id.ok_or(AppError::Unauthorized)?;
            let state = state.ok_or_else(|| AppError::Internal("application state missing".into()))?;
            match state.store.find_user_by_id(&user_id).await? {
                Some(user) => Ok(AuthUser(user)),
                None => {
                    warn!("Token for unknown user {}", user_id);
                    Err(AppError::Unauthorized)
                }
            }
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct SendOtpRequest {
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub otp: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleLoginRequest {
    pub id_token: Option<String>,
}

async fn hash_password(password: String) -> Result<String, AppError> {
    Ok(web::block(move || hash(password, BCRYPT_COST)).await??)
}

async fn verify_password(password: String, hashed: String) -> Result<bool, AppError> {
    Ok(web::block(move || verify(password, &hashed)).await?.unwrap_or(false))
}

fn token_response(status: actix_web::http::StatusCode, user: &User, data: &AppState) -> Result<HttpResponse, AppError> {
    let token = create_jwt(&user.id, &data.config.jwt_secret)?;
    Ok(HttpResponse::build(status).json(json!({
        "status": "success",
        "token": token,
        "data": { "user": UserView::new(user, data.config.email_policy.domain()) },
    })))
}

fn required(value: &Option<String>, message: &str) -> Result<String, AppError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| AppError::validation(message))
}

fn checked_email(raw: &str, policy: &EmailPolicy) -> Result<String, AppError> {
    let email = EmailPolicy::normalize(raw);
    if !policy.allows(&email) {
        return Err(AppError::DomainRestricted(policy.domain().to_string()));
    }
    Ok(email)
}

/// POST /api/auth/send-otp
pub async fn send_otp(
    data: web::Data<AppState>,
    payload: web::Json<SendOtpRequest>,
) -> Result<HttpResponse, AppError> {
    let raw = required(&payload.email, "Please provide your email")?;
    let email = checked_email(&raw, &data.config.email_policy)?;

    if data.store.find_user_by_email(&email).await?.is_some() {
        return Err(AppError::AlreadyRegistered);
    }

    let removed = data.store.delete_otps(&email).await?;
    debug!("Cleared {} outstanding codes for {}", removed, email);
    let otp = Otp::new(&email, generate_code());
    data.store.insert_otp(&otp).await?;
    data.mailer.send_otp(&email, &otp.code);

    info!("Verification code issued for {}", email);
    Ok(HttpResponse::Ok().json(json!({
        "status": "success",
        "message": "OTP sent to your email",
    })))
}

/// POST /api/auth/signup
pub async fn signup(
    data: web::Data<AppState>,
    payload: web::Json<SignupRequest>,
) -> Result<HttpResponse, AppError> {
    let payload = payload.into_inner();
    let email = EmailPolicy::normalize(payload.email.as_deref().unwrap_or_default());
    let code = payload.otp.as_deref().unwrap_or_default().trim().to_string();

    if data.store.find_otp(&email, &code).await?.is_none() {
        return Err(AppError::InvalidOrExpiredCode);
    }

    let name = required(&payload.name, "Please provide your name")?;
    let password = payload.password.unwrap_or_default();
    if password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }

    let user = User {
        id: Uuid::new_v4().to_string(),
        name,
        email: email.clone(),
        password: hash_password(password).await?,
        role: Role::Student,
        profile_photo: String::new(),
        created_at: Utc::now(),
    };
    data.store.insert_user(&user).await?;
    data.store.delete_otps(&email).await?;
    data.mailer.send_welcome(&user.email, &user.name);

    info!("User {} signed up as {}", user.id, user.email);
    token_response(actix_web::http::StatusCode::CREATED, &user, &data)
}

/// POST /api/auth/login
pub async fn login(
    data: web::Data<AppState>,
    payload: web::Json<LoginRequest>,
) -> Result<HttpResponse, AppError> {
    let (email, password) = match (&payload.email, &payload.password) {
        (Some(e), Some(p)) if !e.trim().is_empty() && !p.is_empty() => (EmailPolicy::normalize(e), p.clone()),
        _ => return Err(AppError::MissingCredentials),
    };

    let user = match data.store.find_user_by_email(&email).await? {
        Some(user) => user,
        None => return Err(AppError::InvalidCredentials),
    };
    if !verify_password(password, user.password.clone()).await? {
        warn!("Failed login for {}", email);
        return Err(AppError::InvalidCredentials);
    }

    token_response(actix_web::http::StatusCode::OK, &user, &data)
}

/// POST /api/auth/google
pub async fn google_login(
    data: web::Data<AppState>,
    payload: web::Json<GoogleLoginRequest>,
) -> Result<HttpResponse, AppError> {
    let id_token = required(&payload.id_token, "Please provide a Google ID token")?;
    let identity = data.verifier.verify(&id_token).await?;
    let email = checked_email(&identity.email, &data.config.email_policy)?;

    let user = match data.store.find_user_by_email(&email).await? {
        Some(user) => user,
        None => {
            // Federated accounts get a password nobody knows.
            let placeholder = Uuid::new_v4().simple().to_string();
            let user = User {
                id: Uuid::new_v4().to_string(),
                name: identity.name.unwrap_or_else(|| email.clone()),
                email: email.clone(),
                password: hash_password(placeholder).await?,
                role: Role::Student,
                profile_photo: identity.picture.unwrap_or_default(),
                created_at: Utc::now(),
            };
            match data.store.insert_user(&user).await {
                Ok(()) => {
                    info!("User {} created through Google login", user.id);
                    data.mailer.send_welcome(&user.email, &user.name);
                    user
                }
                // Lost a race with a concurrent first login; reuse the winner.
                Err(AppError::AlreadyRegistered) => data
                    .store
                    .find_user_by_email(&email)
                    .await?
                    .ok_or(AppError::AlreadyRegistered)?,
                Err(e) => return Err(e),
            }
        }
    };

    token_response(actix_web::http::StatusCode::OK, &user, &data)
}

/// PATCH /api/auth/update-photo
pub async fn update_photo(
    data: web::Data<AppState>,
    AuthUser(user): AuthUser,
    payload: Multipart,
) -> Result<HttpResponse, AppError> {
    let mut form = read_form(payload, "photo", &format!("profile-{}", user.id), &data.config).await?;
    let url = form.file.as_ref().map(|f| f.url.clone()).ok_or(AppError::MissingFile)?;

    let updated = match data.store.set_profile_photo(&user.id, &url).await {
        Ok(Some(updated)) => updated,
        Ok(None) => {
            form.discard(&data.config).await;
            return Err(AppError::NotFound("User"));
        }
        Err(e) => {
            form.discard(&data.config).await;
            return Err(e);
        }
    };

    info!("User {} updated profile photo", user.id);
    Ok(HttpResponse::Ok().json(json!({
        "status": "success",
        "data": { "user": UserView::new(&updated, data.config.email_policy.domain()) },
    })))
}

/// GET /api/auth/me
pub async fn me(data: web::Data<AppState>, AuthUser(user): AuthUser) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(json!({
        "status": "success",
        "data": { "user": UserView::new(&user, data.config.email_policy.domain()) },
    })))
}

/// GET /api/auth/{id}
pub async fn public_profile(
    data: web::Data<AppState>,
    user_id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let user = data
        .store
        .find_user_by_id(&user_id)
        .await?
        .ok_or(AppError::NotFound("User"))?;
    Ok(HttpResponse::Ok().json(json!({
        "status": "success",
        "data": { "user": PublicProfile::new(&user) },
    })))
}
