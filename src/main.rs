// src/main.rs

mod app_state;
mod auth;
mod chat_server;
mod config;
mod contact;
mod email;
mod error;
mod identity_provider;
mod lost_found;
mod messages;
mod models;
mod products;
mod routes;
mod store;
mod student_info;
mod upload;
mod web_socket_server;
#[cfg(test)]
mod test_support;

use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::sync::Arc;
use std::task::{Context, Poll};

use actix::Actor;
use actix_cors::Cors;
use actix_web::{
    body::{BoxBody, MessageBody},
    dev::{Service, ServiceRequest, ServiceResponse, Transform},
    http,
    middleware::Logger,
    web, App, Error, HttpMessage, HttpServer,
};
use env_logger::Env;
use futures::future::{ok, Ready};
use log::{info, warn};

use crate::app_state::AppState;
use crate::auth::{validate_jwt, AuthenticatedId};
use crate::chat_server::ChatServer;
use crate::config::Config;
use crate::email::Mailer;
use crate::identity_provider::GoogleVerifier;
use crate::store::MongoStore;

/// Resolves `Authorization: Bearer <token>` into an [`AuthenticatedId`]
/// extension. Requests without a valid token pass through without it;
/// handlers that need a user reject them through `AuthUser`.
#[derive(Debug)]
pub struct Authentication {
    secret: Rc<String>,
}

impl Authentication {
    pub fn new(secret: &str) -> Self {
        Self {
            secret: Rc::new(secret.to_string()),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for Authentication
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type Transform = AuthMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(AuthMiddleware {
            service,
            secret: self.secret.clone(),
        })
    }
}

pub struct AuthMiddleware<S> {
    service: S,
    secret: Rc<String>,
}

impl<S, B> Service<ServiceRequest> for AuthMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let token = req
            .headers()
            .get(http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
            .map(|t| t.trim().to_string());

        if let Some(token) = token {
            match validate_jwt(&token, &self.secret) {
                Ok(claims) => {
                    req.extensions_mut().insert(AuthenticatedId(claims.sub));
                }
                Err(e) => {
                    warn!("Ignoring invalid bearer token on {}: {}", req.path(), e);
                }
            }
        }

        let fut = self.service.call(req);
        Box::pin(async move {
            let res = fut.await?;
            Ok(res.map_into_boxed_body())
        })
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = Config::from_env()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()))?;
    let store = MongoStore::init(&config.mongo_uri, &config.database_name)
        .await
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
    let store = Arc::new(store);
    std::fs::create_dir_all(&config.upload_dir)?;

    let chat_server = ChatServer::new().start();
    let http_client = reqwest::Client::new();
    let mailer = Mailer::new(
        http_client.clone(),
        config.resend_api_key.clone(),
        config.mail_from.clone(),
    );
    let verifier = Arc::new(GoogleVerifier::new(http_client, config.google_client_id.clone()));

    let state = AppState {
        store,
        chat_server,
        config: config.clone(),
        mailer,
        verifier,
    };

    info!("Server running at http://0.0.0.0:{}", config.port);
    info!("Allowed CORS Origin: {}", config.frontend_origin);

    let port = config.port;
    HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin(&config.frontend_origin)
            .allowed_methods(vec!["GET", "POST", "PATCH", "OPTIONS"])
            .allowed_headers(vec![
                http::header::CONTENT_TYPE,
                http::header::ACCEPT,
                http::header::AUTHORIZATION,
            ])
            .supports_credentials()
            .max_age(3600);

        App::new()
            .wrap(Authentication::new(&config.jwt_secret))
            .wrap(cors)
            .wrap(Logger::default())
            .app_data(web::Data::new(state.clone()))
            .service(actix_files::Files::new("/uploads", &config.upload_dir))
            .configure(routes::configure)
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await
}
