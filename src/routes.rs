use actix_web::{web, HttpResponse};

use crate::auth::{google_login, login, me, public_profile, send_otp, signup, update_photo};
use crate::contact::send_contact;
use crate::error::AppError;
use crate::lost_found::{claim_item, create_item, list_items, mark_returned};
use crate::messages::{get_conversation, recent_conversations, send_message};
use crate::products::{create_product, list_available, list_mine, mark_sold};
use crate::web_socket_server::ws_index;

async fn liveness() -> HttpResponse {
    HttpResponse::Ok().body("UniTrade API is running...")
}

/// Mounts the REST surface. Static uploads are served by the caller.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _req| AppError::validation(err.to_string()).into()),
    )
    .app_data(
        web::PathConfig::default()
            .error_handler(|err, _req| AppError::validation(err.to_string()).into()),
    )
    .app_data(
        web::QueryConfig::default()
            .error_handler(|err, _req| AppError::validation(err.to_string()).into()),
    )
    .route("/", web::get().to(liveness))
    .service(
        web::scope("/api")
            // AUTH
            .service(
                web::scope("/auth")
                    .route("/send-otp", web::post().to(send_otp))
                    .route("/signup", web::post().to(signup))
                    .route("/login", web::post().to(login))
                    .route("/google", web::post().to(google_login))
                    .route("/update-photo", web::patch().to(update_photo))
                    .route("/me", web::get().to(me))
                    .route("/{id}", web::get().to(public_profile)),
            )
            // PRODUCTS
            .service(
                web::scope("/products")
                    .route("", web::get().to(list_available))
                    .route("", web::post().to(create_product))
                    .route("/my-products", web::get().to(list_mine))
                    .route("/{id}/sell", web::patch().to(mark_sold)),
            )
            // LOST & FOUND
            .service(
                web::scope("/lost-found")
                    .route("", web::get().to(list_items))
                    .route("", web::post().to(create_item))
                    .route("/{id}/claim", web::patch().to(claim_item))
                    .route("/{id}/return", web::patch().to(mark_returned)),
            )
            // MESSAGES
            .service(
                web::scope("/messages")
                    .route("", web::post().to(send_message))
                    .route("/ws", web::get().to(ws_index))
                    .route("/conversations/recent", web::get().to(recent_conversations))
                    .route("/{other_user_id}", web::get().to(get_conversation)),
            )
            .route("/contact", web::post().to(send_contact)),
    );
}
