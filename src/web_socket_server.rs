use actix::prelude::*;
use actix_web::{web, HttpRequest, HttpResponse};
use actix_web_actors::ws;
use log::{debug, info, warn};
use serde::Deserialize;
use std::time::{Duration, Instant};

use crate::app_state::AppState;
use crate::auth::validate_jwt;
use crate::chat_server::{ChatServer, Connect, Disconnect, WsMessage};
use crate::error::AppError;

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);
const CLIENT_TIMEOUT: Duration = Duration::from_secs(10);

/// One authenticated websocket connection. Push-only: messages are still
/// sent through `POST /api/messages`, the socket just receives them.
pub struct WebSocketConnection {
    pub user_id: String,
    pub hb: Instant,
    pub addr: Addr<ChatServer>,
}

impl WebSocketConnection {
    pub fn new(user_id: String, addr: Addr<ChatServer>) -> Self {
        Self {
            user_id,
            hb: Instant::now(),
            addr,
        }
    }

    fn hb(&self, ctx: &mut ws::WebsocketContext<Self>) {
        ctx.run_interval(HEARTBEAT_INTERVAL, |act, ctx| {
            if Instant::now().duration_since(act.hb) > CLIENT_TIMEOUT {
                warn!("WebSocket heartbeat of user {} failed, disconnecting", act.user_id);
                ctx.stop();
                return;
            }
            ctx.ping(b"");
        });
    }
}

impl Actor for WebSocketConnection {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        self.hb(ctx);

        let addr = ctx.address();
        self.addr
            .send(Connect {
                user_id: self.user_id.clone(),
                addr: addr.recipient(),
            })
            .into_actor(self)
            .then(|res, act, ctx| {
                if res.is_err() {
                    warn!("Failed to register user {} with chat server", act.user_id);
                    ctx.stop();
                }
                fut::ready(())
            })
            .wait(ctx);
    }

    fn stopped(&mut self, ctx: &mut Self::Context) {
        self.addr.do_send(Disconnect {
            user_id: self.user_id.clone(),
            addr: ctx.address().recipient(),
        });
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for WebSocketConnection {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(msg)) => {
                self.hb = Instant::now();
                ctx.pong(&msg);
            }
            Ok(ws::Message::Pong(_)) => {
                self.hb = Instant::now();
            }
            Ok(ws::Message::Text(_)) | Ok(ws::Message::Binary(_)) => {
                debug!("Ignoring inbound frame from user {}", self.user_id);
            }
            Ok(ws::Message::Close(reason)) => {
                ctx.close(reason);
                ctx.stop();
            }
            Err(e) => {
                warn!("WebSocket error for user {}: {}", self.user_id, e);
                ctx.stop();
            }
            _ => {}
        }
    }
}

impl Handler<WsMessage> for WebSocketConnection {
    type Result = ();

    fn handle(&mut self, msg: WsMessage, ctx: &mut ws::WebsocketContext<Self>) {
        ctx.text(msg.0);
    }
}

#[derive(Deserialize)]
pub struct WsQuery {
    pub token: Option<String>,
}

/// GET /api/messages/ws?token=<jwt>
///
/// Browsers cannot set headers on a websocket handshake, so the token
/// travels in the query string and is checked the same way as a bearer.
pub async fn ws_index(
    req: HttpRequest,
    stream: web::Payload,
    query: web::Query<WsQuery>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, actix_web::Error> {
    let token = query.token.as_deref().ok_or(AppError::Unauthorized)?;
    let claims = validate_jwt(token, &data.config.jwt_secret).map_err(|e| {
        warn!("Rejected websocket token: {}", e);
        AppError::Unauthorized
    })?;
    let user = data
        .store
        .find_user_by_id(&claims.sub)
        .await?
        .ok_or(AppError::Unauthorized)?;

    info!("Opening websocket for user {}", user.id);
    ws::start(
        WebSocketConnection::new(user.id, data.chat_server.clone()),
        &req,
        stream,
    )
}

#[cfg(test)]
mod tests {
    use crate::test_support::{seed_user, test_app, TestContext};
    use crate::auth::create_jwt;
    use actix_web::{http::StatusCode, test};

    #[actix_web::test]
    async fn handshake_needs_a_valid_token() {
        let ctx = TestContext::new();
        let app = test_app!(ctx);

        let none = test::TestRequest::get().uri("/api/messages/ws").to_request();
        assert_eq!(test::call_service(&app, none).await.status(), StatusCode::UNAUTHORIZED);

        let bad = test::TestRequest::get().uri("/api/messages/ws?token=garbage").to_request();
        assert_eq!(test::call_service(&app, bad).await.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn token_of_deleted_user_is_refused() {
        let ctx = TestContext::new();
        let app = test_app!(ctx);
        let token = create_jwt("ghost", &ctx.config.jwt_secret).unwrap();
        let req = test::TestRequest::get()
            .uri(&format!("/api/messages/ws?token={}", token))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn valid_token_reaches_the_handshake() {
        let ctx = TestContext::new();
        let user = seed_user(&ctx, "Jane", "jane@iiit-bh.ac.in", "password123").await;
        let app = test_app!(ctx);
        let token = create_jwt(&user.id, &ctx.config.jwt_secret).unwrap();
        // No upgrade headers, so the handshake itself is refused with 400.
        let req = test::TestRequest::get()
            .uri(&format!("/api/messages/ws?token={}", token))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
    }
}
