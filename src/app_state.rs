use crate::chat_server::ChatServer;
use crate::config::Config;
use crate::email::Mailer;
use crate::identity_provider::IdTokenVerifier;
use crate::store::Store;
use actix::Addr;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub chat_server: Addr<ChatServer>,
    pub config: Config,
    pub mailer: Mailer,
    pub verifier: Arc<dyn IdTokenVerifier>,
}
