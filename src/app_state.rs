use crate::chat_server::ChatServer;
use crate::config::Config;
use crate::db::MongoDB;
use crate::mailer::Mailer;
use crate::stripe::StripeClient;
use actix::Addr;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub chat_server: Addr<ChatServer>,
    pub mongodb: Arc<MongoDB>,
    pub config: Config,
    pub mailer: Mailer,
    pub stripe: StripeClient,
}
