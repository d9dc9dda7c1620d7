use std::sync::Arc;

use actix_web::HttpRequest;
use sea_orm::DatabaseConnection;

use crate::accounts;
use crate::http_types::*;
use crate::mailer::MailSender;
use crate::photo_store::PhotoStore;

#[derive(Clone)]
pub struct ServerState {
    pub config: crate::config::ServerConfig,
    pub accounts: accounts::Settings,
    pub db: DatabaseConnection,
    pub photos: Arc<dyn PhotoStore>,
    pub mailer: Arc<dyn MailSender>,
}

pub fn server_state(req: &HttpRequest) -> Result<&ServerState, AppHttpError> {
    req.app_data::<ServerState>().ok_or_else(move || {
        log::error!("Server state is not there");
        AppHttpError::Internal
    })
}
