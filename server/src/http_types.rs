use actix_web::http::StatusCode;
use actix_web::HttpResponse;
use derive_more::Display;
use serde::Serialize;

use crate::error::Error;

pub type HttpResult = Result<HttpResponse, AppHttpError>;

/// Uniform response envelope.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionResponse<T: Serialize> {
    pub was_success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

pub fn ok<T: Serialize>(result: T) -> HttpResult {
    Ok(HttpResponse::Ok().json(ActionResponse {
        was_success: true,
        result: Some(result),
        message: None,
    }))
}

#[derive(Debug, Display)]
pub enum AppHttpError {
    #[display(fmt = "Internal error.")]
    Internal,

    #[display(fmt = "Bad request: {_0}")]
    BadClientData(String),

    #[display(fmt = "Unauthenticated.")]
    Unauthenticated,

    #[display(fmt = "Unauthorized.")]
    Unauthorized,

    #[display(fmt = "{_0}")]
    Domain(Error),
}

impl std::error::Error for AppHttpError {}

impl AppHttpError {
    /// Envelope code; transport failures extend the domain table.
    pub fn code(&self) -> &'static str {
        match self {
            AppHttpError::Internal => "ERR500",
            AppHttpError::BadClientData(_) => "ERR018",
            AppHttpError::Unauthenticated => "ERR019",
            AppHttpError::Unauthorized => "ERR020",
            AppHttpError::Domain(e) => e.code(),
        }
    }
}

impl From<Error> for AppHttpError {
    fn from(e: Error) -> Self {
        AppHttpError::Domain(e)
    }
}

impl actix_web::error::ResponseError for AppHttpError {
    fn error_response(&self) -> HttpResponse {
        let body = match self {
            AppHttpError::Domain(Error::ValidationFailed(violations)) => ActionResponse {
                was_success: false,
                result: Some(serde_json::json!(violations)),
                message: Some("ERR000".to_owned()),
            },
            AppHttpError::Domain(e @ (Error::Internal(_) | Error::Db(_))) => {
                log::error!("Request failed: {e}");
                ActionResponse {
                    was_success: false,
                    result: None,
                    message: Some(e.code().to_owned()),
                }
            }
            other => {
                if let AppHttpError::BadClientData(detail) = other {
                    log::debug!("Rejected request body: {detail}");
                }
                ActionResponse {
                    was_success: false,
                    result: None,
                    message: Some(other.code().to_owned()),
                }
            }
        };
        HttpResponse::build(self.status_code()).json(body)
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppHttpError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            AppHttpError::BadClientData(_) => StatusCode::BAD_REQUEST,
            AppHttpError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AppHttpError::Unauthorized => StatusCode::FORBIDDEN,
            AppHttpError::Domain(e) => match e {
                Error::NotFound(_) => StatusCode::NOT_FOUND,
                Error::Conflict | Error::DuplicateEmail | Error::InUse => StatusCode::CONFLICT,
                Error::Internal(_) | Error::Db(_) => StatusCode::INTERNAL_SERVER_ERROR,
                _ => StatusCode::BAD_REQUEST,
            },
        }
    }
}
