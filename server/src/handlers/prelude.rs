pub use actix_web::{delete, get, post, put, web, HttpRequest, HttpResponse};
pub use serde::Deserialize;

pub use crate::auth::{authenticate, require_admin};
pub use crate::http_types::*;
pub use crate::pagination::Pagination;
pub use crate::server_state::*;
