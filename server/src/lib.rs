pub mod accounts;
pub mod auth;
pub mod config;
pub mod countries;
pub mod error;
pub mod groups;
pub mod handlers;
pub mod http_types;
pub mod mailer;
pub mod matches;
pub mod pagination;
pub mod photo_store;
pub mod predictions;
pub mod seed;
pub mod server;
pub mod server_state;
pub mod teams;
pub mod tournaments;

mod validation;

#[cfg(test)]
mod testing;
