use derive_more::Display;
use sea_orm::{DbErr, SqlErr, TransactionError};
use serde::Serialize;

/// Which lookup failed; each maps to its own message code.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    #[display(fmt = "record")]
    Get,
    #[display(fmt = "record to update")]
    Update,
    #[display(fmt = "group to update")]
    GroupUpdate,
}

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum Reference {
    #[display(fmt = "admin")]
    Admin,
    #[display(fmt = "user")]
    User,
    #[display(fmt = "country")]
    Country,
    #[display(fmt = "tournament")]
    Tournament,
    #[display(fmt = "team")]
    Team,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldViolation {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Display, PartialEq)]
pub enum Error {
    #[display(fmt = "Not found: {_0}")]
    NotFound(Lookup),

    #[display(fmt = "Invalid {_0} reference")]
    InvalidReference(Reference),

    #[display(fmt = "Conflicting record")]
    Conflict,

    #[display(fmt = "Email already registered")]
    DuplicateEmail,

    #[display(fmt = "Record is in use")]
    InUse,

    #[display(fmt = "Validation failed: {_0:?}")]
    ValidationFailed(Vec<FieldViolation>),

    #[display(fmt = "Account is locked out")]
    LockedOut,

    #[display(fmt = "Account is not allowed to sign in")]
    NotAllowed,

    #[display(fmt = "Invalid credentials")]
    InvalidCredentials,

    #[display(fmt = "Invalid or consumed token")]
    InvalidToken,

    #[display(fmt = "Invalid current password")]
    InvalidCurrentPassword,

    #[display(fmt = "No free join code found")]
    CodeExhausted,

    #[display(fmt = "Match already started")]
    PredictionClosed,

    #[display(fmt = "Mail delivery failed: {_0}")]
    MailFailed(String),

    #[display(fmt = "Internal error: {_0}")]
    Internal(String),

    #[display(fmt = "Database error: {_0}")]
    Db(DbErr),
}

impl std::error::Error for Error {}

impl Error {
    /// Short code resolved to localized text by clients.
    pub fn code(&self) -> &'static str {
        match self {
            Error::NotFound(Lookup::Get) => "ERR001",
            Error::NotFound(Lookup::Update) => "ERR005",
            Error::NotFound(Lookup::GroupUpdate) => "ERR014",
            Error::DuplicateEmail | Error::InUse => "ERR002",
            Error::Conflict => "ERR003",
            Error::InvalidReference(Reference::Country) => "ERR004",
            Error::InvalidReference(Reference::Tournament) => "ERR009",
            Error::InvalidReference(Reference::Team) => "ERR010",
            Error::InvalidReference(Reference::Admin | Reference::User) => "ERR013",
            Error::InvalidCredentials => "ERR006",
            Error::LockedOut => "ERR007",
            Error::NotAllowed => "ERR008",
            Error::InvalidToken => "ERR011",
            Error::CodeExhausted => "ERR012",
            Error::PredictionClosed => "ERR015",
            Error::MailFailed(_) => "ERR016",
            Error::InvalidCurrentPassword => "ERR017",
            Error::ValidationFailed(_) => "ERR000",
            Error::Internal(_) | Error::Db(_) => "ERR500",
        }
    }
}

impl From<DbErr> for Error {
    fn from(e: DbErr) -> Self {
        Error::Db(e)
    }
}

impl From<TransactionError<Error>> for Error {
    fn from(e: TransactionError<Error>) -> Self {
        match e {
            TransactionError::Connection(e) => Error::Db(e),
            TransactionError::Transaction(e) => e,
        }
    }
}

/// Logs a store failure and wraps it.
pub fn db_err(ctx: &str) -> impl FnOnce(DbErr) -> Error + '_ {
    move |e| {
        log::error!("{ctx}: {e}");
        Error::Db(e)
    }
}

pub fn is_unique_violation(e: &DbErr) -> bool {
    matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

pub fn is_foreign_key_violation(e: &DbErr) -> bool {
    matches!(e.sql_err(), Some(SqlErr::ForeignKeyConstraintViolation(_)))
}

/// Translates a failed write: unique violations become `on_unique`.
pub fn write_err(ctx: &str, on_unique: Error) -> impl FnOnce(DbErr) -> Error + '_ {
    move |e| {
        if is_unique_violation(&e) {
            log::info!("{ctx}: {e}");
            on_unique
        } else {
            log::error!("{ctx}: {e}");
            Error::Db(e)
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn codes_follow_the_client_table() {
        assert_eq!(Error::NotFound(Lookup::Get).code(), "ERR001");
        assert_eq!(Error::NotFound(Lookup::Update).code(), "ERR005");
        assert_eq!(Error::NotFound(Lookup::GroupUpdate).code(), "ERR014");
        assert_eq!(Error::DuplicateEmail.code(), "ERR002");
        assert_eq!(Error::InvalidReference(Reference::Country).code(), "ERR004");
        assert_eq!(Error::InvalidReference(Reference::Admin).code(), "ERR013");
        assert_eq!(Error::InvalidReference(Reference::Tournament).code(), "ERR009");
        assert_eq!(Error::LockedOut.code(), "ERR007");
        assert_eq!(Error::ValidationFailed(vec![]).code(), "ERR000");
    }
}
