//! Schema CLI (`up`, `down`, `status`, `fresh`). Without `DATABASE_URL` or
//! `-u` it targets the database named in the sample `server/config.toml`.
use sea_orm_migration::prelude::*;

const DEFAULT_DATABASE_URL: &str = "sqlite://./fantasy.sqlite?mode=rwc";

#[async_std::main]
async fn main() {
    let _ = dotenvy::dotenv();
    if std::env::var_os("DATABASE_URL").is_none() {
        std::env::set_var("DATABASE_URL", DEFAULT_DATABASE_URL);
    }
    cli::run_cli(migration::Migrator).await;
}
