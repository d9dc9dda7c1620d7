use clap::Parser;
use sea_orm::{EntityTrait, PaginatorTrait};

use fantasy_db as db;
use fantasy_server::predictions;

/// Materializes the missing prediction rows for one group or for all of them.
#[derive(Parser, Debug)]
struct Config {
    #[arg(long)]
    db: String,
    #[arg(long)]
    group_id: Option<i64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default())
        .filter_module("sqlx", log::LevelFilter::Error)
        .init();
    let cfg = Config::parse();
    let db = sea_orm::Database::connect(cfg.db).await?;
    let inserted = match cfg.group_id {
        Some(id) => predictions::reconcile(&db, id).await?,
        None => predictions::reconcile_all(&db).await?,
    };
    let total = db::predictions::Entity::find().count(&db).await?;
    println!("Inserted {inserted} predictions, {total} in total");
    Ok(())
}
