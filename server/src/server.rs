use std::path::Path;
use std::sync::Arc;

use actix_web::{web, App, HttpServer};
use anyhow::Context;
use migration::MigratorTrait;
use sea_orm::Database;

use crate::accounts;
use crate::config::Config;
use crate::handlers;
use crate::http_types::AppHttpError;
use crate::mailer::LogMailer;
use crate::photo_store::DiskPhotoStore;
use crate::seed;
use crate::server_state::ServerState;

pub struct Handle {
    pub server: actix_web::dev::Server,
    pub addrs: Vec<std::net::SocketAddr>,
}

pub async fn run(config: Config) -> anyhow::Result<()> {
    let handle = create(config).await?;
    log::info!("Listening on {:?}", handle.addrs);
    handle.server.await?;
    Ok(())
}

/// Connects to the database, brings the schema up to date, loads the demo
/// data when enabled and wires the collaborators.
pub async fn state(config: &Config) -> anyhow::Result<ServerState> {
    let mut db_options = sea_orm::ConnectOptions::new(&config.db_path);
    db_options.max_connections(32);
    let db = Database::connect(db_options)
        .await
        .context("Failed to connect to the database")?;
    migration::Migrator::up(&db, None)
        .await
        .context("Failed to apply migrations")?;
    let photos = Arc::new(DiskPhotoStore::new(&config.server_config.fs_root_dir));
    if config.seed_config.enabled {
        seed::run(&db, photos.as_ref(), &config.seed_config)
            .await
            .map_err(|e| anyhow::anyhow!("Seeding failed: {e}"))?;
    }
    Ok(ServerState {
        config: config.server_config.clone(),
        accounts: accounts::Settings::from_config(config),
        db,
        photos,
        mailer: Arc::new(LogMailer),
    })
}

/// Malformed bodies get the regular error envelope instead of a plain text
/// response.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        log::debug!("Rejected request body: {err}");
        AppHttpError::BadClientData(err.to_string()).into()
    })
}

pub async fn create(config: Config) -> anyhow::Result<Handle> {
    let port = config.server_config.port;
    let app_state = state(&config).await?;
    let images_dir = Path::new(&app_state.config.fs_root_dir).join("images");
    std::fs::create_dir_all(&images_dir)
        .with_context(|| format!("Failed to create {images_dir:?}"))?;

    let server = HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .app_data(json_config())
            .configure(handlers::configure)
            .service(actix_files::Files::new("/images", &images_dir))
    })
    .workers(8)
    .bind(("::", port))?;
    let addrs = server.addrs();
    let server = server.run(); // Does not actually run the server but creates a future.
    Ok(Handle { server, addrs })
}
