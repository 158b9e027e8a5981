use std::error::Error;
use std::sync::Arc;

use clipvault::config;
use clipvault::db::SqliteDb;
use clipvault::environment::Environment;
use clipvault::routes;
use clipvault::store::FsStore;
use log::{info, initialize_logger};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenv::dotenv().ok();

    let logger = initialize_logger();
    let config = config::load()?;

    info!(logger, "Starting..."; "port" => config.port, "max_upload_bytes" => config.max_upload_bytes);
    let logger = Arc::new(logger);

    info!(logger, "Preparing upload directory..."; "path" => %config.upload_dir.display());
    let store = Arc::new(FsStore::create(&config.upload_dir).await?);

    info!(logger, "Opening recording index..."; "path" => %config.database_path.display());
    let db = Arc::new(SqliteDb::open(&config.database_path).await?);

    let port = config.port;
    let environment = Environment::new(logger.clone(), db, store, config);

    let (address, server) = warp::serve(routes::make_routes(environment))
        .bind_with_graceful_shutdown(([0, 0, 0, 0], port), async {
            tokio::signal::ctrl_c().await.ok();
        });

    info!(logger, "Listening..."; "address" => %address);
    server.await;

    info!(logger, "Exiting gracefully...");

    Ok(())
}
