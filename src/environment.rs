use std::path::PathBuf;
use std::sync::Arc;

use log::Logger;

use crate::db::Db;
use crate::store::Store;

/// Everything a request needs, constructed once at startup and handed to
/// each route.
#[derive(Clone)]
pub struct Environment {
    pub logger: Arc<Logger>,
    pub db: Arc<dyn Db + Send + Sync>,
    pub store: Arc<dyn Store + Send + Sync>,
    pub config: Config,
}

impl Environment {
    pub fn new(
        logger: Arc<Logger>,
        db: Arc<dyn Db + Send + Sync>,
        store: Arc<dyn Store + Send + Sync>,
        config: Config,
    ) -> Self {
        Self {
            logger,
            db,
            store,
            config,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    pub upload_dir: PathBuf,
    pub database_path: PathBuf,
    pub max_upload_bytes: u64,
}
