use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use crate::environment::Config;
use crate::errors::ConfigError;

const DEFAULT_PORT: u16 = 3001;
const DEFAULT_UPLOAD_DIR: &str = "uploads";
const DEFAULT_DATABASE_PATH: &str = "recordings.db";

/// The maximum form data size to accept. This should be enforced by
/// the HTTP gateway, so on the Rust side it defaults to an unreasonably
/// large number.
const DEFAULT_MAX_UPLOAD_BYTES: u64 = 2 * 1024 * 1024 * 1024;

/// Returns the value of the named environment variable, or `default` if
/// it isn't set.
pub fn get_variable_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_owned())
}

/// Reads the server configuration from `CLIPVAULT_*` variables.
pub fn load() -> Result<Config, ConfigError> {
    Ok(Config {
        port: parse_variable("CLIPVAULT_PORT", DEFAULT_PORT, "port number")?,
        upload_dir: PathBuf::from(get_variable_or("CLIPVAULT_UPLOAD_DIR", DEFAULT_UPLOAD_DIR)),
        database_path: PathBuf::from(get_variable_or(
            "CLIPVAULT_DATABASE_PATH",
            DEFAULT_DATABASE_PATH,
        )),
        max_upload_bytes: parse_variable(
            "CLIPVAULT_MAX_UPLOAD_BYTES",
            DEFAULT_MAX_UPLOAD_BYTES,
            "byte count",
        )?,
    })
}

fn parse_variable<T: FromStr>(
    name: &'static str,
    default: T,
    expected: &'static str,
) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => value.trim().parse().map_err(|_| ConfigError::Invalid {
            name,
            value,
            expected,
        }),
        Err(_) => Ok(default),
    }
}
