use std::sync::Mutex;

use slog::Drain;
use slog::Fuse;
use slog_async::Async;
use slog_json::Json;

pub use slog::{debug, error, info, o, trace, warn, Logger};

/// Builds the JSON-to-stderr root logger, tagged with the build
/// information of the running binary.
pub fn initialize_logger() -> slog::Logger {
    let drain = Mutex::new(Json::default(std::io::stderr())).map(Fuse);
    let drain = Async::new(drain).build().fuse();

    Logger::root(
        drain,
        o!("service" => info::NAME, "version" => info::VERSION, "revision" => info::REVISION, "build_timestamp" => info::BUILD_TIMESTAMP),
    )
}

/// A logger that drops everything, for tests and tools.
pub fn discard() -> slog::Logger {
    Logger::root(slog::Discard, o!())
}
