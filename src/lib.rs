pub mod config;
pub mod db;
pub mod environment;
pub mod errors;
pub mod io;
pub mod range;
pub mod recording;
pub mod routes;
pub mod service;
pub mod store;
