//! Dump a PostgreSQL database, optionally gzip it, and upload it to Dropbox using a
//! stored OAuth2 refresh token.

pub mod app;
pub mod backup;
pub mod build_info;
pub mod cli;
pub mod config;
pub mod credentials;
pub mod dropbox;
pub mod error;
pub mod provision;
pub mod setup_logger;

pub use error::{Error, ErrorKind, Result};
