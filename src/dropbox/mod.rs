pub mod auth;
pub mod endpoints;
pub mod upload;

#[cfg(test)]
mod test_server;

pub use auth::{DropboxAuth, http_client};
pub use endpoints::DropboxEndpoints;
pub use upload::{DropboxUploader, Uploader, remote_path_for};
