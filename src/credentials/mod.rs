pub mod store;

pub use store::{
    APP_KEY_FILE, APP_SECRET_FILE, CredentialBundle, CredentialStore, REFRESH_TOKEN_FILE,
};
