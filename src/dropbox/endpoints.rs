/// OAuth2 authorization endpoint.
pub const DROPBOX_AUTH_URL: &str = "https://www.dropbox.com/oauth2/authorize";
/// OAuth2 token endpoint.
pub const DROPBOX_TOKEN_URL: &str = "https://api.dropboxapi.com/oauth2/token";
/// Host for RPC-style API calls.
pub const DROPBOX_API_BASE: &str = "https://api.dropboxapi.com";
/// Host for content upload and download calls.
pub const DROPBOX_CONTENT_BASE: &str = "https://content.dropboxapi.com";

/// Where the Dropbox client sends its requests. `Default` is the production service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropboxEndpoints {
    pub authorize_url: String,
    pub token_url: String,
    pub api_base: String,
    pub content_base: String,
}

impl Default for DropboxEndpoints {
    fn default() -> Self {
        Self {
            authorize_url: DROPBOX_AUTH_URL.to_string(),
            token_url: DROPBOX_TOKEN_URL.to_string(),
            api_base: DROPBOX_API_BASE.to_string(),
            content_base: DROPBOX_CONTENT_BASE.to_string(),
        }
    }
}

impl DropboxEndpoints {
    pub fn account_url(&self) -> String {
        format!("{}/2/users/get_current_account", self.api_base.trim_end_matches('/'))
    }

    pub fn upload_url(&self) -> String {
        format!("{}/2/files/upload", self.content_base.trim_end_matches('/'))
    }
}
