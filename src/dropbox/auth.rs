//! OAuth2 authorization-code and refresh-token exchanges against Dropbox.

use std::time::Duration;

use oauth2::basic::BasicClient;
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, EndpointNotSet, EndpointSet,
    RefreshToken, TokenResponse, TokenUrl,
};
use tracing::{error, info};

use super::endpoints::DropboxEndpoints;
use crate::error::{Error, Result};

type DropboxOAuthClient =
    BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

/// Short-lived access token minted from the stored refresh token.
pub struct AccessToken {
    pub secret: String,
    pub expires_in: Option<Duration>,
}

/// OAuth2 client for one Dropbox app (key + secret).
pub struct DropboxAuth {
    client: DropboxOAuthClient,
    http: reqwest::Client,
    timeout: Duration,
}

impl DropboxAuth {
    pub fn new(
        app_key: &str,
        app_secret: &str,
        endpoints: &DropboxEndpoints,
        http: reqwest::Client,
        timeout: Duration,
    ) -> Result<Self> {
        let auth_url = AuthUrl::new(endpoints.authorize_url.clone())
            .map_err(|e| Error::Config(format!("invalid auth URL: {e}")))?;
        let token_url = TokenUrl::new(endpoints.token_url.clone())
            .map_err(|e| Error::Config(format!("invalid token URL: {e}")))?;

        let client = BasicClient::new(ClientId::new(app_key.to_string()))
            .set_client_secret(ClientSecret::new(app_secret.to_string()))
            .set_auth_uri(auth_url)
            .set_token_uri(token_url);

        Ok(Self {
            client,
            http,
            timeout,
        })
    }

    /// Consent URL for the no-redirect flow. Dropbox shows the code to the operator,
    /// who pastes it back. `token_access_type=offline` is what makes Dropbox issue a
    /// refresh token.
    pub fn authorize_url(&self) -> String {
        let (url, _csrf) = self
            .client
            .authorize_url(CsrfToken::new_random)
            .add_extra_param("token_access_type", "offline")
            .url();
        url.to_string()
    }

    /// Exchanges an authorization code for a refresh token.
    ///
    /// # Errors
    /// - Rejected or expired code, revoked app
    /// - Network errors and timeouts
    /// - A successful response without a refresh token
    pub async fn exchange_code(&self, code: &str) -> Result<String> {
        info!("Exchanging authorization code for a refresh token");

        let request = self
            .client
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .request_async(&self.http);

        let token = match tokio::time::timeout(self.timeout, request).await {
            Ok(Ok(t)) => t,
            Ok(Err(e)) => {
                let reason = error_chain(&e);
                error!(error = %reason, "Authorization code exchange failed");
                return Err(Error::Authorization(format!("code exchange failed: {reason}")));
            }
            Err(_) => {
                error!(
                    timeout_secs = self.timeout.as_secs(),
                    "Authorization code exchange timed out"
                );
                return Err(Error::Timeout {
                    operation: "authorization code exchange",
                    seconds: self.timeout.as_secs(),
                });
            }
        };

        match token.refresh_token() {
            Some(refresh) => Ok(refresh.secret().clone()),
            None => {
                error!("Token response carried no refresh token");
                Err(Error::Authorization(
                    "no refresh token received; the app must request offline access".to_string(),
                ))
            }
        }
    }

    /// Mints a fresh access token from a refresh token.
    pub async fn access_token(&self, refresh_token: &str) -> Result<AccessToken> {
        let refresh = RefreshToken::new(refresh_token.to_string());
        let request = self
            .client
            .exchange_refresh_token(&refresh)
            .request_async(&self.http);

        let token = match tokio::time::timeout(self.timeout, request).await {
            Ok(Ok(t)) => t,
            Ok(Err(e)) => {
                let reason = error_chain(&e);
                error!(error = %reason, "Refresh token exchange failed");
                return Err(Error::Authorization(format!("token refresh failed: {reason}")));
            }
            Err(_) => {
                error!(timeout_secs = self.timeout.as_secs(), "Refresh token exchange timed out");
                return Err(Error::Timeout {
                    operation: "token refresh",
                    seconds: self.timeout.as_secs(),
                });
            }
        };

        info!(
            expires_in_secs = ?token.expires_in().map(|d| d.as_secs()),
            "Obtained Dropbox access token"
        );

        Ok(AccessToken {
            secret: token.access_token().secret().clone(),
            expires_in: token.expires_in(),
        })
    }
}

/// Shared HTTP client. Redirects are disabled, as recommended for token endpoints.
pub fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .connect_timeout(timeout)
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| {
            error!(error = %e, "Failed to build HTTP client");
            Error::Config(format!("failed to build HTTP client: {e}"))
        })
}

/// Display of an error followed by its source chain.
pub(crate) fn error_chain(err: &dyn std::error::Error) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        out.push_str(": ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}
