use std::path::Path;
use std::time::Duration;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderValue};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use super::auth::{DropboxAuth, error_chain};
use super::endpoints::DropboxEndpoints;
use crate::credentials::CredentialBundle;
use crate::error::{Error, Result};

/// Pushes one local file to a remote path, replacing whatever is there.
#[allow(async_fn_in_trait)]
pub trait Uploader {
    async fn upload(
        &self,
        credentials: &CredentialBundle,
        local_path: &Path,
        remote_path: &str,
    ) -> Result<()>;
}

/// Remote destination for a local artifact: `<remote_folder>/<basename>`.
pub fn remote_path_for(local_path: &Path, remote_folder: &str) -> Result<String> {
    let file_name = match local_path.file_name().and_then(|n| n.to_str()) {
        Some(name) => name,
        None => {
            error!(path = ?local_path, "Cannot determine a UTF-8 file name from path");
            return Err(Error::Upload {
                remote_path: remote_folder.to_string(),
                reason: format!("cannot determine file name from {}", local_path.display()),
            });
        }
    };

    let folder = remote_folder.trim_end_matches('/');
    Ok(format!("{folder}/{file_name}"))
}

#[derive(Serialize)]
struct UploadArg<'a> {
    path: &'a str,
    mode: &'static str,
    autorename: bool,
    mute: bool,
}

#[derive(Debug, Deserialize)]
struct FileMetadata {
    id: Option<String>,
    path_display: Option<String>,
    size: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct Account {
    account_id: String,
    email: Option<String>,
}

/// Single-request upload to Dropbox. The access token is minted from the refresh token
/// on every call and never stored.
pub struct DropboxUploader {
    http: reqwest::Client,
    endpoints: DropboxEndpoints,
    http_timeout: Duration,
    upload_timeout: Duration,
}

impl DropboxUploader {
    pub fn new(
        http: reqwest::Client,
        endpoints: DropboxEndpoints,
        http_timeout: Duration,
        upload_timeout: Duration,
    ) -> Self {
        Self {
            http,
            endpoints,
            http_timeout,
            upload_timeout,
        }
    }

    async fn verify_account(&self, access_token: &str) -> Result<()> {
        let response = self
            .http
            .post(self.endpoints.account_url())
            .header(AUTHORIZATION, format!("Bearer {access_token}"))
            .header(CONTENT_TYPE, "application/json")
            .body("null")
            .timeout(self.http_timeout)
            .send()
            .await
            .map_err(|e| request_error("get_current_account", &e, self.http_timeout))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %body, "Dropbox rejected the access token");
            return Err(Error::Authorization(format!(
                "account check returned {status}: {body}"
            )));
        }

        match response.json::<Account>().await {
            Ok(account) => info!(
                account_id = %account.account_id,
                email = account.email.as_deref().unwrap_or("unknown"),
                "Authenticated with Dropbox"
            ),
            Err(e) => {
                error!(error = %e, "Failed to decode Dropbox account response");
                return Err(Error::Authorization(format!(
                    "unexpected account response: {e}"
                )));
            }
        }

        Ok(())
    }
}

impl Uploader for DropboxUploader {
    async fn upload(
        &self,
        credentials: &CredentialBundle,
        local_path: &Path,
        remote_path: &str,
    ) -> Result<()> {
        let auth = DropboxAuth::new(
            &credentials.app_key,
            &credentials.app_secret,
            &self.endpoints,
            self.http.clone(),
            self.http_timeout,
        )?;
        let token = auth.access_token(&credentials.refresh_token).await?;
        self.verify_account(&token.secret).await?;

        // whole file in memory, one request
        let body = match tokio::fs::read(local_path).await {
            Ok(b) => b,
            Err(e) => {
                error!(
                    error = %e,
                    path = %local_path.display(),
                    "Failed to read file for upload"
                );
                return Err(Error::ReadArtifact {
                    path: local_path.to_path_buf(),
                    source: e,
                });
            }
        };
        let size_bytes = body.len();

        let arg = api_arg_header(&UploadArg {
            path: remote_path,
            mode: "overwrite",
            autorename: false,
            mute: false,
        })
        .map_err(|reason| Error::Upload {
            remote_path: remote_path.to_string(),
            reason,
        })?;

        info!(
            local = %local_path.display(),
            remote = remote_path,
            size_bytes = size_bytes,
            "Uploading backup to Dropbox"
        );

        let response = self
            .http
            .post(self.endpoints.upload_url())
            .header(AUTHORIZATION, format!("Bearer {}", token.secret))
            .header(CONTENT_TYPE, "application/octet-stream")
            .header("Dropbox-API-Arg", arg)
            .body(body)
            .timeout(self.upload_timeout)
            .send()
            .await
            .map_err(|e| {
                let err = request_error("upload", &e, self.upload_timeout);
                match err {
                    Error::Authorization(reason) => Error::Upload {
                        remote_path: remote_path.to_string(),
                        reason,
                    },
                    other => other,
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(
                status = %status,
                body = %body,
                remote = remote_path,
                "Failed to upload file to Dropbox"
            );
            return Err(Error::Upload {
                remote_path: remote_path.to_string(),
                reason: format!("{status}: {body}"),
            });
        }

        match response.json::<FileMetadata>().await {
            Ok(meta) => info!(
                remote = meta.path_display.as_deref().unwrap_or(remote_path),
                dropbox_file_id = meta.id.as_deref().unwrap_or("unknown"),
                size_bytes = meta.size.unwrap_or(size_bytes as u64),
                "Upload completed"
            ),
            Err(e) => info!(
                remote = remote_path,
                error = %e,
                "Upload completed; response metadata could not be decoded"
            ),
        }

        Ok(())
    }
}

fn request_error(operation: &'static str, err: &reqwest::Error, timeout: Duration) -> Error {
    if err.is_timeout() {
        error!(operation, timeout_secs = timeout.as_secs(), "Dropbox request timed out");
        return Error::Timeout {
            operation,
            seconds: timeout.as_secs(),
        };
    }
    let reason = error_chain(err);
    error!(operation, error = %reason, "Dropbox request failed");
    Error::Authorization(format!("{operation} request failed: {reason}"))
}

/// JSON for the `Dropbox-API-Arg` header. HTTP headers must be ASCII, so every
/// non-ASCII character is written as a `\uXXXX` escape (surrogate pairs above the BMP).
fn api_arg_header<T: Serialize>(arg: &T) -> std::result::Result<HeaderValue, String> {
    let json = serde_json::to_string(arg).map_err(|e| format!("failed to encode API arg: {e}"))?;

    let mut escaped = String::with_capacity(json.len());
    for c in json.chars() {
        if c.is_ascii() && !c.is_ascii_control() && c != '\u{7f}' {
            escaped.push(c);
        } else {
            let mut units = [0u16; 2];
            for unit in c.encode_utf16(&mut units) {
                escaped.push_str(&format!("\\u{unit:04x}"));
            }
        }
    }

    HeaderValue::from_str(&escaped).map_err(|e| format!("invalid API arg header: {e}"))
}
