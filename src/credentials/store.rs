//! File-backed persistence of the Dropbox credential bundle.
//!
//! Each field lives in its own flat file inside the credentials directory. The files
//! are written together during token generation and only read afterwards. Runs are
//! expected to be single-instance; writes go through a temp file and a rename so a
//! reader never observes a half-written file.

use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{error, info};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{Error, Result};

pub const APP_KEY_FILE: &str = "app.key";
pub const APP_SECRET_FILE: &str = "app.secret";
pub const REFRESH_TOKEN_FILE: &str = "refresh.token";

#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct CredentialBundle {
    pub app_key: String,
    pub app_secret: String,
    pub refresh_token: String,
}

impl CredentialBundle {
    pub fn new(
        app_key: impl Into<String>,
        app_secret: impl Into<String>,
        refresh_token: impl Into<String>,
    ) -> Self {
        Self {
            app_key: app_key.into(),
            app_secret: app_secret.into(),
            refresh_token: refresh_token.into(),
        }
    }
}

impl fmt::Debug for CredentialBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialBundle")
            .field("app_key", &self.app_key)
            .field("app_secret", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct CredentialStore {
    dir: PathBuf,
}

impl CredentialStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_of(&self, file_name: &str) -> PathBuf {
        self.dir.join(file_name)
    }

    /// Reads all three files. Fails naming the first missing file; never returns a partial bundle.
    pub async fn load(&self) -> Result<CredentialBundle> {
        let app_key = self.read_field(APP_KEY_FILE).await?;
        let app_secret = self.read_field(APP_SECRET_FILE).await?;
        let refresh_token = self.read_field(REFRESH_TOKEN_FILE).await?;

        info!(dir = %self.dir.display(), "Loaded stored Dropbox credentials");

        Ok(CredentialBundle {
            app_key,
            app_secret,
            refresh_token,
        })
    }

    async fn read_field(&self, file_name: &str) -> Result<String> {
        let path = self.path_of(file_name);
        match tokio::fs::read_to_string(&path).await {
            Ok(contents) => Ok(contents),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                error!(path = %path.display(), "Credential file is missing");
                Err(Error::MissingCredential { path })
            }
            Err(e) => {
                error!(error = %e, path = %path.display(), "Failed to read credential file");
                Err(Error::CredentialIo {
                    action: "read",
                    path,
                    source: e,
                })
            }
        }
    }

    /// Overwrites all three files. Nothing is renamed into place unless every field was staged.
    pub async fn save(&self, bundle: &CredentialBundle) -> Result<()> {
        let dir = self.dir.clone();
        let bundle = bundle.clone();

        let result = tokio::task::spawn_blocking(move || write_bundle(&dir, &bundle)).await;

        match result {
            Ok(Ok(())) => {
                info!(dir = %self.dir.display(), "Stored Dropbox credentials");
                Ok(())
            }
            Ok(Err(e)) => Err(e),
            Err(e) => {
                error!(error = %e, "Credential write task panicked");
                Err(Error::CredentialIo {
                    action: "write",
                    path: self.dir.clone(),
                    source: std::io::Error::other(e.to_string()),
                })
            }
        }
    }
}

fn write_bundle(dir: &Path, bundle: &CredentialBundle) -> Result<()> {
    if let Err(e) = std::fs::create_dir_all(dir) {
        error!(error = %e, dir = %dir.display(), "Failed to create credentials directory");
        return Err(Error::CredentialIo {
            action: "write",
            path: dir.to_path_buf(),
            source: e,
        });
    }

    let fields = [
        (APP_KEY_FILE, bundle.app_key.as_str()),
        (APP_SECRET_FILE, bundle.app_secret.as_str()),
        (REFRESH_TOKEN_FILE, bundle.refresh_token.as_str()),
    ];

    let mut staged = Vec::with_capacity(fields.len());
    for (file_name, contents) in fields {
        let target = dir.join(file_name);
        let tmp = stage(dir, contents).map_err(|e| {
            error!(error = %e, path = %target.display(), "Failed to stage credential file");
            Error::CredentialIo {
                action: "write",
                path: target.clone(),
                source: e,
            }
        })?;
        staged.push((tmp, target));
    }

    for (tmp, target) in staged {
        if let Err(e) = tmp.persist(&target) {
            error!(error = %e.error, path = %target.display(), "Failed to replace credential file");
            return Err(Error::CredentialIo {
                action: "write",
                path: target,
                source: e.error,
            });
        }
    }

    Ok(())
}

// tempfile creates the file with 0600 on unix
fn stage(dir: &Path, contents: &str) -> std::io::Result<tempfile::NamedTempFile> {
    let mut tmp = tempfile::Builder::new()
        .prefix(".credential")
        .suffix(".tmp")
        .tempfile_in(dir)?;
    tmp.write_all(contents.as_bytes())?;
    tmp.as_file().sync_all()?;
    Ok(tmp)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bundle() -> CredentialBundle {
        CredentialBundle::new("key-123", "secret-456", "refresh-789")
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::new(dir.path());

        store.save(&bundle()).await.unwrap();
        let loaded = store.load().await.unwrap();

        assert_eq!(loaded, bundle());
        assert_eq!(
            std::fs::read_to_string(dir.path().join(REFRESH_TOKEN_FILE)).unwrap(),
            "refresh-789"
        );
    }

    #[tokio::test]
    async fn contents_are_not_trimmed() {
        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::new(dir.path());
        let padded = CredentialBundle::new(" key", "secret\n", "tok\r\n");

        store.save(&padded).await.unwrap();

        assert_eq!(store.load().await.unwrap(), padded);
    }

    #[tokio::test]
    async fn save_overwrites_previous_bundle() {
        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::new(dir.path());

        store.save(&bundle()).await.unwrap();
        let replacement = CredentialBundle::new("k2", "s2", "r2");
        store.save(&replacement).await.unwrap();

        assert_eq!(store.load().await.unwrap(), replacement);
        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn save_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let store = CredentialStore::new(&nested);

        store.save(&bundle()).await.unwrap();

        assert!(nested.join(APP_KEY_FILE).exists());
    }

    #[tokio::test]
    async fn each_missing_file_is_named() {
        for missing in [APP_KEY_FILE, APP_SECRET_FILE, REFRESH_TOKEN_FILE] {
            let dir = tempfile::tempdir().unwrap();
            let store = CredentialStore::new(dir.path());
            store.save(&bundle()).await.unwrap();
            std::fs::remove_file(dir.path().join(missing)).unwrap();

            let err = store.load().await.unwrap_err();
            match &err {
                Error::MissingCredential { path } => assert!(path.ends_with(missing)),
                other => panic!("unexpected error: {other}"),
            }
            assert!(err.to_string().contains(missing));
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn files_are_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::new(dir.path());
        store.save(&bundle()).await.unwrap();

        let mode = std::fs::metadata(dir.path().join(APP_SECRET_FILE))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn debug_redacts_secrets() {
        let rendered = format!("{:?}", bundle());
        assert!(rendered.contains("key-123"));
        assert!(!rendered.contains("secret-456"));
        assert!(!rendered.contains("refresh-789"));
    }
}
