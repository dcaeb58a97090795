use std::path::{Path, PathBuf};

use tracing::{error, info, warn};

use super::compress::compress_file;
use super::db::Dumper;
use crate::config::config::BackupConfig;
use crate::credentials::CredentialStore;
use crate::dropbox::{Uploader, remote_path_for};
use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupOutcome {
    /// The file `pg_dump` wrote.
    pub dump_path: PathBuf,
    /// The file that was uploaded; the `.gz` sibling when compression is on.
    pub artifact: PathBuf,
    pub remote_path: String,
    pub removed_uncompressed: bool,
}

/// Dump, optionally compress, load credentials, upload. Each step runs only if the
/// previous one succeeded; the local artifact is left in place on any failure.
pub async fn run_backup<D, U>(
    config: &BackupConfig,
    store: &CredentialStore,
    dumper: &D,
    uploader: &U,
) -> Result<BackupOutcome>
where
    D: Dumper,
    U: Uploader,
{
    ensure_output_folder(&config.output_folder).await?;

    let dump_path = config.dump_path();
    dumper.dump(config, &dump_path).await?;

    let artifact = if config.compress {
        compress_file(&dump_path).await?
    } else {
        dump_path.clone()
    };

    if !tokio::fs::try_exists(&artifact).await.unwrap_or(false) {
        error!(path = %artifact.display(), "Backup artifact does not exist");
        return Err(Error::MissingArtifact { path: artifact });
    }

    let remote_path = remote_path_for(&artifact, &config.remote_folder)?;
    let credentials = store.load().await?;

    uploader.upload(&credentials, &artifact, &remote_path).await?;

    let removed_uncompressed = if config.remove_uncompressed {
        remove_uncompressed(config, &dump_path).await
    } else {
        false
    };

    info!(
        artifact = %artifact.display(),
        remote = %remote_path,
        "Backup finished"
    );

    Ok(BackupOutcome {
        dump_path,
        artifact,
        remote_path,
        removed_uncompressed,
    })
}

async fn ensure_output_folder(folder: &Path) -> Result<()> {
    if tokio::fs::try_exists(folder).await.unwrap_or(false) {
        return Ok(());
    }

    info!(folder = %folder.display(), "Output folder does not exist, creating it");
    match tokio::fs::create_dir_all(folder).await {
        Ok(()) => {
            info!(folder = %folder.display(), "Output folder created");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, folder = %folder.display(), "Failed to create output folder");
            Err(Error::CreateFolder {
                path: folder.to_path_buf(),
                source: e,
            })
        }
    }
}

// The upload already succeeded, so a failed removal is only reported.
async fn remove_uncompressed(config: &BackupConfig, dump_path: &Path) -> bool {
    if !config.compress {
        warn!("--remove-uncompressed has no effect without --compress; keeping the dump");
        return false;
    }

    match tokio::fs::remove_file(dump_path).await {
        Ok(()) => {
            info!(path = %dump_path.display(), "Removed uncompressed dump");
            true
        }
        Err(e) => {
            warn!(error = %e, path = %dump_path.display(), "Failed to remove uncompressed dump");
            false
        }
    }
}
