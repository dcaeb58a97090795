use anyhow::Context;
use tracing::info;

use crate::backup::db::PgDump;
use crate::backup::pipeline::run_backup;
use crate::config::config::{BackupConfig, Config, Mode, ProvisionConfig};
use crate::credentials::CredentialStore;
use crate::dropbox::{DropboxAuth, DropboxEndpoints, DropboxUploader, http_client};
use crate::provision::{StdinPrompt, run_provisioning};

/// Runs the mode selected on the command line.
pub async fn run(config: &Config) -> anyhow::Result<()> {
    let store = CredentialStore::new(&config.credentials_dir);

    match &config.mode {
        Mode::GenerateToken(provision) => generate_token(config, provision, &store)
            .await
            .context("refresh token generation failed"),
        Mode::Backup(backup) => backup_and_upload(config, backup, &store)
            .await
            .context("backup failed"),
    }
}

async fn generate_token(
    config: &Config,
    provision: &ProvisionConfig,
    store: &CredentialStore,
) -> anyhow::Result<()> {
    let http = http_client(config.timeouts.http)?;
    let auth = DropboxAuth::new(
        &provision.app_key,
        &provision.app_secret,
        &DropboxEndpoints::default(),
        http,
        config.timeouts.http,
    )?;
    let mut prompt = StdinPrompt::stdin(config.timeouts.prompt);

    run_provisioning(provision, store, &auth, &mut prompt).await?;
    Ok(())
}

async fn backup_and_upload(
    config: &Config,
    backup: &BackupConfig,
    store: &CredentialStore,
) -> anyhow::Result<()> {
    let dumper = PgDump::new(backup.pg_dump_path.as_str(), config.timeouts.dump);
    let http = http_client(config.timeouts.http)?;
    let uploader = DropboxUploader::new(
        http,
        DropboxEndpoints::default(),
        config.timeouts.http,
        config.timeouts.upload,
    );

    let outcome = run_backup(backup, store, &dumper, &uploader).await?;

    info!(
        artifact = %outcome.artifact.display(),
        remote = %outcome.remote_path,
        removed_uncompressed = outcome.removed_uncompressed,
        "Backup uploaded to Dropbox"
    );
    Ok(())
}
