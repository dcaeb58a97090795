use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::cli::Cli;
use crate::error::{Error, Result};

/// Immutable run configuration, built once from the command line.
#[derive(Debug, Clone)]
pub struct Config {
    pub verbose: bool,
    pub log_dir: PathBuf,
    pub credentials_dir: PathBuf,
    pub timeouts: Timeouts,
    pub mode: Mode,
}

#[derive(Debug, Clone)]
pub enum Mode {
    GenerateToken(ProvisionConfig),
    Backup(BackupConfig),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub dump: Duration,
    pub prompt: Duration,
    pub http: Duration,
    pub upload: Duration,
}

#[derive(Clone)]
pub struct ProvisionConfig {
    pub app_key: String,
    pub app_secret: String,
}

impl fmt::Debug for ProvisionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProvisionConfig")
            .field("app_key", &self.app_key)
            .field("app_secret", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct BackupConfig {
    pub database: DatabaseConfig,
    pub output_folder: PathBuf,
    pub compress: bool,
    pub remove_uncompressed: bool,
    pub remote_folder: String,
    pub pg_dump_path: String,
}

impl BackupConfig {
    /// `<output_folder>/<db_name>.sql`
    pub fn dump_path(&self) -> PathBuf {
        self.output_folder.join(format!("{}.sql", self.database.name))
    }
}

#[derive(Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub user: Option<String>,
    pub password: Option<String>,
    pub name: String,
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("name", &self.name)
            .finish()
    }
}

impl Config {
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let timeouts = Timeouts {
            dump: positive_secs("--dump-timeout", cli.dump_timeout)?,
            prompt: positive_secs("--prompt-timeout", cli.prompt_timeout)?,
            http: positive_secs("--http-timeout", cli.http_timeout)?,
            upload: positive_secs("--upload-timeout", cli.upload_timeout)?,
        };

        let mode = if cli.generate_token {
            Mode::GenerateToken(ProvisionConfig {
                app_key: required("--app-key", cli.app_key.as_deref())?,
                app_secret: required("--app-secret", cli.app_secret.as_deref())?,
            })
        } else {
            let name = required("--db-name", cli.db_name.as_deref())?;
            if name.contains(['/', '\\']) || name == "." || name == ".." {
                return Err(Error::Config(format!(
                    "--db-name '{name}' cannot be used as a file name"
                )));
            }

            Mode::Backup(BackupConfig {
                database: DatabaseConfig {
                    host: cli.db_host.clone(),
                    port: cli.db_port,
                    user: non_empty(cli.db_user.as_deref()),
                    password: non_empty(cli.db_password.as_deref()),
                    name,
                },
                output_folder: cli.output_folder.clone(),
                compress: cli.compress,
                remove_uncompressed: cli.remove_uncompressed,
                remote_folder: normalize_remote_folder(&cli.remote_folder)?,
                pg_dump_path: cli.pg_dump_path.clone(),
            })
        };

        Ok(Config {
            verbose: cli.verbose,
            log_dir: cli.log_dir.clone(),
            credentials_dir: cli.credentials_dir.clone(),
            timeouts,
            mode,
        })
    }
}

fn required(flag: &str, value: Option<&str>) -> Result<String> {
    match non_empty(value) {
        Some(v) => Ok(v),
        None => Err(Error::Config(format!("{flag} is required"))),
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn positive_secs(flag: &str, secs: u64) -> Result<Duration> {
    if secs == 0 {
        return Err(Error::Config(format!("{flag} must be greater than zero")));
    }
    Ok(Duration::from_secs(secs))
}

/// Normalizes a remote folder to `/` or `/a/b` (no trailing slash).
fn normalize_remote_folder(raw: &str) -> Result<String> {
    let segments: Vec<&str> = raw.split('/').filter(|s| !s.is_empty()).collect();
    if segments.iter().any(|s| *s == "." || *s == "..") {
        return Err(Error::Config(format!(
            "--remote-folder '{raw}' must not contain '.' or '..' segments"
        )));
    }
    if segments.is_empty() {
        Ok("/".to_string())
    } else {
        Ok(format!("/{}", segments.join("/")))
    }
}
