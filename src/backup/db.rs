use std::io::Write;
use std::path::Path;
use std::time::Duration;

use tracing::{debug, error, info};

use crate::config::config::BackupConfig;
use crate::error::{Error, Result};

/// Produces a database dump at a given path.
#[allow(async_fn_in_trait)]
pub trait Dumper {
    async fn dump(&self, config: &BackupConfig, output_path: &Path) -> Result<()>;
}

/// Runs `pg_dump`. The password never reaches the child's environment or argv: it is
/// written to a private pgpass file that only lives for the duration of the call.
#[derive(Debug, Clone)]
pub struct PgDump {
    program: String,
    timeout: Duration,
}

impl PgDump {
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }
}

impl Dumper for PgDump {
    async fn dump(&self, config: &BackupConfig, output_path: &Path) -> Result<()> {
        let db = &config.database;

        info!(
            db_name = %db.name,
            db_host = %db.host,
            db_port = db.port,
            custom_format = config.compress,
            output = %output_path.display(),
            "Starting PostgreSQL backup"
        );

        let pgpass = match &db.password {
            Some(password) => match write_pgpass(config, password) {
                Ok(file) => Some(file),
                Err(e) => {
                    error!(error = %e, "Failed to write temporary pgpass file");
                    return Err(Error::PasswordFile {
                        program: self.program.clone(),
                        source: e,
                    });
                }
            },
            None => None,
        };

        let mut command = tokio::process::Command::new(&self.program);
        if config.compress {
            command.arg("--format=custom");
        }
        command
            .arg("--host")
            .arg(&db.host)
            .arg("--port")
            .arg(db.port.to_string())
            .arg("--no-password");
        if let Some(user) = &db.user {
            command.arg("--username").arg(user);
        }
        command
            .arg("--file")
            .arg(output_path)
            .arg(&db.name)
            .env_remove("PGPASSWORD")
            .kill_on_drop(true);
        if let Some(pgpass) = &pgpass {
            command.env("PGPASSFILE", pgpass.path());
        }

        let output = match tokio::time::timeout(self.timeout, command.output()).await {
            Ok(Ok(o)) => o,
            Ok(Err(e)) => {
                error!(error = %e, program = %self.program, "Failed to spawn pg_dump process");
                return Err(Error::Spawn {
                    program: self.program.clone(),
                    source: e,
                });
            }
            Err(_) => {
                error!(
                    program = %self.program,
                    timeout_secs = self.timeout.as_secs(),
                    "pg_dump timed out and was killed"
                );
                return Err(Error::Timeout {
                    operation: "pg_dump",
                    seconds: self.timeout.as_secs(),
                });
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !stdout.trim().is_empty() {
            debug!(stdout = %stdout.trim_end(), "pg_dump output");
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            error!(
                exit_code = ?output.status.code(),
                stderr = %stderr,
                "pg_dump failed"
            );
            return Err(Error::DumpFailed {
                program: self.program.clone(),
                status: output.status.to_string(),
                stderr: stderr.trim_end().to_string(),
            });
        }

        let size_bytes = match tokio::fs::metadata(output_path).await {
            Ok(m) => m.len(),
            Err(e) => {
                error!(
                    error = %e,
                    path = %output_path.display(),
                    "Failed to stat pg_dump output file"
                );
                return Err(Error::MissingArtifact {
                    path: output_path.to_path_buf(),
                });
            }
        };

        info!(
            path = %output_path.display(),
            size_bytes = size_bytes,
            "PostgreSQL backup completed"
        );

        Ok(())
    }
}

// tempfile creates the file with 0600 on unix, which libpq requires for a pgpass file
fn write_pgpass(config: &BackupConfig, password: &str) -> std::io::Result<tempfile::NamedTempFile> {
    let mut file = tempfile::Builder::new().prefix("pgpass").tempfile()?;
    file.write_all(pgpass_line(config, password).as_bytes())?;
    file.flush()?;
    Ok(file)
}

/// `host:port:database:user:password`, with `:` and `\` escaped.
fn pgpass_line(config: &BackupConfig, password: &str) -> String {
    let db = &config.database;
    let user = match &db.user {
        Some(u) => escape_pgpass(u),
        None => "*".to_string(),
    };
    format!(
        "{}:{}:{}:{}:{}\n",
        escape_pgpass(&db.host),
        db.port,
        escape_pgpass(&db.name),
        user,
        escape_pgpass(password)
    )
}

fn escape_pgpass(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    for c in field.chars() {
        if c == ':' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
