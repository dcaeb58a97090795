//! Error types for the backup and provisioning flows.

use std::path::PathBuf;

use thiserror::Error;

/// Broad category of a failure, used for reporting. Every kind is terminal for the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing or invalid flags, detected before any I/O.
    Config,
    /// Folder creation, credential files, missing artifacts.
    Filesystem,
    /// The dump tool or the compressor failed.
    Process,
    /// Authorization exchange, token refresh or upload failed.
    Network,
    /// The operator cancelled, did not answer in time, or the console failed.
    Interactive,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("failed to create output folder {}: {source}", path.display())]
    CreateFolder {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(
        "credential file {} is missing; run again with --generate-token to provision credentials",
        path.display()
    )]
    MissingCredential { path: PathBuf },

    #[error("failed to {action} credential file {}: {source}", path.display())]
    CredentialIo {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("backup artifact {} does not exist", path.display())]
    MissingArtifact { path: PathBuf },

    #[error("failed to read {}: {source}", path.display())]
    ReadArtifact {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {status}: {stderr}")]
    DumpFailed {
        program: String,
        status: String,
        stderr: String,
    },

    #[error("failed to prepare password file for {program}: {source}")]
    PasswordFile {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("compression of {} failed: {reason}", path.display())]
    Compression { path: PathBuf, reason: String },

    #[error("authorization failed: {0}")]
    Authorization(String),

    #[error("upload to {remote_path} failed: {reason}")]
    Upload { remote_path: String, reason: String },

    #[error("{operation} timed out after {seconds}s")]
    Timeout {
        operation: &'static str,
        seconds: u64,
    },

    #[error("no authorization code entered within {seconds}s")]
    PromptTimeout { seconds: u64 },

    #[error("console error: {0}")]
    Prompt(String),

    #[error("authorization cancelled by operator")]
    Cancelled,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Config(_) => ErrorKind::Config,
            Error::CreateFolder { .. }
            | Error::MissingCredential { .. }
            | Error::CredentialIo { .. }
            | Error::MissingArtifact { .. }
            | Error::ReadArtifact { .. } => ErrorKind::Filesystem,
            Error::Spawn { .. }
            | Error::DumpFailed { .. }
            | Error::PasswordFile { .. }
            | Error::Compression { .. } => ErrorKind::Process,
            Error::Timeout { operation, .. } if *operation == "pg_dump" => ErrorKind::Process,
            Error::Authorization(_) | Error::Upload { .. } | Error::Timeout { .. } => {
                ErrorKind::Network
            }
            Error::PromptTimeout { .. } | Error::Prompt(_) | Error::Cancelled => {
                ErrorKind::Interactive
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
