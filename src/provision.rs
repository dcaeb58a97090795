//! One-time interactive generation of the Dropbox refresh token.
//!
//! The operator opens the consent URL, approves the app, and pastes the code that
//! Dropbox displays. The code is exchanged once; a bad or mistyped code means running
//! the flow again. Nothing is written unless the exchange succeeded.

use std::time::Duration;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{error, info, warn};

use crate::config::config::ProvisionConfig;
use crate::credentials::{CredentialBundle, CredentialStore};
use crate::dropbox::DropboxAuth;
use crate::error::{Error, Result};

/// The authorization-code half of the OAuth2 exchange.
#[allow(async_fn_in_trait)]
pub trait AuthorizationFlow {
    fn authorize_url(&self) -> String;

    /// Returns the refresh token.
    async fn exchange_code(&self, code: &str) -> Result<String>;
}

impl AuthorizationFlow for DropboxAuth {
    fn authorize_url(&self) -> String {
        DropboxAuth::authorize_url(self)
    }

    async fn exchange_code(&self, code: &str) -> Result<String> {
        DropboxAuth::exchange_code(self, code).await
    }
}

/// Source of the authorization code pasted by the operator.
#[allow(async_fn_in_trait)]
pub trait CodePrompt {
    async fn read_code(&mut self, authorize_url: &str) -> Result<String>;
}

/// One line of operator input; `None` at end of input.
#[allow(async_fn_in_trait)]
pub trait LineSource {
    async fn next_line(&mut self) -> std::io::Result<Option<String>>;
}

/// Lines from any async buffered reader.
pub struct BufLines<R>(pub R);

impl<R> LineSource for BufLines<R>
where
    R: AsyncBufRead + Unpin,
{
    async fn next_line(&mut self) -> std::io::Result<Option<String>> {
        let mut line = String::new();
        let read = self.0.read_line(&mut line).await?;
        Ok((read > 0).then_some(line))
    }
}

/// Lines from the process's stdin, read on a dedicated thread.
///
/// The thread is never joined. `tokio::io::stdin` reads on the blocking pool, and the
/// runtime waits for that read on shutdown, so a timed-out prompt would keep the
/// process alive until the operator pressed Enter.
pub struct StdinLines;

impl LineSource for StdinLines {
    async fn next_line(&mut self) -> std::io::Result<Option<String>> {
        let (tx, rx) = tokio::sync::oneshot::channel();

        std::thread::Builder::new()
            .name("stdin-prompt".to_string())
            .spawn(move || {
                let mut line = String::new();
                let result = std::io::stdin()
                    .read_line(&mut line)
                    .map(|read| (read > 0).then_some(line));
                // receiver is gone when the prompt already timed out
                let _ = tx.send(result);
            })?;

        match rx.await {
            Ok(result) => result,
            Err(_) => Err(std::io::Error::other("stdin reader thread exited early")),
        }
    }
}

/// Prints the consent URL and reads one line. An empty line or end of input cancels.
pub struct LinePrompt<S, W> {
    source: S,
    writer: W,
    timeout: Duration,
}

pub type StdinPrompt = LinePrompt<StdinLines, tokio::io::Stdout>;

impl StdinPrompt {
    pub fn stdin(timeout: Duration) -> Self {
        LinePrompt::new(StdinLines, tokio::io::stdout(), timeout)
    }
}

impl<S, W> LinePrompt<S, W>
where
    S: LineSource,
    W: AsyncWrite + Unpin,
{
    pub fn new(source: S, writer: W, timeout: Duration) -> Self {
        Self {
            source,
            writer,
            timeout,
        }
    }

    pub fn into_writer(self) -> W {
        self.writer
    }

    async fn print(&mut self, text: &str) -> Result<()> {
        let written = async {
            self.writer.write_all(text.as_bytes()).await?;
            self.writer.flush().await
        }
        .await;
        written.map_err(|e| {
            error!(error = %e, "Failed to write to the console");
            Error::Prompt(format!("failed to write prompt: {e}"))
        })
    }
}

impl<S, W> CodePrompt for LinePrompt<S, W>
where
    S: LineSource,
    W: AsyncWrite + Unpin,
{
    async fn read_code(&mut self, authorize_url: &str) -> Result<String> {
        let prompt = format!(
            "1. Go to: {authorize_url}\n\
             2. Click \"Allow\" (you might have to log in first).\n\
             3. Copy the authorization code.\n\
             Enter the authorization code here (empty line cancels): "
        );
        self.print(&prompt).await?;

        let line = match tokio::time::timeout(self.timeout, self.source.next_line()).await {
            Ok(Ok(line)) => line,
            Ok(Err(e)) => {
                error!(error = %e, "Failed to read authorization code");
                return Err(Error::Prompt(format!(
                    "failed to read authorization code: {e}"
                )));
            }
            Err(_) => {
                warn!(
                    timeout_secs = self.timeout.as_secs(),
                    "No authorization code entered in time"
                );
                return Err(Error::PromptTimeout {
                    seconds: self.timeout.as_secs(),
                });
            }
        };

        let code = line.as_deref().map(str::trim).unwrap_or_default();
        if code.is_empty() {
            warn!("Authorization cancelled by operator");
            return Err(Error::Cancelled);
        }
        Ok(code.to_string())
    }
}

/// Runs the whole provisioning flow: prompt, exchange, persist.
pub async fn run_provisioning<A, P>(
    config: &ProvisionConfig,
    store: &CredentialStore,
    auth: &A,
    prompt: &mut P,
) -> Result<CredentialBundle>
where
    A: AuthorizationFlow,
    P: CodePrompt,
{
    let url = auth.authorize_url();
    info!("Waiting for the operator to authorize the app");

    let code = prompt.read_code(&url).await?;
    let refresh_token = auth.exchange_code(&code).await?;

    let bundle = CredentialBundle::new(
        config.app_key.as_str(),
        config.app_secret.as_str(),
        refresh_token,
    );
    store.save(&bundle).await?;

    info!(
        dir = %store.dir().display(),
        "Refresh token generated and stored"
    );

    Ok(bundle)
}
