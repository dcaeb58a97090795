use std::path::Path;

use anyhow::Context;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::build_info::{PROJECT_NAME, PROJECT_VERSION};

pub async fn setup_logger(
    log_dir: &Path,
    verbose: bool,
) -> anyhow::Result<(
    tracing_appender::non_blocking::WorkerGuard,
    tracing_appender::non_blocking::WorkerGuard,
)> {
    let app_start_time = chrono::Utc::now();

    // 없으면 디렉토리 생성
    if !log_dir.exists() {
        tokio::fs::create_dir_all(log_dir)
            .await
            .with_context(|| format!("failed to create log directory {}", log_dir.display()))?;
    }

    // 실행마다 새 로그 파일
    let file_appender = tracing_appender::rolling::never(
        log_dir,
        format!(
            "{}_{}_{}.log",
            PROJECT_NAME,
            PROJECT_VERSION,
            app_start_time.format("%Y%m%d_%H%M%S")
        ),
    );

    // 별도의 워커 스레드에서 로거를 실행하여 로깅이 작업 스레드 방해하지 않도록 설정
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // 파일로 로깅할 때 JSON으로 구조적 로깅이 되도록, 그리고 터미널 아웃풋 캐릭터가 들어가지 않도록 설정
    let file_layer = fmt::layer()
        .json()
        .with_ansi(false)
        .with_file(true)
        .with_line_number(true)
        .with_writer(non_blocking)
        .with_filter(tracing_subscriber::filter::LevelFilter::DEBUG);

    // 터미널: verbose면 진행 상황까지, 아니면 경고와 오류만. RUST_LOG가 있으면 우선
    let default_level = if verbose { "info" } else { "warn" };
    let stdout_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let (non_blocking_stdout, stdout_guard) = tracing_appender::non_blocking(std::io::stdout());

    let stdout_layer = fmt::layer()
        .pretty()
        .with_writer(non_blocking_stdout)
        .with_filter(stdout_filter);

    // 로거 초기화
    tracing_subscriber::registry()
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
        .context("failed to install tracing subscriber")?;

    Ok((guard, stdout_guard))
}
