use std::ffi::OsString;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use flate2::Compression;
use flate2::write::GzEncoder;
use tracing::{error, info};

use crate::error::{Error, Result};

/// `<path>.gz`, keeping the original extension.
pub fn gz_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".gz");
    PathBuf::from(name)
}

/// Gzips `source` into a sibling `.gz` file. The source is always left in place.
pub async fn compress_file(source: &Path) -> Result<PathBuf> {
    let output_path = gz_path(source);

    info!(
        source = %source.display(),
        output = %output_path.display(),
        "Compressing backup"
    );

    let src = source.to_path_buf();
    let out = output_path.clone();

    // flate2 is synchronous - run in a blocking thread
    let result = tokio::task::spawn_blocking(move || gzip(&src, &out)).await;

    let size_bytes = match result {
        Ok(Ok(size)) => size,
        Ok(Err(reason)) => {
            error!(error = %reason, source = %source.display(), "Compression failed");
            cleanup_partial_file(&output_path).await;
            return Err(Error::Compression {
                path: source.to_path_buf(),
                reason,
            });
        }
        Err(e) => {
            error!(error = %e, "Compression task panicked");
            cleanup_partial_file(&output_path).await;
            return Err(Error::Compression {
                path: source.to_path_buf(),
                reason: format!("compression task panicked: {e}"),
            });
        }
    };

    info!(
        path = %output_path.display(),
        size_bytes = size_bytes,
        "Backup compressed"
    );

    Ok(output_path)
}

fn gzip(source: &Path, output: &Path) -> std::result::Result<u64, String> {
    let input =
        File::open(source).map_err(|e| format!("failed to open {}: {e}", source.display()))?;
    let mut reader = BufReader::with_capacity(512 * 1024, input);

    let file =
        File::create(output).map_err(|e| format!("failed to create {}: {e}", output.display()))?;
    let writer = BufWriter::with_capacity(512 * 1024, file);
    let mut encoder = GzEncoder::new(writer, Compression::default());

    std::io::copy(&mut reader, &mut encoder).map_err(|e| format!("failed to compress: {e}"))?;

    let writer = encoder
        .finish()
        .map_err(|e| format!("failed to finalize gzip stream: {e}"))?;
    let file = writer
        .into_inner()
        .map_err(|e| format!("failed to flush output buffer: {}", e.error()))?;
    file.sync_all()
        .map_err(|e| format!("failed to sync {}: {e}", output.display()))?;

    file.metadata()
        .map(|m| m.len())
        .map_err(|e| format!("failed to get output file metadata: {e}"))
}

async fn cleanup_partial_file(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await
        && e.kind() != std::io::ErrorKind::NotFound
    {
        error!(
            error = %e,
            path = %path.display(),
            "Failed to clean up partial compressed file"
        );
    }
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use flate2::read::GzDecoder;

    use super::*;

    #[test]
    fn gz_path_appends_suffix() {
        assert_eq!(gz_path(Path::new("/tmp/app.sql")), PathBuf::from("/tmp/app.sql.gz"));
        assert_eq!(gz_path(Path::new("app")), PathBuf::from("app.gz"));
    }

    #[tokio::test]
    async fn compressed_file_decodes_to_original_and_source_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("app.sql");
        let contents = "CREATE TABLE t (id int);\n".repeat(1000);
        std::fs::write(&source, &contents).unwrap();

        let output = compress_file(&source).await.unwrap();

        assert_eq!(output, dir.path().join("app.sql.gz"));
        assert!(source.exists());

        let mut decoded = String::new();
        GzDecoder::new(File::open(&output).unwrap())
            .read_to_string(&mut decoded)
            .unwrap();
        assert_eq!(decoded, contents);
    }

    #[tokio::test]
    async fn missing_source_fails_without_output() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("missing.sql");

        let err = compress_file(&source).await.unwrap_err();

        assert!(matches!(err, Error::Compression { .. }), "got {err}");
        assert!(!dir.path().join("missing.sql.gz").exists());
    }
}
