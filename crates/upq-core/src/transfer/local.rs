//! Content-addressed local directory store.
//!
//! Each payload is streamed into `<dest>/.<n>.part` while hashing, then
//! renamed to `<sha256><ext>`. Identical content maps to the same object.

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::checksum::{Sha256Stream, BUF_SIZE};
use crate::config::StorageConfig;
use crate::executor::{ProgressReporter, TransferError, TransferExecutor, TransferFuture, TransferReceipt};
use crate::job::Payload;

static NEXT_PART: AtomicU64 = AtomicU64::new(0);

/// Stores payloads in a local directory.
#[derive(Debug, Clone)]
pub struct LocalDirExecutor {
    dest_dir: PathBuf,
    max_file_bytes: u64,
}

impl LocalDirExecutor {
    pub fn new(dest_dir: impl Into<PathBuf>, max_file_bytes: u64) -> Self {
        Self {
            dest_dir: dest_dir.into(),
            max_file_bytes,
        }
    }

    pub fn from_config(cfg: &StorageConfig) -> Result<Self> {
        Ok(Self::new(cfg.resolve_dest_dir()?, cfg.max_file_bytes))
    }

    pub fn dest_dir(&self) -> &Path {
        &self.dest_dir
    }
}

impl TransferExecutor for LocalDirExecutor {
    fn execute(&self, payload: Payload, progress: ProgressReporter) -> TransferFuture {
        let dest_dir = self.dest_dir.clone();
        let limit = self.max_file_bytes;
        Box::pin(async move { store(&dest_dir, limit, &payload, &progress).await })
    }
}

/// Object name: content hash plus the payload's extension, if any.
fn object_name(checksum: &str, payload_name: &str) -> String {
    match Path::new(payload_name).extension() {
        Some(ext) => format!("{}.{}", checksum, ext.to_string_lossy()),
        None => checksum.to_string(),
    }
}

async fn store(
    dest_dir: &Path,
    limit: u64,
    payload: &Payload,
    progress: &ProgressReporter,
) -> Result<TransferReceipt, TransferError> {
    let mut src = tokio::fs::File::open(&payload.source).await?;
    let total = src.metadata().await?.len();
    if total > limit {
        return Err(TransferError::TooLarge { size: total, limit });
    }

    tokio::fs::create_dir_all(dest_dir).await?;
    let part_path = dest_dir.join(format!(
        ".{}.{}.part",
        std::process::id(),
        NEXT_PART.fetch_add(1, Ordering::Relaxed)
    ));

    match copy_hashed(&mut src, &part_path, total, progress).await {
        Ok(stream) => {
            let bytes = stream.bytes();
            let checksum = stream.finish_hex();
            let final_path = dest_dir.join(object_name(&checksum, &payload.name));
            if let Err(e) = tokio::fs::rename(&part_path, &final_path).await {
                let _ = tokio::fs::remove_file(&part_path).await;
                return Err(e.into());
            }
            tracing::debug!(
                name = %payload.name,
                path = %final_path.display(),
                bytes,
                "stored object"
            );
            Ok(TransferReceipt::new(final_path.display().to_string(), bytes).with_checksum(checksum))
        }
        Err(e) => {
            let _ = tokio::fs::remove_file(&part_path).await;
            Err(e)
        }
    }
}

async fn copy_hashed(
    src: &mut tokio::fs::File,
    part_path: &Path,
    total: u64,
    progress: &ProgressReporter,
) -> Result<Sha256Stream, TransferError> {
    let mut dst = tokio::fs::File::create(part_path).await?;
    let mut stream = Sha256Stream::new();
    let mut buf = vec![0u8; BUF_SIZE];
    progress.report(0);
    loop {
        let n = src.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        dst.write_all(&buf[..n]).await?;
        stream.update(&buf[..n]);
        progress.report_bytes(stream.bytes(), total);
    }
    dst.flush().await?;
    dst.sync_all().await?;
    Ok(stream)
}
