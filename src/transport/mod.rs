use async_trait::async_trait;
use futures::StreamExt;
use futures::stream;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::config::AppConfig;
use crate::core::domain::{TransferRequest, TransferResult};
use crate::core::error::SendFileError;
use crate::core::traits::Transport;
use crate::utils;

/// Loopback transport: "sends" files by copying them under a local receive
/// root, the same write path a real device would run on arrival.
///
/// Destinations are resolved relative to the receive root (a leading `/` in
/// the requested destination is stripped). Each file is copied block-wise
/// through a temp file, renamed into place, and checksum-verified against its
/// source. When an inbound report channel is attached, every delivered
/// request is also announced as a receive-side [`TransferResult`], so one
/// process exercises both event directions.
pub struct LocalFsTransport {
    receive_root: PathBuf,
    block_size: usize,
    max_concurrent: usize,
    known_devices: HashSet<String>,
    inbound: Option<mpsc::UnboundedSender<TransferResult>>,
}

impl LocalFsTransport {
    pub fn new(receive_root: impl Into<PathBuf>) -> Self {
        let defaults = AppConfig::default();
        Self {
            receive_root: receive_root.into(),
            block_size: defaults.block_size,
            max_concurrent: defaults.max_concurrent_transfers,
            known_devices: HashSet::new(),
            inbound: None,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            receive_root: config.receive_dir_path(),
            block_size: config.block_size,
            max_concurrent: config.max_concurrent_transfers,
            known_devices: config.known_devices.iter().cloned().collect(),
            inbound: None,
        }
    }

    /// Mark a device id as reachable. Requests for unknown devices fail with
    /// `DeviceUnreachable`.
    pub fn with_known_device(mut self, device_id: impl Into<String>) -> Self {
        self.known_devices.insert(device_id.into());
        self
    }

    /// Attach a channel that receives the receive-side result of every
    /// delivered request.
    pub fn with_inbound_reports(mut self, tx: mpsc::UnboundedSender<TransferResult>) -> Self {
        self.inbound = Some(tx);
        self
    }

    fn resolve_dest(&self, dest: &str) -> PathBuf {
        self.receive_root.join(dest.trim_start_matches('/'))
    }

    async fn copy_one(&self, source: &str, dest: &str) -> Result<String, SendFileError> {
        let source_path = Path::new(source);
        let size = utils::check_file(source_path).await?;
        let dest_path = self.resolve_dest(dest);

        if let Some(parent) = dest_path.parent() {
            utils::ensure_dir(parent)
                .await
                .map_err(|e| SendFileError::WriteFailed(format!("{}: {e}", parent.display())))?;
        }

        // Write into a temp sibling first; the final name only appears once
        // the copy is complete and verified.
        let file_name = utils::get_filename(&dest_path)
            .ok_or_else(|| SendFileError::WriteFailed(format!("bad destination: {dest}")))?;
        let temp_path =
            dest_path.with_file_name(format!(".{file_name}.{}.part", utils::random_id(8)));

        if let Err(e) = self
            .stage_and_commit(source_path, &temp_path, &dest_path)
            .await
        {
            // Never leave a stale temp file behind a failed copy.
            let _ = fs::remove_file(&temp_path).await;
            return Err(e);
        }

        debug!(source, dest = %dest_path.display(), size, "file delivered");
        Ok(dest_path.to_string_lossy().to_string())
    }

    async fn stage_and_commit(
        &self,
        source_path: &Path,
        temp_path: &Path,
        dest_path: &Path,
    ) -> Result<(), SendFileError> {
        let mut reader = fs::File::open(source_path).await?;
        let mut writer = fs::File::create(temp_path)
            .await
            .map_err(|e| SendFileError::WriteFailed(format!("{}: {e}", temp_path.display())))?;

        let mut buffer = vec![0u8; self.block_size];
        loop {
            let count = reader.read(&mut buffer).await?;
            if count == 0 {
                break;
            }
            writer
                .write_all(&buffer[..count])
                .await
                .map_err(|e| SendFileError::WriteFailed(format!("{}: {e}", temp_path.display())))?;
        }
        writer
            .flush()
            .await
            .map_err(|e| SendFileError::WriteFailed(format!("{}: {e}", temp_path.display())))?;
        drop(writer);

        // Verify the staged copy before it can take the final name.
        let source_hash = utils::sha256_file(source_path).await?;
        let staged_hash = utils::sha256_file(temp_path).await?;
        if source_hash != staged_hash {
            return Err(SendFileError::Interrupted(format!(
                "checksum mismatch for {}",
                dest_path.display()
            )));
        }

        fs::rename(temp_path, dest_path)
            .await
            .map_err(|e| SendFileError::WriteFailed(format!("{}: {e}", dest_path.display())))?;

        Ok(())
    }
}

#[async_trait]
impl Transport for LocalFsTransport {
    async fn send(&self, request: &TransferRequest) -> Result<(), SendFileError> {
        if !self.known_devices.contains(request.device_id.as_str()) {
            return Err(SendFileError::DeviceUnreachable(
                request.device_id.to_string(),
            ));
        }

        // Copies run concurrently but landed names keep request order. The
        // futures are collected up front so the stream owns them outright.
        let pending: Vec<_> = request
            .file_pairs()
            .map(|(source, dest)| self.copy_one(source, dest))
            .collect();
        let copies = stream::iter(pending).buffered(self.max_concurrent);

        let mut landed = Vec::with_capacity(request.source_paths.len());
        let mut copies = Box::pin(copies);
        while let Some(outcome) = copies.next().await {
            landed.push(outcome?);
        }

        info!(
            device = %request.device_id,
            files = landed.len(),
            "request delivered to receive root"
        );

        if let Some(tx) = &self.inbound {
            // Receiver side of the loopback: report what landed. A closed
            // channel just means nobody is listening for inbound events.
            let _ = tx.send(TransferResult::received(landed));
        }

        Ok(())
    }
}
