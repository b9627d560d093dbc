// Copyright 2025 coScene
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

// Filesystem sink implementation

use super::backend::{PersistenceSink, PersistError};
use crate::config::FilesystemConfig;
use crate::protocol::SoundRecord;
use async_trait::async_trait;
use serde_json::json;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

/// Sink that writes raw sample files plus a JSON metadata sidecar per record.
///
/// Filenames are `<timestamp_ms>_<seq>.pcm`; the sequence counter keeps
/// concurrent records with equal timestamps from clobbering each other.
pub struct FilesystemSink {
    base_path: PathBuf,
    seq: AtomicU64,
}

impl FilesystemSink {
    pub fn new(config: FilesystemConfig) -> Result<Self, PersistError> {
        let base_path = PathBuf::from(&config.base_path);

        info!("Initializing filesystem sink at: {}", base_path.display());

        Ok(Self {
            base_path,
            seq: AtomicU64::new(0),
        })
    }

    fn record_path(&self, record: &SoundRecord, seq: u64) -> PathBuf {
        self.base_path
            .join(format!("{}_{}.pcm", record.timestamp, seq))
    }

    fn metadata_path(&self, record: &SoundRecord, seq: u64) -> PathBuf {
        self.base_path
            .join(format!("{}_{}.meta.json", record.timestamp, seq))
    }
}

#[async_trait]
impl PersistenceSink for FilesystemSink {
    async fn initialize(&self) -> Result<(), PersistError> {
        if !self.base_path.exists() {
            info!("Creating base directory: {}", self.base_path.display());
            fs::create_dir_all(&self.base_path).await?;
        }
        Ok(())
    }

    async fn persist(&self, record: &SoundRecord) -> Result<(), PersistError> {
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        let file_path = self.record_path(record, seq);
        let metadata_path = self.metadata_path(record, seq);

        debug!(
            "Writing {} sample bytes to {}",
            record.sample_len(),
            file_path.display()
        );

        let mut file = fs::File::create(&file_path).await?;
        file.write_all(&record.samples).await?;
        file.flush().await?;

        let metadata = json!({
            "timestamp_ms": record.timestamp,
            "format": record.format,
            "format_code": record.format.code(),
            "sample_bytes": record.sample_len(),
        });
        let mut meta_file = fs::File::create(&metadata_path).await?;
        meta_file
            .write_all(serde_json::to_string_pretty(&metadata)?.as_bytes())
            .await?;
        meta_file.flush().await?;

        info!(
            "Persisted record with timestamp {} ({} bytes) to '{}'",
            record.timestamp,
            record.sample_len(),
            file_path.display()
        );

        Ok(())
    }

    async fn health_check(&self) -> Result<bool, PersistError> {
        match fs::metadata(&self.base_path).await {
            Ok(metadata) if metadata.is_dir() => {
                let probe = self.base_path.join(".health_check_probe");
                match fs::File::create(&probe).await {
                    Ok(mut f) => {
                        if let Err(e) = f.write_all(b"probe").await {
                            warn!("Health check failed - cannot write: {}", e);
                            return Ok(false);
                        }
                        let _ = fs::remove_file(&probe).await;
                        Ok(true)
                    }
                    Err(e) => {
                        warn!("Health check failed - cannot create file: {}", e);
                        Ok(false)
                    }
                }
            }
            Ok(_) => {
                warn!(
                    "Health check failed - base path is not a directory: {}",
                    self.base_path.display()
                );
                Ok(false)
            }
            Err(e) => {
                warn!(
                    "Health check failed - cannot access base path {}: {}",
                    self.base_path.display(),
                    e
                );
                Ok(false)
            }
        }
    }

    fn sink_type(&self) -> &str {
        "filesystem"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::AudioFormat;
    use bytes::Bytes;
    use tempfile::TempDir;

    fn create_test_sink() -> (FilesystemSink, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let config = FilesystemConfig {
            base_path: temp_dir.path().to_string_lossy().to_string(),
        };
        let sink = FilesystemSink::new(config).unwrap();
        (sink, temp_dir)
    }

    fn test_record(timestamp: i64) -> SoundRecord {
        SoundRecord::new(
            timestamp,
            AudioFormat::Pcm8000_8MonoLe,
            Bytes::from_static(&[0xAA, 0xBB, 0xCC]),
        )
    }

    #[tokio::test]
    async fn test_initialize() {
        let (sink, _temp_dir) = create_test_sink();
        assert!(sink.initialize().await.is_ok());
        assert!(sink.base_path.exists());
    }

    #[tokio::test]
    async fn test_persist_writes_samples_and_metadata() {
        let (sink, _temp_dir) = create_test_sink();
        sink.initialize().await.unwrap();

        let record = test_record(1700000000123);
        sink.persist(&record).await.unwrap();

        let data_path = sink.base_path.join("1700000000123_0.pcm");
        assert!(data_path.exists());
        assert_eq!(std::fs::read(&data_path).unwrap(), vec![0xAA, 0xBB, 0xCC]);

        let meta_path = sink.base_path.join("1700000000123_0.meta.json");
        let meta: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&meta_path).unwrap()).unwrap();
        assert_eq!(meta["timestamp_ms"], 1700000000123i64);
        assert_eq!(meta["format_code"], 0x0001);
        assert_eq!(meta["sample_bytes"], 3);
    }

    #[tokio::test]
    async fn test_equal_timestamps_do_not_collide() {
        let (sink, _temp_dir) = create_test_sink();
        sink.initialize().await.unwrap();

        sink.persist(&test_record(42)).await.unwrap();
        sink.persist(&test_record(42)).await.unwrap();

        assert!(sink.base_path.join("42_0.pcm").exists());
        assert!(sink.base_path.join("42_1.pcm").exists());
    }

    #[tokio::test]
    async fn test_health_check() {
        let (sink, _temp_dir) = create_test_sink();
        sink.initialize().await.unwrap();

        let result = sink.health_check().await;
        assert!(result.is_ok());
        assert!(result.unwrap());
    }
}
