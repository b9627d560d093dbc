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

// In-memory sink for tests and diagnostics

use super::backend::{PersistenceSink, PersistError};
use crate::protocol::SoundRecord;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// Sink that keeps every record in memory. Not durable; intended for
/// integration tests and local diagnostics. `set_failing` makes subsequent
/// persists fail, for exercising failure isolation.
#[derive(Default)]
pub struct MemorySink {
    records: Mutex<Vec<SoundRecord>>,
    failing: AtomicBool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Snapshot of everything persisted so far, in arrival order.
    pub fn records(&self) -> Vec<SoundRecord> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl PersistenceSink for MemorySink {
    async fn initialize(&self) -> Result<(), PersistError> {
        Ok(())
    }

    async fn persist(&self, record: &SoundRecord) -> Result<(), PersistError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(PersistError::Rejected("memory sink set to fail".into()));
        }
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }

    async fn health_check(&self) -> Result<bool, PersistError> {
        Ok(!self.failing.load(Ordering::SeqCst))
    }

    fn sink_type(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::AudioFormat;
    use bytes::Bytes;

    fn record(timestamp: i64) -> SoundRecord {
        SoundRecord::new(timestamp, AudioFormat::Pcm8000_8MonoLe, Bytes::from_static(&[1]))
    }

    #[tokio::test]
    async fn stores_records_in_arrival_order() {
        let sink = MemorySink::new();
        sink.persist(&record(1)).await.unwrap();
        sink.persist(&record(2)).await.unwrap();

        let stored = sink.records();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].timestamp, 1);
        assert_eq!(stored[1].timestamp, 2);
    }

    #[tokio::test]
    async fn failure_injection_rejects_persists() {
        let sink = MemorySink::new();
        sink.set_failing(true);
        assert!(sink.persist(&record(1)).await.is_err());
        assert!(!sink.health_check().await.unwrap());

        sink.set_failing(false);
        assert!(sink.persist(&record(2)).await.is_ok());
        assert_eq!(sink.records().len(), 1);
    }
}
