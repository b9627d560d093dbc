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

// Persistence sink trait for received sound records

use async_trait::async_trait;
use thiserror::Error;

use crate::protocol::SoundRecord;

/// Failures local to a persistence attempt. They never propagate to the
/// connection that produced the record.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("sink i/o failed")]
    Io(#[from] std::io::Error),

    #[error("failed to serialize record metadata")]
    Metadata(#[from] serde_json::Error),

    #[error("sink rejected record: {0}")]
    Rejected(String),
}

/// Write-only destination for captured sound records.
///
/// Implementations must be safe for concurrent `persist` calls; the caller
/// gives no ordering guarantee across overlapping writes. Querying stored
/// records is not part of this trait.
#[async_trait]
pub trait PersistenceSink: Send + Sync {
    /// Prepare the sink (create directories, buckets, ...).
    async fn initialize(&self) -> Result<(), PersistError>;

    /// Durably store a single record.
    async fn persist(&self, record: &SoundRecord) -> Result<(), PersistError>;

    /// Probe whether the sink can currently accept writes.
    async fn health_check(&self) -> Result<bool, PersistError>;

    /// Sink type identifier
    fn sink_type(&self) -> &str;
}
