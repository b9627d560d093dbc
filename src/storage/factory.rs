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

// Sink factory for creating persistence sinks from configuration

use super::backend::PersistenceSink;
use super::filesystem::FilesystemSink;
use super::memory::MemorySink;
use crate::config::StorageConfig;
use anyhow::{bail, Result};
use std::sync::Arc;

pub struct SinkFactory;

impl SinkFactory {
    /// Create a persistence sink from configuration
    pub fn create(config: &StorageConfig) -> Result<Arc<dyn PersistenceSink>> {
        match config.backend.as_str() {
            "filesystem" => {
                let sink_config = config
                    .filesystem
                    .clone()
                    .ok_or_else(|| anyhow::anyhow!("filesystem sink config missing"))?;

                let sink = FilesystemSink::new(sink_config)?;
                Ok(Arc::new(sink))
            }

            "memory" => Ok(Arc::new(MemorySink::new())),

            unknown => bail!(
                "Unknown persistence sink: '{}'. Supported: filesystem, memory",
                unknown
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FilesystemConfig;

    #[test]
    fn test_create_filesystem_sink() {
        let storage_config = StorageConfig {
            backend: "filesystem".to_string(),
            filesystem: Some(FilesystemConfig::default()),
        };

        let sink = SinkFactory::create(&storage_config);
        assert!(sink.is_ok());
        assert_eq!(sink.unwrap().sink_type(), "filesystem");
    }

    #[test]
    fn test_create_memory_sink() {
        let storage_config = StorageConfig {
            backend: "memory".to_string(),
            filesystem: None,
        };

        let sink = SinkFactory::create(&storage_config);
        assert!(sink.is_ok());
        assert_eq!(sink.unwrap().sink_type(), "memory");
    }

    #[test]
    fn test_create_unknown_sink() {
        let storage_config = StorageConfig {
            backend: "punchcards".to_string(),
            filesystem: None,
        };

        let sink = SinkFactory::create(&storage_config);
        assert!(sink.is_err());
        if let Err(e) = sink {
            assert!(e.to_string().contains("Unknown persistence sink"));
        }
    }

    #[test]
    fn test_filesystem_sink_requires_config() {
        let storage_config = StorageConfig {
            backend: "filesystem".to_string(),
            filesystem: None,
        };

        assert!(SinkFactory::create(&storage_config).is_err());
    }
}
