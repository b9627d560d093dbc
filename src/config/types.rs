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

// Configuration types for sound-relay

use crate::protocol::{AudioFormat, DEFAULT_MAGIC};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RelayConfig {
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub client: ClientSettings,
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            network: NetworkConfig::default(),
            client: ClientSettings::default(),
            server: ServerSettings::default(),
            storage: StorageConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Shared endpoint and protocol identity, used by both binaries
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NetworkConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Protocol magic, shared by both ends. Configured, not compiled in.
    #[serde(default = "default_magic")]
    pub magic: u16,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            magic: default_magic(),
        }
    }
}

impl NetworkConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Client capture scheduling settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClientSettings {
    /// Seconds between capture starts
    #[serde(default = "default_capture_period")]
    pub capture_period_seconds: u64,

    /// Seconds of audio recorded per snippet
    #[serde(default = "default_capture_length")]
    pub capture_length_seconds: u64,

    /// Concurrent capture workers
    #[serde(default = "default_capture_workers")]
    pub workers: usize,

    #[serde(default = "default_capture_format")]
    pub format: AudioFormat,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            capture_period_seconds: default_capture_period(),
            capture_length_seconds: default_capture_length(),
            workers: default_capture_workers(),
            format: default_capture_format(),
        }
    }
}

impl ClientSettings {
    pub fn capture_period(&self) -> Duration {
        Duration::from_secs(self.capture_period_seconds)
    }

    pub fn capture_length(&self) -> Duration {
        Duration::from_secs(self.capture_length_seconds)
    }
}

/// Server dispatch settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerSettings {
    /// Worker tasks draining the persistence queue
    #[serde(default = "default_persist_workers")]
    pub persist_workers: usize,

    /// Bound on queued persistence jobs; jobs past it are rejected
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            persist_workers: default_persist_workers(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

/// Storage configuration with sink selection
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Sink type: "filesystem", "memory"
    #[serde(default = "default_sink")]
    pub backend: String,

    #[serde(default)]
    pub filesystem: Option<FilesystemConfig>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_sink(),
            filesystem: Some(FilesystemConfig::default()),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FilesystemConfig {
    pub base_path: String,
}

impl Default for FilesystemConfig {
    fn default() -> Self {
        Self {
            base_path: "data/recordings".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String, // "trace", "debug", "info", "warn", "error"
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// Default value functions
fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    19000
}
fn default_magic() -> u16 {
    DEFAULT_MAGIC
}
fn default_capture_period() -> u64 {
    2
}
fn default_capture_length() -> u64 {
    4
}
fn default_capture_workers() -> usize {
    10
}
fn default_capture_format() -> AudioFormat {
    AudioFormat::Pcm8000_8MonoLe
}
fn default_persist_workers() -> usize {
    4
}
fn default_queue_capacity() -> usize {
    1000
}
fn default_log_level() -> String {
    "info".to_string()
}
