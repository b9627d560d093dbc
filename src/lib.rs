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

// Periodic audio capture relay over a custom length-framed TCP protocol.
//
// The client records bounded audio snippets on a fixed schedule and ships
// them to the server on one long-lived connection; the server acks each
// record before persisting it off the read path:
// - Big-endian binary frames with a derived packet-size field
// - Bounded capture worker pool with a single serialized sender
// - Per-connection reader loop, ack-before-persist dispatch
// - Pluggable persistence sinks behind a write-only trait

pub mod capture;
pub mod client;
pub mod config;
pub mod framing;
pub mod protocol;
pub mod server;
pub mod storage;

// Re-export main types
pub use capture::{CaptureError, CaptureSource, SilenceSource};
pub use client::{CaptureClient, ClientOptions};
pub use config::{load_config, load_config_with_env, ConfigLoader, RelayConfig};
pub use framing::TransportError;
pub use protocol::{
    AckMessage, AudioFormat, FrameHeader, ProtocolError, RecordMessage, SoundRecord,
};
pub use server::RecordServer;
pub use storage::{FilesystemSink, MemorySink, PersistenceSink, PersistError, SinkFactory};
