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

// Client scheduler: capture-and-send on a fixed period.
//
// Every `capture_period` a worker is dispatched to record one snippet and
// send it on the shared connection. Captures block for `capture_length`,
// so with length > period several workers run at once; the pool is bounded
// and all sends go through one mutex-guarded write half, which keeps whole
// frames from interleaving on the wire.
//
// There is no retry and no reconnect. The first unrecoverable error
// (encoding overflow, ack failure, connection drop) stops the run loop.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex, Semaphore};
use tracing::{info, warn};

use crate::capture::CaptureSource;
use crate::config::ClientSettings;
use crate::framing;
use crate::protocol::{AudioFormat, RecordMessage};

/// Runtime scheduling options, decoupled from the serde config types so
/// tests can drive sub-second periods.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub capture_period: Duration,
    pub capture_length: Duration,
    pub workers: usize,
    pub format: AudioFormat,
}

impl ClientOptions {
    pub fn from_settings(settings: &ClientSettings) -> Self {
        Self {
            capture_period: settings.capture_period(),
            capture_length: settings.capture_length(),
            workers: settings.workers,
            format: settings.format,
        }
    }
}

/// Periodic capture client bound to one outbound connection.
pub struct CaptureClient {
    options: ClientOptions,
    magic: u16,
    source: Arc<dyn CaptureSource>,
    reader: OwnedReadHalf,
    writer: Arc<Mutex<OwnedWriteHalf>>,
}

impl CaptureClient {
    pub async fn connect(
        addr: &str,
        magic: u16,
        options: ClientOptions,
        source: Arc<dyn CaptureSource>,
    ) -> Result<Self> {
        let stream = TcpStream::connect(addr)
            .await
            .with_context(|| format!("Failed to connect to {}", addr))?;
        info!("Connected to {}", addr);

        let (reader, writer) = stream.into_split();
        Ok(Self {
            options,
            magic,
            source,
            reader,
            writer: Arc::new(Mutex::new(writer)),
        })
    }

    /// Drive the capture schedule until a fatal error occurs. Never returns
    /// `Ok`; the only termination path is an unrecoverable failure, which
    /// the binary turns into process exit.
    pub async fn run(self) -> Result<()> {
        let (fatal_tx, mut fatal_rx) = mpsc::channel::<anyhow::Error>(1);

        // Acks arrive independently of the send schedule; consume them off
        // the read half for as long as the connection lives.
        let mut reader = self.reader;
        let ack_magic = self.magic;
        let ack_fatal = fatal_tx.clone();
        tokio::spawn(async move {
            loop {
                match framing::read_ack(&mut reader, ack_magic).await {
                    Ok(Some(ack)) => {
                        info!("Server acked record with timestamp {}", ack.timestamp);
                    }
                    Ok(None) => {
                        let _ = ack_fatal
                            .send(anyhow!("server closed the connection"))
                            .await;
                        break;
                    }
                    Err(e) => {
                        let _ = ack_fatal
                            .send(anyhow::Error::new(e).context("reading ack frame"))
                            .await;
                        break;
                    }
                }
            }
        });

        let workers = Arc::new(Semaphore::new(self.options.workers));
        let mut ticker = tokio::time::interval(self.options.capture_period);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let permit = match workers.clone().try_acquire_owned() {
                        Ok(permit) => permit,
                        Err(_) => {
                            warn!(
                                "All {} capture workers busy, skipping this tick",
                                self.options.workers
                            );
                            continue;
                        }
                    };

                    let source = self.source.clone();
                    let writer = self.writer.clone();
                    let fatal = fatal_tx.clone();
                    let magic = self.magic;
                    let format = self.options.format;
                    let length = self.options.capture_length;

                    tokio::spawn(async move {
                        let _permit = permit;
                        if let Err(e) = capture_and_send(source, writer, magic, format, length).await {
                            let _ = fatal.send(e).await;
                        }
                    });
                }
                Some(err) = fatal_rx.recv() => {
                    return Err(err);
                }
            }
        }
    }
}

/// One scheduler invocation: blocking capture, wrap, serialized send.
async fn capture_and_send(
    source: Arc<dyn CaptureSource>,
    writer: Arc<Mutex<OwnedWriteHalf>>,
    magic: u16,
    format: AudioFormat,
    length: Duration,
) -> Result<()> {
    let record = tokio::task::spawn_blocking(move || source.capture(format, length))
        .await
        .context("capture worker panicked")?
        .context("audio capture failed")?;

    let msg = RecordMessage::new(magic, record);
    info!(
        "Sending record: timestamp {}, {} sample bytes",
        msg.record.timestamp,
        msg.record.sample_len()
    );

    // Hold the send lock for the whole frame; concurrent workers must not
    // interleave partial frames on the shared connection.
    let mut writer = writer.lock().await;
    framing::write_record(&mut *writer, &msg)
        .await
        .context("sending sound record")?;
    Ok(())
}
