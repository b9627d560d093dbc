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

// Record server: per-connection reader loop plus a persistence worker pool.
//
// Each connection alternates between waiting for a frame and processing
// the one just decoded: frame → ack → dispatch, as three distinct steps.
// The ack goes out before the record is handed to persistence, so a slow
// sink never stalls the client. Persistence jobs cross to the worker pool
// through a bounded queue; a full queue rejects the job with a warning
// rather than growing without bound or blocking the read path.
//
// One bad frame invalidates its whole connection - after a desync the
// length fields can't be trusted, so the connection is torn down and the
// failure logged. Other connections are unaffected.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use crossbeam::queue::ArrayQueue;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Notify;
use tracing::{error, info, warn};

use crate::config::ServerSettings;
use crate::framing;
use crate::protocol::{AckMessage, RecordMessage, SoundRecord};
use crate::storage::PersistenceSink;

/// A decoded record on its way to the sink.
struct PersistJob {
    record: SoundRecord,
    peer: SocketAddr,
}

/// TCP server accepting capture clients.
pub struct RecordServer {
    listener: TcpListener,
    magic: u16,
    settings: ServerSettings,
    sink: Arc<dyn PersistenceSink>,
}

impl RecordServer {
    pub async fn bind(
        addr: &str,
        magic: u16,
        settings: ServerSettings,
        sink: Arc<dyn PersistenceSink>,
    ) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind {}", addr))?;
        info!("Listening on {}", listener.local_addr()?);

        Ok(Self {
            listener,
            magic,
            settings,
            sink,
        })
    }

    /// Actual bound address; useful when binding port 0.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections until the task is cancelled.
    pub async fn run(self) -> Result<()> {
        let queue = Arc::new(ArrayQueue::<PersistJob>::new(self.settings.queue_capacity));
        let notify = Arc::new(Notify::new());

        for worker in 0..self.settings.persist_workers {
            let queue = queue.clone();
            let notify = notify.clone();
            let sink = self.sink.clone();
            tokio::spawn(persist_worker(worker, queue, notify, sink));
        }

        loop {
            let (stream, peer) = self
                .listener
                .accept()
                .await
                .context("Failed to accept connection")?;
            info!("Accepted connection from {}", peer);

            let queue = queue.clone();
            let notify = notify.clone();
            let magic = self.magic;
            tokio::spawn(async move {
                handle_connection(stream, peer, magic, queue, notify).await;
            });
        }
    }
}

/// Drain the persistence queue. Failures are logged and stay local to the
/// job; the worker keeps going.
async fn persist_worker(
    worker: usize,
    queue: Arc<ArrayQueue<PersistJob>>,
    notify: Arc<Notify>,
    sink: Arc<dyn PersistenceSink>,
) {
    loop {
        while let Some(job) = queue.pop() {
            if let Err(e) = sink.persist(&job.record).await {
                error!(
                    "Persist worker {} failed to store record with timestamp {} from {}: {:#}",
                    worker, job.record.timestamp, job.peer, e
                );
            }
        }
        notify.notified().await;
    }
}

/// Reader loop for one connection: framing, decode, ack, dispatch.
async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    magic: u16,
    queue: Arc<ArrayQueue<PersistJob>>,
    notify: Arc<Notify>,
) {
    let (mut reader, mut writer) = stream.into_split();
    loop {
        match framing::read_record(&mut reader, magic).await {
            Ok(Some(msg)) => {
                info!(
                    "Got record from {}: timestamp {}, {} sample bytes",
                    peer,
                    msg.record.timestamp,
                    msg.record.sample_len()
                );
                if !dispatch(&mut writer, msg, peer, &queue, &notify).await {
                    break;
                }
            }
            Ok(None) => {
                info!("Connection from {} closed", peer);
                break;
            }
            Err(e) => {
                error!(
                    "Protocol failure on connection from {}, closing: {:#}",
                    peer,
                    anyhow::Error::new(e)
                );
                break;
            }
        }
    }
}

/// Ack the record, then hand it to the persistence pool. Returns false when
/// the connection is no longer usable.
async fn dispatch(
    writer: &mut OwnedWriteHalf,
    msg: RecordMessage,
    peer: SocketAddr,
    queue: &ArrayQueue<PersistJob>,
    notify: &Notify,
) -> bool {
    // Ack first: the client must not wait on storage latency.
    let ack = AckMessage::for_record(&msg);
    if let Err(e) = framing::write_ack(writer, &ack).await {
        error!(
            "Failed to ack record for {}, closing: {:#}",
            peer,
            anyhow::Error::new(e)
        );
        return false;
    }

    let job = PersistJob {
        record: msg.record,
        peer,
    };
    if queue.push(job).is_err() {
        warn!(
            "Persistence queue full ({} jobs), dropping record from {}",
            queue.capacity(),
            peer
        );
    } else {
        notify.notify_one();
    }
    true
}
