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

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use sound_relay::config::{load_config_with_env, RelayConfig};
use sound_relay::server::RecordServer;
use sound_relay::storage::SinkFactory;

/// Sound relay server - receive captured audio records, ack them, and
/// persist them off the read path
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Load configuration from file, or run on defaults
    let relay_config = match &args.config {
        Some(path) => load_config_with_env(path)?,
        None => RelayConfig::default(),
    };

    // Initialize tracing with configured level
    let log_level = match relay_config.logging.level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting sound relay server");
    info!("Persistence sink: {}", relay_config.storage.backend);

    // Create and prepare the persistence sink
    let sink = SinkFactory::create(&relay_config.storage)?;
    sink.initialize().await?;
    if !sink.health_check().await? {
        warn!("Persistence sink '{}' failed its health check", sink.sink_type());
    }

    let server = RecordServer::bind(
        &relay_config.network.addr(),
        relay_config.network.magic,
        relay_config.server.clone(),
        sink,
    )
    .await?;

    // Serve until Ctrl+C
    tokio::select! {
        result = server.run() => {
            if let Err(e) = result {
                tracing::error!("Server error: {:#}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    info!("Sound relay server shut down");
    Ok(())
}
