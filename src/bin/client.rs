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
use std::sync::Arc;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use sound_relay::capture::SilenceSource;
use sound_relay::client::{CaptureClient, ClientOptions};
use sound_relay::config::{load_config_with_env, RelayConfig};

/// Sound relay client - periodically capture audio snippets and ship them
/// to the relay server
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Seconds between capture starts (positive integer)
    recording_frequency: Option<String>,

    /// Seconds of audio captured per snippet (positive integer)
    recording_length: Option<String>,
}

/// Positional arguments that fail to parse fall back to the configured
/// default; only well-formed non-positive values are rejected later.
fn parse_seconds(raw: Option<&str>, default: i64) -> i64 {
    match raw {
        None => default,
        Some(value) => value.parse().unwrap_or(default),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Load configuration from file, or run on defaults
    let mut relay_config = match &args.config {
        Some(path) => load_config_with_env(path)?,
        None => RelayConfig::default(),
    };

    let frequency = parse_seconds(
        args.recording_frequency.as_deref(),
        relay_config.client.capture_period_seconds as i64,
    );
    let length = parse_seconds(
        args.recording_length.as_deref(),
        relay_config.client.capture_length_seconds as i64,
    );

    if frequency < 1 || length < 1 {
        println!("Wrong argument values: recording frequency and recording length need to be > 0");
        return Ok(());
    }

    relay_config.client.capture_period_seconds = frequency as u64;
    relay_config.client.capture_length_seconds = length as u64;

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

    info!("Starting sound relay client");
    info!(
        "Recording frequency {} seconds, recording length {} seconds",
        frequency, length
    );
    info!("Capture format: {:?}", relay_config.client.format);

    let options = ClientOptions::from_settings(&relay_config.client);
    let source = Arc::new(SilenceSource);

    let client = CaptureClient::connect(
        &relay_config.network.addr(),
        relay_config.network.magic,
        options,
        source,
    )
    .await?;

    // The run loop only ever returns on an unrecoverable failure; the
    // process-wide policy is to stop, not retry.
    if let Err(e) = client.run().await {
        error!("Fatal client error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}
