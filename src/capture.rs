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

// Capture source contract.
//
// Real microphone access lives outside this crate; the scheduler only
// depends on this trait. `capture` blocks for the full requested duration,
// so callers drive it from a blocking-friendly context.

use std::time::Duration;

use bytes::Bytes;
use thiserror::Error;

use crate::protocol::{AudioFormat, SoundRecord};

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("capture device unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("capture interrupted after {0:?}")]
    Interrupted(Duration),
}

/// Blocking source of audio snippets.
pub trait CaptureSource: Send + Sync {
    /// Record `duration` of audio in `format`. Blocks until the snippet is
    /// complete. The returned record's timestamp is the capture start in
    /// epoch milliseconds.
    fn capture(&self, format: AudioFormat, duration: Duration)
        -> Result<SoundRecord, CaptureError>;
}

/// Stand-in source that sleeps for the capture window and yields silence
/// sized by the format's byte rate. Useful wherever a microphone isn't.
#[derive(Debug, Default)]
pub struct SilenceSource;

impl CaptureSource for SilenceSource {
    fn capture(
        &self,
        format: AudioFormat,
        duration: Duration,
    ) -> Result<SoundRecord, CaptureError> {
        let started_at = chrono::Utc::now().timestamp_millis();
        std::thread::sleep(duration);
        let len = (format.bytes_per_second() as f64 * duration.as_secs_f64()) as usize;
        Ok(SoundRecord::new(started_at, format, Bytes::from(vec![0u8; len])))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silence_source_sizes_by_byte_rate() {
        let record = SilenceSource
            .capture(AudioFormat::Pcm8000_8MonoLe, Duration::from_millis(100))
            .unwrap();
        assert_eq!(record.sample_len(), 800);
        assert_eq!(record.format, AudioFormat::Pcm8000_8MonoLe);
        assert!(record.samples.iter().all(|b| *b == 0));
    }

    #[test]
    fn silence_source_blocks_for_duration() {
        let start = std::time::Instant::now();
        SilenceSource
            .capture(AudioFormat::Pcm8000_8MonoLe, Duration::from_millis(50))
            .unwrap();
        assert!(start.elapsed() >= Duration::from_millis(50));
    }
}
