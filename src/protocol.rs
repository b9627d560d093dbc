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

// Wire data model and codec for the sound-relay protocol.
//
// Request frame (big-endian):
//   magic(2) | packet_size(2) | timestamp(8) | format(2) | samples(N)
// where packet_size = 10 + N and counts everything after the 4-byte header.
//
// Ack frame (big-endian, fixed 10 bytes):
//   magic(2) | timestamp(8)
//
// Encode/decode here is stateless and performs no I/O; framing lives in
// `crate::framing`.

use bytes::{BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Magic value both ends agree on unless configured otherwise.
pub const DEFAULT_MAGIC: u16 = 0x1234;

/// Fixed request header: magic(2) + packet_size(2).
pub const HEADER_LEN: usize = 4;

/// Bytes of a request body that are not samples: timestamp(8) + format(2).
pub const RECORD_OVERHEAD: usize = 10;

/// Largest sample payload that still fits the u16 packet_size field.
pub const MAX_SAMPLE_LEN: usize = u16::MAX as usize - RECORD_OVERHEAD;

/// Fixed ack frame length: magic(2) + timestamp(8).
pub const ACK_LEN: usize = 10;

/// Protocol violations and codec failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("sample payload of {samples} bytes overflows the u16 packet size field (max {MAX_SAMPLE_LEN})")]
    EncodingOverflow { samples: usize },

    #[error("frame truncated: expected {expected} bytes, got {got}")]
    TruncatedFrame { expected: usize, got: usize },

    #[error("bad magic: expected 0x{expected:04X}, found 0x{found:04X}")]
    BadMagic { expected: u16, found: u16 },

    #[error("unknown audio format code 0x{code:04X}")]
    UnknownFormat { code: u16 },
}

/// Closed set of audio sample layouts, identified on the wire by a u16 code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioFormat {
    Pcm8000_8MonoLe,
    Pcm16000_16MonoLe,
    Pcm44100_16StereoLe,
}

impl AudioFormat {
    /// Wire encoding of this format.
    pub fn code(self) -> u16 {
        match self {
            AudioFormat::Pcm8000_8MonoLe => 0x0001,
            AudioFormat::Pcm16000_16MonoLe => 0x0002,
            AudioFormat::Pcm44100_16StereoLe => 0x0010,
        }
    }

    /// Look up a format by its wire code. Unknown codes are a protocol
    /// violation, not a new variant.
    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            0x0001 => Some(AudioFormat::Pcm8000_8MonoLe),
            0x0002 => Some(AudioFormat::Pcm16000_16MonoLe),
            0x0010 => Some(AudioFormat::Pcm44100_16StereoLe),
            _ => None,
        }
    }

    /// Raw PCM byte rate: sample_rate * bytes_per_sample * channels.
    pub fn bytes_per_second(self) -> usize {
        match self {
            AudioFormat::Pcm8000_8MonoLe => 8000,
            AudioFormat::Pcm16000_16MonoLe => 16000 * 2,
            AudioFormat::Pcm44100_16StereoLe => 44100 * 2 * 2,
        }
    }
}

/// One captured audio snippet. Immutable once created by the capture source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoundRecord {
    /// Capture start, epoch milliseconds.
    pub timestamp: i64,
    pub format: AudioFormat,
    pub samples: Bytes,
}

impl SoundRecord {
    pub fn new(timestamp: i64, format: AudioFormat, samples: Bytes) -> Self {
        Self {
            timestamp,
            format,
            samples,
        }
    }

    pub fn sample_len(&self) -> usize {
        self.samples.len()
    }
}

/// A sound record wrapped for transmission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordMessage {
    pub magic: u16,
    pub record: SoundRecord,
}

impl RecordMessage {
    pub fn new(magic: u16, record: SoundRecord) -> Self {
        Self { magic, record }
    }

    /// Packet size field value. Always derived from the current sample
    /// length, never cached.
    pub fn packet_size(&self) -> Result<u16, ProtocolError> {
        let samples = self.record.sample_len();
        if samples > MAX_SAMPLE_LEN {
            return Err(ProtocolError::EncodingOverflow { samples });
        }
        Ok((RECORD_OVERHEAD + samples) as u16)
    }

    /// Serialize the full request frame, header included.
    pub fn encode(&self) -> Result<Bytes, ProtocolError> {
        let packet_size = self.packet_size()?;
        let mut buf = BytesMut::with_capacity(HEADER_LEN + packet_size as usize);
        buf.put_u16(self.magic);
        buf.put_u16(packet_size);
        buf.put_i64(self.record.timestamp);
        buf.put_u16(self.record.format.code());
        buf.put_slice(&self.record.samples);
        Ok(buf.freeze())
    }
}

/// Decoded request header, the fixed 4 bytes that delimit a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub magic: u16,
    pub packet_size: u16,
}

impl FrameHeader {
    pub fn decode(buf: [u8; HEADER_LEN]) -> Self {
        Self {
            magic: u16::from_be_bytes([buf[0], buf[1]]),
            packet_size: u16::from_be_bytes([buf[2], buf[3]]),
        }
    }

    /// Mismatched magic is rejected; the caller tears the connection down.
    pub fn expect_magic(&self, expected: u16) -> Result<(), ProtocolError> {
        if self.magic != expected {
            return Err(ProtocolError::BadMagic {
                expected,
                found: self.magic,
            });
        }
        Ok(())
    }

    /// Remaining frame bytes announced by this header.
    pub fn body_len(&self) -> usize {
        self.packet_size as usize
    }
}

/// Decode the body of a request frame (everything after the header).
pub fn decode_record_body(body: &[u8]) -> Result<SoundRecord, ProtocolError> {
    if body.len() < RECORD_OVERHEAD {
        return Err(ProtocolError::TruncatedFrame {
            expected: RECORD_OVERHEAD,
            got: body.len(),
        });
    }
    let timestamp = i64::from_be_bytes(body[0..8].try_into().unwrap());
    let code = u16::from_be_bytes([body[8], body[9]]);
    let format = AudioFormat::from_code(code).ok_or(ProtocolError::UnknownFormat { code })?;
    let samples = Bytes::copy_from_slice(&body[RECORD_OVERHEAD..]);
    Ok(SoundRecord::new(timestamp, format, samples))
}

/// Fixed-size acknowledgment echoing a request's magic and timestamp.
/// Carries no sample data, so its bytes never depend on payload content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AckMessage {
    pub magic: u16,
    pub timestamp: i64,
}

impl AckMessage {
    pub fn for_record(msg: &RecordMessage) -> Self {
        Self {
            magic: msg.magic,
            timestamp: msg.record.timestamp,
        }
    }

    pub fn encode(&self) -> [u8; ACK_LEN] {
        let mut buf = [0u8; ACK_LEN];
        buf[0..2].copy_from_slice(&self.magic.to_be_bytes());
        buf[2..10].copy_from_slice(&self.timestamp.to_be_bytes());
        buf
    }

    pub fn decode(buf: &[u8], expected_magic: u16) -> Result<Self, ProtocolError> {
        if buf.len() < ACK_LEN {
            return Err(ProtocolError::TruncatedFrame {
                expected: ACK_LEN,
                got: buf.len(),
            });
        }
        let magic = u16::from_be_bytes([buf[0], buf[1]]);
        if magic != expected_magic {
            return Err(ProtocolError::BadMagic {
                expected: expected_magic,
                found: magic,
            });
        }
        let timestamp = i64::from_be_bytes(buf[2..10].try_into().unwrap());
        Ok(Self { magic, timestamp })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vector_message() -> RecordMessage {
        let record = SoundRecord::new(
            123456789,
            AudioFormat::Pcm44100_16StereoLe,
            Bytes::from_static(&[0x01, 0x02, 0x03, 0x04]),
        );
        RecordMessage::new(DEFAULT_MAGIC, record)
    }

    #[test]
    fn encodes_reference_vector() {
        let encoded = vector_message().encode().unwrap();
        let expected: &[u8] = &[
            0x12, 0x34, 0x00, 0x0E, 0x00, 0x00, 0x00, 0x00, 0x07, 0x5B, 0xCD, 0x15, 0x00, 0x10,
            0x01, 0x02, 0x03, 0x04,
        ];
        assert_eq!(&encoded[..], expected);
    }

    #[test]
    fn length_law_holds() {
        for n in [0usize, 1, 100, 4096] {
            let record = SoundRecord::new(7, AudioFormat::Pcm8000_8MonoLe, vec![0xAB; n].into());
            let msg = RecordMessage::new(DEFAULT_MAGIC, record);
            assert_eq!(msg.packet_size().unwrap() as usize, n + RECORD_OVERHEAD);
            assert_eq!(msg.encode().unwrap().len(), n + RECORD_OVERHEAD + HEADER_LEN);
        }
    }

    #[test]
    fn overflow_law_is_exact() {
        let at_limit = SoundRecord::new(
            0,
            AudioFormat::Pcm8000_8MonoLe,
            vec![0u8; MAX_SAMPLE_LEN].into(),
        );
        assert!(RecordMessage::new(DEFAULT_MAGIC, at_limit).encode().is_ok());

        let over = SoundRecord::new(
            0,
            AudioFormat::Pcm8000_8MonoLe,
            vec![0u8; MAX_SAMPLE_LEN + 1].into(),
        );
        let err = RecordMessage::new(DEFAULT_MAGIC, over).encode().unwrap_err();
        assert_eq!(
            err,
            ProtocolError::EncodingOverflow {
                samples: MAX_SAMPLE_LEN + 1
            }
        );
    }

    #[test]
    fn ack_round_trips_from_record() {
        let msg = vector_message();
        let ack = AckMessage::for_record(&msg);
        let decoded = AckMessage::decode(&ack.encode(), DEFAULT_MAGIC).unwrap();
        assert_eq!(decoded.magic, msg.magic);
        assert_eq!(decoded.timestamp, msg.record.timestamp);
    }

    #[test]
    fn ack_reference_vector() {
        let ack = AckMessage::for_record(&vector_message());
        let expected: [u8; ACK_LEN] = [0x12, 0x34, 0x00, 0x00, 0x00, 0x00, 0x07, 0x5B, 0xCD, 0x15];
        assert_eq!(ack.encode(), expected);
    }

    #[test]
    fn ack_ignores_samples_and_format() {
        let a = RecordMessage::new(
            DEFAULT_MAGIC,
            SoundRecord::new(42, AudioFormat::Pcm8000_8MonoLe, vec![1, 2, 3].into()),
        );
        let b = RecordMessage::new(
            DEFAULT_MAGIC,
            SoundRecord::new(42, AudioFormat::Pcm44100_16StereoLe, vec![9; 1000].into()),
        );
        assert_eq!(
            AckMessage::for_record(&a).encode(),
            AckMessage::for_record(&b).encode()
        );
    }

    #[test]
    fn ack_decode_rejects_bad_magic() {
        let mut bytes = AckMessage::for_record(&vector_message()).encode();
        bytes[0] = 0xFF;
        let err = AckMessage::decode(&bytes, DEFAULT_MAGIC).unwrap_err();
        assert_eq!(
            err,
            ProtocolError::BadMagic {
                expected: DEFAULT_MAGIC,
                found: 0xFF34
            }
        );
    }

    #[test]
    fn ack_decode_rejects_short_frame() {
        let bytes = AckMessage::for_record(&vector_message()).encode();
        let err = AckMessage::decode(&bytes[..9], DEFAULT_MAGIC).unwrap_err();
        assert_eq!(
            err,
            ProtocolError::TruncatedFrame {
                expected: ACK_LEN,
                got: 9
            }
        );
    }

    #[test]
    fn record_body_round_trips() {
        let msg = vector_message();
        let encoded = msg.encode().unwrap();
        let record = decode_record_body(&encoded[HEADER_LEN..]).unwrap();
        assert_eq!(record, msg.record);
    }

    #[test]
    fn record_body_rejects_unknown_format() {
        let mut body = vec![0u8; RECORD_OVERHEAD];
        body[8] = 0xBE;
        body[9] = 0xEF;
        let err = decode_record_body(&body).unwrap_err();
        assert_eq!(err, ProtocolError::UnknownFormat { code: 0xBEEF });
    }

    #[test]
    fn header_decodes_and_checks_magic() {
        let header = FrameHeader::decode([0x12, 0x34, 0x00, 0x0E]);
        assert_eq!(header.magic, DEFAULT_MAGIC);
        assert_eq!(header.body_len(), 14);
        assert!(header.expect_magic(DEFAULT_MAGIC).is_ok());
        assert!(header.expect_magic(0x4321).is_err());
    }

    #[test]
    fn format_codes_are_stable() {
        for format in [
            AudioFormat::Pcm8000_8MonoLe,
            AudioFormat::Pcm16000_16MonoLe,
            AudioFormat::Pcm44100_16StereoLe,
        ] {
            assert_eq!(AudioFormat::from_code(format.code()), Some(format));
        }
        assert_eq!(AudioFormat::from_code(0x7777), None);
        assert_eq!(AudioFormat::Pcm44100_16StereoLe.code(), 0x0010);
    }
}
