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

// Frame delineation on a byte stream.
//
// A request frame is self-delimited by the packet_size field in its 4-byte
// header; an ack frame is a fixed 10 bytes. Reads buffer partial frames
// across I/O boundaries and only ever surface complete, decoded messages.
// A stream ending exactly between frames is a clean shutdown (`Ok(None)`);
// ending mid-frame is a `TruncatedFrame` violation.

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::protocol::{
    decode_record_body, AckMessage, FrameHeader, ProtocolError, RecordMessage, ACK_LEN, HEADER_LEN,
};

/// Failures while moving frames over a stream.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error("stream i/o failed")]
    Io(#[from] std::io::Error),
}

/// Fill `buf` completely, tolerating arbitrarily fragmented reads.
/// Returns the number of bytes actually read; short only at EOF.
async fn read_full<R>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize>
where
    R: AsyncRead + Unpin,
{
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

/// Read one complete request frame.
///
/// `Ok(None)` means the peer closed the stream at a frame boundary.
pub async fn read_record<R>(
    reader: &mut R,
    expected_magic: u16,
) -> Result<Option<RecordMessage>, TransportError>
where
    R: AsyncRead + Unpin,
{
    let mut header_buf = [0u8; HEADER_LEN];
    let got = read_full(reader, &mut header_buf).await?;
    if got == 0 {
        return Ok(None);
    }
    if got < HEADER_LEN {
        return Err(ProtocolError::TruncatedFrame {
            expected: HEADER_LEN,
            got,
        }
        .into());
    }

    let header = FrameHeader::decode(header_buf);
    header.expect_magic(expected_magic)?;

    let mut body = vec![0u8; header.body_len()];
    let got = read_full(reader, &mut body).await?;
    if got < body.len() {
        return Err(ProtocolError::TruncatedFrame {
            expected: body.len(),
            got,
        }
        .into());
    }

    let record = decode_record_body(&body)?;
    Ok(Some(RecordMessage::new(header.magic, record)))
}

/// Write one complete request frame and flush it.
pub async fn write_record<W>(writer: &mut W, msg: &RecordMessage) -> Result<(), TransportError>
where
    W: AsyncWrite + Unpin,
{
    let frame = msg.encode()?;
    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one fixed-length ack frame. `Ok(None)` on clean shutdown.
pub async fn read_ack<R>(
    reader: &mut R,
    expected_magic: u16,
) -> Result<Option<AckMessage>, TransportError>
where
    R: AsyncRead + Unpin,
{
    let mut buf = [0u8; ACK_LEN];
    let got = read_full(reader, &mut buf).await?;
    if got == 0 {
        return Ok(None);
    }
    if got < ACK_LEN {
        return Err(ProtocolError::TruncatedFrame {
            expected: ACK_LEN,
            got,
        }
        .into());
    }
    Ok(Some(AckMessage::decode(&buf, expected_magic)?))
}

/// Write one fixed-length ack frame and flush it.
pub async fn write_ack<W>(writer: &mut W, ack: &AckMessage) -> Result<(), TransportError>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(&ack.encode()).await?;
    writer.flush().await?;
    Ok(())
}
