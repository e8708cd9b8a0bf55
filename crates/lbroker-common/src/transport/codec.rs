use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::protocol::envelope::Frame;
use crate::protocol::error::{BrokerError, Result};

/// Flag bit set on every frame except the last one of a message.
pub const MORE: u8 = 0x01;

/// Maximum frame size (100 MB)
pub const MAX_FRAME_SIZE: usize = 100 * 1024 * 1024;

/// Maximum total size of all frames in one message (100 MB)
pub const MAX_MESSAGE_SIZE: usize = 100 * 1024 * 1024;

/// Maximum number of frames in one message
pub const MAX_FRAMES: usize = 1024;

/// Size of the per-frame header: one flag byte plus a u32 length.
pub const HEADER_SIZE: usize = 5;

/// Bounds applied to every message read from a peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageLimits {
    /// Largest single frame
    ///
    /// Default: 100 MB
    pub max_frame_size: usize,
    /// Largest sum of frame sizes in one message
    ///
    /// Default: 100 MB
    pub max_message_size: usize,
    /// Most frames in one message
    ///
    /// Default: 1024
    pub max_frames: usize,
}

impl Default for MessageLimits {
    fn default() -> Self {
        Self {
            max_frame_size: MAX_FRAME_SIZE,
            max_message_size: MAX_MESSAGE_SIZE,
            max_frames: MAX_FRAMES,
        }
    }
}

/// Codec for multi-frame messages.
///
/// # Wire Protocol
///
/// Each frame is written as a flag byte, a 4-byte big-endian length and the
/// frame bytes. The `MORE` flag links the frames of one message:
///
/// ```text
/// [MORE][len][client] [MORE][0] [0][len][HELLO]
/// ```
///
/// An empty frame is legal and is how envelopes mark their delimiter.
///
/// # Example
///
/// ```
/// use bytes::Bytes;
/// use lbroker_common::transport::FrameCodec;
///
/// # #[tokio::main]
/// # async fn main() -> lbroker_common::Result<()> {
/// let frames = vec![Bytes::new(), Bytes::from_static(b"HELLO")];
/// let encoded = FrameCodec::encode(&frames)?;
///
/// let decoded = FrameCodec::read_message(&mut encoded.as_slice()).await?;
/// assert_eq!(decoded, Some(frames));
/// # Ok(())
/// # }
/// ```
pub struct FrameCodec;

impl FrameCodec {
    /// Encodes a message into a single buffer.
    ///
    /// # Errors
    ///
    /// Returns an error if the message has no frames or breaks the default
    /// [`MessageLimits`].
    pub fn encode(frames: &[Frame]) -> Result<Vec<u8>> {
        if frames.is_empty() {
            return Err(BrokerError::InvalidFrame("message has no frames".to_string()));
        }
        if frames.len() > MAX_FRAMES {
            return Err(BrokerError::InvalidFrame(format!(
                "message has {} frames (max {})",
                frames.len(),
                MAX_FRAMES
            )));
        }

        let data: usize = frames.iter().map(|f| f.len()).sum();
        if data > MAX_MESSAGE_SIZE {
            return Err(BrokerError::FrameTooLarge {
                size: data,
                max: MAX_MESSAGE_SIZE,
            });
        }

        let mut buf = Vec::with_capacity(data + frames.len() * HEADER_SIZE);

        let last = frames.len() - 1;
        for (index, frame) in frames.iter().enumerate() {
            if frame.len() > MAX_FRAME_SIZE {
                return Err(BrokerError::FrameTooLarge {
                    size: frame.len(),
                    max: MAX_FRAME_SIZE,
                });
            }

            let flags = if index < last { MORE } else { 0 };
            buf.push(flags);
            buf.extend_from_slice(&(frame.len() as u32).to_be_bytes());
            buf.extend_from_slice(frame);
        }

        Ok(buf)
    }

    /// Writes one message and flushes the writer.
    pub async fn write_message<W>(writer: &mut W, frames: &[Frame]) -> Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        let encoded = Self::encode(frames)?;

        writer
            .write_all(&encoded)
            .await
            .map_err(|e| Self::map_io_error(e, "writing message"))?;

        // Flush to ensure data is sent
        writer
            .flush()
            .await
            .map_err(|e| Self::map_io_error(e, "flushing stream"))?;

        Ok(())
    }

    /// Reads one message with the default [`MessageLimits`].
    ///
    /// Returns `Ok(None)` when the peer closed the stream cleanly between two
    /// messages.
    pub async fn read_message<R>(reader: &mut R) -> Result<Option<Vec<Frame>>>
    where
        R: AsyncRead + Unpin,
    {
        Self::read_message_limited(reader, &MessageLimits::default()).await
    }

    /// Reads one message, enforcing `limits` before anything is allocated.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The stream ends in the middle of a message
    /// - A frame carries unknown flag bits
    /// - A frame, or the message as a whole, exceeds its size limit
    /// - The message has more frames than allowed
    pub async fn read_message_limited<R>(
        reader: &mut R,
        limits: &MessageLimits,
    ) -> Result<Option<Vec<Frame>>>
    where
        R: AsyncRead + Unpin,
    {
        let mut frames = Vec::new();
        let mut total = 0usize;

        loop {
            let flags = match reader.read_u8().await {
                Ok(flags) => flags,
                Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof && frames.is_empty() => {
                    return Ok(None);
                }
                Err(e) => return Err(Self::map_io_error(e, "reading frame flags")),
            };

            if flags & !MORE != 0 {
                return Err(BrokerError::InvalidFrame(format!(
                    "unknown flag bits 0x{:02x}",
                    flags
                )));
            }

            let len = reader
                .read_u32()
                .await
                .map_err(|e| Self::map_io_error(e, "reading frame length"))? as usize;

            if frames.len() >= limits.max_frames {
                return Err(BrokerError::InvalidFrame(format!(
                    "message exceeds {} frames",
                    limits.max_frames
                )));
            }

            // Validate lengths to prevent allocation of excessively large buffers
            if len > limits.max_frame_size {
                return Err(BrokerError::FrameTooLarge {
                    size: len,
                    max: limits.max_frame_size,
                });
            }
            total = total.saturating_add(len);
            if total > limits.max_message_size {
                return Err(BrokerError::FrameTooLarge {
                    size: total,
                    max: limits.max_message_size,
                });
            }

            let mut buf = vec![0u8; len];
            reader
                .read_exact(&mut buf)
                .await
                .map_err(|e| Self::map_io_error(e, "reading frame data"))?;
            frames.push(Bytes::from(buf));

            if flags & MORE == 0 {
                return Ok(Some(frames));
            }
        }
    }

    /// Map IO errors to appropriate BrokerError variants
    ///
    /// - Truncated streams and dropped connections -> `Connection`
    /// - Other IO errors -> `Io`
    fn map_io_error(err: std::io::Error, context: &str) -> BrokerError {
        match err.kind() {
            std::io::ErrorKind::UnexpectedEof => {
                BrokerError::Connection(format!("{}: stream ended mid-message", context))
            }
            std::io::ErrorKind::ConnectionReset
            | std::io::ErrorKind::ConnectionAborted
            | std::io::ErrorKind::BrokenPipe
            | std::io::ErrorKind::NotConnected => {
                BrokerError::Connection(format!("{}: Connection lost", context))
            }
            _ => BrokerError::Io(err),
        }
    }
}
