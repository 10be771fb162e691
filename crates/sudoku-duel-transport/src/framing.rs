//! Byte framing: one [`Message`] per `\n`-terminated line.
//!
//! [`FrameCodec`] wraps `tokio_util`'s [`LinesCodec`] and adds the protocol
//! codec on top, so a `FramedRead` yields `Message`s and a `FramedWrite`
//! accepts them. Everything that goes wrong with a single line (too long,
//! not UTF-8, not a known frame) becomes `Message::Malformed` instead of an
//! error, because `FramedRead` ends the stream after the first decoder
//! error and a bad line must not cost the connection.

use bytes::BytesMut;
use sudoku_duel_protocol::{Message, decode, encode};
use tokio_util::codec::{Decoder, Encoder, LinesCodec, LinesCodecError};

use crate::{ConnectionId, TransportError};

/// Line codec for protocol messages.
#[derive(Debug)]
pub struct FrameCodec {
    lines: LinesCodec,
    max_line_len: usize,
    /// `Some` when frame logging is enabled.
    log_as: Option<ConnectionId>,
}

impl FrameCodec {
    /// Creates a codec that rejects inbound lines longer than
    /// `max_line_len` bytes.
    pub fn new(max_line_len: usize) -> Self {
        Self {
            lines: LinesCodec::new_with_max_length(max_line_len),
            max_line_len,
            log_as: None,
        }
    }

    /// Logs every encoded and decoded line, tagged with `conn`.
    pub fn with_frame_log(mut self, conn: ConnectionId) -> Self {
        self.log_as = Some(conn);
        self
    }

    fn frame(
        &self,
        result: Result<Option<String>, LinesCodecError>,
    ) -> Result<Option<Message>, TransportError> {
        let line = match result {
            Ok(Some(line)) => line,
            Ok(None) => return Ok(None),
            Err(LinesCodecError::MaxLineLengthExceeded) => {
                return Ok(Some(Message::Malformed {
                    line: String::new(),
                    reason: format!(
                        "line exceeds {} bytes",
                        self.max_line_len
                    ),
                }));
            }
            Err(LinesCodecError::Io(e))
                if e.kind() == std::io::ErrorKind::InvalidData =>
            {
                return Ok(Some(Message::Malformed {
                    line: String::new(),
                    reason: "line is not valid UTF-8".to_string(),
                }));
            }
            Err(LinesCodecError::Io(e)) => return Err(e.into()),
        };

        if let Some(conn) = self.log_as {
            tracing::debug!(%conn, direction = "<", %line, "frame");
        }
        Ok(Some(decode(&line)))
    }
}

impl Decoder for FrameCodec {
    type Item = Message;
    type Error = TransportError;

    fn decode(
        &mut self,
        buf: &mut BytesMut,
    ) -> Result<Option<Message>, TransportError> {
        let result = self.lines.decode(buf);
        self.frame(result)
    }

    /// A final line without a terminator is still delivered.
    fn decode_eof(
        &mut self,
        buf: &mut BytesMut,
    ) -> Result<Option<Message>, TransportError> {
        let result = self.lines.decode_eof(buf);
        self.frame(result)
    }
}

impl Encoder<Message> for FrameCodec {
    type Error = TransportError;

    fn encode(
        &mut self,
        msg: Message,
        dst: &mut BytesMut,
    ) -> Result<(), TransportError> {
        let line = encode(&msg)?;
        if let Some(conn) = self.log_as {
            tracing::debug!(%conn, direction = ">", %line, "frame");
        }
        self.lines.encode(line, dst).map_err(|e| match e {
            LinesCodecError::Io(e) => TransportError::Io(e),
            other => TransportError::Io(std::io::Error::other(other)),
        })
    }
}
