//! NDJSON codec for JSON-RPC over stdio.
//!
//! Wraps [`tokio_util::codec::LinesCodec`] with a maximum line length so an
//! unterminated or oversized message from a misbehaving agent cannot exhaust
//! memory.
//!
//! Inbound, the codec yields raw lines; JSON parsing happens in the reader
//! task so one malformed line can be skipped without ending the stream.
//! Outbound, it accepts [`serde_json::Value`] and writes one compact JSON
//! document per line.
//!
//! ```rust,ignore
//! use tokio_util::codec::FramedRead;
//! use agent_switchboard::acp::codec::AcpCodec;
//!
//! let reader = FramedRead::new(child_stdout, AcpCodec::new());
//! ```

use bytes::BytesMut;
use serde_json::Value;
use tokio_util::codec::{Decoder, Encoder, LinesCodec, LinesCodecError};

use crate::{AppError, Result};

/// Maximum inbound line length: 1 MiB.
///
/// A longer line is a framing error and ends the inbound stream.
pub const MAX_LINE_BYTES: usize = 1_048_576;

/// Line-delimited JSON codec for ACP agent pipes.
#[derive(Debug)]
pub struct AcpCodec(LinesCodec);

impl AcpCodec {
    /// Codec with the default [`MAX_LINE_BYTES`] limit.
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_length(MAX_LINE_BYTES)
    }

    /// Codec with a custom inbound line limit.
    #[must_use]
    pub fn with_max_length(max_length: usize) -> Self {
        Self(LinesCodec::new_with_max_length(max_length))
    }

    /// The configured inbound line limit.
    #[must_use]
    pub fn max_length(&self) -> usize {
        self.0.max_length()
    }
}

impl Default for AcpCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for AcpCodec {
    type Item = String;
    type Error = AppError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        let limit = self.max_length();
        self.0
            .decode(src)
            .map_err(|e| map_codec_error(e, limit))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        let limit = self.max_length();
        self.0
            .decode_eof(src)
            .map_err(|e| map_codec_error(e, limit))
    }
}

impl Encoder<Value> for AcpCodec {
    type Error = AppError;

    /// Serialise `item` as a single `\n`-terminated line.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Json`] if serialisation fails.
    fn encode(&mut self, item: Value, dst: &mut BytesMut) -> Result<()> {
        let line = serde_json::to_string(&item)?;
        // The length limit is decoder-side only.
        let limit = self.max_length();
        self.0
            .encode(line, dst)
            .map_err(|e| map_codec_error(e, limit))
    }
}

fn map_codec_error(e: LinesCodecError, limit: usize) -> AppError {
    match e {
        LinesCodecError::MaxLineLengthExceeded => {
            AppError::Acp(format!("line too long: exceeded {limit} bytes"))
        }
        LinesCodecError::Io(io_err) => AppError::Io(io_err.to_string()),
    }
}
