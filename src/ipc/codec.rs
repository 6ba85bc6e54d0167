//! NDJSON codec for the listener record stream.
//!
//! Wraps [`tokio_util::codec::LinesCodec`] with a maximum line length. An
//! oversized line or a line that is not UTF-8 is skipped rather than surfaced
//! as an error, so one garbled record cannot terminate the stream. A trailing
//! partial line stays buffered until its newline arrives.

use std::io::ErrorKind;

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder, LinesCodec, LinesCodecError};
use tracing::debug;

use crate::{AppError, Result};

/// Maximum accepted record length: 1 MiB.
pub const MAX_LINE_BYTES: usize = 1_048_576;

/// Newline-delimited UTF-8 framing for listener records.
#[derive(Debug)]
pub struct RecordCodec(LinesCodec);

impl RecordCodec {
    /// Create a codec with the default [`MAX_LINE_BYTES`] limit.
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_length(MAX_LINE_BYTES)
    }

    /// Create a codec with a custom line limit.
    #[must_use]
    pub fn with_max_length(max: usize) -> Self {
        Self(LinesCodec::new_with_max_length(max))
    }
}

impl Default for RecordCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for RecordCodec {
    type Item = String;
    type Error = AppError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        loop {
            match self.0.decode(src) {
                // The inner codec is now discarding up to the next newline.
                Err(LinesCodecError::MaxLineLengthExceeded) => {
                    debug!("dropping oversized listener record");
                }
                // The offending line has already been consumed.
                Err(LinesCodecError::Io(err)) if err.kind() == ErrorKind::InvalidData => {
                    debug!(%err, "dropping non-UTF-8 listener record");
                }
                other => return other.map_err(map_codec_error),
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        loop {
            match self.0.decode_eof(src) {
                Err(LinesCodecError::MaxLineLengthExceeded) => {
                    debug!("dropping oversized listener record");
                }
                Err(LinesCodecError::Io(err)) if err.kind() == ErrorKind::InvalidData => {
                    debug!(%err, "dropping non-UTF-8 listener record");
                }
                other => return other.map_err(map_codec_error),
            }
        }
    }
}

impl Encoder<String> for RecordCodec {
    type Error = AppError;

    fn encode(&mut self, item: String, dst: &mut BytesMut) -> Result<()> {
        self.0.encode(item, dst).map_err(map_codec_error)
    }
}

fn map_codec_error(e: LinesCodecError) -> AppError {
    match e {
        LinesCodecError::MaxLineLengthExceeded => {
            AppError::Ipc(format!("line too long: exceeded {MAX_LINE_BYTES} bytes"))
        }
        LinesCodecError::Io(io_err) => AppError::Io(io_err.to_string()),
    }
}
