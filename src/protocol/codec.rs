//! Protocol codec
//!
//! Encoding and decoding functions for the wire protocol.
//!
//! ## Wire Format
//!
//! ### Request (Command) Format
//! ```text
//! ┌──────────────────┬─────────────────────┬──────┬────────────┐
//! │ <verb> <key>\r\n │ header lines (\r\n) │ \r\n │    body    │
//! └──────────────────┴─────────────────────┴──────┴────────────┘
//! ```
//!
//! ### Body Framing
//! - value ≤ 4096 bytes: raw bytes followed by `\r\n`
//! - value > 4096 bytes: `<size>\r\n<bytes>\r\n` records (decimal sizes,
//!   each ≤ 4096 bytes) terminated by `0\r\n\r\n`, announced by a
//!   `transfer-encoding: chunked` header line
//!
//! ### Response Format
//! ```text
//! ┌──────────────┬──────────────────────┬──────┐
//! │ <OK|Err>\r\n │ payload lines (\r\n) │ \r\n │
//! └──────────────┴──────────────────────┴──────┘
//! ```
//!
//! The decoder is stateful: bytes are appended with [`ResponseDecoder::feed`]
//! and complete responses drained with [`ResponseDecoder::try_decode`], so a
//! response split across any number of socket reads decodes identically to
//! one that arrives whole. Servers that close the connection instead of
//! sending a terminating blank line are handled by
//! [`ResponseDecoder::decode_eof`].

use bytes::{Buf, Bytes, BytesMut};

use crate::error::{ClientError, Result};
use super::{Command, Response, Status};

/// Chunking threshold: values longer than this are chunk-framed
pub const CHUNK_SIZE: usize = 4096;

/// Maximum accepted length of a single protocol line (8 KB)
pub const MAX_LINE_SIZE: usize = 8 * 1024;

/// Maximum assembled payload size (16 MB)
pub const MAX_PAYLOAD_SIZE: usize = 16 * 1024 * 1024;

const CRLF: &[u8] = b"\r\n";

// =============================================================================
// Command Encoding
// =============================================================================

/// Encode a command to wire bytes
///
/// Pure, no I/O. Malformed keys are rejected with `InvalidArgument` here,
/// before any bytes are produced or written.
pub fn encode_command(command: &Command) -> Result<Bytes> {
    validate_key(command.key())?;

    match command {
        Command::Get { key } => {
            let mut frame = BytesMut::with_capacity(key.len() + 8);
            frame.extend_from_slice(b"get ");
            frame.extend_from_slice(key.as_bytes());
            frame.extend_from_slice(CRLF);
            frame.extend_from_slice(CRLF);
            Ok(frame.freeze())
        }
        Command::Set {
            key,
            value,
            expire_secs,
        } => {
            let chunked = value.len() > CHUNK_SIZE;

            let mut frame = BytesMut::with_capacity(key.len() + value.len() + 64);
            frame.extend_from_slice(b"set ");
            frame.extend_from_slice(key.as_bytes());
            frame.extend_from_slice(CRLF);

            if let Some(secs) = expire_secs {
                frame.extend_from_slice(format!("duration: {}\r\n", secs).as_bytes());
            }
            if chunked {
                frame.extend_from_slice(b"transfer-encoding: chunked\r\n");
            }
            frame.extend_from_slice(CRLF);

            if chunked {
                for chunk in value.chunks(CHUNK_SIZE) {
                    frame.extend_from_slice(format!("{}\r\n", chunk.len()).as_bytes());
                    frame.extend_from_slice(chunk);
                    frame.extend_from_slice(CRLF);
                }
                frame.extend_from_slice(b"0\r\n\r\n");
            } else {
                frame.extend_from_slice(value);
                frame.extend_from_slice(CRLF);
            }

            Ok(frame.freeze())
        }
    }
}

/// Validate a key before encoding
///
/// Keys are single space-delimited tokens on the wire, so whitespace and
/// CR/LF would corrupt the framing.
pub fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(ClientError::InvalidArgument(
            "key must not be empty".to_string(),
        ));
    }
    if key.contains('\r') || key.contains('\n') {
        return Err(ClientError::InvalidArgument(
            "key must not contain CR or LF".to_string(),
        ));
    }
    if key.chars().any(char::is_whitespace) {
        return Err(ClientError::InvalidArgument(
            "key must not contain whitespace".to_string(),
        ));
    }
    Ok(())
}

// =============================================================================
// Response Decoding
// =============================================================================

/// Decoder state between calls
enum DecodeState {
    /// Waiting for the status line
    Status,

    /// Accumulating payload lines until the terminating blank line
    Lines {
        status: Status,
        lines: Vec<String>,
        payload_bytes: usize,
    },

    /// Saw the chunked header line; expecting the blank header terminator
    ChunkHeader { status: Status },

    /// Accumulating chunk records until the zero-size terminator
    Chunks { status: Status, value: BytesMut },
}

/// Outcome of attempting to consume one chunk record
enum ChunkProgress {
    NeedMore,
    Read,
    Done,
}

/// Streaming decoder for server responses
///
/// Owns the read buffer for one connection. Partial arrivals are retained
/// across calls; a `Protocol` error means the stream is no longer in a
/// decodable state and the session must be torn down.
pub struct ResponseDecoder {
    buffer: BytesMut,
    state: DecodeState,
}

impl ResponseDecoder {
    /// Create an empty decoder
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(CHUNK_SIZE),
            state: DecodeState::Status,
        }
    }

    /// Append raw bytes from the socket
    pub fn feed(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Try to decode one complete response from the buffered bytes
    ///
    /// Returns `Ok(None)` when more data is needed. Consumed bytes are
    /// dropped from the buffer; bytes belonging to a subsequent response
    /// are retained untouched.
    pub fn try_decode(&mut self) -> Result<Option<Response>> {
        loop {
            match &mut self.state {
                DecodeState::Status => {
                    let Some(line) = split_line(&mut self.buffer)? else {
                        return Ok(None);
                    };
                    let status = parse_status(&line)?;
                    self.state = DecodeState::Lines {
                        status,
                        lines: Vec::new(),
                        payload_bytes: 0,
                    };
                }
                DecodeState::Lines {
                    status,
                    lines,
                    payload_bytes,
                } => {
                    let Some(line) = split_line(&mut self.buffer)? else {
                        return Ok(None);
                    };

                    if *status == Status::Ok
                        && lines.is_empty()
                        && line.eq_ignore_ascii_case("transfer-encoding: chunked")
                    {
                        self.state = DecodeState::ChunkHeader { status: *status };
                        continue;
                    }

                    if line.is_empty() {
                        // The first blank payload line of an OK response is
                        // the get value marker, not the terminator.
                        if *status == Status::Ok && lines.is_empty() {
                            lines.push(line);
                            continue;
                        }
                        let response = Response::new(*status, std::mem::take(lines));
                        self.state = DecodeState::Status;
                        return Ok(Some(response));
                    }

                    *payload_bytes += line.len();
                    if *payload_bytes > MAX_PAYLOAD_SIZE {
                        return Err(ClientError::Protocol(format!(
                            "response payload exceeds {} bytes",
                            MAX_PAYLOAD_SIZE
                        )));
                    }
                    lines.push(line);
                }
                DecodeState::ChunkHeader { status } => {
                    let Some(line) = split_line(&mut self.buffer)? else {
                        return Ok(None);
                    };
                    if !line.is_empty() {
                        return Err(ClientError::Protocol(format!(
                            "expected blank line after chunked header, got {:?}",
                            line
                        )));
                    }
                    self.state = DecodeState::Chunks {
                        status: *status,
                        value: BytesMut::new(),
                    };
                }
                DecodeState::Chunks { status, value } => {
                    match take_chunk(&mut self.buffer, value)? {
                        ChunkProgress::NeedMore => return Ok(None),
                        ChunkProgress::Read => continue,
                        ChunkProgress::Done => {
                            let assembled = String::from_utf8_lossy(value).into_owned();
                            let response =
                                Response::new(*status, vec![String::new(), assembled]);
                            self.state = DecodeState::Status;
                            return Ok(Some(response));
                        }
                    }
                }
            }
        }
    }

    /// Finalize decoding at peer close
    ///
    /// Some servers terminate a response by closing the connection rather
    /// than sending a trailing blank line; the fully-terminated lines seen
    /// so far form the response. A partial line or an unterminated chunk
    /// sequence at close is a protocol violation.
    pub fn decode_eof(&mut self) -> Result<Option<Response>> {
        if let Some(response) = self.try_decode()? {
            return Ok(Some(response));
        }
        if !self.buffer.is_empty() {
            return Err(ClientError::Protocol(
                "connection closed mid-line".to_string(),
            ));
        }
        match std::mem::replace(&mut self.state, DecodeState::Status) {
            DecodeState::Status => Ok(None),
            DecodeState::Lines { status, lines, .. } => Ok(Some(Response::new(status, lines))),
            DecodeState::ChunkHeader { .. } | DecodeState::Chunks { .. } => {
                Err(ClientError::Protocol(
                    "connection closed inside chunked payload".to_string(),
                ))
            }
        }
    }
}

impl Default for ResponseDecoder {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Parsing helpers
// =============================================================================

/// Parse the status token, case-insensitively
fn parse_status(line: &str) -> Result<Status> {
    if line.eq_ignore_ascii_case("ok") {
        Ok(Status::Ok)
    } else if line.eq_ignore_ascii_case("err") {
        Ok(Status::Err)
    } else {
        Err(ClientError::Protocol(format!(
            "unrecognized status line: {:?}",
            line
        )))
    }
}

/// Split one CRLF-terminated line off the front of the buffer
///
/// Returns `Ok(None)` if no full line is buffered yet. Lone `\n` is not a
/// delimiter; legacy peers that use it are out of scope here.
fn split_line(buffer: &mut BytesMut) -> Result<Option<String>> {
    match find_crlf(buffer) {
        Some(pos) => {
            if pos > MAX_LINE_SIZE {
                return Err(ClientError::Protocol(format!(
                    "line exceeds {} bytes",
                    MAX_LINE_SIZE
                )));
            }
            let line = buffer.split_to(pos + 2);
            Ok(Some(String::from_utf8_lossy(&line[..pos]).into_owned()))
        }
        None => {
            if buffer.len() > MAX_LINE_SIZE {
                return Err(ClientError::Protocol(format!(
                    "line exceeds {} bytes",
                    MAX_LINE_SIZE
                )));
            }
            Ok(None)
        }
    }
}

/// Find the first CRLF in the buffer
fn find_crlf(buffer: &[u8]) -> Option<usize> {
    buffer.windows(2).position(|w| w == CRLF)
}

/// Consume one chunk record (or the terminator) off the front of the buffer
///
/// Chunk sizes are decimal. The record's trailing CRLF is mandatory;
/// anything else in its place means the stream is desynchronized.
fn take_chunk(buffer: &mut BytesMut, value: &mut BytesMut) -> Result<ChunkProgress> {
    let Some(pos) = find_crlf(buffer) else {
        if buffer.len() > MAX_LINE_SIZE {
            return Err(ClientError::Protocol(format!(
                "chunk size line exceeds {} bytes",
                MAX_LINE_SIZE
            )));
        }
        return Ok(ChunkProgress::NeedMore);
    };

    let size_text = String::from_utf8_lossy(&buffer[..pos]).into_owned();
    let size: usize = size_text.trim().parse().map_err(|_| {
        ClientError::Protocol(format!("invalid chunk size: {:?}", size_text))
    })?;

    if size == 0 {
        // Terminator is the zero-size record plus a blank line: 0\r\n\r\n
        if buffer.len() < pos + 4 {
            return Ok(ChunkProgress::NeedMore);
        }
        if &buffer[pos + 2..pos + 4] != CRLF {
            return Err(ClientError::Protocol(
                "malformed chunk terminator".to_string(),
            ));
        }
        buffer.advance(pos + 4);
        return Ok(ChunkProgress::Done);
    }

    if size > MAX_PAYLOAD_SIZE || value.len() + size > MAX_PAYLOAD_SIZE {
        return Err(ClientError::Protocol(format!(
            "chunked payload exceeds {} bytes",
            MAX_PAYLOAD_SIZE
        )));
    }

    let data_start = pos + 2;
    let record_end = data_start + size + 2;
    if buffer.len() < record_end {
        return Ok(ChunkProgress::NeedMore);
    }
    if &buffer[data_start + size..record_end] != CRLF {
        return Err(ClientError::Protocol(
            "chunk record missing trailing CRLF".to_string(),
        ));
    }

    value.extend_from_slice(&buffer[data_start..data_start + size]);
    buffer.advance(record_end);
    Ok(ChunkProgress::Read)
}
