//! Redis Serialization Protocol (RESP) encoding and decoding.
//!
//! Clients always send requests as arrays of bulk strings. The server answers
//! with simple strings, errors, bulk strings and null bulk strings, plus one
//! special form used when a primary ships its snapshot to a replica: a bulk
//! string header followed by the raw payload with no trailing CRLF.
//!
//! Decoding never assumes that a buffer holds exactly one frame. Every decode
//! function returns `Ok(None)` while the frame is still incomplete and, once a
//! frame is complete, the number of bytes it occupied so the caller can keep
//! whatever follows for the next round.

use bytes::Bytes;
use thiserror::Error;

/// Largest element count accepted in a request array header.
pub const MAX_ARRAY_LEN: usize = 1024 * 1024;

/// Largest payload accepted in a single bulk string.
pub const MAX_BULK_LEN: usize = 512 * 1024 * 1024;

const CRLF: &[u8] = b"\r\n";

// usize::MAX has 20 decimal digits
const MAX_LENGTH_DIGITS: usize = 20;

/// Malformed input. Always fatal to the connection it was read from.
#[derive(Error, Debug, PartialEq, Clone)]
pub enum RespError {
    #[error("expected '*', got {0:?}")]
    ExpectedArray(char),
    #[error("expected '$', got {0:?}")]
    ExpectedBulkString(char),
    #[error("invalid length header")]
    InvalidLength,
    #[error("bulk string length mismatch")]
    LengthMismatch,
    #[error("unexpected reply type {0:?}")]
    UnexpectedReplyType(char),
}

impl RespError {
    /// The error reply sent to a peer right before its connection is closed.
    pub fn as_resp(&self) -> RespValue {
        RespValue::Error(format!("ERR Protocol error: {}", self))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RespValue {
    SimpleString(Bytes),
    Error(String),
    BulkString(Bytes),
    NullBulkString,
    Array(Vec<RespValue>),
    /// Snapshot transfer: bulk string header, raw bytes, no trailing CRLF.
    RawBytes(Bytes),
}

impl RespValue {
    pub fn ok() -> Self {
        RespValue::SimpleString(Bytes::from_static(b"OK"))
    }

    /// Text echoed back to a client. Simple strings cannot carry CR or LF, so
    /// such payloads are sent as a bulk string to keep the reply one frame.
    pub fn echoed(text: Bytes) -> Self {
        if text.iter().any(|&b| b == b'\r' || b == b'\n') {
            RespValue::BulkString(text)
        } else {
            RespValue::SimpleString(text)
        }
    }

    /// Builds a request frame (an array of bulk strings) from its tokens.
    pub fn command(parts: &[&str]) -> Self {
        RespValue::Array(
            parts
                .iter()
                .map(|part| RespValue::BulkString(Bytes::copy_from_slice(part.as_bytes())))
                .collect(),
        )
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.encode_into(&mut out);
        out
    }

    fn encode_into(&self, out: &mut Vec<u8>) {
        match self {
            RespValue::SimpleString(text) => {
                out.push(b'+');
                out.extend_from_slice(text);
                out.extend_from_slice(CRLF);
            }
            RespValue::Error(message) => {
                out.push(b'-');
                out.extend_from_slice(message.as_bytes());
                out.extend_from_slice(CRLF);
            }
            RespValue::BulkString(data) => {
                out.extend_from_slice(format!("${}\r\n", data.len()).as_bytes());
                out.extend_from_slice(data);
                out.extend_from_slice(CRLF);
            }
            RespValue::NullBulkString => out.extend_from_slice(b"$-1\r\n"),
            RespValue::Array(elements) => {
                out.extend_from_slice(format!("*{}\r\n", elements.len()).as_bytes());
                for element in elements {
                    element.encode_into(out);
                }
            }
            RespValue::RawBytes(data) => {
                out.extend_from_slice(format!("${}\r\n", data.len()).as_bytes());
                out.extend_from_slice(data);
            }
        }
    }
}

/// Decodes one request frame from the front of `buffer`.
///
/// # Returns
///
/// * `Ok(Some((parts, consumed)))` - A complete command and the bytes it used
/// * `Ok(None)` - The frame is not complete yet, read more and try again
/// * `Err(RespError)` - The input can never become a valid request
pub fn decode_command(buffer: &[u8]) -> Result<Option<(Vec<Bytes>, usize)>, RespError> {
    let Some(&first) = buffer.first() else {
        return Ok(None);
    };

    if first != b'*' {
        return Err(RespError::ExpectedArray(char::from(first)));
    }

    let Some((count, mut position)) = read_length(buffer, 1, MAX_ARRAY_LEN)? else {
        return Ok(None);
    };

    let mut parts = Vec::with_capacity(count.min(16));

    for _ in 0..count {
        let Some(&marker) = buffer.get(position) else {
            return Ok(None);
        };

        if marker != b'$' {
            return Err(RespError::ExpectedBulkString(char::from(marker)));
        }

        let Some((length, start)) = read_length(buffer, position + 1, MAX_BULK_LEN)? else {
            return Ok(None);
        };

        let end = start + length;

        if buffer.len() < end + CRLF.len() {
            return Ok(None);
        }

        if &buffer[end..end + CRLF.len()] != CRLF {
            return Err(RespError::LengthMismatch);
        }

        parts.push(Bytes::copy_from_slice(&buffer[start..end]));
        position = end + CRLF.len();
    }

    Ok(Some((parts, position)))
}

/// Decodes one reply frame (`+`, `-` or `$`) from the front of `buffer`.
pub fn decode_reply(buffer: &[u8]) -> Result<Option<(RespValue, usize)>, RespError> {
    let Some(&first) = buffer.first() else {
        return Ok(None);
    };

    match first {
        b'+' | b'-' => {
            let Some(end) = find_crlf(buffer, 1) else {
                return Ok(None);
            };

            let line = &buffer[1..end];
            let value = if first == b'+' {
                RespValue::SimpleString(Bytes::copy_from_slice(line))
            } else {
                RespValue::Error(String::from_utf8_lossy(line).into_owned())
            };

            Ok(Some((value, end + CRLF.len())))
        }
        b'$' => {
            let Some(end) = find_crlf(buffer, 1) else {
                return Ok(None);
            };

            if &buffer[1..end] == b"-1" {
                return Ok(Some((RespValue::NullBulkString, end + CRLF.len())));
            }

            let length = parse_length(&buffer[1..end], MAX_BULK_LEN)?;
            let start = end + CRLF.len();
            let stop = start + length;

            if buffer.len() < stop + CRLF.len() {
                return Ok(None);
            }

            if &buffer[stop..stop + CRLF.len()] != CRLF {
                return Err(RespError::LengthMismatch);
            }

            Ok(Some((
                RespValue::BulkString(Bytes::copy_from_slice(&buffer[start..stop])),
                stop + CRLF.len(),
            )))
        }
        other => Err(RespError::UnexpectedReplyType(char::from(other))),
    }
}

/// Decodes a snapshot transfer (`$<len>\r\n<len raw bytes>`) from the front of `buffer`.
pub fn decode_snapshot(buffer: &[u8]) -> Result<Option<(Bytes, usize)>, RespError> {
    let Some(&first) = buffer.first() else {
        return Ok(None);
    };

    if first != b'$' {
        return Err(RespError::ExpectedBulkString(char::from(first)));
    }

    let Some((length, start)) = read_length(buffer, 1, MAX_BULK_LEN)? else {
        return Ok(None);
    };

    if buffer.len() < start + length {
        return Ok(None);
    }

    Ok(Some((
        Bytes::copy_from_slice(&buffer[start..start + length]),
        start + length,
    )))
}

/// Reads the unsigned length that starts at `from` and runs up to the next CRLF.
///
/// Returns the length and the offset of the first byte after the CRLF.
fn read_length(
    buffer: &[u8],
    from: usize,
    max: usize,
) -> Result<Option<(usize, usize)>, RespError> {
    match find_crlf(buffer, from) {
        Some(end) => Ok(Some((parse_length(&buffer[from..end], max)?, end + CRLF.len()))),
        None => {
            let pending = &buffer[from.min(buffer.len())..];
            let pending = pending.strip_suffix(b"\r").unwrap_or(pending);

            if pending.len() > MAX_LENGTH_DIGITS || !pending.iter().all(u8::is_ascii_digit) {
                return Err(RespError::InvalidLength);
            }

            Ok(None)
        }
    }
}

fn parse_length(digits: &[u8], max: usize) -> Result<usize, RespError> {
    if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
        return Err(RespError::InvalidLength);
    }

    let length = std::str::from_utf8(digits)
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .ok_or(RespError::InvalidLength)?;

    if length > max {
        return Err(RespError::InvalidLength);
    }

    Ok(length)
}

fn find_crlf(buffer: &[u8], from: usize) -> Option<usize> {
    buffer
        .get(from..)?
        .windows(CRLF.len())
        .position(|window| window == CRLF)
        .map(|index| from + index)
}
