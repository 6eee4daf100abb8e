//! RESP2 reply frames.
//!
//! `Frame` is used to encode replies (and the client's own request
//! encoding). Incoming server-side requests are decoded directly into
//! argument vectors by [`crate::codec`], since the request grammar is
//! restricted to arrays of bulk strings — see `spec.md` §4.1. The general
//! [`decode`] function below, by contrast, parses any RESP2 value and is
//! used by [`crate::clients::Client`] to read whatever reply shape the
//! server sends back.
use bytes::{Buf, Bytes, BytesMut};

use crate::{Error, Result};

/// A RESP2 reply value.
///
/// See: <https://redis.io/docs/latest/develop/reference/protocol-spec/>
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    SimpleString(String),
    SimpleError(String),
    Integer(i64),
    BulkString(Bytes),
    NullBulkString,
    Array(Vec<Frame>),
    NullArray,
}

impl Frame {
    pub fn array() -> Self {
        Frame::Array(vec![])
    }

    pub fn bulk(bytes: impl Into<Bytes>) -> Self {
        Frame::BulkString(bytes.into())
    }

    pub fn ok() -> Self {
        Frame::SimpleString("OK".to_string())
    }
}

/// Decode a single full RESP2 value (any of the five reply types, or a null
/// bulk/array) from the front of `buf`. Restartable: returns `Ok(None)` and
/// leaves `buf` untouched if it doesn't yet hold a whole value.
pub fn decode(buf: &mut BytesMut) -> Result<Option<Frame>> {
    let Some(consumed) = check(buf, 0)? else {
        return Ok(None);
    };
    let mut cursor = &buf[..consumed];
    let frame = parse(&mut cursor)?;
    buf.advance(consumed);
    Ok(Some(frame))
}

fn check(buf: &[u8], pos: usize) -> Result<Option<usize>> {
    let Some(&tag) = buf.get(pos) else {
        return Ok(None);
    };
    match tag {
        b'+' | b'-' => match find_crlf(buf, pos + 1) {
            Some(end) => Ok(Some(end + 2)),
            None => Ok(None),
        },
        b':' => match find_crlf(buf, pos + 1) {
            Some(end) => Ok(Some(end + 2)),
            None => Ok(None),
        },
        b'$' => {
            let Some(len_end) = find_crlf(buf, pos + 1) else {
                return Ok(None);
            };
            let len: i64 = atoi::atoi(&buf[pos + 1..len_end]).ok_or(Error::Protocol("invalid bulk length".into()))?;
            if len < 0 {
                return Ok(Some(len_end + 2));
            }
            let payload_end = len_end + 2 + len as usize;
            let end = payload_end + 2;
            if buf.len() < end {
                return Ok(None);
            }
            Ok(Some(end))
        }
        b'*' => {
            let Some(len_end) = find_crlf(buf, pos + 1) else {
                return Ok(None);
            };
            let len: i64 = atoi::atoi(&buf[pos + 1..len_end]).ok_or(Error::Protocol("invalid array length".into()))?;
            let mut cur = len_end + 2;
            if len < 0 {
                return Ok(Some(cur));
            }
            for _ in 0..len {
                match check(buf, cur)? {
                    Some(next) => cur = next,
                    None => return Ok(None),
                }
            }
            Ok(Some(cur))
        }
        other => Err(Error::Protocol(format!("unknown frame tag `{}`", other as char))),
    }
}

fn parse(buf: &mut &[u8]) -> Result<Frame> {
    let tag = buf[0];
    *buf = &buf[1..];
    match tag {
        b'+' => {
            let (line, rest) = split_line(buf)?;
            *buf = rest;
            Ok(Frame::SimpleString(String::from_utf8(line.to_vec())?))
        }
        b'-' => {
            let (line, rest) = split_line(buf)?;
            *buf = rest;
            Ok(Frame::SimpleError(String::from_utf8(line.to_vec())?))
        }
        b':' => {
            let (line, rest) = split_line(buf)?;
            *buf = rest;
            let n: i64 = atoi::atoi(line).ok_or(Error::Protocol("invalid integer".into()))?;
            Ok(Frame::Integer(n))
        }
        b'$' => {
            let (len_line, rest) = split_line(buf)?;
            let len: i64 = atoi::atoi(len_line).ok_or(Error::Protocol("invalid bulk length".into()))?;
            if len < 0 {
                *buf = rest;
                return Ok(Frame::NullBulkString);
            }
            let len = len as usize;
            let data = Bytes::copy_from_slice(&rest[..len]);
            *buf = &rest[len + 2..];
            Ok(Frame::BulkString(data))
        }
        b'*' => {
            let (len_line, rest) = split_line(buf)?;
            let len: i64 = atoi::atoi(len_line).ok_or(Error::Protocol("invalid array length".into()))?;
            *buf = rest;
            if len < 0 {
                return Ok(Frame::NullArray);
            }
            let mut items = Vec::with_capacity(len as usize);
            for _ in 0..len {
                items.push(parse(buf)?);
            }
            Ok(Frame::Array(items))
        }
        other => Err(Error::Protocol(format!("unknown frame tag `{}`", other as char))),
    }
}

fn find_crlf(buf: &[u8], start: usize) -> Option<usize> {
    if start > buf.len() {
        return None;
    }
    buf[start..].windows(2).position(|w| w == b"\r\n").map(|i| start + i)
}

fn split_line(buf: &[u8]) -> Result<(&[u8], &[u8])> {
    let idx = buf.windows(2).position(|w| w == b"\r\n").ok_or(Error::IncompleteFrame)?;
    Ok((&buf[..idx], &buf[idx + 2..]))
}

impl std::fmt::Display for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Frame::SimpleString(s) => write!(f, "{s}"),
            Frame::SimpleError(s) => write!(f, "(error) {s}"),
            Frame::Integer(n) => write!(f, "{n}"),
            Frame::BulkString(b) => write!(f, "{:?}", String::from_utf8_lossy(b)),
            Frame::NullBulkString | Frame::NullArray => write!(f, "(nil)"),
            Frame::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
        }
    }
}
