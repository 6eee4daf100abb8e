//! RESP2 request decoding.
//!
//! A request frame is always an array of bulk strings (`spec.md` §4.1):
//!
//! ```text
//! frame := '*' int CRLF bulk{int}
//! bulk  := '$' int CRLF payload{int} CRLF
//!       |  '$' '-' '1' CRLF
//! ```
//!
//! [`decode`] is restartable: given fewer bytes than a whole frame, it
//! returns `Ok(None)` and leaves `buf` untouched so the caller can append
//! more bytes on the next read and retry. On success it advances `buf` past
//! exactly one frame. Numeric lengths are parsed directly off the byte
//! slice with `atoi`, no intermediate `String` allocation.
use bytes::{Buf, Bytes, BytesMut};

use crate::{Error, Result};

/// Decode at most one request frame from the front of `buf`.
///
/// Returns `Ok(None)` if `buf` does not yet contain a whole frame. Returns
/// `Err` if the leading byte isn't `*`, an array element isn't a bulk
/// string, or a declared length doesn't fit the available data plus a
/// sane upper bound.
pub fn decode(buf: &mut BytesMut) -> Result<Option<Vec<Bytes>>> {
    let Some(consumed) = check(buf)? else {
        return Ok(None);
    };

    let mut cursor = &buf[..consumed];
    let args = parse_array(&mut cursor)?;
    buf.advance(consumed);
    Ok(Some(args))
}

/// First pass: determine whether `buf` holds a complete frame, returning its
/// byte length without allocating the argument vector.
fn check(buf: &[u8]) -> Result<Option<usize>> {
    let mut pos = 0usize;
    if peek(buf, pos).is_none() {
        return Ok(None);
    }
    match buf[pos] {
        b'*' => {}
        other => {
            return Err(Error::Protocol(format!(
                "expected '*' to start a request frame, got `{}`",
                other as char
            )))
        }
    }
    pos += 1;

    let Some((len, next)) = read_decimal(buf, pos)? else {
        return Ok(None);
    };
    pos = next;
    if len < 0 {
        return Err(Error::Protocol("request array length must not be negative".into()));
    }

    for _ in 0..len {
        match check_bulk(buf, pos)? {
            Some(next) => pos = next,
            None => return Ok(None),
        }
    }

    Ok(Some(pos))
}

fn check_bulk(buf: &[u8], mut pos: usize) -> Result<Option<usize>> {
    if peek(buf, pos).is_none() {
        return Ok(None);
    }
    match buf[pos] {
        b'$' => {}
        other => {
            return Err(Error::Protocol(format!(
                "expected '$' bulk string in request array, got `{}`",
                other as char
            )))
        }
    }
    pos += 1;

    let Some((len, next)) = read_decimal(buf, pos)? else {
        return Ok(None);
    };
    pos = next;

    if len == -1 {
        // null bulk string, permitted as an argument
        return Ok(Some(pos));
    }
    if len < 0 {
        return Err(Error::Protocol("invalid bulk string length".into()));
    }
    let len = len as usize;
    let end = pos + len + 2; // payload + CRLF
    if buf.len() < end {
        return Ok(None);
    }
    if &buf[pos + len..end] != b"\r\n" {
        return Err(Error::Protocol("bulk string not terminated by CRLF".into()));
    }
    Ok(Some(end))
}

/// Second pass: `buf` is known (by `check`) to hold a complete frame of
/// exactly `buf.len()` bytes; materialize the argument vector.
fn parse_array(buf: &mut &[u8]) -> Result<Vec<Bytes>> {
    debug_assert_eq!(buf[0], b'*');
    let (len, rest) = split_line(&buf[1..]).ok_or(Error::IncompleteFrame)?;
    let len: i64 = atoi::atoi(len).ok_or(Error::Protocol("invalid frame format".into()))?;
    *buf = rest;

    let mut out = Vec::with_capacity(len.max(0) as usize);
    for _ in 0..len {
        out.push(parse_bulk(buf)?);
    }
    Ok(out)
}

fn parse_bulk(buf: &mut &[u8]) -> Result<Bytes> {
    debug_assert_eq!(buf[0], b'$');
    let (len_bytes, rest) = split_line(&buf[1..]).ok_or(Error::IncompleteFrame)?;
    if len_bytes == b"-1" {
        *buf = rest;
        return Ok(Bytes::new());
    }
    let len: usize = atoi::atoi::<i64>(len_bytes)
        .ok_or(Error::Protocol("invalid frame format".into()))?
        .try_into()?;

    let data = Bytes::copy_from_slice(&rest[..len]);
    *buf = &rest[len + 2..];
    Ok(data)
}

fn peek(buf: &[u8], pos: usize) -> Option<u8> {
    buf.get(pos).copied()
}

/// Find `\r\n` at or after `pos`, returning `(line_start_to_cr, position_after_crlf)`.
fn read_decimal(buf: &[u8], pos: usize) -> Result<Option<(i64, usize)>> {
    let Some(end) = find_crlf(buf, pos) else {
        return Ok(None);
    };
    let line = &buf[pos..end];
    let value: i64 = atoi::atoi(line).ok_or(Error::Protocol("invalid frame format".into()))?;
    Ok(Some((value, end + 2)))
}

fn find_crlf(buf: &[u8], start: usize) -> Option<usize> {
    if start >= buf.len() {
        return None;
    }
    buf[start..]
        .windows(2)
        .position(|w| w == b"\r\n")
        .map(|i| start + i)
}

fn split_line(buf: &[u8]) -> Option<(&[u8], &[u8])> {
    let idx = buf.windows(2).position(|w| w == b"\r\n")?;
    Some((&buf[..idx], &buf[idx + 2..]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(strs: &[&str]) -> Vec<Bytes> {
        strs.iter().map(|s| Bytes::from(s.to_string())).collect()
    }

    #[test]
    fn decodes_whole_frame() {
        let mut buf = BytesMut::from(&b"*2\r\n$3\r\nGET\r\n$1\r\nk\r\n"[..]);
        let decoded = decode(&mut buf).unwrap().unwrap();
        assert_eq!(decoded, args(&["GET", "k"]));
        assert!(buf.is_empty());
    }

    #[test]
    fn reports_none_on_partial_frame() {
        let whole = b"*2\r\n$3\r\nSET\r\n$1\r\nk\r\n";
        for split in 1..whole.len() {
            let mut buf = BytesMut::from(&whole[..split]);
            let before = buf.clone();
            let result = decode(&mut buf).unwrap();
            assert!(result.is_none(), "split at {split} should be incomplete");
            assert_eq!(buf, before, "buffer must be untouched on incomplete frame");
        }
    }

    #[test]
    fn fragmentation_invariance() {
        let whole: &[u8] = b"*3\r\n$3\r\nSET\r\n$1\r\nk\r\n$1\r\nv\r\n";
        let mut whole_buf = BytesMut::from(whole);
        let expected = decode(&mut whole_buf).unwrap().unwrap();

        for split in 1..whole.len() {
            let mut buf = BytesMut::new();
            buf.extend_from_slice(&whole[..split]);
            let first = decode(&mut buf).unwrap();
            assert!(first.is_none());
            buf.extend_from_slice(&whole[split..]);
            let second = decode(&mut buf).unwrap().unwrap();
            assert_eq!(second, expected, "split at {split} produced a different frame");
        }
    }

    #[test]
    fn pipelined_requests_yield_multiple_frames_in_order() {
        let mut buf = BytesMut::from(&b"*1\r\n$4\r\nPING\r\n*1\r\n$4\r\nPING\r\n*1\r\n$4\r\nPING\r\n"[..]);
        let mut frames = Vec::new();
        while let Some(frame) = decode(&mut buf).unwrap() {
            frames.push(frame);
        }
        assert_eq!(frames.len(), 3);
        for frame in frames {
            assert_eq!(frame, args(&["PING"]));
        }
    }

    #[test]
    fn null_bulk_argument_is_empty() {
        let mut buf = BytesMut::from(&b"*1\r\n$-1\r\n"[..]);
        let decoded = decode(&mut buf).unwrap().unwrap();
        assert_eq!(decoded, vec![Bytes::new()]);
    }

    #[test]
    fn rejects_non_array_leading_byte() {
        let mut buf = BytesMut::from(&b"+OK\r\n"[..]);
        assert!(decode(&mut buf).is_err());
    }

    #[test]
    fn rejects_non_bulk_array_element() {
        let mut buf = BytesMut::from(&b"*1\r\n:5\r\n"[..]);
        assert!(decode(&mut buf).is_err());
    }

    #[test]
    fn empty_array_decodes_to_empty_vec() {
        let mut buf = BytesMut::from(&b"*0\r\n"[..]);
        let decoded = decode(&mut buf).unwrap().unwrap();
        assert!(decoded.is_empty());
    }

    #[test]
    fn binary_safe_payload_with_embedded_crlf() {
        let mut buf = BytesMut::new();
        buf.extend_from_slice(b"*1\r\n$6\r\na\r\nb\r\n\r\n");
        let decoded = decode(&mut buf).unwrap().unwrap();
        assert_eq!(decoded, vec![Bytes::from_static(b"a\r\nb\r\n")]);
    }
}
