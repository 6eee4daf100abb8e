//! Buffered framing over a byte stream, usually a remote peer via a
//! [`tokio::net::TcpStream`].
use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufWriter};
use tracing::debug;

use crate::codec;
use crate::frame::Frame;
use crate::{Error, Result};

const DEFAULT_BUFFER_SIZE: usize = 16 * 1024;

/// Send requests and receive replies from a remote peer.
///
/// To read requests, the `Connection` uses an internal buffer, filled up
/// until there are enough bytes to decode a full RESP array of bulk strings.
/// Once this happens, [`codec::decode`] yields as many complete requests as
/// the buffer currently holds (`spec.md` §4.1's pipelining requirement), and
/// any trailing partial data is kept for the next read.
///
/// When sending replies, the `Frame` value is first encoded into the write
/// buffer; the contents are then flushed to the socket.
#[derive(Debug)]
pub struct Connection<S> {
    stream: BufWriter<S>,
    buffer: BytesMut,
}

/// A trait for types that can be used as a connection stream.
pub trait ConnectionStream: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> ConnectionStream for T {}

impl<S: ConnectionStream> Connection<S> {
    /// Create a new `Connection` from a socket.
    ///
    /// The connection is internally buffered, with a default buffer size of
    /// 16KB.
    pub fn new(socket: S) -> Self {
        Self {
            stream: BufWriter::new(socket),
            buffer: BytesMut::with_capacity(DEFAULT_BUFFER_SIZE),
        }
    }

    /// Read a single request (a command name plus its arguments) from the
    /// connection, waiting for more bytes as needed. Returns `Ok(None)` on a
    /// clean end-of-stream between requests. Any bytes buffered beyond this
    /// one request (pipelining) are left for the next call.
    #[tracing::instrument(skip_all)]
    pub async fn read_request(&mut self) -> Result<Option<Vec<Bytes>>> {
        use tokio::io::AsyncReadExt;

        loop {
            if let Some(request) = codec::decode(&mut self.buffer)? {
                debug!(?request, "request received");
                return Ok(Some(request));
            }

            if 0 == self.stream.read_buf(&mut self.buffer).await? {
                if self.buffer.is_empty() {
                    debug!("no more requests to read from the buffer");
                    return Ok(None);
                } else {
                    return Err(Error::Io(std::io::Error::new(
                        std::io::ErrorKind::ConnectionReset,
                        "connection was closed mid frame",
                    )));
                }
            }
        }
    }

    /// Read a single reply `Frame` of any shape from the connection. Used by
    /// [`crate::clients::Client`], which (unlike the server) must accept
    /// simple strings, errors, integers, bulk strings and arrays, not just
    /// the restricted request grammar.
    pub async fn read_reply(&mut self) -> Result<Option<Frame>> {
        use tokio::io::AsyncReadExt;

        loop {
            if let Some(frame) = crate::frame::decode(&mut self.buffer)? {
                debug!(?frame, "reply received");
                return Ok(Some(frame));
            }

            if 0 == self.stream.read_buf(&mut self.buffer).await? {
                if self.buffer.is_empty() {
                    return Ok(None);
                } else {
                    return Err(Error::Io(std::io::Error::new(
                        std::io::ErrorKind::ConnectionReset,
                        "connection was closed mid frame",
                    )));
                }
            }
        }
    }

    /// Write a request (a command name plus its arguments) as a RESP array
    /// of bulk strings — the only request shape this server accepts.
    pub async fn write_request(&mut self, parts: &[Bytes]) -> Result<()> {
        let frame = Frame::Array(parts.iter().cloned().map(Frame::BulkString).collect());
        self.write_frame(&frame).await
    }

    /// Write a reply frame to the connection's underlying stream.
    ///
    /// The `Frame` value is written using the various `write_*` functions
    /// provided by `AsyncWrite`. Calling these directly on a raw
    /// [`tokio::net::TcpStream`] would cost a syscall per call; doing it on a
    /// *buffered* stream is fine, since the data is flushed only once the
    /// whole frame is written.
    pub async fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        self.write_value(frame).await?;
        self.stream.flush().await.map_err(Error::from)
    }

    #[tracing::instrument(skip(self))]
    #[async_recursion::async_recursion]
    async fn write_value(&mut self, frame: &Frame) -> std::io::Result<()> {
        debug!(?frame);
        match frame {
            Frame::SimpleString(val) => {
                self.stream.write_u8(b'+').await?;
                self.stream.write_all(val.as_bytes()).await?;
                self.stream.write_all(b"\r\n").await?;
            }
            Frame::SimpleError(val) => {
                self.stream.write_u8(b'-').await?;
                self.stream.write_all(val.as_bytes()).await?;
                self.stream.write_all(b"\r\n").await?;
            }
            Frame::Integer(val) => {
                self.stream.write_u8(b':').await?;
                self.write_decimal(*val).await?;
            }
            Frame::BulkString(val) => {
                let len = val.len();

                self.stream.write_u8(b'$').await?;
                self.write_decimal(len as i64).await?;
                self.stream.write_all(val).await?;
                self.stream.write_all(b"\r\n").await?;
            }
            Frame::NullBulkString => {
                self.stream.write_all(b"$-1\r\n").await?;
            }
            Frame::NullArray => {
                self.stream.write_all(b"*-1\r\n").await?;
            }
            Frame::Array(frames) => {
                self.stream.write_u8(b'*').await?;
                self.write_decimal(frames.len() as i64).await?;
                for frame in frames {
                    self.write_value(frame).await?;
                }
            }
        };

        Ok(())
    }

    async fn write_decimal(&mut self, val: i64) -> std::io::Result<()> {
        use std::io::Write;

        let mut buf = [0u8; 20];

        let mut cursor = std::io::Cursor::new(&mut buf[..]);
        write!(&mut cursor, "{}", val)?;

        let pos = cursor.position() as usize;
        self.stream.write_all(&cursor.get_ref()[..pos]).await?;
        self.stream.write_all(b"\r\n").await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[tracing_test::traced_test]
    async fn reads_a_pipelined_request_and_writes_replies() {
        let stream = tokio_test::io::Builder::new()
            .read(b"*1\r\n$4\r\nPING\r\n*1\r\n$4\r\nPING\r\n")
            .write(b"+PONG\r\n")
            .write(b"+PONG\r\n")
            .build();
        let mut conn = Connection::new(stream);

        let first = conn.read_request().await.unwrap().unwrap();
        assert_eq!(first, vec![Bytes::from("PING")]);
        conn.write_frame(&Frame::SimpleString("PONG".into())).await.unwrap();

        let second = conn.read_request().await.unwrap().unwrap();
        assert_eq!(second, vec![Bytes::from("PING")]);
        conn.write_frame(&Frame::SimpleString("PONG".into())).await.unwrap();
    }

    #[tokio::test]
    async fn clean_eof_between_requests_yields_none() {
        let stream = tokio_test::io::Builder::new().read(b"").build();
        let mut conn = Connection::new(stream);
        assert!(conn.read_request().await.unwrap().is_none());
    }
}
