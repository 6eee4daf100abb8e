use std::time::Duration;

use bytes::Bytes;
use tokio::net::{TcpStream, ToSocketAddrs};
use tracing::debug;

use crate::{Connection, Error, Frame, Result};

/// Established connection with a server.
///
/// Backed by a single `TcpStream`, `Client` provides basic network client
/// functionality (no pooling, retrying, ...). Requests are issued using the
/// various methods of `Client`, or the generic [`Client::command`] escape
/// hatch for anything without its own wrapper.
#[derive(Debug)]
pub struct Client {
    connection: Connection<TcpStream>,
}

impl Client {
    /// Establish a connection with the server located at `addr`.
    ///
    /// `addr` may be any type that can be asynchronously converted to a
    /// `SocketAddr`. This includes `SocketAddr` and strings. `ToSocketAddrs`
    /// is the Tokio version and not the `std` version.
    pub async fn connect(addr: impl ToSocketAddrs) -> Result<Self> {
        let socket = TcpStream::connect(addr).await?;
        let connection = Connection::new(socket);
        Ok(Client { connection })
    }

    /// Send an arbitrary command and return its raw reply. Every typed
    /// method below is built on top of this.
    #[tracing::instrument(skip(self))]
    pub async fn command(&mut self, parts: &[Bytes]) -> Result<Frame> {
        debug!(?parts, "sending request");
        self.connection.write_request(parts).await?;
        match self.connection.read_reply().await? {
            Some(frame) => Ok(frame),
            None => Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "connection reset by server",
            ))),
        }
    }

    fn simple(s: &str) -> Bytes {
        Bytes::from(s.to_string())
    }

    /// `PING [msg]`. Returns PONG if no argument is provided, otherwise a
    /// copy of the argument. Often used to test if a connection is alive.
    pub async fn ping(&mut self, msg: Option<Bytes>) -> Result<Bytes> {
        let mut parts = vec![Self::simple("PING")];
        parts.extend(msg);
        match self.command(&parts).await? {
            Frame::SimpleString(val) => Ok(val.into()),
            Frame::BulkString(val) => Ok(val),
            frame => Err(Error::Response(format!("unexpected frame: {frame}"))),
        }
    }

    /// `GET key`. Returns `None` if the key does not exist.
    pub async fn get(&mut self, key: &str) -> Result<Option<Bytes>> {
        match self.command(&[Self::simple("GET"), Self::simple(key)]).await? {
            Frame::BulkString(val) => Ok(Some(val)),
            Frame::NullBulkString => Ok(None),
            frame => Err(Error::Response(format!("unexpected frame: {frame}"))),
        }
    }

    /// `SET key value`, with no expiry.
    pub async fn set(&mut self, key: &str, val: Bytes) -> Result<()> {
        self.set_with(key, val, None).await
    }

    /// `SET key value EX seconds`.
    pub async fn set_expires(&mut self, key: &str, val: Bytes, expire: Duration) -> Result<()> {
        self.set_with(key, val, Some(expire)).await
    }

    async fn set_with(&mut self, key: &str, val: Bytes, expire: Option<Duration>) -> Result<()> {
        let mut parts = vec![Self::simple("SET"), Self::simple(key), val];
        if let Some(expire) = expire {
            parts.push(Self::simple("EX"));
            parts.push(Self::simple(&expire.as_secs().to_string()));
        }
        match self.command(&parts).await? {
            Frame::SimpleString(val) if val == "OK" => Ok(()),
            frame => Err(Error::Response(format!("unexpected frame: {frame}"))),
        }
    }

    /// `DEL key+`. Returns the number of keys actually removed.
    pub async fn del(&mut self, keys: &[&str]) -> Result<i64> {
        let mut parts = vec![Self::simple("DEL")];
        parts.extend(keys.iter().map(|k| Self::simple(k)));
        match self.command(&parts).await? {
            Frame::Integer(n) => Ok(n),
            frame => Err(Error::Response(format!("unexpected frame: {frame}"))),
        }
    }

    /// `INCR key`. Returns the value after incrementing.
    pub async fn incr(&mut self, key: &str) -> Result<i64> {
        match self.command(&[Self::simple("INCR"), Self::simple(key)]).await? {
            Frame::Integer(n) => Ok(n),
            frame => Err(Error::Response(format!("unexpected frame: {frame}"))),
        }
    }

    /// `EXPIRE key seconds`. Returns whether the expiry was applied.
    pub async fn expire(&mut self, key: &str, ttl: Duration) -> Result<bool> {
        let parts = [Self::simple("EXPIRE"), Self::simple(key), Self::simple(&ttl.as_secs().to_string())];
        match self.command(&parts).await? {
            Frame::Integer(n) => Ok(n == 1),
            frame => Err(Error::Response(format!("unexpected frame: {frame}"))),
        }
    }

    /// `TTL key`. Returns seconds remaining, `-1` persistent, `-2` missing.
    pub async fn ttl(&mut self, key: &str) -> Result<i64> {
        match self.command(&[Self::simple("TTL"), Self::simple(key)]).await? {
            Frame::Integer(n) => Ok(n),
            frame => Err(Error::Response(format!("unexpected frame: {frame}"))),
        }
    }

    /// `TYPE key`.
    pub async fn type_of(&mut self, key: &str) -> Result<String> {
        match self.command(&[Self::simple("TYPE"), Self::simple(key)]).await? {
            Frame::SimpleString(s) => Ok(s),
            frame => Err(Error::Response(format!("unexpected frame: {frame}"))),
        }
    }
}
