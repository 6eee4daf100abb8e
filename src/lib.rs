//! An in-memory, single-node, RESP2-compatible key-value server.
//!
//! See `SPEC_FULL.md` for the full module and operation contract. Broadly:
//! [`codec`] decodes requests off the wire, [`store`] is the keyspace
//! itself (with [`expiry`] running its background reaper), [`registry`]
//! and [`cmd`] provide the command surface, [`txn`] and [`dispatcher`] give
//! `MULTI`/`EXEC` its per-connection state machine and cross-connection
//! atomicity, and [`connection`]/[`server`] wire it all up over TCP.
pub mod blocking;
pub mod clients;
pub mod cmd;
pub mod codec;
pub mod connection;
pub mod dispatcher;
pub mod error;
pub mod expiry;
pub mod frame;
pub mod registry;
pub mod server;
pub mod shutdown;
pub mod store;
pub mod stream_id;
pub mod txn;
pub mod value;

pub use clients::Client;
pub use connection::Connection;
pub use error::{Error, Result};
pub use frame::Frame;
pub(crate) use shutdown::Shutdown;
pub use store::Store;

/// Default port this server listens on, matching Redis's own default so
/// existing `redis-cli`-style tooling needs no extra flags.
pub const DEFAULT_PORT: u16 = 6379;
pub const DEFAULT_HOST: &str = "127.0.0.1";
