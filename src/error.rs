//! Error taxonomy.
//!
//! `Error` is connection-fatal: a protocol violation or I/O failure that
//! closes the socket. `CmdError` is reply-level: it never unwinds past a
//! handler, and always collapses into a single-line RESP error `Frame`.
use thiserror::Error;

use crate::frame::Frame;

#[derive(Debug, Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("incomplete frame")]
    IncompleteFrame,
    #[error("protocol error: {0}")]
    Protocol(String),
    #[error(transparent)]
    Conversion(#[from] std::num::TryFromIntError),
    #[error(transparent)]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error("end of stream error")]
    EndOfStream,
    #[error("wrong frame type: {0}")]
    WrongFrameType(String),
    #[error("unexpected server response: {0}")]
    Response(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// A reply-level command failure. Every variant maps to exactly one RESP
/// simple error and is always the responsibility of a handler or the
/// dispatcher, never the connection itself.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CmdError {
    #[error("WRONGTYPE Operation against a key holding the wrong kind of value")]
    WrongType,
    #[error("ERR wrong number of arguments for '{0}' command")]
    WrongArity(String),
    #[error("ERR value is not an integer or out of range")]
    NotAnInteger,
    #[error("ERR syntax error")]
    Syntax,
    #[error("ERR unknown command '{0}'")]
    UnknownCommand(String),
    #[error("ERR {0}")]
    Custom(String),
    #[error("ERR MULTI calls can not be nested")]
    NestedMulti,
    #[error("ERR EXEC without MULTI")]
    ExecWithoutMulti,
    #[error("ERR DISCARD without MULTI")]
    DiscardWithoutMulti,
    #[error("EXECABORT Transaction discarded because of previous errors.")]
    ExecAbort,
}

impl CmdError {
    pub fn custom(msg: impl Into<String>) -> Self {
        CmdError::Custom(msg.into())
    }
}

impl From<CmdError> for Frame {
    fn from(err: CmdError) -> Self {
        Frame::SimpleError(err.to_string())
    }
}
