//! Command handlers (`spec.md` §4.8, §6).
//!
//! Each submodule implements one (or a closely related pair of) command(s)
//! as a zero-sized [`crate::registry::CommandHandler`]. `build_registry`
//! wires them all into the [`crate::registry::Registry`] the dispatcher
//! resolves names against.
use std::sync::Arc;

use bytes::Bytes;

use crate::error::CmdError;
use crate::registry::{CommandHandler, Registry};

pub mod del;
pub mod echo;
pub mod exists;
pub mod expire;
pub mod get;
pub mod incr;
pub mod list;
pub mod list_block;
pub mod ping;
pub mod set;
pub mod stream;
pub mod ttl;
pub mod type_cmd;

pub fn build_registry() -> Registry {
    let mut registry = Registry::new();

    fn add(registry: &mut Registry, handler: impl CommandHandler + 'static) {
        registry.register(Arc::new(handler));
    }

    add(&mut registry, ping::Ping);
    add(&mut registry, echo::Echo);
    add(&mut registry, set::Set);
    add(&mut registry, get::Get);
    add(&mut registry, del::Del);
    add(&mut registry, exists::Exists);
    add(&mut registry, expire::Expire);
    add(&mut registry, expire::Persist);
    add(&mut registry, ttl::Ttl);
    add(&mut registry, type_cmd::Type);
    add(&mut registry, incr::Incr);
    add(&mut registry, list::Push { left: true });
    add(&mut registry, list::Push { left: false });
    add(&mut registry, list::Pop { left: true });
    add(&mut registry, list::Pop { left: false });
    add(&mut registry, list::Llen);
    add(&mut registry, list::Lrange);
    add(&mut registry, list_block::Blpop);
    add(&mut registry, stream::Xadd);
    add(&mut registry, stream::Xrange);
    add(&mut registry, stream::Xread);

    registry
}

/// Parse a RESP bulk argument as a signed integer, directly off the bytes
/// (`spec.md` §4.1: "numeric parsing operates directly on bytes").
pub(crate) fn parse_i64(bytes: &[u8]) -> Result<i64, CmdError> {
    atoi::atoi(bytes).ok_or(CmdError::NotAnInteger)
}

pub(crate) fn parse_u64(bytes: &[u8]) -> Result<u64, CmdError> {
    atoi::atoi(bytes).ok_or(CmdError::NotAnInteger)
}

pub(crate) fn parse_f64(bytes: &[u8]) -> Result<f64, CmdError> {
    std::str::from_utf8(bytes)
        .ok()
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|f| f.is_finite())
        .ok_or(CmdError::NotAnInteger)
}

/// Case-insensitive ASCII comparison of a command-option token (`EX`, `NX`,
/// `COUNT`, ...) against its canonical spelling.
pub(crate) fn eq_ignore_ascii_case(bytes: &[u8], word: &str) -> bool {
    bytes.eq_ignore_ascii_case(word.as_bytes())
}

pub(crate) fn wrong_arity(name: &str) -> CmdError {
    CmdError::WrongArity(name.to_string())
}

pub(crate) fn bytes_to_utf8_key(bytes: &Bytes) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}
