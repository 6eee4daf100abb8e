//! `INCR key` (`spec.md` §6). Implemented atomically through `Store::mutate`
//! so concurrent `INCR`s against the same key never lose an update.
use bytes::Bytes;

use crate::cmd::wrong_arity;
use crate::error::CmdError;
use crate::frame::Frame;
use crate::registry::{CommandHandler, HandlerOutcome};
use crate::store::Store;
use crate::value::Value;

pub struct Incr;

impl CommandHandler for Incr {
    fn name(&self) -> &'static str {
        "INCR"
    }

    fn execute(&self, args: &[Bytes], store: &Store, _in_transaction: bool) -> HandlerOutcome {
        let [key] = args else {
            return HandlerOutcome::err(wrong_arity("incr"));
        };

        let result = store.mutate(key, |current| match current {
            None => (Some(Value::String(Bytes::from("1"))), Ok(1i64)),
            Some(Value::String(b)) => match parse_signed(&b) {
                Ok(n) => match n.checked_add(1) {
                    Some(next) => (
                        Some(Value::String(Bytes::from(next.to_string()))),
                        Ok(next),
                    ),
                    None => (Some(Value::String(b)), Err(CmdError::custom(
                        "ERR increment or decrement would overflow",
                    ))),
                },
                Err(e) => (Some(Value::String(b)), Err(e)),
            },
            Some(other) => (Some(other), Err(CmdError::WrongType)),
        });

        match result {
            Ok(n) => HandlerOutcome::Reply(Frame::Integer(n)),
            Err(e) => HandlerOutcome::err(e),
        }
    }
}

fn parse_signed(b: &[u8]) -> Result<i64, CmdError> {
    std::str::from_utf8(b)
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or(CmdError::NotAnInteger)
}
