//! `GET key` (`spec.md` §6).
use bytes::Bytes;

use crate::cmd::wrong_arity;
use crate::frame::Frame;
use crate::registry::{CommandHandler, HandlerOutcome};
use crate::store::Store;

pub struct Get;

impl CommandHandler for Get {
    fn name(&self) -> &'static str {
        "GET"
    }

    fn execute(&self, args: &[Bytes], store: &Store, _in_transaction: bool) -> HandlerOutcome {
        let [key] = args else {
            return HandlerOutcome::err(wrong_arity("get"));
        };
        match store.get_string(key) {
            Ok(Some(value)) => HandlerOutcome::Reply(Frame::BulkString(value)),
            Ok(None) => HandlerOutcome::Reply(Frame::NullBulkString),
            Err(e) => HandlerOutcome::err(e),
        }
    }
}
