//! `PING [msg]` (`spec.md` §6).
use bytes::Bytes;

use crate::cmd::wrong_arity;
use crate::frame::Frame;
use crate::registry::{CommandHandler, HandlerOutcome};
use crate::store::Store;

pub struct Ping;

impl CommandHandler for Ping {
    fn name(&self) -> &'static str {
        "PING"
    }

    fn execute(&self, args: &[Bytes], _store: &Store, _in_transaction: bool) -> HandlerOutcome {
        match args.len() {
            0 => HandlerOutcome::Reply(Frame::SimpleString("PONG".to_string())),
            1 => HandlerOutcome::Reply(Frame::BulkString(args[0].clone())),
            _ => HandlerOutcome::err(wrong_arity("ping")),
        }
    }
}
