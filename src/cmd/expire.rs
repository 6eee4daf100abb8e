//! `EXPIRE key seconds` and `PERSIST key` (`spec.md` §6).
use std::time::Duration;

use bytes::Bytes;

use crate::cmd::{parse_u64, wrong_arity};
use crate::frame::Frame;
use crate::registry::{CommandHandler, HandlerOutcome};
use crate::store::Store;

pub struct Expire;

impl CommandHandler for Expire {
    fn name(&self) -> &'static str {
        "EXPIRE"
    }

    fn execute(&self, args: &[Bytes], store: &Store, _in_transaction: bool) -> HandlerOutcome {
        let [key, secs_raw] = args else {
            return HandlerOutcome::err(wrong_arity("expire"));
        };
        let secs = match parse_u64(secs_raw) {
            Ok(s) => s,
            Err(e) => return HandlerOutcome::err(e),
        };
        let applied = store.expire(key, Duration::from_secs(secs));
        HandlerOutcome::Reply(Frame::Integer(applied as i64))
    }
}

pub struct Persist;

impl CommandHandler for Persist {
    fn name(&self) -> &'static str {
        "PERSIST"
    }

    fn execute(&self, args: &[Bytes], store: &Store, _in_transaction: bool) -> HandlerOutcome {
        let [key] = args else {
            return HandlerOutcome::err(wrong_arity("persist"));
        };
        let applied = store.persist(key);
        HandlerOutcome::Reply(Frame::Integer(applied as i64))
    }
}
