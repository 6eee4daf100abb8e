//! `TTL key` (`spec.md` §6).
use bytes::Bytes;

use crate::cmd::wrong_arity;
use crate::frame::Frame;
use crate::registry::{CommandHandler, HandlerOutcome};
use crate::store::{Store, TtlResult};

pub struct Ttl;

impl CommandHandler for Ttl {
    fn name(&self) -> &'static str {
        "TTL"
    }

    fn execute(&self, args: &[Bytes], store: &Store, _in_transaction: bool) -> HandlerOutcome {
        let [key] = args else {
            return HandlerOutcome::err(wrong_arity("ttl"));
        };
        let n = match store.ttl(key) {
            TtlResult::Missing => -2,
            TtlResult::NoExpiry => -1,
            TtlResult::ExpiresInSeconds(secs) => secs,
        };
        HandlerOutcome::Reply(Frame::Integer(n))
    }
}
