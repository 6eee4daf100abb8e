//! `BLPOP key+ timeout` (`spec.md` §6, §4.8).
use std::time::Duration;

use bytes::Bytes;

use crate::blocking::poll_list_pop;
use crate::cmd::{parse_f64, wrong_arity};
use crate::frame::Frame;
use crate::registry::{CommandHandler, HandlerOutcome};
use crate::store::Store;
use crate::value::Value;

pub struct Blpop;

impl CommandHandler for Blpop {
    fn name(&self) -> &'static str {
        "BLPOP"
    }

    fn execute(&self, args: &[Bytes], store: &Store, in_transaction: bool) -> HandlerOutcome {
        if args.len() < 2 {
            return HandlerOutcome::err(wrong_arity("blpop"));
        }
        let (keys, timeout_raw) = args.split_at(args.len() - 1);
        let timeout_secs = match parse_f64(&timeout_raw[0]) {
            Ok(n) if (0.0..=86400.0).contains(&n) => n,
            _ => return HandlerOutcome::err(crate::error::CmdError::custom(
                "ERR timeout is not a float or out of range",
            )),
        };
        // A zero timeout is bounded non-blocking here, not "block forever"
        // (`spec.md` §4.7, §9): `Duration::ZERO` gives `poll_list_pop` a
        // deadline of "now", so it probes exactly once before timing out.
        let timeout = Some(Duration::from_secs_f64(timeout_secs));
        let keys: Vec<Bytes> = keys.to_vec();

        if in_transaction {
            // Inside EXEC, a blocking command probes exactly once and never
            // suspends: suspending would break the batch's atomicity.
            for key in &keys {
                let popped = store.mutate(key, |current| match current {
                    Some(Value::List(mut l)) => {
                        let popped = l.pop_front();
                        let next = if l.is_empty() { None } else { Some(Value::List(l)) };
                        (next, popped)
                    }
                    other => (other, None),
                });
                if let Some(value) = popped {
                    return HandlerOutcome::Reply(Frame::Array(vec![
                        Frame::BulkString(key.clone()),
                        Frame::BulkString(value),
                    ]));
                }
            }
            return HandlerOutcome::Reply(Frame::NullArray);
        }

        let store = store.clone();
        HandlerOutcome::Deferred(Box::pin(poll_list_pop(store, keys, true, timeout)))
    }
}
