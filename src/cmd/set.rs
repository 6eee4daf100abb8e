//! `SET key value [EX seconds | PX milliseconds] [NX | XX]` (`spec.md` §6).
use std::time::Duration;

use bytes::Bytes;

use crate::cmd::{eq_ignore_ascii_case, parse_u64, wrong_arity};
use crate::error::CmdError;
use crate::frame::Frame;
use crate::registry::{CommandHandler, HandlerOutcome};
use crate::store::Store;
use crate::value::Value;

pub struct Set;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Presence {
    Any,
    OnlyIfAbsent,
    OnlyIfPresent,
}

impl CommandHandler for Set {
    fn name(&self) -> &'static str {
        "SET"
    }

    fn execute(&self, args: &[Bytes], store: &Store, _in_transaction: bool) -> HandlerOutcome {
        if args.len() < 2 {
            return HandlerOutcome::err(wrong_arity("set"));
        }
        let key = args[0].clone();
        let value = args[1].clone();

        let mut ttl: Option<Duration> = None;
        let mut presence = Presence::Any;
        let mut i = 2;
        while i < args.len() {
            let opt = &args[i];
            if eq_ignore_ascii_case(opt, "EX") {
                let Some(secs_raw) = args.get(i + 1) else {
                    return HandlerOutcome::err(CmdError::Syntax);
                };
                let secs = match parse_u64(secs_raw) {
                    Ok(s) => s,
                    Err(e) => return HandlerOutcome::err(e),
                };
                ttl = Some(Duration::from_secs(secs));
                i += 2;
            } else if eq_ignore_ascii_case(opt, "PX") {
                let Some(ms_raw) = args.get(i + 1) else {
                    return HandlerOutcome::err(CmdError::Syntax);
                };
                let ms = match parse_u64(ms_raw) {
                    Ok(s) => s,
                    Err(e) => return HandlerOutcome::err(e),
                };
                ttl = Some(Duration::from_millis(ms));
                i += 2;
            } else if eq_ignore_ascii_case(opt, "NX") {
                presence = Presence::OnlyIfAbsent;
                i += 1;
            } else if eq_ignore_ascii_case(opt, "XX") {
                presence = Presence::OnlyIfPresent;
                i += 1;
            } else {
                return HandlerOutcome::err(CmdError::Syntax);
            }
        }

        let exists = store.type_of(&key).is_some();
        let should_write = match presence {
            Presence::Any => true,
            Presence::OnlyIfAbsent => !exists,
            Presence::OnlyIfPresent => exists,
        };

        if !should_write {
            return HandlerOutcome::Reply(Frame::NullBulkString);
        }

        store.put(key, Value::String(value), ttl);
        HandlerOutcome::Reply(Frame::ok())
    }
}
