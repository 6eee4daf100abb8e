//! `EXISTS key+` — not one of `spec.md` §6's anchor commands, but a trivial
//! wrapper over `Store::type_of` that gives the "is this key observably
//! present" check (which §8's `TYPE` property already depends on) its own
//! command surface.
use bytes::Bytes;

use crate::cmd::wrong_arity;
use crate::frame::Frame;
use crate::registry::{CommandHandler, HandlerOutcome};
use crate::store::Store;

pub struct Exists;

impl CommandHandler for Exists {
    fn name(&self) -> &'static str {
        "EXISTS"
    }

    fn execute(&self, args: &[Bytes], store: &Store, _in_transaction: bool) -> HandlerOutcome {
        if args.is_empty() {
            return HandlerOutcome::err(wrong_arity("exists"));
        }
        let count = args.iter().filter(|k| store.type_of(k).is_some()).count();
        HandlerOutcome::Reply(Frame::Integer(count as i64))
    }
}
