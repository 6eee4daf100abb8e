//! `DEL key+` (`spec.md` §6).
use bytes::Bytes;

use crate::cmd::wrong_arity;
use crate::frame::Frame;
use crate::registry::{CommandHandler, HandlerOutcome};
use crate::store::Store;

pub struct Del;

impl CommandHandler for Del {
    fn name(&self) -> &'static str {
        "DEL"
    }

    fn execute(&self, args: &[Bytes], store: &Store, _in_transaction: bool) -> HandlerOutcome {
        if args.is_empty() {
            return HandlerOutcome::err(wrong_arity("del"));
        }
        let count = store.delete_many(args);
        HandlerOutcome::Reply(Frame::Integer(count as i64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn counts_only_existing_keys() {
        let store = Store::new();
        store.put(Bytes::from("a"), Value::String(Bytes::from("1")), None);
        match Del.execute(&[Bytes::from("a"), Bytes::from("b")], &store, false) {
            HandlerOutcome::Reply(Frame::Integer(n)) => assert_eq!(n, 1),
            _ => panic!("unexpected"),
        }
        assert_eq!(store.type_of(b"a"), None);
    }
}
