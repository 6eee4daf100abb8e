//! `TYPE key` (`spec.md` §6).
use bytes::Bytes;

use crate::cmd::wrong_arity;
use crate::frame::Frame;
use crate::registry::{CommandHandler, HandlerOutcome};
use crate::store::Store;

pub struct Type;

impl CommandHandler for Type {
    fn name(&self) -> &'static str {
        "TYPE"
    }

    fn execute(&self, args: &[Bytes], store: &Store, _in_transaction: bool) -> HandlerOutcome {
        let [key] = args else {
            return HandlerOutcome::err(wrong_arity("type"));
        };
        let reply = match store.type_of(key) {
            Some(tag) => Frame::SimpleString(tag.as_str().to_string()),
            None => Frame::SimpleString("none".to_string()),
        };
        HandlerOutcome::Reply(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn reports_none_for_missing_key() {
        let store = Store::new();
        match Type.execute(&[Bytes::from("k")], &store, false) {
            HandlerOutcome::Reply(Frame::SimpleString(s)) => assert_eq!(s, "none"),
            _ => panic!("unexpected"),
        }
    }

    #[test]
    fn reports_list_for_list_value() {
        let store = Store::new();
        store.put(Bytes::from("k"), Value::List(Default::default()), None);
        match Type.execute(&[Bytes::from("k")], &store, false) {
            HandlerOutcome::Reply(Frame::SimpleString(s)) => assert_eq!(s, "list"),
            _ => panic!("unexpected"),
        }
    }
}
