//! `ECHO msg` (`spec.md` §6).
use bytes::Bytes;

use crate::cmd::wrong_arity;
use crate::frame::Frame;
use crate::registry::{CommandHandler, HandlerOutcome};
use crate::store::Store;

pub struct Echo;

impl CommandHandler for Echo {
    fn name(&self) -> &'static str {
        "ECHO"
    }

    fn execute(&self, args: &[Bytes], _store: &Store, _in_transaction: bool) -> HandlerOutcome {
        match args {
            [msg] => HandlerOutcome::Reply(Frame::BulkString(msg.clone())),
            _ => HandlerOutcome::err(wrong_arity("echo")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn echoes_its_argument() {
        let store = Store::new();
        match Echo.execute(&[Bytes::from("hello")], &store, false) {
            HandlerOutcome::Reply(Frame::BulkString(b)) => assert_eq!(b, Bytes::from("hello")),
            _ => panic!("unexpected"),
        }
    }

    #[test]
    fn wrong_arity_errors() {
        let store = Store::new();
        match Echo.execute(&[], &store, false) {
            HandlerOutcome::Reply(Frame::SimpleError(_)) => {}
            _ => panic!("expected error"),
        }
    }
}
