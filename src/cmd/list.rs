//! `LPUSH`/`RPUSH`, `LPOP`/`RPOP`, `LLEN`, `LRANGE` (`spec.md` §6). The push
//! and pop pairs share one struct each, parameterized by `left`, since they
//! differ only in which end of the deque they touch.
use std::collections::VecDeque;

use bytes::Bytes;

use crate::cmd::{parse_i64, wrong_arity};
use crate::error::CmdError;
use crate::frame::Frame;
use crate::registry::{CommandHandler, HandlerOutcome};
use crate::store::Store;
use crate::value::Value;

pub struct Push {
    pub left: bool,
}

impl CommandHandler for Push {
    fn name(&self) -> &'static str {
        if self.left {
            "LPUSH"
        } else {
            "RPUSH"
        }
    }

    fn execute(&self, args: &[Bytes], store: &Store, _in_transaction: bool) -> HandlerOutcome {
        if args.len() < 2 {
            return HandlerOutcome::err(wrong_arity(&self.name().to_lowercase()));
        }
        let key = &args[0];
        let values = &args[1..];
        let left = self.left;

        let result = store.mutate(key, |current| {
            let mut list = match current {
                Some(Value::List(l)) => l,
                Some(other) => return (Some(other), Err(crate::error::CmdError::WrongType)),
                None => VecDeque::new(),
            };
            for v in values {
                if left {
                    list.push_front(v.clone());
                } else {
                    list.push_back(v.clone());
                }
            }
            let len = list.len();
            (Some(Value::List(list)), Ok(len))
        });

        match result {
            Ok(len) => HandlerOutcome::Reply(Frame::Integer(len as i64)),
            Err(e) => HandlerOutcome::err(e),
        }
    }
}

pub struct Pop {
    pub left: bool,
}

impl CommandHandler for Pop {
    fn name(&self) -> &'static str {
        if self.left {
            "LPOP"
        } else {
            "RPOP"
        }
    }

    fn execute(&self, args: &[Bytes], store: &Store, _in_transaction: bool) -> HandlerOutcome {
        let left = self.left;
        match args {
            [key] => {
                let result = store.mutate(key, |current| match current {
                    Some(Value::List(mut l)) => {
                        let popped = if left { l.pop_front() } else { l.pop_back() };
                        let next = if l.is_empty() { None } else { Some(Value::List(l)) };
                        (next, Ok(popped))
                    }
                    Some(other) => (Some(other), Err(CmdError::WrongType)),
                    None => (None, Ok(None)),
                });
                match result {
                    Ok(Some(value)) => HandlerOutcome::Reply(Frame::BulkString(value)),
                    Ok(None) => HandlerOutcome::Reply(Frame::NullBulkString),
                    Err(e) => HandlerOutcome::err(e),
                }
            }
            [key, count_raw] => {
                let count = match parse_i64(count_raw) {
                    Ok(n) if n >= 0 => n as usize,
                    Ok(_) => {
                        return HandlerOutcome::err(CmdError::custom(
                            "ERR value is out of range, must be positive",
                        ))
                    }
                    Err(e) => return HandlerOutcome::err(e),
                };
                let result = store.mutate(key, |current| match current {
                    Some(Value::List(mut l)) => {
                        let mut popped = Vec::with_capacity(count.min(l.len()));
                        for _ in 0..count {
                            let Some(item) = (if left { l.pop_front() } else { l.pop_back() }) else {
                                break;
                            };
                            popped.push(item);
                        }
                        let next = if l.is_empty() { None } else { Some(Value::List(l)) };
                        (next, Ok(Some(popped)))
                    }
                    Some(other) => (Some(other), Err(CmdError::WrongType)),
                    None => (None, Ok(None)),
                });
                match result {
                    Ok(Some(items)) => {
                        HandlerOutcome::Reply(Frame::Array(items.into_iter().map(Frame::BulkString).collect()))
                    }
                    Ok(None) => HandlerOutcome::Reply(Frame::NullArray),
                    Err(e) => HandlerOutcome::err(e),
                }
            }
            _ => HandlerOutcome::err(wrong_arity(&self.name().to_lowercase())),
        }
    }
}

pub struct Llen;

impl CommandHandler for Llen {
    fn name(&self) -> &'static str {
        "LLEN"
    }

    fn execute(&self, args: &[Bytes], store: &Store, _in_transaction: bool) -> HandlerOutcome {
        let [key] = args else {
            return HandlerOutcome::err(wrong_arity("llen"));
        };
        match store.get_list(key) {
            Ok(Some(l)) => HandlerOutcome::Reply(Frame::Integer(l.len() as i64)),
            Ok(None) => HandlerOutcome::Reply(Frame::Integer(0)),
            Err(e) => HandlerOutcome::err(e),
        }
    }
}

pub struct Lrange;

impl CommandHandler for Lrange {
    fn name(&self) -> &'static str {
        "LRANGE"
    }

    fn execute(&self, args: &[Bytes], store: &Store, _in_transaction: bool) -> HandlerOutcome {
        let [key, start_raw, stop_raw] = args else {
            return HandlerOutcome::err(wrong_arity("lrange"));
        };
        let start = match parse_i64(start_raw) {
            Ok(n) => n,
            Err(e) => return HandlerOutcome::err(e),
        };
        let stop = match parse_i64(stop_raw) {
            Ok(n) => n,
            Err(e) => return HandlerOutcome::err(e),
        };

        let list = match store.get_list(key) {
            Ok(Some(l)) => l,
            Ok(None) => VecDeque::new(),
            Err(e) => return HandlerOutcome::err(e),
        };

        let len = list.len() as i64;
        let (lo, hi) = normalize_range(start, stop, len);
        let items = if lo > hi {
            Vec::new()
        } else {
            list.iter()
                .skip(lo as usize)
                .take((hi - lo + 1) as usize)
                .map(|b| Frame::BulkString(b.clone()))
                .collect()
        };
        HandlerOutcome::Reply(Frame::Array(items))
    }
}

/// Resolve Redis-style negative indices (`-1` is the last element) into an
/// inclusive `[lo, hi]` range clamped to `[0, len)`.
fn normalize_range(start: i64, stop: i64, len: i64) -> (i64, i64) {
    let clamp = |i: i64| -> i64 {
        let i = if i < 0 { (len + i).max(0) } else { i };
        i.min(len.max(0))
    };
    let lo = clamp(start);
    let hi = if stop < 0 { (len + stop).max(-1) } else { stop.min(len - 1) };
    (lo, hi)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bulk(s: &str) -> Bytes {
        Bytes::from(s.to_string())
    }

    #[test]
    fn lpush_prepends_and_reports_length() {
        let store = Store::new();
        let push = Push { left: true };
        match push.execute(&[bulk("k"), bulk("a"), bulk("b")], &store, false) {
            HandlerOutcome::Reply(Frame::Integer(n)) => assert_eq!(n, 2),
            _ => panic!("unexpected"),
        }
        let list = store.get_list(b"k").unwrap().unwrap();
        assert_eq!(list, VecDeque::from(vec![bulk("b"), bulk("a")]));
    }

    #[test]
    fn wrongtype_push_leaves_the_existing_value_intact() {
        let store = Store::new();
        store.put(bulk("k"), Value::String(bulk("v")), None);
        match (Push { left: true }).execute(&[bulk("k"), bulk("x")], &store, false) {
            HandlerOutcome::Reply(Frame::SimpleError(e)) => assert!(e.starts_with("WRONGTYPE")),
            _ => panic!("expected WRONGTYPE"),
        }
        assert_eq!(store.get_string(b"k").unwrap(), Some(bulk("v")));
    }

    #[test]
    fn wrongtype_pop_leaves_the_existing_value_intact() {
        let store = Store::new();
        store.put(bulk("k"), Value::String(bulk("v")), None);
        match (Pop { left: true }).execute(&[bulk("k")], &store, false) {
            HandlerOutcome::Reply(Frame::SimpleError(e)) => assert!(e.starts_with("WRONGTYPE")),
            _ => panic!("expected WRONGTYPE"),
        }
        match (Pop { left: true }).execute(&[bulk("k"), bulk("2")], &store, false) {
            HandlerOutcome::Reply(Frame::SimpleError(e)) => assert!(e.starts_with("WRONGTYPE")),
            _ => panic!("expected WRONGTYPE"),
        }
        assert_eq!(store.get_string(b"k").unwrap(), Some(bulk("v")));
    }

    #[test]
    fn rpop_empties_and_removes_key() {
        let store = Store::new();
        Push { left: false }.execute(&[bulk("k"), bulk("a")], &store, false);
        match (Pop { left: false }).execute(&[bulk("k")], &store, false) {
            HandlerOutcome::Reply(Frame::BulkString(b)) => assert_eq!(b, bulk("a")),
            _ => panic!("unexpected"),
        }
        assert_eq!(store.type_of(b"k"), None);
    }

    #[test]
    fn pop_with_count_returns_array_in_pop_order() {
        let store = Store::new();
        Push { left: false }.execute(&[bulk("k"), bulk("a"), bulk("b"), bulk("c")], &store, false);
        match (Pop { left: true }).execute(&[bulk("k"), bulk("2")], &store, false) {
            HandlerOutcome::Reply(Frame::Array(items)) => {
                assert_eq!(items, vec![Frame::BulkString(bulk("a")), Frame::BulkString(bulk("b"))]);
            }
            _ => panic!("unexpected"),
        }
    }

    #[test]
    fn pop_with_count_on_missing_key_is_nil_array() {
        let store = Store::new();
        match (Pop { left: true }).execute(&[bulk("k"), bulk("2")], &store, false) {
            HandlerOutcome::Reply(Frame::NullArray) => {}
            _ => panic!("expected nil array"),
        }
    }

    #[test]
    fn pop_on_missing_key_is_nil() {
        let store = Store::new();
        match (Pop { left: true }).execute(&[bulk("k")], &store, false) {
            HandlerOutcome::Reply(Frame::NullBulkString) => {}
            _ => panic!("expected nil"),
        }
    }

    #[test]
    fn lrange_handles_negative_indices() {
        let store = Store::new();
        Push { left: false }.execute(&[bulk("k"), bulk("a"), bulk("b"), bulk("c")], &store, false);
        match Lrange.execute(&[bulk("k"), bulk("0"), bulk("-1")], &store, false) {
            HandlerOutcome::Reply(Frame::Array(items)) => assert_eq!(items.len(), 3),
            _ => panic!("unexpected"),
        }
        match Lrange.execute(&[bulk("k"), bulk("-2"), bulk("-1")], &store, false) {
            HandlerOutcome::Reply(Frame::Array(items)) => assert_eq!(
                items,
                vec![Frame::BulkString(bulk("b")), Frame::BulkString(bulk("c"))]
            ),
            _ => panic!("unexpected"),
        }
    }

    #[test]
    fn llen_on_missing_key_is_zero() {
        let store = Store::new();
        match Llen.execute(&[bulk("k")], &store, false) {
            HandlerOutcome::Reply(Frame::Integer(0)) => {}
            _ => panic!("expected 0"),
        }
    }
}
