//! Cooperative polling helpers for blocking commands (`spec.md` §4.8,
//! `BLPOP`/`XREAD BLOCK`).
//!
//! Grounded in the teacher's `db.rs` background-task spawning style, but
//! redesigned around polling rather than a notify-on-write channel: the
//! store has no per-key wakeup mechanism, so a blocked command instead
//! probes on a short `tokio::time::interval`. This never stalls the runtime
//! (each probe is a quick `store.mutate`/`get`, and the await point between
//! probes is a real yield), and it composes with the dispatcher's exec lock,
//! which is only held for the instant of each individual probe rather than
//! across the whole wait.
use std::time::Duration;

use bytes::Bytes;
use tokio::time::{interval, Instant};

use crate::frame::Frame;
use crate::store::Store;
use crate::stream_id::StreamId;
use crate::value::Value;

/// How often a blocked command re-checks the store while waiting.
const POLL_PERIOD: Duration = Duration::from_millis(20);

/// Poll `keys` in order until one has a poppable element (`LPOP`/`RPOP`
/// semantics depending on `left`), or `timeout` elapses (`None` = wait
/// forever). On success, yields a two-element array `[key, value]`
/// matching real `BLPOP`'s reply shape; on timeout, a null array.
pub async fn poll_list_pop(store: Store, keys: Vec<Bytes>, left: bool, timeout: Option<Duration>) -> Frame {
    let deadline = timeout.map(|d| Instant::now() + d);
    let mut ticker = interval(POLL_PERIOD);

    loop {
        for key in &keys {
            let popped = store.mutate(key, |current| match current {
                Some(Value::List(mut l)) => {
                    let popped = if left { l.pop_front() } else { l.pop_back() };
                    let next = if l.is_empty() { None } else { Some(Value::List(l)) };
                    (next, popped)
                }
                other => (other, None),
            });
            if let Some(value) = popped {
                return Frame::Array(vec![Frame::BulkString(key.clone()), Frame::BulkString(value)]);
            }
        }

        if let Some(deadline) = deadline {
            if Instant::now() >= deadline {
                return Frame::NullArray;
            }
        }

        ticker.tick().await;
    }
}

/// Poll a single stream for entries with an id strictly greater than
/// `after`, until at least one exists or `timeout` elapses. Yields the
/// `XREAD`-shaped two-level array (`[[key, [[id, [field, value, ...]], ...]]]`)
/// on success, or a null array on timeout.
pub async fn poll_stream_read(store: Store, key: Bytes, after: StreamId, timeout: Option<Duration>) -> Frame {
    let deadline = timeout.map(|d| Instant::now() + d);
    let mut ticker = interval(POLL_PERIOD);

    loop {
        match store.get(&key) {
            Some(Value::Stream(entries)) => {
                let fresh: Vec<Frame> = entries
                    .range((std::ops::Bound::Excluded(after), std::ops::Bound::Unbounded))
                    .map(|(id, fields)| entry_frame(*id, fields))
                    .collect();
                if !fresh.is_empty() {
                    return Frame::Array(vec![Frame::Array(vec![
                        Frame::BulkString(key.clone()),
                        Frame::Array(fresh),
                    ])]);
                }
            }
            Some(_) => return Frame::NullArray,
            None => {}
        }

        if let Some(deadline) = deadline {
            if Instant::now() >= deadline {
                return Frame::NullArray;
            }
        }

        ticker.tick().await;
    }
}

pub(crate) fn entry_frame(id: StreamId, fields: &[(Bytes, Bytes)]) -> Frame {
    let mut flat = Vec::with_capacity(fields.len() * 2);
    for (field, value) in fields {
        flat.push(Frame::BulkString(field.clone()));
        flat.push(Frame::BulkString(value.clone()));
    }
    Frame::Array(vec![Frame::BulkString(Bytes::from(id.to_string())), Frame::Array(flat)])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn blpop_waits_then_succeeds_on_late_push() {
        let store = Store::new();
        let store2 = store.clone();
        let waiter = tokio::spawn(async move {
            poll_list_pop(store2, vec![Bytes::from("k")], true, Some(Duration::from_secs(5))).await
        });

        tokio::time::advance(Duration::from_millis(50)).await;
        tokio::task::yield_now().await;

        store.mutate(b"k", |_| {
            let mut l = std::collections::VecDeque::new();
            l.push_back(Bytes::from("v"));
            (Some(Value::List(l)), ())
        });

        tokio::time::advance(Duration::from_millis(50)).await;
        let frame = waiter.await.unwrap();
        match frame {
            Frame::Array(items) => assert_eq!(items.len(), 2),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn blpop_times_out_when_nothing_arrives() {
        let store = Store::new();
        let waiter = tokio::spawn(async move {
            poll_list_pop(store, vec![Bytes::from("k")], true, Some(Duration::from_millis(100))).await
        });
        tokio::time::advance(Duration::from_millis(200)).await;
        assert_eq!(waiter.await.unwrap(), Frame::NullArray);
    }
}
