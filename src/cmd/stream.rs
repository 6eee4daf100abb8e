//! `XADD`, `XRANGE`, `XREAD [BLOCK ms] STREAMS ...` (`spec.md` §6).
use std::collections::BTreeMap;
use std::time::Duration;

use bytes::Bytes;

use crate::blocking::{entry_frame, poll_stream_read};
use crate::cmd::{eq_ignore_ascii_case, parse_u64, wrong_arity};
use crate::error::CmdError;
use crate::frame::Frame;
use crate::registry::{CommandHandler, HandlerOutcome};
use crate::store::Store;
use crate::stream_id::StreamId;
use crate::value::Value;

pub struct Xadd;

impl CommandHandler for Xadd {
    fn name(&self) -> &'static str {
        "XADD"
    }

    fn execute(&self, args: &[Bytes], store: &Store, _in_transaction: bool) -> HandlerOutcome {
        if args.len() < 4 || (args.len() - 2) % 2 != 0 {
            return HandlerOutcome::err(wrong_arity("xadd"));
        }
        let key = &args[0];
        let id_raw = &args[1];
        let fields: Vec<(Bytes, Bytes)> = args[2..]
            .chunks_exact(2)
            .map(|pair| (pair[0].clone(), pair[1].clone()))
            .collect();

        let result = store.mutate(key, |current| {
            let mut stream = match current {
                Some(Value::Stream(s)) => s,
                Some(other) => return (Some(other), Err(CmdError::WrongType)),
                None => BTreeMap::new(),
            };

            let id = match resolve_xadd_id(id_raw, &stream) {
                Ok(id) => id,
                Err(e) => return (Some(Value::Stream(stream)), Err(e)),
            };

            stream.insert(id, fields);
            (Some(Value::Stream(stream)), Ok(id))
        });

        match result {
            Ok(id) => HandlerOutcome::Reply(Frame::BulkString(Bytes::from(id.to_string()))),
            Err(e) => HandlerOutcome::err(e),
        }
    }
}

/// `*` auto-generates the next id after the stream's current maximum
/// (`ms` from the current "milliseconds" position isn't tracked here since
/// this core has no wall-clock-seeded sequence; a trailing `*` form like
/// `"5-*"` auto-fills only the sequence part).
fn resolve_xadd_id(raw: &[u8], stream: &BTreeMap<StreamId, Vec<(Bytes, Bytes)>>) -> Result<StreamId, CmdError> {
    if raw == b"*" {
        return stream
            .keys()
            .next_back()
            .copied()
            .unwrap_or(StreamId::MIN)
            .next_seq()
            .ok_or_else(|| CmdError::custom("ERR the stream has exhausted the last possible sequence number"));
    }
    if let Some(ms_part) = raw.strip_suffix(b"-*") {
        let ms: u64 = std::str::from_utf8(ms_part)
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| CmdError::custom("ERR Invalid stream ID specified as stream command argument"))?;
        let seq = stream
            .keys()
            .filter(|id| id.ms == ms)
            .next_back()
            .map(|id| id.seq + 1)
            .unwrap_or(0);
        let id = StreamId::new(ms, seq);
        return validate_increasing(id, stream);
    }
    let id = StreamId::parse_explicit(raw)?;
    validate_increasing(id, stream)
}

fn validate_increasing(id: StreamId, stream: &BTreeMap<StreamId, Vec<(Bytes, Bytes)>>) -> Result<StreamId, CmdError> {
    match stream.keys().next_back() {
        Some(last) if id <= *last => Err(CmdError::custom(
            "ERR The ID specified in XADD is equal or smaller than the target stream top item",
        )),
        _ => Ok(id),
    }
}

pub struct Xrange;

impl CommandHandler for Xrange {
    fn name(&self) -> &'static str {
        "XRANGE"
    }

    fn execute(&self, args: &[Bytes], store: &Store, _in_transaction: bool) -> HandlerOutcome {
        let [key, start_raw, end_raw] = args else {
            return HandlerOutcome::err(wrong_arity("xrange"));
        };

        let start = match parse_range_bound(start_raw, StreamId::MIN) {
            Ok(id) => id,
            Err(e) => return HandlerOutcome::err(e),
        };
        let end = match parse_range_bound(end_raw, StreamId::MAX) {
            Ok(id) => id,
            Err(e) => return HandlerOutcome::err(e),
        };

        let stream = match store.get_stream(key) {
            Ok(Some(s)) => s,
            Ok(None) => BTreeMap::new(),
            Err(e) => return HandlerOutcome::err(e),
        };

        let items: Vec<Frame> = stream
            .range(start..=end)
            .map(|(id, fields)| entry_frame(*id, fields))
            .collect();
        HandlerOutcome::Reply(Frame::Array(items))
    }
}

fn parse_range_bound(raw: &[u8], sentinel_min_or_max: StreamId) -> Result<StreamId, CmdError> {
    match raw {
        b"-" => Ok(StreamId::MIN),
        b"+" => Ok(StreamId::MAX),
        _ => StreamId::parse_explicit(raw).or(Ok(sentinel_min_or_max)),
    }
}

pub struct Xread;

impl CommandHandler for Xread {
    fn name(&self) -> &'static str {
        "XREAD"
    }

    fn execute(&self, args: &[Bytes], store: &Store, in_transaction: bool) -> HandlerOutcome {
        let mut i = 0;
        let mut block: Option<Duration> = None;
        while i < args.len() && !eq_ignore_ascii_case(&args[i], "STREAMS") {
            if eq_ignore_ascii_case(&args[i], "BLOCK") {
                let Some(ms_raw) = args.get(i + 1) else {
                    return HandlerOutcome::err(CmdError::Syntax);
                };
                let ms = match parse_u64(ms_raw) {
                    Ok(ms) => ms,
                    Err(e) => return HandlerOutcome::err(e),
                };
                block = Some(Duration::from_millis(ms));
                i += 2;
            } else {
                return HandlerOutcome::err(CmdError::Syntax);
            }
        }
        if i >= args.len() || !eq_ignore_ascii_case(&args[i], "STREAMS") {
            return HandlerOutcome::err(CmdError::Syntax);
        }
        let rest = &args[i + 1..];
        if rest.is_empty() || rest.len() % 2 != 0 {
            return HandlerOutcome::err(CmdError::Syntax);
        }
        let n = rest.len() / 2;
        let keys = &rest[..n];
        let ids_raw = &rest[n..];

        // This core supports exactly one stream per XREAD, matching the
        // scope of the keyspace's Stream command surface; multi-stream
        // fan-out is left for a future extension.
        if n != 1 {
            return HandlerOutcome::err(CmdError::custom(
                "ERR XREAD only supports a single stream in this build",
            ));
        }
        let key = keys[0].clone();
        let after = match resolve_xread_after(&ids_raw[0], &key, store) {
            Ok(id) => id,
            Err(e) => return HandlerOutcome::err(e),
        };

        let immediate = read_after(store, &key, after);
        if !matches!(immediate, Frame::NullArray) || block.is_none() || in_transaction {
            return HandlerOutcome::Reply(immediate);
        }

        // A `BLOCK 0` timeout is bounded non-blocking here, not "block
        // forever" (`spec.md` §4.7, §9): it still probes exactly once before
        // timing out, same as the zero-timeout case for `BLPOP`.
        let store = store.clone();
        HandlerOutcome::Deferred(Box::pin(poll_stream_read(store, key, after, block)))
    }
}

fn resolve_xread_after(id_raw: &[u8], key: &Bytes, store: &Store) -> Result<StreamId, CmdError> {
    if id_raw == b"$" {
        return match store.get_stream(key)? {
            Some(s) => Ok(s.keys().next_back().copied().unwrap_or(StreamId::MIN)),
            None => Ok(StreamId::MIN),
        };
    }
    StreamId::parse_explicit(id_raw)
}

fn read_after(store: &Store, key: &Bytes, after: StreamId) -> Frame {
    match store.get_stream(key) {
        Ok(Some(entries)) => {
            let fresh: Vec<Frame> = entries
                .range((std::ops::Bound::Excluded(after), std::ops::Bound::Unbounded))
                .map(|(id, fields)| entry_frame(*id, fields))
                .collect();
            if fresh.is_empty() {
                Frame::NullArray
            } else {
                Frame::Array(vec![Frame::Array(vec![Frame::BulkString(key.clone()), Frame::Array(fresh)])])
            }
        }
        Ok(None) => Frame::NullArray,
        Err(e) => Frame::from(e),
    }
}
