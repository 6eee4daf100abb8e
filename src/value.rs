//! The tagged value type stored against each key (`spec.md` §3).
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use bytes::Bytes;

use crate::stream_id::StreamId;

/// One entry in a stream: an ordered list of field/value pairs, duplicates
/// permitted (matches Redis, which treats a stream entry as a flat list of
/// fields rather than a map).
pub type StreamEntry = Vec<(Bytes, Bytes)>;

#[derive(Debug, Clone)]
pub enum Value {
    String(Bytes),
    List(VecDeque<Bytes>),
    Stream(BTreeMap<StreamId, StreamEntry>),
    /// Reserved collaborator: no command in this core constructs or reads
    /// this variant, but `TypeTag`/`mutate` stay exhaustive over it.
    Set(HashSet<Bytes>),
    /// Reserved collaborator, see `Set`.
    Hash(HashMap<Bytes, Bytes>),
    /// Reserved collaborator, see `Set`. Scored members; stored unordered
    /// since nothing in this core ranges over scores yet.
    SortedSet(HashMap<Bytes, f64>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeTag {
    String,
    List,
    Stream,
    Set,
    Hash,
    SortedSet,
}

impl TypeTag {
    pub fn as_str(self) -> &'static str {
        match self {
            TypeTag::String => "string",
            TypeTag::List => "list",
            TypeTag::Stream => "stream",
            TypeTag::Set => "set",
            TypeTag::Hash => "hash",
            TypeTag::SortedSet => "zset",
        }
    }
}

impl Value {
    pub fn type_tag(&self) -> TypeTag {
        match self {
            Value::String(_) => TypeTag::String,
            Value::List(_) => TypeTag::List,
            Value::Stream(_) => TypeTag::Stream,
            Value::Set(_) => TypeTag::Set,
            Value::Hash(_) => TypeTag::Hash,
            Value::SortedSet(_) => TypeTag::SortedSet,
        }
    }

    /// A list or stream that has become empty is indistinguishable from
    /// absence for read operations (`spec.md` §3, Lifecycle).
    pub fn is_observably_empty(&self) -> bool {
        match self {
            Value::List(items) => items.is_empty(),
            Value::Stream(entries) => entries.is_empty(),
            Value::Set(items) => items.is_empty(),
            Value::Hash(items) => items.is_empty(),
            Value::SortedSet(items) => items.is_empty(),
            Value::String(_) => false,
        }
    }

    pub fn as_string(&self) -> Option<&Bytes> {
        match self {
            Value::String(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&VecDeque<Bytes>> {
        match self {
            Value::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_list_mut(&mut self) -> Option<&mut VecDeque<Bytes>> {
        match self {
            Value::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_stream(&self) -> Option<&BTreeMap<StreamId, StreamEntry>> {
        match self {
            Value::Stream(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_stream_mut(&mut self) -> Option<&mut BTreeMap<StreamId, StreamEntry>> {
        match self {
            Value::Stream(s) => Some(s),
            _ => None,
        }
    }
}
