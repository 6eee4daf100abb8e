//! The command registry (`spec.md` §4.4).
//!
//! Generalizes the teacher's `CommandVariant` closed-enum dispatch into a
//! name → handler map, built once at startup and read-only afterwards, so
//! `MULTI` can resolve a command by name at queue time and re-invoke the
//! same resolved handler at `EXEC` time without re-parsing.
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;

use crate::error::CmdError;
use crate::frame::Frame;
use crate::store::Store;

pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// What a handler does with one invocation.
pub enum HandlerOutcome {
    /// A reply is ready now.
    Reply(Frame),
    /// The handler needs to suspend (a blocking command); the dispatcher
    /// awaits this future — without needing write access to the socket
    /// itself — and writes whatever `Frame` it eventually produces.
    Deferred(BoxFuture<Frame>),
    /// The connection must be closed after (optionally) writing a reply.
    Close(Frame),
}

impl HandlerOutcome {
    pub fn err(e: CmdError) -> Self {
        HandlerOutcome::Reply(e.into())
    }
}

/// A single command's implementation.
///
/// `execute` is deliberately synchronous: every non-blocking command only
/// needs a `store.mutate`/`store.get` call, neither of which suspends, so
/// keeping the trait non-async keeps it `dyn`-safe without pulling in
/// `async-trait`. Blocking commands build their own future and hand it back
/// via `HandlerOutcome::Deferred`.
pub trait CommandHandler: Send + Sync {
    fn name(&self) -> &'static str;

    /// `in_transaction` is `true` when this invocation is running as part
    /// of an `EXEC` batch. Blocking commands probe exactly once in that
    /// case rather than suspending, since suspending mid-batch would
    /// violate the batch's atomicity contract (`spec.md` §5) — this is the
    /// documented resolution of an Open Question, see `DESIGN.md`.
    fn execute(&self, args: &[Bytes], store: &Store, in_transaction: bool) -> HandlerOutcome;
}

#[derive(Default)]
pub struct Registry {
    handlers: HashMap<&'static str, Arc<dyn CommandHandler>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, handler: Arc<dyn CommandHandler>) {
        self.handlers.insert(handler.name(), handler);
    }

    /// Case-insensitive lookup. `name` is expected already upper-cased by
    /// the caller (the connection handler upper-cases once per frame).
    pub fn resolve(&self, name: &str) -> Option<Arc<dyn CommandHandler>> {
        self.handlers.get(name).cloned()
    }
}
