//! Wires the [`Registry`], [`Transaction`] and [`Store`] together
//! (`spec.md` §4.4, §5).
//!
//! `MULTI`/`EXEC`/`DISCARD`/`WATCH`-adjacent bookkeeping is intercepted here,
//! before the registry is ever consulted — the teacher's `CommandVariant`
//! matched on a closed enum of command kinds; this generalizes that match to
//! three cases (transaction control words, everything else) since every
//! other command is just a registry lookup away.
//!
//! Cross-connection atomicity for `EXEC` (`spec.md` §5: "an EXEC batch is
//! indivisible with respect to other connections") is provided by a single
//! `tokio::sync::Mutex<()>` acquired for the duration of one top-level
//! dispatch, or for the whole batch in the case of `EXEC`. It is
//! deliberately *not* held across a blocking command's suspension — only
//! around each individual probe — so a long `BLPOP` never stalls unrelated
//! connections.
use std::sync::Arc;

use bytes::Bytes;

use crate::cmd::bytes_to_utf8_key;
use crate::error::CmdError;
use crate::frame::Frame;
use crate::registry::{HandlerOutcome, Registry};
use crate::store::Store;
use crate::txn::Transaction;

pub struct Dispatcher {
    registry: Arc<Registry>,
    store: Store,
    exec_lock: Arc<tokio::sync::Mutex<()>>,
}

impl Dispatcher {
    pub fn new(registry: Arc<Registry>, store: Store, exec_lock: Arc<tokio::sync::Mutex<()>>) -> Self {
        Self { registry, store, exec_lock }
    }

    /// Dispatch one request from a connection, given that connection's
    /// private transaction state. Returns `None` for an empty frame (a
    /// zero-length array), which is silently skipped (`spec.md` §4.6): no
    /// reply is written for it at all.
    pub async fn dispatch(&self, request: Vec<Bytes>, txn: &mut Transaction) -> Option<Frame> {
        let Some((name, args)) = request.split_first() else {
            return None;
        };
        let name = bytes_to_utf8_key(name).to_ascii_uppercase();

        let reply = match name.as_str() {
            "MULTI" => match txn.begin() {
                Ok(()) => Frame::ok(),
                Err(()) => CmdError::NestedMulti.into(),
            },
            "DISCARD" => match txn.discard() {
                Ok(()) => Frame::ok(),
                Err(_) => CmdError::DiscardWithoutMulti.into(),
            },
            "EXEC" => self.exec(txn).await,
            _ if txn.is_active() => self.queue_or_reject(&name, args, txn),
            _ => self.invoke(&name, args, false).await,
        };
        Some(reply)
    }

    fn queue_or_reject(&self, name: &str, args: &[Bytes], txn: &mut Transaction) -> Frame {
        match self.registry.resolve(name) {
            Some(handler) => {
                txn.enqueue(handler, args.to_vec());
                Frame::SimpleString("QUEUED".to_string())
            }
            None => {
                txn.poison();
                CmdError::UnknownCommand(name.to_string()).into()
            }
        }
    }

    async fn exec(&self, txn: &mut Transaction) -> Frame {
        let queued = match txn.take_for_exec() {
            Ok(Ok(queued)) => queued,
            Ok(Err(())) => return CmdError::ExecAbort.into(),
            Err(_) => return CmdError::ExecWithoutMulti.into(),
        };

        let _guard = self.exec_lock.lock().await;
        let mut replies = Vec::with_capacity(queued.len());
        for cmd in queued {
            let outcome = cmd.handler.execute(&cmd.args, &self.store, true);
            let reply = match outcome {
                HandlerOutcome::Reply(frame) => frame,
                HandlerOutcome::Close(frame) => frame,
                // A handler observing `in_transaction = true` never returns
                // `Deferred`; guard against a future handler regressing this.
                HandlerOutcome::Deferred(fut) => fut.await,
            };
            replies.push(reply);
        }
        Frame::Array(replies)
    }

    async fn invoke(&self, name: &str, args: &[Bytes], in_transaction: bool) -> Frame {
        let Some(handler) = self.registry.resolve(name) else {
            return CmdError::UnknownCommand(name.to_string()).into();
        };

        let _guard = self.exec_lock.lock().await;
        let outcome = handler.execute(args, &self.store, in_transaction);
        drop(_guard);

        match outcome {
            HandlerOutcome::Reply(frame) => frame,
            HandlerOutcome::Close(frame) => frame,
            HandlerOutcome::Deferred(fut) => fut.await,
        }
    }
}
