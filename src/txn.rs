//! Per-connection transaction state machine (`spec.md` §4.5).
//!
//! Lives entirely on the per-connection `Handler` — never shared, never
//! synchronized, exactly as `spec.md` §5 requires ("the transaction context
//! is strictly per-connection and never shared").
use std::sync::Arc;

use bytes::Bytes;

use crate::registry::CommandHandler;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxnState {
    Idle,
    Queuing,
    QueuingWithError,
}

pub struct QueuedCommand {
    pub handler: Arc<dyn CommandHandler>,
    pub args: Vec<Bytes>,
}

pub struct Transaction {
    state: TxnState,
    queue: Vec<QueuedCommand>,
}

impl Default for Transaction {
    fn default() -> Self {
        Self {
            state: TxnState::Idle,
            queue: Vec::new(),
        }
    }
}

impl Transaction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> TxnState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, TxnState::Queuing | TxnState::QueuingWithError)
    }

    /// `MULTI`: starts queuing, or errors (without clearing the queue) if
    /// already queuing. The caller is responsible for turning `Err(())` into
    /// the canonical `CmdError::NestedMulti` reply.
    pub fn begin(&mut self) -> Result<(), ()> {
        match self.state {
            TxnState::Idle => {
                self.state = TxnState::Queuing;
                Ok(())
            }
            TxnState::Queuing | TxnState::QueuingWithError => Err(()),
        }
    }

    /// Append a resolved command while queuing. `take_for_exec` leaves a
    /// fresh `Vec` with the old capacity behind, so a connection that runs
    /// many same-sized transactions doesn't reallocate the queue each time.
    pub fn enqueue(&mut self, handler: Arc<dyn CommandHandler>, args: Vec<Bytes>) {
        debug_assert!(self.is_active());
        self.queue.push(QueuedCommand { handler, args });
    }

    /// Mark the transaction poisoned (an unknown command was queued).
    pub fn poison(&mut self) {
        debug_assert!(self.is_active());
        self.state = TxnState::QueuingWithError;
    }

    /// `DISCARD`: clear the queue and return to `Idle`. `Ok` if a
    /// transaction was active, `Err` otherwise.
    pub fn discard(&mut self) -> Result<(), &'static str> {
        match self.state {
            TxnState::Queuing | TxnState::QueuingWithError => {
                self.queue.clear();
                self.state = TxnState::Idle;
                Ok(())
            }
            TxnState::Idle => Err("ERR DISCARD without MULTI"),
        }
    }

    /// `EXEC`: take ownership of the queue for execution and reset to
    /// `Idle`. Returns `Err` if idle, or `Ok(Err(()))` if the transaction
    /// was poisoned (caller replies `EXECABORT`).
    #[allow(clippy::type_complexity)]
    pub fn take_for_exec(&mut self) -> Result<Result<Vec<QueuedCommand>, ()>, &'static str> {
        match self.state {
            TxnState::Idle => Err("ERR EXEC without MULTI"),
            TxnState::QueuingWithError => {
                self.queue.clear();
                self.state = TxnState::Idle;
                Ok(Err(()))
            }
            TxnState::Queuing => {
                let queue = std::mem::replace(&mut self.queue, Vec::with_capacity(self.queue.capacity()));
                self.state = TxnState::Idle;
                Ok(Ok(queue))
            }
        }
    }
}
