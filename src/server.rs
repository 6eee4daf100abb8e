//! TCP accept loop and per-connection request loop (`spec.md` §4, §7).
//!
//! Grounded in the teacher's `Listener`/`Handler` split: a semaphore caps
//! concurrent connections, a broadcast channel carries the shutdown signal,
//! and an `mpsc::Sender` clone per handler lets the listener detect when
//! every connection has wound down. What changed is what a `Handler` does
//! with each request: instead of `CommandVariant::apply`, it hands the
//! decoded argument vector to a [`Dispatcher`], which resolves it against
//! the [`Registry`] and the connection's own [`Transaction`] state.
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc, Mutex, Semaphore};
use tracing::{debug, error, info, warn};

use crate::dispatcher::Dispatcher;
use crate::registry::Registry;
use crate::store::Store;
use crate::txn::Transaction;
use crate::{cmd, Connection, Result, Shutdown};

/// Server listener state. Created in the `run` call, and runs the TCP
/// listening and initialization of per-connection state.
#[derive(Debug)]
struct Listener {
    store: Store,
    registry: Arc<Registry>,
    exec_lock: Arc<Mutex<()>>,
    listener: TcpListener,
    limit_connections: Arc<Semaphore>,
    notify_shutdown: broadcast::Sender<()>,
    shutdown_complete_tx: mpsc::Sender<()>,
}

/// Per-connection handler. Reads requests from `connection` and dispatches
/// them against the shared keyspace.
struct Handler<S> {
    dispatcher: Arc<Dispatcher>,
    txn: Transaction,
    connection: Connection<S>,
    shutdown: Shutdown,
    _shutdown_complete: mpsc::Sender<()>,
}

/// Maximum number of concurrent connections accepted. When this limit is
/// reached, the listener stops accepting until an active connection
/// terminates. A real deployment would want this configurable — see
/// `ServerConfig::max_connections`, threaded through `run`.
const DEFAULT_MAX_CONNECTIONS: usize = 250;

/// Run the server.
///
/// Accepts connections from the supplied listener. For each inbound
/// connection, a task is spawned to handle that connection against the
/// shared `Store`. The server runs until the `shutdown` future completes,
/// at which point it shuts down gracefully: in-flight requests finish, then
/// every connection task is allowed to exit before this function returns.
///
/// `tokio::signal::ctrl_c()` can be used as the `shutdown` argument to
/// listen for a SIGINT signal.
pub async fn run(listener: TcpListener, max_connections: usize, shutdown: impl Future) {
    let (notify_shutdown, _) = broadcast::channel(1);
    let (shutdown_complete_tx, mut shutdown_complete_rx) = mpsc::channel(1);

    let mut server = Listener {
        store: Store::new(),
        registry: Arc::new(cmd::build_registry()),
        exec_lock: Arc::new(Mutex::new(())),
        listener,
        limit_connections: Arc::new(Semaphore::new(max_connections.max(1))),
        notify_shutdown,
        shutdown_complete_tx,
    };

    tokio::select! {
        res = server.run() => {
            if let Err(err) = res {
                error!(cause = %err, "failed to accept");
            }
        }
        _ = shutdown => {
            info!("shutting down");
        }
    }

    let Listener {
        shutdown_complete_tx,
        notify_shutdown,
        store,
        ..
    } = server;

    drop(notify_shutdown);
    drop(shutdown_complete_tx);

    let _ = shutdown_complete_rx.recv().await;
    store.shutdown().await;
}

impl Listener {
    /// Listen for inbound connections, spawning a task per connection.
    ///
    /// Returns `Err` if accepting fails repeatedly: a transient accept
    /// error backs off exponentially (1s, 2s, 4s, ...) and gives up after
    /// the 6th attempt, since the underlying cause (e.g. an exhausted file
    /// descriptor limit) rarely clears itself quickly.
    async fn run(&mut self) -> Result<()> {
        info!("accepting inbound connections");

        loop {
            let permit = self.limit_connections.clone().acquire_owned().await.unwrap();
            let socket = self.accept().await?;

            let dispatcher = Arc::new(Dispatcher::new(
                self.registry.clone(),
                self.store.clone(),
                self.exec_lock.clone(),
            ));

            let mut handler = Handler {
                dispatcher,
                txn: Transaction::new(),
                connection: Connection::new(socket),
                shutdown: Shutdown::new(self.notify_shutdown.subscribe()),
                _shutdown_complete: self.shutdown_complete_tx.clone(),
            };

            tokio::spawn(async move {
                if let Err(err) = handler.run().await {
                    error!(cause = %err, "connection error");
                }
                drop(permit);
            });
        }
    }

    async fn accept(&mut self) -> Result<TcpStream> {
        let mut backoff = 1;

        loop {
            match self.listener.accept().await {
                Ok((socket, _)) => {
                    debug!("successfully accepted inbound connection");
                    return Ok(socket);
                }
                Err(err) => {
                    if backoff > 64 {
                        error!(%err, "failed to accept inbound connection too many times");
                        return Err(err.into());
                    }
                    warn!(%err, "got error accepting inbound connection, trying again in {backoff} seconds");
                }
            }

            tokio::time::sleep(Duration::from_secs(backoff)).await;
            backoff *= 2;
        }
    }
}

impl Handler<TcpStream> {
    /// Process a single connection until the peer disconnects or a
    /// shutdown signal arrives.
    #[tracing::instrument(skip_all)]
    async fn run(&mut self) -> Result<()> {
        while !self.shutdown.is_shutdown() {
            let maybe_request = tokio::select! {
                res = self.connection.read_request() => res?,
                _ = self.shutdown.recv() => {
                    return Ok(());
                }
            };

            let request = match maybe_request {
                Some(request) => request,
                None => return Ok(()),
            };

            if let Some(reply) = self.dispatcher.dispatch(request, &mut self.txn).await {
                self.connection.write_frame(&reply).await?;
            }
        }

        Ok(())
    }
}
