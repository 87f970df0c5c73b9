//! Connection management strategies.
//!
//! Two strategies, selected by configuration:
//!
//! - **Multiplexed**: one connection owned by an actor task. Callers send
//!   requests over an mpsc channel and wait on a oneshot for the reply. The
//!   actor reconnects with exponential backoff when the connection dies.
//! - **Checkout**: a semaphore-bounded set of connections; each operation
//!   checks one out for its whole duration.
//!
//! Both strategies execute batches and transactions as a single request, so
//! an entire MULTI/EXEC conversation is served by exactly one connection.

use crate::commands::Command;
use crate::connection::Connection;
use bytes::Bytes;
use redwire_core::{ConnectionConfig, Error, NodeAddr, PoolStrategy, Result, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, Mutex, OwnedSemaphorePermit, Semaphore};
use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

enum Request {
    Call {
        command: Command,
        asking: bool,
        reply: oneshot::Sender<Result<Value>>,
    },
    Batch {
        commands: Vec<Command>,
        reply: oneshot::Sender<Result<Vec<Result<Value>>>>,
    },
    Transaction {
        watch: Vec<Bytes>,
        commands: Vec<Command>,
        reply: oneshot::Sender<Result<Vec<Result<Value>>>>,
    },
}

/// Single shared connection behind an actor task.
pub struct MultiplexedPool {
    tx: mpsc::UnboundedSender<Request>,
}

impl MultiplexedPool {
    /// Connect eagerly and spawn the actor.
    pub async fn new(addr: NodeAddr, config: ConnectionConfig) -> Result<Self> {
        let conn = Connection::connect(&addr, &config).await?;
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(actor(conn, rx, addr, config));
        Ok(Self { tx })
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<Result<T>>) -> Request,
    ) -> Result<T> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(build(reply_tx))
            .map_err(|_| Error::Pool("connection task has shut down".to_string()))?;
        reply_rx
            .await
            .map_err(|_| Error::Pool("connection task dropped the request".to_string()))?
    }
}

async fn actor(
    conn: Connection,
    mut rx: mpsc::UnboundedReceiver<Request>,
    addr: NodeAddr,
    config: ConnectionConfig,
) {
    let mut conn = Some(conn);

    while let Some(request) = rx.recv().await {
        if conn.is_none() {
            conn = reconnect(&addr, &config).await;
        }

        let Some(active) = conn.as_mut() else {
            respond_unavailable(request, &addr);
            continue;
        };

        match request {
            Request::Call {
                command,
                asking,
                reply,
            } => {
                let result = if asking {
                    active.call_asking(&command).await
                } else {
                    active.call(&command).await
                };
                if is_fatal(&result) {
                    conn = None;
                }
                let _ = reply.send(result);
            }
            Request::Batch { commands, reply } => {
                let result = active.call_batch(&commands).await;
                if is_fatal(&result) {
                    conn = None;
                }
                let _ = reply.send(result);
            }
            Request::Transaction {
                watch,
                commands,
                reply,
            } => {
                let result = active.call_transaction(&watch, &commands).await;
                if is_fatal(&result) {
                    conn = None;
                }
                let _ = reply.send(result);
            }
        }
    }

    debug!(%addr, "connection actor stopped");
}

fn is_fatal<T>(result: &Result<T>) -> bool {
    matches!(result, Err(e) if e.is_connection_fatal())
}

fn respond_unavailable(request: Request, addr: &NodeAddr) {
    let error = || Error::Connection(format!("no connection to {addr}"));
    match request {
        Request::Call { reply, .. } => {
            let _ = reply.send(Err(error()));
        }
        Request::Batch { reply, .. } | Request::Transaction { reply, .. } => {
            let _ = reply.send(Err(error()));
        }
    }
}

async fn reconnect(addr: &NodeAddr, config: &ConnectionConfig) -> Option<Connection> {
    if !config.reconnect.enabled {
        return None;
    }

    let mut delay = config.reconnect.initial_delay;
    let mut attempt = 0usize;
    loop {
        attempt += 1;
        if let Some(max) = config.reconnect.max_attempts {
            if attempt > max {
                warn!(%addr, attempts = attempt - 1, "giving up on reconnect");
                return None;
            }
        }

        sleep(delay).await;
        match Connection::connect(addr, config).await {
            Ok(conn) => {
                debug!(%addr, attempt, "reconnected");
                return Some(conn);
            }
            Err(e) => {
                warn!(%addr, attempt, error = %e, "reconnect attempt failed");
                let scaled = delay.as_secs_f64() * config.reconnect.backoff_factor;
                delay = Duration::from_secs_f64(scaled).min(config.reconnect.max_delay);
            }
        }
    }
}

/// Semaphore-bounded set of connections, checked out per operation.
pub struct CheckoutPool {
    idle: Mutex<Vec<Connection>>,
    permits: Arc<Semaphore>,
    addr: NodeAddr,
    config: ConnectionConfig,
}

impl CheckoutPool {
    /// Open `min_idle` connections eagerly (at least one, to fail fast).
    pub async fn new(addr: NodeAddr, config: ConnectionConfig) -> Result<Self> {
        let max_size = config.pool.max_size.max(1);
        let initial = config.pool.min_idle.clamp(1, max_size);
        let mut idle = Vec::with_capacity(initial);
        for _ in 0..initial {
            idle.push(Connection::connect(&addr, &config).await?);
        }

        Ok(Self {
            idle: Mutex::new(idle),
            permits: Arc::new(Semaphore::new(max_size)),
            addr,
            config,
        })
    }

    async fn acquire(&self) -> Result<(Connection, OwnedSemaphorePermit)> {
        let permit = timeout(
            self.config.pool.acquire_timeout,
            Arc::clone(&self.permits).acquire_owned(),
        )
        .await
        .map_err(|_| Error::Pool("timed out waiting for a connection".to_string()))?
        .map_err(|_| Error::Pool("pool has shut down".to_string()))?;

        let conn = match self.idle.lock().await.pop() {
            Some(conn) => conn,
            None => Connection::connect(&self.addr, &self.config).await?,
        };
        Ok((conn, permit))
    }

    /// Return a connection after use; broken ones are dropped instead.
    async fn release<T>(&self, conn: Connection, result: &Result<T>) {
        if !is_fatal(result) {
            self.idle.lock().await.push(conn);
        }
    }

    async fn call(&self, command: &Command, asking: bool) -> Result<Value> {
        let (mut conn, _permit) = self.acquire().await?;
        let result = if asking {
            conn.call_asking(command).await
        } else {
            conn.call(command).await
        };
        self.release(conn, &result).await;
        result
    }

    async fn batch(&self, commands: &[Command]) -> Result<Vec<Result<Value>>> {
        let (mut conn, _permit) = self.acquire().await?;
        let result = conn.call_batch(commands).await;
        self.release(conn, &result).await;
        result
    }

    async fn transaction(
        &self,
        watch: &[Bytes],
        commands: &[Command],
    ) -> Result<Vec<Result<Value>>> {
        let (mut conn, _permit) = self.acquire().await?;
        let result = conn.call_transaction(watch, commands).await;
        self.release(conn, &result).await;
        result
    }
}

/// A pool of either strategy, for one node.
pub enum Pool {
    /// Actor-owned shared connection.
    Multiplexed(MultiplexedPool),
    /// Checked-out connections.
    Checkout(CheckoutPool),
}

impl Pool {
    /// Build the strategy the configuration asks for.
    pub async fn new(addr: NodeAddr, config: ConnectionConfig) -> Result<Self> {
        match config.pool.strategy {
            PoolStrategy::Multiplexed => {
                Ok(Self::Multiplexed(MultiplexedPool::new(addr, config).await?))
            }
            PoolStrategy::Checkout => Ok(Self::Checkout(CheckoutPool::new(addr, config).await?)),
        }
    }

    /// Execute one command. With `asking`, an ASKING frame precedes it on the
    /// same connection.
    pub async fn call(&self, command: Command, asking: bool) -> Result<Value> {
        match self {
            Self::Multiplexed(pool) => {
                pool.request(|reply| Request::Call {
                    command,
                    asking,
                    reply,
                })
                .await
            }
            Self::Checkout(pool) => pool.call(&command, asking).await,
        }
    }

    /// Execute a pipelined batch on one connection.
    pub async fn batch(&self, commands: Vec<Command>) -> Result<Vec<Result<Value>>> {
        match self {
            Self::Multiplexed(pool) => {
                pool.request(|reply| Request::Batch { commands, reply }).await
            }
            Self::Checkout(pool) => pool.batch(&commands).await,
        }
    }

    /// Execute a WATCH/MULTI/EXEC conversation on one connection.
    pub async fn transaction(
        &self,
        watch: Vec<Bytes>,
        commands: Vec<Command>,
    ) -> Result<Vec<Result<Value>>> {
        match self {
            Self::Multiplexed(pool) => {
                pool.request(|reply| Request::Transaction {
                    watch,
                    commands,
                    reply,
                })
                .await
            }
            Self::Checkout(pool) => pool.transaction(&watch, &commands).await,
        }
    }
}
