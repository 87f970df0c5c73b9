//! Pipelined execution with deferred results.
//!
//! Queueing a command against a [`Pipeline`] does not touch the network; it
//! returns a typed [`Deferred`] placeholder. [`Pipeline::flush`] sends every
//! queued command in one round trip and distributes the replies to the
//! placeholders **in issue order**; each placeholder then converts its reply
//! to the requested native type on [`Deferred::take`].
//!
//! Error routing is per-slot: a server error for one command resolves only
//! that command's handle, while a transport failure resolves every handle
//! (and fails the flush itself).
//!
//! ```no_run
//! use redwire::{Client, ConnectionConfig};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let client = Client::connect(ConnectionConfig::new("redis://localhost:6379")).await?;
//!
//! let mut pipe = client.pipeline();
//! pipe.set("a", "1");
//! let a = pipe.get("a");
//! let hits = pipe.incr("hits");
//! pipe.flush().await?;
//!
//! assert_eq!(a.take()?.as_deref(), Some("1"));
//! println!("hits: {}", hits.take()?);
//! # Ok(())
//! # }
//! ```

use crate::commands::{self, Command, SetOptions};
use async_trait::async_trait;
use bytes::Bytes;
use redwire_core::{Error, FromValue, Result, ToArg, Value};
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;

/// Executes whole batches on a single connection.
///
/// Implemented by [`Client`](crate::Client) for both topologies; tests
/// substitute mocks.
#[async_trait]
pub trait BatchExecutor: Send + Sync {
    /// Send every command in one round trip; one result per command, in
    /// order.
    async fn run_batch(&self, commands: Vec<Command>) -> Result<Vec<Result<Value>>>;

    /// Run `WATCH* MULTI <commands> EXEC` on one connection; one result per
    /// queued command, in order.
    async fn run_transaction(
        &self,
        watch: Vec<Bytes>,
        commands: Vec<Command>,
    ) -> Result<Vec<Result<Value>>>;
}

/// Placeholder for a result that materialises when its batch completes.
#[derive(Debug)]
pub struct Deferred<T> {
    rx: oneshot::Receiver<Result<Value>>,
    _type: PhantomData<fn() -> T>,
}

impl<T: FromValue> Deferred<T> {
    pub(crate) fn new(rx: oneshot::Receiver<Result<Value>>) -> Self {
        Self {
            rx,
            _type: PhantomData,
        }
    }

    /// Resolve the placeholder into its converted value.
    ///
    /// # Errors
    ///
    /// - [`Error::ResultPending`] when the batch has not been flushed yet
    /// - [`Error::BatchDiscarded`] when the batch was dropped unflushed
    /// - the command's own error, or a conversion error, otherwise
    pub fn take(mut self) -> Result<T> {
        use oneshot::error::TryRecvError;
        match self.rx.try_recv() {
            Ok(result) => result.and_then(T::from_value),
            Err(TryRecvError::Empty) => Err(Error::ResultPending),
            Err(TryRecvError::Closed) => Err(Error::BatchDiscarded),
        }
    }

    /// Resolve the placeholder into the raw reply, skipping conversion.
    ///
    /// # Errors
    ///
    /// Same availability errors as [`Deferred::take`].
    pub fn raw(mut self) -> Result<Value> {
        use oneshot::error::TryRecvError;
        match self.rx.try_recv() {
            Ok(result) => result,
            Err(TryRecvError::Empty) => Err(Error::ResultPending),
            Err(TryRecvError::Closed) => Err(Error::BatchDiscarded),
        }
    }
}

pub(crate) struct Slot {
    pub(crate) command: Command,
    pub(crate) tx: oneshot::Sender<Result<Value>>,
}

/// Distribute batch results to their handles, in issue order.
pub(crate) fn settle(senders: Vec<oneshot::Sender<Result<Value>>>, outcome: Result<Vec<Result<Value>>>) -> Result<()> {
    match outcome {
        Ok(results) => {
            if results.len() != senders.len() {
                let err = Error::Protocol(format!(
                    "batch returned {} results for {} commands",
                    results.len(),
                    senders.len()
                ));
                for tx in senders {
                    let _ = tx.send(Err(err.replicate()));
                }
                return Err(err);
            }
            for (tx, result) in senders.into_iter().zip(results) {
                let _ = tx.send(result);
            }
            Ok(())
        }
        Err(e) => {
            for tx in senders {
                let _ = tx.send(Err(e.replicate()));
            }
            Err(e)
        }
    }
}

/// A batch of commands flushed in one round trip.
pub struct Pipeline {
    executor: Arc<dyn BatchExecutor>,
    slots: Vec<Slot>,
}

impl Pipeline {
    /// Create an empty pipeline over the given executor.
    pub fn new(executor: Arc<dyn BatchExecutor>) -> Self {
        Self {
            executor,
            slots: Vec::new(),
        }
    }

    /// Queue an arbitrary command, receiving a typed placeholder.
    pub fn queue<T: FromValue>(&mut self, command: Command) -> Deferred<T> {
        let (tx, rx) = oneshot::channel();
        self.slots.push(Slot { command, tx });
        Deferred::new(rx)
    }

    /// Number of queued commands.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Drop everything queued so far. Outstanding handles resolve to
    /// [`Error::BatchDiscarded`].
    pub fn clear(&mut self) {
        self.slots.clear();
    }

    /// Send the batch and resolve every placeholder.
    ///
    /// # Errors
    ///
    /// Fails on transport or protocol failure; per-command server errors do
    /// not fail the flush, they surface through the owning handle.
    pub async fn flush(self) -> Result<()> {
        if self.slots.is_empty() {
            return Ok(());
        }
        let (commands, senders): (Vec<_>, Vec<_>) = self
            .slots
            .into_iter()
            .map(|slot| (slot.command, slot.tx))
            .unzip();
        let outcome = self.executor.run_batch(commands).await;
        settle(senders, outcome)
    }

    /// Send the batch and return the raw results positionally, bypassing
    /// the handle mechanism.
    ///
    /// # Errors
    ///
    /// Fails on transport or protocol failure.
    pub async fn flush_values(self) -> Result<Vec<Result<Value>>> {
        if self.slots.is_empty() {
            return Ok(Vec::new());
        }
        let commands: Vec<Command> = self
            .slots
            .into_iter()
            .map(|slot| slot.command)
            .collect();
        self.executor.run_batch(commands).await
    }

    // Typed conveniences for the common commands. Anything not covered is a
    // `queue(Command::new(...))` away.

    /// Queue GET.
    pub fn get(&mut self, key: impl ToArg) -> Deferred<Option<String>> {
        self.queue(commands::get(key))
    }

    /// Queue SET.
    pub fn set(&mut self, key: impl ToArg, value: impl ToArg) -> Deferred<bool> {
        self.queue(commands::set(key, value))
    }

    /// Queue SET with options.
    pub fn set_with(
        &mut self,
        key: impl ToArg,
        value: impl ToArg,
        options: &SetOptions,
    ) -> Deferred<bool> {
        self.queue(commands::set_with(key, value, options))
    }

    /// Queue DEL.
    pub fn del<K: ToArg>(&mut self, keys: &[K]) -> Deferred<i64> {
        self.queue(commands::del(keys))
    }

    /// Queue EXISTS.
    pub fn exists<K: ToArg>(&mut self, keys: &[K]) -> Deferred<i64> {
        self.queue(commands::exists(keys))
    }

    /// Queue EXPIRE.
    pub fn expire(&mut self, key: impl ToArg, ttl: Duration) -> Deferred<bool> {
        self.queue(commands::expire(key, ttl))
    }

    /// Queue TTL.
    pub fn ttl(&mut self, key: impl ToArg) -> Deferred<i64> {
        self.queue(commands::ttl(key))
    }

    /// Queue INCR.
    pub fn incr(&mut self, key: impl ToArg) -> Deferred<i64> {
        self.queue(commands::incr(key))
    }

    /// Queue DECR.
    pub fn decr(&mut self, key: impl ToArg) -> Deferred<i64> {
        self.queue(commands::decr(key))
    }

    /// Queue INCRBY.
    pub fn incr_by(&mut self, key: impl ToArg, delta: i64) -> Deferred<i64> {
        self.queue(commands::incr_by(key, delta))
    }

    /// Queue HGET.
    pub fn hget(&mut self, key: impl ToArg, field: impl ToArg) -> Deferred<Option<String>> {
        self.queue(commands::hash::hget(key, field))
    }

    /// Queue HSET.
    pub fn hset<F: ToArg, V: ToArg>(
        &mut self,
        key: impl ToArg,
        entries: &[(F, V)],
    ) -> Deferred<i64> {
        self.queue(commands::hash::hset(key, entries))
    }

    /// Queue LPUSH.
    pub fn lpush<V: ToArg>(&mut self, key: impl ToArg, elements: &[V]) -> Deferred<i64> {
        self.queue(commands::list::lpush(key, elements))
    }

    /// Queue RPUSH.
    pub fn rpush<V: ToArg>(&mut self, key: impl ToArg, elements: &[V]) -> Deferred<i64> {
        self.queue(commands::list::rpush(key, elements))
    }

    /// Queue SADD.
    pub fn sadd<M: ToArg>(&mut self, key: impl ToArg, members: &[M]) -> Deferred<i64> {
        self.queue(commands::set::sadd(key, members))
    }
}
