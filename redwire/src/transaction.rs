//! Transactions (WATCH/MULTI/EXEC) with deferred results.
//!
//! A [`Transaction`] queues commands exactly like a pipeline and shares its
//! deferral mechanism: every queued command hands back a typed
//! [`Deferred`] placeholder. [`Transaction::exec`] ships the entire
//! `WATCH* MULTI <commands> EXEC` conversation to a single connection in one
//! round trip and distributes the EXEC reply array to the placeholders in
//! issue order.
//!
//! When EXEC answers nil - a watched key changed - every outstanding handle
//! resolves to [`Error::TransactionAborted`] and `exec` itself reports the
//! abort, so both positional and handle-based callers see it.
//!
//! ```no_run
//! use redwire::{Client, ConnectionConfig};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let client = Client::connect(ConnectionConfig::new("redis://localhost:6379")).await?;
//!
//! let mut txn = client.transaction();
//! txn.watch("balance");
//! let balance = txn.incr_by("balance", -25);
//! txn.set("last-debit", "25");
//! txn.exec().await?;
//!
//! println!("balance now {}", balance.take()?);
//! # Ok(())
//! # }
//! ```

use crate::commands::{self, Command, SetOptions};
use crate::pipeline::{settle, BatchExecutor, Deferred, Slot};
use bytes::Bytes;
use redwire_core::{FromValue, Result, ToArg, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;

/// A MULTI/EXEC transaction under construction.
pub struct Transaction {
    executor: Arc<dyn BatchExecutor>,
    watch: Vec<Bytes>,
    slots: Vec<Slot>,
}

impl Transaction {
    /// Create an empty transaction over the given executor.
    pub fn new(executor: Arc<dyn BatchExecutor>) -> Self {
        Self {
            executor,
            watch: Vec::new(),
            slots: Vec::new(),
        }
    }

    /// Guard the transaction on a key: if it changes between WATCH and EXEC,
    /// the transaction aborts instead of running.
    pub fn watch(&mut self, key: impl ToArg) -> &mut Self {
        self.watch.push(key.to_arg());
        self
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

    /// Abandon the transaction without talking to the server.
    ///
    /// Nothing has been sent yet (the whole conversation happens inside
    /// [`Transaction::exec`]), so discarding is purely local; outstanding
    /// handles resolve to [`Error::BatchDiscarded`](redwire_core::Error::BatchDiscarded).
    pub fn discard(self) {
        drop(self);
    }

    /// Run the transaction and resolve every placeholder.
    ///
    /// # Errors
    ///
    /// - [`Error::TransactionAborted`](redwire_core::Error::TransactionAborted)
    ///   when a watched key changed; every handle resolves to the same error
    /// - a queued command's own rejection when the server refused to queue it
    /// - transport and protocol failures
    pub async fn exec(self) -> Result<()> {
        if self.slots.is_empty() && self.watch.is_empty() {
            return Ok(());
        }
        let (commands, senders): (Vec<_>, Vec<_>) = self
            .slots
            .into_iter()
            .map(|slot| (slot.command, slot.tx))
            .unzip();
        let outcome = self.executor.run_transaction(self.watch, commands).await;
        settle(senders, outcome)
    }

    // Typed conveniences, mirroring the pipeline surface.

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

    /// Queue EXPIRE.
    pub fn expire(&mut self, key: impl ToArg, ttl: Duration) -> Deferred<bool> {
        self.queue(commands::expire(key, ttl))
    }

    /// Queue INCR.
    pub fn incr(&mut self, key: impl ToArg) -> Deferred<i64> {
        self.queue(commands::incr(key))
    }

    /// Queue INCRBY.
    pub fn incr_by(&mut self, key: impl ToArg, delta: i64) -> Deferred<i64> {
        self.queue(commands::incr_by(key, delta))
    }

    /// Queue HSET.
    pub fn hset<F: ToArg, V: ToArg>(
        &mut self,
        key: impl ToArg,
        entries: &[(F, V)],
    ) -> Deferred<i64> {
        self.queue(commands::hash::hset(key, entries))
    }

    /// Queue SADD.
    pub fn sadd<M: ToArg>(&mut self, key: impl ToArg, members: &[M]) -> Deferred<i64> {
        self.queue(commands::set::sadd(key, members))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use redwire_core::Error;

    enum Script {
        Results(Vec<Result<Value>>),
        Aborted,
    }

    struct MockExecutor {
        script: std::sync::Mutex<Option<Script>>,
        watched: std::sync::Mutex<Vec<Bytes>>,
    }

    impl MockExecutor {
        fn new(script: Script) -> Self {
            Self {
                script: std::sync::Mutex::new(Some(script)),
                watched: std::sync::Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl BatchExecutor for MockExecutor {
        async fn run_batch(&self, _commands: Vec<Command>) -> Result<Vec<Result<Value>>> {
            unreachable!("transactions never use the plain batch path")
        }

        async fn run_transaction(
            &self,
            watch: Vec<Bytes>,
            commands: Vec<Command>,
        ) -> Result<Vec<Result<Value>>> {
            *self.watched.lock().unwrap() = watch;
            match self.script.lock().unwrap().take().unwrap() {
                Script::Results(results) => {
                    assert_eq!(results.len(), commands.len());
                    Ok(results)
                }
                Script::Aborted => Err(Error::TransactionAborted),
            }
        }
    }

    #[tokio::test]
    async fn exec_distributes_results_in_order() {
        let executor = Arc::new(MockExecutor::new(Script::Results(vec![
            Ok(Value::ok()),
            Ok(Value::Int(75)),
        ])));
        let mut txn = Transaction::new(executor.clone());

        let set = txn.set("last-debit", "25");
        let balance = txn.incr_by("balance", -25);
        txn.exec().await.unwrap();

        assert!(set.take().unwrap());
        assert_eq!(balance.take().unwrap(), 75);
    }

    #[tokio::test]
    async fn watch_keys_reach_the_executor() {
        let executor = Arc::new(MockExecutor::new(Script::Results(vec![Ok(Value::ok())])));
        let mut txn = Transaction::new(executor.clone());
        txn.watch("balance").watch("audit");
        txn.set("k", "v");
        txn.exec().await.unwrap();

        let watched = executor.watched.lock().unwrap();
        assert_eq!(watched.as_slice(), &[Bytes::from("balance"), Bytes::from("audit")]);
    }

    #[tokio::test]
    async fn abort_reaches_exec_and_every_handle() {
        let executor = Arc::new(MockExecutor::new(Script::Aborted));
        let mut txn = Transaction::new(executor);
        txn.watch("balance");
        let a = txn.incr("balance");
        let b = txn.set("log", "x");

        assert!(matches!(
            txn.exec().await,
            Err(Error::TransactionAborted)
        ));
        assert!(matches!(a.take(), Err(Error::TransactionAborted)));
        assert!(matches!(b.take(), Err(Error::TransactionAborted)));
    }

    #[tokio::test]
    async fn discard_is_local_and_releases_handles() {
        let executor = Arc::new(MockExecutor::new(Script::Results(vec![])));
        let mut txn = Transaction::new(executor);
        let handle = txn.incr("n");
        txn.discard();
        assert!(matches!(handle.take(), Err(Error::BatchDiscarded)));
    }

    #[tokio::test]
    async fn take_before_exec_is_pending() {
        let executor = Arc::new(MockExecutor::new(Script::Results(vec![])));
        let mut txn = Transaction::new(executor);
        let handle = txn.incr("n");
        assert!(matches!(handle.take(), Err(Error::ResultPending)));
        txn.discard();
    }
}
