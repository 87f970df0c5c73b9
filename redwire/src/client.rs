//! The high-level client.
//!
//! [`Client::connect`] figures out what it is talking to - sentinel-fronted,
//! standalone or cluster - and from then on every typed method goes through
//! one `run` path that handles routing and MOVED/ASK redirects. The client
//! is cheap to clone; clones share pools.

use crate::cluster::{key_slot, SlotMap};
use crate::commands::{self, Command, SetOptions, ZAddOptions};
use crate::connection::{Connection, TopologyKind};
use crate::pipeline::{BatchExecutor, Pipeline};
use crate::pool::Pool;
use crate::pubsub::Subscriber;
use crate::script::Script;
use crate::sentinel;
use crate::transaction::Transaction;
use async_trait::async_trait;
use bytes::Bytes;
use redwire_core::{
    convert, ConnectionConfig, Error, FromValue, NodeAddr, Result, ServerErrorKind, ToArg,
    TopologyMode, Value,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// An async Redis client for standalone, sentinel-fronted and clustered
/// deployments.
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    config: ConnectionConfig,
    mode: Mode,
}

enum Mode {
    Standalone { addr: NodeAddr, pool: Arc<Pool> },
    Cluster(ClusterState),
}

struct ClusterState {
    seeds: Vec<NodeAddr>,
    slots: RwLock<SlotMap>,
    pools: RwLock<HashMap<NodeAddr, Arc<Pool>>>,
}

impl Client {
    /// Connect according to the configuration.
    ///
    /// With a sentinel section, the master is resolved first and the client
    /// behaves as standalone against it. Otherwise the topology is forced or
    /// probed per [`TopologyMode`].
    pub async fn connect(config: ConnectionConfig) -> Result<Self> {
        if let Some(sentinel_config) = config.sentinel.clone() {
            let master = sentinel::resolve_master(&sentinel_config, &config).await?;
            info!(%master, master_name = %sentinel_config.master_name, "connecting to sentinel-resolved master");
            return Self::connect_standalone(master, config).await;
        }

        let endpoints = config.endpoints();
        let Some(first) = endpoints.first().cloned() else {
            return Err(Error::Config("no endpoints in connection url".to_string()));
        };

        let kind = match config.topology {
            TopologyMode::Standalone => TopologyKind::Standalone,
            TopologyMode::Cluster => TopologyKind::Cluster,
            TopologyMode::Auto => {
                let mut probe = Connection::connect(&first, &config).await?;
                probe.probe_topology().await?
            }
        };

        match kind {
            TopologyKind::Standalone => Self::connect_standalone(first, config).await,
            TopologyKind::Cluster => Self::connect_cluster(endpoints, config).await,
        }
    }

    async fn connect_standalone(addr: NodeAddr, config: ConnectionConfig) -> Result<Self> {
        debug!(%addr, "connecting standalone");
        let pool = Pool::new(addr.clone(), config.clone()).await?;
        Ok(Self {
            inner: Arc::new(ClientInner {
                config,
                mode: Mode::Standalone {
                    addr,
                    pool: Arc::new(pool),
                },
            }),
        })
    }

    async fn connect_cluster(seeds: Vec<NodeAddr>, config: ConnectionConfig) -> Result<Self> {
        let mut pools = HashMap::new();
        let mut reachable = None;
        for seed in &seeds {
            match Pool::new(seed.clone(), config.clone()).await {
                Ok(pool) => {
                    pools.insert(seed.clone(), Arc::new(pool));
                    reachable = Some(seed.clone());
                    break;
                }
                Err(e) => warn!(seed = %seed, error = %e, "cluster seed unreachable"),
            }
        }
        if reachable.is_none() {
            return Err(Error::Cluster("no cluster seed reachable".to_string()));
        }

        let client = Self {
            inner: Arc::new(ClientInner {
                config,
                mode: Mode::Cluster(ClusterState {
                    seeds,
                    slots: RwLock::new(SlotMap::new()),
                    pools: RwLock::new(pools),
                }),
            }),
        };

        // Best effort: MOVED redirects will fill in whatever this misses.
        if let Err(e) = client.refresh_slots().await {
            warn!(error = %e, "initial slot refresh failed");
        }
        Ok(client)
    }

    /// Whether the client is talking to a cluster.
    #[must_use]
    pub fn topology(&self) -> TopologyKind {
        match self.inner.mode {
            Mode::Standalone { .. } => TopologyKind::Standalone,
            Mode::Cluster(_) => TopologyKind::Cluster,
        }
    }

    /// Re-read the slot table from the cluster (no-op for standalone).
    pub async fn refresh_slots(&self) -> Result<()> {
        let Mode::Cluster(state) = &self.inner.mode else {
            return Ok(());
        };

        let addr = state.some_node().await;
        let pool = self.node_pool(state, &addr).await?;
        let reply = pool
            .call(Command::new("CLUSTER").arg("SLOTS"), false)
            .await?;
        let map = SlotMap::from_cluster_slots(reply)?;
        debug!(assignments = map.len(), "slot table refreshed");
        *state.slots.write().await = map;
        Ok(())
    }

    /// Execute a raw command and convert its reply.
    ///
    /// The escape hatch for commands without a typed method:
    ///
    /// ```no_run
    /// # use redwire::{Client, Command, ConnectionConfig};
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// # let client = Client::connect(ConnectionConfig::new("redis://localhost")).await?;
    /// let size: i64 = client.command(Command::new("DBSIZE")).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn command<T: FromValue>(&self, command: Command) -> Result<T> {
        T::from_value(self.run(command).await?)
    }

    async fn run(&self, command: Command) -> Result<Value> {
        match &self.inner.mode {
            Mode::Standalone { pool, .. } => pool.call(command, false).await,
            Mode::Cluster(state) => self.run_clustered(state, command).await,
        }
    }

    async fn run_clustered(&self, state: &ClusterState, command: Command) -> Result<Value> {
        let mut target = match command.routing_key() {
            Some(key) => state.slots.read().await.lookup(key_slot(key)).cloned(),
            None => None,
        };
        let mut asking = false;
        let max_redirects = self.inner.config.max_redirects;

        for attempt in 0..=max_redirects {
            let addr = match target.clone() {
                Some(addr) => addr,
                None => state.some_node().await,
            };
            let pool = self.node_pool(state, &addr).await?;

            match pool.call(command.clone(), asking).await {
                Ok(value) => return Ok(value),
                Err(Error::Moved { slot, host, port }) if attempt < max_redirects => {
                    let next = NodeAddr::new(host, port);
                    debug!(slot, node = %next, "following MOVED");
                    state.slots.write().await.apply_moved(slot, next.clone());
                    target = Some(next);
                    asking = false;
                }
                Err(Error::Ask { slot, host, port }) if attempt < max_redirects => {
                    let next = NodeAddr::new(host, port);
                    debug!(slot, node = %next, "following ASK");
                    target = Some(next);
                    asking = true;
                }
                Err(e) if e.is_redirect() => return Err(Error::MaxRedirects(max_redirects)),
                Err(e) => return Err(e),
            }
        }
        Err(Error::MaxRedirects(max_redirects))
    }

    async fn node_pool(&self, state: &ClusterState, addr: &NodeAddr) -> Result<Arc<Pool>> {
        if let Some(pool) = state.pools.read().await.get(addr) {
            return Ok(Arc::clone(pool));
        }

        let mut pools = state.pools.write().await;
        if let Some(pool) = pools.get(addr) {
            return Ok(Arc::clone(pool));
        }
        let pool = Arc::new(Pool::new(addr.clone(), self.inner.config.clone()).await?);
        pools.insert(addr.clone(), Arc::clone(&pool));
        Ok(pool)
    }

    /// Pool serving a batch, chosen by the first keyed command.
    async fn batch_pool(&self, commands: &[Command]) -> Result<Arc<Pool>> {
        match &self.inner.mode {
            Mode::Standalone { pool, .. } => Ok(Arc::clone(pool)),
            Mode::Cluster(state) => {
                let target = match commands.iter().find_map(Command::routing_key) {
                    Some(key) => state
                        .slots
                        .read()
                        .await
                        .lookup(key_slot(key))
                        .cloned()
                        .unwrap_or(state.some_node().await),
                    None => state.some_node().await,
                };
                self.node_pool(state, &target).await
            }
        }
    }

    /// Start an empty pipeline.
    #[must_use]
    pub fn pipeline(&self) -> Pipeline {
        Pipeline::new(Arc::new(self.clone()))
    }

    /// Start an empty transaction.
    #[must_use]
    pub fn transaction(&self) -> Transaction {
        Transaction::new(Arc::new(self.clone()))
    }

    /// Open a dedicated subscription connection.
    pub async fn subscriber(&self) -> Result<Subscriber> {
        let addr = match &self.inner.mode {
            Mode::Standalone { addr, .. } => addr.clone(),
            Mode::Cluster(state) => state.some_node().await,
        };
        Subscriber::connect(&addr, &self.inner.config).await
    }

    // --- keys and strings ------------------------------------------------

    /// PING; errors if the server answers anything but PONG.
    pub async fn ping(&self) -> Result<()> {
        let reply = self.run(commands::ping()).await?;
        match reply {
            Value::Simple(ref s) if s == "PONG" => Ok(()),
            other => Err(Error::Conversion(format!(
                "unexpected PING reply: {other:?}"
            ))),
        }
    }

    /// ECHO.
    pub async fn echo(&self, message: impl ToArg) -> Result<String> {
        self.command(commands::echo(message)).await
    }

    /// GET as a UTF-8 string; `None` when the key is missing.
    pub async fn get(&self, key: impl ToArg) -> Result<Option<String>> {
        self.command(commands::get(key)).await
    }

    /// GET as raw bytes; `None` when the key is missing.
    pub async fn get_bytes(&self, key: impl ToArg) -> Result<Option<Bytes>> {
        self.command(commands::get(key)).await
    }

    /// SET.
    pub async fn set(&self, key: impl ToArg, value: impl ToArg) -> Result<()> {
        self.command(commands::set(key, value)).await
    }

    /// SET with options; `false` when an NX/XX condition was not met.
    pub async fn set_with(
        &self,
        key: impl ToArg,
        value: impl ToArg,
        options: &SetOptions,
    ) -> Result<bool> {
        self.command(commands::set_with(key, value, options)).await
    }

    /// DEL; number of keys removed.
    pub async fn del<K: ToArg + Sync>(&self, keys: &[K]) -> Result<i64> {
        self.command(commands::del(keys)).await
    }

    /// UNLINK; number of keys queued for reclamation.
    pub async fn unlink<K: ToArg + Sync>(&self, keys: &[K]) -> Result<i64> {
        self.command(commands::unlink(keys)).await
    }

    /// EXISTS; how many of the given keys exist.
    pub async fn exists<K: ToArg + Sync>(&self, keys: &[K]) -> Result<i64> {
        self.command(commands::exists(keys)).await
    }

    /// EXPIRE; `false` when the key does not exist.
    pub async fn expire(&self, key: impl ToArg, ttl: Duration) -> Result<bool> {
        self.command(commands::expire(key, ttl)).await
    }

    /// PEXPIRE; `false` when the key does not exist.
    pub async fn pexpire(&self, key: impl ToArg, ttl: Duration) -> Result<bool> {
        self.command(commands::pexpire(key, ttl)).await
    }

    /// PERSIST; `false` when the key had no TTL.
    pub async fn persist(&self, key: impl ToArg) -> Result<bool> {
        self.command(commands::persist(key)).await
    }

    /// TTL in seconds; -1 means no expiry, -2 means no such key.
    pub async fn ttl(&self, key: impl ToArg) -> Result<i64> {
        self.command(commands::ttl(key)).await
    }

    /// INCR.
    pub async fn incr(&self, key: impl ToArg) -> Result<i64> {
        self.command(commands::incr(key)).await
    }

    /// DECR.
    pub async fn decr(&self, key: impl ToArg) -> Result<i64> {
        self.command(commands::decr(key)).await
    }

    /// INCRBY.
    pub async fn incr_by(&self, key: impl ToArg, delta: i64) -> Result<i64> {
        self.command(commands::incr_by(key, delta)).await
    }

    /// DECRBY.
    pub async fn decr_by(&self, key: impl ToArg, delta: i64) -> Result<i64> {
        self.command(commands::decr_by(key, delta)).await
    }

    /// APPEND; length of the value afterwards.
    pub async fn append(&self, key: impl ToArg, value: impl ToArg) -> Result<i64> {
        self.command(commands::append(key, value)).await
    }

    /// STRLEN.
    pub async fn strlen(&self, key: impl ToArg) -> Result<i64> {
        self.command(commands::strlen(key)).await
    }

    /// MGET; one entry per key, missing keys are `None`.
    pub async fn mget<K: ToArg + Sync>(&self, keys: &[K]) -> Result<Vec<Option<String>>> {
        self.command(commands::mget(keys)).await
    }

    /// MSET.
    pub async fn mset<K: ToArg + Sync, V: ToArg + Sync>(&self, pairs: &[(K, V)]) -> Result<()> {
        self.command(commands::mset(pairs)).await
    }

    // --- hashes -----------------------------------------------------------

    /// HGET.
    pub async fn hget(&self, key: impl ToArg, field: impl ToArg) -> Result<Option<String>> {
        self.command(commands::hash::hget(key, field)).await
    }

    /// HSET; number of new fields.
    pub async fn hset<F: ToArg + Sync, V: ToArg + Sync>(
        &self,
        key: impl ToArg,
        entries: &[(F, V)],
    ) -> Result<i64> {
        self.command(commands::hash::hset(key, entries)).await
    }

    /// HSETNX; `false` when the field already existed.
    pub async fn hsetnx(
        &self,
        key: impl ToArg,
        field: impl ToArg,
        value: impl ToArg,
    ) -> Result<bool> {
        self.command(commands::hash::hsetnx(key, field, value)).await
    }

    /// HDEL; number of fields removed.
    pub async fn hdel<F: ToArg + Sync>(&self, key: impl ToArg, fields: &[F]) -> Result<i64> {
        self.command(commands::hash::hdel(key, fields)).await
    }

    /// HGETALL.
    pub async fn hgetall(&self, key: impl ToArg) -> Result<HashMap<String, String>> {
        self.command(commands::hash::hgetall(key)).await
    }

    /// HMGET; one entry per field, missing fields are `None`.
    pub async fn hmget<F: ToArg + Sync>(
        &self,
        key: impl ToArg,
        fields: &[F],
    ) -> Result<Vec<Option<String>>> {
        self.command(commands::hash::hmget(key, fields)).await
    }

    /// HLEN.
    pub async fn hlen(&self, key: impl ToArg) -> Result<i64> {
        self.command(commands::hash::hlen(key)).await
    }

    /// HEXISTS.
    pub async fn hexists(&self, key: impl ToArg, field: impl ToArg) -> Result<bool> {
        self.command(commands::hash::hexists(key, field)).await
    }

    /// HINCRBY.
    pub async fn hincr_by(&self, key: impl ToArg, field: impl ToArg, delta: i64) -> Result<i64> {
        self.command(commands::hash::hincr_by(key, field, delta)).await
    }

    /// HKEYS.
    pub async fn hkeys(&self, key: impl ToArg) -> Result<Vec<String>> {
        self.command(commands::hash::hkeys(key)).await
    }

    /// HVALS.
    pub async fn hvals(&self, key: impl ToArg) -> Result<Vec<String>> {
        self.command(commands::hash::hvals(key)).await
    }

    // --- lists ------------------------------------------------------------

    /// LPUSH; list length afterwards.
    pub async fn lpush<V: ToArg + Sync>(&self, key: impl ToArg, elements: &[V]) -> Result<i64> {
        self.command(commands::list::lpush(key, elements)).await
    }

    /// RPUSH; list length afterwards.
    pub async fn rpush<V: ToArg + Sync>(&self, key: impl ToArg, elements: &[V]) -> Result<i64> {
        self.command(commands::list::rpush(key, elements)).await
    }

    /// LPOP a single element.
    pub async fn lpop(&self, key: impl ToArg) -> Result<Option<String>> {
        self.command(commands::list::lpop(key, None)).await
    }

    /// LPOP up to `count` elements.
    pub async fn lpop_count(&self, key: impl ToArg, count: usize) -> Result<Vec<String>> {
        self.command(commands::list::lpop(key, Some(count))).await
    }

    /// RPOP a single element.
    pub async fn rpop(&self, key: impl ToArg) -> Result<Option<String>> {
        self.command(commands::list::rpop(key, None)).await
    }

    /// RPOP up to `count` elements.
    pub async fn rpop_count(&self, key: impl ToArg, count: usize) -> Result<Vec<String>> {
        self.command(commands::list::rpop(key, Some(count))).await
    }

    /// LLEN.
    pub async fn llen(&self, key: impl ToArg) -> Result<i64> {
        self.command(commands::list::llen(key)).await
    }

    /// LRANGE; `0, -1` is the whole list.
    pub async fn lrange(&self, key: impl ToArg, start: i64, stop: i64) -> Result<Vec<String>> {
        self.command(commands::list::lrange(key, start, stop)).await
    }

    /// LINDEX.
    pub async fn lindex(&self, key: impl ToArg, index: i64) -> Result<Option<String>> {
        self.command(commands::list::lindex(key, index)).await
    }

    /// LSET.
    pub async fn lset(&self, key: impl ToArg, index: i64, element: impl ToArg) -> Result<()> {
        self.command(commands::list::lset(key, index, element)).await
    }

    /// LREM; number of removed elements.
    pub async fn lrem(&self, key: impl ToArg, count: i64, element: impl ToArg) -> Result<i64> {
        self.command(commands::list::lrem(key, count, element)).await
    }

    // --- sets -------------------------------------------------------------

    /// SADD; number of new members.
    pub async fn sadd<M: ToArg + Sync>(&self, key: impl ToArg, members: &[M]) -> Result<i64> {
        self.command(commands::set::sadd(key, members)).await
    }

    /// SREM; number of removed members.
    pub async fn srem<M: ToArg + Sync>(&self, key: impl ToArg, members: &[M]) -> Result<i64> {
        self.command(commands::set::srem(key, members)).await
    }

    /// SCARD.
    pub async fn scard(&self, key: impl ToArg) -> Result<i64> {
        self.command(commands::set::scard(key)).await
    }

    /// SISMEMBER.
    pub async fn sismember(&self, key: impl ToArg, member: impl ToArg) -> Result<bool> {
        self.command(commands::set::sismember(key, member)).await
    }

    /// SMEMBERS.
    pub async fn smembers(&self, key: impl ToArg) -> Result<Vec<String>> {
        self.command(commands::set::smembers(key)).await
    }

    /// SPOP a single member.
    pub async fn spop(&self, key: impl ToArg) -> Result<Option<String>> {
        self.command(commands::set::spop(key, None)).await
    }

    /// SPOP up to `count` members.
    pub async fn spop_count(&self, key: impl ToArg, count: usize) -> Result<Vec<String>> {
        self.command(commands::set::spop(key, Some(count))).await
    }

    /// SRANDMEMBER.
    pub async fn srandmember(&self, key: impl ToArg) -> Result<Option<String>> {
        self.command(commands::set::srandmember(key, None)).await
    }

    /// SRANDMEMBER with a count; negative counts allow repeats.
    pub async fn srandmember_count(&self, key: impl ToArg, count: i64) -> Result<Vec<String>> {
        self.command(commands::set::srandmember(key, Some(count))).await
    }

    // --- sorted sets -------------------------------------------------------

    /// ZADD; number of added (or, with `count_changed`, changed) members.
    pub async fn zadd<M: ToArg + Sync>(
        &self,
        key: impl ToArg,
        options: ZAddOptions,
        members: &[(f64, M)],
    ) -> Result<i64> {
        self.command(commands::sorted_set::zadd(key, options, members))
            .await
    }

    /// ZSCORE.
    pub async fn zscore(&self, key: impl ToArg, member: impl ToArg) -> Result<Option<f64>> {
        self.command(commands::sorted_set::zscore(key, member)).await
    }

    /// ZCARD.
    pub async fn zcard(&self, key: impl ToArg) -> Result<i64> {
        self.command(commands::sorted_set::zcard(key)).await
    }

    /// ZRANGE.
    pub async fn zrange(&self, key: impl ToArg, start: i64, stop: i64) -> Result<Vec<String>> {
        self.command(commands::sorted_set::zrange(key, start, stop))
            .await
    }

    /// ZRANGE WITHSCORES.
    pub async fn zrange_with_scores(
        &self,
        key: impl ToArg,
        start: i64,
        stop: i64,
    ) -> Result<Vec<(String, f64)>> {
        let reply = self
            .run(commands::sorted_set::zrange_with_scores(key, start, stop))
            .await?;
        convert::pairs(reply)
    }

    /// ZRANK.
    pub async fn zrank(&self, key: impl ToArg, member: impl ToArg) -> Result<Option<i64>> {
        self.command(commands::sorted_set::zrank(key, member)).await
    }

    /// ZREVRANK.
    pub async fn zrevrank(&self, key: impl ToArg, member: impl ToArg) -> Result<Option<i64>> {
        self.command(commands::sorted_set::zrevrank(key, member))
            .await
    }

    /// ZREM; number of removed members.
    pub async fn zrem<M: ToArg + Sync>(&self, key: impl ToArg, members: &[M]) -> Result<i64> {
        self.command(commands::sorted_set::zrem(key, members)).await
    }

    /// ZINCRBY; the member's score afterwards.
    pub async fn zincr_by(&self, key: impl ToArg, delta: f64, member: impl ToArg) -> Result<f64> {
        self.command(commands::sorted_set::zincr_by(key, delta, member))
            .await
    }

    // --- pub/sub and scripting ---------------------------------------------

    /// PUBLISH; number of subscribers that received the message.
    pub async fn publish(&self, channel: impl ToArg, payload: impl ToArg) -> Result<i64> {
        self.command(Command::new("PUBLISH").arg(channel).arg(payload))
            .await
    }

    /// EVAL a script source directly.
    pub async fn eval<T, K, A>(&self, source: &str, keys: &[K], args: &[A]) -> Result<T>
    where
        T: FromValue,
        K: ToArg + Sync,
        A: ToArg + Sync,
    {
        self.command(script_command("EVAL", source, keys, args)).await
    }

    /// EVALSHA a script by digest.
    pub async fn evalsha<T, K, A>(&self, sha: &str, keys: &[K], args: &[A]) -> Result<T>
    where
        T: FromValue,
        K: ToArg + Sync,
        A: ToArg + Sync,
    {
        self.command(script_command("EVALSHA", sha, keys, args))
            .await
    }

    /// Run a [`Script`]: EVALSHA first, EVAL transparently on NOSCRIPT.
    pub async fn run_script<T, K, A>(&self, script: &Script, keys: &[K], args: &[A]) -> Result<T>
    where
        T: FromValue,
        K: ToArg + Sync,
        A: ToArg + Sync,
    {
        match self.evalsha(script.sha(), keys, args).await {
            Err(Error::Server(ref e)) if e.kind == ServerErrorKind::NoScript => {
                debug!(sha = script.sha(), "script not cached, shipping source");
                self.eval(script.source(), keys, args).await
            }
            other => other,
        }
    }

    /// SCRIPT LOAD; the digest the server will serve it under.
    pub async fn script_load(&self, source: &str) -> Result<String> {
        self.command(Command::new("SCRIPT").arg("LOAD").arg(source))
            .await
    }

    /// SCRIPT EXISTS, one flag per digest.
    pub async fn script_exists<S: ToArg + Sync>(&self, shas: &[S]) -> Result<Vec<bool>> {
        let cmd = shas
            .iter()
            .fold(Command::new("SCRIPT").arg("EXISTS"), |cmd, sha| {
                cmd.arg(sha)
            });
        self.command(cmd).await
    }

    /// SCRIPT FLUSH.
    pub async fn script_flush(&self) -> Result<()> {
        self.command(Command::new("SCRIPT").arg("FLUSH")).await
    }
}

fn script_command<K: ToArg, A: ToArg>(
    name: &'static str,
    target: &str,
    keys: &[K],
    args: &[A],
) -> Command {
    let mut cmd = Command::new(name).arg(target).arg(keys.len());
    for key in keys {
        cmd = cmd.key(key);
    }
    for arg in args {
        cmd = cmd.arg(arg);
    }
    cmd
}

impl ClusterState {
    /// Any node we can talk to: prefer pooled nodes, fall back to seeds.
    async fn some_node(&self) -> NodeAddr {
        if let Some(addr) = self.pools.read().await.keys().next() {
            return addr.clone();
        }
        self.seeds[0].clone()
    }
}

#[async_trait]
impl BatchExecutor for Client {
    async fn run_batch(&self, commands: Vec<Command>) -> Result<Vec<Result<Value>>> {
        let pool = self.batch_pool(&commands).await?;
        pool.batch(commands).await
    }

    async fn run_transaction(
        &self,
        watch: Vec<Bytes>,
        commands: Vec<Command>,
    ) -> Result<Vec<Result<Value>>> {
        let pool = self.batch_pool(&commands).await?;
        pool.transaction(watch, commands).await
    }
}
