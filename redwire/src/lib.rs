//! A native async Redis client.
//!
//! `redwire` speaks RESP2 and RESP3 directly over TCP and presents one typed
//! command surface across three execution modes: direct calls, pipelined
//! batches and MULTI/EXEC transactions. Batched modes hand back deferred
//! placeholders that resolve, convert and error individually once the batch
//! completes. Standalone servers, sentinel-fronted masters and clusters
//! (with MOVED/ASK redirect handling) are all dialed through the same
//! [`Client::connect`] entry point.
//!
//! # Quick start
//!
//! ```no_run
//! use redwire::{Client, ConnectionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Client::connect(ConnectionConfig::new("redis://localhost:6379")).await?;
//!
//!     client.set("greeting", "hello").await?;
//!     let value = client.get("greeting").await?;
//!     println!("{value:?}");
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]

pub mod client;
pub mod cluster;
pub mod commands;
pub mod connection;
pub mod pipeline;
pub mod pool;
pub mod protocol;
pub mod pubsub;
pub mod script;
pub mod sentinel;
pub mod transaction;

pub use client::Client;
pub use commands::{Command, SetOptions, ZAddOptions};
pub use connection::TopologyKind;
pub use pipeline::{BatchExecutor, Deferred, Pipeline};
pub use pubsub::{Message, Subscriber};
pub use redwire_core::{
    ConnectionConfig, Error, FromValue, NodeAddr, PoolConfig, PoolStrategy, ProtocolVersion,
    Result, SentinelConfig, ServerError, ServerErrorKind, SlotRange, ToArg, TopologyMode, Value,
};
pub use script::Script;
pub use transaction::Transaction;
