//! Core types for the `redwire` Redis client: the unified reply value model,
//! native type conversion, the common error hierarchy and configuration.
//!
//! This crate is IO-free; everything that touches a socket lives in the main
//! `redwire` crate.

#![warn(missing_docs)]

pub mod config;
pub mod convert;
pub mod error;
pub mod types;
pub mod value;

pub use config::{
    ConnectionConfig, PoolConfig, PoolStrategy, ProtocolVersion, ReconnectConfig, SentinelConfig,
    SentinelEndpoint, TopologyMode,
};
pub use convert::{FromValue, ToArg};
pub use error::{Error, Result, ServerError, ServerErrorKind};
pub use types::{NodeAddr, SlotRange};
pub use value::Value;
