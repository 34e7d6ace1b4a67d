//! Synthetic load generator for partitioned, append-only streams.
//!
//! Records of random size are generated, split into request-sized chunks,
//! given routing keys that spread them round-robin over the stream's open
//! shards, and submitted one chunk at a time.

pub mod assign;
pub mod batch;
pub mod config;
pub mod dispatch;
pub mod logging;
pub mod metrics;
pub mod output;
pub mod payload;
pub mod rate;
pub mod shards;
pub mod transport;

pub use config::{BatchRequest, LoadConfig};
pub use dispatch::{Dispatcher, RunError, RunSummary};
