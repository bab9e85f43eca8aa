//! Cooperative async building blocks used by the import pipeline.
//!
//! - [`TryJoinAll`]: Drive several fallible futures concurrently on one task
//! - [`WorkerPool`]: Fixed thread pool for CPU-heavy jobs (mesh decompression)
//! - [`WorkerTask`]: Future resolving to a pool job's result
//!
//! The importer itself never spawns tasks: every stage is an ordinary future
//! polled by whatever executor the caller awaits the import on (a game loop
//! tick, `pollster::block_on`, an async runtime). Only decompression leaves the
//! calling thread.

mod join;
mod worker_pool;

pub use join::{TryJoinAll, try_join_all};
pub use worker_pool::{WorkerPool, WorkerTask};
