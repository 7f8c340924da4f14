//! # Account Sync Library
//!
//! Orchestrates discovery jobs for trusted provider accounts: the hourly
//! schedule sweep, the job ledger and its state machine, a durable dispatch
//! queue, the executor that calls discovery plugins, and the reconciler that
//! mirrors discovered accounts into the managed inventory.

pub mod app;
pub mod config;
pub mod crypto;
pub mod db;
pub mod dispatch;
pub mod error;
pub mod handlers;
pub mod jobs;
pub mod models;
pub mod plugins;
pub mod reconciler;
pub mod repositories;
pub mod schedule;
pub mod secrets;
pub mod server;
pub mod sync_executor;
pub mod telemetry;
pub use migration;
