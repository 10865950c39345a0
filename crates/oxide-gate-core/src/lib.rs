#![deny(missing_docs)]
//! Oxide Gate core library.
//!
//! Access-gated chat management: roster vault, per-caller flow state
//! machine, remote session registry, lifecycle sweeper and member export.

/// Access-violation log.
pub mod access_log;
/// Persisted remote credentials.
pub mod artifacts;
/// Configuration management.
pub mod config;
/// Shared service context.
pub mod context;
/// Member export formatting.
pub mod export;
/// Flow state machine.
pub mod flow;
/// Dispatch layer.
pub mod gate;
/// Menu labels and reply texts.
pub mod menu;
/// Phone normalization and session keys.
pub mod phone;
/// Remote session registry.
pub mod registry;
/// Remote account capability.
pub mod remote;
/// Lifecycle sweeper.
pub mod sweeper;
/// Ephemeral message tracker.
pub mod tracker;
/// Bot transport capability.
pub mod transport;
/// Encrypted roster.
pub mod vault;

#[cfg(test)]
pub mod testing;

pub use context::{GateContext, LifecyclePolicy};
pub use gate::{Gate, Inbound};
pub use sweeper::{SweepReport, Sweeper};
