#![deny(missing_docs)]
//! Process support for the Oxide Gate binaries.

/// Redacting log writer and subscriber setup.
pub mod logging;
/// MTProto remote account adapter.
#[cfg(feature = "mtproto")]
pub mod mtproto;
