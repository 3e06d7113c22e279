//! Metro Testing Infrastructure
//!
//! Deterministic fixtures for the auction and the bridge: a shared manual
//! clock, small auction configurations that sell out in a handful of
//! purchases, and a [`TestNetwork`] of in-memory ledgers wired to each other
//! through a test relay.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
//!
//! # Usage
//!
//! ```rust,no_run
//! use metro_testkit::*;
//!
//! #[test]
//! fn my_test() {
//!     init_tracing();
//!     let mut net = TestNetwork::builder().chains(&["ETC", "ETH"]).build().unwrap();
//!     let alice = account("alice");
//!     net.buy("ETC", alice, 10 * UNIT).unwrap();
//! }
//! ```

pub mod fixtures;
pub mod logging;
pub mod network;

pub use fixtures::*;
pub use logging::init_tracing;
pub use network::{LedgerNode, NetworkBuilder, TestNetwork};

// Re-export commonly used types for convenience
pub use metro_ledger::ManualClock;
