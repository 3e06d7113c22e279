//! Metro Ledger - handlers for the core effect interfaces
//!
//! Reference implementations of the external collaborators the auction and
//! the porter consume: [`MemoryLedger`] for balances and supply,
//! [`ProceedsVault`] for auction funds, and the [`SystemClock`] /
//! [`ManualClock`] time sources.

#![forbid(unsafe_code)]

/// Wall-clock and manual time sources
pub mod clock;
/// Balances and total supply
pub mod memory;
/// Auction proceeds custody
pub mod proceeds;

pub use clock::{ManualClock, SystemClock};
pub use memory::MemoryLedger;
pub use proceeds::ProceedsVault;
