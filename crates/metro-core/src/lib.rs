//! Metro Core - foundation types for the issuance auction and the token porter
//!
//! This crate holds only shared vocabulary and interfaces; it has no
//! auction or bridge logic of its own.
//!
//! - Identifiers and values: [`AccountId`], [`ChainId`], [`ChainTable`],
//!   [`Hash32`], [`Amount`], [`SupplySnapshot`]
//! - Time: [`UnixTime`] with day-boundary rounding
//! - Effect interfaces: [`LedgerEffects`], [`ProceedsEffects`],
//!   [`ClockEffects`], [`IssuanceSchedule`]
//! - Errors: [`MetroError`] and [`Result`]
//! - Configuration: [`MetroConfig`] (TOML + `METRO_*` environment)

#![forbid(unsafe_code)]

/// Unified error handling
pub mod errors;

/// Pure synchronous hashing
pub mod hash;

/// Identifier and value types
pub mod types;

/// Unix-second time and day rounding
pub mod time;

/// Effect interfaces for external collaborators
pub mod effects;

/// Layered configuration
pub mod config;

pub use config::{AuctionConfig, BridgeConfig, MetroConfig};
pub use effects::{ClockEffects, IssuanceSchedule, LedgerEffects, ProceedsEffects};
pub use errors::{MetroError, Result};
pub use time::{UnixTime, SECONDS_PER_DAY};
pub use types::{
    AccountId, Amount, ChainId, ChainTable, Hash32, SupplySnapshot, SUPPLY_SLOTS,
};
