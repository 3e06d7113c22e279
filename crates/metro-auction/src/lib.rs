//! Metro Auction - descending-price issuance
//!
//! The auction family is a seven-day initial auction followed, from the first
//! midnight at or after its end, by back-to-back one-day auctions. In every
//! window the price falls tick by tick from an opening price to a floor.
//!
//! Founder allocations are minted once into [`TokenLocker`]s that release
//! when the initial auction ends, either because its time ran out or because
//! it sold out.

#![forbid(unsafe_code)]

/// Auction engine
pub mod engine;
/// Founder token lockers
pub mod locker;
/// Price curve and quantity arithmetic
pub mod price;
/// Schedule and counters
pub mod state;

pub use engine::{Auctions, NextAuction, PurchaseReceipt};
pub use locker::{FounderAllocation, TokenLocker};
pub use state::{AuctionState, AuctionWindow, DailySales, LastPurchase};
