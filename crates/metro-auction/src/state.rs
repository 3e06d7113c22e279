//! Auction schedule and issuance counters

use crate::price;
use metro_core::{Amount, AuctionConfig, MetroError, Result, UnixTime, SECONDS_PER_DAY};
use serde::{Deserialize, Serialize};

/// Which sale, if any, is open at an instant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuctionWindow {
    /// Before genesis
    NotStarted,
    /// The initial multi-day auction
    Initial {
        /// Window start (genesis)
        start: UnixTime,
        /// Exclusive window end
        end: UnixTime,
    },
    /// Between the end of the initial auction and the first daily auction
    Gap {
        /// When the first daily auction opens
        daily_start: UnixTime,
    },
    /// One of the one-day auctions
    Daily {
        /// Zero-based day number after the daily auctions began
        index: u64,
        /// Window start (a midnight)
        start: UnixTime,
        /// Exclusive window end
        end: UnixTime,
    },
}

/// Most recent accepted purchase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastPurchase {
    /// Price paid, per whole token
    pub price: Amount,
    /// When it happened
    pub at: UnixTime,
    /// Tick it happened in
    pub tick: u64,
}

/// Sales inside the daily window most recently traded in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailySales {
    /// Daily window index
    pub index: u64,
    /// Opening price fixed when the window saw its first purchase
    pub opening_price: Amount,
    /// Units sold in that window
    pub sold: Amount,
}

/// Complete auction state; created once, mutated only by accepted purchases
/// and the one-time founder mint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuctionState {
    /// Instant the auction family began
    pub genesis_time: UnixTime,
    /// Exclusive end of the initial auction
    pub initial_auction_end_time: UnixTime,
    /// First midnight at or after `initial_auction_end_time`
    pub daily_auction_start_time: UnixTime,
    /// Price floor per whole token
    pub minimum_price: Amount,
    /// Opening price of the initial auction per whole token
    pub starting_price: Amount,
    /// Seconds per tick
    pub time_scale: u64,
    /// Base units per whole token
    pub token_unit: Amount,
    /// Hard cap on units ever issued
    pub supply_cap: Amount,
    /// Units the initial auction may sell
    pub initial_auction_supply: Amount,
    /// Units each daily auction may sell
    pub daily_supply: Amount,
    /// Units issued so far: founder allocations plus every purchase
    pub global_issued_supply: Amount,
    /// Units sold by the initial auction
    pub initial_auction_sold: Amount,
    /// Units placed in founder lockers
    pub founder_supply: Amount,
    /// Whether founder allocations have been minted
    pub founders_minted: bool,
    /// Instant the initial auction was seen to sell out
    pub initial_sold_out_at: Option<UnixTime>,
    /// Most recent purchase
    pub last_purchase: Option<LastPurchase>,
    /// Counters of the most recently traded daily window
    pub daily_sales: Option<DailySales>,
}

impl AuctionState {
    /// Derive the schedule from configuration and a genesis instant
    pub fn new(config: &AuctionConfig, genesis_time: UnixTime) -> Result<Self> {
        config.validate()?;
        let initial_auction_end_time = genesis_time.checked_add_days(config.initial_auction_days)?;
        let daily_auction_start_time = initial_auction_end_time.ceil_to_day()?;
        let token_unit = config.token_unit()?;

        Ok(Self {
            genesis_time,
            initial_auction_end_time,
            daily_auction_start_time,
            minimum_price: Amount::from(config.minimum_price),
            starting_price: Amount::from(config.starting_price),
            time_scale: config.time_scale,
            token_unit,
            supply_cap: config.to_units(config.supply_cap)?,
            initial_auction_supply: config.to_units(config.initial_auction_supply)?,
            daily_supply: config.to_units(config.daily_supply)?,
            global_issued_supply: 0,
            initial_auction_sold: 0,
            founder_supply: 0,
            founders_minted: false,
            initial_sold_out_at: None,
            last_purchase: None,
            daily_sales: None,
        })
    }

    /// Auction tick at `at`
    pub fn tick_at(&self, at: UnixTime) -> u64 {
        price::which_tick(self.genesis_time, at, self.time_scale)
    }

    /// Window open at `at`
    pub fn window_at(&self, at: UnixTime) -> AuctionWindow {
        if at < self.genesis_time {
            AuctionWindow::NotStarted
        } else if at < self.initial_auction_end_time {
            AuctionWindow::Initial {
                start: self.genesis_time,
                end: self.initial_auction_end_time,
            }
        } else if at < self.daily_auction_start_time {
            AuctionWindow::Gap {
                daily_start: self.daily_auction_start_time,
            }
        } else {
            let index = at.saturating_since(self.daily_auction_start_time) / SECONDS_PER_DAY;
            let start = UnixTime(
                self.daily_auction_start_time
                    .secs()
                    .saturating_add(index.saturating_mul(SECONDS_PER_DAY)),
            );
            AuctionWindow::Daily {
                index,
                start,
                end: UnixTime(start.secs().saturating_add(SECONDS_PER_DAY)),
            }
        }
    }

    /// Whether the initial auction sold its whole supply
    pub fn initial_sold_out(&self) -> bool {
        self.initial_auction_sold >= self.initial_auction_supply
    }

    /// Initial auction over at `at`, by time or by sellout
    pub fn initial_ended_at(&self, at: UnixTime) -> bool {
        self.initial_sold_out_at.is_some()
            || self.initial_sold_out()
            || at >= self.initial_auction_end_time
    }

    /// Units still issuable under the hard cap
    pub fn remaining_cap(&self) -> Amount {
        self.supply_cap.saturating_sub(self.global_issued_supply)
    }

    /// Opening price of daily window `index`
    pub fn daily_opening_price(&self, index: u64) -> Amount {
        match self.daily_sales {
            Some(sales) if sales.index == index => sales.opening_price,
            _ => price::daily_opening_price(
                self.last_purchase.map(|p| p.price),
                self.minimum_price,
                self.starting_price,
            ),
        }
    }

    /// Units already sold in daily window `index`
    pub fn daily_sold(&self, index: u64) -> Amount {
        match self.daily_sales {
            Some(sales) if sales.index == index => sales.sold,
            _ => 0,
        }
    }

    /// Price per whole token in `window` at `at`; `None` when nothing is open
    pub fn price_in(&self, window: AuctionWindow, at: UnixTime) -> Result<Option<Amount>> {
        let (opening, start, end) = match window {
            AuctionWindow::Initial { start, end } => (self.starting_price, start, end),
            AuctionWindow::Daily { index, start, end } => {
                (self.daily_opening_price(index), start, end)
            }
            AuctionWindow::NotStarted | AuctionWindow::Gap { .. } => return Ok(None),
        };
        let scale = self.time_scale.max(1);
        let elapsed = at.saturating_since(start) / scale;
        let window_ticks = end.saturating_since(start) / scale;
        price::decayed_price(opening, self.minimum_price, elapsed, window_ticks).map(Some)
    }

    /// Units still for sale in `window`, already bounded by the hard cap
    pub fn available_in(&self, window: AuctionWindow) -> Result<Amount> {
        let window_remaining = match window {
            AuctionWindow::Initial { .. } => self
                .initial_auction_supply
                .saturating_sub(self.initial_auction_sold),
            AuctionWindow::Daily { index, .. } => {
                self.daily_supply.saturating_sub(self.daily_sold(index))
            }
            AuctionWindow::NotStarted | AuctionWindow::Gap { .. } => {
                return Err(MetroError::auction_closed("No auction window is open"))
            }
        };
        Ok(window_remaining.min(self.remaining_cap()))
    }
}
