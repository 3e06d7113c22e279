//! Constants and small builders shared by tests

use metro_auction::FounderAllocation;
use metro_core::{AccountId, Amount, AuctionConfig, ChainId, UnixTime, SECONDS_PER_DAY};

/// A UTC midnight used as the default genesis
pub const GENESIS: UnixTime = UnixTime(1_700_006_400);

/// One whole token (and one whole unit of funds) at 18 decimals
pub const UNIT: Amount = 1_000_000_000_000_000_000;

/// One day in seconds
pub const DAY: u64 = SECONDS_PER_DAY;

/// Auction small enough to sell out in a test: 100 tokens in the initial
/// auction, 10 per day, cap 1000, floor 1000 base units, start 2 per token
pub fn test_auction_config() -> AuctionConfig {
    AuctionConfig {
        minimum_price: 1_000,
        starting_price: 2_000_000_000_000_000_000,
        time_scale: 60,
        initial_auction_days: 7,
        token_decimals: 18,
        initial_auction_supply: 100,
        daily_supply: 10,
        supply_cap: 1_000,
    }
}

/// Deterministic account for `label`
pub fn account(label: &str) -> AccountId {
    AccountId::from_label(label)
}

/// Chain id for a short name
pub fn chain(name: &str) -> ChainId {
    ChainId::new(name).expect("valid chain name")
}

/// One allocation per `(label, whole tokens)` pair
pub fn founders(allocations: &[(&str, u64)]) -> Vec<FounderAllocation> {
    allocations
        .iter()
        .map(|(label, tokens)| FounderAllocation::new(account(label), Amount::from(*tokens) * UNIT))
        .collect()
}

/// `GENESIS` plus whole days and seconds
pub fn at(days: u64, secs: u64) -> UnixTime {
    UnixTime(GENESIS.secs() + days * DAY + secs)
}
