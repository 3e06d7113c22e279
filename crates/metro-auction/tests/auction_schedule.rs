//! Schedule, sellout and locker behaviour of the auction family

use assert_matches::assert_matches;
use metro_auction::{AuctionWindow, Auctions, FounderAllocation};
use metro_core::{
    AuctionConfig, IssuanceSchedule, LedgerEffects, MetroError, UnixTime, SECONDS_PER_DAY,
};
use metro_ledger::{MemoryLedger, ProceedsVault};
use metro_testkit::{
    account, at, founders, init_tracing, test_auction_config, ManualClock, GENESIS, UNIT,
};
use proptest::prelude::*;

fn auctions_at(genesis: UnixTime, config: &AuctionConfig) -> (Auctions<ManualClock>, ManualClock) {
    let clock = ManualClock::new(genesis);
    let auctions = Auctions::new(config, genesis, clock.clone()).unwrap();
    (auctions, clock)
}

#[test]
fn initial_auction_ends_by_time() {
    init_tracing();
    let (auctions, clock) = auctions_at(GENESIS, &test_auction_config());

    clock.set(UnixTime(at(7, 0).secs() - 1));
    assert!(!auctions.is_initial_auction_ended());

    clock.set(at(7, 0));
    assert!(auctions.is_initial_auction_ended());

    clock.set(at(8, 60));
    assert!(auctions.is_initial_auction_ended());
}

#[test]
fn daily_start_rounds_up_to_midnight() {
    let config = test_auction_config();
    let (aligned, _) = auctions_at(GENESIS, &config);
    assert_eq!(aligned.daily_auction_start_time(), at(7, 0));

    let (offset, _) = auctions_at(at(0, 5 * 3600 + 17), &config);
    assert_eq!(offset.initial_auction_end_time(), at(7, 5 * 3600 + 17));
    assert_eq!(offset.daily_auction_start_time(), at(8, 0));
    assert_eq!(offset.daily_auction_start_time().secs() % SECONDS_PER_DAY, 0);
}

#[test]
fn sellout_ends_initial_auction_and_unlocks_lockers() {
    init_tracing();
    let config = AuctionConfig {
        supply_cap: 150,
        ..test_auction_config()
    };
    let (mut auctions, clock) = auctions_at(GENESIS, &config);
    let mut ledger = MemoryLedger::new();
    let mut vault = ProceedsVault::new();
    let allocations = founders(&[("founder-a", 30), ("founder-b", 20)]);
    auctions.mint_initial_supply(&mut ledger, &allocations).unwrap();
    assert_eq!(auctions.global_issued_supply(), auctions.supply_cap() - 100 * UNIT);

    for allocation in &allocations {
        assert_eq!(auctions.is_locker_locked(allocation.owner), Some(true));
    }

    clock.set(at(2, 0));
    let buyer = account("whale");
    let receipt = auctions
        .purchase(&mut ledger, &mut vault, buyer, 10_000 * UNIT)
        .unwrap();
    assert_eq!(receipt.tokens_issued, 100 * UNIT);
    assert!(receipt.refund > 0);
    assert_eq!(auctions.global_issued_supply(), auctions.supply_cap());

    assert!(auctions.is_initial_auction_ended());
    assert_eq!(auctions.state().initial_sold_out_at, Some(at(2, 0)));
    for allocation in &allocations {
        assert_eq!(auctions.is_locker_locked(allocation.owner), Some(false));
    }

    let err = auctions
        .purchase(&mut ledger, &mut vault, account("late"), UNIT)
        .unwrap_err();
    assert_matches!(err, MetroError::SoldOut { .. });
    assert_eq!(ledger.balance_of(account("late")), 0);

    // founders can withdraw before the initial window would have closed
    auctions
        .withdraw_from_locker(&mut ledger, allocations[0].owner, 30 * UNIT)
        .unwrap();
    assert_eq!(ledger.balance_of(allocations[0].owner), 30 * UNIT);
}

#[test]
fn supply_cap_limits_daily_auctions() {
    let config = AuctionConfig {
        supply_cap: 105,
        ..test_auction_config()
    };
    let (mut auctions, clock) = auctions_at(GENESIS, &config);
    let mut ledger = MemoryLedger::new();
    let mut vault = ProceedsVault::new();
    let buyer = account("buyer");

    auctions
        .purchase(&mut ledger, &mut vault, buyer, 1_000 * UNIT)
        .unwrap();
    clock.set(auctions.daily_auction_start_time());
    let receipt = auctions
        .purchase(&mut ledger, &mut vault, buyer, 1_000 * UNIT)
        .unwrap();
    assert_eq!(receipt.tokens_issued, 5 * UNIT);
    assert_eq!(auctions.global_issued_supply(), 105 * UNIT);
    assert_eq!(ledger.total_supply(), 105 * UNIT);

    clock.advance_days(1);
    assert_matches!(
        auctions.purchase(&mut ledger, &mut vault, buyer, UNIT),
        Err(MetroError::SoldOut { .. })
    );
}

#[test]
fn gap_between_initial_and_daily_auctions() {
    let genesis = at(0, 6 * 3600);
    let (mut auctions, clock) = auctions_at(genesis, &test_auction_config());
    let mut ledger = MemoryLedger::new();
    let mut vault = ProceedsVault::new();

    clock.set(at(7, 12 * 3600));
    assert_matches!(auctions.current_window(), AuctionWindow::Gap { .. });
    assert_eq!(auctions.current_price().unwrap(), None);
    assert_eq!(auctions.available_now(), 0);
    assert_eq!(auctions.next_auction().unwrap().start, at(8, 0));
    assert_matches!(
        auctions.purchase(&mut ledger, &mut vault, account("early"), UNIT),
        Err(MetroError::AuctionClosed { .. })
    );

    clock.set(at(8, 0));
    assert_matches!(auctions.current_window(), AuctionWindow::Daily { index: 0, .. });
    assert!(auctions
        .purchase(&mut ledger, &mut vault, account("early"), UNIT)
        .is_ok());
}

#[test]
fn price_falls_to_floor_within_initial_window() {
    let (auctions, clock) = auctions_at(GENESIS, &test_auction_config());
    let opening = auctions.current_price().unwrap().unwrap();
    assert_eq!(opening, 2 * UNIT);

    clock.set(at(3, 0));
    let middle = auctions.current_price().unwrap().unwrap();
    assert!(middle < opening);

    clock.set(UnixTime(at(7, 0).secs() - 1));
    assert_eq!(auctions.current_price().unwrap(), Some(1_000));
}

#[test]
fn founder_supply_unlocks_at_time_end_without_sellout() {
    let (mut auctions, clock) = auctions_at(GENESIS, &test_auction_config());
    let mut ledger = MemoryLedger::new();
    let owner = account("founder");
    auctions
        .mint_initial_supply(&mut ledger, &[FounderAllocation::new(owner, 10 * UNIT)])
        .unwrap();

    clock.set(UnixTime(at(7, 0).secs() - 1));
    assert_eq!(auctions.refresh_lockers(), 0);
    assert_eq!(auctions.is_locker_locked(owner), Some(true));

    clock.set(at(7, 0));
    assert_eq!(auctions.refresh_lockers(), 1);
    assert_eq!(auctions.refresh_lockers(), 0);
    assert_eq!(auctions.is_locker_locked(owner), Some(false));
}

proptest! {
    #[test]
    fn ended_never_reverts(
        mut offsets in prop::collection::vec(0u64..20 * SECONDS_PER_DAY, 1..30)
    ) {
        offsets.sort_unstable();
        let (auctions, clock) = auctions_at(GENESIS, &test_auction_config());
        let mut seen_ended = false;
        for offset in offsets {
            clock.set(UnixTime(GENESIS.secs() + offset));
            let ended = auctions.is_initial_auction_ended();
            prop_assert!(!(seen_ended && !ended));
            prop_assert_eq!(ended, offset >= 7 * SECONDS_PER_DAY);
            seen_ended |= ended;
        }
    }

    #[test]
    fn daily_start_is_first_midnight_after_end(offset in 0u64..SECONDS_PER_DAY) {
        let genesis = UnixTime(GENESIS.secs() + offset);
        let (auctions, _) = auctions_at(genesis, &test_auction_config());
        let start = auctions.daily_auction_start_time().secs();
        let end = auctions.initial_auction_end_time().secs();
        prop_assert_eq!(start % SECONDS_PER_DAY, 0);
        prop_assert!(start >= end);
        prop_assert!(start - end < SECONDS_PER_DAY);
    }

    #[test]
    fn issued_supply_never_exceeds_cap(
        purchases in prop::collection::vec((0u64..9, 1u64..400), 1..25)
    ) {
        let (mut auctions, clock) = auctions_at(GENESIS, &test_auction_config());
        let mut ledger = MemoryLedger::new();
        let mut vault = ProceedsVault::new();
        for (day, funds) in purchases {
            clock.set(at(day.max(clock_day(&clock)), 0));
            let funds = u128::from(funds) * UNIT;
            let _ = auctions.purchase(&mut ledger, &mut vault, account("buyer"), funds);
            prop_assert!(auctions.global_issued_supply() <= auctions.supply_cap());
            prop_assert_eq!(ledger.total_supply(), auctions.global_issued_supply());
        }
    }
}

fn clock_day(clock: &ManualClock) -> u64 {
    use metro_core::ClockEffects;
    clock.now().saturating_since(GENESIS) / SECONDS_PER_DAY
}
