//! Auction engine: prices, sells and mints
//!
//! [`Auctions`] is the only issuance path for new tokens. Each public
//! mutator follows the same shape: read the clock once, validate and compute
//! every new value into locals, perform the external effects (mint, then
//! forward proceeds), and only then write the new counters. A failure at any
//! step leaves the auction, the ledger and the proceeds collector as they were.

use crate::locker::{FounderAllocation, TokenLocker};
use crate::price;
use crate::state::{AuctionState, AuctionWindow, DailySales, LastPurchase};
use metro_core::{
    AccountId, Amount, AuctionConfig, ClockEffects, IssuanceSchedule, LedgerEffects, MetroError,
    ProceedsEffects, Result, UnixTime,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Outcome of an accepted purchase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseReceipt {
    /// Buyer that received the tokens
    pub buyer: AccountId,
    /// Token base units minted to the buyer
    pub tokens_issued: Amount,
    /// Price per whole token the purchase cleared at
    pub price: Amount,
    /// Funds forwarded to the proceeds collector
    pub funds_consumed: Amount,
    /// Funds handed back because the sale was clamped or rounded
    pub refund: Amount,
    /// Tick the purchase happened in
    pub tick: u64,
    /// Window the purchase happened in
    pub window: AuctionWindow,
}

/// Start of the next auction window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NextAuction {
    /// When it opens
    pub start: UnixTime,
    /// Opening price per whole token, given the purchases seen so far
    pub opening_price: Amount,
}

/// Descending-price issuance auction
#[derive(Debug, Clone)]
pub struct Auctions<C> {
    state: AuctionState,
    lockers: BTreeMap<AccountId, TokenLocker>,
    clock: C,
}

impl<C: ClockEffects> Auctions<C> {
    /// Create the auction family starting at `genesis_time`
    pub fn new(config: &AuctionConfig, genesis_time: UnixTime, clock: C) -> Result<Self> {
        let state = AuctionState::new(config, genesis_time)?;
        tracing::info!(
            genesis = %state.genesis_time,
            initial_end = %state.initial_auction_end_time,
            daily_start = %state.daily_auction_start_time,
            "auction schedule initialized"
        );
        Ok(Self {
            state,
            lockers: BTreeMap::new(),
            clock,
        })
    }

    /// Full state snapshot
    pub fn state(&self) -> &AuctionState {
        &self.state
    }

    /// Instant the initial auction ends
    pub fn initial_auction_end_time(&self) -> UnixTime {
        self.state.initial_auction_end_time
    }

    /// Instant the first daily auction opens
    pub fn daily_auction_start_time(&self) -> UnixTime {
        self.state.daily_auction_start_time
    }

    /// Units issued so far, founder allocations included
    pub fn global_issued_supply(&self) -> Amount {
        self.state.global_issued_supply
    }

    /// Hard cap on issued units
    pub fn supply_cap(&self) -> Amount {
        self.state.supply_cap
    }

    /// Tick of an arbitrary instant
    pub fn which_tick(&self, at: UnixTime) -> u64 {
        self.state.tick_at(at)
    }

    /// Window open right now
    pub fn current_window(&self) -> AuctionWindow {
        self.state.window_at(self.clock.now())
    }

    /// Price per whole token right now, or `None` outside any window
    pub fn current_price(&self) -> Result<Option<Amount>> {
        let now = self.clock.now();
        self.state.price_in(self.state.window_at(now), now)
    }

    /// Units still for sale in the current window, or zero outside any window
    pub fn available_now(&self) -> Amount {
        self.state
            .available_in(self.current_window())
            .unwrap_or(0)
    }

    /// Next window that has not opened yet
    pub fn next_auction(&self) -> Result<NextAuction> {
        let now = self.clock.now();
        let start = match self.state.window_at(now) {
            AuctionWindow::NotStarted => {
                return Ok(NextAuction {
                    start: self.state.genesis_time,
                    opening_price: self.state.starting_price,
                })
            }
            AuctionWindow::Initial { .. } | AuctionWindow::Gap { .. } => {
                self.state.daily_auction_start_time
            }
            AuctionWindow::Daily { end, .. } => end,
        };
        let opening_price = price::daily_opening_price(
            self.state.last_purchase.map(|p| p.price),
            self.state.minimum_price,
            self.state.starting_price,
        );
        Ok(NextAuction {
            start,
            opening_price,
        })
    }

    /// Mint founder allocations into their lockers.
    ///
    /// Allowed once, before any purchase. The allocations count toward the
    /// supply cap together with the whole initial auction supply.
    pub fn mint_initial_supply<L: LedgerEffects>(
        &mut self,
        ledger: &mut L,
        founders: &[FounderAllocation],
    ) -> Result<()> {
        if self.state.founders_minted {
            return Err(MetroError::invalid("Initial supply already minted"));
        }
        if self.state.global_issued_supply != 0 {
            return Err(MetroError::invalid(
                "Initial supply must be minted before any purchase",
            ));
        }

        let mut lockers = BTreeMap::new();
        let mut founder_supply: Amount = 0;
        for allocation in founders {
            if allocation.amount == 0 || allocation.owner.is_zero() {
                return Err(MetroError::invalid(
                    "Founder allocations need an owner and a positive amount",
                ));
            }
            if lockers.contains_key(&allocation.owner) {
                return Err(MetroError::invalid(format!(
                    "Duplicate founder {}",
                    allocation.owner
                )));
            }
            founder_supply = founder_supply
                .checked_add(allocation.amount)
                .ok_or_else(|| MetroError::overflow("founder supply"))?;
            lockers.insert(allocation.owner, TokenLocker::new(*allocation));
        }

        let committed = founder_supply
            .checked_add(self.state.initial_auction_supply)
            .ok_or_else(|| MetroError::overflow("founder plus initial supply"))?;
        if committed > self.state.supply_cap {
            return Err(MetroError::invalid(format!(
                "Founder allocations ({founder_supply}) plus initial auction supply exceed the cap"
            )));
        }

        let mut minted: Vec<&TokenLocker> = Vec::with_capacity(lockers.len());
        for locker in lockers.values() {
            if let Err(err) = ledger.mint(locker.account(), locker.locked_amount()) {
                for done in minted {
                    if ledger.burn(done.account(), done.locked_amount()).is_err() {
                        return Err(MetroError::internal(
                            "Founder mint rollback failed; ledger is inconsistent",
                        ));
                    }
                }
                return Err(err);
            }
            minted.push(locker);
        }

        tracing::info!(
            founders = lockers.len(),
            founder_supply,
            "founder allocations minted into lockers"
        );
        self.state.founder_supply = founder_supply;
        self.state.global_issued_supply = founder_supply;
        self.state.founders_minted = true;
        self.lockers = lockers;
        Ok(())
    }

    /// Buy tokens with `funds`.
    ///
    /// Issues `funds / price` tokens (truncated), clamped to what the open
    /// window and the supply cap still allow; unconsumed funds come back in
    /// [`PurchaseReceipt::refund`].
    pub fn purchase<L, P>(
        &mut self,
        ledger: &mut L,
        proceeds: &mut P,
        buyer: AccountId,
        funds: Amount,
    ) -> Result<PurchaseReceipt>
    where
        L: LedgerEffects,
        P: ProceedsEffects,
    {
        let now = self.clock.now();
        match self.stage_purchase(buyer, funds, now) {
            Ok(staged) => self.execute_purchase(ledger, proceeds, staged, now),
            Err(err) => {
                tracing::debug!(%buyer, funds, error = %err, "purchase rejected");
                Err(err)
            }
        }
    }

    fn stage_purchase(
        &self,
        buyer: AccountId,
        funds: Amount,
        now: UnixTime,
    ) -> Result<StagedPurchase> {
        if funds == 0 {
            return Err(MetroError::invalid("Purchase funds must be positive"));
        }
        if buyer.is_zero() {
            return Err(MetroError::invalid("Buyer must not be the zero address"));
        }

        let window = self.state.window_at(now);
        match window {
            AuctionWindow::NotStarted => {
                return Err(MetroError::auction_closed("Auction has not started"))
            }
            AuctionWindow::Gap { daily_start } => {
                return Err(if self.state.initial_sold_out() {
                    MetroError::sold_out("Initial auction sold out")
                } else {
                    MetroError::auction_closed(format!(
                        "Initial auction ended; daily auctions open at {daily_start}"
                    ))
                });
            }
            AuctionWindow::Initial { .. } | AuctionWindow::Daily { .. } => {}
        }

        let available = self.state.available_in(window)?;
        if available == 0 {
            return Err(MetroError::sold_out(match window {
                AuctionWindow::Initial { .. } => "Initial auction sold out",
                _ => "Daily auction sold out",
            }));
        }

        let price = self
            .state
            .price_in(window, now)?
            .ok_or_else(|| MetroError::auction_closed("No auction window is open"))?;
        let unit = self.state.token_unit;
        let wanted = price::tokens_for_funds(funds, price, unit)?;
        if wanted == 0 {
            return Err(MetroError::invalid(
                "Funds do not cover the smallest token unit at the current price",
            ));
        }
        let tokens = wanted.min(available);
        let funds_consumed = price::cost_of_tokens(tokens, price, unit)?;
        let refund = funds
            .checked_sub(funds_consumed)
            .ok_or_else(|| MetroError::internal("Purchase cost exceeds funds"))?;

        let global_issued_supply = self
            .state
            .global_issued_supply
            .checked_add(tokens)
            .ok_or_else(|| MetroError::overflow("global issued supply"))?;
        let (initial_auction_sold, daily_sales) = match window {
            AuctionWindow::Initial { .. } => (
                self.state
                    .initial_auction_sold
                    .checked_add(tokens)
                    .ok_or_else(|| MetroError::overflow("initial auction sold"))?,
                self.state.daily_sales,
            ),
            AuctionWindow::Daily { index, .. } => (
                self.state.initial_auction_sold,
                Some(DailySales {
                    index,
                    opening_price: self.state.daily_opening_price(index),
                    sold: self
                        .state
                        .daily_sold(index)
                        .checked_add(tokens)
                        .ok_or_else(|| MetroError::overflow("daily auction sold"))?,
                }),
            ),
            AuctionWindow::NotStarted | AuctionWindow::Gap { .. } => {
                return Err(MetroError::auction_closed("No auction window is open"))
            }
        };

        Ok(StagedPurchase {
            receipt: PurchaseReceipt {
                buyer,
                tokens_issued: tokens,
                price,
                funds_consumed,
                refund,
                tick: self.state.tick_at(now),
                window,
            },
            global_issued_supply,
            initial_auction_sold,
            daily_sales,
        })
    }

    fn execute_purchase<L, P>(
        &mut self,
        ledger: &mut L,
        proceeds: &mut P,
        staged: StagedPurchase,
        now: UnixTime,
    ) -> Result<PurchaseReceipt>
    where
        L: LedgerEffects,
        P: ProceedsEffects,
    {
        let receipt = staged.receipt;
        ledger.mint(receipt.buyer, receipt.tokens_issued)?;
        if let Err(err) = proceeds.receive(receipt.buyer, receipt.funds_consumed) {
            ledger
                .burn(receipt.buyer, receipt.tokens_issued)
                .map_err(|_| {
                    MetroError::internal("Purchase rollback failed after proceeds error")
                })?;
            tracing::warn!(
                buyer = %receipt.buyer,
                error = %err,
                "proceeds rejected purchase funds"
            );
            return Err(err);
        }

        let was_ended = self.state.initial_ended_at(now);
        self.state.global_issued_supply = staged.global_issued_supply;
        self.state.initial_auction_sold = staged.initial_auction_sold;
        self.state.daily_sales = staged.daily_sales;
        self.state.last_purchase = Some(LastPurchase {
            price: receipt.price,
            at: now,
            tick: receipt.tick,
        });

        tracing::info!(
            buyer = %receipt.buyer,
            tokens = receipt.tokens_issued,
            price = receipt.price,
            refund = receipt.refund,
            tick = receipt.tick,
            "purchase accepted"
        );

        if !was_ended && self.state.initial_sold_out() {
            self.state.initial_sold_out_at = Some(now);
            tracing::info!(at = %now, "initial auction sold out");
            self.refresh_lockers();
        }
        Ok(receipt)
    }

    /// Founder locker for `owner`
    pub fn token_locker(&self, owner: AccountId) -> Option<&TokenLocker> {
        self.lockers.get(&owner)
    }

    /// All founder lockers
    pub fn token_lockers(&self) -> impl Iterator<Item = &TokenLocker> {
        self.lockers.values()
    }

    /// Whether `owner`'s locker is still locked; `None` if there is no locker
    pub fn is_locker_locked(&self, owner: AccountId) -> Option<bool> {
        self.lockers.get(&owner).map(|l| l.locked(self))
    }

    /// Latch the unlock on every locker once the initial auction has ended.
    ///
    /// Returns the number of lockers that transitioned on this call.
    pub fn refresh_lockers(&mut self) -> usize {
        let schedule = ScheduleSnapshot::from(&*self);
        self.lockers
            .values_mut()
            .map(|locker| locker.refresh(&schedule))
            .filter(|unlocked| *unlocked)
            .count()
    }

    /// Pay `amount` from `owner`'s unlocked locker to `owner`
    pub fn withdraw_from_locker<L: LedgerEffects>(
        &mut self,
        ledger: &mut L,
        owner: AccountId,
        amount: Amount,
    ) -> Result<()> {
        self.refresh_lockers();
        let locker = self
            .lockers
            .get(&owner)
            .ok_or_else(|| MetroError::invalid(format!("{owner} has no token locker")))?;
        let withdrawn = locker.stage_withdrawal(self, amount)?;
        ledger.transfer(locker.account(), owner, amount)?;

        if let Some(locker) = self.lockers.get_mut(&owner) {
            locker.commit_withdrawal(withdrawn);
        }
        tracing::info!(%owner, amount, "locker withdrawal");
        Ok(())
    }
}

impl<C: ClockEffects> IssuanceSchedule for Auctions<C> {
    fn genesis_time(&self) -> UnixTime {
        self.state.genesis_time
    }

    fn current_tick(&self) -> u64 {
        self.state.tick_at(self.clock.now())
    }

    fn daily_mintable(&self) -> Amount {
        self.state.daily_supply
    }

    fn is_initial_auction_ended(&self) -> bool {
        self.state.initial_ended_at(self.clock.now())
    }
}

struct StagedPurchase {
    receipt: PurchaseReceipt,
    global_issued_supply: Amount,
    initial_auction_sold: Amount,
    daily_sales: Option<DailySales>,
}

/// Schedule values captured before the lockers are borrowed mutably
struct ScheduleSnapshot {
    genesis: UnixTime,
    tick: u64,
    daily: Amount,
    ended: bool,
}

impl<C: ClockEffects> From<&Auctions<C>> for ScheduleSnapshot {
    fn from(auctions: &Auctions<C>) -> Self {
        Self {
            genesis: auctions.genesis_time(),
            tick: auctions.current_tick(),
            daily: auctions.daily_mintable(),
            ended: auctions.is_initial_auction_ended(),
        }
    }
}

impl IssuanceSchedule for ScheduleSnapshot {
    fn genesis_time(&self) -> UnixTime {
        self.genesis
    }

    fn current_tick(&self) -> u64 {
        self.tick
    }

    fn daily_mintable(&self) -> Amount {
        self.daily
    }

    fn is_initial_auction_ended(&self) -> bool {
        self.ended
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use metro_core::SECONDS_PER_DAY;
    use metro_ledger::{ManualClock, MemoryLedger, ProceedsVault};

    const T: u64 = 1_700_006_400; // a UTC midnight
    const UNIT: Amount = 1_000_000_000_000_000_000;

    fn config() -> AuctionConfig {
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

    fn setup() -> (Auctions<ManualClock>, ManualClock, MemoryLedger, ProceedsVault) {
        let clock = ManualClock::new(UnixTime(T));
        let auctions = Auctions::new(&config(), UnixTime(T), clock.clone()).unwrap();
        (auctions, clock, MemoryLedger::new(), ProceedsVault::new())
    }

    fn buyer() -> AccountId {
        AccountId::from_label("buyer")
    }

    #[test]
    fn test_first_purchase_at_starting_price() {
        let (mut auctions, _clock, mut ledger, mut vault) = setup();
        let receipt = auctions
            .purchase(&mut ledger, &mut vault, buyer(), UNIT)
            .unwrap();
        assert_eq!(receipt.price, 2 * UNIT);
        assert_eq!(receipt.tokens_issued, UNIT / 2);
        assert_eq!(receipt.funds_consumed, UNIT);
        assert_eq!(receipt.refund, 0);
        assert_eq!(ledger.balance_of(buyer()), UNIT / 2);
        assert_eq!(vault.total(), UNIT);
        assert_eq!(auctions.global_issued_supply(), UNIT / 2);
    }

    #[test]
    fn test_zero_funds_rejected() {
        let (mut auctions, _clock, mut ledger, mut vault) = setup();
        let err = auctions
            .purchase(&mut ledger, &mut vault, buyer(), 0)
            .unwrap_err();
        assert!(matches!(err, MetroError::Invalid { .. }));
    }

    #[test]
    fn test_before_genesis_and_in_gap_rejected() {
        let clock = ManualClock::new(UnixTime(T));
        let genesis = UnixTime(T + 3 * 3600);
        let mut auctions = Auctions::new(&config(), genesis, clock.clone()).unwrap();
        let mut ledger = MemoryLedger::new();
        let mut vault = ProceedsVault::new();

        let err = auctions
            .purchase(&mut ledger, &mut vault, buyer(), UNIT)
            .unwrap_err();
        assert!(matches!(err, MetroError::AuctionClosed { .. }));

        clock.set(UnixTime(T + 7 * SECONDS_PER_DAY + 4 * 3600));
        let err = auctions
            .purchase(&mut ledger, &mut vault, buyer(), UNIT)
            .unwrap_err();
        assert!(matches!(err, MetroError::AuctionClosed { .. }));
        assert_eq!(ledger.total_supply(), 0);
        assert_eq!(vault.total(), 0);
    }

    #[test]
    fn test_proceeds_failure_rolls_back_mint() {
        let (mut auctions, _clock, mut ledger, mut vault) = setup();
        vault.close();
        let err = auctions
            .purchase(&mut ledger, &mut vault, buyer(), UNIT)
            .unwrap_err();
        assert!(matches!(err, MetroError::Unauthorized { .. }));
        assert_eq!(ledger.total_supply(), 0);
        assert_eq!(auctions.global_issued_supply(), 0);
        assert!(auctions.state().last_purchase.is_none());
    }

    #[test]
    fn test_clamp_to_remaining_supply_refunds() {
        let (mut auctions, _clock, mut ledger, mut vault) = setup();
        // 300 funds at 2 per token would buy 150 tokens; only 100 exist
        let receipt = auctions
            .purchase(&mut ledger, &mut vault, buyer(), 300 * UNIT)
            .unwrap();
        assert_eq!(receipt.tokens_issued, 100 * UNIT);
        assert_eq!(receipt.funds_consumed, 200 * UNIT);
        assert_eq!(receipt.refund, 100 * UNIT);
        assert!(auctions.is_initial_auction_ended());

        let err = auctions
            .purchase(&mut ledger, &mut vault, buyer(), UNIT)
            .unwrap_err();
        assert!(matches!(err, MetroError::SoldOut { .. }));
    }

    #[test]
    fn test_daily_window_limits_and_opening_price() {
        let (mut auctions, clock, mut ledger, mut vault) = setup();
        clock.set(UnixTime(T + 6 * SECONDS_PER_DAY));
        let initial = auctions
            .purchase(&mut ledger, &mut vault, buyer(), UNIT)
            .unwrap();

        clock.set(auctions.daily_auction_start_time());
        assert_eq!(
            auctions.current_price().unwrap(),
            Some((initial.price * 2).min(2 * UNIT))
        );
        let receipt = auctions
            .purchase(&mut ledger, &mut vault, buyer(), 100 * UNIT)
            .unwrap();
        assert_eq!(receipt.tokens_issued, 10 * UNIT);
        assert!(receipt.refund > 0);

        let err = auctions
            .purchase(&mut ledger, &mut vault, buyer(), UNIT)
            .unwrap_err();
        assert!(matches!(err, MetroError::SoldOut { .. }));

        clock.advance_days(1);
        assert!(auctions
            .purchase(&mut ledger, &mut vault, buyer(), UNIT)
            .is_ok());
    }

    #[test]
    fn test_founder_supply_minted_once() {
        let (mut auctions, _clock, mut ledger, _vault) = setup();
        let founder = AccountId::from_label("founder");
        let founders = [FounderAllocation::new(founder, 50 * UNIT)];
        auctions.mint_initial_supply(&mut ledger, &founders).unwrap();

        let locker = auctions.token_locker(founder).unwrap();
        assert_eq!(ledger.balance_of(locker.account()), 50 * UNIT);
        assert_eq!(auctions.global_issued_supply(), 50 * UNIT);
        assert_eq!(auctions.is_locker_locked(founder), Some(true));
        assert!(auctions.mint_initial_supply(&mut ledger, &founders).is_err());
    }

    #[test]
    fn test_founder_supply_cannot_crowd_out_initial_auction() {
        let (mut auctions, _clock, mut ledger, _vault) = setup();
        let founders = [FounderAllocation::new(
            AccountId::from_label("founder"),
            901 * UNIT,
        )];
        assert!(auctions.mint_initial_supply(&mut ledger, &founders).is_err());
        assert_eq!(ledger.total_supply(), 0);
    }

    #[test]
    fn test_locker_withdrawal_after_initial_auction() {
        let (mut auctions, clock, mut ledger, _vault) = setup();
        let founder = AccountId::from_label("founder");
        auctions
            .mint_initial_supply(&mut ledger, &[FounderAllocation::new(founder, 5 * UNIT)])
            .unwrap();

        assert!(auctions
            .withdraw_from_locker(&mut ledger, founder, UNIT)
            .is_err());

        clock.set(auctions.initial_auction_end_time());
        auctions
            .withdraw_from_locker(&mut ledger, founder, 2 * UNIT)
            .unwrap();
        assert_eq!(ledger.balance_of(founder), 2 * UNIT);
        assert_eq!(auctions.token_locker(founder).unwrap().remaining(), 3 * UNIT);
        assert!(auctions
            .withdraw_from_locker(&mut ledger, founder, 4 * UNIT)
            .is_err());
    }
}
