//! Effect interfaces consumed by the auction engine and the token porter
//!
//! These traits are the seams to the external collaborators: the balance
//! ledger, the proceeds collector and the wall clock. Handlers live in
//! `metro-ledger`. Every operation here is synchronous and all-or-nothing;
//! an `Err` means the handler left its state untouched.
//!
//! [`IssuanceSchedule`] is the read-only view of the auction that the bridge
//! needs when stamping export receipts and bounding daily imports.

use crate::time::UnixTime;
use crate::types::{AccountId, Amount};
use crate::Result;
use std::sync::Arc;

/// Fungible token ledger: balances plus total supply
pub trait LedgerEffects {
    /// Create `amount` new units in `account`, growing total supply
    fn mint(&mut self, account: AccountId, amount: Amount) -> Result<()>;

    /// Destroy `amount` units held by `account`, shrinking total supply.
    ///
    /// Fails with `InsufficientBalance` if the account holds less.
    fn burn(&mut self, account: AccountId, amount: Amount) -> Result<()>;

    /// Move `amount` units between accounts
    fn transfer(&mut self, from: AccountId, to: AccountId, amount: Amount) -> Result<()>;

    /// Current balance of `account` (zero if unknown)
    fn balance_of(&self, account: AccountId) -> Amount;

    /// Sum of all balances
    fn total_supply(&self) -> Amount;
}

/// Custody for auction proceeds
pub trait ProceedsEffects {
    /// Accept `funds` forwarded from a purchase by `from`
    fn receive(&mut self, from: AccountId, funds: Amount) -> Result<()>;
}

/// Wall-clock source
pub trait ClockEffects {
    /// Current time in Unix seconds
    fn now(&self) -> UnixTime;
}

impl<T: ClockEffects + ?Sized> ClockEffects for &T {
    fn now(&self) -> UnixTime {
        (**self).now()
    }
}

impl<T: ClockEffects + ?Sized> ClockEffects for Arc<T> {
    fn now(&self) -> UnixTime {
        (**self).now()
    }
}

/// Read-only view of the issuance schedule
pub trait IssuanceSchedule {
    /// Instant the auction family began
    fn genesis_time(&self) -> UnixTime;

    /// Current auction tick
    fn current_tick(&self) -> u64;

    /// Units the daily auction issues per day; also this ledger's daily
    /// import allowance
    fn daily_mintable(&self) -> Amount;

    /// Whether the initial auction has ended (by time or by sellout)
    fn is_initial_auction_ended(&self) -> bool;
}

impl<T: IssuanceSchedule + ?Sized> IssuanceSchedule for &T {
    fn genesis_time(&self) -> UnixTime {
        (**self).genesis_time()
    }

    fn current_tick(&self) -> u64 {
        (**self).current_tick()
    }

    fn daily_mintable(&self) -> Amount {
        (**self).daily_mintable()
    }

    fn is_initial_auction_ended(&self) -> bool {
        (**self).is_initial_auction_ended()
    }
}

impl<T: IssuanceSchedule + ?Sized> IssuanceSchedule for Arc<T> {
    fn genesis_time(&self) -> UnixTime {
        (**self).genesis_time()
    }

    fn current_tick(&self) -> u64 {
        (**self).current_tick()
    }

    fn daily_mintable(&self) -> Amount {
        (**self).daily_mintable()
    }

    fn is_initial_auction_ended(&self) -> bool {
        (**self).is_initial_auction_ended()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed;

    impl IssuanceSchedule for Fixed {
        fn genesis_time(&self) -> UnixTime {
            UnixTime(86_400)
        }
        fn current_tick(&self) -> u64 {
            3
        }
        fn daily_mintable(&self) -> Amount {
            2_880
        }
        fn is_initial_auction_ended(&self) -> bool {
            false
        }
    }

    fn view<S: IssuanceSchedule + ?Sized>(schedule: &S) -> (UnixTime, u64, Amount, bool) {
        (
            schedule.genesis_time(),
            schedule.current_tick(),
            schedule.daily_mintable(),
            schedule.is_initial_auction_ended(),
        )
    }

    #[test]
    fn test_schedule_through_shared_handles() {
        let expected = (UnixTime(86_400), 3, 2_880, false);
        let shared: Arc<dyn IssuanceSchedule> = Arc::new(Fixed);
        assert_eq!(view(&shared), expected);
        assert_eq!(view(&&Fixed), expected);
        assert_eq!(view(&Arc::new(Fixed)), expected);
    }
}
