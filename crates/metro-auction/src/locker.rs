//! Founder token lockers
//!
//! A locker holds a founder's pre-minted allocation in a ledger account of its
//! own. It stays locked until the initial auction ends; the unlock is read
//! lazily from the [`IssuanceSchedule`] and latched the first time it is
//! observed, so it can never flip back.

use metro_core::{hash, AccountId, Amount, IssuanceSchedule, MetroError, Result};
use serde::{Deserialize, Serialize};

/// A founder's share of the initial supply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FounderAllocation {
    /// Founder receiving the allocation once unlocked
    pub owner: AccountId,
    /// Allocation in token base units
    pub amount: Amount,
}

impl FounderAllocation {
    /// Allocation of `amount` base units to `owner`
    pub fn new(owner: AccountId, amount: Amount) -> Self {
        Self { owner, amount }
    }
}

/// Custody for one founder allocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenLocker {
    owner: AccountId,
    account: AccountId,
    locked_amount: Amount,
    withdrawn: Amount,
    released: bool,
}

impl TokenLocker {
    /// New locked locker for `allocation`
    pub fn new(allocation: FounderAllocation) -> Self {
        Self {
            owner: allocation.owner,
            account: Self::account_for(allocation.owner),
            locked_amount: allocation.amount,
            withdrawn: 0,
            released: false,
        }
    }

    /// Ledger account that holds the locked tokens of `owner`
    pub fn account_for(owner: AccountId) -> AccountId {
        let mut h = hash::hasher();
        h.update(b"metro.token-locker");
        h.update(owner.as_bytes());
        let digest = h.finalize();
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&digest[..20]);
        AccountId::from_bytes(bytes)
    }

    /// Founder that owns the allocation
    pub fn owner(&self) -> AccountId {
        self.owner
    }

    /// Ledger account holding the tokens
    pub fn account(&self) -> AccountId {
        self.account
    }

    /// Allocation placed in the locker at initialization
    pub fn locked_amount(&self) -> Amount {
        self.locked_amount
    }

    /// Allocation already paid out to the owner
    pub fn withdrawn(&self) -> Amount {
        self.withdrawn
    }

    /// Allocation still held by the locker
    pub fn remaining(&self) -> Amount {
        self.locked_amount.saturating_sub(self.withdrawn)
    }

    /// True until the initial auction has ended
    pub fn locked<S: IssuanceSchedule + ?Sized>(&self, schedule: &S) -> bool {
        !self.released && !schedule.is_initial_auction_ended()
    }

    /// Latch the unlock if the schedule says the initial auction is over.
    ///
    /// Returns true only on the call that performs the transition.
    pub fn refresh<S: IssuanceSchedule + ?Sized>(&mut self, schedule: &S) -> bool {
        if self.released || !schedule.is_initial_auction_ended() {
            return false;
        }
        self.released = true;
        tracing::info!(owner = %self.owner, amount = self.locked_amount, "token locker unlocked");
        true
    }

    /// Check a withdrawal against lock state and remaining allocation and
    /// return the new withdrawn total
    pub(crate) fn stage_withdrawal<S: IssuanceSchedule + ?Sized>(
        &self,
        schedule: &S,
        amount: Amount,
    ) -> Result<Amount> {
        if amount == 0 {
            return Err(MetroError::invalid("Withdrawal must be positive"));
        }
        if self.locked(schedule) {
            return Err(MetroError::unauthorized(format!(
                "Locker for {} is locked until the initial auction ends",
                self.owner
            )));
        }
        if amount > self.remaining() {
            return Err(MetroError::insufficient_balance(amount, self.remaining()));
        }
        self.withdrawn
            .checked_add(amount)
            .ok_or_else(|| MetroError::overflow("locker withdrawals"))
    }

    pub(crate) fn commit_withdrawal(&mut self, withdrawn: Amount) {
        self.released = true;
        self.withdrawn = withdrawn;
    }
}
