//! In-memory fungible token ledger

use metro_core::{AccountId, Amount, LedgerEffects, MetroError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Balances map plus a total-supply counter.
///
/// Invariant: `total_supply` equals the sum of all balances. Every mutator
/// checks its preconditions before touching either field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryLedger {
    balances: BTreeMap<AccountId, Amount>,
    total_supply: Amount,
}

impl MemoryLedger {
    /// Empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Accounts with a non-zero balance
    pub fn holders(&self) -> impl Iterator<Item = (&AccountId, &Amount)> {
        self.balances.iter().filter(|(_, b)| **b > 0)
    }

    fn check_amount(amount: Amount) -> Result<()> {
        if amount == 0 {
            return Err(MetroError::invalid("Amount must be positive"));
        }
        Ok(())
    }
}

impl LedgerEffects for MemoryLedger {
    fn mint(&mut self, account: AccountId, amount: Amount) -> Result<()> {
        Self::check_amount(amount)?;
        if account.is_zero() {
            return Err(MetroError::invalid("Cannot mint to the zero address"));
        }
        let supply = self
            .total_supply
            .checked_add(amount)
            .ok_or_else(|| MetroError::overflow("total supply on mint"))?;
        let balance = self
            .balance_of(account)
            .checked_add(amount)
            .ok_or_else(|| MetroError::overflow("balance on mint"))?;

        self.total_supply = supply;
        self.balances.insert(account, balance);
        tracing::trace!(%account, amount, supply, "mint");
        Ok(())
    }

    fn burn(&mut self, account: AccountId, amount: Amount) -> Result<()> {
        Self::check_amount(amount)?;
        let available = self.balance_of(account);
        let balance = available
            .checked_sub(amount)
            .ok_or_else(|| MetroError::insufficient_balance(amount, available))?;
        let supply = self
            .total_supply
            .checked_sub(amount)
            .ok_or_else(|| MetroError::internal("total supply below a holder balance"))?;

        self.total_supply = supply;
        self.balances.insert(account, balance);
        tracing::trace!(%account, amount, supply, "burn");
        Ok(())
    }

    fn transfer(&mut self, from: AccountId, to: AccountId, amount: Amount) -> Result<()> {
        Self::check_amount(amount)?;
        if to.is_zero() {
            return Err(MetroError::invalid("Cannot transfer to the zero address"));
        }
        let available = self.balance_of(from);
        let from_balance = available
            .checked_sub(amount)
            .ok_or_else(|| MetroError::insufficient_balance(amount, available))?;
        if from == to {
            return Ok(());
        }
        let to_balance = self
            .balance_of(to)
            .checked_add(amount)
            .ok_or_else(|| MetroError::overflow("balance on transfer"))?;

        self.balances.insert(from, from_balance);
        self.balances.insert(to, to_balance);
        Ok(())
    }

    fn balance_of(&self, account: AccountId) -> Amount {
        self.balances.get(&account).copied().unwrap_or(0)
    }

    fn total_supply(&self) -> Amount {
        self.total_supply
    }
}
