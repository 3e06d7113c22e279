//! In-memory proceeds collector

use metro_core::{AccountId, Amount, MetroError, ProceedsEffects, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Holds forwarded auction funds and remembers who paid them.
///
/// A closed vault refuses deposits, which aborts the purchase that tried to
/// forward them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProceedsVault {
    total: Amount,
    deposits: BTreeMap<AccountId, Amount>,
    closed: bool,
}

impl ProceedsVault {
    /// Open, empty vault
    pub fn new() -> Self {
        Self::default()
    }

    /// All funds received so far
    pub fn total(&self) -> Amount {
        self.total
    }

    /// Funds received from one buyer
    pub fn deposited_by(&self, from: AccountId) -> Amount {
        self.deposits.get(&from).copied().unwrap_or(0)
    }

    /// Stop accepting deposits
    pub fn close(&mut self) {
        self.closed = true;
    }

    /// Resume accepting deposits
    pub fn reopen(&mut self) {
        self.closed = false;
    }
}

impl ProceedsEffects for ProceedsVault {
    fn receive(&mut self, from: AccountId, funds: Amount) -> Result<()> {
        if self.closed {
            return Err(MetroError::unauthorized("Proceeds vault is closed"));
        }
        let total = self
            .total
            .checked_add(funds)
            .ok_or_else(|| MetroError::overflow("proceeds total"))?;
        let deposited = self
            .deposited_by(from)
            .checked_add(funds)
            .ok_or_else(|| MetroError::overflow("proceeds per buyer"))?;

        self.total = total;
        self.deposits.insert(from, deposited);
        tracing::debug!(%from, funds, total, "proceeds received");
        Ok(())
    }
}
