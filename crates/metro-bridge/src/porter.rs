//! Token porter: export by burning, import by minting
//!
//! [`TokenPorter`] owns the local export chain, the import ledger, the last
//! known supply of every remote chain and the proof verifier. The balance
//! ledger and the issuance schedule are passed in per call, so the porter
//! never holds a second handle on state the auction also mutates.
//!
//! Both operations stage every check and every derived value first, then
//! perform the single ledger effect, then commit local state. A rejected call
//! burns, mints and records nothing.

use crate::chain::{ExportChain, ExportDraft};
use crate::import::ImportLedger;
use crate::record::{ExportRecord, MAX_EXTRA_DATA};
use crate::verifier::{ImportProof, ProofVerifier};
use metro_core::{
    AccountId, Amount, BridgeConfig, ChainId, ChainTable, ClockEffects, IssuanceSchedule,
    LedgerEffects, MetroError, Result, SupplySnapshot, SUPPLY_SLOTS,
};
use std::collections::BTreeMap;

/// Arguments of an export
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRequest {
    /// Holder whose tokens are burned
    pub caller: AccountId,
    /// Ledger the tokens are headed to
    pub destination_chain: ChainId,
    /// Token contract on the destination ledger
    pub destination_contract: AccountId,
    /// Account credited on import
    pub recipient: AccountId,
    /// Units to burn
    pub amount: Amount,
    /// Opaque payload, at most [`MAX_EXTRA_DATA`] bytes
    pub extra_data: Vec<u8>,
}

/// Bridge endpoint of one ledger
#[derive(Debug, Clone)]
pub struct TokenPorter<V, C> {
    local_chain: ChainId,
    chains: ChainTable,
    exports: ExportChain,
    imports: ImportLedger,
    remote_supply: SupplySnapshot,
    remote_synced: BTreeMap<ChainId, u64>,
    verifier: V,
    clock: C,
}

impl<V: ProofVerifier, C: ClockEffects> TokenPorter<V, C> {
    /// Porter for `local_chain`, which must be listed in `chains`
    pub fn new(local_chain: ChainId, chains: ChainTable, verifier: V, clock: C) -> Result<Self> {
        if !chains.contains(local_chain) {
            return Err(MetroError::unknown_chain(local_chain));
        }
        tracing::info!(chain = %local_chain, chains = chains.len(), "token porter initialized");
        Ok(Self {
            local_chain,
            chains,
            exports: ExportChain::new(local_chain),
            imports: ImportLedger::new(),
            remote_supply: [0; SUPPLY_SLOTS],
            remote_synced: BTreeMap::new(),
            verifier,
            clock,
        })
    }

    /// Porter configured from the `[bridge]` section
    pub fn from_config(config: &BridgeConfig, verifier: V, clock: C) -> Result<Self> {
        config.validate()?;
        Self::new(config.local_chain_id()?, config.chain_table()?, verifier, clock)
    }

    /// This ledger's id
    pub fn local_chain(&self) -> ChainId {
        self.local_chain
    }

    /// Chain table in slot order
    pub fn chain_table(&self) -> &ChainTable {
        &self.chains
    }

    /// Local export log
    pub fn export_chain(&self) -> &ExportChain {
        &self.exports
    }

    /// Accepted imports
    pub fn import_ledger(&self) -> &ImportLedger {
        &self.imports
    }

    /// Proof verifier
    pub fn verifier(&self) -> &V {
        &self.verifier
    }

    /// Proof verifier, for feeding relay commitments
    pub fn verifier_mut(&mut self) -> &mut V {
        &mut self.verifier
    }

    /// Last synchronized supply of `chain`
    pub fn remote_supply(&self, chain: ChainId) -> Option<Amount> {
        self.chains
            .slot_of(chain)
            .filter(|_| chain != self.local_chain)
            .map(|slot| self.remote_supply[slot])
    }

    /// Store the supply the relay observed on another chain
    pub fn record_remote_supply(&mut self, chain: ChainId, supply: Amount) -> Result<()> {
        let slot = self.remote_slot(chain)?;
        self.remote_supply[slot] = supply;
        tracing::debug!(%chain, supply, "remote supply synchronized");
        Ok(())
    }

    /// Supply snapshot with `local_supply` in the local slot
    pub fn supply_snapshot(&self, local_supply: Amount) -> SupplySnapshot {
        let mut snapshot = [0; SUPPLY_SLOTS];
        for (slot, chain) in self.chains.chains().iter().enumerate() {
            snapshot[slot] = if *chain == self.local_chain {
                local_supply
            } else {
                self.remote_supply[slot]
            };
        }
        snapshot
    }

    /// Burn `request.amount` from the caller and append the export receipt
    pub fn export<L, S>(
        &mut self,
        ledger: &mut L,
        schedule: &S,
        request: ExportRequest,
    ) -> Result<ExportRecord>
    where
        L: LedgerEffects,
        S: IssuanceSchedule + ?Sized,
    {
        let caller = request.caller;
        let record = match self.stage_export(ledger, schedule, request) {
            Ok(record) => record,
            Err(err) => {
                tracing::debug!(%caller, error = %err, "export rejected");
                return Err(err);
            }
        };

        ledger.burn(caller, record.amount_burned)?;
        if let Err(err) = self.exports.commit(record.clone()) {
            ledger
                .mint(caller, record.amount_burned)
                .map_err(|_| MetroError::internal("Export rollback failed after chain error"))?;
            return Err(err);
        }

        tracing::info!(
            %caller,
            sequence = record.burn_sequence,
            destination = %record.destination_chain,
            amount = record.amount_burned,
            hash = %record.current_hash,
            "export appended"
        );
        Ok(record)
    }

    fn stage_export<L, S>(
        &self,
        ledger: &L,
        schedule: &S,
        request: ExportRequest,
    ) -> Result<ExportRecord>
    where
        L: LedgerEffects,
        S: IssuanceSchedule + ?Sized,
    {
        if request.amount == 0 {
            return Err(MetroError::invalid("Export amount must be positive"));
        }
        let destination = request.destination_chain;
        if destination.is_zero() || !self.chains.contains(destination) {
            return Err(MetroError::unknown_chain(destination));
        }
        if request.recipient.is_zero() {
            return Err(MetroError::invalid("Export recipient must not be the zero address"));
        }
        if request.extra_data.len() > MAX_EXTRA_DATA {
            return Err(MetroError::invalid(format!(
                "Extra data is {} bytes, limit is {MAX_EXTRA_DATA}",
                request.extra_data.len()
            )));
        }

        let balance = ledger.balance_of(request.caller);
        if balance < request.amount {
            return Err(MetroError::insufficient_balance(request.amount, balance));
        }
        let supply_after = ledger
            .total_supply()
            .checked_sub(request.amount)
            .ok_or_else(|| MetroError::internal("Total supply below a holder's balance"))?;

        Ok(self.exports.prepare(ExportDraft {
            destination_chain: destination,
            destination_contract: request.destination_contract,
            recipient: request.recipient,
            amount_burned: request.amount,
            extra_data: request.extra_data,
            tick_at_export: schedule.current_tick(),
            daily_mintable: schedule.daily_mintable(),
            supply_on_all_chains: self.supply_snapshot(supply_after),
            genesis_time: schedule.genesis_time(),
        }))
    }

    /// Mint the amount of a verified export from `source` to its recipient.
    ///
    /// The day's import allowance comes from the local `schedule`. A record
    /// whose `daily_mintable` disagrees with it is rejected.
    ///
    /// Returns the amount minted.
    pub fn import<L, S>(
        &mut self,
        ledger: &mut L,
        schedule: &S,
        source: ChainId,
        record: &ExportRecord,
        proof: &ImportProof,
    ) -> Result<Amount>
    where
        L: LedgerEffects,
        S: IssuanceSchedule + ?Sized,
    {
        let now = self.clock.now();
        let daily_mintable = schedule.daily_mintable();
        let staged = match self
            .check_import(source, record, proof, daily_mintable)
            .and_then(|()| self.imports.stage(record, daily_mintable, now))
        {
            Ok(staged) => staged,
            Err(err) => {
                tracing::warn!(
                    %source,
                    sequence = record.burn_sequence,
                    error = %err,
                    "import rejected"
                );
                return Err(err);
            }
        };

        ledger.mint(record.recipient, record.amount_burned)?;
        if let Err(err) = self.imports.commit(staged) {
            ledger
                .burn(record.recipient, record.amount_burned)
                .map_err(|_| MetroError::internal("Import rollback failed after ledger error"))?;
            return Err(err);
        }
        self.sync_from_record(source, record);

        tracing::info!(
            %source,
            sequence = record.burn_sequence,
            recipient = %record.recipient,
            amount = record.amount_burned,
            "import accepted"
        );
        Ok(record.amount_burned)
    }

    fn check_import(
        &self,
        source: ChainId,
        record: &ExportRecord,
        proof: &ImportProof,
        daily_mintable: Amount,
    ) -> Result<()> {
        self.remote_slot(source)?;
        if record.source_chain != source {
            return Err(MetroError::integrity(format!(
                "Record was exported by {}, not {source}",
                record.source_chain
            )));
        }
        if record.destination_chain != self.local_chain {
            return Err(MetroError::integrity(format!(
                "Record is addressed to {}, not {}",
                record.destination_chain, self.local_chain
            )));
        }
        if record.recipient.is_zero() {
            return Err(MetroError::invalid("Import recipient must not be the zero address"));
        }
        if !record.verify_hash() {
            return Err(MetroError::integrity(format!(
                "Hash of {source} export {} does not match its fields",
                record.burn_sequence
            )));
        }
        if !self.verifier.validate(record, proof) {
            return Err(MetroError::integrity(format!(
                "Proof for {source} export {} was rejected",
                record.burn_sequence
            )));
        }
        if record.daily_mintable != daily_mintable {
            return Err(MetroError::integrity(format!(
                "{source} export {} claims daily issuance {}, local is {daily_mintable}",
                record.burn_sequence, record.daily_mintable
            )));
        }
        Ok(())
    }

    /// Take the source's own post-burn supply from the newest record seen
    fn sync_from_record(&mut self, source: ChainId, record: &ExportRecord) {
        let Some(slot) = self.chains.slot_of(source) else {
            return;
        };
        let newest = self.remote_synced.get(&source).copied().unwrap_or(0);
        if record.burn_sequence > newest {
            self.remote_supply[slot] = record.supply_on_all_chains[slot];
            self.remote_synced.insert(source, record.burn_sequence);
        }
    }

    fn remote_slot(&self, chain: ChainId) -> Result<usize> {
        if chain == self.local_chain {
            return Err(MetroError::invalid(format!("{chain} is the local chain")));
        }
        self.chains
            .slot_of(chain)
            .ok_or_else(|| MetroError::unknown_chain(chain))
    }
}
