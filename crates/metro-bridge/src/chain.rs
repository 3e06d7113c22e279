//! Append-only export chain
//!
//! Every ledger keeps one [`ExportChain`]: the indexed log of its export
//! receipts plus the running head. Appending is split in two so the porter
//! can stage a record, perform the burn, and only then make it visible.

use crate::record::ExportRecord;
use metro_core::{AccountId, Amount, ChainId, Hash32, MetroError, Result, SupplySnapshot, UnixTime};
use serde::{Deserialize, Serialize};

/// Export fields supplied by the porter; sequence and hashes come from the chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportDraft {
    /// Ledger the tokens are headed to
    pub destination_chain: ChainId,
    /// Token contract on the destination ledger
    pub destination_contract: AccountId,
    /// Account credited on import
    pub recipient: AccountId,
    /// Units burned
    pub amount_burned: Amount,
    /// Opaque payload
    pub extra_data: Vec<u8>,
    /// Auction tick at export
    pub tick_at_export: u64,
    /// Daily issuance of the source
    pub daily_mintable: Amount,
    /// Post-burn supply per chain-table slot
    pub supply_on_all_chains: SupplySnapshot,
    /// Genesis of the source auction
    pub genesis_time: UnixTime,
}

/// Export log of one ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportChain {
    source_chain: ChainId,
    records: Vec<ExportRecord>,
    head: Hash32,
}

impl ExportChain {
    /// Empty chain for the ledger `source_chain`
    pub fn new(source_chain: ChainId) -> Self {
        Self {
            source_chain,
            records: Vec::new(),
            head: Hash32::ZERO,
        }
    }

    /// Ledger this chain belongs to
    pub fn source_chain(&self) -> ChainId {
        self.source_chain
    }

    /// Hash of the last record, or zero for an empty chain
    pub fn head(&self) -> Hash32 {
        self.head
    }

    /// Number of exports so far
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True before the first export
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Sequence the next export will receive
    pub fn next_sequence(&self) -> u64 {
        self.records.len() as u64 + 1
    }

    /// Record with burn sequence `sequence`
    pub fn record(&self, sequence: u64) -> Option<&ExportRecord> {
        let index = usize::try_from(sequence.checked_sub(1)?).ok()?;
        self.records.get(index)
    }

    /// Most recent record
    pub fn last(&self) -> Option<&ExportRecord> {
        self.records.last()
    }

    /// All records in sequence order
    pub fn records(&self) -> &[ExportRecord] {
        &self.records
    }

    /// Records after `sequence`, in order
    pub fn records_after(&self, sequence: u64) -> &[ExportRecord] {
        let start = usize::try_from(sequence)
            .unwrap_or(usize::MAX)
            .min(self.records.len());
        &self.records[start..]
    }

    /// Build the next record without appending it
    pub fn prepare(&self, draft: ExportDraft) -> ExportRecord {
        let mut record = ExportRecord {
            source_chain: self.source_chain,
            burn_sequence: self.next_sequence(),
            destination_chain: draft.destination_chain,
            destination_contract: draft.destination_contract,
            recipient: draft.recipient,
            amount_burned: draft.amount_burned,
            extra_data: draft.extra_data,
            tick_at_export: draft.tick_at_export,
            daily_mintable: draft.daily_mintable,
            supply_on_all_chains: draft.supply_on_all_chains,
            genesis_time: draft.genesis_time,
            prev_hash: self.head,
            current_hash: Hash32::ZERO,
        };
        record.current_hash = record.compute_hash();
        record
    }

    /// Append a record produced by [`ExportChain::prepare`] on the current head
    pub fn commit(&mut self, record: ExportRecord) -> Result<()> {
        if record.source_chain != self.source_chain {
            return Err(MetroError::integrity(format!(
                "Record from {} cannot join the {} export chain",
                record.source_chain, self.source_chain
            )));
        }
        if record.burn_sequence != self.next_sequence() || record.prev_hash != self.head {
            return Err(MetroError::integrity(format!(
                "Record {} does not extend the head at sequence {}",
                record.burn_sequence,
                self.records.len()
            )));
        }
        if !record.verify_hash() {
            return Err(MetroError::integrity(format!(
                "Record {} hash does not match its fields",
                record.burn_sequence
            )));
        }
        self.head = record.current_hash;
        self.records.push(record);
        Ok(())
    }

    /// Re-walk the whole log from the zero genesis hash.
    ///
    /// Fails on the first record whose sequence, link or hash is wrong, or if
    /// the stored head differs from the last record's hash.
    pub fn verify(&self) -> Result<()> {
        let mut prev = Hash32::ZERO;
        for (index, record) in self.records.iter().enumerate() {
            let expected = index as u64 + 1;
            let broken = if record.source_chain != self.source_chain {
                Some("foreign source chain")
            } else if record.burn_sequence != expected {
                Some("sequence gap")
            } else if record.prev_hash != prev {
                Some("broken prev_hash link")
            } else if !record.verify_hash() {
                Some("hash mismatch")
            } else {
                None
            };
            if let Some(reason) = broken {
                tracing::warn!(
                    chain = %self.source_chain,
                    sequence = expected,
                    reason,
                    "export chain verification failed"
                );
                return Err(MetroError::integrity(format!(
                    "Export chain {} broken at sequence {expected}: {reason}",
                    self.source_chain
                )));
            }
            prev = record.current_hash;
        }
        if prev != self.head {
            tracing::warn!(chain = %self.source_chain, "export chain head mismatch");
            return Err(MetroError::integrity(format!(
                "Export chain {} head does not match its last record",
                self.source_chain
            )));
        }
        Ok(())
    }
}
