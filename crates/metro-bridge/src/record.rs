//! Export and import receipts
//!
//! An [`ExportRecord`] is the tamper-evident receipt a ledger appends to its
//! export chain for every burn. Its `current_hash` commits to the previous
//! head and to every field the destination relies on, so a relay can ship the
//! record anywhere and the importer can recompute the hash on arrival.

use metro_core::{AccountId, Amount, ChainId, Hash32, SupplySnapshot, UnixTime};
use serde::{Deserialize, Serialize};

/// Largest `extra_data` payload accepted on export
pub const MAX_EXTRA_DATA: usize = 1024;

/// Receipt of one export burn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportRecord {
    /// Ledger that burned the tokens
    pub source_chain: ChainId,
    /// Position in the source's export chain, starting at 1
    pub burn_sequence: u64,
    /// Ledger the tokens are headed to
    pub destination_chain: ChainId,
    /// Token contract on the destination ledger
    pub destination_contract: AccountId,
    /// Account credited on import
    pub recipient: AccountId,
    /// Units destroyed on the source ledger
    pub amount_burned: Amount,
    /// Opaque payload forwarded to the destination
    pub extra_data: Vec<u8>,
    /// Source auction tick at export time
    pub tick_at_export: u64,
    /// Source daily issuance; not hashed, so importers check it against their own
    pub daily_mintable: Amount,
    /// Supply per chain-table slot right after the burn
    pub supply_on_all_chains: SupplySnapshot,
    /// Genesis of the source auction
    pub genesis_time: UnixTime,
    /// Head of the export chain before this record
    pub prev_hash: Hash32,
    /// Commitment over this record and `prev_hash`
    pub current_hash: Hash32,
}

impl ExportRecord {
    /// Bytes hashed into `current_hash`.
    ///
    /// Each field is written as a big-endian `u64` length followed by its
    /// big-endian bytes, in this order: prev_hash, burn_sequence,
    /// destination_chain, recipient, amount_burned, tick_at_export,
    /// extra_data, supply_on_all_chains, genesis_time.
    pub fn preimage(&self) -> Vec<u8> {
        let mut supply = Vec::with_capacity(16 * self.supply_on_all_chains.len());
        for slot in &self.supply_on_all_chains {
            supply.extend_from_slice(&slot.to_be_bytes());
        }

        let mut out = Vec::with_capacity(256 + self.extra_data.len());
        put_field(&mut out, self.prev_hash.as_bytes());
        put_field(&mut out, &self.burn_sequence.to_be_bytes());
        put_field(&mut out, self.destination_chain.as_bytes());
        put_field(&mut out, self.recipient.as_bytes());
        put_field(&mut out, &self.amount_burned.to_be_bytes());
        put_field(&mut out, &self.tick_at_export.to_be_bytes());
        put_field(&mut out, &self.extra_data);
        put_field(&mut out, &supply);
        put_field(&mut out, &self.genesis_time.secs().to_be_bytes());
        out
    }

    /// Recompute the commitment from the record's fields
    pub fn compute_hash(&self) -> Hash32 {
        Hash32::digest(&self.preimage())
    }

    /// Whether `current_hash` matches the record's fields
    pub fn verify_hash(&self) -> bool {
        self.compute_hash() == self.current_hash
    }

    /// Whether `self` directly follows `prev` on the same export chain
    pub fn follows(&self, prev: &ExportRecord) -> bool {
        self.source_chain == prev.source_chain
            && prev.burn_sequence.checked_add(1) == Some(self.burn_sequence)
            && self.prev_hash == prev.current_hash
    }
}

fn put_field(out: &mut Vec<u8>, bytes: &[u8]) {
    out.extend_from_slice(&(bytes.len() as u64).to_be_bytes());
    out.extend_from_slice(bytes);
}

/// Audit entry kept by the destination for every accepted import
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportRecord {
    /// Chain the export came from
    pub source_chain: ChainId,
    /// Burn sequence of the export on that chain
    pub burn_sequence: u64,
    /// Units minted here
    pub amount_minted: Amount,
    /// When the import was accepted
    pub imported_at: UnixTime,
    /// Account credited
    pub recipient: AccountId,
    /// `current_hash` of the imported export
    pub export_hash: Hash32,
}
