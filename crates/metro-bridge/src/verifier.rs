//! Import proof verification
//!
//! The importer never trusts a receipt on its own hash alone: a
//! [`ProofVerifier`] must also tie the record to something the relay
//! committed for the source chain.

use crate::record::ExportRecord;
use metro_core::{ChainId, Hash32, MetroError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Evidence shipped with an export record
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportProof {
    /// Later records of the same export chain, in order, ending at a
    /// committed head
    pub links: Vec<ExportRecord>,
}

impl ImportProof {
    /// Proof with no links; enough when the record is itself the committed head
    pub fn empty() -> Self {
        Self::default()
    }

    /// Proof from the records that follow the imported one
    pub fn from_links(links: Vec<ExportRecord>) -> Self {
        Self { links }
    }
}

/// Pluggable acceptance check for imports
pub trait ProofVerifier {
    /// Whether `proof` establishes `record` as a genuine export
    fn validate(&self, record: &ExportRecord, proof: &ImportProof) -> bool;
}

impl<T: ProofVerifier + ?Sized> ProofVerifier for &T {
    fn validate(&self, record: &ExportRecord, proof: &ImportProof) -> bool {
        (**self).validate(record, proof)
    }
}

/// Head of a remote export chain as committed by the relay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Sequence of the head record
    pub sequence: u64,
    /// Hash of the head record
    pub hash: Hash32,
}

/// Accepts a record when the proof's links walk from it, hash by hash, to
/// the committed head of its source chain
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainLinkVerifier {
    heads: BTreeMap<ChainId, Checkpoint>,
}

impl ChainLinkVerifier {
    /// Verifier with no commitments
    pub fn new() -> Self {
        Self::default()
    }

    /// Committed head for `chain`
    pub fn head(&self, chain: ChainId) -> Option<Checkpoint> {
        self.heads.get(&chain).copied()
    }

    /// Record the relay's head for `chain`.
    ///
    /// Heads only move forward; re-committing the same head is a no-op.
    pub fn commit_head(&mut self, chain: ChainId, sequence: u64, hash: Hash32) -> Result<()> {
        if sequence == 0 {
            return Err(MetroError::invalid("Checkpoint sequence starts at 1"));
        }
        if let Some(current) = self.heads.get(&chain) {
            if sequence < current.sequence {
                return Err(MetroError::integrity(format!(
                    "Checkpoint for {chain} cannot move back from {} to {sequence}",
                    current.sequence
                )));
            }
            if sequence == current.sequence && hash != current.hash {
                return Err(MetroError::integrity(format!(
                    "Conflicting checkpoint for {chain} at sequence {sequence}"
                )));
            }
        }
        tracing::debug!(%chain, sequence, "checkpoint committed");
        self.heads.insert(chain, Checkpoint { sequence, hash });
        Ok(())
    }
}

impl ProofVerifier for ChainLinkVerifier {
    fn validate(&self, record: &ExportRecord, proof: &ImportProof) -> bool {
        let Some(head) = self.heads.get(&record.source_chain) else {
            return false;
        };
        let mut tip = record;
        for link in &proof.links {
            if !link.follows(tip) || !link.verify_hash() {
                return false;
            }
            tip = link;
        }
        tip.burn_sequence == head.sequence && tip.current_hash == head.hash
    }
}

/// Accepts exactly the `(chain, sequence, hash)` triples the relay attested
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayAttestationVerifier {
    attested: BTreeSet<(ChainId, u64, Hash32)>,
}

impl RelayAttestationVerifier {
    /// Verifier with no attestations
    pub fn new() -> Self {
        Self::default()
    }

    /// Attest an export
    pub fn attest(&mut self, chain: ChainId, sequence: u64, hash: Hash32) {
        self.attested.insert((chain, sequence, hash));
    }

    /// Attest an export record directly
    pub fn attest_record(&mut self, record: &ExportRecord) {
        self.attest(record.source_chain, record.burn_sequence, record.current_hash);
    }

    /// Whether the triple was attested
    pub fn is_attested(&self, chain: ChainId, sequence: u64, hash: Hash32) -> bool {
        self.attested.contains(&(chain, sequence, hash))
    }
}

impl ProofVerifier for RelayAttestationVerifier {
    fn validate(&self, record: &ExportRecord, _proof: &ImportProof) -> bool {
        self.is_attested(record.source_chain, record.burn_sequence, record.current_hash)
    }
}
