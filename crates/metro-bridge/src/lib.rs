//! Metro Bridge - cross-ledger export and import
//!
//! A holder exports by burning tokens on one ledger; the ledger appends a
//! hash-chained [`ExportRecord`] to its [`ExportChain`]. A relay ships the
//! record to the destination, where [`TokenPorter::import`] recomputes the
//! hash, asks a [`ProofVerifier`] to accept it, guards against replay and
//! against the daily mint allowance, and mints the same amount.
//!
//! Every ledger in a deployment shares one [`metro_core::ChainTable`]; a
//! chain's position in the table is its slot in the six-entry supply
//! snapshot each receipt carries.

#![forbid(unsafe_code)]

/// Append-only export chain
pub mod chain;
/// Import bookkeeping
pub mod import;
/// Token porter
pub mod porter;
/// Export and import receipts
pub mod record;
/// Proof verification
pub mod verifier;

pub use chain::{ExportChain, ExportDraft};
pub use import::{DailyAllowance, ImportLedger, StagedImport};
pub use porter::{ExportRequest, TokenPorter};
pub use record::{ExportRecord, ImportRecord, MAX_EXTRA_DATA};
pub use verifier::{
    ChainLinkVerifier, Checkpoint, ImportProof, ProofVerifier, RelayAttestationVerifier,
};
