//! Core identifier and value types shared by the auction and the bridge

use crate::{hash, MetroError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Token and fund amounts, in base units
pub type Amount = u128;

/// Number of slots in an export receipt's supply snapshot
pub const SUPPLY_SLOTS: usize = 6;

/// Per-chain total supply snapshot carried by every export receipt
pub type SupplySnapshot = [Amount; SUPPLY_SLOTS];

/// Account address on a ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AccountId(pub [u8; 20]);

impl AccountId {
    /// The zero address
    pub const ZERO: Self = Self([0u8; 20]);

    /// Create from raw bytes
    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Derive a deterministic address from a label
    pub fn from_label(label: &str) -> Self {
        let digest = hash::hash(label.as_bytes());
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&digest[..20]);
        Self(bytes)
    }

    /// Raw address bytes
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// True for the zero address
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for AccountId {
    type Err = MetroError;

    fn from_str(s: &str) -> Result<Self> {
        let raw = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(raw)
            .map_err(|e| MetroError::invalid(format!("Invalid account hex: {e}")))?;
        let bytes: [u8; 20] = bytes
            .try_into()
            .map_err(|_| MetroError::invalid("Account address must be 20 bytes"))?;
        Ok(Self(bytes))
    }
}

/// Ledger identifier: up to eight ASCII bytes, zero padded (`"ETH"`, `"ETC"`).
///
/// The all-zero id is reserved and never names a ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChainId(pub [u8; 8]);

impl ChainId {
    /// The reserved zero id
    pub const ZERO: Self = Self([0u8; 8]);

    /// Build a chain id from a short ASCII name
    pub fn new(name: &str) -> Result<Self> {
        let raw = name.as_bytes();
        if raw.is_empty() || raw.len() > 8 || !name.is_ascii() {
            return Err(MetroError::invalid(format!(
                "Chain name must be 1-8 ASCII bytes: {name:?}"
            )));
        }
        if raw.contains(&0) {
            return Err(MetroError::invalid("Chain name must not contain NUL"));
        }
        let mut bytes = [0u8; 8];
        bytes[..raw.len()].copy_from_slice(raw);
        Ok(Self(bytes))
    }

    /// Raw padded bytes
    pub fn as_bytes(&self) -> &[u8; 8] {
        &self.0
    }

    /// True for the reserved zero id
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 8]
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let end = self.0.iter().position(|b| *b == 0).unwrap_or(8);
        match std::str::from_utf8(&self.0[..end]) {
            Ok(name) if !name.is_empty() => f.write_str(name),
            _ => write!(f, "0x{}", hex::encode(self.0)),
        }
    }
}

impl FromStr for ChainId {
    type Err = MetroError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

/// 32-byte digest used for receipt hashes and chain heads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Hash32(pub [u8; 32]);

impl Hash32 {
    /// All-zero digest; the `prev_hash` of the first export on every chain
    pub const ZERO: Self = Self([0u8; 32]);

    /// Wrap raw digest bytes
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Hash arbitrary bytes with the global algorithm
    pub fn digest(data: &[u8]) -> Self {
        Self(hash::hash(data))
    }

    /// Raw digest bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex encoding
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from a 64-character hex string
    pub fn from_hex(s: &str) -> Result<Self> {
        let bytes =
            hex::decode(s).map_err(|e| MetroError::invalid(format!("Invalid hash hex: {e}")))?;
        let bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|_| MetroError::invalid("Hash must be 32 bytes"))?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for Hash32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Ordered table of the ledgers taking part in the bridge.
///
/// The position of a chain in the table is its slot in every
/// [`SupplySnapshot`], so all ledgers must share the same ordering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChainTable {
    chains: Vec<ChainId>,
}

impl ChainTable {
    /// Build a table, rejecting zero ids, duplicates and more than
    /// [`SUPPLY_SLOTS`] entries
    pub fn new(chains: Vec<ChainId>) -> Result<Self> {
        if chains.is_empty() {
            return Err(MetroError::invalid("Chain table must not be empty"));
        }
        if chains.len() > SUPPLY_SLOTS {
            return Err(MetroError::invalid(format!(
                "Chain table holds at most {SUPPLY_SLOTS} chains, got {}",
                chains.len()
            )));
        }
        for (i, chain) in chains.iter().enumerate() {
            if chain.is_zero() {
                return Err(MetroError::invalid("Chain table contains the zero id"));
            }
            if chains[..i].contains(chain) {
                return Err(MetroError::invalid(format!("Duplicate chain {chain}")));
            }
        }
        Ok(Self { chains })
    }

    /// Build a table from ASCII chain names
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Result<Self> {
        let chains = names
            .iter()
            .map(|n| ChainId::new(n.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Self::new(chains)
    }

    /// Supply slot assigned to `chain`
    pub fn slot_of(&self, chain: ChainId) -> Option<usize> {
        self.chains.iter().position(|c| *c == chain)
    }

    /// Whether `chain` is a recognized, non-zero member
    pub fn contains(&self, chain: ChainId) -> bool {
        !chain.is_zero() && self.chains.contains(&chain)
    }

    /// Chains in slot order
    pub fn chains(&self) -> &[ChainId] {
        &self.chains
    }

    /// Number of configured chains
    pub fn len(&self) -> usize {
        self.chains.len()
    }

    /// Always false for a constructed table
    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }
}
