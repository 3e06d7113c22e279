//! Unified error system for Metro
//!
//! Every public operation in the workspace returns [`Result`]. A returned
//! error always means the operation was rejected as a whole: no balance,
//! supply, chain or import state was changed.

use serde::{Deserialize, Serialize};

/// Unified error type for all Metro operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum MetroError {
    /// Invalid input (zero amounts, malformed identifiers, bad arguments)
    #[error("Invalid: {message}")]
    Invalid {
        /// Error message describing the invalid input
        message: String,
    },

    /// Account balance cannot cover a burn or transfer
    #[error("Insufficient balance: required {required}, available {available}")]
    InsufficientBalance {
        /// Amount the operation needed
        required: u128,
        /// Amount the account holds
        available: u128,
    },

    /// No auction window is open at the current time
    #[error("Auction closed: {message}")]
    AuctionClosed {
        /// Why no window is open
        message: String,
    },

    /// The open auction window (or the hard supply cap) has nothing left to sell
    #[error("Sold out: {message}")]
    SoldOut {
        /// Which allowance is exhausted
        message: String,
    },

    /// Chain identifier is not part of the configured chain table
    #[error("Unknown chain: {chain}")]
    UnknownChain {
        /// Display form of the offending chain id
        chain: String,
    },

    /// An import for this (source chain, burn sequence) already exists
    #[error("Already imported: {chain} burn sequence {sequence}")]
    AlreadyImported {
        /// Source chain of the export
        chain: String,
        /// Burn sequence of the export
        sequence: u64,
    },

    /// Import would exceed the remaining daily mintable allowance
    #[error("Daily mint limit exceeded: requested {requested}, remaining {remaining}")]
    DailyLimitExceeded {
        /// Amount the import asked for
        requested: u128,
        /// Allowance left for the current day
        remaining: u128,
    },

    /// Arithmetic overflow or underflow
    #[error("Overflow: {message}")]
    Overflow {
        /// Which computation overflowed
        message: String,
    },

    /// Receipt, proof or chain failed integrity checks
    #[error("Integrity error: {message}")]
    Integrity {
        /// Which check failed
        message: String,
    },

    /// Caller is not allowed to perform the operation
    #[error("Unauthorized: {message}")]
    Unauthorized {
        /// Error message describing the authorization failure
        message: String,
    },

    /// Configuration could not be loaded or failed validation
    #[error("Config error: {message}")]
    Config {
        /// Error message describing the configuration problem
        message: String,
    },

    /// Internal system error
    #[error("Internal error: {message}")]
    Internal {
        /// Error message describing the internal error
        message: String,
    },
}

impl MetroError {
    /// Create an invalid input error
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }

    /// Create an insufficient balance error
    pub fn insufficient_balance(required: u128, available: u128) -> Self {
        Self::InsufficientBalance {
            required,
            available,
        }
    }

    /// Create an auction closed error
    pub fn auction_closed(message: impl Into<String>) -> Self {
        Self::AuctionClosed {
            message: message.into(),
        }
    }

    /// Create a sold out error
    pub fn sold_out(message: impl Into<String>) -> Self {
        Self::SoldOut {
            message: message.into(),
        }
    }

    /// Create an unknown chain error
    pub fn unknown_chain(chain: impl std::fmt::Display) -> Self {
        Self::UnknownChain {
            chain: chain.to_string(),
        }
    }

    /// Create an already imported error
    pub fn already_imported(chain: impl std::fmt::Display, sequence: u64) -> Self {
        Self::AlreadyImported {
            chain: chain.to_string(),
            sequence,
        }
    }

    /// Create a daily limit error
    pub fn daily_limit_exceeded(requested: u128, remaining: u128) -> Self {
        Self::DailyLimitExceeded {
            requested,
            remaining,
        }
    }

    /// Create an overflow error
    pub fn overflow(message: impl Into<String>) -> Self {
        Self::Overflow {
            message: message.into(),
        }
    }

    /// Create an integrity error
    pub fn integrity(message: impl Into<String>) -> Self {
        Self::Integrity {
            message: message.into(),
        }
    }

    /// Create an unauthorized error
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// True for errors caused by the caller's input or the current
    /// auction/bridge state, as opposed to configuration or internal faults.
    pub fn is_rejection(&self) -> bool {
        !matches!(self, Self::Config { .. } | Self::Internal { .. })
    }
}

/// Standard Result type for Metro operations
pub type Result<T> = std::result::Result<T, MetroError>;

impl From<std::io::Error> for MetroError {
    fn from(err: std::io::Error) -> Self {
        Self::config(err.to_string())
    }
}

impl From<toml::de::Error> for MetroError {
    fn from(err: toml::de::Error) -> Self {
        Self::config(format!("Invalid TOML: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = MetroError::invalid("test message");
        assert!(matches!(err, MetroError::Invalid { .. }));
        assert_eq!(err.to_string(), "Invalid: test message");
    }

    #[test]
    fn test_structured_messages() {
        let err = MetroError::insufficient_balance(10, 3);
        assert_eq!(
            err.to_string(),
            "Insufficient balance: required 10, available 3"
        );

        let err = MetroError::already_imported("ETH", 7);
        assert_eq!(err.to_string(), "Already imported: ETH burn sequence 7");
    }

    #[test]
    fn test_rejection_classification() {
        assert!(MetroError::sold_out("initial").is_rejection());
        assert!(MetroError::integrity("bad hash").is_rejection());
        assert!(!MetroError::config("missing").is_rejection());
        assert!(!MetroError::internal("bug").is_rejection());
    }

    #[test]
    fn test_io_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = MetroError::from(io_err);
        assert!(matches!(err, MetroError::Config { .. }));
    }
}
