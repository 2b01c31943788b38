use std::time::Duration;

use thiserror::Error;

use crate::TransactionId;

#[derive(Error, Debug)]
pub enum Error {
    #[error("We experienced an IO error")]
    IO(#[from] std::io::Error),
    #[error("Proposal was rejected by a peer: {message}")]
    ProposalRejected { message: String },
    #[error("Expected exactly one set of consistent proposal responses but got {sets}")]
    EndorsementMismatch { sets: usize },
    #[error("No commit event for transaction {tx_id} within {timeout:?}")]
    CommitTimeout {
        tx_id: TransactionId,
        timeout: Duration,
    },
    #[error("Transaction {tx_id} was ordered but failed validation ({code:?})")]
    CommitInvalid {
        tx_id: TransactionId,
        code: Option<String>,
    },
    #[error("Commit event source closed before an event for {tx_id} arrived")]
    EventSourceClosed { tx_id: TransactionId },
    #[error("Configuration fault: {0}")]
    ConfigurationFault(String),
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Failed to encode with bincode")]
    Encoding(#[from] bincode::Error),
    #[error("Failed to parse configuration")]
    Config(#[from] toml::de::Error),
}

impl Error {
    /// Only a commit timeout leaves the ledger state unknown; resubmitting a
    /// fresh proposal is a reasonable reaction to it. Every other kind is
    /// deterministic for the same inputs.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::CommitTimeout { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
