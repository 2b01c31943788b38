use core::fmt::{self, Debug};

use serde::{Deserialize, Serialize};

use crate::{Hash32, PeerId, TransactionId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Status {
    Success,
    Failure,
}

/// A single peer's endorsement of a proposal.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProposalResponse {
    pub peer: PeerId,
    pub tx_id: TransactionId,
    pub status: Status,
    pub payload: Vec<u8>,
    pub payload_hash: Hash32,
    pub message: Option<String>,
}

impl ProposalResponse {
    pub fn success(peer: impl Into<PeerId>, tx_id: TransactionId, payload: Vec<u8>) -> Self {
        Self::new(peer, tx_id, Status::Success, payload, None)
    }

    pub fn failure(
        peer: impl Into<PeerId>,
        tx_id: TransactionId,
        message: impl Into<String>,
    ) -> Self {
        Self::new(peer, tx_id, Status::Failure, Vec::new(), Some(message.into()))
    }

    pub fn new(
        peer: impl Into<PeerId>,
        tx_id: TransactionId,
        status: Status,
        payload: Vec<u8>,
        message: Option<String>,
    ) -> Self {
        Self {
            peer: peer.into(),
            tx_id,
            status,
            payload_hash: Hash32::calculate(&payload),
            payload,
            message,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }

    /// The message a rejection should carry, falling back to a generic one
    /// when the peer did not provide any.
    pub fn rejection_message(&self) -> String {
        match &self.message {
            Some(msg) => msg.clone(),
            None => format!("peer {} returned {:?}", self.peer, self.status),
        }
    }
}

impl Debug for ProposalResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({:?})@{}", self.status, self.payload_hash, self.peer)
    }
}

/// Notification that a submitted transaction made it into a block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitEvent {
    pub tx_id: TransactionId,
    pub is_valid: bool,
    pub validation_code: Option<String>,
}

impl CommitEvent {
    pub fn valid(tx_id: TransactionId) -> Self {
        Self {
            tx_id,
            is_valid: true,
            validation_code: None,
        }
    }

    pub fn invalid(tx_id: TransactionId, code: impl Into<String>) -> Self {
        Self {
            tx_id,
            is_valid: false,
            validation_code: Some(code.into()),
        }
    }

    /// Converts a negative validation result into `Error::CommitInvalid` for
    /// callers that want to propagate it with `?`.
    pub fn ensure_valid(self) -> crate::Result<Self> {
        if self.is_valid {
            Ok(self)
        } else {
            Err(crate::Error::CommitInvalid {
                tx_id: self.tx_id,
                code: self.validation_code,
            })
        }
    }
}
