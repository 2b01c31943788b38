//! Client-side coordination of chaincode transactions.
//!
//! A transaction goes through the same steps regardless of what it does:
//! the proposal is sent to every endorsing peer at once, the responses are
//! classified and checked for agreement, the agreed endorsements are sent
//! to the ordering service, and the caller waits, bounded by a timeout, for
//! the commit event. [`Lifecycle`] sequences install, instantiate and invoke
//! on top of that.

pub mod commit;
pub mod config;
pub mod consistency;
pub mod coordinator;
pub mod error;
pub mod hash;
pub mod identity;
pub mod lifecycle;
pub mod network;
pub mod proposal;
pub mod response;

pub use crate::commit::{CommitEventHub, CommitWaiter};
pub use crate::config::Config;
pub use crate::consistency::{consistency_sets, verify_consistency, ConsistencySet};
pub use crate::coordinator::{propose, Endorsements};
pub use crate::error::{Error, Result};
pub use crate::hash::Hash32;
pub use crate::identity::{enroll_user, CertificateAuthority, Enrollment, Identity};
pub use crate::lifecycle::{Lifecycle, OperationState};
pub use crate::network::{
    ChaincodePackageStore, CommitEventSource, NetworkProvider, Orderer, Peer, StaticNetwork,
    TransactionSubmission,
};
pub use crate::proposal::{
    ChaincodeId, EndorsementPolicy, OperationKind, Proposal, ProposalBuilder, TransactionId,
};
pub use crate::response::{CommitEvent, ProposalResponse, Status};

pub type PeerId = String;
