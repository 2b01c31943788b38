use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use crate::{
    ChaincodeId, CommitEvent, Error, Identity, PeerId, Proposal, ProposalResponse, Result,
    TransactionId,
};

/// An endorsing peer. Transport bounds (including `Proposal::wait_time`) are
/// enforced by the implementation, not by the coordinator.
#[async_trait]
pub trait Peer: Send + Sync {
    fn id(&self) -> PeerId;

    async fn process_proposal(
        &self,
        proposal: &Proposal,
        identity: &Identity,
    ) -> Result<ProposalResponse>;
}

/// The endorsed responses handed to the ordering service for one proposal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionSubmission {
    pub tx_id: TransactionId,
    pub endorsements: Vec<ProposalResponse>,
}

#[async_trait]
pub trait Orderer: Send + Sync {
    async fn broadcast(
        &self,
        submission: &TransactionSubmission,
        identity: &Identity,
    ) -> Result<()>;
}

/// Source of commit notifications. At most one event is delivered per
/// registration; dropping the sender without sending means the source went
/// away.
pub trait CommitEventSource: Send + Sync {
    fn register(&self, tx_id: TransactionId) -> oneshot::Receiver<CommitEvent>;
}

/// Resolves the collaborators of a channel. Topology loading lives behind
/// this trait.
pub trait NetworkProvider: Send + Sync {
    fn resolve_peers(&self, channel: &str) -> Result<Vec<Arc<dyn Peer>>>;
    fn resolve_orderer(&self, channel: &str) -> Result<Arc<dyn Orderer>>;
    fn commit_events(&self, channel: &str) -> Result<Arc<dyn CommitEventSource>>;
    fn current_identity(&self) -> Arc<Identity>;
}

/// Supplies chaincode source for install proposals.
#[async_trait]
pub trait ChaincodePackageStore: Send + Sync {
    async fn source(&self, chaincode_id: &ChaincodeId) -> Result<Vec<u8>>;
}

#[derive(Clone)]
struct ChannelEntry {
    peers: Vec<Arc<dyn Peer>>,
    orderer: Arc<dyn Orderer>,
    events: Arc<dyn CommitEventSource>,
}

/// An explicitly assembled, caller-owned `NetworkProvider`.
#[derive(Clone)]
pub struct StaticNetwork {
    identity: Arc<Identity>,
    channels: BTreeMap<String, ChannelEntry>,
}

impl StaticNetwork {
    pub fn new(identity: Identity) -> Self {
        Self {
            identity: Arc::new(identity),
            channels: Default::default(),
        }
    }

    pub fn with_channel(
        mut self,
        name: impl Into<String>,
        peers: Vec<Arc<dyn Peer>>,
        orderer: Arc<dyn Orderer>,
        events: Arc<dyn CommitEventSource>,
    ) -> Self {
        self.channels.insert(
            name.into(),
            ChannelEntry {
                peers,
                orderer,
                events,
            },
        );
        self
    }

    /// Returns a copy that signs as `identity`; in-flight operations on the
    /// original keep the identity they started with.
    pub fn with_identity(&self, identity: Identity) -> Self {
        Self {
            identity: Arc::new(identity),
            channels: self.channels.clone(),
        }
    }

    fn channel(&self, channel: &str) -> Result<&ChannelEntry> {
        self.channels
            .get(channel)
            .ok_or_else(|| Error::ConfigurationFault(format!("Channel {channel} is not defined")))
    }
}

impl NetworkProvider for StaticNetwork {
    fn resolve_peers(&self, channel: &str) -> Result<Vec<Arc<dyn Peer>>> {
        Ok(self.channel(channel)?.peers.clone())
    }

    fn resolve_orderer(&self, channel: &str) -> Result<Arc<dyn Orderer>> {
        Ok(self.channel(channel)?.orderer.clone())
    }

    fn commit_events(&self, channel: &str) -> Result<Arc<dyn CommitEventSource>> {
        Ok(self.channel(channel)?.events.clone())
    }

    fn current_identity(&self) -> Arc<Identity> {
        self.identity.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CommitEventHub;

    struct NullOrderer;

    #[async_trait]
    impl Orderer for NullOrderer {
        async fn broadcast(&self, _: &TransactionSubmission, _: &Identity) -> Result<()> {
            Ok(())
        }
    }

    fn network() -> StaticNetwork {
        StaticNetwork::new(Identity::new("admin", "Org1")).with_channel(
            "mychannel",
            Vec::new(),
            Arc::new(NullOrderer),
            Arc::new(CommitEventHub::new()),
        )
    }

    #[test]
    fn test_unknown_channel_is_a_configuration_fault() {
        let net = network();
        assert!(net.resolve_peers("mychannel").is_ok());
        assert!(matches!(
            net.resolve_peers("other"),
            Err(Error::ConfigurationFault(_))
        ));
        assert!(matches!(
            net.resolve_orderer("other"),
            Err(Error::ConfigurationFault(_))
        ));
        assert!(matches!(
            net.commit_events("other"),
            Err(Error::ConfigurationFault(_))
        ));
    }

    #[test]
    fn test_swapping_identity_leaves_held_identity_alone() {
        let net = network();
        let held = net.current_identity();
        let swapped = net.with_identity(Identity::new("User1", "Org1"));

        assert_eq!(held.name, "admin");
        assert_eq!(net.current_identity().name, "admin");
        assert_eq!(swapped.current_identity().name, "User1");
        assert!(swapped.resolve_orderer("mychannel").is_ok());
    }
}
