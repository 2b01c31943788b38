use std::sync::Arc;

use log::{info, warn};

use crate::commit::CommitWaiter;
use crate::coordinator::{self, Endorsements};
use crate::network::{ChaincodePackageStore, NetworkProvider};
use crate::{
    ChaincodeId, CommitEvent, Config, EndorsementPolicy, Error, Identity, OperationKind, Proposal,
    ProposalBuilder, Result, TransactionId,
};

// State transition
//
// +-------+     +----------+     +-----------+     +-----------+
// | Built | --> | Proposed | --> | Submitted | --> | Committed |
// +-------+     +----------+     +-----------+     +-----------+
//                 |     \               \
//                 v      v               v
//            Rejected  ConsistencyFault  TimedOut
//
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OperationState {
    Built,
    Proposed,
    Rejected,
    ConsistencyFault,
    Submitted,
    Committed,
    TimedOut,
}

impl OperationState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Rejected | Self::ConsistencyFault | Self::Committed | Self::TimedOut
        )
    }

    pub fn can_advance_to(self, next: Self) -> bool {
        use OperationState::*;
        matches!(
            (self, next),
            (Built, Proposed)
                | (Proposed, Rejected)
                | (Proposed, ConsistencyFault)
                | (Proposed, Submitted)
                | (Submitted, Committed)
                | (Submitted, TimedOut)
        )
    }

    /// The terminal state an operation in `self` ends in when it fails with `err`.
    fn on_error(self, err: &Error) -> Self {
        match (self, err) {
            (Self::Proposed, Error::EndorsementMismatch { .. }) => Self::ConsistencyFault,
            (Self::Proposed, _) => Self::Rejected,
            (Self::Submitted, _) => Self::TimedOut,
            (state, _) => state,
        }
    }
}

struct Operation {
    kind: OperationKind,
    tx_id: TransactionId,
    state: OperationState,
}

impl Operation {
    fn new(proposal: &Proposal) -> Self {
        info!(
            "[LIFECYCLE] {:?} {:?} built: {:?}",
            proposal.kind, proposal.tx_id, proposal
        );
        Self {
            kind: proposal.kind,
            tx_id: proposal.tx_id,
            state: OperationState::Built,
        }
    }

    fn advance(&mut self, next: OperationState) {
        debug_assert!(
            self.state.can_advance_to(next),
            "illegal transition {:?} -> {:?}",
            self.state,
            next
        );
        info!(
            "[LIFECYCLE] {:?} {:?} {:?} -> {:?}",
            self.kind, self.tx_id, self.state, next
        );
        self.state = next;
    }

    fn fail<T>(&mut self, err: Error) -> Result<T> {
        let next = self.state.on_error(&err);
        if next != self.state {
            self.advance(next);
        }
        Err(err)
    }
}

/// Drives install, instantiate and invoke through propose, verify and commit.
pub struct Lifecycle {
    network: Arc<dyn NetworkProvider>,
    config: Config,
}

impl Lifecycle {
    pub fn new(network: Arc<dyn NetworkProvider>, config: Config) -> Self {
        Self { network, config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Installs the chaincode on every peer of the channel. Propose only:
    /// nothing goes to the ordering service.
    pub async fn try_install(
        &self,
        chaincode_id: ChaincodeId,
        store: &dyn ChaincodePackageStore,
    ) -> Result<Endorsements> {
        let source = store.source(&chaincode_id).await?;
        let (proposal, identity, mut op) = self.build(Proposal::install(chaincode_id, source))?;
        let res = self.propose(&proposal, &identity, &mut op).await;
        match res {
            Ok(endorsements) => {
                info!(
                    "[LIFECYCLE] installed {}:{} on {} peers",
                    proposal.chaincode_id.name,
                    proposal.chaincode_id.version,
                    endorsements.responses().len()
                );
                Ok(endorsements)
            }
            Err(err) => op.fail(err),
        }
    }

    pub async fn try_instantiate(
        &self,
        chaincode_id: ChaincodeId,
        function: &str,
        args: &[&str],
        policy: EndorsementPolicy,
    ) -> Result<CommitEvent> {
        let builder = Proposal::instantiate(chaincode_id, function, args.iter().copied(), policy);
        self.propose_and_commit(builder).await
    }

    pub async fn try_invoke(
        &self,
        chaincode_id: ChaincodeId,
        function: &str,
        args: &[&str],
    ) -> Result<CommitEvent> {
        let builder = Proposal::invoke(chaincode_id, function, args.iter().copied());
        self.propose_and_commit(builder).await
    }

    /// True iff every peer installed the chaincode.
    pub async fn install(
        &self,
        chaincode_id: ChaincodeId,
        store: &dyn ChaincodePackageStore,
    ) -> bool {
        collapse("install", self.try_install(chaincode_id, store).await).is_some()
    }

    /// True iff the instantiate transaction committed and is valid.
    pub async fn instantiate(
        &self,
        chaincode_id: ChaincodeId,
        function: &str,
        args: &[&str],
        policy: EndorsementPolicy,
    ) -> bool {
        let res = self.try_instantiate(chaincode_id, function, args, policy).await;
        collapse_event("instantiate", res)
    }

    /// True iff the invoke transaction committed and is valid.
    pub async fn invoke(&self, chaincode_id: ChaincodeId, function: &str, args: &[&str]) -> bool {
        let res = self.try_invoke(chaincode_id, function, args).await;
        collapse_event("invoke", res)
    }

    /// Builds the proposal under the current identity. The same identity is
    /// used for the rest of the operation, even if the provider swaps it.
    fn build(&self, builder: ProposalBuilder) -> Result<(Proposal, Arc<Identity>, Operation)> {
        let identity = self.network.current_identity();
        let proposal = builder
            .wait_time(self.config.proposal_wait_time)
            .build(&identity)?;
        let op = Operation::new(&proposal);
        Ok((proposal, identity, op))
    }

    async fn propose(
        &self,
        proposal: &Proposal,
        identity: &Identity,
        op: &mut Operation,
    ) -> Result<Endorsements> {
        let peers = self.network.resolve_peers(&self.config.channel)?;
        op.advance(OperationState::Proposed);
        coordinator::propose(proposal, &peers, identity).await
    }

    async fn propose_and_commit(&self, builder: ProposalBuilder) -> Result<CommitEvent> {
        let (proposal, identity, mut op) = self.build(builder)?;

        // resolve everything up front so a bad channel never reaches the peers
        let orderer = self.network.resolve_orderer(&self.config.channel)?;
        let events = self.network.commit_events(&self.config.channel)?;

        let res = self.propose(&proposal, &identity, &mut op).await;
        let endorsements = match res {
            Ok(endorsements) => endorsements,
            Err(err) => return op.fail(err),
        };

        op.advance(OperationState::Submitted);
        let waiter = CommitWaiter::new(orderer, events);
        let res = waiter
            .submit_and_wait(endorsements, &identity, self.config.commit_timeout)
            .await;
        match res {
            Ok(event) => {
                op.advance(OperationState::Committed);
                Ok(event)
            }
            Err(err) => op.fail(err),
        }
    }
}

fn collapse<T>(operation: &str, res: Result<T>) -> Option<T> {
    match res {
        Ok(v) => Some(v),
        Err(err) => {
            warn!("[LIFECYCLE] {operation} failed: {err}");
            None
        }
    }
}

fn collapse_event(operation: &str, res: Result<CommitEvent>) -> bool {
    match collapse(operation, res.and_then(CommitEvent::ensure_valid)) {
        Some(event) => event.is_valid,
        None => false,
    }
}
