use std::sync::Arc;

use futures::future::join_all;
use log::{debug, info};

use crate::consistency::{verify_consistency, ConsistencySet};
use crate::network::{Peer, TransactionSubmission};
use crate::{Error, Identity, Proposal, ProposalResponse, Result, TransactionId};

/// Endorsements that passed classification and the consistency check, ready
/// to be handed to the ordering service.
///
/// Move-only: submitting consumes them, so the same proposal can not be sent
/// to the orderer twice.
///
/// ```compile_fail
/// fn duplicate<T: Clone>(t: &T) -> T {
///     t.clone()
/// }
///
/// fn resubmit(endorsements: &chaincode_tx::Endorsements) -> chaincode_tx::Endorsements {
///     duplicate(endorsements)
/// }
/// ```
#[derive(Debug, PartialEq, Eq)]
pub struct Endorsements {
    tx_id: TransactionId,
    consistent: ConsistencySet,
}

impl Endorsements {
    pub fn tx_id(&self) -> TransactionId {
        self.tx_id
    }

    pub fn responses(&self) -> &[ProposalResponse] {
        &self.consistent.responses
    }

    pub fn into_submission(self) -> TransactionSubmission {
        TransactionSubmission {
            tx_id: self.tx_id,
            endorsements: self.consistent.responses,
        }
    }
}

/// Splits responses into (successful, failed), keeping the given order.
pub fn classify(
    responses: impl IntoIterator<Item = ProposalResponse>,
) -> (Vec<ProposalResponse>, Vec<ProposalResponse>) {
    responses.into_iter().partition(ProposalResponse::is_success)
}

/// Fails with the first rejection (in peer order) if any peer did not
/// endorse, otherwise checks the successful responses for consistency.
pub fn evaluate(tx_id: TransactionId, responses: Vec<ProposalResponse>) -> Result<Endorsements> {
    let total = responses.len();
    let (successful, failed) = classify(responses);
    info!(
        "[PROPOSE-{:?}] received {total} proposal responses, successful: {}, failed: {}",
        tx_id,
        successful.len(),
        failed.len()
    );

    if let Some(first) = failed.first() {
        return Err(Error::ProposalRejected {
            message: first.rejection_message(),
        });
    }

    let consistent = verify_consistency(successful)?;
    Ok(Endorsements { tx_id, consistent })
}

/// Sends `proposal` to every peer concurrently, joins on all of them and
/// evaluates the responses. Nothing is retried.
pub async fn propose(
    proposal: &Proposal,
    peers: &[Arc<dyn Peer>],
    identity: &Identity,
) -> Result<Endorsements> {
    if peers.is_empty() {
        return Err(Error::ConfigurationFault(format!(
            "no peers to send {:?} to",
            proposal
        )));
    }

    debug!("[PROPOSE-{:?}] sending to {} peers", proposal.tx_id, peers.len());
    let calls = peers
        .iter()
        .map(|peer| endorse(peer.as_ref(), proposal, identity));
    let responses = join_all(calls).await;

    evaluate(proposal.tx_id, responses)
}

async fn endorse(peer: &dyn Peer, proposal: &Proposal, identity: &Identity) -> ProposalResponse {
    let peer_id = peer.id();
    let resp = match peer.process_proposal(proposal, identity).await {
        Ok(resp) if resp.tx_id != proposal.tx_id => ProposalResponse::failure(
            peer_id.clone(),
            proposal.tx_id,
            format!("peer {peer_id} answered for transaction {:?}", resp.tx_id),
        ),
        Ok(resp) => resp,
        Err(err) => ProposalResponse::failure(peer_id.clone(), proposal.tx_id, err.to_string()),
    };
    debug!("[PROPOSE-{:?}] {peer_id} -> {:?}", proposal.tx_id, resp);
    resp
}
