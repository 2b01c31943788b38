use std::borrow::Borrow;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{Error, Hash32, ProposalResponse, Result};

/// Responses that agree byte-for-byte on their payload hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsistencySet {
    pub payload_hash: Hash32,
    /// Members in the order they were given.
    pub responses: Vec<ProposalResponse>,
}

impl ConsistencySet {
    pub fn len(&self) -> usize {
        self.responses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.responses.is_empty()
    }
}

/// Partitions `responses` by payload hash. Every response lands in exactly
/// one set; sets are ordered by hash so the partition of a given collection
/// is always the same.
pub fn consistency_sets<R: Borrow<ProposalResponse>>(
    responses: impl IntoIterator<Item = R>,
) -> Vec<ConsistencySet> {
    let mut by_hash: BTreeMap<Hash32, Vec<ProposalResponse>> = Default::default();

    for resp in responses.into_iter() {
        let resp = resp.borrow();
        by_hash
            .entry(resp.payload_hash)
            .or_default()
            .push(resp.clone());
    }

    by_hash
        .into_iter()
        .map(|(payload_hash, responses)| ConsistencySet {
            payload_hash,
            responses,
        })
        .collect()
}

/// Accepts the batch only if it forms a single consistency set.
pub fn verify_consistency<R: Borrow<ProposalResponse>>(
    responses: impl IntoIterator<Item = R>,
) -> Result<ConsistencySet> {
    let mut sets = consistency_sets(responses);
    match sets.len() {
        0 => Err(Error::ConfigurationFault("no proposal responses to verify".into())),
        1 => Ok(sets.remove(0)),
        n => Err(Error::EndorsementMismatch { sets: n }),
    }
}
