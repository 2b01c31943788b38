use core::fmt::{self, Debug};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{Error, Hash32, Identity, Result};

/// Transient entries attached to every instantiate proposal so the peers can
/// tell which client issued it.
pub const INSTANTIATE_TRANSIENT: [(&str, &[u8]); 2] = [
    ("HyperLedgerFabric", b"InstantiateProposalRequest:JavaSDK"),
    ("method", b"InstantiateProposalRequest"),
];

const NONCE_SIZE: usize = 24;

/// Identity of a proposal, shared by its responses and its commit event.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TransactionId(Hash32);

impl From<Hash32> for TransactionId {
    fn from(hash: Hash32) -> Self {
        Self(hash)
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl Debug for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tx{:?}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum OperationKind {
    Install,
    Instantiate,
    Invoke,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ChaincodeId {
    pub name: String,
    pub version: String,
    pub path: Option<String>,
}

impl ChaincodeId {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            path: None,
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(Error::ConfigurationFault("chaincode name is empty".into()));
        }
        if self.version.is_empty() {
            return Err(Error::ConfigurationFault(format!(
                "chaincode `{}` has no version",
                self.name
            )));
        }
        Ok(())
    }
}

/// Endorsement policy in the serialized form the network layer understands.
/// The coordinator only checks that one is present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndorsementPolicy(Vec<u8>);

impl EndorsementPolicy {
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Result<Self> {
        let bytes = bytes.into();
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Err(Error::ConfigurationFault("endorsement policy is empty".into()));
        }
        Ok(Self(bytes))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| {
            Error::ConfigurationFault(format!(
                "can not read endorsement policy {}: {e}",
                path.display()
            ))
        })?;
        Self::from_bytes(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// A chaincode operation request. Built once per call and never mutated.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    pub tx_id: TransactionId,
    pub kind: OperationKind,
    pub chaincode_id: ChaincodeId,
    pub function: String,
    pub args: Vec<Vec<u8>>,
    pub transient: BTreeMap<String, Vec<u8>>,
    pub endorsement_policy: Option<EndorsementPolicy>,
    pub chaincode_source: Option<Vec<u8>>,
    pub wait_time: Duration,
}

impl Debug for Proposal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?}[{}:{}]{}({} args)@{:?}",
            self.kind,
            self.chaincode_id.name,
            self.chaincode_id.version,
            self.function,
            self.args.len(),
            self.tx_id
        )
    }
}

impl Proposal {
    pub fn install(chaincode_id: ChaincodeId, source: Vec<u8>) -> ProposalBuilder {
        let mut builder = ProposalBuilder::new(OperationKind::Install, chaincode_id);
        builder.chaincode_source = Some(source);
        builder
    }

    pub fn instantiate(
        chaincode_id: ChaincodeId,
        function: impl Into<String>,
        args: impl IntoIterator<Item = impl Into<Vec<u8>>>,
        policy: EndorsementPolicy,
    ) -> ProposalBuilder {
        let mut builder = ProposalBuilder::new(OperationKind::Instantiate, chaincode_id)
            .function(function)
            .args(args);
        builder.endorsement_policy = Some(policy);
        for (key, value) in INSTANTIATE_TRANSIENT {
            builder = builder.transient(key, value.to_vec());
        }
        builder
    }

    pub fn invoke(
        chaincode_id: ChaincodeId,
        function: impl Into<String>,
        args: impl IntoIterator<Item = impl Into<Vec<u8>>>,
    ) -> ProposalBuilder {
        ProposalBuilder::new(OperationKind::Invoke, chaincode_id)
            .function(function)
            .args(args)
    }
}

#[derive(Debug, Clone)]
pub struct ProposalBuilder {
    kind: OperationKind,
    chaincode_id: ChaincodeId,
    function: String,
    args: Vec<Vec<u8>>,
    transient: BTreeMap<String, Vec<u8>>,
    endorsement_policy: Option<EndorsementPolicy>,
    chaincode_source: Option<Vec<u8>>,
    wait_time: Duration,
}

impl ProposalBuilder {
    fn new(kind: OperationKind, chaincode_id: ChaincodeId) -> Self {
        Self {
            kind,
            chaincode_id,
            function: String::new(),
            args: Vec::new(),
            transient: Default::default(),
            endorsement_policy: None,
            chaincode_source: None,
            wait_time: crate::config::DEFAULT_PROPOSAL_WAIT_TIME,
        }
    }

    pub fn function(mut self, function: impl Into<String>) -> Self {
        self.function = function.into();
        self
    }

    pub fn args(mut self, args: impl IntoIterator<Item = impl Into<Vec<u8>>>) -> Self {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn transient(mut self, key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        self.transient.insert(key.into(), value.into());
        self
    }

    pub fn wait_time(mut self, wait_time: Duration) -> Self {
        self.wait_time = wait_time;
        self
    }

    /// Validates the request and derives its transaction id from a fresh
    /// nonce and the creator's serialized identity.
    pub fn build(self, creator: &Identity) -> Result<Proposal> {
        self.chaincode_id.validate()?;
        match self.kind {
            OperationKind::Install if self.chaincode_source.is_none() => {
                return Err(Error::ConfigurationFault(format!(
                    "install of `{}` has no chaincode source",
                    self.chaincode_id.name
                )));
            }
            OperationKind::Instantiate if self.endorsement_policy.is_none() => {
                return Err(Error::ConfigurationFault(format!(
                    "instantiate of `{}` has no endorsement policy",
                    self.chaincode_id.name
                )));
            }
            OperationKind::Invoke if self.function.is_empty() => {
                return Err(Error::ConfigurationFault(format!(
                    "invoke of `{}` has no function name",
                    self.chaincode_id.name
                )));
            }
            _ => (),
        }

        let nonce: [u8; NONCE_SIZE] = rand::thread_rng().gen();
        let creator = creator.creator_bytes()?;
        let tx_id = TransactionId(Hash32::calculate_all([&nonce[..], &creator[..]]));

        Ok(Proposal {
            tx_id,
            kind: self.kind,
            chaincode_id: self.chaincode_id,
            function: self.function,
            args: self.args,
            transient: self.transient,
            endorsement_policy: self.endorsement_policy,
            chaincode_source: self.chaincode_source,
            wait_time: self.wait_time,
        })
    }
}
