use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::{debug, info, warn};
use tokio::sync::oneshot;

use crate::coordinator::Endorsements;
use crate::network::{CommitEventSource, Orderer};
use crate::{CommitEvent, Error, Identity, Result, TransactionId};

/// Submits endorsed transactions to the ordering service and waits for their
/// commit events.
#[derive(Clone)]
pub struct CommitWaiter {
    orderer: Arc<dyn Orderer>,
    events: Arc<dyn CommitEventSource>,
}

impl CommitWaiter {
    pub fn new(orderer: Arc<dyn Orderer>, events: Arc<dyn CommitEventSource>) -> Self {
        Self { orderer, events }
    }

    /// Consumes the endorsements, so a proposal is submitted at most once.
    ///
    /// The deadline covers both the broadcast and the wait. An event with
    /// `is_valid == false` is returned as-is; only a missing event is an error.
    pub async fn submit_and_wait(
        &self,
        endorsements: Endorsements,
        identity: &Identity,
        timeout: Duration,
    ) -> Result<CommitEvent> {
        let submission = endorsements.into_submission();
        let tx_id = submission.tx_id;

        // register first so an event racing the broadcast is not lost
        let event = self.events.register(tx_id);

        info!(
            "[COMMIT-{:?}] sending transaction with {} endorsements to orderer",
            tx_id,
            submission.endorsements.len()
        );
        let submit_and_wait = async {
            self.orderer.broadcast(&submission, identity).await?;
            event.await.map_err(|_| Error::EventSourceClosed { tx_id })
        };

        match tokio::time::timeout(timeout, submit_and_wait).await {
            Ok(Ok(event)) => {
                info!("[COMMIT-{:?}] committed, valid: {}", tx_id, event.is_valid);
                Ok(event)
            }
            Ok(Err(err)) => Err(err),
            Err(_) => {
                warn!("[COMMIT-{:?}] no commit event within {:?}", tx_id, timeout);
                Err(Error::CommitTimeout { tx_id, timeout })
            }
        }
    }
}

/// In-process fan-in point for commit events: the network layer calls
/// [`CommitEventHub::notify`] for every transaction event it sees in a block.
#[derive(Debug, Default)]
pub struct CommitEventHub {
    waiters: Mutex<HashMap<TransactionId, oneshot::Sender<CommitEvent>>>,
}

impl CommitEventHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delivers `event` to its waiter. Returns false if nobody was waiting.
    pub fn notify(&self, event: CommitEvent) -> bool {
        let waiter = match self.waiters.lock() {
            Ok(mut waiters) => waiters.remove(&event.tx_id),
            Err(poisoned) => poisoned.into_inner().remove(&event.tx_id),
        };
        match waiter {
            Some(tx) => tx.send(event).is_ok(),
            None => {
                debug!("[HUB] dropping event for unknown transaction {:?}", event.tx_id);
                false
            }
        }
    }

    pub fn pending(&self) -> usize {
        match self.waiters.lock() {
            Ok(waiters) => waiters.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }
}

impl CommitEventSource for CommitEventHub {
    fn register(&self, tx_id: TransactionId) -> oneshot::Receiver<CommitEvent> {
        let (tx, rx) = oneshot::channel();
        let mut waiters = match self.waiters.lock() {
            Ok(waiters) => waiters,
            Err(poisoned) => poisoned.into_inner(),
        };
        // drop waiters whose caller gave up
        waiters.retain(|_, w| !w.is_closed());
        waiters.insert(tx_id, tx);
        rx
    }
}
