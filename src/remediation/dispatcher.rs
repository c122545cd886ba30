//! Fire-and-forget dispatch of remediation calls
//!
//! Requests are spawned onto a tokio runtime; their results come back through
//! a crossbeam queue that the game loop drains at the start of an unpaused
//! tick. Nothing here blocks the caller.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crossbeam_channel::{unbounded, Receiver, Sender};
use tokio::runtime::Handle;

use super::{Ack, RemediationClient, RemediationError, RemediationKind, RemediationRequest};

/// Result of one dispatched request
#[derive(Debug, Clone, PartialEq)]
pub struct RemediationOutcome {
    pub request: RemediationRequest,
    pub result: Result<Ack, RemediationError>,
}

pub struct RemediationDispatcher {
    client: Arc<dyn RemediationClient>,
    runtime: Handle,
    outcome_tx: Sender<RemediationOutcome>,
    outcome_rx: Receiver<RemediationOutcome>,
    in_flight: Arc<AtomicUsize>,
    dispatched: u64,
}

impl RemediationDispatcher {
    pub fn new(client: Arc<dyn RemediationClient>, runtime: Handle) -> Self {
        let (outcome_tx, outcome_rx) = unbounded();
        Self {
            client,
            runtime,
            outcome_tx,
            outcome_rx,
            in_flight: Arc::new(AtomicUsize::new(0)),
            dispatched: 0,
        }
    }

    /// Spawn the call for `request` and return immediately
    pub fn dispatch(&mut self, request: RemediationRequest) {
        let future = match &request {
            RemediationRequest::Eliminate { kind, target_id, scope } => {
                self.client.request_elimination(*kind, target_id, scope)
            }
            RemediationRequest::Protect { resource_id } => self.client.request_protect(resource_id),
        };

        self.dispatched += 1;
        self.in_flight.fetch_add(1, Ordering::AcqRel);

        let tx = self.outcome_tx.clone();
        let in_flight = Arc::clone(&self.in_flight);
        self.runtime.spawn(async move {
            let result = future.await;
            // Receiver only disappears with the dispatcher itself
            let _ = tx.send(RemediationOutcome { request, result });
            in_flight.fetch_sub(1, Ordering::AcqRel);
        });
    }

    pub fn eliminate(&mut self, kind: RemediationKind, target_id: &str, scope: &str) {
        self.dispatch(RemediationRequest::Eliminate {
            kind,
            target_id: target_id.to_string(),
            scope: scope.to_string(),
        });
    }

    pub fn protect(&mut self, resource_id: &str) {
        self.dispatch(RemediationRequest::Protect {
            resource_id: resource_id.to_string(),
        });
    }

    /// Take every outcome that has arrived so far
    pub fn drain_outcomes(&self) -> Vec<RemediationOutcome> {
        self.outcome_rx.try_iter().collect()
    }

    /// Outcomes waiting to be drained
    pub fn pending_outcomes(&self) -> usize {
        self.outcome_rx.len()
    }

    /// Requests spawned but not yet resolved
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Total requests dispatched over the dispatcher's lifetime
    pub fn dispatched(&self) -> u64 {
        self.dispatched
    }
}
