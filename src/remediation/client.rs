//! In-process remediation client
//!
//! Stands in for the real security API in the demo binary and in tests:
//! records every request, resolves after a fixed latency, and fails any
//! target listed in `failing`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use hashbrown::HashSet;
use parking_lot::Mutex;

use super::{Ack, RemediationClient, RemediationError, RemediationFuture, RemediationKind, RemediationRequest};

pub struct SimulatedClient {
    latency: Duration,
    failing: Mutex<HashSet<String>>,
    requests: Arc<Mutex<Vec<RemediationRequest>>>,
    next_reference: Arc<AtomicU64>,
}

impl SimulatedClient {
    pub fn new(latency: Duration) -> Self {
        Self {
            latency,
            failing: Mutex::new(HashSet::new()),
            requests: Arc::new(Mutex::new(Vec::new())),
            next_reference: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Make every future request against `target` fail with `Rejected`
    pub fn fail_target(&self, target: impl Into<String>) {
        self.failing.lock().insert(target.into());
    }

    /// Requests received so far, in call order
    pub fn requests(&self) -> Vec<RemediationRequest> {
        self.requests.lock().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    fn submit(&self, request: RemediationRequest) -> RemediationFuture {
        let target = request.target().to_string();
        let fails = self.failing.lock().contains(&target);
        self.requests.lock().push(request);

        let latency = self.latency;
        let reference = self.next_reference.fetch_add(1, Ordering::Relaxed);

        Box::pin(async move {
            if !latency.is_zero() {
                tokio::time::sleep(latency).await;
            }
            if fails {
                Err(RemediationError::Rejected {
                    target,
                    reason: "simulated failure".to_string(),
                })
            } else {
                Ok(Ack {
                    reference: format!("sim-{reference}"),
                })
            }
        })
    }
}

impl Default for SimulatedClient {
    fn default() -> Self {
        Self::new(Duration::ZERO)
    }
}

impl RemediationClient for SimulatedClient {
    fn request_elimination(&self, kind: RemediationKind, target_id: &str, scope: &str) -> RemediationFuture {
        tracing::debug!("Simulated {:?} remediation for {} in {}", kind, target_id, scope);
        self.submit(RemediationRequest::Eliminate {
            kind,
            target_id: target_id.to_string(),
            scope: scope.to_string(),
        })
    }

    fn request_protect(&self, resource_id: &str) -> RemediationFuture {
        tracing::debug!("Simulated protect for {}", resource_id);
        self.submit(RemediationRequest::Protect {
            resource_id: resource_id.to_string(),
        })
    }
}
