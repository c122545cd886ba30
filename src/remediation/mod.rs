//! Remediation boundary
//!
//! The simulation only knows that eliminating a hostile or third party asks an
//! external service to quarantine or block the identity behind it, and that a
//! completed quest asks it to protect a resource. Both calls are asynchronous;
//! the game never waits on them and never rolls back an in-game elimination
//! because one failed.

pub mod client;
pub mod dispatcher;
pub mod display;

use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

pub use client::SimulatedClient;
pub use dispatcher::{RemediationDispatcher, RemediationOutcome};
pub use display::{DisplayLayer, RecordingDisplay, TracingDisplay};

/// Which external action an elimination maps to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RemediationKind {
    /// Quarantine the identity
    Hostile,
    /// Block the external access grant
    ThirdParty,
}

/// Acknowledgement returned by the remediation service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
    pub reference: String,
}

/// Remediation call failures. Always recoverable from the game's point of view.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemediationError {
    #[error("remediation request timed out")]
    Timeout,
    #[error("remediation service rejected credentials")]
    Unauthorized,
    #[error("remediation rejected for {target}: {reason}")]
    Rejected { target: String, reason: String },
    #[error("remediation service unavailable")]
    Unavailable,
}

/// A single outbound call, kept alongside its result for reporting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RemediationRequest {
    Eliminate {
        kind: RemediationKind,
        target_id: String,
        scope: String,
    },
    Protect {
        resource_id: String,
    },
}

impl RemediationRequest {
    /// Identifier the request acts on
    pub fn target(&self) -> &str {
        match self {
            RemediationRequest::Eliminate { target_id, .. } => target_id,
            RemediationRequest::Protect { resource_id } => resource_id,
        }
    }
}

pub type RemediationFuture = Pin<Box<dyn Future<Output = Result<Ack, RemediationError>> + Send>>;

/// External security service. Retries and rate limiting are the
/// implementor's business; each method is called at most once per event.
pub trait RemediationClient: Send + Sync {
    fn request_elimination(&self, kind: RemediationKind, target_id: &str, scope: &str) -> RemediationFuture;

    fn request_protect(&self, resource_id: &str) -> RemediationFuture;
}
