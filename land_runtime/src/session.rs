//! Seams to the wallet and the ledger transport.
//!
//! Signing and submission live outside this workspace; the grid only needs
//! to know who is acting and where to hand a multicall.

use std::hash::{BuildHasher, Hash, Hasher};
use std::sync::Mutex;

use ahash::RandomState;
use land_schema::Felt;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::calls::LandCall;

pub trait SigningSession {
    /// Account that signs and pays for submitted calls.
    fn address(&self) -> Felt;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaticSession(pub Felt);

impl SigningSession for StaticSession {
    fn address(&self) -> Felt {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionHandle {
    pub hash: String,
    pub sender: Felt,
    pub call_count: usize,
}

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("refusing to submit an empty multicall")]
    EmptyMulticall,
    #[error("transport rejected the multicall: {0}")]
    Rejected(String),
}

pub trait TransactionSubmitter {
    fn submit(
        &self,
        session: &dyn SigningSession,
        calls: &[LandCall],
    ) -> Result<TransactionHandle, SubmitError>;
}

/// Records multicalls instead of sending them. The returned hash is stable
/// for identical sender, nonce and calls.
#[derive(Debug, Default)]
pub struct DryRunSubmitter {
    submitted: Mutex<Vec<(Felt, Vec<LandCall>)>>,
}

impl DryRunSubmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn submitted(&self) -> Vec<(Felt, Vec<LandCall>)> {
        self.submitted
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

fn multicall_hash(sender: Felt, nonce: usize, calls: &[LandCall]) -> String {
    let mut hasher = RandomState::with_seeds(0, 0, 0, 0).build_hasher();
    sender.hash(&mut hasher);
    nonce.hash(&mut hasher);
    for call in calls {
        call.target.hash(&mut hasher);
        call.entrypoint.hash(&mut hasher);
        call.calldata.hash(&mut hasher);
    }
    format!("{:#018x}", hasher.finish())
}

impl TransactionSubmitter for DryRunSubmitter {
    fn submit(
        &self,
        session: &dyn SigningSession,
        calls: &[LandCall],
    ) -> Result<TransactionHandle, SubmitError> {
        if calls.is_empty() {
            return Err(SubmitError::EmptyMulticall);
        }
        let sender = session.address();
        let mut submitted = self
            .submitted
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let hash = multicall_hash(sender, submitted.len(), calls);
        for call in calls {
            debug!(
                target: "ponziland::calls",
                entrypoint = %call.entrypoint,
                calldata = call.calldata.len(),
                "dry_run.call"
            );
        }
        info!(
            target: "ponziland::calls",
            sender = %sender,
            calls = calls.len(),
            hash = %hash,
            "dry_run.submitted"
        );
        submitted.push((sender, calls.to_vec()));
        Ok(TransactionHandle {
            hash,
            sender,
            call_count: calls.len(),
        })
    }
}
