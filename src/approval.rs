//! Approval collaborator contract.

use async_trait::async_trait;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Approve,
    Reject(String),
}

/// A snapshot of a synchronous sign request awaiting approval.
#[derive(Debug, Clone)]
pub struct SigningRequest {
    pub id: u64,
    pub schema: crate::constants::Schema,
    pub curve: crate::constants::Curve,
    pub path: crate::types::DerivationPath,
    pub data: Vec<u8>,
}

#[async_trait]
pub trait ApprovalSink: Send + Sync {
    async fn on_request(&self, request: SigningRequest) -> Decision;
}

/// Always-approve sink, used when `auto_approve = true` bypasses this trait
/// entirely at the device level; kept for collaborators that want an
/// explicit no-op implementation instead.
pub struct AutoApprove;

#[async_trait]
impl ApprovalSink for AutoApprove {
    async fn on_request(&self, _request: SigningRequest) -> Decision {
        Decision::Approve
    }
}
