//! Seams to the external services this client consumes.
//!
//! Two collaborators live outside the process: the certificate authority
//! and the ledger network's gateway. Both are reached through object-safe
//! async traits so the rest of the crate never touches a concrete
//! transport, and tests can stand in process-local fakes.

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

use convene_core::identity::{EnrollmentMaterial, Identity, IdentityRole};
use convene_core::txid::TxId;

// ── Certificate authority ─────────────────────────────────────────────────────

/// Request to create a new enrollable identity at the CA.
#[derive(Debug, Clone)]
pub struct RegistrationRequest {
    pub label: String,
    pub affiliation: String,
    pub role: IdentityRole,
    /// Secret the caller would like the CA to assign. The CA's returned
    /// secret is authoritative either way.
    pub secret_hint: Option<String>,
}

#[derive(Debug, Error)]
pub enum CaApiError {
    /// Transport-level failure — the CA never answered. Retry-safe.
    #[error("certificate authority unreachable: {0}")]
    Unreachable(String),
    /// The CA answered and rejected the enrollment secret. Not retry-safe.
    #[error("certificate authority rejected the credentials: {0}")]
    AuthenticationFailed(String),
    /// The CA answered and refused the registration (e.g. the label is
    /// already registered there). Not retry-safe.
    #[error("certificate authority denied the registration: {0}")]
    Denied(String),
}

/// Port: enrollment and registration against an external CA service.
#[async_trait]
pub trait CertificateAuthorityApi: Send + Sync {
    /// Exchange an enrollment secret for a signed certificate + key pair.
    async fn enroll(&self, label: &str, secret: &str) -> Result<EnrollmentMaterial, CaApiError>;

    /// Create a new enrollable identity using the registrar's authority.
    /// Returns the one-time enrollment secret assigned by the CA.
    async fn register(
        &self,
        registrar: &Identity,
        request: &RegistrationRequest,
    ) -> Result<String, CaApiError>;
}

// ── Ledger gateway ────────────────────────────────────────────────────────────

/// A peer or orderer address on the network.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Options for opening a gateway session.
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    /// Resolve channel peers/orderers through the discovery service.
    pub discovery: bool,
    /// Rewrite discovered endpoints to localhost (local test networks).
    pub as_localhost: bool,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            discovery: true,
            as_localhost: true,
        }
    }
}

/// Peer/orderer endpoint sets resolved by the discovery service.
#[derive(Debug, Clone, Default)]
pub struct Discovery {
    pub peers: Vec<Endpoint>,
    pub orderers: Vec<Endpoint>,
}

/// A fully addressed proposal: the call coordinates plus its tx id.
#[derive(Debug, Clone)]
pub struct Proposal {
    pub tx_id: TxId,
    pub channel: String,
    pub contract: String,
    pub operation: String,
    pub args: Vec<String>,
}

/// One endorsing peer's refusal, kept verbatim for diagnostics.
#[derive(Debug, Clone)]
pub struct PeerRejection {
    pub peer: Endpoint,
    pub reason: String,
}

/// The outcome of sending a proposal to the endorsing peers.
#[derive(Debug, Clone)]
pub struct Endorsements {
    /// Response payload agreed by the approving peers.
    pub payload: Bytes,
    pub approvals: Vec<Endpoint>,
    pub rejections: Vec<PeerRejection>,
}

/// Acknowledgment that an endorsed proposal was sequenced and committed.
#[derive(Debug, Clone)]
pub struct CommitAck {
    pub tx_id: TxId,
    pub block_number: u64,
}

#[derive(Debug, Error)]
pub enum GatewayApiError {
    /// Transport-level failure — the network never answered.
    #[error("gateway unreachable: {0}")]
    Unreachable(String),
    /// The network answered and refused this identity. An authorization
    /// outcome, not an outage — callers must not retry it blindly.
    #[error("access denied: {0}")]
    AccessDenied(String),
    /// The contract ran and reported a logical rejection (e.g. no such
    /// record). Distinct from transport failure by construction.
    #[error("contract rejected the operation: {0}")]
    ContractRejected(String),
    /// The ordering service detected a write conflict with a competing
    /// transaction.
    #[error("commit conflict: {0}")]
    Conflict(String),
}

/// Port: one open session to the ledger network.
///
/// Implementations own the underlying peer/orderer connections; `close`
/// releases them. All methods take `&self` — the session is shared.
#[async_trait]
pub trait GatewaySession: Send + Sync {
    /// Query the discovery service for this identity's channel view.
    async fn discover(&self) -> Result<Discovery, GatewayApiError>;

    async fn channel_exists(&self, channel: &str) -> Result<bool, GatewayApiError>;

    async fn contract_exists(&self, channel: &str, contract: &str)
        -> Result<bool, GatewayApiError>;

    /// Send a proposal to the endorsing peers required by the contract's
    /// endorsement policy and collect their verdicts.
    async fn endorse(&self, proposal: &Proposal) -> Result<Endorsements, GatewayApiError>;

    /// Forward an endorsed proposal to the ordering service and wait for
    /// the commit acknowledgment.
    async fn order(
        &self,
        proposal: &Proposal,
        endorsements: &Endorsements,
    ) -> Result<CommitAck, GatewayApiError>;

    /// Run a read-only query against a single peer.
    async fn evaluate(&self, proposal: &Proposal) -> Result<Bytes, GatewayApiError>;

    /// Release all peer/orderer connections.
    async fn close(&self);
}

/// Port: the network entry point that mints sessions.
#[async_trait]
pub trait LedgerGateway: Send + Sync {
    async fn connect(
        &self,
        identity: &Identity,
        options: &ConnectOptions,
    ) -> Result<Box<dyn GatewaySession>, GatewayApiError>;
}
