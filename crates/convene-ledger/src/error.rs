//! The flattened error surface handed to the excluded API layer.
//!
//! Every core operation returns a structured result-or-error value;
//! mapping to a transport response happens outside this crate. `kind`
//! gives that layer a stable string per failure class so nothing is ever
//! collapsed into a generic message.

use thiserror::Error;

use convene_core::config::ConfigError;

use crate::ca::CaError;
use crate::channel::BindingError;
use crate::connector::ConnectError;
use crate::dispatch::DispatchError;
use crate::wallet::WalletError;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Wallet(#[from] WalletError),
    #[error(transparent)]
    Ca(#[from] CaError),
    #[error(transparent)]
    Connect(#[from] ConnectError),
    #[error(transparent)]
    Binding(#[from] BindingError),
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

impl ClientError {
    /// Stable machine-readable failure class.
    ///
    /// Retry guidance follows the kind: `ca-unreachable` and
    /// `gateway-transport` are retry-safe; `authentication-failure`,
    /// `registration-denied`, and `discovery-denied` are not; a
    /// `commit-timeout` is only retryable through the same request id.
    pub fn kind(&self) -> &'static str {
        match self {
            ClientError::Config(_) => "config",
            ClientError::Wallet(e) => match e {
                WalletError::DuplicateIdentity(_) => "duplicate-identity",
                WalletError::IdentityNotFound(_) => "identity-not-found",
                WalletError::Io(..) | WalletError::Corrupt(..) => "wallet-storage",
            },
            ClientError::Ca(e) => match e {
                CaError::AdminNotEnrolled(_) => "admin-not-enrolled",
                CaError::CaUnreachable(_) => "ca-unreachable",
                CaError::AuthenticationFailure { .. } => "authentication-failure",
                CaError::RegistrationDenied { .. } => "registration-denied",
                CaError::Wallet(WalletError::DuplicateIdentity(_)) => "duplicate-identity",
                CaError::Wallet(WalletError::IdentityNotFound(_)) => "identity-not-found",
                CaError::Wallet(_) => "wallet-storage",
            },
            ClientError::Connect(e) => match e {
                ConnectError::IdentityNotFound(_) => "identity-not-found",
                ConnectError::GatewayUnreachable(_) => "gateway-unreachable",
                ConnectError::DiscoveryDenied { .. } => "discovery-denied",
                ConnectError::AlreadyConnected => "already-connected",
            },
            ClientError::Binding(e) => binding_kind(e),
            ClientError::Dispatch(e) => match e {
                DispatchError::Binding(b) => binding_kind(b),
                DispatchError::EndorsementFailure { .. } => "endorsement-failure",
                DispatchError::CommitTimeout { .. } => "commit-timeout",
                DispatchError::CommitConflict { .. } => "commit-conflict",
                DispatchError::EvaluationFailure { .. } => "evaluation-failure",
                DispatchError::Transport(_) => "gateway-unreachable",
            },
        }
    }
}

fn binding_kind(e: &BindingError) -> &'static str {
    match e {
        BindingError::SessionClosed => "session-closed",
        BindingError::ChannelNotFound(_) => "channel-not-found",
        BindingError::ContractNotFound { .. } => "contract-not-found",
        BindingError::Gateway(_) => "gateway-unreachable",
    }
}
