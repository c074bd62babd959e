//! Certificate authority client — enrollment and registration flows.
//!
//! Both flows are idempotent on the wallet: if the label already holds an
//! identity, the call is a no-op and the CA is never contacted. Silently
//! re-issuing a certificate for an identity that already has one would
//! invalidate in-flight sessions signed with the old one.

use std::sync::Arc;

use dashmap::DashMap;
use thiserror::Error;
use tokio::sync::Mutex;

use convene_core::identity::IdentityRole;

use crate::ports::{CaApiError, CertificateAuthorityApi, RegistrationRequest};
use crate::wallet::{Wallet, WalletError};

#[derive(Debug, Error)]
pub enum CaError {
    #[error("admin identity \"{0}\" is not enrolled — enroll the admin before registering users")]
    AdminNotEnrolled(String),
    /// The CA never answered. Retry-safe.
    #[error("certificate authority unreachable: {0}")]
    CaUnreachable(String),
    /// The CA rejected the enrollment secret. Not retry-safe.
    #[error("authentication failure enrolling \"{label}\": {reason}")]
    AuthenticationFailure { label: String, reason: String },
    /// The CA refused the registration. Usually means the label is
    /// registered at the CA but absent locally — wallet and CA have
    /// diverged, which the caller must see, not a generic failure.
    #[error("registration denied for \"{label}\": {reason}")]
    RegistrationDenied { label: String, reason: String },
    #[error(transparent)]
    Wallet(#[from] WalletError),
}

/// Client for one organization's certificate authority.
pub struct CaClient {
    api: Arc<dyn CertificateAuthorityApi>,
    wallet: Wallet,
    /// Label the organization's CA admin is stored under.
    admin_label: String,
    /// Per-label guards so two concurrent enrollments for the same label
    /// cannot both reach the CA.
    label_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl CaClient {
    pub fn new(
        api: Arc<dyn CertificateAuthorityApi>,
        wallet: Wallet,
        admin_label: impl Into<String>,
    ) -> Self {
        Self {
            api,
            wallet,
            admin_label: admin_label.into(),
            label_locks: DashMap::new(),
        }
    }

    pub fn admin_label(&self) -> &str {
        &self.admin_label
    }

    fn lock_for(&self, label: &str) -> Arc<Mutex<()>> {
        self.label_locks
            .entry(label.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Enroll the CA admin, storing the result under the admin label.
    ///
    /// No-op when the label already exists in the wallet — returns Ok
    /// without contacting the CA.
    pub async fn enroll_admin(&self, secret: &str, msp_id: &str) -> Result<(), CaError> {
        let label = self.admin_label.clone();
        let lock = self.lock_for(&label);
        let _guard = lock.lock().await;

        if self.wallet.exists(&label) {
            tracing::debug!(label = %label, "admin already enrolled, skipping CA call");
            return Ok(());
        }

        let material = self
            .api
            .enroll(&label, secret)
            .await
            .map_err(|e| enroll_error(&label, e))?;
        let identity = material.into_identity(&label, msp_id, IdentityRole::Admin);
        self.wallet.put(identity, false)?;
        tracing::info!(label = %label, msp = msp_id, "admin enrolled");
        Ok(())
    }

    /// Register a new application user with the CA and enroll it, storing
    /// the result under `label`.
    ///
    /// Requires the admin identity to already be in the wallet. No-op
    /// when the user label already exists — zero CA calls.
    pub async fn register_and_enroll_user(
        &self,
        label: &str,
        msp_id: &str,
        affiliation: &str,
        secret_hint: Option<&str>,
    ) -> Result<(), CaError> {
        let lock = self.lock_for(label);
        let _guard = lock.lock().await;

        if self.wallet.exists(label) {
            tracing::debug!(label = %label, "user already enrolled, skipping CA calls");
            return Ok(());
        }

        let admin = self
            .wallet
            .get(&self.admin_label)
            .map_err(|_| CaError::AdminNotEnrolled(self.admin_label.clone()))?;

        let request = RegistrationRequest {
            label: label.to_string(),
            affiliation: affiliation.to_string(),
            role: IdentityRole::Client,
            secret_hint: secret_hint.map(str::to_string),
        };
        // The CA's returned secret is authoritative, hint or not.
        let secret = self
            .api
            .register(&admin, &request)
            .await
            .map_err(|e| register_error(label, e))?;

        let material = self
            .api
            .enroll(label, &secret)
            .await
            .map_err(|e| enroll_error(label, e))?;
        let identity = material.into_identity(label, msp_id, IdentityRole::Client);
        self.wallet.put(identity, false)?;
        tracing::info!(label = %label, msp = msp_id, affiliation, "user registered and enrolled");
        Ok(())
    }
}

fn enroll_error(label: &str, err: CaApiError) -> CaError {
    match err {
        CaApiError::Unreachable(reason) => CaError::CaUnreachable(reason),
        CaApiError::AuthenticationFailed(reason) | CaApiError::Denied(reason) => {
            CaError::AuthenticationFailure {
                label: label.to_string(),
                reason,
            }
        }
    }
}

fn register_error(label: &str, err: CaApiError) -> CaError {
    match err {
        CaApiError::Unreachable(reason) => CaError::CaUnreachable(reason),
        CaApiError::AuthenticationFailed(reason) | CaApiError::Denied(reason) => {
            CaError::RegistrationDenied {
                label: label.to_string(),
                reason,
            }
        }
    }
}
