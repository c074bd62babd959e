//! Top-level client — wires wallet, CA, connector, and dispatcher
//! together from one config.
//!
//! This is the boundary the API layer talks to: enrollment on one side,
//! an opened [`MeetingLedger`] on the other, every failure a
//! [`ClientError`] with its kind intact.

use std::sync::Arc;

use convene_core::config::ConveneConfig;

use crate::ca::CaClient;
use crate::channel::ContractBinding;
use crate::connector::NetworkConnector;
use crate::dispatch::Dispatcher;
use crate::error::ClientError;
use crate::meetings::MeetingLedger;
use crate::ports::{CertificateAuthorityApi, ConnectOptions, LedgerGateway};
use crate::wallet::Wallet;

pub struct ConveneClient {
    config: ConveneConfig,
    wallet: Wallet,
    ca: CaClient,
    connector: NetworkConnector,
}

impl ConveneClient {
    /// Build a client whose wallet lives at the configured path.
    pub fn new(
        config: ConveneConfig,
        ca_api: Arc<dyn CertificateAuthorityApi>,
        gateway: Arc<dyn LedgerGateway>,
    ) -> Result<Self, ClientError> {
        let wallet = Wallet::open(config.wallet.path.clone())?;
        Ok(Self::with_wallet(config, wallet, ca_api, gateway))
    }

    /// Build a client around an existing wallet (e.g. in-memory).
    pub fn with_wallet(
        config: ConveneConfig,
        wallet: Wallet,
        ca_api: Arc<dyn CertificateAuthorityApi>,
        gateway: Arc<dyn LedgerGateway>,
    ) -> Self {
        let ca = CaClient::new(ca_api, wallet.clone(), config.ca.admin_label.clone());
        let connector = NetworkConnector::new(wallet.clone(), gateway);
        Self {
            config,
            wallet,
            ca,
            connector,
        }
    }

    pub fn config(&self) -> &ConveneConfig {
        &self.config
    }

    pub fn wallet(&self) -> &Wallet {
        &self.wallet
    }

    /// Enroll the CA admin using the configured bootstrap secret.
    /// Idempotent: a second call is a no-op.
    pub async fn enroll_admin(&self) -> Result<(), ClientError> {
        self.ca
            .enroll_admin(&self.config.ca.admin_secret, &self.config.ca.msp_id)
            .await?;
        Ok(())
    }

    /// Register and enroll an application user under the configured
    /// affiliation. Requires a previously enrolled admin.
    pub async fn enroll_user(&self, label: &str) -> Result<(), ClientError> {
        self.ca
            .register_and_enroll_user(
                label,
                &self.config.ca.msp_id,
                &self.config.ca.affiliation,
                None,
            )
            .await?;
        Ok(())
    }

    /// Connect as `identity_label` and resolve the configured channel and
    /// contract, yielding the meeting operations.
    pub async fn open_meetings(&self, identity_label: &str) -> Result<MeetingLedger, ClientError> {
        let options = ConnectOptions {
            discovery: self.config.network.discovery,
            as_localhost: self.config.network.as_localhost,
        };
        let session = self.connector.connect(identity_label, options).await?;
        let binding = ContractBinding::resolve(
            &session,
            &self.config.channel.channel_name,
            &self.config.channel.contract_name,
        )
        .await?;
        let dispatcher = Dispatcher::from_timeouts(&self.config.timeouts);
        Ok(MeetingLedger::new(binding, dispatcher))
    }

    /// Close the session, invalidating any open [`MeetingLedger`].
    /// Returns whether a session was open.
    pub async fn close(&self) -> bool {
        self.connector.disconnect().await
    }
}
