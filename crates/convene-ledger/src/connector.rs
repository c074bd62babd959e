//! Network connector — owns the single gateway session.
//!
//! One session is held for the process lifetime by design: every channel
//! binding and transaction dispatched from this process reuses it rather
//! than opening a connection per request. `connect` resolves the signing
//! identity from the wallet before any network call; `disconnect` closes
//! the transport and invalidates every binding created from the session.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Mutex;

use crate::ports::{ConnectOptions, Endpoint, GatewayApiError, GatewaySession, LedgerGateway};
use crate::wallet::Wallet;

#[derive(Debug, Error)]
pub enum ConnectError {
    #[error(
        "identity \"{0}\" not found in the wallet — re-run enrollment; \
         if the CA was restarted, clear the wallet and enroll again"
    )]
    IdentityNotFound(String),
    /// Transport-level failure reaching the gateway. Retry-safe.
    #[error("gateway unreachable: {0}")]
    GatewayUnreachable(String),
    /// The network rejected this identity's channel membership during
    /// discovery. An authorization outcome, not an outage — do not
    /// retry; clear the wallet and re-enroll if the CA was reset.
    #[error("discovery denied for \"{identity}\": {reason}")]
    DiscoveryDenied { identity: String, reason: String },
    #[error("a session is already open — disconnect it first")]
    AlreadyConnected,
}

/// An established session: signing identity metadata, resolved topology,
/// and the open transport.
pub struct SessionHandle {
    identity_label: String,
    msp_id: String,
    discovery_enabled: bool,
    peers: BTreeSet<Endpoint>,
    orderers: BTreeSet<Endpoint>,
    open: AtomicBool,
    pub(crate) transport: Box<dyn GatewaySession>,
}

impl SessionHandle {
    pub fn identity_label(&self) -> &str {
        &self.identity_label
    }

    pub fn msp_id(&self) -> &str {
        &self.msp_id
    }

    pub fn discovery_enabled(&self) -> bool {
        self.discovery_enabled
    }

    pub fn peers(&self) -> &BTreeSet<Endpoint> {
        &self.peers
    }

    pub fn orderers(&self) -> &BTreeSet<Endpoint> {
        &self.orderers
    }

    /// False once the connector has disconnected this session.
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    async fn close(&self) {
        if self.open.swap(false, Ordering::AcqRel) {
            self.transport.close().await;
            tracing::info!(identity = %self.identity_label, "gateway session closed");
        }
    }
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle")
            .field("identity", &self.identity_label)
            .field("msp_id", &self.msp_id)
            .field("peers", &self.peers.len())
            .field("orderers", &self.orderers.len())
            .field("open", &self.is_open())
            .finish()
    }
}

/// Holds the one session slot and the pieces needed to fill it.
pub struct NetworkConnector {
    wallet: Wallet,
    gateway: Arc<dyn LedgerGateway>,
    current: Mutex<Option<Arc<SessionHandle>>>,
}

impl NetworkConnector {
    pub fn new(wallet: Wallet, gateway: Arc<dyn LedgerGateway>) -> Self {
        Self {
            wallet,
            gateway,
            current: Mutex::new(None),
        }
    }

    /// Open a session as `identity_label`.
    ///
    /// The identity is resolved locally first — a missing label fails
    /// before any network traffic. With discovery enabled, the channel's
    /// peer and orderer endpoints are resolved as part of connecting.
    pub async fn connect(
        &self,
        identity_label: &str,
        options: ConnectOptions,
    ) -> Result<Arc<SessionHandle>, ConnectError> {
        let identity = self
            .wallet
            .get(identity_label)
            .map_err(|_| ConnectError::IdentityNotFound(identity_label.to_string()))?;

        let mut slot = self.current.lock().await;
        if slot.as_ref().is_some_and(|s| s.is_open()) {
            return Err(ConnectError::AlreadyConnected);
        }

        let transport = self
            .gateway
            .connect(&identity, &options)
            .await
            .map_err(|e| connect_error(identity_label, e))?;

        let (peers, orderers) = if options.discovery {
            let discovery = transport
                .discover()
                .await
                .map_err(|e| connect_error(identity_label, e))?;
            (
                discovery.peers.into_iter().collect(),
                discovery.orderers.into_iter().collect(),
            )
        } else {
            (BTreeSet::new(), BTreeSet::new())
        };

        let handle = Arc::new(SessionHandle {
            identity_label: identity_label.to_string(),
            msp_id: identity.msp_id.clone(),
            discovery_enabled: options.discovery,
            peers,
            orderers,
            open: AtomicBool::new(true),
            transport,
        });
        tracing::info!(
            identity = identity_label,
            msp = %identity.msp_id,
            peers = handle.peers.len(),
            orderers = handle.orderers.len(),
            "gateway session established"
        );
        *slot = Some(handle.clone());
        Ok(handle)
    }

    /// Close the current session, releasing peer/orderer connections and
    /// invalidating every binding created from it. Returns whether a
    /// session was open.
    pub async fn disconnect(&self) -> bool {
        let handle = self.current.lock().await.take();
        match handle {
            Some(session) => {
                session.close().await;
                true
            }
            None => false,
        }
    }

    /// The currently open session, if any.
    pub async fn session(&self) -> Option<Arc<SessionHandle>> {
        self.current
            .lock()
            .await
            .as_ref()
            .filter(|s| s.is_open())
            .cloned()
    }
}

fn connect_error(identity: &str, err: GatewayApiError) -> ConnectError {
    match err {
        GatewayApiError::AccessDenied(reason) => ConnectError::DiscoveryDenied {
            identity: identity.to_string(),
            reason,
        },
        other => ConnectError::GatewayUnreachable(other.to_string()),
    }
}
