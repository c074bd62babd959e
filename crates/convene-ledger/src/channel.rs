//! Channel binding — resolves a named channel and deployed contract on
//! an open session.
//!
//! A binding is a pure lookup: resolving it mutates no network state.
//! It holds the session weakly and is only valid while that session is
//! open — using it after `disconnect` fails with `SessionClosed`.

use std::sync::{Arc, Weak};

use thiserror::Error;

use crate::connector::SessionHandle;
use crate::ports::GatewayApiError;

#[derive(Debug, Error)]
pub enum BindingError {
    #[error("session is closed — reconnect and resolve the binding again")]
    SessionClosed,
    #[error("channel \"{0}\" not found on the network")]
    ChannelNotFound(String),
    #[error("contract \"{contract}\" is not deployed on channel \"{channel}\"")]
    ContractNotFound { channel: String, contract: String },
    #[error(transparent)]
    Gateway(GatewayApiError),
}

/// A resolved (channel, contract) pair on a live session.
#[derive(Clone)]
pub struct ContractBinding {
    channel_name: String,
    contract_name: String,
    session: Weak<SessionHandle>,
}

impl ContractBinding {
    /// Resolve `contract_name` on `channel_name` within the session.
    pub async fn resolve(
        session: &Arc<SessionHandle>,
        channel_name: &str,
        contract_name: &str,
    ) -> Result<Self, BindingError> {
        if !session.is_open() {
            return Err(BindingError::SessionClosed);
        }

        let has_channel = session
            .transport
            .channel_exists(channel_name)
            .await
            .map_err(BindingError::Gateway)?;
        if !has_channel {
            return Err(BindingError::ChannelNotFound(channel_name.to_string()));
        }

        let has_contract = session
            .transport
            .contract_exists(channel_name, contract_name)
            .await
            .map_err(BindingError::Gateway)?;
        if !has_contract {
            return Err(BindingError::ContractNotFound {
                channel: channel_name.to_string(),
                contract: contract_name.to_string(),
            });
        }

        tracing::debug!(
            channel = channel_name,
            contract = contract_name,
            "contract binding resolved"
        );
        Ok(Self {
            channel_name: channel_name.to_string(),
            contract_name: contract_name.to_string(),
            session: Arc::downgrade(session),
        })
    }

    pub fn channel_name(&self) -> &str {
        &self.channel_name
    }

    pub fn contract_name(&self) -> &str {
        &self.contract_name
    }

    /// The live session behind this binding, or `SessionClosed` if it was
    /// disconnected or dropped.
    pub fn session(&self) -> Result<Arc<SessionHandle>, BindingError> {
        self.session
            .upgrade()
            .filter(|s| s.is_open())
            .ok_or(BindingError::SessionClosed)
    }
}

impl std::fmt::Debug for ContractBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContractBinding")
            .field("channel", &self.channel_name)
            .field("contract", &self.contract_name)
            .field("session_open", &self.session().is_ok())
            .finish()
    }
}
