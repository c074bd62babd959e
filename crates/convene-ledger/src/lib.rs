//! convene-ledger — identity enrollment and transaction execution against a
//! permissioned ledger network.
//!
//! The pieces, leaves first:
//!
//! - [`wallet`] persists named identities (certificate + key + issuer).
//! - [`ca`] enrolls and registers identities against a certificate
//!   authority, writing the results into the wallet.
//! - [`connector`] opens the single long-lived gateway session as a
//!   wallet identity, with optional peer/orderer discovery.
//! - [`channel`] resolves a named channel and deployed contract on that
//!   session.
//! - [`dispatch`] executes operations against a binding — submit
//!   (endorse → order → commit) or evaluate (single-peer read).
//! - [`meetings`] is the caller-facing facade over the evaluation-meeting
//!   contract; [`client`] wires the whole stack together from config.
//!
//! External services are consumed through the traits in [`ports`]; the
//! [`http_ca`] adapter implements the CA seam over REST.

pub mod ca;
pub mod channel;
pub mod client;
pub mod connector;
pub mod dispatch;
pub mod error;
pub mod http_ca;
pub mod meetings;
pub mod ports;
pub mod wallet;

#[cfg(test)]
pub(crate) mod testutil;

pub use channel::ContractBinding;
pub use client::ConveneClient;
pub use connector::{NetworkConnector, SessionHandle};
pub use dispatch::{Dispatcher, TransactionRequest, TransactionResult, TxMode};
pub use error::ClientError;
pub use meetings::MeetingLedger;
pub use wallet::Wallet;
