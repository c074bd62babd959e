//! Transaction dispatcher — submit and evaluate execution.
//!
//! Submit walks endorsement → ordering → commit and only reports
//! `committed = true` once the commit acknowledgment arrives. Evaluate
//! asks a single peer and applies no ledger write. Neither path retries
//! anything — retry policy belongs to the caller, and every failure is
//! surfaced with its kind intact so the caller can tell which retries
//! are safe.
//!
//! Each submission is tracked through `Pending → Endorsing → Ordering →
//! Committed` (`Failed` reachable from every non-terminal state). The
//! per-tx-id registry doubles as the deduplication record: re-executing
//! a request that pinned a request id returns the recorded outcome
//! instead of re-entering the network.

use std::time::Duration;

use bytes::Bytes;
use dashmap::DashMap;
use thiserror::Error;

use convene_core::config::TimeoutConfig;
use convene_core::txid::{derive_tx_id, generate_nonce, nonce_for_request_id, TxId};

use crate::channel::{BindingError, ContractBinding};
use crate::ports::{GatewayApiError, PeerRejection, Proposal};

/// The two transaction execution modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxMode {
    /// Write path: multi-peer endorsement, then ordering and commit.
    Submit,
    /// Read path: single-peer query, no ledger write.
    Evaluate,
}

/// A named operation plus ordered string arguments.
///
/// Arguments pass through unvalidated — validation is the ledger-resident
/// contract's job; this layer is transport, mode selection, and result
/// normalization only.
#[derive(Debug, Clone)]
pub struct TransactionRequest {
    pub operation: String,
    pub args: Vec<String>,
    pub mode: TxMode,
    /// Client-chosen idempotency key. Pins the transaction id so a retry
    /// after an ambiguous outcome reuses it instead of double-writing.
    pub request_id: Option<String>,
}

impl TransactionRequest {
    pub fn submit(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            args: Vec::new(),
            mode: TxMode::Submit,
            request_id: None,
        }
    }

    pub fn evaluate(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            args: Vec::new(),
            mode: TxMode::Evaluate,
            request_id: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn request_id(mut self, id: impl Into<String>) -> Self {
        self.request_id = Some(id.into());
        self
    }
}

/// Normalized outcome of a dispatched operation.
#[derive(Debug, Clone)]
pub struct TransactionResult {
    /// Raw contract response. Opaque here — interpretation belongs to
    /// the contract's callers.
    pub payload: Bytes,
    /// True only when a submit reached commit. Always false for
    /// evaluate — no ledger write occurred.
    pub committed: bool,
    pub tx_id: TxId,
}

/// Lifecycle of one dispatched operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxState {
    Pending,
    Endorsing,
    Ordering,
    Committed,
    Evaluated,
    Failed,
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Binding(#[from] BindingError),
    /// Insufficient peer agreement. The rejecting peers and their
    /// reasons are retained for diagnostics. The proposal never reached
    /// ordering — retrying is safe.
    #[error("endorsement of \"{operation}\" rejected by {} peer(s)", .rejections.len())]
    EndorsementFailure {
        operation: String,
        rejections: Vec<PeerRejection>,
    },
    /// Ordering/commit did not complete within the bounded wait. When
    /// `reached_ordering` is true the write may still land — a blind
    /// retry could double-submit; reuse the same request id or confirm
    /// with an evaluate first.
    #[error("commit of {tx_id} timed out (reached ordering: {reached_ordering})")]
    CommitTimeout { tx_id: TxId, reached_ordering: bool },
    /// The network reported a write conflict with a competing
    /// transaction. Conflict resolution is the ledger's concern; this
    /// layer only refuses to mask it.
    #[error("commit of {tx_id} conflicted: {reason}")]
    CommitConflict { tx_id: TxId, reason: String },
    /// The target peer errored or the contract reported a logical
    /// rejection. Distinct from transport failure.
    #[error("evaluation of \"{operation}\" failed: {reason}")]
    EvaluationFailure { operation: String, reason: String },
    /// Transport-level failure before the proposal reached ordering.
    /// Retry-safe.
    #[error("gateway transport failure: {0}")]
    Transport(String),
}

#[derive(Debug)]
struct TxRecord {
    state: TxState,
    payload: Option<Bytes>,
}

/// Executes requests against a contract binding.
#[derive(Debug)]
pub struct Dispatcher {
    registry: DashMap<TxId, TxRecord>,
    commit_timeout: Duration,
    evaluate_timeout: Duration,
}

impl Dispatcher {
    pub fn new(commit_timeout: Duration, evaluate_timeout: Duration) -> Self {
        Self {
            registry: DashMap::new(),
            commit_timeout,
            evaluate_timeout,
        }
    }

    pub fn from_timeouts(timeouts: &TimeoutConfig) -> Self {
        Self::new(
            Duration::from_secs(timeouts.commit_secs),
            Duration::from_secs(timeouts.evaluate_secs),
        )
    }

    /// Current lifecycle state of a transaction, if this dispatcher has
    /// seen it.
    pub fn state_of(&self, tx_id: &TxId) -> Option<TxState> {
        self.registry.get(tx_id).map(|r| r.state)
    }

    /// Execute a request against the binding, choosing the path by mode.
    pub async fn execute(
        &self,
        binding: &ContractBinding,
        request: TransactionRequest,
    ) -> Result<TransactionResult, DispatchError> {
        match request.mode {
            TxMode::Submit => self.submit(binding, request).await,
            TxMode::Evaluate => self.evaluate(binding, request).await,
        }
    }

    async fn submit(
        &self,
        binding: &ContractBinding,
        request: TransactionRequest,
    ) -> Result<TransactionResult, DispatchError> {
        let session = binding.session()?;
        let nonce = match &request.request_id {
            Some(id) => nonce_for_request_id(id),
            None => generate_nonce(),
        };
        let tx_id = derive_tx_id(
            &nonce,
            binding.channel_name(),
            binding.contract_name(),
            &request.operation,
            &request.args,
        );

        // Deduplication: a pinned request id derives the same tx id, so a
        // prior attempt's record decides whether the network is touched
        // again.
        if let Some(record) = self.registry.get(&tx_id) {
            match record.state {
                TxState::Committed => {
                    let payload = record.payload.clone().unwrap_or_default();
                    drop(record);
                    tracing::info!(%tx_id, "submit deduplicated against committed outcome");
                    return Ok(TransactionResult {
                        payload,
                        committed: true,
                        tx_id,
                    });
                }
                TxState::Ordering => {
                    // A previous attempt reached ordering and its outcome
                    // is unknown; resubmitting could double-write.
                    drop(record);
                    return Err(DispatchError::CommitTimeout {
                        tx_id,
                        reached_ordering: true,
                    });
                }
                // Failed before ordering — safe to run again.
                _ => {}
            }
        }

        self.set_state(tx_id, TxState::Endorsing, None);
        let proposal = Proposal {
            tx_id,
            channel: binding.channel_name().to_string(),
            contract: binding.contract_name().to_string(),
            operation: request.operation.clone(),
            args: request.args.clone(),
        };

        let endorsements = match session.transport.endorse(&proposal).await {
            Ok(e) => e,
            Err(err) => {
                self.set_state(tx_id, TxState::Failed, None);
                return Err(transport_error(err));
            }
        };
        if !endorsements.rejections.is_empty() || endorsements.approvals.is_empty() {
            self.set_state(tx_id, TxState::Failed, None);
            tracing::warn!(
                %tx_id,
                operation = %request.operation,
                rejections = endorsements.rejections.len(),
                "endorsement failed"
            );
            return Err(DispatchError::EndorsementFailure {
                operation: request.operation,
                rejections: endorsements.rejections,
            });
        }

        self.set_state(tx_id, TxState::Ordering, None);
        let ordered = tokio::time::timeout(
            self.commit_timeout,
            session.transport.order(&proposal, &endorsements),
        )
        .await;

        match ordered {
            Err(_elapsed) => {
                // The proposal is with the ordering service; the write may
                // land after we stop waiting. State stays Ordering so a
                // deduplicated retry refuses to resubmit.
                tracing::warn!(%tx_id, "commit wait timed out after ordering handoff");
                Err(DispatchError::CommitTimeout {
                    tx_id,
                    reached_ordering: true,
                })
            }
            Ok(Err(GatewayApiError::Conflict(reason))) => {
                self.set_state(tx_id, TxState::Failed, None);
                Err(DispatchError::CommitConflict { tx_id, reason })
            }
            Ok(Err(GatewayApiError::ContractRejected(reason))) => {
                // Validation failed at commit — the state read at
                // endorsement no longer holds, a competing write won.
                self.set_state(tx_id, TxState::Failed, None);
                Err(DispatchError::CommitConflict { tx_id, reason })
            }
            Ok(Err(GatewayApiError::Unreachable(reason))) => {
                // The orderer never took the proposal — safe to retry.
                self.set_state(tx_id, TxState::Failed, None);
                Err(DispatchError::Transport(reason))
            }
            Ok(Err(other)) => {
                self.set_state(tx_id, TxState::Failed, None);
                Err(transport_error(other))
            }
            Ok(Ok(ack)) => {
                self.set_state(tx_id, TxState::Committed, Some(endorsements.payload.clone()));
                tracing::info!(
                    %tx_id,
                    block = ack.block_number,
                    operation = %request.operation,
                    "transaction committed"
                );
                Ok(TransactionResult {
                    payload: endorsements.payload,
                    committed: true,
                    tx_id,
                })
            }
        }
    }

    async fn evaluate(
        &self,
        binding: &ContractBinding,
        request: TransactionRequest,
    ) -> Result<TransactionResult, DispatchError> {
        let session = binding.session()?;
        let tx_id = derive_tx_id(
            &generate_nonce(),
            binding.channel_name(),
            binding.contract_name(),
            &request.operation,
            &request.args,
        );
        let proposal = Proposal {
            tx_id,
            channel: binding.channel_name().to_string(),
            contract: binding.contract_name().to_string(),
            operation: request.operation.clone(),
            args: request.args.clone(),
        };

        let outcome =
            tokio::time::timeout(self.evaluate_timeout, session.transport.evaluate(&proposal))
                .await;

        match outcome {
            Err(_elapsed) => Err(DispatchError::EvaluationFailure {
                operation: request.operation,
                reason: format!("no response within {:?}", self.evaluate_timeout),
            }),
            Ok(Err(GatewayApiError::ContractRejected(reason))) => {
                Err(DispatchError::EvaluationFailure {
                    operation: request.operation,
                    reason,
                })
            }
            Ok(Err(other)) => Err(transport_error(other)),
            Ok(Ok(payload)) => {
                tracing::debug!(%tx_id, operation = %request.operation, "evaluate completed");
                Ok(TransactionResult {
                    payload,
                    committed: false,
                    tx_id,
                })
            }
        }
    }

    fn set_state(&self, tx_id: TxId, state: TxState, payload: Option<Bytes>) {
        self.registry.insert(tx_id, TxRecord { state, payload });
    }
}

fn transport_error(err: GatewayApiError) -> DispatchError {
    DispatchError::Transport(err.to_string())
}
