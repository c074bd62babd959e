//! In-process fakes for the CA and gateway seams, shared by unit tests.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::{DashMap, DashSet};

use convene_core::identity::{Identity, IdentityRole};

use crate::ports::{
    CommitAck, ConnectOptions, Discovery, Endorsements, Endpoint, GatewayApiError,
    GatewaySession, LedgerGateway, PeerRejection, Proposal,
};

pub(crate) fn seed_identity(label: &str) -> Identity {
    Identity::new(
        label,
        Bytes::from(format!("CERT({label})")),
        vec![0x5A; 32],
        "Org1MSP",
        IdentityRole::Client,
    )
}

/// Shared state of the fake network: the contract's records plus
/// failure knobs and call counters.
struct NetState {
    records: DashMap<String, serde_json::Value>,
    denied_discovery: DashSet<String>,
    reject_endorsement: AtomicBool,
    conflict_on_commit: AtomicBool,
    stall_commit: AtomicBool,
    block_height: AtomicU64,
    connect_calls: AtomicUsize,
    endorse_calls: AtomicUsize,
    order_calls: AtomicUsize,
    evaluate_calls: AtomicUsize,
}

impl NetState {
    fn peers() -> Vec<Endpoint> {
        vec![
            Endpoint::new("peer0.org1.example.com", 7051),
            Endpoint::new("peer0.org2.example.com", 9051),
        ]
    }

    fn orderers() -> Vec<Endpoint> {
        vec![Endpoint::new("orderer.example.com", 7050)]
    }

    /// The evaluation-meeting contract. `apply` distinguishes endorsement
    /// simulation from the committed write.
    fn run_contract(
        &self,
        operation: &str,
        args: &[String],
        apply: bool,
    ) -> Result<String, String> {
        match operation {
            "CreateEvaluationMeeting" => {
                let [id, title, organizer, scheduled_at] = expect_args::<4>(args)?;
                if self.records.contains_key(&id) {
                    return Err(format!("the meeting {id} already exists"));
                }
                let record = serde_json::json!({
                    "id": id, "title": title,
                    "organizer": organizer, "scheduledAt": scheduled_at,
                });
                if apply {
                    self.records.insert(id, record.clone());
                }
                Ok(record.to_string())
            }
            "UpdateEvaluationMeeting" => {
                let [id, title, organizer, scheduled_at] = expect_args::<4>(args)?;
                if !self.records.contains_key(&id) {
                    return Err(format!("the meeting {id} does not exist"));
                }
                let record = serde_json::json!({
                    "id": id, "title": title,
                    "organizer": organizer, "scheduledAt": scheduled_at,
                });
                if apply {
                    self.records.insert(id, record.clone());
                }
                Ok(record.to_string())
            }
            "ReadEvaluationMeeting" => {
                let [id] = expect_args::<1>(args)?;
                self.records
                    .get(&id)
                    .map(|r| r.value().to_string())
                    .ok_or_else(|| format!("the meeting {id} does not exist"))
            }
            "GetAllEvaluationMeeting" => {
                let mut all: Vec<serde_json::Value> =
                    self.records.iter().map(|r| r.value().clone()).collect();
                all.sort_by_key(|r| r["id"].as_str().unwrap_or_default().to_string());
                Ok(serde_json::Value::Array(all).to_string())
            }
            "EvaluationMeetingExists" => {
                let [id] = expect_args::<1>(args)?;
                Ok(self.records.contains_key(&id).to_string())
            }
            other => Err(format!("unknown operation {other}")),
        }
    }
}

fn expect_args<const N: usize>(args: &[String]) -> Result<[String; N], String> {
    if args.len() != N {
        return Err(format!("expected {N} argument(s), got {}", args.len()));
    }
    Ok(std::array::from_fn(|i| args[i].clone()))
}

/// A two-peer, one-orderer network holding the evaluation-meeting
/// contract on "mychannel"/"basic". Failure knobs let tests drive each
/// error path without touching the happy-path code.
pub(crate) struct FakeNetwork {
    state: Arc<NetState>,
}

impl FakeNetwork {
    pub(crate) fn shared() -> Arc<Self> {
        Arc::new(Self {
            state: Arc::new(NetState {
                records: DashMap::new(),
                denied_discovery: DashSet::new(),
                reject_endorsement: AtomicBool::new(false),
                conflict_on_commit: AtomicBool::new(false),
                stall_commit: AtomicBool::new(false),
                block_height: AtomicU64::new(1),
                connect_calls: AtomicUsize::new(0),
                endorse_calls: AtomicUsize::new(0),
                order_calls: AtomicUsize::new(0),
                evaluate_calls: AtomicUsize::new(0),
            }),
        })
    }

    pub(crate) fn deny_discovery(&self, identity_label: &str) {
        self.state.denied_discovery.insert(identity_label.to_string());
    }

    pub(crate) fn reject_next_endorsements(&self) {
        self.state.reject_endorsement.store(true, Ordering::SeqCst);
    }

    pub(crate) fn conflict_on_next_commit(&self) {
        self.state.conflict_on_commit.store(true, Ordering::SeqCst);
    }

    pub(crate) fn stall_commit(&self) {
        self.state.stall_commit.store(true, Ordering::SeqCst);
    }

    pub(crate) fn connect_calls(&self) -> usize {
        self.state.connect_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn endorse_calls(&self) -> usize {
        self.state.endorse_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn order_calls(&self) -> usize {
        self.state.order_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn evaluate_calls(&self) -> usize {
        self.state.evaluate_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn record_count(&self) -> usize {
        self.state.records.len()
    }
}

#[async_trait]
impl LedgerGateway for FakeNetwork {
    async fn connect(
        &self,
        identity: &Identity,
        _options: &ConnectOptions,
    ) -> Result<Box<dyn GatewaySession>, GatewayApiError> {
        self.state.connect_calls.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeSession {
            state: self.state.clone(),
            identity_label: identity.label.clone(),
        }))
    }
}

struct FakeSession {
    state: Arc<NetState>,
    identity_label: String,
}

#[async_trait]
impl GatewaySession for FakeSession {
    async fn discover(&self) -> Result<Discovery, GatewayApiError> {
        if self.state.denied_discovery.contains(&self.identity_label) {
            return Err(GatewayApiError::AccessDenied(format!(
                "channel mychannel: access denied for {}",
                self.identity_label
            )));
        }
        Ok(Discovery {
            peers: NetState::peers(),
            orderers: NetState::orderers(),
        })
    }

    async fn channel_exists(&self, channel: &str) -> Result<bool, GatewayApiError> {
        Ok(channel == "mychannel")
    }

    async fn contract_exists(
        &self,
        channel: &str,
        contract: &str,
    ) -> Result<bool, GatewayApiError> {
        Ok(channel == "mychannel" && contract == "basic")
    }

    async fn endorse(&self, proposal: &Proposal) -> Result<Endorsements, GatewayApiError> {
        self.state.endorse_calls.fetch_add(1, Ordering::SeqCst);
        if self.state.reject_endorsement.swap(false, Ordering::SeqCst) {
            return Ok(rejected_by_all("endorsement policy not satisfied"));
        }
        match self
            .state
            .run_contract(&proposal.operation, &proposal.args, false)
        {
            Ok(payload) => Ok(Endorsements {
                payload: Bytes::from(payload),
                approvals: NetState::peers(),
                rejections: Vec::new(),
            }),
            Err(reason) => Ok(rejected_by_all(&reason)),
        }
    }

    async fn order(
        &self,
        proposal: &Proposal,
        _endorsements: &Endorsements,
    ) -> Result<CommitAck, GatewayApiError> {
        self.state.order_calls.fetch_add(1, Ordering::SeqCst);
        if self.state.stall_commit.load(Ordering::SeqCst) {
            // Commit acknowledgment never arrives.
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        if self.state.conflict_on_commit.swap(false, Ordering::SeqCst) {
            return Err(GatewayApiError::Conflict(format!(
                "MVCC read conflict for {}",
                proposal.tx_id
            )));
        }
        self.state
            .run_contract(&proposal.operation, &proposal.args, true)
            .map_err(GatewayApiError::ContractRejected)?;
        Ok(CommitAck {
            tx_id: proposal.tx_id,
            block_number: self.state.block_height.fetch_add(1, Ordering::SeqCst),
        })
    }

    async fn evaluate(&self, proposal: &Proposal) -> Result<Bytes, GatewayApiError> {
        self.state.evaluate_calls.fetch_add(1, Ordering::SeqCst);
        self.state
            .run_contract(&proposal.operation, &proposal.args, false)
            .map(Bytes::from)
            .map_err(GatewayApiError::ContractRejected)
    }

    async fn close(&self) {}
}

fn rejected_by_all(reason: &str) -> Endorsements {
    Endorsements {
        payload: Bytes::new(),
        approvals: Vec::new(),
        rejections: NetState::peers()
            .into_iter()
            .map(|peer| PeerRejection {
                peer,
                reason: reason.to_string(),
            })
            .collect(),
    }
}
