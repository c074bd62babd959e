//! Caller-facing facade over the evaluation-meeting contract.
//!
//! One method per contract operation, each picking the right execution
//! mode: creates and updates are submits (endorsement + ordering),
//! reads are evaluates (single peer). Field values come from the caller
//! and pass through to the contract untouched; read results are parsed
//! to JSON for convenience with the raw payload intact underneath.

use bytes::Bytes;
use serde_json::Value;

use crate::channel::ContractBinding;
use crate::dispatch::{DispatchError, Dispatcher, TransactionRequest};

/// Contract operation names, as deployed.
mod ops {
    pub const CREATE: &str = "CreateEvaluationMeeting";
    pub const READ: &str = "ReadEvaluationMeeting";
    pub const LIST: &str = "GetAllEvaluationMeeting";
    pub const UPDATE: &str = "UpdateEvaluationMeeting";
    pub const EXISTS: &str = "EvaluationMeetingExists";
}

/// Caller-supplied fields of a meeting record. The contract owns
/// validation; this layer only plumbs the values through in order.
#[derive(Debug, Clone)]
pub struct MeetingFields {
    pub id: String,
    pub title: String,
    pub organizer: String,
    /// RFC 3339 timestamp, passed through verbatim.
    pub scheduled_at: String,
}

impl MeetingFields {
    fn into_args(self) -> [String; 4] {
        [self.id, self.title, self.organizer, self.scheduled_at]
    }
}

/// A committed write, with the contract's response parsed when it is
/// JSON.
#[derive(Debug, Clone)]
pub struct CommittedRecord {
    pub record: Value,
    pub raw: Bytes,
}

/// The five operations the excluded API layer consumes.
#[derive(Debug)]
pub struct MeetingLedger {
    binding: ContractBinding,
    dispatcher: Dispatcher,
}

impl MeetingLedger {
    pub fn new(binding: ContractBinding, dispatcher: Dispatcher) -> Self {
        Self {
            binding,
            dispatcher,
        }
    }

    pub fn binding(&self) -> &ContractBinding {
        &self.binding
    }

    /// Submit `CreateEvaluationMeeting`; returns the created record as
    /// the contract echoed it back.
    pub async fn create_meeting(
        &self,
        fields: MeetingFields,
        request_id: Option<&str>,
    ) -> Result<CommittedRecord, DispatchError> {
        let mut request = TransactionRequest::submit(ops::CREATE).args(fields.into_args());
        if let Some(id) = request_id {
            request = request.request_id(id);
        }
        let result = self.dispatcher.execute(&self.binding, request).await?;
        Ok(CommittedRecord {
            record: parse_payload(&result.payload),
            raw: result.payload,
        })
    }

    /// Evaluate `ReadEvaluationMeeting` for one meeting id.
    pub async fn read_meeting(&self, meeting_id: &str) -> Result<Value, DispatchError> {
        let request = TransactionRequest::evaluate(ops::READ).arg(meeting_id);
        let result = self.dispatcher.execute(&self.binding, request).await?;
        Ok(parse_payload(&result.payload))
    }

    /// Evaluate `GetAllEvaluationMeeting`; an empty ledger yields an
    /// empty array, which is success.
    pub async fn list_meetings(&self) -> Result<Value, DispatchError> {
        let request = TransactionRequest::evaluate(ops::LIST);
        let result = self.dispatcher.execute(&self.binding, request).await?;
        if result.payload.is_empty() {
            return Ok(Value::Array(Vec::new()));
        }
        Ok(parse_payload(&result.payload))
    }

    /// Submit `UpdateEvaluationMeeting` with the full replacement record.
    pub async fn update_meeting(
        &self,
        fields: MeetingFields,
        request_id: Option<&str>,
    ) -> Result<CommittedRecord, DispatchError> {
        let mut request = TransactionRequest::submit(ops::UPDATE).args(fields.into_args());
        if let Some(id) = request_id {
            request = request.request_id(id);
        }
        let result = self.dispatcher.execute(&self.binding, request).await?;
        Ok(CommittedRecord {
            record: parse_payload(&result.payload),
            raw: result.payload,
        })
    }

    /// Evaluate `EvaluationMeetingExists` — a boolean-style result.
    pub async fn meeting_exists(&self, meeting_id: &str) -> Result<bool, DispatchError> {
        let request = TransactionRequest::evaluate(ops::EXISTS).arg(meeting_id);
        let result = self.dispatcher.execute(&self.binding, request).await?;
        let text = String::from_utf8_lossy(&result.payload);
        Ok(text.trim() == "true")
    }
}

/// Parse a contract payload as JSON, falling back to a string value for
/// non-JSON responses. The raw bytes stay available to callers that
/// need them.
fn parse_payload(payload: &Bytes) -> Value {
    serde_json::from_slice(payload)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(payload).into_owned()))
}
