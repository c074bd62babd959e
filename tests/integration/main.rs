//! Convene integration test harness.
//!
//! Tests run the full client stack — wallet, CA client, connector,
//! channel binding, dispatcher, meetings facade — against the
//! in-process CA and ledger network fakes in `infra`. No external
//! services are required.
//!
//! Scenario groups:
//!   enrollment.rs    — admin/user enrollment, idempotency, CA errors
//!   transactions.rs  — submit/evaluate flows over the meeting contract
//!   failures.rs      — discovery, endorsement, commit, and session faults

mod enrollment;
mod transactions;

use infra::TestBed;

/// Smoke test: the whole stack assembles and tears down cleanly.
#[tokio::test]
async fn stack_assembles_and_disconnects() {
    let bed = TestBed::new();

    bed.client.enroll_admin().await.expect("admin enrollment");
    bed.client
        .enroll_user("appUser")
        .await
        .expect("user enrollment");

    let meetings = bed
        .client
        .open_meetings("appUser")
        .await
        .expect("open meetings ledger");

    let all = meetings.list_meetings().await.expect("list on empty ledger");
    assert_eq!(all, serde_json::json!([]));

    assert!(bed.client.close().await, "a session should have been open");
    assert!(!bed.client.close().await, "second close is a no-op");
}
