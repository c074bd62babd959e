//! Submit and evaluate flows over the evaluation-meeting contract,
//! end to end: enroll → connect → bind → dispatch.

use crate::infra::TestBed;
use convene_ledger::meetings::{MeetingFields, MeetingLedger};

async fn opened(bed: &TestBed) -> MeetingLedger {
    bed.client.enroll_admin().await.unwrap();
    bed.client.enroll_user("appUser").await.unwrap();
    bed.client.open_meetings("appUser").await.unwrap()
}

fn fields(id: &str, title: &str) -> MeetingFields {
    MeetingFields {
        id: id.into(),
        title: title.into(),
        organizer: "alice".into(),
        scheduled_at: "2026-09-01T10:00:00Z".into(),
    }
}

#[tokio::test]
async fn create_commits_and_echoes_the_record() {
    let bed = TestBed::new();
    let meetings = opened(&bed).await;

    let created = meetings
        .create_meeting(fields("m1", "Quarterly review"), None)
        .await
        .unwrap();

    assert_eq!(created.record["id"], "m1");
    assert_eq!(created.record["organizer"], "alice");
    assert!(!created.raw.is_empty());
    assert_eq!(bed.network.record_count(), 1);
    // Write path went through ordering exactly once.
    assert_eq!(bed.network.order_calls(), 1);
}

#[tokio::test]
async fn read_targets_a_single_peer_and_never_orders() {
    let bed = TestBed::new();
    let meetings = opened(&bed).await;
    meetings
        .create_meeting(fields("m1", "Quarterly review"), None)
        .await
        .unwrap();
    let orders_before = bed.network.order_calls();

    let record = meetings.read_meeting("m1").await.unwrap();

    assert_eq!(record["title"], "Quarterly review");
    assert_eq!(bed.network.order_calls(), orders_before);
    assert_eq!(bed.network.evaluate_calls(), 1);
}

#[tokio::test]
async fn evaluate_leaves_wallet_and_session_untouched() {
    let bed = TestBed::new();
    let meetings = opened(&bed).await;
    let labels_before = bed.client.wallet().list();

    let _ = meetings.list_meetings().await.unwrap();
    let _ = meetings.meeting_exists("m1").await.unwrap();

    assert_eq!(bed.client.wallet().list(), labels_before);
    assert_eq!(bed.network.record_count(), 0);
    // The same session keeps serving; no reconnect happened.
    let record = meetings.list_meetings().await.unwrap();
    assert_eq!(record, serde_json::json!([]));
}

#[tokio::test]
async fn list_returns_every_committed_meeting() {
    let bed = TestBed::new();
    let meetings = opened(&bed).await;

    meetings
        .create_meeting(fields("m2", "Retro"), None)
        .await
        .unwrap();
    meetings
        .create_meeting(fields("m1", "Kickoff"), None)
        .await
        .unwrap();

    let all = meetings.list_meetings().await.unwrap();
    let ids: Vec<&str> = all
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["m1", "m2"]);
}

#[tokio::test]
async fn update_is_a_submit_and_replaces_the_record() {
    let bed = TestBed::new();
    let meetings = opened(&bed).await;
    meetings
        .create_meeting(fields("m1", "Kickoff"), None)
        .await
        .unwrap();

    let updated = meetings
        .update_meeting(fields("m1", "Kickoff (moved)"), None)
        .await
        .unwrap();
    assert_eq!(updated.record["title"], "Kickoff (moved)");
    assert_eq!(bed.network.order_calls(), 2);

    let read = meetings.read_meeting("m1").await.unwrap();
    assert_eq!(read["title"], "Kickoff (moved)");
}

#[tokio::test]
async fn exists_is_boolean_and_side_effect_free() {
    let bed = TestBed::new();
    let meetings = opened(&bed).await;

    assert!(!meetings.meeting_exists("m1").await.unwrap());
    meetings
        .create_meeting(fields("m1", "Kickoff"), None)
        .await
        .unwrap();
    assert!(meetings.meeting_exists("m1").await.unwrap());
}

#[tokio::test]
async fn concurrent_evaluates_share_the_session() {
    let bed = TestBed::new();
    let meetings = std::sync::Arc::new(opened(&bed).await);
    crate::infra::seed_meetings(&meetings, 4).await.unwrap();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let meetings = meetings.clone();
        handles.push(tokio::spawn(async move {
            meetings.list_meetings().await.unwrap()
        }));
    }
    for handle in handles {
        let all = handle.await.unwrap();
        assert_eq!(all.as_array().unwrap().len(), 4);
    }
}

#[tokio::test]
async fn pinned_request_id_survives_a_caller_retry() {
    let bed = TestBed::new();
    let meetings = opened(&bed).await;

    let first = meetings
        .create_meeting(fields("m1", "Kickoff"), Some("req-001"))
        .await
        .unwrap();
    // The caller lost the response and retries with the same request id:
    // same outcome, no second write.
    let second = meetings
        .create_meeting(fields("m1", "Kickoff"), Some("req-001"))
        .await
        .unwrap();

    assert_eq!(first.record, second.record);
    assert_eq!(bed.network.order_calls(), 1);
    assert_eq!(bed.network.record_count(), 1);
}
