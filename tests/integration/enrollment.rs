//! Enrollment scenarios: admin bootstrap, user registration, idempotency,
//! and the CA error taxonomy.

use crate::infra::TestBed;
use convene_ledger::ClientError;

#[tokio::test]
async fn enroll_admin_stores_identity_under_admin_label() {
    let bed = TestBed::new();
    bed.client.enroll_admin().await.unwrap();

    assert!(bed.client.wallet().exists("admin"));
    assert_eq!(bed.ca.enroll_calls(), 1);
}

#[tokio::test]
async fn repeated_admin_enrollment_never_recontacts_the_ca() {
    let bed = TestBed::new();
    bed.client.enroll_admin().await.unwrap();
    bed.client.enroll_admin().await.unwrap();
    bed.client.enroll_admin().await.unwrap();

    // Re-issuing a certificate for an already-enrolled identity would
    // invalidate in-flight sessions; the repeat calls must not reach the CA.
    assert_eq!(bed.ca.enroll_calls(), 1);
}

#[tokio::test]
async fn user_enrollment_registers_then_enrolls() {
    let bed = TestBed::new();
    bed.client.enroll_admin().await.unwrap();
    bed.client.enroll_user("appUser").await.unwrap();

    assert!(bed.client.wallet().exists("appUser"));
    assert_eq!(bed.ca.register_calls(), 1);
    // Admin enrollment plus the user's enrollment with the one-time secret.
    assert_eq!(bed.ca.enroll_calls(), 2);

    // Idempotent: nothing further happens for a known label.
    bed.client.enroll_user("appUser").await.unwrap();
    assert_eq!(bed.ca.register_calls(), 1);
    assert_eq!(bed.ca.enroll_calls(), 2);
}

#[tokio::test]
async fn user_enrollment_without_admin_fails_with_no_ca_traffic() {
    let bed = TestBed::new();
    let err = bed.client.enroll_user("appUser").await.unwrap_err();

    assert_eq!(err.kind(), "admin-not-enrolled");
    assert_eq!(bed.ca.enroll_calls(), 0);
    assert_eq!(bed.ca.register_calls(), 0);
}

#[tokio::test]
async fn unreachable_ca_is_retry_safe_kind() {
    let bed = TestBed::new();
    bed.ca.set_down(true);

    let err = bed.client.enroll_admin().await.unwrap_err();
    assert_eq!(err.kind(), "ca-unreachable");
    assert!(!bed.client.wallet().exists("admin"));

    // The CA comes back; the same call now succeeds.
    bed.ca.set_down(false);
    bed.client.enroll_admin().await.unwrap();
    assert!(bed.client.wallet().exists("admin"));
}

#[tokio::test]
async fn duplicate_registration_at_the_ca_surfaces_divergence() {
    let bed = TestBed::new();
    bed.client.enroll_admin().await.unwrap();
    bed.client.enroll_user("appUser").await.unwrap();

    // Drop the local copy while the CA still knows the label — the state
    // divergence the error taxonomy insists on surfacing.
    bed.client.wallet().remove("appUser").unwrap();
    let err = bed.client.enroll_user("appUser").await.unwrap_err();
    assert_eq!(err.kind(), "registration-denied");
}

#[tokio::test]
async fn wallet_clear_recovers_from_ca_restart() {
    let bed = TestBed::new();
    bed.client.enroll_admin().await.unwrap();
    bed.client.enroll_user("appUser").await.unwrap();

    // CA restarts: its registrations are gone, our certificates are stale.
    bed.ca.restart();

    // The documented remedy: clear the wallet, then re-enroll everything.
    bed.client.wallet().clear().unwrap();
    assert!(!bed.client.wallet().exists("admin"));

    bed.client.enroll_admin().await.unwrap();
    bed.client.enroll_user("appUser").await.unwrap();
    assert!(bed.client.wallet().exists("appUser"));
}

#[tokio::test]
async fn identity_not_found_error_names_the_remedy() {
    let bed = TestBed::new();
    let err = bed.client.open_meetings("appUser").await.unwrap_err();

    assert_eq!(err.kind(), "identity-not-found");
    let message = err.to_string();
    assert!(message.contains("re-run enrollment"));
    assert!(message.contains("clear the wallet"));
}

#[tokio::test]
async fn error_kind_is_stable_across_flattening() {
    let bed = TestBed::new();
    let err: ClientError = bed.client.enroll_user("appUser").await.unwrap_err();
    // Kind, not message text, is the contract with the API layer.
    assert_eq!(err.kind(), "admin-not-enrolled");
    assert!(!err.to_string().is_empty());
}
