//! End-to-End Payment Lifecycle Tests
//!
//! These tests verify the complete Validate → Meter → Redeem → Refund flow:
//! funds are redeemed if and only if the paid-for work actually completed,
//! with a recovery path for everything that fails partway.

use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use satstream_meter::{
    ChargeOutcome, MeterConfig, MeterError, ResumeOutcome, SessionMeter,
};
use satstream_store::{
    PaymentStore, RecoveryLog, RecoveryReason, SessionStore, SqliteRecoveryLog,
    SqliteSessionStore,
};
use satstream_test_utils::{real_token, MockWallet};
use satstream_token::encoded_amount;
use satstream_types::{PaymentStatus, ResumePayload};

// ============ TEST HARNESS ============

/// A metered session with its own wallet and in-memory store.
struct TestSession {
    meter: SessionMeter,
    wallet: MockWallet,
    conn: Arc<Mutex<Connection>>,
}

impl TestSession {
    fn new(token: Option<String>, cost: u64) -> Self {
        Self::with_wallet(token, cost, MockWallet::new())
    }

    fn with_wallet(token: Option<String>, cost: u64, wallet: MockWallet) -> Self {
        let store = PaymentStore::open_in_memory().unwrap();
        let conn = store.connection();
        let config = MeterConfig::default()
            .with_cost_per_operation(cost)
            .with_suggested_topup(100);

        let meter = SessionMeter::new(
            "thread-1",
            token,
            config,
            Arc::new(wallet.clone()),
            Box::new(store.sessions),
            Box::new(store.recovery),
        )
        .unwrap();

        Self {
            meter,
            wallet,
            conn,
        }
    }

    fn recovery_entries(&self) -> Vec<satstream_store::RecoveryEntry> {
        SqliteRecoveryLog::new(Arc::clone(&self.conn))
            .entries()
            .unwrap()
    }

    fn stored_record(&self) -> satstream_types::SessionPaymentRecord {
        SqliteSessionStore::new(Arc::clone(&self.conn))
            .get("thread-1")
            .unwrap()
            .unwrap()
    }
}

// ============ E2E SCENARIOS ============

/// Scenario 1: token worth 100, cost 10, 5 operations, session completes.
///
/// Final state: spent=50, balance=50, status=completed, refund encodes 50.
#[tokio::test]
async fn test_e2e_complete_with_remainder() {
    let token = real_token(100);
    let mut session = TestSession::new(Some(token.clone()), 10);

    for i in 0..5 {
        let outcome = session.meter.charge(&format!("llm_iteration_{}", i)).unwrap();
        assert!(matches!(outcome, ChargeOutcome::Charged { .. }));
    }

    let receipt = session.meter.finish().await.unwrap();
    assert_eq!(receipt.status, PaymentStatus::Completed);
    assert_eq!(receipt.spent, 50);
    assert_eq!(receipt.balance, 50);
    assert!(receipt.refund);
    assert_eq!(encoded_amount(receipt.refund_token.as_deref().unwrap()), Some(50));

    // The original token was redeemed exactly once; the refund was debited.
    assert_eq!(session.wallet.receives(), vec![token]);
    assert_eq!(session.wallet.sends(), vec![50]);
    assert_eq!(session.wallet.current_balance(), 50);

    // The durable record agrees with the receipt.
    let record = session.stored_record();
    assert_eq!(record.status, PaymentStatus::Completed);
    assert!(record.conservation_holds());
}

/// Scenario 2: token worth 15, cost 10, two operations attempted.
///
/// The first succeeds (balance 5); the second triggers exhaustion and the
/// funding interrupt fires with spent_so_far=10.
#[tokio::test]
async fn test_e2e_exhaustion_fires_funding_interrupt() {
    let mut session = TestSession::new(Some(real_token(15)), 10);

    assert_eq!(
        session.meter.charge("op_1").unwrap(),
        ChargeOutcome::Charged { balance: 5 }
    );

    match session.meter.charge("op_2").unwrap() {
        ChargeOutcome::Exhausted(request) => {
            assert_eq!(request.action, "request_additional_funding");
            assert_eq!(request.spent_so_far, 10);
            assert_eq!(request.suggested_amount, 100);
        }
        other => panic!("expected exhaustion, got {:?}", other),
    }

    // The suspended state is durable, ready for a resume after any delay.
    let record = session.stored_record();
    assert_eq!(record.status, PaymentStatus::Exhausted);
    assert_eq!(record.balance, 5);
    assert!(record.conservation_holds());
}

/// Scenario 3: malformed token string.
///
/// Validation fails, the session errors, and no deduction or redemption is
/// ever attempted.
#[tokio::test]
async fn test_e2e_malformed_token() {
    let mut session = TestSession::new(Some("notcashu123".to_string()), 10);

    let result = session.meter.charge("op_1");
    match result {
        Err(MeterError::Validation { reason }) => {
            assert!(reason.starts_with("Unknown token format"));
        }
        other => panic!("expected validation error, got {:?}", other),
    }

    assert_eq!(session.meter.status(), PaymentStatus::Error);
    assert_eq!(session.meter.record().spent, 0);
    assert_eq!(session.wallet.receive_count(), 0);
}

/// Scenario 4: work fails after a successful operation.
///
/// The session errors, redemption is never attempted, and the original
/// token (not a synthesized refund) is surfaced back to the caller.
#[tokio::test]
async fn test_e2e_work_fault_preserves_funds() {
    let token = real_token(100);
    let mut session = TestSession::new(Some(token.clone()), 10);

    session.meter.charge("op_1").unwrap();

    let receipt = session.meter.fail("model raised an exception").unwrap();
    assert_eq!(receipt.status, PaymentStatus::Error);
    assert!(receipt.refund);
    assert_eq!(receipt.refund_token.as_deref(), Some(token.as_str()));
    assert_eq!(receipt.returned_tokens, vec![token.clone()]);

    // No redemption ever happened.
    assert_eq!(session.wallet.receive_count(), 0);
    assert_eq!(session.wallet.current_balance(), 0);

    // The returned token is on record for operator cross-checking.
    let entries = session.recovery_entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].reason, RecoveryReason::WorkFailed);
    assert_eq!(entries[0].token, token);
}

/// Scenario 5: work succeeds but the wallet service is unreachable.
///
/// The user still sees success; the full unredeemed token text lands in the
/// operator recovery log.
#[tokio::test]
async fn test_e2e_redemption_fault_goes_to_recovery_log() {
    let token = real_token(100);
    let mut session = TestSession::with_wallet(Some(token.clone()), 10, MockWallet::offline());

    for _ in 0..3 {
        session.meter.charge("op").unwrap();
    }

    let receipt = session.meter.finish().await.unwrap();
    // Settlement failed, the work did not: the user-visible outcome is
    // success.
    assert_eq!(receipt.status, PaymentStatus::Completed);
    assert_eq!(receipt.spent, 30);

    let entries = session.recovery_entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].reason, RecoveryReason::RedemptionFailed);
    // Full token text, not a preview - partial text cannot recover funds.
    assert_eq!(entries[0].token, token);
    assert_eq!(entries[0].amount, Some(100));
}

// ============ INVARIANTS ============

/// Conservation: spent + balance == face_value + topups after every
/// operation, across charges, exhaustion, and top-ups.
#[tokio::test]
async fn test_invariant_conservation() {
    let mut session = TestSession::new(Some(real_token(25)), 10);

    loop {
        match session.meter.charge("op").unwrap() {
            ChargeOutcome::Charged { .. } => {
                assert!(session.meter.record().conservation_holds());
            }
            ChargeOutcome::Exhausted(_) => break,
            ChargeOutcome::Unmetered => unreachable!("session is metered"),
        }
    }
    assert!(session.meter.record().conservation_holds());

    session
        .meter
        .resume(ResumePayload::Approve {
            token: real_token(40),
        })
        .unwrap();
    assert!(session.meter.record().conservation_holds());

    let receipt = session.meter.finish().await.unwrap();
    assert_eq!(receipt.spent + receipt.balance, 25 + 40);
}

/// Each token is presented for redemption at most once, even when finalize
/// is re-run.
#[tokio::test]
async fn test_invariant_redeem_at_most_once() {
    let mut session = TestSession::new(Some(real_token(30)), 10);
    session.meter.charge("op").unwrap();

    session.meter.finish().await.unwrap();
    session.meter.finish().await.unwrap();
    session.meter.finish().await.unwrap();

    assert_eq!(session.wallet.receive_count(), 1);
}

/// Re-running finalize does not mint a second refund token.
#[tokio::test]
async fn test_invariant_finalize_idempotent() {
    let mut session = TestSession::new(Some(real_token(100)), 10);
    session.meter.charge("op").unwrap();

    let first = session.meter.finish().await.unwrap();
    let second = session.meter.finish().await.unwrap();
    assert_eq!(first.refund_token, second.refund_token);
    assert_eq!(session.wallet.sends(), vec![90]);
}

/// A session ending in error never redeemed anything.
#[tokio::test]
async fn test_invariant_error_means_no_redemption() {
    let mut session = TestSession::new(Some(real_token(50)), 10);
    session.meter.charge("op").unwrap();
    session.meter.charge("op").unwrap();
    session.meter.fail("boom").unwrap();

    // Even a finalize after the failure moves no funds.
    let receipt = session.meter.finish().await.unwrap();
    assert_eq!(receipt.status, PaymentStatus::Error);
    assert_eq!(session.wallet.receive_count(), 0);
}

// ============ BOUNDARY BEHAVIORS ============

/// No token at all: the session runs unmetered and finalize produces no
/// refund token.
#[tokio::test]
async fn test_boundary_free_mode() {
    let store = PaymentStore::open_in_memory().unwrap();
    let wallet = MockWallet::new();
    let config = MeterConfig::development().with_cost_per_operation(10);

    let mut meter = SessionMeter::new(
        "thread-1",
        None,
        config,
        Arc::new(wallet.clone()),
        Box::new(store.sessions),
        Box::new(store.recovery),
    )
    .unwrap();

    for _ in 0..50 {
        assert_eq!(meter.charge("op").unwrap(), ChargeOutcome::Unmetered);
    }
    assert_eq!(meter.status(), PaymentStatus::Active);

    let receipt = meter.finish().await.unwrap();
    assert_eq!(receipt.status, PaymentStatus::Completed);
    assert!(!receipt.refund);
    assert!(receipt.refund_token.is_none());
    assert_eq!(wallet.receive_count(), 0);
}

/// A token worth exactly one operation: one charge succeeds, the next
/// exhausts.
#[tokio::test]
async fn test_boundary_exact_single_operation() {
    let mut session = TestSession::new(Some(real_token(10)), 10);

    assert_eq!(
        session.meter.charge("op").unwrap(),
        ChargeOutcome::Charged { balance: 0 }
    );
    assert!(matches!(
        session.meter.charge("op").unwrap(),
        ChargeOutcome::Exhausted(_)
    ));
}

/// Repeated exhaustion: the suspend/resume cycle has no top-up limit.
#[tokio::test]
async fn test_boundary_repeated_topups() {
    let mut session = TestSession::new(Some(real_token(10)), 10);

    for round in 0..4u64 {
        session.meter.charge("op").unwrap();
        let ChargeOutcome::Exhausted(request) = session.meter.charge("op").unwrap() else {
            panic!("expected exhaustion in round {}", round);
        };
        assert_eq!(request.spent_so_far, 10 * (round + 1));

        let outcome = session
            .meter
            .resume(ResumePayload::Approve {
                token: real_token(10),
            })
            .unwrap();
        assert_eq!(outcome, ResumeOutcome::Resumed { balance: 10 });
    }

    let receipt = session.meter.finish().await.unwrap();
    assert_eq!(receipt.spent, 50);
    assert_eq!(receipt.balance, 0);
    // Original plus four top-ups, each redeemed once.
    assert_eq!(session.wallet.receive_count(), 5);
}

/// An edited funding approval adjusts the suggestion but still needs its
/// token to resume.
#[tokio::test]
async fn test_boundary_edited_resume() {
    let mut session = TestSession::new(Some(real_token(10)), 10);
    session.meter.charge("op").unwrap();
    session.meter.charge("op").unwrap();

    let outcome = session
        .meter
        .resume(ResumePayload::Edit {
            suggested_amount: 250,
            token: real_token(250),
        })
        .unwrap();
    assert_eq!(outcome, ResumeOutcome::Resumed { balance: 250 });
}

/// Abandoned session: no terminal call ever happens. The stored record
/// stays recoverable and the original token was never redeemed.
#[tokio::test]
async fn test_boundary_abandoned_session_is_recoverable() {
    let token = real_token(40);
    let session = {
        let mut s = TestSession::new(Some(token.clone()), 10);
        s.meter.charge("op").unwrap();
        s
        // Client disconnects here; nobody calls finish() or fail().
    };

    let record = session.stored_record();
    assert_eq!(record.status, PaymentStatus::Active);
    assert_eq!(record.original_token.as_deref(), Some(token.as_str()));
    assert_eq!(session.wallet.receive_count(), 0);
}

/// Refund claim flow: generated, unclaimed, then re-claimed on reconnect.
#[tokio::test]
async fn test_boundary_refund_claim_on_reconnect() {
    let mut session = TestSession::new(Some(real_token(100)), 10);
    session.meter.charge("op").unwrap();
    let receipt = session.meter.finish().await.unwrap();
    assert!(!session.stored_record().refund_claimed);

    let claimed = session.meter.claim_refund().unwrap();
    assert_eq!(claimed, receipt.refund_token);
    assert_eq!(session.meter.status(), PaymentStatus::Refunded);

    // A reconnecting client claims again and gets the same artifact.
    let reclaimed = session.meter.claim_refund().unwrap();
    assert_eq!(reclaimed, claimed);
}
