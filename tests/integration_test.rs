//! Integration Tests - End-to-end Onboarding Session Testing
//!
//! Drives `OnboardingSession` against mocked chain and signing ports
//! and an in-memory latch store. Uses mockall for trait mocking and
//! tokio::test (with a paused clock where backoff or deadlines matter).

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::{address, Address, TxHash, B256, U256};
use mockall::mock;
use tokio_test::{assert_err, assert_ok};

use onchain_kyc_tracker::adapters::metrics::TrackerMetrics;
use onchain_kyc_tracker::adapters::persistence::MemoryLatchStore;
use onchain_kyc_tracker::config::loader::parse_config;
use onchain_kyc_tracker::config::AppConfig;
use onchain_kyc_tracker::domain::claim::{ClaimRecord, ClaimSignature, SignedClaim};
use onchain_kyc_tracker::domain::error::{SigningError, StepError};
use onchain_kyc_tracker::domain::identity::Latch;
use onchain_kyc_tracker::domain::progress::{Action, ProgressStage};
use onchain_kyc_tracker::ports::chain_client::{ClaimSubmission, TxReceipt};
use onchain_kyc_tracker::ports::latch_store::LatchStore;
use onchain_kyc_tracker::ports::signing_service::{SignatureRequest, SigningService};
use onchain_kyc_tracker::usecases::claim_writer::ClaimWriteStatus;
use onchain_kyc_tracker::usecases::signature_requester::SignatureRequester;
use onchain_kyc_tracker::usecases::OnboardingSession;

// ---- Mock Definitions ----

mock! {
    pub Chain {}

    #[async_trait::async_trait]
    impl onchain_kyc_tracker::ports::chain_client::IdentityChain for Chain {
        async fn get_identity(&self, wallet: Address) -> anyhow::Result<Address>;
        async fn get_claim(&self, identity: Address, claim_id: B256) -> anyhow::Result<ClaimRecord>;
        async fn deploy_identity(&self, wallet: Address) -> anyhow::Result<TxHash>;
        async fn add_claim(
            &self,
            identity: Address,
            submission: &ClaimSubmission,
        ) -> anyhow::Result<TxHash>;
        async fn transaction_receipt(&self, tx_hash: TxHash) -> anyhow::Result<Option<TxReceipt>>;
        async fn is_healthy(&self) -> bool;
    }
}

mock! {
    pub Signer {}

    #[async_trait::async_trait]
    impl SigningService for Signer {
        async fn request_signature(
            &self,
            request: &SignatureRequest,
        ) -> Result<SignedClaim, SigningError>;
    }
}

/// Signing service that answers after a fixed delay.
struct SlowSigner {
    delay: Duration,
}

#[async_trait::async_trait]
impl SigningService for SlowSigner {
    async fn request_signature(
        &self,
        request: &SignatureRequest,
    ) -> Result<SignedClaim, SigningError> {
        tokio::time::sleep(self.delay).await;
        Ok(signed(request.topic))
    }
}

// ---- Fixtures ----

const WALLET: Address = address!("1111111111111111111111111111111111111111");
const IDENTITY: Address = address!("2222222222222222222222222222222222222222");
const ISSUER: Address = address!("3333333333333333333333333333333333333333");

fn config() -> AppConfig {
    parse_config(
        r#"
[service]
name = "kyc-tracker-it"

[chain]
rpc_url = "http://localhost:8545"
chain_id = 31337
identity_factory = "0x4444444444444444444444444444444444444444"
identity_gateway = "0x5555555555555555555555555555555555555555"
receipt_poll_interval_ms = 500
receipt_timeout_secs = 60

[kyc]
issuer_address = "0x3333333333333333333333333333333333333333"
country_code = "DE"

[signing]
base_url = "http://localhost:3001"
"#,
    )
    .expect("test config parses")
}

fn signed(topic: u64) -> SignedClaim {
    SignedClaim {
        topic,
        issuer: ISSUER,
        data_hash: B256::repeat_byte(0xaa),
        signature: ClaimSignature {
            r: B256::repeat_byte(1),
            s: B256::repeat_byte(2),
            v: 27,
        },
    }
}

fn kyc_record(issuer: Address) -> ClaimRecord {
    ClaimRecord {
        topic: U256::from(1),
        scheme: U256::from(1),
        issuer,
        ..ClaimRecord::default()
    }
}

fn mined(tx_hash: TxHash, success: bool) -> Option<TxReceipt> {
    Some(TxReceipt {
        tx_hash,
        block_number: Some(7),
        success,
    })
}

fn session<S: SigningService>(
    chain: MockChain,
    signer: S,
    latches: Arc<MemoryLatchStore>,
) -> Arc<OnboardingSession<MockChain, S, MemoryLatchStore>> {
    Arc::new(OnboardingSession::new(
        Arc::new(chain),
        Arc::new(signer),
        latches,
        &config(),
        Arc::new(TrackerMetrics::new().expect("metrics register")),
    ))
}

/// Chain with an identity and no claim yet.
fn chain_with_identity() -> MockChain {
    let mut chain = MockChain::new();
    chain.expect_get_identity().returning(|_| Ok(IDENTITY));
    chain
        .expect_get_claim()
        .returning(|_, _| Ok(ClaimRecord::default()));
    chain
}

// ---- Integration Tests ----

#[tokio::test]
async fn test_connect_without_identity_stops_at_identity_pending() {
    let mut chain = MockChain::new();
    chain.expect_get_identity().returning(|_| Ok(Address::ZERO));
    chain.expect_get_claim().never();
    chain.expect_deploy_identity().never();
    chain.expect_add_claim().never();

    let session = session(chain, MockSigner::new(), Arc::new(MemoryLatchStore::new()));

    assert_eq!(session.snapshot().stage, ProgressStage::WalletDisconnected);
    let snap = session.connect(WALLET).await;
    assert_eq!(snap.stage, ProgressStage::IdentityPending);
    assert_eq!(snap.step, 2);
    assert_eq!(snap.available_actions, vec![Action::DeployIdentity]);

    for _ in 0..3 {
        let snap = session.refresh().await;
        assert_eq!(snap.stage, ProgressStage::IdentityPending);
    }
}

#[tokio::test(start_paused = true)]
async fn test_deployment_settles_into_kyc_pending() {
    let lookups = Arc::new(AtomicUsize::new(0));
    let deploy_tx = TxHash::repeat_byte(0xd1);

    let mut chain = MockChain::new();
    let counter = Arc::clone(&lookups);
    // Connect refresh and the first settling read still see the old state.
    chain.expect_get_identity().returning(move |_| {
        let n = counter.fetch_add(1, Ordering::SeqCst);
        Ok(if n < 2 { Address::ZERO } else { IDENTITY })
    });
    chain
        .expect_deploy_identity()
        .times(1)
        .returning(move |_| Ok(deploy_tx));
    chain
        .expect_transaction_receipt()
        .returning(|tx| Ok(mined(tx, true)));
    chain
        .expect_get_claim()
        .returning(|_, _| Ok(ClaimRecord::default()));

    let latches = Arc::new(MemoryLatchStore::new());
    let session = session(chain, MockSigner::new(), Arc::clone(&latches));
    session.connect(WALLET).await;

    let snap = assert_ok!(session.deploy_identity().await);
    assert_eq!(snap.stage, ProgressStage::KycPending);
    assert_eq!(snap.identity, Some(IDENTITY));
    assert_eq!(snap.available_actions, vec![Action::RequestSignature]);
    assert!(lookups.load(Ordering::SeqCst) >= 3);
    assert!(latches
        .get(&Latch::EverHadIdentity.key(&WALLET))
        .await
        .unwrap());
}

#[tokio::test(start_paused = true)]
async fn test_deployment_never_visible_reports_not_yet_visible() {
    let mut chain = MockChain::new();
    chain.expect_get_identity().returning(|_| Ok(Address::ZERO));
    chain
        .expect_deploy_identity()
        .times(1)
        .returning(|_| Ok(TxHash::repeat_byte(1)));
    chain
        .expect_transaction_receipt()
        .returning(|tx| Ok(mined(tx, true)));

    let latches = Arc::new(MemoryLatchStore::new());
    let session = session(chain, MockSigner::new(), latches.clone());
    session.connect(WALLET).await;

    let err = assert_err!(session.deploy_identity().await);
    assert_eq!(err, StepError::NotYetVisible("identity"));
    let snap = session.snapshot();
    assert_eq!(snap.stage, ProgressStage::IdentityPending);
    assert!(snap.action_errors.contains_key(&Action::DeployIdentity));

    // The confirmed deployment is latched, so it is never sent twice.
    assert!(snap.ever_had_identity);
    assert!(snap.available_actions.is_empty());
    assert!(latches
        .get(&Latch::EverHadIdentity.key(&WALLET))
        .await
        .unwrap());
    let err = assert_err!(session.deploy_identity().await);
    assert_eq!(
        err,
        StepError::NotAvailable {
            action: Action::DeployIdentity
        }
    );
    assert!(session.advance().await.is_none());
}

#[tokio::test]
async fn test_existing_valid_claim_completes_without_writing() {
    let mut chain = MockChain::new();
    chain.expect_get_identity().returning(|_| Ok(IDENTITY));
    chain
        .expect_get_claim()
        .returning(|_, _| Ok(kyc_record(ISSUER)));
    chain.expect_add_claim().never();
    chain.expect_deploy_identity().never();

    let session = session(chain, MockSigner::new(), Arc::new(MemoryLatchStore::new()));
    let snap = session.connect(WALLET).await;

    assert_eq!(snap.stage, ProgressStage::Complete);
    assert_eq!(snap.percent, 100);
    assert_eq!(snap.step, 4);
    assert!(snap.available_actions.is_empty());
    assert_eq!(snap.claim_write, ClaimWriteStatus::Idle);
}

#[tokio::test]
async fn test_complete_survives_stale_reads_on_later_loads() {
    let latches = Arc::new(MemoryLatchStore::new());

    let mut chain = MockChain::new();
    chain.expect_get_identity().returning(|_| Ok(IDENTITY));
    chain
        .expect_get_claim()
        .returning(|_, _| Ok(kyc_record(ISSUER)));
    let first = session(chain, MockSigner::new(), Arc::clone(&latches));
    assert_eq!(first.connect(WALLET).await.stage, ProgressStage::Complete);

    // A lagging node answers as if nothing was ever written.
    let mut stale = MockChain::new();
    stale.expect_get_identity().returning(|_| Ok(Address::ZERO));
    stale
        .expect_get_claim()
        .returning(|_, _| Ok(ClaimRecord::default()));
    let second = session(stale, MockSigner::new(), latches);

    assert_eq!(second.connect(WALLET).await.stage, ProgressStage::Complete);
    for _ in 0..3 {
        assert_eq!(second.refresh().await.stage, ProgressStage::Complete);
    }
}

#[tokio::test]
async fn test_zero_issuer_claim_is_never_valid() {
    let mut chain = MockChain::new();
    chain.expect_get_identity().returning(|_| Ok(IDENTITY));
    chain
        .expect_get_claim()
        .returning(|_, _| Ok(kyc_record(Address::ZERO)));

    let session = session(chain, MockSigner::new(), Arc::new(MemoryLatchStore::new()));
    let snap = session.connect(WALLET).await;
    assert_eq!(snap.stage, ProgressStage::KycPending);
}

#[tokio::test]
async fn test_foreign_issuer_claim_is_not_kyc() {
    let mut chain = MockChain::new();
    chain.expect_get_identity().returning(|_| Ok(IDENTITY));
    chain.expect_get_claim().returning(|_, _| {
        Ok(kyc_record(address!("9999999999999999999999999999999999999999")))
    });

    let session = session(chain, MockSigner::new(), Arc::new(MemoryLatchStore::new()));
    assert_eq!(session.connect(WALLET).await.stage, ProgressStage::KycPending);
}

#[tokio::test]
async fn test_signature_requests_never_touch_chain() {
    let mut chain = chain_with_identity();
    chain.expect_add_claim().never();
    chain.expect_deploy_identity().never();

    let mut signer = MockSigner::new();
    signer
        .expect_request_signature()
        .times(3)
        .returning(|req| Ok(signed(req.topic)));
    let signer = Arc::new(signer);

    let requester = SignatureRequester::new(
        Arc::clone(&signer),
        &config().kyc,
        config().signing.timeout(),
    );
    let a = assert_ok!(requester.request(WALLET, IDENTITY).await);
    let b = assert_ok!(requester.request(WALLET, IDENTITY).await);
    assert_eq!(a, b);

    let session = Arc::new(OnboardingSession::new(
        Arc::new(chain),
        signer,
        Arc::new(MemoryLatchStore::new()),
        &config(),
        Arc::new(TrackerMetrics::new().unwrap()),
    ));
    session.connect(WALLET).await;
    let snap = assert_ok!(session.request_signature().await);
    assert_eq!(snap.stage, ProgressStage::ClaimPending);
    assert_eq!(snap.percent, 75);
    assert_eq!(snap.available_actions, vec![Action::SubmitClaim]);
}

#[tokio::test(start_paused = true)]
async fn test_signing_timeout_keeps_kyc_pending_and_allows_retry() {
    let session = session(
        chain_with_identity(),
        SlowSigner {
            delay: Duration::from_secs(31),
        },
        Arc::new(MemoryLatchStore::new()),
    );
    session.connect(WALLET).await;

    let err = assert_err!(session.request_signature().await);
    assert_eq!(err.to_string(), "Request timed out");

    let snap = session.snapshot();
    assert_eq!(snap.stage, ProgressStage::KycPending);
    assert_eq!(snap.in_flight, None);
    assert_eq!(
        snap.action_errors.get(&Action::RequestSignature).map(String::as_str),
        Some("Request timed out")
    );
    assert!(snap.available_actions.contains(&Action::RequestSignature));

    // Automatic advancing does not retry a failed action.
    assert!(session.advance().await.is_none());
}

#[tokio::test]
async fn test_signing_rejection_keeps_kyc_pending_with_error() {
    let mut signer = MockSigner::new();
    signer.expect_request_signature().times(1).returning(|_| {
        Err(SigningError::Status {
            status: 500,
            message: "kyc not approved".to_string(),
        })
    });
    let session = session(
        chain_with_identity(),
        signer,
        Arc::new(MemoryLatchStore::new()),
    );
    session.connect(WALLET).await;

    let err = assert_err!(session.request_signature().await);
    assert!(matches!(
        err,
        StepError::Signing(SigningError::Status { status: 500, .. })
    ));

    let snap = session.snapshot();
    assert_eq!(snap.stage, ProgressStage::KycPending);
    assert_eq!(
        snap.action_errors.get(&Action::RequestSignature).map(String::as_str),
        Some("signing service returned 500: kyc not approved")
    );
    assert_eq!(snap.available_actions, vec![Action::RequestSignature]);
}

#[tokio::test(start_paused = true)]
async fn test_claim_submission_confirms_through_claim_read() {
    let claimed = Arc::new(AtomicUsize::new(0));
    let claim_tx = TxHash::repeat_byte(0xc1);

    let mut chain = MockChain::new();
    chain.expect_get_identity().returning(|_| Ok(IDENTITY));
    let reads = Arc::clone(&claimed);
    chain.expect_get_claim().returning(move |_, _| {
        Ok(if reads.load(Ordering::SeqCst) > 0 {
            kyc_record(ISSUER)
        } else {
            ClaimRecord::default()
        })
    });
    let writes = Arc::clone(&claimed);
    chain
        .expect_add_claim()
        .times(1)
        .withf(|identity, submission| {
            *identity == IDENTITY
                && submission.scheme == 1
                && submission.topic == 1
                && submission.signature.len() == 65
                && submission.uri.is_empty()
        })
        .returning(move |_, _| {
            writes.fetch_add(1, Ordering::SeqCst);
            Ok(claim_tx)
        });
    chain
        .expect_transaction_receipt()
        .returning(|tx| Ok(mined(tx, true)));

    let mut signer = MockSigner::new();
    signer
        .expect_request_signature()
        .returning(|req| Ok(signed(req.topic)));

    let latches = Arc::new(MemoryLatchStore::new());
    let session = session(chain, signer, Arc::clone(&latches));
    session.connect(WALLET).await;
    assert_ok!(session.request_signature().await);

    let snap = assert_ok!(session.submit_claim().await);
    assert_eq!(snap.stage, ProgressStage::Complete);
    assert_eq!(
        snap.claim_write,
        ClaimWriteStatus::Confirmed {
            tx_hash: claim_tx,
            block: Some(7)
        }
    );
    assert!(latches
        .get(&Latch::EverCompletedKyc.key(&WALLET))
        .await
        .unwrap());
}

#[tokio::test(start_paused = true)]
async fn test_reverted_claim_reopens_submission() {
    let mut chain = chain_with_identity();
    chain
        .expect_add_claim()
        .returning(|_, _| Ok(TxHash::repeat_byte(0xee)));
    chain
        .expect_transaction_receipt()
        .returning(|tx| Ok(mined(tx, false)));

    let mut signer = MockSigner::new();
    signer
        .expect_request_signature()
        .returning(|req| Ok(signed(req.topic)));

    let session = session(chain, signer, Arc::new(MemoryLatchStore::new()));
    session.connect(WALLET).await;
    assert_ok!(session.request_signature().await);

    let err = assert_err!(session.submit_claim().await);
    assert!(matches!(err, StepError::Reverted { .. }));

    let snap = session.snapshot();
    assert_eq!(snap.stage, ProgressStage::ClaimPending);
    assert!(snap.available_actions.contains(&Action::SubmitClaim));
    assert!(matches!(snap.claim_write, ClaimWriteStatus::Reverted { .. }));
}

#[tokio::test(start_paused = true)]
async fn test_second_action_while_pending_is_busy() {
    let mut chain = MockChain::new();
    chain.expect_get_identity().returning(|_| Ok(Address::ZERO));
    chain
        .expect_deploy_identity()
        .times(1)
        .returning(|_| Ok(TxHash::repeat_byte(2)));
    // Never mined: the deployment stays in flight until the receipt deadline.
    chain.expect_transaction_receipt().returning(|_| Ok(None));

    let session = session(chain, MockSigner::new(), Arc::new(MemoryLatchStore::new()));
    session.connect(WALLET).await;

    let running = Arc::clone(&session);
    let handle = tokio::spawn(async move { running.deploy_identity().await });
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(session.snapshot().in_flight, Some(Action::DeployIdentity));
    assert_eq!(session.deploy_identity().await.unwrap_err(), StepError::Busy);
    assert_eq!(session.refresh().await.stage, ProgressStage::IdentityPending);

    let result = handle.await.expect("deploy task");
    assert!(matches!(result, Err(StepError::Transaction(_))));
    assert_eq!(session.snapshot().in_flight, None);
}

#[tokio::test]
async fn test_read_failure_is_recorded_and_cleared() {
    let failures = Arc::new(AtomicUsize::new(0));
    let mut chain = MockChain::new();
    let counter = Arc::clone(&failures);
    chain.expect_get_identity().returning(move |_| {
        if counter.fetch_add(1, Ordering::SeqCst) == 0 {
            anyhow::bail!("connection refused")
        }
        Ok(IDENTITY)
    });
    chain
        .expect_get_claim()
        .returning(|_, _| Ok(ClaimRecord::default()));

    let session = session(chain, MockSigner::new(), Arc::new(MemoryLatchStore::new()));
    let snap = session.connect(WALLET).await;
    assert_eq!(snap.stage, ProgressStage::IdentityPending);
    assert!(snap
        .read_error
        .as_deref()
        .is_some_and(|e| e.contains("connection refused")));

    let snap = session.refresh().await;
    assert_eq!(snap.stage, ProgressStage::KycPending);
    assert_eq!(snap.read_error, None);
}

#[tokio::test]
async fn test_disconnect_resets_session() {
    let session = session(
        chain_with_identity(),
        MockSigner::new(),
        Arc::new(MemoryLatchStore::new()),
    );
    session.connect(WALLET).await;
    let snap = session.disconnect().await;
    assert_eq!(snap.stage, ProgressStage::WalletDisconnected);
    assert_eq!(snap.wallet, None);
    assert_eq!(
        session.request_signature().await.unwrap_err(),
        StepError::NotAvailable {
            action: Action::RequestSignature
        }
    );
}
