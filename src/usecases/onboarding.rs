//! Onboarding Session - Orchestrates One Wallet's KYC Flow
//!
//! Owns the progress tracker for the connected wallet and runs the
//! three user actions (deploy identity, request signature, submit
//! claim) against the readers and the claim writer.
//!
//! Rules enforced here:
//! 1. At most one action in flight; a second one fails with `Busy`
//! 2. Actions are gated on the current stage
//! 3. Failures are recorded per action and never retried automatically
//! 4. Read failures are non-fatal and retried on the next poll
//! 5. `Complete` is only entered from a valid claim read
//!
//! The session lock is never held across RPC or signing calls, so
//! `/progress` stays responsive while a transaction is pending.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use std::time::{Duration, Instant};

use alloy::primitives::Address;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{broadcast, watch, Mutex};
use tracing::{debug, error, info, instrument, warn};

use super::backoff::ReadBackoff;
use super::claim_reader::ClaimReader;
use super::claim_writer::{ClaimWriteStatus, ClaimWriter};
use super::identity_reader::IdentityReader;
use super::progress_tracker::{ProgressTracker, Transition};
use super::signature_requester::SignatureRequester;
use super::transaction_monitor::{TransactionMonitor, TxOutcome};
use crate::adapters::metrics::TrackerMetrics;
use crate::config::AppConfig;
use crate::domain::error::StepError;
use crate::domain::identity::WalletAddress;
use crate::domain::progress::{Action, ProgressEvent, ProgressStage, ProgressState};
use crate::ports::chain_client::IdentityChain;
use crate::ports::latch_store::LatchStore;
use crate::ports::signing_service::SigningService;

/// Point-in-time view of the session, served on `/progress`.
#[derive(Debug, Clone, Serialize)]
pub struct ProgressSnapshot {
  pub wallet: Option<Address>,
  pub identity: Option<Address>,
  pub stage: ProgressStage,
  pub step: u8,
  pub percent: u8,
  pub ever_had_identity: bool,
  /// Actions offered in the current stage.
  pub available_actions: Vec<Action>,
  pub in_flight: Option<Action>,
  /// Last failure per action, cleared when the action is retried.
  pub action_errors: BTreeMap<Action, String>,
  /// Last read failure, cleared by the next successful refresh.
  pub read_error: Option<String>,
  pub claim_write: ClaimWriteStatus,
  pub state: ProgressState,
  pub updated_at: DateTime<Utc>,
}

impl Default for ProgressSnapshot {
  fn default() -> Self {
    let stage = ProgressStage::WalletDisconnected;
    Self {
      wallet: None,
      identity: None,
      stage,
      step: stage.step(),
      percent: stage.percent(),
      ever_had_identity: false,
      available_actions: Vec::new(),
      in_flight: None,
      action_errors: BTreeMap::new(),
      read_error: None,
      claim_write: ClaimWriteStatus::Idle,
      state: ProgressState::WalletDisconnected,
      updated_at: Utc::now(),
    }
  }
}

struct SessionInner<L: LatchStore> {
  tracker: ProgressTracker<L>,
  action_errors: BTreeMap<Action, String>,
  read_error: Option<String>,
}

/// Releases the in-flight slot on drop.
struct InFlightGuard<'a> {
  slot: &'a StdMutex<Option<Action>>,
}

impl Drop for InFlightGuard<'_> {
  fn drop(&mut self) {
    *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = None;
  }
}

/// One wallet session over the chain, signing and latch ports.
pub struct OnboardingSession<C: IdentityChain, S: SigningService, L: LatchStore> {
  chain: Arc<C>,
  identity_reader: IdentityReader<C>,
  claim_reader: ClaimReader<C>,
  requester: SignatureRequester<S>,
  writer: ClaimWriter<C>,
  monitor: Arc<TransactionMonitor<C>>,
  inner: Mutex<SessionInner<L>>,
  in_flight: StdMutex<Option<Action>>,
  metrics: Arc<TrackerMetrics>,
  snapshot_tx: watch::Sender<ProgressSnapshot>,
}

impl<C: IdentityChain, S: SigningService, L: LatchStore> OnboardingSession<C, S, L> {
  pub fn new(
    chain: Arc<C>,
    signer: Arc<S>,
    latches: Arc<L>,
    config: &AppConfig,
    metrics: Arc<TrackerMetrics>,
  ) -> Self {
    let backoff = ReadBackoff::from(&config.settlement);
    let monitor = Arc::new(TransactionMonitor::new(
      Arc::clone(&chain),
      config.chain.receipt_poll_interval(),
      config.chain.receipt_timeout(),
    ));
    let (snapshot_tx, _) = watch::channel(ProgressSnapshot::default());

    Self {
      identity_reader: IdentityReader::new(Arc::clone(&chain), backoff),
      claim_reader: ClaimReader::new(
        Arc::clone(&chain),
        config.kyc.issuer_address,
        config.kyc.topic,
        backoff,
      ),
      requester: SignatureRequester::new(signer, &config.kyc, config.signing.timeout()),
      writer: ClaimWriter::new(Arc::clone(&chain), Arc::clone(&monitor), config.kyc.scheme),
      monitor,
      chain,
      inner: Mutex::new(SessionInner {
        tracker: ProgressTracker::new(latches),
        action_errors: BTreeMap::new(),
        read_error: None,
      }),
      in_flight: StdMutex::new(None),
      metrics,
      snapshot_tx,
    }
  }

  /// Latest published snapshot.
  pub fn snapshot(&self) -> ProgressSnapshot {
    self.snapshot_tx.borrow().clone()
  }

  pub fn subscribe(&self) -> watch::Receiver<ProgressSnapshot> {
    self.snapshot_tx.subscribe()
  }

  // ── Session lifecycle ───────────────────────────────────

  /// Connect `wallet`, load its latches and run a first refresh.
  #[instrument(skip(self))]
  pub async fn connect(&self, wallet: WalletAddress) -> ProgressSnapshot {
    {
      let mut inner = self.inner.lock().await;
      if !inner.tracker.is_current(wallet) {
        inner.action_errors.clear();
        inner.read_error = None;
        self.writer.reset();
      }
      let t = inner.tracker.connect(wallet).await;
      self.record(t);
      self.publish(&inner);
    }
    info!("Wallet connected");
    self.refresh().await
  }

  #[instrument(skip(self))]
  pub async fn disconnect(&self) -> ProgressSnapshot {
    let mut inner = self.inner.lock().await;
    let t = inner.tracker.disconnect();
    inner.action_errors.clear();
    inner.read_error = None;
    self.writer.reset();
    self.record(t);
    info!("Wallet disconnected");
    self.publish(&inner)
  }

  /// Poll the identity factory and, once an identity is known, the
  /// claim. Read failures are recorded and left for the next poll.
  #[instrument(skip(self))]
  pub async fn refresh(&self) -> ProgressSnapshot {
    let (wallet, complete) = {
      let inner = self.inner.lock().await;
      let state = inner.tracker.state();
      match state.wallet() {
        Some(wallet) => (wallet, state.is_complete()),
        None => return self.publish(&inner),
      }
    };

    let mut read_error = None;
    let lookup = self.identity_reader.read(wallet).await;

    let identity = {
      let mut inner = self.inner.lock().await;
      match lookup {
        Ok(found) => {
          let t = inner.tracker.observe_identity(wallet, found).await;
          self.record(t);
        }
        Err(e) => {
          self.metrics.read_errors.with_label_values(&["identity"]).inc();
          warn!(error = %e, "Identity read failed");
          read_error = Some(format!("{e:#}"));
        }
      }
      inner
        .tracker
        .is_current(wallet)
        .then(|| inner.tracker.state().identity())
        .flatten()
    };

    if let (Some(identity), false) = (identity, complete) {
      let status = self.claim_reader.read(identity).await;
      let mut inner = self.inner.lock().await;
      match status {
        Ok(status) => {
          let t = inner.tracker.observe_claim(wallet, &status).await;
          self.record(t);
        }
        Err(e) => {
          self.metrics.read_errors.with_label_values(&["claim"]).inc();
          warn!(error = %e, "Claim read failed");
          read_error.get_or_insert_with(|| format!("{e:#}"));
        }
      }
    }

    let mut inner = self.inner.lock().await;
    if inner.tracker.is_current(wallet) {
      inner.read_error = read_error;
    }
    self.publish(&inner)
  }

  // ── Actions ─────────────────────────────────────────────

  /// Run `action` if it is available.
  pub async fn perform(&self, action: Action) -> Result<ProgressSnapshot, StepError> {
    match action {
      Action::DeployIdentity => self.deploy_identity().await,
      Action::RequestSignature => self.request_signature().await,
      Action::SubmitClaim => self.submit_claim().await,
    }
  }

  /// Deploy an identity for the connected wallet through the gateway,
  /// then wait for the factory to report it.
  #[instrument(skip(self))]
  pub async fn deploy_identity(&self) -> Result<ProgressSnapshot, StepError> {
    let action = Action::DeployIdentity;
    let guard = self.begin(action)?;
    let state = self.gate(action).await?;
    let ProgressState::IdentityPending { wallet, .. } = state else {
      return Err(StepError::NotAvailable { action });
    };

    let result = async {
      let tx_hash = self
        .chain
        .deploy_identity(wallet)
        .await
        .map_err(|e| StepError::Transaction(format!("{e:#}")))?;
      info!(tx = %tx_hash, "Identity deployment submitted");

      if self.monitor.wait(tx_hash).await? == TxOutcome::Reverted {
        return Err(StepError::Reverted { tx_hash });
      }

      {
        let mut inner = self.inner.lock().await;
        let t = inner.tracker.record_deployment(wallet).await;
        self.record(t);
        self.publish(&inner);
      }

      let identity = self
        .identity_reader
        .read_after_write(wallet)
        .await
        .ok_or(StepError::NotYetVisible("identity"))?;

      let mut inner = self.inner.lock().await;
      let t = inner.tracker.observe_identity(wallet, Some(identity)).await;
      self.record(t);
      Ok(())
    }
    .await;

    drop(guard);
    self.finish(action, result).await
  }

  /// Ask the signing service for a KYC attestation.
  #[instrument(skip(self))]
  pub async fn request_signature(&self) -> Result<ProgressSnapshot, StepError> {
    let action = Action::RequestSignature;
    let guard = self.begin(action)?;
    let state = self.gate(action).await?;
    let ProgressState::KycPending { wallet, identity } = state else {
      return Err(StepError::NotAvailable { action });
    };

    let started = Instant::now();
    let signed = self.requester.request(wallet, identity).await;
    let outcome = if signed.is_ok() { "ok" } else { "error" };
    self
      .metrics
      .signing_latency
      .with_label_values(&[outcome])
      .observe(started.elapsed().as_secs_f64());

    let result = match signed {
      Ok(claim) => {
        let mut inner = self.inner.lock().await;
        if inner.tracker.is_current(wallet) {
          let t = inner.tracker.apply(ProgressEvent::SignatureObtained(claim));
          self.record(t);
        }
        Ok(())
      }
      Err(e) => Err(StepError::from(e)),
    };

    drop(guard);
    self.finish(action, result).await
  }

  /// Submit the obtained attestation and confirm it with a claim read.
  #[instrument(skip(self))]
  pub async fn submit_claim(&self) -> Result<ProgressSnapshot, StepError> {
    let action = Action::SubmitClaim;
    let guard = self.begin(action)?;
    let state = self.gate(action).await?;
    let ProgressState::ClaimPending {
      wallet,
      identity,
      claim,
      ..
    } = state
    else {
      return Err(StepError::NotAvailable { action });
    };

    let result = async {
      let tx_hash = self.writer.submit(identity, &claim).await?;
      {
        let mut inner = self.inner.lock().await;
        inner.tracker.apply(ProgressEvent::ClaimSubmitted(tx_hash));
        self.publish(&inner);
      }

      if let Err(e) = self.writer.await_confirmation(tx_hash).await {
        let mut inner = self.inner.lock().await;
        if inner.tracker.is_current(wallet) {
          inner.tracker.apply(ProgressEvent::ClaimTxFailed);
        }
        return Err(e);
      }

      let status = self.claim_reader.confirm_after_write(identity).await;
      let mut inner = self.inner.lock().await;
      let t = inner.tracker.observe_claim(wallet, &status).await;
      self.record(t);
      if status.is_valid() {
        Ok(())
      } else {
        Err(StepError::NotYetVisible("claim"))
      }
    }
    .await;

    drop(guard);
    self.finish(action, result).await
  }

  /// Run the first available action that has not already failed.
  ///
  /// Returns the action that was attempted, if any. Failed actions are
  /// skipped until they are triggered explicitly.
  pub async fn advance(&self) -> Option<(Action, Result<ProgressSnapshot, StepError>)> {
    let next = {
      let inner = self.inner.lock().await;
      let state = inner.tracker.state();
      Action::ALL
        .into_iter()
        .find(|a| state.allows(*a) && !inner.action_errors.contains_key(a))
    }?;
    debug!(action = %next, "Advancing");
    Some((next, self.perform(next).await))
  }

  /// Poll until `shutdown` fires, optionally advancing on each tick.
  pub async fn run(
    &self,
    mut shutdown: broadcast::Receiver<()>,
    poll_interval: Duration,
    auto_advance: bool,
  ) {
    let mut ticker = tokio::time::interval(poll_interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    info!(
      poll_ms = poll_interval.as_millis(),
      auto_advance, "Onboarding poller started"
    );

    loop {
      tokio::select! {
        biased;
        _ = shutdown.recv() => {
          info!("Onboarding poller received shutdown signal");
          break;
        }
        _ = ticker.tick() => {
          self.refresh().await;
          if auto_advance {
            match self.advance().await {
              Some((action, Err(StepError::Busy))) => debug!(%action, "Action already running"),
              Some((action, Err(e))) => warn!(%action, error = %e, "Automatic action failed"),
              Some((action, Ok(_))) => info!(%action, "Automatic action succeeded"),
              None => {}
            }
          }
        }
      }
    }
  }

  // ── Internals ───────────────────────────────────────────

  fn begin(&self, action: Action) -> Result<InFlightGuard<'_>, StepError> {
    let mut slot = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(running) = *slot {
      debug!(%action, %running, "Rejecting concurrent action");
      return Err(StepError::Busy);
    }
    *slot = Some(action);
    Ok(InFlightGuard {
      slot: &self.in_flight,
    })
  }

  /// Check `action` against the current state and clear its last error.
  async fn gate(&self, action: Action) -> Result<ProgressState, StepError> {
    let mut inner = self.inner.lock().await;
    if !inner.tracker.state().allows(action) {
      self
        .metrics
        .actions
        .with_label_values(&[action.as_str(), "rejected"])
        .inc();
      return Err(StepError::NotAvailable { action });
    }
    inner.action_errors.remove(&action);
    self.publish(&inner);
    Ok(inner.tracker.state().clone())
  }

  async fn finish(
    &self,
    action: Action,
    result: Result<(), StepError>,
  ) -> Result<ProgressSnapshot, StepError> {
    let mut inner = self.inner.lock().await;
    let outcome = match &result {
      Ok(()) => "ok",
      Err(_) => "error",
    };
    self
      .metrics
      .actions
      .with_label_values(&[action.as_str(), outcome])
      .inc();

    match result {
      Ok(()) => {
        info!(%action, "Action succeeded");
        Ok(self.publish(&inner))
      }
      Err(e) => {
        error!(%action, error = %e, "Action failed");
        inner.action_errors.insert(action, e.to_string());
        self.publish(&inner);
        Err(e)
      }
    }
  }

  fn record(&self, transition: Transition) {
    if transition.changed() {
      self
        .metrics
        .transitions
        .with_label_values(&[transition.to.as_str()])
        .inc();
    }
  }

  fn publish(&self, inner: &SessionInner<L>) -> ProgressSnapshot {
    let state = inner.tracker.state().clone();
    let stage = state.stage();
    let in_flight = *self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);

    let snapshot = ProgressSnapshot {
      wallet: state.wallet(),
      identity: state.identity(),
      stage,
      step: stage.step(),
      percent: stage.percent(),
      ever_had_identity: inner
        .tracker
        .identity_view()
        .is_some_and(|view| view.ever_had_identity),
      available_actions: Action::ALL
        .into_iter()
        .filter(|a| state.allows(*a))
        .collect(),
      in_flight,
      action_errors: inner.action_errors.clone(),
      read_error: inner.read_error.clone(),
      claim_write: self.writer.status(),
      state,
      updated_at: Utc::now(),
    };

    self.metrics.progress_percent.set(i64::from(stage.percent()));
    self.snapshot_tx.send_replace(snapshot.clone());
    snapshot
  }
}
