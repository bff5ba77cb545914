//! Progress Tracker - Session State plus Durable Latches
//!
//! Wraps the pure `ProgressState` machine with the latch store: latches
//! are read when a wallet connects and written the first time an
//! identity or a valid claim is observed. Observations are tagged with
//! the wallet they were read for, so a read that finishes after the
//! wallet changed is dropped.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::domain::claim::ClaimStatus;
use crate::domain::identity::{IdentityAddress, Latch, WalletAddress, WalletIdentity};
use crate::domain::progress::{ProgressEvent, ProgressStage, ProgressState};
use crate::ports::latch_store::LatchStore;

/// Stage change produced by applying an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
  pub from: ProgressStage,
  pub to: ProgressStage,
}

impl Transition {
  pub fn changed(&self) -> bool {
    self.from != self.to
  }
}

pub struct ProgressTracker<L: LatchStore> {
  latches: Arc<L>,
  state: ProgressState,
  identity: Option<WalletIdentity>,
}

impl<L: LatchStore> ProgressTracker<L> {
  pub fn new(latches: Arc<L>) -> Self {
    Self {
      latches,
      state: ProgressState::default(),
      identity: None,
    }
  }

  pub const fn state(&self) -> &ProgressState {
    &self.state
  }

  pub const fn identity_view(&self) -> Option<&WalletIdentity> {
    self.identity.as_ref()
  }

  /// Feed an event to the state machine.
  pub fn apply(&mut self, event: ProgressEvent) -> Transition {
    let from = self.state.stage();
    let state = std::mem::take(&mut self.state);
    self.state = state.apply(event);
    let to = self.state.stage();
    if from != to {
      info!(%from, %to, "Onboarding stage changed");
    }
    Transition { from, to }
  }

  async fn latch(&self, latch: Latch, wallet: &WalletAddress) -> bool {
    match self.latches.get(&latch.key(wallet)).await {
      Ok(set) => set,
      Err(e) => {
        warn!(?latch, error = %e, "Latch read failed, treating as unset");
        false
      }
    }
  }

  async fn persist(&self, latch: Latch, wallet: &WalletAddress) {
    if let Err(e) = self.latches.set(&latch.key(wallet)).await {
      warn!(?latch, error = %e, "Latch write failed");
    }
  }

  /// Start (or resume) a session for `wallet`.
  #[instrument(skip(self))]
  pub async fn connect(&mut self, wallet: WalletAddress) -> Transition {
    let ever_had_identity = self.latch(Latch::EverHadIdentity, &wallet).await;
    let kyc_latched = self.latch(Latch::EverCompletedKyc, &wallet).await;

    if self.identity.as_ref().map(|v| v.wallet) != Some(wallet) {
      self.identity = Some(WalletIdentity::new(wallet, ever_had_identity));
    }

    self.apply(ProgressEvent::WalletConnected {
      wallet,
      ever_had_identity,
      kyc_latched,
    })
  }

  pub fn disconnect(&mut self) -> Transition {
    self.identity = None;
    self.apply(ProgressEvent::WalletDisconnected)
  }

  /// Fold a factory lookup made for `wallet` into the session.
  #[instrument(skip(self))]
  pub async fn observe_identity(
    &mut self,
    wallet: WalletAddress,
    lookup: Option<IdentityAddress>,
  ) -> Transition {
    if !self.is_current(wallet) {
      return self.unchanged();
    }
    let newly_latched = self
      .identity
      .as_mut()
      .is_some_and(|view| view.observe(lookup));
    if newly_latched {
      self.persist(Latch::EverHadIdentity, &wallet).await;
    }
    self.apply(ProgressEvent::IdentityObserved(lookup))
  }

  /// Record a confirmed deployment for `wallet` that the factory does
  /// not report yet, so deployment is not offered a second time.
  #[instrument(skip(self))]
  pub async fn record_deployment(&mut self, wallet: WalletAddress) -> Transition {
    if !self.is_current(wallet) {
      return self.unchanged();
    }
    let newly_latched = self
      .identity
      .as_mut()
      .is_some_and(WalletIdentity::mark_deployed);
    if newly_latched {
      self.persist(Latch::EverHadIdentity, &wallet).await;
    }
    self.apply(ProgressEvent::IdentityDeployed)
  }

  /// Fold a claim read made for `wallet` into the session.
  #[instrument(skip(self, status))]
  pub async fn observe_claim(&mut self, wallet: WalletAddress, status: &ClaimStatus) -> Transition {
    if !self.is_current(wallet) {
      return self.unchanged();
    }
    let valid = status.is_valid();
    if valid && !self.state.is_complete() {
      self.persist(Latch::EverCompletedKyc, &wallet).await;
    }
    self.apply(ProgressEvent::ClaimObserved { valid })
  }

  /// Whether `wallet` is the wallet of the current session.
  pub fn is_current(&self, wallet: WalletAddress) -> bool {
    self.state.wallet() == Some(wallet)
  }

  fn unchanged(&self) -> Transition {
    let stage = self.state.stage();
    Transition {
      from: stage,
      to: stage,
    }
  }
}
