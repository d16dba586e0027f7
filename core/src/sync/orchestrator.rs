//! Reacts to connectivity restoration, authentication and manual refresh by
//! running the fixed `drain outbox -> prime cache -> hydrate current view`
//! sequence.
//!
//! One serial event loop handles every trigger, so a second transition is
//! never processed while a sequence is still running; the ordering invariant
//! is structural, not a calling convention.

use std::sync::{
	atomic::{AtomicBool, Ordering},
	Arc,
};

use async_trait::async_trait;
use tokio::{
	select, spawn,
	sync::{broadcast, mpsc, watch, Mutex, RwLock},
	task::JoinHandle,
};
use tracing::{debug, info, warn};

use crate::{
	infra::{Catalog, ConnectionState, Connectivity, Identity},
	sync::{client::SyncClient, SyncEvent},
};

/// The currently visible reader view. Registered by the session so the
/// orchestrator can re-hydrate it after a sync cycle; hydration of a stale
/// view is discarded by the session's own generation counter.
#[async_trait]
pub trait CurrentView: Send + Sync {
	async fn rehydrate(&self);
}

pub struct SyncOrchestrator {
	client: Arc<SyncClient>,
	catalog: Arc<dyn Catalog>,
	connectivity: Arc<dyn Connectivity>,
	identity: Arc<dyn Identity>,
	state_tx: watch::Sender<ConnectionState>,
	current_view: RwLock<Option<Arc<dyn CurrentView>>>,
	refresh_tx: mpsc::Sender<()>,
	refresh_rx: Mutex<Option<mpsc::Receiver<()>>>,
	sequence_active: AtomicBool,
}

impl SyncOrchestrator {
	/// The initial offline/online flag is published synchronously from
	/// `check_now`, before the event loop starts.
	#[must_use]
	pub fn new(
		client: Arc<SyncClient>,
		catalog: Arc<dyn Catalog>,
		connectivity: Arc<dyn Connectivity>,
		identity: Arc<dyn Identity>,
	) -> Arc<Self> {
		let (state_tx, _) = watch::channel(connectivity.check_now());
		let (refresh_tx, refresh_rx) = mpsc::channel(1);

		Arc::new(Self {
			client,
			catalog,
			connectivity,
			identity,
			state_tx,
			current_view: RwLock::new(None),
			refresh_tx,
			refresh_rx: Mutex::new(Some(refresh_rx)),
			sequence_active: AtomicBool::new(false),
		})
	}

	/// The published offline/online flag. Carries a value immediately.
	#[must_use]
	pub fn state(&self) -> watch::Receiver<ConnectionState> {
		self.state_tx.subscribe()
	}

	pub async fn set_current_view(&self, view: Arc<dyn CurrentView>) {
		*self.current_view.write().await = Some(view);
	}

	pub async fn clear_current_view(&self) {
		*self.current_view.write().await = None;
	}

	/// Manual pull-to-refresh. Non-reentrant: while a sequence is already
	/// running (or a refresh is already queued) this is a no-op. Returns
	/// whether the refresh was accepted.
	pub fn refresh(&self) -> bool {
		if self.sequence_active.load(Ordering::Acquire) {
			debug!("refresh ignored; sync sequence already running");
			return false;
		}

		self.refresh_tx.try_send(()).is_ok()
	}

	/// Start the event loop. Runs until every collaborator stream closes.
	pub fn spawn(self: &Arc<Self>) -> JoinHandle<()> {
		let this = Arc::clone(self);

		spawn(async move {
			let mut refresh_rx = this
				.refresh_rx
				.lock()
				.await
				.take()
				.expect("orchestrator can only be started once");

			this.run(&mut refresh_rx).await;
		})
	}

	async fn run(&self, refresh_rx: &mut mpsc::Receiver<()>) {
		let mut connectivity_rx = self.connectivity.subscribe();
		let mut identity_rx = self.identity.subscribe();
		let mut flushed_rx = self.client.subscribe();

		let mut signed_in = self.identity.current().is_some();

		loop {
			select! {
				next = connectivity_rx.recv() => match next {
					Ok(state) => self.on_connectivity(state).await,
					Err(broadcast::error::RecvError::Lagged(skipped)) => {
						warn!(skipped, "connectivity events lagged");
					}
					Err(broadcast::error::RecvError::Closed) => break,
				},
				next = identity_rx.recv() => match next {
					Ok(user) => {
						let now_signed_in = user.is_some();
						self.on_identity(signed_in, now_signed_in).await;
						signed_in = now_signed_in;
					}
					Err(broadcast::error::RecvError::Lagged(skipped)) => {
						warn!(skipped, "identity events lagged");
					}
					Err(broadcast::error::RecvError::Closed) => break,
				},
				next = flushed_rx.recv() => match next {
					Ok(SyncEvent::Flushed { id }) => {
						if self.state_tx.borrow().is_online() {
							debug!(%id, "entry flushed; re-hydrating current view");
							self.hydrate_current().await;
						}
					}
					Err(broadcast::error::RecvError::Lagged(skipped)) => {
						warn!(skipped, "flushed events lagged");
					}
					Err(broadcast::error::RecvError::Closed) => break,
				},
				Some(()) = refresh_rx.recv() => {
					info!("manual refresh");
					self.full_sequence().await;
				}
			}
		}
	}

	async fn on_connectivity(&self, next: ConnectionState) {
		let previous = *self.state_tx.borrow();
		if previous == next {
			return;
		}

		self.state_tx.send_replace(next);

		match next {
			ConnectionState::Online => {
				info!("connectivity restored; running sync sequence");
				self.full_sequence().await;
			}
			ConnectionState::Offline => {
				info!("connectivity lost");
			}
		}
	}

	async fn on_identity(&self, was_signed_in: bool, now_signed_in: bool) {
		match (was_signed_in, now_signed_in) {
			(false, true) => {
				info!("signed in; pulling existing annotations");
				self.full_sequence().await;
			}
			(true, false) => {
				info!("signed out; clearing local sync state");
				self.client.clear_local().await;
			}
			_ => {}
		}
	}

	/// Drain before priming so local writes are not shadowed by stale server
	/// reads; prime before hydrating so the hydrate sees fresh data.
	async fn full_sequence(&self) {
		self.sequence_active.store(true, Ordering::Release);

		self.client.drain_outbox().await;
		self.client.prime_cache(&self.catalog.books_index()).await;
		self.hydrate_current().await;

		self.sequence_active.store(false, Ordering::Release);
	}

	async fn hydrate_current(&self) {
		let view = self.current_view.read().await.clone();

		if let Some(view) = view {
			view.rehydrate().await;
		}
	}
}

impl std::fmt::Debug for SyncOrchestrator {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("SyncOrchestrator")
			.field("state", &*self.state_tx.borrow())
			.finish_non_exhaustive()
	}
}
