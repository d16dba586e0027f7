//! Outbox-backed client for the remote annotation store.
//!
//! Reads go remote-first with a cache fallback; writes go remote-first with
//! an outbox fallback. Pending outbox operations are overlaid on every read
//! so a stale remote or cached snapshot can never shadow a newer local edit.
//! Shared across reader sessions: pending writes survive navigation.

use std::{collections::HashSet, path::Path, sync::Arc, time::Duration};

use tokio::sync::{broadcast, Mutex};
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::{
	config::CoreConfig,
	domain::{BookId, RecordId, RecordPatch, RemoteRecord},
	infra::{Connectivity, RemoteAnnotationApi, RemoteApiError},
};

use super::{
	cache::ChapterCache,
	outbox::{Outbox, OutboxEntry, OutboxOp},
	SyncEvent,
};

const EVENT_CHANNEL_CAPACITY: usize = 64;

pub struct SyncClient {
	api: Arc<dyn RemoteAnnotationApi>,
	connectivity: Arc<dyn Connectivity>,
	outbox: Mutex<Outbox>,
	cache: Mutex<ChapterCache>,
	// Serializes drains without blocking concurrent enqueues.
	drain_lock: Mutex<()>,
	flushed_tx: broadcast::Sender<SyncEvent>,
	fetch_timeout: Duration,
}

impl SyncClient {
	#[must_use]
	pub fn new(
		api: Arc<dyn RemoteAnnotationApi>,
		connectivity: Arc<dyn Connectivity>,
		config: &CoreConfig,
	) -> Self {
		Self::with_data_dir(api, connectivity, &config.data_dir, config.fetch_timeout())
	}

	#[must_use]
	pub fn with_data_dir(
		api: Arc<dyn RemoteAnnotationApi>,
		connectivity: Arc<dyn Connectivity>,
		data_dir: &Path,
		fetch_timeout: Duration,
	) -> Self {
		let (flushed_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

		Self {
			api,
			connectivity,
			outbox: Mutex::new(Outbox::load(data_dir)),
			cache: Mutex::new(ChapterCache::load(data_dir)),
			drain_lock: Mutex::new(()),
			flushed_tx,
			fetch_timeout,
		}
	}

	/// One event per successfully flushed outbox entry.
	#[must_use]
	pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
		self.flushed_tx.subscribe()
	}

	/// Records overlapping the inclusive chapter range, with pending local
	/// writes overlaid. Online this refreshes the cache from the server;
	/// offline (or on a failed/timed-out fetch) it serves the last cached
	/// data. Never errors.
	pub async fn hydrate_range(
		&self,
		book: &BookId,
		chapter_start: u32,
		chapter_end: u32,
	) -> Vec<RemoteRecord> {
		let fetched = if self.connectivity.check_now().is_online() {
			match timeout(
				self.fetch_timeout,
				self.api.fetch_range(book, chapter_start, chapter_end),
			)
			.await
			{
				Ok(Ok(records)) => {
					let mut cache = self.cache.lock().await;
					if let Err(e) =
						cache.put_range(book, chapter_start, chapter_end, &records)
					{
						warn!(?e, "failed to persist chapter cache");
					}
					Some(records)
				}
				Ok(Err(e)) => {
					debug!(%book, chapter_start, chapter_end, %e, "remote fetch failed; serving cache");
					None
				}
				Err(_) => {
					warn!(%book, chapter_start, chapter_end, "remote fetch timed out; serving cache");
					None
				}
			}
		} else {
			None
		};

		let mut records = match fetched {
			Some(records) => records,
			None => {
				self.cache
					.lock()
					.await
					.get_range(book, chapter_start, chapter_end)
			}
		};

		self.overlay_pending(&mut records).await;
		records
	}

	/// Create a record remotely, or queue the create when the remote is
	/// unreachable. The returned id is final either way (ids are
	/// client-generated). Only a permanent rejection errors.
	pub async fn create(&self, record: RemoteRecord) -> Result<RecordId, RemoteApiError> {
		let id = record.id;

		if self.connectivity.check_now().is_online() {
			match self.api.create(&record).await {
				Ok(()) => return Ok(id),
				Err(RemoteApiError::Rejected(reason)) => {
					return Err(RemoteApiError::Rejected(reason));
				}
				Err(RemoteApiError::Unreachable(reason)) => {
					debug!(%id, %reason, "create unreachable; queueing");
				}
			}
		}

		self.enqueue(OutboxOp::Create { record }).await;
		Ok(id)
	}

	pub async fn update(
		&self,
		id: RecordId,
		patch: RecordPatch,
	) -> Result<(), RemoteApiError> {
		if self.connectivity.check_now().is_online() {
			match self.api.update(id, &patch).await {
				Ok(()) => return Ok(()),
				Err(RemoteApiError::Rejected(reason)) => {
					return Err(RemoteApiError::Rejected(reason));
				}
				Err(RemoteApiError::Unreachable(reason)) => {
					debug!(%id, %reason, "update unreachable; queueing");
				}
			}
		}

		self.enqueue(OutboxOp::Update { id, patch }).await;
		Ok(())
	}

	pub async fn delete(&self, id: RecordId) -> Result<(), RemoteApiError> {
		if self.connectivity.check_now().is_online() {
			match self.api.delete(id).await {
				Ok(()) => return Ok(()),
				Err(RemoteApiError::Rejected(reason)) => {
					return Err(RemoteApiError::Rejected(reason));
				}
				Err(RemoteApiError::Unreachable(reason)) => {
					debug!(%id, %reason, "delete unreachable; queueing");
				}
			}
		}

		self.enqueue(OutboxOp::Delete { id }).await;
		Ok(())
	}

	/// Flush queued operations strictly in enqueue order. An unreachable
	/// remote aborts the drain and leaves the entry (and everything behind
	/// it) queued for the next trigger; a permanent rejection drops the
	/// poisoned entry and continues. Every flushed entry emits one
	/// [`SyncEvent::Flushed`].
	pub async fn drain_outbox(&self) {
		let _draining = self.drain_lock.lock().await;

		loop {
			let entry = {
				let outbox = self.outbox.lock().await;
				match outbox.front() {
					Some(entry) => entry.clone(),
					None => break,
				}
			};

			match self.apply(&entry).await {
				Ok(()) => {
					self.remove_front().await;

					let id = entry.op.record_id();
					debug!(%id, "outbox entry flushed");
					let _ = self.flushed_tx.send(SyncEvent::Flushed { id });
				}
				Err(RemoteApiError::Unreachable(reason)) => {
					debug!(%reason, "drain aborted; remote unreachable");
					break;
				}
				Err(RemoteApiError::Rejected(reason)) => {
					warn!(
						id = %entry.op.record_id(),
						%reason,
						"outbox entry permanently rejected; dropping"
					);
					self.remove_front().await;
				}
			}
		}
	}

	/// Best-effort prefetch of every book's records into the cache so a
	/// subsequent offline session has broad coverage. All failures are
	/// swallowed.
	pub async fn prime_cache(&self, books: &[(BookId, u32)]) {
		for (book, chapters) in books {
			if *chapters == 0 {
				continue;
			}

			match timeout(self.fetch_timeout, self.api.fetch_range(book, 1, *chapters)).await
			{
				Ok(Ok(records)) => {
					let mut cache = self.cache.lock().await;
					if let Err(e) = cache.put_range(book, 1, *chapters, &records) {
						warn!(?e, %book, "failed to persist primed cache");
					}
				}
				Ok(Err(e)) => {
					debug!(%book, %e, "cache priming fetch failed; skipping book");
				}
				Err(_) => {
					debug!(%book, "cache priming fetch timed out; skipping book");
				}
			}
		}
	}

	/// Ids with queued operations; remote state for these is stale.
	pub async fn pending_ids(&self) -> HashSet<RecordId> {
		self.outbox.lock().await.pending_ids()
	}

	pub async fn pending_count(&self) -> usize {
		self.outbox.lock().await.len()
	}

	/// Drop all local sync state (pending writes and cached records). Called
	/// on sign-out: neither belongs to the next account.
	pub async fn clear_local(&self) {
		if let Err(e) = self.outbox.lock().await.clear() {
			warn!(?e, "failed to clear outbox on sign-out");
		}
		if let Err(e) = self.cache.lock().await.clear() {
			warn!(?e, "failed to clear chapter cache on sign-out");
		}
	}

	async fn enqueue(&self, op: OutboxOp) {
		let mut outbox = self.outbox.lock().await;

		if let Err(e) = outbox.push(op) {
			// The entry is still queued in memory; only durability suffered.
			warn!(?e, "failed to persist outbox entry");
		}
	}

	async fn remove_front(&self) {
		let mut outbox = self.outbox.lock().await;

		if let Err(e) = outbox.pop_front() {
			warn!(?e, "failed to persist outbox after flush");
		}
	}

	async fn apply(&self, entry: &OutboxEntry) -> Result<(), RemoteApiError> {
		match &entry.op {
			OutboxOp::Create { record } => self.api.create(record).await,
			OutboxOp::Update { id, patch } => self.api.update(*id, patch).await,
			OutboxOp::Delete { id } => self.api.delete(*id).await,
		}
	}

	/// Re-apply queued operations, oldest first, on top of a fetched or
	/// cached record list.
	async fn overlay_pending(&self, records: &mut Vec<RemoteRecord>) {
		let outbox = self.outbox.lock().await;

		for entry in outbox.iter() {
			match &entry.op {
				OutboxOp::Create { record } => {
					if !records.iter().any(|existing| existing.id == record.id) {
						records.push(record.clone());
					}
				}
				OutboxOp::Update { id, patch } => {
					if let Some(existing) =
						records.iter_mut().find(|record| record.id == *id)
					{
						existing.apply(patch);
					}
				}
				OutboxOp::Delete { id } => {
					records.retain(|record| record.id != *id);
				}
			}
		}
	}
}

impl std::fmt::Debug for SyncClient {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("SyncClient").finish_non_exhaustive()
	}
}
