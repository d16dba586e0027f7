//! A single viewing session: current edition, book and chapter, the loaded
//! verse text, and the annotation state hydrated for the visible window.
//!
//! UI-facing reads and the store mutation inside `apply_edit` are synchronous
//! and only touch in-memory state; the view lock is never held across an
//! await. Network work happens before or after, through the sync client.

use std::sync::{
	atomic::{AtomicU64, Ordering},
	Arc, RwLock, RwLockReadGuard, RwLockWriteGuard,
};

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::{
	alignment::ClusterResolver,
	config::CoreConfig,
	domain::{
		AnnotationKey, BookId, ClusterId, EditionId, HighlightColor, RecordId, RecordPatch,
		RemoteRecord, VerseRef,
	},
	infra::{Catalog, RemoteApiError, TextError, TextRepository},
	store::{AnnotationStore, EditAction, EditOutcome, HydrateWindow, RemoteIdIndex},
	sync::{CurrentView, SyncClient},
};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
	#[error(transparent)]
	Text(#[from] TextError),

	#[error("no chapter is loaded")]
	NoActiveView,

	/// A permanent remote rejection, surfaced once to the caller of the
	/// originating edit. The local annotation state is intact.
	#[error("remote rejected annotation write: {0}")]
	RemoteRejected(String),
}

struct ViewState {
	edition: EditionId,
	book: BookId,
	chapter: u32,
	verses: Vec<(VerseRef, String)>,
	store: AnnotationStore,
	index: RemoteIdIndex,
}

impl ViewState {
	/// Rebuild the hydrated window from (overlaid) remote records: the
	/// store's window entries and the whole index are replaced by what the
	/// records say, then late-resolving per-edition entries are promoted.
	fn absorb(&mut self, window: &HydrateWindow, records: &[RemoteRecord], ready: bool) {
		self.index.clear();
		self.store.clear_window(window);

		// Oldest first, so the newest record wins when two cover one verse.
		let mut records = records.to_vec();
		records.sort_by_key(|record| record.updated_at);

		for record in &records {
			let annotation = record.annotation();

			for verse_key in record.verses() {
				let key = if ready {
					AnnotationKey::Shared(ClusterId::from_canonical(verse_key))
				} else {
					AnnotationKey::PerEdition(VerseRef::with_key(
						window.edition.clone(),
						verse_key,
					))
				};

				self.store.set_annotation(&key, &annotation);
				self.index.insert(&key, record.id);
			}
		}

		self.store.promote_local_to_shared();
	}
}

pub struct ReaderSession {
	text: Arc<dyn TextRepository>,
	catalog: Arc<dyn Catalog>,
	resolver: Arc<ClusterResolver>,
	sync: Arc<SyncClient>,
	hydrate_radius: u32,
	generation: AtomicU64,
	view: RwLock<Option<ViewState>>,
}

impl ReaderSession {
	#[must_use]
	pub fn new(
		text: Arc<dyn TextRepository>,
		catalog: Arc<dyn Catalog>,
		resolver: Arc<ClusterResolver>,
		sync: Arc<SyncClient>,
		config: &CoreConfig,
	) -> Arc<Self> {
		Arc::new(Self {
			text,
			catalog,
			resolver,
			sync,
			hydrate_radius: config.hydrate_radius,
			generation: AtomicU64::new(0),
			view: RwLock::new(None),
		})
	}

	/// Move the session to a chapter (or switch editions): load the text,
	/// reset the view, hydrate the surrounding window. A hydrate still in
	/// flight for the previous position is discarded by the generation bump.
	pub async fn navigate(
		&self,
		edition: EditionId,
		book: BookId,
		chapter: u32,
	) -> Result<(), SessionError> {
		let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;

		let verses = self.text.chapter_text(&edition, &book, chapter).await?;

		*self.view_write() = Some(ViewState {
			edition,
			book,
			chapter,
			verses,
			store: AnnotationStore::new(Arc::clone(&self.resolver)),
			index: RemoteIdIndex::new(),
		});

		self.hydrate_window(generation).await;
		Ok(())
	}

	/// The effective highlight of a verse in the current view. Synchronous;
	/// in-memory only.
	#[must_use]
	pub fn color_for(&self, verse: &VerseRef) -> HighlightColor {
		self.view_read()
			.as_ref()
			.map_or(HighlightColor::None, |view| view.store.color_for(verse))
	}

	/// The effective note of a verse in the current view. Synchronous;
	/// in-memory only.
	#[must_use]
	pub fn note_for(&self, verse: &VerseRef) -> Option<String> {
		self.view_read()
			.as_ref()
			.and_then(|view| view.store.note_for(verse).map(str::to_string))
	}

	/// The loaded chapter text.
	#[must_use]
	pub fn verses(&self) -> Vec<(VerseRef, String)> {
		self.view_read()
			.as_ref()
			.map(|view| view.verses.clone())
			.unwrap_or_default()
	}

	#[must_use]
	pub fn position(&self) -> Option<(EditionId, BookId, u32)> {
		self.view_read()
			.as_ref()
			.map(|view| (view.edition.clone(), view.book.clone(), view.chapter))
	}

	/// Apply a user edit: mutate the store synchronously (the UI reflects the
	/// change immediately), then write through to the remote store. The
	/// write-through is fail-soft — an unreachable remote means the outbox
	/// owns the edit now; only a permanent rejection is surfaced, and it
	/// never rolls back local state.
	pub async fn apply_edit(
		&self,
		verse: &VerseRef,
		action: EditAction,
	) -> Result<(), SessionError> {
		let (outcome, existing) = {
			let mut guard = self.view_write();
			let view = guard.as_mut().ok_or(SessionError::NoActiveView)?;

			let outcome = view.store.apply_edit(verse, action);
			let existing = view.index.get(&outcome.key);
			(outcome, existing)
		};

		self.write_through(outcome, existing).await
	}

	/// Re-run the window hydrate for the current position. Also the
	/// [`CurrentView`] entry point used by the sync orchestrator.
	pub async fn rehydrate(&self) {
		let generation = self.generation.load(Ordering::Acquire);
		self.hydrate_window(generation).await;
	}

	/// Promote per-edition entries into shared entries. Idempotent; called
	/// once the alignment table finishes loading, and again on reload.
	pub fn alignment_loaded(&self) {
		let mut guard = self.view_write();

		if let Some(view) = guard.as_mut() {
			view.store.promote_local_to_shared();
			debug!("promoted per-edition annotations after alignment load");
		}
	}

	async fn write_through(
		&self,
		outcome: EditOutcome,
		existing: Option<RecordId>,
	) -> Result<(), SessionError> {
		let result = if outcome.annotation.is_empty() {
			match existing {
				Some(id) => self.sync.delete(id).await.map(|()| {
					if let Some(view) = self.view_write().as_mut() {
						view.index.remove(&outcome.key);
					}
				}),
				None => Ok(()),
			}
		} else if let Some(id) = existing {
			self.sync
				.update(id, RecordPatch::from_annotation(&outcome.annotation))
				.await
		} else {
			let record = RemoteRecord::draft(outcome.key.record_key(), &outcome.annotation);

			self.sync.create(record).await.map(|id| {
				if let Some(view) = self.view_write().as_mut() {
					view.index.insert(&outcome.key, id);
				}
			})
		};

		match result {
			Ok(()) => Ok(()),
			Err(RemoteApiError::Unreachable(reason)) => {
				// The outbox already holds the edit; nothing to surface.
				debug!(%reason, "annotation write queued");
				Ok(())
			}
			Err(RemoteApiError::Rejected(reason)) => {
				warn!(%reason, "remote rejected annotation write");
				Err(SessionError::RemoteRejected(reason))
			}
		}
	}

	async fn hydrate_window(&self, generation: u64) {
		let Some((edition, book, chapter)) = self.position() else {
			return;
		};

		let (start, end) =
			window_bounds(chapter, self.catalog.chapter_count(&book), self.hydrate_radius);
		let records = self.sync.hydrate_range(&book, start, end).await;

		if self.generation.load(Ordering::Acquire) != generation {
			debug!(%book, chapter, "discarding hydrate for a superseded view");
			return;
		}

		let window = HydrateWindow {
			edition,
			book,
			chapters: start..=end,
		};

		if let Some(view) = self.view_write().as_mut() {
			view.absorb(&window, &records, self.resolver.is_ready());
		}
	}

	fn view_read(&self) -> RwLockReadGuard<'_, Option<ViewState>> {
		self.view.read().expect("session view lock poisoned")
	}

	fn view_write(&self) -> RwLockWriteGuard<'_, Option<ViewState>> {
		self.view.write().expect("session view lock poisoned")
	}
}

#[async_trait]
impl CurrentView for ReaderSession {
	async fn rehydrate(&self) {
		let generation = self.generation.load(Ordering::Acquire);
		self.hydrate_window(generation).await;
	}
}

impl std::fmt::Debug for ReaderSession {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let mut s = f.debug_struct("ReaderSession");

		match self.position() {
			Some((edition, book, chapter)) => {
				s.field("edition", &edition)
					.field("book", &book)
					.field("chapter", &chapter)
			}
			None => s.field("view", &"none"),
		}
		.finish_non_exhaustive()
	}
}

/// The hydrated chapter range: current chapter ± radius, clamped to the
/// book's chapters.
fn window_bounds(chapter: u32, chapter_count: u32, radius: u32) -> (u32, u32) {
	let start = chapter.saturating_sub(radius).max(1);
	let end = chapter
		.saturating_add(radius)
		.min(chapter_count.max(chapter));

	(start, end)
}
