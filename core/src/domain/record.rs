//! Server-authoritative annotation records.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{
	annotation::{Annotation, HighlightColor},
	verse::{BookId, VerseKey},
};

/// Identifier of a remote annotation record.
///
/// Generated on the client (v4) so it doubles as the idempotency key for
/// retried outbox entries: the remote create endpoint treats a second create
/// with the same id as a no-op instead of double-applying.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(Uuid);

impl RecordId {
	#[must_use]
	pub fn new() -> Self {
		Self(Uuid::new_v4())
	}
}

impl Default for RecordId {
	fn default() -> Self {
		Self::new()
	}
}

impl fmt::Display for RecordId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		self.0.fmt(f)
	}
}

/// One server-side annotation row.
///
/// Coordinates are in the canonical edition's versification whenever the
/// annotated verse has a cluster, otherwise in the annotating edition's own
/// numbering (the per-edition fallback). A record may span a verse range
/// within its chapter; reads expand it to one logical annotation per covered
/// verse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteRecord {
	pub id: RecordId,
	pub book: BookId,
	pub chapter: u32,
	pub verse_start: u32,
	pub verse_end: Option<u32>,
	pub note: String,
	pub color: Option<HighlightColor>,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

impl RemoteRecord {
	/// A fresh single-verse record draft for a local edit awaiting its first
	/// remote write.
	pub fn draft(key: &VerseKey, annotation: &Annotation) -> Self {
		let now = Utc::now();

		Self {
			id: RecordId::new(),
			book: key.book.clone(),
			chapter: key.chapter,
			verse_start: key.verse,
			verse_end: None,
			note: annotation.note.clone().unwrap_or_default(),
			color: (!annotation.highlight.is_none()).then_some(annotation.highlight),
			created_at: now,
			updated_at: now,
		}
	}

	/// Expand the (possibly ranged) record to the verse keys it covers.
	pub fn verses(&self) -> impl Iterator<Item = VerseKey> + '_ {
		let end = self.verse_end.unwrap_or(self.verse_start).max(self.verse_start);

		(self.verse_start..=end).map(|verse| VerseKey {
			book: self.book.clone(),
			chapter: self.chapter,
			verse,
		})
	}

	#[must_use]
	pub fn overlaps_chapter(&self, chapter: u32) -> bool {
		self.chapter == chapter
	}

	/// The logical annotation this record carries for each covered verse.
	#[must_use]
	pub fn annotation(&self) -> Annotation {
		Annotation {
			highlight: self.color.unwrap_or(HighlightColor::None),
			note: (!self.note.is_empty()).then(|| self.note.clone()),
		}
	}

	pub fn apply(&mut self, patch: &RecordPatch) {
		self.note = patch.note.clone();
		self.color = patch.color;
		self.updated_at = Utc::now();
	}
}

/// Full replacement value for an update: last write wins against the single
/// authoritative record of the cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordPatch {
	pub note: String,
	pub color: Option<HighlightColor>,
}

impl RecordPatch {
	pub fn from_annotation(annotation: &Annotation) -> Self {
		Self {
			note: annotation.note.clone().unwrap_or_default(),
			color: (!annotation.highlight.is_none()).then_some(annotation.highlight),
		}
	}
}
