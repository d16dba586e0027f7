//! In-memory authoritative view of highlights and notes.
//!
//! Two tiers per annotation kind: a shared map keyed by cluster id (used
//! whenever alignment is known) and a per-edition map keyed by raw verse
//! coordinates (the fallback while alignment is unavailable). Per-edition
//! entries are promoted into the shared tier once the resolver becomes ready.
//!
//! The store never touches the network; `apply_edit` is the single mutation
//! entry point for user actions.

pub mod remote_index;

pub use remote_index::RemoteIdIndex;

use std::{collections::HashMap, ops::RangeInclusive, sync::Arc};

use tracing::trace;

use crate::{
	alignment::ClusterResolver,
	domain::{Annotation, AnnotationKey, BookId, ClusterId, EditionId, HighlightColor, VerseRef},
};

/// A user action coming out of the presentation layer, already reduced to an
/// opaque value: "user picked color C and/or note text T for verse V".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditAction {
	/// Set or clear the highlight. Clearing (`HighlightColor::None`) also
	/// clears the note.
	SetHighlight(HighlightColor),

	/// Set or replace the note text. An empty string removes the note and
	/// leaves the highlight alone.
	SetNote(String),

	/// Remove highlight and note together.
	ClearAll,
}

/// What a mutation did: which key it landed on and the annotation now stored
/// there. Drives the remote write-through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditOutcome {
	pub key: AnnotationKey,
	pub annotation: Annotation,
}

/// The chapter window currently hydrated by a reader session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HydrateWindow {
	pub edition: EditionId,
	pub book: BookId,
	pub chapters: RangeInclusive<u32>,
}

impl HydrateWindow {
	fn covers_shared(&self, cluster: &ClusterId) -> bool {
		let key = cluster.canonical_key();
		key.book == self.book && self.chapters.contains(&key.chapter)
	}

	fn covers_local(&self, verse: &VerseRef) -> bool {
		verse.edition == self.edition
			&& verse.key.book == self.book
			&& self.chapters.contains(&verse.key.chapter)
	}
}

/// When a note is set on a verse that has no highlight yet, this color is
/// assigned so the note-implies-highlight invariant cannot be violated by
/// call order.
const FALLBACK_HIGHLIGHT: HighlightColor = HighlightColor::Yellow;

#[derive(Debug)]
pub struct AnnotationStore {
	resolver: Arc<ClusterResolver>,
	shared_colors: HashMap<ClusterId, HighlightColor>,
	shared_notes: HashMap<ClusterId, String>,
	local_colors: HashMap<VerseRef, HighlightColor>,
	local_notes: HashMap<VerseRef, String>,
}

impl AnnotationStore {
	#[must_use]
	pub fn new(resolver: Arc<ClusterResolver>) -> Self {
		Self {
			resolver,
			shared_colors: HashMap::new(),
			shared_notes: HashMap::new(),
			local_colors: HashMap::new(),
			local_notes: HashMap::new(),
		}
	}

	/// The effective highlight of a verse. Lookup order: shared entry at this
	/// verse's cluster, shared entry at a counterpart's cluster, per-edition
	/// entry at this exact verse, per-edition entry at a sibling verse. First
	/// hit wins.
	#[must_use]
	pub fn color_for(&self, verse: &VerseRef) -> HighlightColor {
		if let Some(cluster) = self.resolver.cluster_id(verse) {
			if let Some(color) = self.shared_colors.get(&cluster) {
				return *color;
			}
		}

		for counterpart in self.resolver.match_to_other(verse) {
			if let Some(cluster) = self.resolver.cluster_id(&counterpart) {
				if let Some(color) = self.shared_colors.get(&cluster) {
					return *color;
				}
			}
		}

		if let Some(color) = self.local_colors.get(verse) {
			return *color;
		}

		for sibling in self.resolver.siblings(verse) {
			if let Some(color) = self.local_colors.get(&sibling) {
				return *color;
			}
		}

		HighlightColor::None
	}

	/// The effective note of a verse; same lookup order as
	/// [`color_for`](Self::color_for).
	#[must_use]
	pub fn note_for(&self, verse: &VerseRef) -> Option<&str> {
		if let Some(cluster) = self.resolver.cluster_id(verse) {
			if let Some(note) = self.shared_notes.get(&cluster) {
				return Some(note.as_str());
			}
		}

		for counterpart in self.resolver.match_to_other(verse) {
			if let Some(cluster) = self.resolver.cluster_id(&counterpart) {
				if self.shared_notes.contains_key(&cluster) {
					return self.shared_notes.get(&cluster).map(String::as_str);
				}
			}
		}

		if let Some(note) = self.local_notes.get(verse) {
			return Some(note.as_str());
		}

		for sibling in self.resolver.siblings(verse) {
			if self.local_notes.contains_key(&sibling) {
				return self.local_notes.get(&sibling).map(String::as_str);
			}
		}

		None
	}

	/// Move every per-edition entry whose cluster now resolves into the
	/// shared tier and drop the per-edition copy. An existing shared entry
	/// wins over the promoted copy (the remote record of the cluster is
	/// authoritative). Idempotent; called after the alignment table
	/// (re)loads and after every rehydrate.
	pub fn promote_local_to_shared(&mut self) {
		let promotable: Vec<(VerseRef, ClusterId)> = self
			.local_colors
			.keys()
			.chain(self.local_notes.keys())
			.filter_map(|verse| {
				self.resolver
					.cluster_id(verse)
					.map(|cluster| (verse.clone(), cluster))
			})
			.collect();

		for (verse, cluster) in promotable {
			let color = self.local_colors.remove(&verse);
			let note = self.local_notes.remove(&verse);

			if color.is_none() && note.is_none() {
				// Already handled through the other map's key.
				continue;
			}

			if let Some(color) = color {
				self.shared_colors.entry(cluster.clone()).or_insert(color);
			}
			if let Some(note) = note {
				self.shared_notes.entry(cluster.clone()).or_insert(note);
			}

			trace!(%verse, %cluster, "promoted per-edition annotation to shared");
		}
	}

	/// Apply a user edit. Writes the shared tier when the verse's cluster
	/// resolves, the per-edition tier otherwise, and clears per-edition
	/// entries that the alignment now supersedes.
	pub fn apply_edit(&mut self, verse: &VerseRef, action: EditAction) -> EditOutcome {
		let key = match self.resolver.cluster_id(verse) {
			Some(cluster) => AnnotationKey::Shared(cluster),
			None => AnnotationKey::PerEdition(verse.clone()),
		};

		if let AnnotationKey::Shared(cluster) = &key {
			self.absorb_superseded_locals(cluster.clone(), verse);
		}

		match action {
			EditAction::SetHighlight(color) if color.is_none() => {
				self.remove_color(&key);
				self.remove_note(&key);
			}
			EditAction::SetHighlight(color) => {
				self.set_color(&key, color);
			}
			EditAction::SetNote(text) if text.is_empty() => {
				self.remove_note(&key);
			}
			EditAction::SetNote(text) => {
				if self.annotation_at(&key).highlight.is_none() {
					self.set_color(&key, FALLBACK_HIGHLIGHT);
				}
				self.set_note(&key, text);
			}
			EditAction::ClearAll => {
				self.remove_color(&key);
				self.remove_note(&key);
			}
		}

		EditOutcome {
			annotation: self.annotation_at(&key),
			key,
		}
	}

	/// Rebuild the hydrated window from (overlaid) remote records: entries in
	/// the window are replaced wholesale by what the records say. Entries
	/// outside the window are untouched.
	pub fn clear_window(&mut self, window: &HydrateWindow) {
		self.shared_colors
			.retain(|cluster, _| !window.covers_shared(cluster));
		self.shared_notes
			.retain(|cluster, _| !window.covers_shared(cluster));
		self.local_colors
			.retain(|verse, _| !window.covers_local(verse));
		self.local_notes
			.retain(|verse, _| !window.covers_local(verse));
	}

	/// Write the annotation of one hydrated record verse directly at a key,
	/// bypassing edit semantics. Only the hydration path uses this.
	pub fn set_annotation(&mut self, key: &AnnotationKey, annotation: &Annotation) {
		if annotation.highlight.is_none() {
			self.remove_color(key);
		} else {
			self.set_color(key, annotation.highlight);
		}

		match annotation.note.as_deref() {
			Some(note) if !note.is_empty() => self.set_note(key, note.to_string()),
			_ => self.remove_note(key),
		}
	}

	/// The annotation stored directly at a key (no tiered lookup).
	#[must_use]
	pub fn annotation_at(&self, key: &AnnotationKey) -> Annotation {
		match key {
			AnnotationKey::Shared(cluster) => Annotation {
				highlight: self
					.shared_colors
					.get(cluster)
					.copied()
					.unwrap_or(HighlightColor::None),
				note: self.shared_notes.get(cluster).cloned(),
			},
			AnnotationKey::PerEdition(verse) => Annotation {
				highlight: self
					.local_colors
					.get(verse)
					.copied()
					.unwrap_or(HighlightColor::None),
				note: self.local_notes.get(verse).cloned(),
			},
		}
	}

	#[must_use]
	pub fn shared_entry_count(&self) -> usize {
		self.shared_colors.len() + self.shared_notes.len()
	}

	#[must_use]
	pub fn local_entry_count(&self) -> usize {
		self.local_colors.len() + self.local_notes.len()
	}

	/// Fold superseded per-edition entries into an empty shared slot and
	/// remove them: the verse itself, its cross-edition counterparts, and its
	/// same-edition siblings. Keeps a highlight set before alignment loaded
	/// visible after a note edit lands on the shared tier.
	fn absorb_superseded_locals(&mut self, cluster: ClusterId, verse: &VerseRef) {
		let mut superseded = vec![verse.clone()];
		superseded.extend(self.resolver.match_to_other(verse));
		superseded.extend(self.resolver.siblings(verse));

		for stale in superseded {
			if let Some(color) = self.local_colors.remove(&stale) {
				self.shared_colors.entry(cluster.clone()).or_insert(color);
			}
			if let Some(note) = self.local_notes.remove(&stale) {
				self.shared_notes.entry(cluster.clone()).or_insert(note);
			}
		}
	}

	fn set_color(&mut self, key: &AnnotationKey, color: HighlightColor) {
		match key {
			AnnotationKey::Shared(cluster) => {
				self.shared_colors.insert(cluster.clone(), color);
			}
			AnnotationKey::PerEdition(verse) => {
				self.local_colors.insert(verse.clone(), color);
			}
		}
	}

	fn set_note(&mut self, key: &AnnotationKey, note: String) {
		match key {
			AnnotationKey::Shared(cluster) => {
				self.shared_notes.insert(cluster.clone(), note);
			}
			AnnotationKey::PerEdition(verse) => {
				self.local_notes.insert(verse.clone(), note);
			}
		}
	}

	fn remove_color(&mut self, key: &AnnotationKey) {
		match key {
			AnnotationKey::Shared(cluster) => {
				self.shared_colors.remove(cluster);
			}
			AnnotationKey::PerEdition(verse) => {
				self.local_colors.remove(verse);
			}
		}
	}

	fn remove_note(&mut self, key: &AnnotationKey) {
		match key {
			AnnotationKey::Shared(cluster) => {
				self.shared_notes.remove(cluster);
			}
			AnnotationKey::PerEdition(verse) => {
				self.local_notes.remove(verse);
			}
		}
	}
}
