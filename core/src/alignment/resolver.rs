//! Cluster resolution over the alignment table.
//!
//! The resolver is constructed empty and degrades gracefully: until a table
//! is installed every query answers "no match", so annotations fall back to
//! per-edition storage instead of erroring. Installing (or re-installing) a
//! table flips the readiness flag; the annotation store is promoted right
//! after.

use std::sync::{Arc, RwLock};

use crate::domain::{ClusterId, VerseRef};

use super::table::AlignmentTable;

#[derive(Debug, Default)]
pub struct ClusterResolver {
	table: RwLock<Option<Arc<AlignmentTable>>>,
}

impl ClusterResolver {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	/// Install freshly loaded alignment data. May be called again on reload;
	/// callers re-promote the annotation store afterwards.
	pub fn install(&self, table: Arc<AlignmentTable>) {
		*self
			.table
			.write()
			.expect("alignment table lock poisoned") = Some(table);
	}

	#[must_use]
	pub fn is_ready(&self) -> bool {
		self.snapshot().is_some()
	}

	fn snapshot(&self) -> Option<Arc<AlignmentTable>> {
		self.table
			.read()
			.expect("alignment table lock poisoned")
			.clone()
	}

	/// The stable cluster identifier of a verse, seeded from the canonical
	/// edition. `None` when alignment is unavailable, the edition is not
	/// covered by the table, or the verse has no canonical counterpart.
	#[must_use]
	pub fn cluster_id(&self, verse: &VerseRef) -> Option<ClusterId> {
		let table = self.snapshot()?;

		if verse.edition == *table.canonical() {
			return Some(ClusterId::from_canonical(verse.key.clone()));
		}

		if verse.edition == *table.other() {
			return table
				.to_canonical(&verse.key)
				.into_iter()
				.min()
				.map(ClusterId::from_canonical);
		}

		None
	}

	/// Counterpart verses in the other edition: zero, one, or many, possibly
	/// across chapter boundaries.
	#[must_use]
	pub fn match_to_other(&self, verse: &VerseRef) -> Vec<VerseRef> {
		let Some(table) = self.snapshot() else {
			return Vec::new();
		};

		if verse.edition == *table.canonical() {
			table
				.to_other(&verse.key)
				.into_iter()
				.map(|key| VerseRef::with_key(table.other().clone(), key))
				.collect()
		} else if verse.edition == *table.other() {
			table
				.to_canonical(&verse.key)
				.into_iter()
				.map(|key| VerseRef::with_key(table.canonical().clone(), key))
				.collect()
		} else {
			Vec::new()
		}
	}

	#[must_use]
	pub fn exists_in_other(&self, verse: &VerseRef) -> bool {
		!self.match_to_other(verse).is_empty()
	}

	/// Restricted variant of [`match_to_other`](Self::match_to_other) that
	/// keeps only chapter-crossing equivalences, and only for books in the
	/// cross-chapter exception table. Used to detect internal numbering
	/// divergence (Psalm superscriptions and the like) without polluting
	/// ordinary same-chapter alignment.
	#[must_use]
	pub fn match_to_other_rule_only(&self, verse: &VerseRef) -> Vec<VerseRef> {
		if !super::exceptions::is_known_cross_chapter_book(&verse.key.book) {
			return Vec::new();
		}

		self.match_to_other(verse)
			.into_iter()
			.filter(|counterpart| {
				counterpart.key.book != verse.key.book
					|| counterpart.key.chapter != verse.key.chapter
			})
			.collect()
	}

	/// Same-edition verses (excluding the input) that reach the same
	/// counterpart cluster through the other edition. These are the "sibling"
	/// refs of lookup tier 4: editions with internal numbering variants reach
	/// a previously stored per-edition entry through them.
	#[must_use]
	pub fn siblings(&self, verse: &VerseRef) -> Vec<VerseRef> {
		let mut siblings: Vec<VerseRef> = self
			.match_to_other(verse)
			.iter()
			.flat_map(|counterpart| self.match_to_other(counterpart))
			.filter(|candidate| candidate != verse)
			.collect();

		siblings.sort_by(|a, b| a.key.cmp(&b.key));
		siblings.dedup();
		siblings
	}
}
