//! Back-index from annotation keys to remote record ids.
//!
//! Rebuilt on every hydrate of a chapter window and mutated incrementally on
//! create/delete, so the write-through path can decide between create, update
//! and delete without a remote read.

use std::collections::HashMap;

use crate::domain::{AnnotationKey, ClusterId, RecordId, VerseKey};

#[derive(Debug, Default)]
pub struct RemoteIdIndex {
	by_verse_key: HashMap<VerseKey, RecordId>,
	by_cluster: HashMap<ClusterId, RecordId>,
}

impl RemoteIdIndex {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	pub fn clear(&mut self) {
		self.by_verse_key.clear();
		self.by_cluster.clear();
	}

	pub fn insert(&mut self, key: &AnnotationKey, id: RecordId) {
		match key {
			AnnotationKey::Shared(cluster) => {
				self.by_cluster.insert(cluster.clone(), id);
				self.by_verse_key.insert(cluster.canonical_key().clone(), id);
			}
			AnnotationKey::PerEdition(verse) => {
				self.by_verse_key.insert(verse.key.clone(), id);
			}
		}
	}

	pub fn remove(&mut self, key: &AnnotationKey) -> Option<RecordId> {
		match key {
			AnnotationKey::Shared(cluster) => {
				self.by_verse_key.remove(cluster.canonical_key());
				self.by_cluster.remove(cluster)
			}
			AnnotationKey::PerEdition(verse) => self.by_verse_key.remove(&verse.key),
		}
	}

	/// The record id backing this key, if one is known. A shared key falls
	/// back to its canonical verse coordinates, which covers records indexed
	/// before alignment data finished loading.
	#[must_use]
	pub fn get(&self, key: &AnnotationKey) -> Option<RecordId> {
		match key {
			AnnotationKey::Shared(cluster) => self
				.by_cluster
				.get(cluster)
				.or_else(|| self.by_verse_key.get(cluster.canonical_key()))
				.copied(),
			AnnotationKey::PerEdition(verse) => self.by_verse_key.get(&verse.key).copied(),
		}
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.by_verse_key.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.by_verse_key.is_empty() && self.by_cluster.is_empty()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::domain::VerseRef;

	#[test]
	fn shared_keys_index_both_maps() {
		let mut index = RemoteIdIndex::new();
		let id = RecordId::new();
		let key = AnnotationKey::Shared(ClusterId::from_canonical(VerseKey::new(
			"John", 3, 16,
		)));

		index.insert(&key, id);

		assert_eq!(index.get(&key), Some(id));
		assert_eq!(
			index.get(&AnnotationKey::PerEdition(VerseRef::new("kjv", "John", 3, 16))),
			Some(id)
		);

		index.remove(&key);
		assert!(index.is_empty());
	}

	#[test]
	fn per_edition_record_found_through_shared_key() {
		let mut index = RemoteIdIndex::new();
		let id = RecordId::new();

		// Indexed before alignment loaded, under raw verse coordinates.
		index.insert(
			&AnnotationKey::PerEdition(VerseRef::new("kjv", "John", 3, 16)),
			id,
		);

		// Found again once the same verse resolves to a cluster.
		let shared = AnnotationKey::Shared(ClusterId::from_canonical(VerseKey::new(
			"John", 3, 16,
		)));
		assert_eq!(index.get(&shared), Some(id));
	}
}
