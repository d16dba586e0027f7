//! Disk-backed read cache of remote annotation records, keyed by book and
//! chapter.
//!
//! Holds the last server truth per chapter so repeated hydration while
//! offline returns the last known data instead of failing, including after a
//! restart. Pending local writes are overlaid on top by the sync client at
//! read time; the cache itself only ever stores what the server said.

use std::{
	collections::HashMap,
	fs,
	path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::domain::{BookId, RemoteRecord};

use super::outbox::PersistError;

const CACHE_FILE: &str = "chapter_cache.bin";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChapterKey {
	pub book: BookId,
	pub chapter: u32,
}

#[derive(Debug)]
pub struct ChapterCache {
	path: PathBuf,
	chapters: HashMap<ChapterKey, Vec<RemoteRecord>>,
}

impl ChapterCache {
	/// Load the persisted cache, recovering empty from a missing or malformed
	/// file.
	pub fn load(data_dir: &Path) -> Self {
		let path = data_dir.join(CACHE_FILE);

		let chapters = match fs::read(&path) {
			Ok(bytes) => match rmp_serde::from_slice(&bytes) {
				Ok(chapters) => chapters,
				Err(e) => {
					warn!(path = %path.display(), ?e, "corrupt chapter cache; starting empty");
					HashMap::new()
				}
			},
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
			Err(e) => {
				warn!(path = %path.display(), ?e, "unreadable chapter cache; starting empty");
				HashMap::new()
			}
		};

		Self { path, chapters }
	}

	/// Replace the cached server truth for every chapter in the inclusive
	/// range with the records of a successful fetch.
	pub fn put_range(
		&mut self,
		book: &BookId,
		chapter_start: u32,
		chapter_end: u32,
		records: &[RemoteRecord],
	) -> Result<(), PersistError> {
		for chapter in chapter_start..=chapter_end {
			let key = ChapterKey {
				book: book.clone(),
				chapter,
			};

			let overlapping: Vec<RemoteRecord> = records
				.iter()
				.filter(|record| record.book == *book && record.overlaps_chapter(chapter))
				.cloned()
				.collect();

			if overlapping.is_empty() {
				self.chapters.remove(&key);
			} else {
				self.chapters.insert(key, overlapping);
			}
		}

		self.persist()
	}

	/// Last known records for the inclusive chapter range, deduplicated by
	/// record id.
	#[must_use]
	pub fn get_range(
		&self,
		book: &BookId,
		chapter_start: u32,
		chapter_end: u32,
	) -> Vec<RemoteRecord> {
		let mut seen = std::collections::HashSet::new();
		let mut records = Vec::new();

		for chapter in chapter_start..=chapter_end {
			let key = ChapterKey {
				book: book.clone(),
				chapter,
			};

			for record in self.chapters.get(&key).into_iter().flatten() {
				if seen.insert(record.id) {
					records.push(record.clone());
				}
			}
		}

		records
	}

	pub fn clear(&mut self) -> Result<(), PersistError> {
		self.chapters.clear();
		self.persist()
	}

	#[must_use]
	pub fn chapter_count(&self) -> usize {
		self.chapters.len()
	}

	fn persist(&self) -> Result<(), PersistError> {
		let bytes = rmp_serde::to_vec(&self.chapters)?;
		let tmp = self.path.with_extension("bin.tmp");

		fs::write(&tmp, bytes)?;
		fs::rename(&tmp, &self.path)?;

		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;
	use tempfile::TempDir;

	use super::*;
	use crate::domain::{Annotation, HighlightColor, VerseKey};

	fn record(book: &str, chapter: u32, verse: u32) -> RemoteRecord {
		RemoteRecord::draft(
			&VerseKey::new(book, chapter, verse),
			&Annotation::new(HighlightColor::Yellow, None),
		)
	}

	#[test]
	fn cached_range_comes_back_after_reload() {
		let dir = TempDir::new().unwrap();
		let stored = record("John", 3, 16);

		{
			let mut cache = ChapterCache::load(dir.path());
			cache
				.put_range(&BookId::new("John"), 2, 4, &[stored.clone()])
				.unwrap();
		}

		let cache = ChapterCache::load(dir.path());
		assert_eq!(cache.get_range(&BookId::new("John"), 2, 4), vec![stored]);
	}

	#[test]
	fn refetch_replaces_server_truth() {
		let dir = TempDir::new().unwrap();
		let mut cache = ChapterCache::load(dir.path());
		let book = BookId::new("John");

		cache.put_range(&book, 3, 3, &[record("John", 3, 16)]).unwrap();
		cache.put_range(&book, 3, 3, &[]).unwrap();

		assert!(cache.get_range(&book, 3, 3).is_empty());
	}

	#[test]
	fn corrupt_cache_recovers_empty() {
		let dir = TempDir::new().unwrap();
		fs::write(dir.path().join(CACHE_FILE), b"\x00garbage").unwrap();

		let cache = ChapterCache::load(dir.path());
		assert_eq!(cache.chapter_count(), 0);
	}
}
