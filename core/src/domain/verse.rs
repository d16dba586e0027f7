//! Verse identity types.
//!
//! Every map in the annotation subsystem is keyed by one of these structured
//! value types. Nothing in this crate keys a map by a concatenated string.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A distinct text edition (translation) of the corpus, e.g. `"kjv"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EditionId(String);

impl EditionId {
	pub fn new(id: impl Into<String>) -> Self {
		Self(id.into())
	}

	#[must_use]
	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for EditionId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl From<&str> for EditionId {
	fn from(id: &str) -> Self {
		Self::new(id)
	}
}

/// Canonical English name of a book, as produced by the catalog's
/// `canonical_name`, e.g. `"Genesis"` or `"Song of Solomon"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookId(String);

impl BookId {
	pub fn new(name: impl Into<String>) -> Self {
		Self(name.into())
	}

	#[must_use]
	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for BookId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl From<&str> for BookId {
	fn from(name: &str) -> Self {
		Self::new(name)
	}
}

/// A verse position without an edition: the raw `(book, chapter, verse)`
/// coordinate used by alignment data and remote records.
///
/// Ordered so that a verse aligning to several counterparts can pick the
/// smallest one deterministically.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VerseKey {
	pub book: BookId,
	pub chapter: u32,
	pub verse: u32,
}

impl VerseKey {
	pub fn new(book: impl Into<BookId>, chapter: u32, verse: u32) -> Self {
		Self {
			book: book.into(),
			chapter,
			verse,
		}
	}
}

impl fmt::Display for VerseKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{} {}:{}", self.book, self.chapter, self.verse)
	}
}

/// Identity of one verse within one edition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VerseRef {
	pub edition: EditionId,
	pub key: VerseKey,
}

impl VerseRef {
	pub fn new(
		edition: impl Into<EditionId>,
		book: impl Into<BookId>,
		chapter: u32,
		verse: u32,
	) -> Self {
		Self {
			edition: edition.into(),
			key: VerseKey::new(book, chapter, verse),
		}
	}

	pub fn with_key(edition: impl Into<EditionId>, key: VerseKey) -> Self {
		Self {
			edition: edition.into(),
			key,
		}
	}
}

impl fmt::Display for VerseRef {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{} ({})", self.key, self.edition)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn verse_keys_order_by_book_then_position() {
		let a = VerseKey::new("Psalms", 3, 1);
		let b = VerseKey::new("Psalms", 3, 2);
		let c = VerseKey::new("Psalms", 4, 1);

		assert!(a < b);
		assert!(b < c);
	}

	#[test]
	fn verse_refs_in_different_editions_are_distinct() {
		let kjv = VerseRef::new("kjv", "Genesis", 1, 1);
		let lsg = VerseRef::new("lsg", "Genesis", 1, 1);

		assert_ne!(kjv, lsg);
		assert_eq!(kjv.key, lsg.key);
	}
}
