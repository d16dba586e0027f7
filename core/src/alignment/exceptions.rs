//! Books with known cross-chapter verse-numbering divergence.
//!
//! A handful of books shift verse or chapter boundaries between versification
//! traditions (Hebrew numbering counts Psalm superscriptions as verse 1, Joel
//! 2:28-32 becomes Joel 3:1-5, and so on). Cross-chapter matching is only
//! honored for books on this list; alignment data that maps across a chapter
//! boundary in any other book is loaded but flagged for manual review, since
//! the divergence rule is an enumerated exception table, not something we try
//! to infer.

use once_cell::sync::Lazy;
use std::collections::HashSet;

use crate::domain::BookId;

static CROSS_CHAPTER_BOOKS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
	[
		"Psalms",
		"Song of Solomon",
		"Joel",
		"Jonah",
		"Malachi",
	]
	.into_iter()
	.collect()
});

/// Whether cross-chapter alignment entries are expected for this book.
#[must_use]
pub fn is_known_cross_chapter_book(book: &BookId) -> bool {
	CROSS_CHAPTER_BOOKS.contains(book.as_str())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn psalms_is_a_known_exception() {
		assert!(is_known_cross_chapter_book(&BookId::new("Psalms")));
	}

	#[test]
	fn genesis_is_not() {
		assert!(!is_known_cross_chapter_book(&BookId::new("Genesis")));
	}
}
