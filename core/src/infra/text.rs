//! Scripture text repository and verse-catalog collaborators.

use async_trait::async_trait;

use crate::domain::{BookId, EditionId, VerseRef};

#[derive(Debug, Clone, thiserror::Error)]
pub enum TextError {
	#[error("chapter unavailable: {book} {chapter} ({edition})")]
	ChapterUnavailable {
		edition: EditionId,
		book: BookId,
		chapter: u32,
	},
}

/// The underlying scripture-text repository.
#[async_trait]
pub trait TextRepository: Send + Sync {
	/// Ordered text of one chapter in one edition.
	async fn chapter_text(
		&self,
		edition: &EditionId,
		book: &BookId,
		chapter: u32,
	) -> Result<Vec<(VerseRef, String)>, TextError>;
}

/// The verse-catalog/book metadata service.
pub trait Catalog: Send + Sync {
	/// Canonical book names in corpus order.
	fn book_names(&self) -> Vec<BookId>;

	/// Number of chapters in a book; 0 for an unknown book.
	fn chapter_count(&self, book: &BookId) -> u32;

	/// Resolve a localized or abbreviated name to the canonical book.
	fn canonical_name(&self, name: &str) -> Option<BookId>;

	/// The book -> chapter-count index used to prime the offline cache.
	fn books_index(&self) -> Vec<(BookId, u32)> {
		self.book_names()
			.into_iter()
			.map(|book| {
				let chapters = self.chapter_count(&book);
				(book, chapters)
			})
			.collect()
	}
}
