//! Loaded, read-only verse alignment data between the canonical edition and
//! the secondary edition.
//!
//! The document lists only the *divergences*: explicit many-to-many pairs
//! (possibly crossing chapter boundaries) and verses that exist in one
//! edition only. Every verse the document does not mention maps by identity,
//! which is the overwhelmingly common case. The reverse relation is derived
//! from the pairs on load, so alignment symmetry holds by construction.

use std::{
	collections::{HashMap, HashSet},
	path::Path,
};

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::exceptions;
use crate::domain::{BookId, EditionId, VerseKey};

#[derive(Debug, thiserror::Error)]
pub enum AlignmentError {
	#[error("failed to read alignment data: {0}")]
	Io(#[from] std::io::Error),

	#[error("malformed alignment document: {0}")]
	Parse(#[from] serde_json::Error),

	#[error("alignment document must cover two distinct editions")]
	SameEdition,
}

/// One explicit correspondence: `from` is a canonical-edition verse, `to` the
/// matching verse in the other edition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlignmentPair {
	pub from: VerseKey,
	pub to: VerseKey,
}

/// Verses with no counterpart in the opposite edition.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AbsentVerses {
	#[serde(default)]
	pub canonical: Vec<VerseKey>,
	#[serde(default)]
	pub other: Vec<VerseKey>,
}

/// On-disk shape of the alignment document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlignmentDoc {
	pub canonical: EditionId,
	pub other: EditionId,
	#[serde(default)]
	pub pairs: Vec<AlignmentPair>,
	#[serde(default)]
	pub absent: AbsentVerses,
}

/// The in-memory alignment relation.
#[derive(Debug)]
pub struct AlignmentTable {
	canonical: EditionId,
	other: EditionId,
	forward: HashMap<VerseKey, Vec<VerseKey>>,
	reverse: HashMap<VerseKey, Vec<VerseKey>>,
	absent_canonical: HashSet<VerseKey>,
	absent_other: HashSet<VerseKey>,
}

impl AlignmentTable {
	pub async fn load(path: &Path) -> Result<Self, AlignmentError> {
		let raw = tokio::fs::read_to_string(path).await?;
		let doc: AlignmentDoc = serde_json::from_str(&raw)?;

		Self::from_doc(doc)
	}

	pub fn from_doc(doc: AlignmentDoc) -> Result<Self, AlignmentError> {
		if doc.canonical == doc.other {
			return Err(AlignmentError::SameEdition);
		}

		let mut forward: HashMap<VerseKey, Vec<VerseKey>> = HashMap::new();
		let mut reverse: HashMap<VerseKey, Vec<VerseKey>> = HashMap::new();
		let mut flagged_books: HashSet<BookId> = HashSet::new();

		for pair in doc.pairs {
			let crosses_chapter =
				pair.from.book != pair.to.book || pair.from.chapter != pair.to.chapter;

			if crosses_chapter
				&& !exceptions::is_known_cross_chapter_book(&pair.from.book)
				&& flagged_books.insert(pair.from.book.clone())
			{
				// Loaded anyway, but the divergence rule for this book is not
				// in the exception table and needs a human to confirm it.
				warn!(
					book = %pair.from.book,
					"cross-chapter alignment outside the exception table; flagging for manual review"
				);
			}

			forward
				.entry(pair.from.clone())
				.or_default()
				.push(pair.to.clone());
			reverse.entry(pair.to).or_default().push(pair.from);
		}

		for matches in forward.values_mut().chain(reverse.values_mut()) {
			matches.sort();
			matches.dedup();
		}

		Ok(Self {
			canonical: doc.canonical,
			other: doc.other,
			forward,
			reverse,
			absent_canonical: doc.absent.canonical.into_iter().collect(),
			absent_other: doc.absent.other.into_iter().collect(),
		})
	}

	#[must_use]
	pub fn canonical(&self) -> &EditionId {
		&self.canonical
	}

	#[must_use]
	pub fn other(&self) -> &EditionId {
		&self.other
	}

	/// Counterparts in the other edition of a canonical-edition verse.
	/// Unlisted verses map by identity.
	#[must_use]
	pub fn to_other(&self, key: &VerseKey) -> Vec<VerseKey> {
		if self.absent_canonical.contains(key) {
			return Vec::new();
		}

		self.forward
			.get(key)
			.cloned()
			.unwrap_or_else(|| vec![key.clone()])
	}

	/// Canonical counterparts of a secondary-edition verse. Unlisted verses
	/// map by identity.
	#[must_use]
	pub fn to_canonical(&self, key: &VerseKey) -> Vec<VerseKey> {
		if self.absent_other.contains(key) {
			return Vec::new();
		}

		self.reverse
			.get(key)
			.cloned()
			.unwrap_or_else(|| vec![key.clone()])
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;

	fn doc() -> AlignmentDoc {
		AlignmentDoc {
			canonical: EditionId::new("kjv"),
			other: EditionId::new("lsg"),
			pairs: vec![
				AlignmentPair {
					from: VerseKey::new("Psalms", 51, 1),
					to: VerseKey::new("Psalms", 51, 3),
				},
				AlignmentPair {
					from: VerseKey::new("Joel", 2, 28),
					to: VerseKey::new("Joel", 3, 1),
				},
			],
			absent: AbsentVerses {
				canonical: vec![VerseKey::new("Acts", 8, 37)],
				other: vec![VerseKey::new("Psalms", 51, 1)],
			},
		}
	}

	#[test]
	fn explicit_pairs_override_identity() {
		let table = AlignmentTable::from_doc(doc()).unwrap();

		assert_eq!(
			table.to_other(&VerseKey::new("Psalms", 51, 1)),
			vec![VerseKey::new("Psalms", 51, 3)]
		);
	}

	#[test]
	fn unlisted_verses_map_by_identity() {
		let table = AlignmentTable::from_doc(doc()).unwrap();
		let key = VerseKey::new("Genesis", 1, 1);

		assert_eq!(table.to_other(&key), vec![key.clone()]);
		assert_eq!(table.to_canonical(&key), vec![key]);
	}

	#[test]
	fn absent_verses_have_no_counterpart() {
		let table = AlignmentTable::from_doc(doc()).unwrap();

		assert!(table.to_other(&VerseKey::new("Acts", 8, 37)).is_empty());
		assert!(table.to_canonical(&VerseKey::new("Psalms", 51, 1)).is_empty());
	}

	#[test]
	fn reverse_relation_is_symmetric() {
		let table = AlignmentTable::from_doc(doc()).unwrap();

		for (from, targets) in &table.forward {
			for to in targets {
				assert!(
					table.to_canonical(to).contains(from),
					"{to} should map back to {from}"
				);
			}
		}
	}

	#[test]
	fn same_edition_is_rejected() {
		let mut bad = doc();
		bad.other = bad.canonical.clone();

		assert!(matches!(
			AlignmentTable::from_doc(bad),
			Err(AlignmentError::SameEdition)
		));
	}
}
