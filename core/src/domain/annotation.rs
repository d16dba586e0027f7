//! Highlight and note model, plus the two-tier annotation keys.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use super::verse::{VerseKey, VerseRef};

/// The fixed palette a verse can be highlighted with.
///
/// `None` means "not highlighted" and is the default; the remaining variants
/// are the named colors offered by the presentation layer. The wire format is
/// the snake_case variant name.
#[derive(
	Debug,
	Clone,
	Copy,
	Default,
	PartialEq,
	Eq,
	Hash,
	Serialize,
	Deserialize,
	Display,
	EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum HighlightColor {
	#[default]
	None,
	Yellow,
	Green,
	Blue,
	Pink,
	Orange,
	Purple,
}

impl HighlightColor {
	#[must_use]
	pub fn is_none(self) -> bool {
		self == Self::None
	}
}

/// The effective annotation state of one verse (or one cluster).
///
/// Invariant: a non-empty note implies `highlight != None`. The store enforces
/// this on every mutation, so a value read back from it always satisfies it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
	pub highlight: HighlightColor,
	pub note: Option<String>,
}

impl Annotation {
	pub fn new(highlight: HighlightColor, note: Option<String>) -> Self {
		Self { highlight, note }
	}

	/// True when there is neither a highlight nor a note, i.e. the verse
	/// carries no annotation and its remote record (if any) should be deleted.
	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.highlight.is_none() && self.note.as_deref().map_or(true, str::is_empty)
	}
}

/// Stable identifier for the cross-edition equivalence class of a verse.
///
/// Seeded from the canonical edition's coordinates: two [`VerseRef`]s in
/// different editions that the alignment table declares equivalent resolve to
/// the same `ClusterId`. When a verse aligns to several canonical verses, the
/// smallest canonical coordinate seeds the cluster so derivation stays
/// deterministic.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClusterId(VerseKey);

impl ClusterId {
	pub fn from_canonical(key: VerseKey) -> Self {
		Self(key)
	}

	#[must_use]
	pub fn canonical_key(&self) -> &VerseKey {
		&self.0
	}
}

impl fmt::Display for ClusterId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}.{}.{}", self.0.book, self.0.chapter, self.0.verse)
	}
}

/// Where an annotation is stored: shared across editions under its cluster,
/// or pinned to one edition's raw verse coordinates when no alignment is
/// known for it (yet).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AnnotationKey {
	Shared(ClusterId),
	PerEdition(VerseRef),
}

impl AnnotationKey {
	/// The verse coordinates a remote record for this key is written under:
	/// the canonical coordinates for a shared key, the edition's own
	/// coordinates for a per-edition key.
	#[must_use]
	pub fn record_key(&self) -> &VerseKey {
		match self {
			Self::Shared(cluster) => cluster.canonical_key(),
			Self::PerEdition(verse) => &verse.key,
		}
	}
}
