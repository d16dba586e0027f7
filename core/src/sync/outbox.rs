//! Durable queue of pending remote writes.
//!
//! Entries survive process restarts while offline: the queue is rewritten to
//! a MessagePack file through a temp-file-plus-rename after every mutation. A
//! malformed file on load is treated as an empty queue (cache-corrupt means
//! cache-miss, never an error), and entries are only ever applied remotely in
//! enqueue order.

use std::{
	collections::{HashSet, VecDeque},
	fs,
	path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::domain::{RecordId, RecordPatch, RemoteRecord};

const OUTBOX_FILE: &str = "outbox.bin";

#[derive(Debug, thiserror::Error)]
pub enum PersistError {
	#[error("failed to persist sync state: {0}")]
	Io(#[from] std::io::Error),

	#[error("failed to encode sync state: {0}")]
	Encode(#[from] rmp_serde::encode::Error),
}

/// A pending create/update/delete against the remote annotation store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutboxOp {
	Create { record: RemoteRecord },
	Update { id: RecordId, patch: RecordPatch },
	Delete { id: RecordId },
}

impl OutboxOp {
	/// The record this operation targets. Doubles as the idempotency key for
	/// creates, since record ids are client-generated.
	#[must_use]
	pub fn record_id(&self) -> RecordId {
		match self {
			Self::Create { record } => record.id,
			Self::Update { id, .. } | Self::Delete { id } => *id,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboxEntry {
	pub op: OutboxOp,
	pub enqueued_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct Outbox {
	path: PathBuf,
	entries: VecDeque<OutboxEntry>,
}

impl Outbox {
	/// Load the persisted queue from the data directory, recovering an empty
	/// queue from a missing or malformed file.
	pub fn load(data_dir: &Path) -> Self {
		let path = data_dir.join(OUTBOX_FILE);

		let entries = match fs::read(&path) {
			Ok(bytes) => match rmp_serde::from_slice::<VecDeque<OutboxEntry>>(&bytes) {
				Ok(entries) => entries,
				Err(e) => {
					warn!(path = %path.display(), ?e, "corrupt outbox file; starting empty");
					VecDeque::new()
				}
			},
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => VecDeque::new(),
			Err(e) => {
				warn!(path = %path.display(), ?e, "unreadable outbox file; starting empty");
				VecDeque::new()
			}
		};

		if !entries.is_empty() {
			debug!(pending = entries.len(), "restored outbox entries from disk");
		}

		Self { path, entries }
	}

	/// Append an operation. On a persistence failure the entry is kept in
	/// memory so the edit is not lost within this process; the next
	/// successful persist writes it out.
	pub fn push(&mut self, op: OutboxOp) -> Result<(), PersistError> {
		self.entries.push_back(OutboxEntry {
			op,
			enqueued_at: Utc::now(),
		});

		self.persist()
	}

	#[must_use]
	pub fn front(&self) -> Option<&OutboxEntry> {
		self.entries.front()
	}

	pub fn pop_front(&mut self) -> Result<Option<OutboxEntry>, PersistError> {
		let entry = self.entries.pop_front();

		if entry.is_some() {
			self.persist()?;
		}

		Ok(entry)
	}

	pub fn clear(&mut self) -> Result<(), PersistError> {
		self.entries.clear();
		self.persist()
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.entries.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	pub fn iter(&self) -> impl Iterator<Item = &OutboxEntry> {
		self.entries.iter()
	}

	/// Ids referenced by queued operations. Fetched remote state for these
	/// records is stale by definition: the local queue is newer.
	#[must_use]
	pub fn pending_ids(&self) -> HashSet<RecordId> {
		self.entries
			.iter()
			.map(|entry| entry.op.record_id())
			.collect()
	}

	fn persist(&self) -> Result<(), PersistError> {
		let bytes = rmp_serde::to_vec(&self.entries)?;
		let tmp = self.path.with_extension("bin.tmp");

		fs::write(&tmp, bytes)?;
		fs::rename(&tmp, &self.path)?;

		Ok(())
	}
}
