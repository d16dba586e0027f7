//! Remote annotation API consumed by the sync client.
//!
//! Transport is an implementation choice of the host app; the contract that
//! matters here is that `create` is idempotent by [`RecordId`], so a retried
//! outbox entry can never double-apply.

use async_trait::async_trait;

use crate::domain::{BookId, RecordId, RecordPatch, RemoteRecord};

#[derive(Debug, Clone, thiserror::Error)]
pub enum RemoteApiError {
	/// Transport-level failure: the write belongs in the outbox, the read
	/// falls back to cache.
	#[error("remote unreachable: {0}")]
	Unreachable(String),

	/// The server understood the request and refused it. Permanent; never
	/// silently retried.
	#[error("remote rejected request: {0}")]
	Rejected(String),
}

impl RemoteApiError {
	#[must_use]
	pub fn is_transient(&self) -> bool {
		matches!(self, Self::Unreachable(_))
	}
}

#[async_trait]
pub trait RemoteAnnotationApi: Send + Sync {
	/// Fetch all records overlapping the inclusive chapter range of a book.
	async fn fetch_range(
		&self,
		book: &BookId,
		chapter_start: u32,
		chapter_end: u32,
	) -> Result<Vec<RemoteRecord>, RemoteApiError>;

	/// Create a record. Must be idempotent: a second create with the same
	/// `record.id` is a no-op.
	async fn create(&self, record: &RemoteRecord) -> Result<(), RemoteApiError>;

	async fn update(&self, id: RecordId, patch: &RecordPatch) -> Result<(), RemoteApiError>;

	async fn delete(&self, id: RecordId) -> Result<(), RemoteApiError>;
}
