//! Offline-capable synchronization with the remote annotation store:
//! - durable outbox of pending writes
//! - disk-backed chapter cache for offline reads
//! - the outbox-backed sync client
//! - the orchestrator reacting to connectivity, identity and flush events

pub mod cache;
pub mod client;
pub mod orchestrator;
pub mod outbox;

pub use cache::{ChapterCache, ChapterKey};
pub use client::SyncClient;
pub use orchestrator::{CurrentView, SyncOrchestrator};
pub use outbox::{Outbox, OutboxEntry, OutboxOp, PersistError};

use crate::domain::RecordId;

/// Emitted by the sync client, once per successfully drained outbox entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
	Flushed { id: RecordId },
}
