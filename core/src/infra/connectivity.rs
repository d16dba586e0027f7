//! Connectivity collaborator: an ordered stream of online/offline
//! transitions plus a synchronous "check now" query.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// The two observed connectivity states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
	Online,
	Offline,
}

impl ConnectionState {
	#[must_use]
	pub fn is_online(self) -> bool {
		self == Self::Online
	}
}

/// Source of connectivity information.
///
/// `check_now` must answer synchronously so the orchestrator can publish an
/// initial state before the first async event arrives.
pub trait Connectivity: Send + Sync {
	fn check_now(&self) -> ConnectionState;

	fn subscribe(&self) -> broadcast::Receiver<ConnectionState>;
}
