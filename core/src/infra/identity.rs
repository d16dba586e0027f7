//! Identity collaborator: current user and sign-in/out transitions.

use std::fmt;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
	pub fn new(id: impl Into<String>) -> Self {
		Self(id.into())
	}

	#[must_use]
	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for UserId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

/// Source of authentication state. The stream yields the new current user on
/// sign-in and `None` on sign-out.
pub trait Identity: Send + Sync {
	fn current(&self) -> Option<UserId>;

	fn subscribe(&self) -> broadcast::Receiver<Option<UserId>>;
}
