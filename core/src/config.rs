//! Core configuration, stored as a versioned JSON file in the data
//! directory.

use std::{fs, path::PathBuf, time::Duration};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::domain::EditionId;

const CONFIG_FILE: &str = "lectio.json";
const TARGET_VERSION: u32 = 1;

fn default_fetch_timeout_secs() -> u64 {
	10
}

fn default_hydrate_radius() -> u32 {
	1
}

/// Main configuration of the reader/sync core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
	/// Config schema version
	pub version: u32,

	/// Data directory path (outbox, chapter cache, config itself)
	pub data_dir: PathBuf,

	/// Logging level
	pub log_level: String,

	/// The alignment anchor: cluster ids are seeded from this edition
	pub canonical_edition: EditionId,

	/// The second edition the alignment table covers
	pub secondary_edition: EditionId,

	/// Upper bound on a single remote fetch, so a stalled request cannot
	/// block the sync sequence indefinitely
	#[serde(default = "default_fetch_timeout_secs")]
	pub fetch_timeout_secs: u64,

	/// Chapters hydrated around the current one (current ± radius)
	#[serde(default = "default_hydrate_radius")]
	pub hydrate_radius: u32,
}

impl CoreConfig {
	/// Load configuration from a data directory, creating the default file
	/// if none exists.
	pub fn load_or_create(data_dir: &PathBuf) -> Result<Self> {
		let path = data_dir.join(CONFIG_FILE);

		if path.exists() {
			info!("Loading config from {:?}", path);
			let json = fs::read_to_string(&path)?;
			let mut config: CoreConfig = serde_json::from_str(&json)?;

			if config.version < TARGET_VERSION {
				info!(
					"Migrating config from v{} to v{}",
					config.version, TARGET_VERSION
				);
				config.version = TARGET_VERSION;
				config.save()?;
			}

			Ok(config)
		} else {
			warn!("No config found, creating default at {:?}", path);
			let config = Self::default_with_dir(data_dir.clone());
			config.save()?;
			Ok(config)
		}
	}

	#[must_use]
	pub fn default_with_dir(data_dir: PathBuf) -> Self {
		Self {
			version: TARGET_VERSION,
			data_dir,
			log_level: "info".to_string(),
			canonical_edition: EditionId::new("kjv"),
			secondary_edition: EditionId::new("lsg"),
			fetch_timeout_secs: default_fetch_timeout_secs(),
			hydrate_radius: default_hydrate_radius(),
		}
	}

	pub fn save(&self) -> Result<()> {
		fs::create_dir_all(&self.data_dir)?;

		let path = self.data_dir.join(CONFIG_FILE);
		let json = serde_json::to_string_pretty(self)?;
		fs::write(&path, json)?;

		Ok(())
	}

	#[must_use]
	pub fn fetch_timeout(&self) -> Duration {
		Duration::from_secs(self.fetch_timeout_secs)
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;
	use tempfile::TempDir;

	use super::*;

	#[test]
	fn creates_and_reloads_default_config() {
		let dir = TempDir::new().unwrap();
		let data_dir = dir.path().to_path_buf();

		let created = CoreConfig::load_or_create(&data_dir).unwrap();
		assert_eq!(created.version, TARGET_VERSION);
		assert_eq!(created.hydrate_radius, 1);

		let reloaded = CoreConfig::load_or_create(&data_dir).unwrap();
		assert_eq!(reloaded.canonical_edition, created.canonical_edition);
	}

	#[test]
	fn missing_optional_fields_fall_back_to_defaults() {
		let dir = TempDir::new().unwrap();
		let data_dir = dir.path().to_path_buf();

		let json = serde_json::json!({
			"version": 1,
			"data_dir": data_dir,
			"log_level": "debug",
			"canonical_edition": "kjv",
			"secondary_edition": "lsg",
		});
		fs::write(data_dir.join(CONFIG_FILE), json.to_string()).unwrap();

		let config = CoreConfig::load_or_create(&data_dir).unwrap();
		assert_eq!(config.fetch_timeout_secs, 10);
		assert_eq!(config.hydrate_radius, 1);
	}
}
