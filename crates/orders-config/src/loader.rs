//! Loading of configuration spread over several files.
//!
//! The entry file and every file it includes are parsed separately, their
//! top-level sections are merged, and the merged document is deserialized
//! once. A section defined in two files is rejected rather than merged.

use crate::{resolve_env_vars, Config, ConfigError};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// Loader that follows `include` directives.
pub(crate) struct ConfigLoader {
	/// Directory the entry file is resolved against.
	base_path: PathBuf,
	/// Canonical paths already read, for circular include detection.
	loaded_files: HashSet<PathBuf>,
	/// File each top-level section came from, for error reporting.
	section_sources: HashMap<String, PathBuf>,
}

impl ConfigLoader {
	pub fn new(base_path: impl AsRef<Path>) -> Self {
		Self {
			base_path: base_path.as_ref().to_path_buf(),
			loaded_files: HashSet::new(),
			section_sources: HashMap::new(),
		}
	}

	/// Loads the entry file and all of its includes into one `Config`.
	pub async fn load_config(&mut self, config_path: impl AsRef<Path>) -> Result<Config, ConfigError> {
		let mut merged = toml::Table::new();
		let mut pending = vec![self.base_path.join(config_path)];

		while let Some(path) = pending.pop() {
			let mut table = self.load_file(&path).await?;

			let dir = path.parent().unwrap_or_else(|| Path::new("."));
			for include in extract_includes(&mut table)? {
				pending.push(dir.join(include));
			}

			for (section, value) in table {
				if let Some(previous) = self.section_sources.get(&section) {
					return Err(ConfigError::Validation(format!(
						"Section '{}' is defined in both {} and {}",
						section,
						previous.display(),
						path.display()
					)));
				}
				self.section_sources.insert(section.clone(), path.clone());
				merged.insert(section, value);
			}
		}

		Config::from_toml(toml::Value::Table(merged))
	}

	/// Reads one file, resolves environment variables and parses it.
	async fn load_file(&mut self, path: &Path) -> Result<toml::Table, ConfigError> {
		let canonical = tokio::fs::canonicalize(path).await.map_err(|e| {
			ConfigError::Io(std::io::Error::new(
				e.kind(),
				format!("Cannot resolve path {}: {}", path.display(), e),
			))
		})?;

		if !self.loaded_files.insert(canonical.clone()) {
			return Err(ConfigError::Validation(format!(
				"Circular include detected: {} was already loaded",
				canonical.display()
			)));
		}

		let content = tokio::fs::read_to_string(&canonical).await?;
		let resolved = resolve_env_vars(&content)?;
		Ok(toml::from_str(&resolved)?)
	}
}

/// Removes the `include` key from a parsed file and returns its entries.
fn extract_includes(table: &mut toml::Table) -> Result<Vec<PathBuf>, ConfigError> {
	match table.remove("include") {
		None => Ok(Vec::new()),
		Some(toml::Value::String(path)) => Ok(vec![PathBuf::from(path)]),
		Some(toml::Value::Array(items)) => items
			.into_iter()
			.map(|item| match item {
				toml::Value::String(path) => Ok(PathBuf::from(path)),
				_ => Err(ConfigError::Validation(
					"Include array must contain only strings".into(),
				)),
			})
			.collect(),
		Some(_) => Err(ConfigError::Validation(
			"Include must be a string or array of strings".into(),
		)),
	}
}
