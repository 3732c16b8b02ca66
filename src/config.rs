// Run configuration: display widths, export target and the category palette
// Loaded from an optional JSON file, then overridden by command-line flags.

use crate::rows::DisplayWidths;
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_OUTPUT_FILE: &str = "out.csv";

/// Settings for one triage session
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Width of the description column
    pub desc_len: usize,
    /// Width of the category column
    pub cat_len: usize,
    /// Export target; relative paths resolve against the working directory
    pub output_file: String,
    /// Categories offered for re-categorization, in key order 1..9
    pub categories: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        let widths = DisplayWidths::default();
        Config {
            desc_len: widths.desc_len,
            cat_len: widths.cat_len,
            output_file: DEFAULT_OUTPUT_FILE.to_string(),
            categories: ["Apartment", "Food", "Rent", "Monthly Gift"]
                .iter()
                .map(|c| c.to_string())
                .collect(),
        }
    }
}

impl Config {
    /// Load config from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

        let config: Config =
            serde_json::from_str(&content).context("Failed to parse config JSON")?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults, or the given file if any
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Config::from_file(path),
            None => Ok(Config::default()),
        }
    }

    /// Apply command-line overrides and re-validate
    pub fn with_overrides(
        mut self,
        desc_len: Option<usize>,
        cat_len: Option<usize>,
        output_file: Option<String>,
    ) -> Result<Self> {
        if let Some(desc_len) = desc_len {
            self.desc_len = desc_len;
        }
        if let Some(cat_len) = cat_len {
            self.cat_len = cat_len;
        }
        if let Some(output_file) = output_file {
            self.output_file = output_file;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.desc_len == 0 || self.cat_len == 0 {
            bail!(
                "column widths must be positive (desc_len={}, cat_len={})",
                self.desc_len,
                self.cat_len
            );
        }
        if self.categories.is_empty() {
            bail!("at least one category is required");
        }
        if self.categories.len() > 9 {
            bail!(
                "at most 9 categories can be bound to keys, got {}",
                self.categories.len()
            );
        }
        if self.output_name().is_none() {
            bail!("output file '{}' has no file name", self.output_file);
        }
        Ok(())
    }

    pub fn widths(&self) -> DisplayWidths {
        DisplayWidths::new(self.desc_len, self.cat_len)
    }

    pub fn output_path(&self) -> PathBuf {
        PathBuf::from(&self.output_file)
    }

    /// File name of the export target, excluded from ingestion
    pub fn output_name(&self) -> Option<String> {
        Path::new(&self.output_file)
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.to_string())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.widths(), DisplayWidths::new(50, 20));
        assert_eq!(config.output_file, "out.csv");
        assert_eq!(config.categories.len(), 4);
        assert_eq!(config.categories[3], "Monthly Gift");
        config.validate().unwrap();
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("triage.json");
        fs::write(&path, r#"{ "desc_len": 30, "categories": ["Travel", "Food"] }"#).unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.desc_len, 30);
        assert_eq!(config.cat_len, 20);
        assert_eq!(config.categories, vec!["Travel", "Food"]);
        assert_eq!(config.output_name().as_deref(), Some("out.csv"));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("triage.json");
        fs::write(&path, r#"{ "desc_width": 30 }"#).unwrap();
        assert!(Config::from_file(&path).is_err());
    }

    #[test]
    fn test_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = Config::load(Some(&dir.path().join("nope.json"))).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn test_overrides() {
        let config = Config::default()
            .with_overrides(Some(25), None, Some("exports/march.csv".to_string()))
            .unwrap();
        assert_eq!(config.widths(), DisplayWidths::new(25, 20));
        assert_eq!(config.output_path(), PathBuf::from("exports/march.csv"));
        assert_eq!(config.output_name().as_deref(), Some("march.csv"));
    }

    #[test]
    fn test_invalid_values() {
        assert!(Config::default().with_overrides(Some(0), None, None).is_err());

        let mut config = Config::default();
        config.categories.clear();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.output_file = "..".to_string();
        assert!(config.validate().is_err());
    }
}
