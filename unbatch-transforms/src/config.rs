//! Configuration for the unbatch iterator

use std::path::Path;

use serde::{Deserialize, Serialize};

use unbatch_core::error::Result;

/// What the iterator does after a batch fails runtime validation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorPolicy {
    /// Report the error once, then behave as exhausted
    #[default]
    Terminate,

    /// Report the error, drop the offending batch and continue with the next one
    SkipBatch,
}

/// How sparse rows belonging to one element are located
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SparseSelection {
    /// Re-scan the coordinate list for every element
    Scan,

    /// Group coordinate rows by leading index once per batch
    #[default]
    Indexed,
}

/// Configuration for an unbatch iterator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UnbatchConfig {
    /// Recovery behaviour after a runtime validation error
    pub error_policy: ErrorPolicy,

    /// Sparse row selection strategy
    pub sparse_selection: SparseSelection,

    /// Check each batch's kinds, dtypes and shapes against the source's spec
    pub check_element_spec: bool,
}

impl Default for UnbatchConfig {
    fn default() -> Self {
        Self {
            error_policy: ErrorPolicy::Terminate,
            sparse_selection: SparseSelection::Indexed,
            check_element_spec: true,
        }
    }
}

impl UnbatchConfig {
    /// Parse a configuration from JSON; missing fields take their defaults
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a JSON configuration file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Set the error policy
    pub fn with_error_policy(mut self, policy: ErrorPolicy) -> Self {
        self.error_policy = policy;
        self
    }

    /// Set the sparse selection strategy
    pub fn with_sparse_selection(mut self, selection: SparseSelection) -> Self {
        self.sparse_selection = selection;
        self
    }

    /// Enable or disable per-batch spec checks
    pub fn with_element_spec_check(mut self, enabled: bool) -> Self {
        self.check_element_spec = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_fill_missing_fields() {
        let config = UnbatchConfig::from_json_str(r#"{"error_policy": "skip_batch"}"#).unwrap();
        assert_eq!(config.error_policy, ErrorPolicy::SkipBatch);
        assert_eq!(config.sparse_selection, SparseSelection::Indexed);
        assert!(config.check_element_spec);
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let err = UnbatchConfig::from_json_str(r#"{"prefetch": 4}"#).unwrap_err();
        assert!(matches!(err, unbatch_core::Error::Json(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"sparse_selection": "scan", "check_element_spec": false}}"#).unwrap();

        let config = UnbatchConfig::from_file(file.path()).unwrap();
        assert_eq!(
            config,
            UnbatchConfig::default()
                .with_sparse_selection(SparseSelection::Scan)
                .with_element_spec_check(false)
        );
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = UnbatchConfig::from_file(dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, unbatch_core::Error::Io(_)));
    }
}
