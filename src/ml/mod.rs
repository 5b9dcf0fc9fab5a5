//! Standardized logistic-regression scoring of flow feature vectors.

pub mod model;
pub mod store;

use log::warn;
use std::path::Path;
use thiserror::Error;

pub use model::{sigmoid, ClassificationResult, Label, Model, MALICIOUS_THRESHOLD};
pub use store::{DirectoryStore, ParameterStore};

/// Load the model kept in `dir`, or `None` when there is no such directory.
///
/// A directory that exists but holds missing or malformed parameters is an error.
pub fn load_optional(dir: &Path) -> Result<Option<Model>, ModelError> {
    if !dir.is_dir() {
        warn!("Model directory {} not found, skipping classification", dir.display());
        return Ok(None);
    }
    Model::load(&DirectoryStore::new(dir)).map(Some)
}

/// Errors raised while loading or applying model parameters
#[derive(Error, Debug)]
pub enum ModelError {
    /// A parameter resource could not be read
    #[error("cannot read {resource}: {source}")]
    Io {
        resource: String,
        #[source]
        source: std::io::Error,
    },

    /// A required parameter resource does not exist
    #[error("missing parameter resource {0}")]
    MissingResource(String),

    /// A line in a parameter resource is not a number
    #[error("{resource} line {line}: invalid number {value:?}")]
    Parse {
        resource: String,
        line: usize,
        value: String,
    },

    /// Parameters are malformed or disagree in shape
    #[error("invalid model parameters: {0}")]
    Config(String),

    /// The feature vector does not match the model's dimension
    #[error("feature length {actual}, want {expected}")]
    DimensionMismatch { expected: usize, actual: usize },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::FEATURE_NAMES;
    use std::fs;

    fn column(value: f64) -> String {
        format!("{}\n", value).repeat(FEATURE_NAMES.len())
    }

    #[test]
    fn test_load_optional_without_directory() {
        let dir = tempfile::tempdir().unwrap();
        let model = load_optional(&dir.path().join("parameters")).unwrap();
        assert!(model.is_none());
    }

    #[test]
    fn test_load_optional_with_parameters() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(store::WEIGHTS), column(0.5)).unwrap();
        fs::write(dir.path().join(store::INTERCEPT), "-1.0\n").unwrap();
        fs::write(dir.path().join(store::MEANS), column(0.0)).unwrap();
        fs::write(dir.path().join(store::STDS), column(1.0)).unwrap();
        fs::write(dir.path().join(store::FEATURES), FEATURE_NAMES.join("\n")).unwrap();

        let model = load_optional(dir.path()).unwrap().unwrap();
        assert_eq!(model.dimension(), FEATURE_NAMES.len());
        assert_eq!(model.intercept(), -1.0);
    }

    #[test]
    fn test_load_optional_rejects_broken_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(load_optional(dir.path()), Err(ModelError::MissingResource(_))));

        fs::write(dir.path().join(store::WEIGHTS), "0.5\nabc\n").unwrap();
        assert!(matches!(
            load_optional(dir.path()),
            Err(ModelError::Parse { line: 2, .. })
        ));
    }
}
