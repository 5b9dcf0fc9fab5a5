use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::ml::ModelError;

pub const WEIGHTS: &str = "weights.txt";
pub const INTERCEPT: &str = "intercept.txt";
pub const MEANS: &str = "mean.txt";
pub const STDS: &str = "std.txt";
/// Optional list of feature names the model was trained on
pub const FEATURES: &str = "features.txt";

/// Source of named model parameter resources
pub trait ParameterStore {
    /// Raw text of `resource`, or `None` when the store has no such resource
    fn read(&self, resource: &str) -> Result<Option<String>, ModelError>;
}

/// Parameter files in one directory, one value per line
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    dir: PathBuf,
}

impl DirectoryStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl ParameterStore for DirectoryStore {
    fn read(&self, resource: &str) -> Result<Option<String>, ModelError> {
        let path = self.dir.join(resource);
        match fs::read_to_string(&path) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(ModelError::Io {
                resource: path.display().to_string(),
                source,
            }),
        }
    }
}

impl ParameterStore for HashMap<String, String> {
    fn read(&self, resource: &str) -> Result<Option<String>, ModelError> {
        Ok(self.get(resource).cloned())
    }
}

/// Parse one number per line, skipping blank lines
pub fn parse_values(resource: &str, text: &str) -> Result<Vec<f64>, ModelError> {
    let mut values = Vec::new();
    for (index, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let value = line.parse::<f64>().map_err(|_| ModelError::Parse {
            resource: resource.to_string(),
            line: index + 1,
            value: line.to_string(),
        })?;
        values.push(value);
    }
    Ok(values)
}

/// Parse one name per line, skipping blank lines
pub fn parse_names(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_values() {
        let values = parse_values(WEIGHTS, "0.5\n\n  -1.25 \n3e-2\n").unwrap();
        assert_eq!(values, vec![0.5, -1.25, 0.03]);
    }

    #[test]
    fn test_parse_values_reports_line() {
        match parse_values(MEANS, "1.0\n2.0\nabc\n") {
            Err(ModelError::Parse { resource, line, value }) => {
                assert_eq!(resource, MEANS);
                assert_eq!(line, 3);
                assert_eq!(value, "abc");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_directory_store() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(WEIGHTS), "1.0\n2.0\n").unwrap();

        let store = DirectoryStore::new(dir.path());
        assert_eq!(store.read(WEIGHTS).unwrap().as_deref(), Some("1.0\n2.0\n"));
        assert!(store.read(FEATURES).unwrap().is_none());
    }
}
