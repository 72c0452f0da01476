// ABOUTME: Loader for optional KEY=VALUE environment files.
// ABOUTME: Reads .env files with dotenvy and applies them without overwriting existing variables.

use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Parsed contents of a `.env` style file, in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvFile {
    path: PathBuf,
    pairs: Vec<(String, String)>,
}

impl EnvFile {
    /// Load and parse `path`. An absent file is not an error.
    pub fn load(path: &Path) -> Result<Option<Self>, ConfigError> {
        if !path.is_file() {
            return Ok(None);
        }

        let env_error = |source| ConfigError::EnvFile {
            path: path.to_path_buf(),
            source,
        };
        let pairs = dotenvy::from_path_iter(path)
            .map_err(env_error)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(env_error)?;

        Ok(Some(Self {
            path: path.to_path_buf(),
            pairs,
        }))
    }

    /// Load the first candidate that exists.
    pub fn load_first<P: AsRef<Path>>(candidates: &[P]) -> Result<Option<Self>, ConfigError> {
        for candidate in candidates {
            if let Some(file) = Self::load(candidate.as_ref())? {
                return Ok(Some(file));
            }
        }
        Ok(None)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    /// Value a load would export for `key`. The first definition wins.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Export the pairs into the process environment. Variables that are
    /// already set are left untouched. Returns the keys that were written.
    ///
    /// Must be called before any other thread is started.
    pub fn apply(&self) -> Result<Vec<String>, ConfigError> {
        let mut written: Vec<String> = Vec::new();
        for (key, _) in &self.pairs {
            if std::env::var_os(key).is_none() && !written.contains(key) {
                written.push(key.clone());
            }
        }

        dotenvy::from_path(&self.path).map_err(|source| ConfigError::EnvFile {
            path: self.path.clone(),
            source,
        })?;
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load_str(content: &str) -> Result<Option<EnvFile>, ConfigError> {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(&path, content).unwrap();
        EnvFile::load(&path)
    }

    #[test]
    fn parses_pairs_comments_and_quotes() {
        let file = load_str(
            "# credentials\n\nARM_TENANT_ID = \"tenant\"\nARM_CLIENT_ID='client'\nRAW=a=b\n",
        )
        .unwrap()
        .unwrap();
        assert_eq!(
            file.pairs(),
            [
                ("ARM_TENANT_ID".to_string(), "tenant".to_string()),
                ("ARM_CLIENT_ID".to_string(), "client".to_string()),
                ("RAW".to_string(), "a=b".to_string()),
            ]
        );
    }

    #[test]
    fn empty_value_is_kept() {
        let file = load_str("EMPTY=\n").unwrap().unwrap();
        assert_eq!(file.get("EMPTY"), Some(""));
    }

    #[test]
    fn first_definition_wins() {
        let file = load_str("K=one\nK=two\n").unwrap().unwrap();
        assert_eq!(file.get("K"), Some("one"));
    }

    #[test]
    fn malformed_line_is_an_error() {
        let err = load_str("not a pair\n").unwrap_err();
        assert!(matches!(err, ConfigError::EnvFile { .. }));
    }

    #[test]
    fn absent_file_is_none() {
        let result = EnvFile::load(Path::new("/nonexistent/.env")).unwrap();
        assert!(result.is_none());
    }
}
