use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::domain::{DomainError, Result};
use crate::infrastructure::config::IndexConfig;

/// Ordered list of directories that may hold the local index.
#[derive(Debug, Clone)]
pub struct IndexLocator {
    candidates: Vec<PathBuf>,
}

impl IndexLocator {
    pub fn new(candidates: Vec<PathBuf>) -> Self {
        Self { candidates }
    }

    /// An explicit `dir` is the sole candidate; otherwise every root joined
    /// with the variant's directory name, in configured order.
    pub fn from_config(config: &IndexConfig) -> Self {
        let candidates = match &config.dir {
            Some(dir) => vec![dir.clone()],
            None => config
                .roots
                .iter()
                .map(|root| root.join(config.variant.dir_name()))
                .collect(),
        };
        Self::new(candidates)
    }

    pub fn candidates(&self) -> &[PathBuf] {
        &self.candidates
    }

    /// First candidate that exists on disk.
    pub fn find(&self) -> Option<&Path> {
        let found = self.candidates.iter().find(|p| p.exists()).map(PathBuf::as_path);
        match found {
            Some(path) => info!(path = %path.display(), "found vector database"),
            None => debug!(candidates = ?self.candidates, "no vector database candidate exists"),
        }
        found
    }

    pub fn resolve(&self) -> Result<PathBuf> {
        self.find().map(Path::to_path_buf).ok_or_else(|| {
            let tried = self
                .candidates
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(", ");
            DomainError::index_missing(format!("no index in any of [{tried}]"))
        })
    }

    /// Where a fallback index gets written when nothing was found.
    pub fn primary(&self) -> Option<&Path> {
        self.candidates.first().map(PathBuf::as_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::config::IndexVariant;

    #[test]
    fn test_second_candidate_selected_when_first_missing() {
        let tmp = tempfile::tempdir().unwrap();
        let first = tmp.path().join("local");
        let second = tmp.path().join("app");
        let third = tmp.path().join("render");
        std::fs::create_dir_all(&second).unwrap();
        std::fs::create_dir_all(&third).unwrap();

        let locator = IndexLocator::new(vec![first, second.clone(), third]);
        assert_eq!(locator.resolve().unwrap(), second);
    }

    #[test]
    fn test_first_existing_wins() {
        let tmp = tempfile::tempdir().unwrap();
        let first = tmp.path().join("a");
        let second = tmp.path().join("b");
        std::fs::create_dir_all(&first).unwrap();
        std::fs::create_dir_all(&second).unwrap();

        let locator = IndexLocator::new(vec![first.clone(), second]);
        assert_eq!(locator.resolve().unwrap(), first);
    }

    #[test]
    fn test_nothing_found_lists_candidates() {
        let tmp = tempfile::tempdir().unwrap();
        let locator = IndexLocator::new(vec![tmp.path().join("x"), tmp.path().join("y")]);

        match locator.resolve() {
            Err(DomainError::IndexMissing(msg)) => {
                assert!(msg.contains("x") && msg.contains("y"));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_from_config_joins_variant() {
        let config = IndexConfig {
            roots: vec![PathBuf::from("model"), PathBuf::from("/app/model")],
            variant: IndexVariant::Full,
            ..IndexConfig::default()
        };

        let locator = IndexLocator::from_config(&config);
        assert_eq!(
            locator.candidates(),
            &[
                PathBuf::from("model/rag-index"),
                PathBuf::from("/app/model/rag-index")
            ]
        );
    }

    #[test]
    fn test_explicit_dir_overrides_roots() {
        let config = IndexConfig {
            dir: Some(PathBuf::from("/data/index")),
            ..IndexConfig::default()
        };

        let locator = IndexLocator::from_config(&config);
        assert_eq!(locator.candidates(), &[PathBuf::from("/data/index")]);
        assert_eq!(locator.primary(), Some(Path::new("/data/index")));
    }
}
