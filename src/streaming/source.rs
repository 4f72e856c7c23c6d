//! Where remote level descriptors come from

use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use crate::sequence::LevelDescriptor;

pub type LoadFuture = Pin<Box<dyn Future<Output = io::Result<Option<LevelDescriptor>>> + Send>>;

/// Async provider of level descriptors
///
/// `Ok(None)` means the source has no level by that name.
pub trait LevelSource: Send + Sync + 'static {
    fn load(&self, name: &str) -> LoadFuture;
}

/// Get the file path for a level
pub fn level_path(root: &Path, name: &str) -> PathBuf {
    root.join(format!("{}.json", name))
}

/// Save a level descriptor to disk
pub async fn save_level(root: &Path, name: &str, descriptor: &LevelDescriptor) -> io::Result<()> {
    let path = level_path(root, name);
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let json = serde_json::to_string_pretty(descriptor)?;
    tokio::fs::write(&path, json).await
}

/// Load a level descriptor from disk (if it exists)
pub async fn load_level(root: &Path, name: &str) -> io::Result<Option<LevelDescriptor>> {
    let path = level_path(root, name);
    if !tokio::fs::try_exists(&path).await? {
        return Ok(None);
    }
    let json = tokio::fs::read_to_string(&path).await?;
    let descriptor = serde_json::from_str(&json)?;
    Ok(Some(descriptor))
}

/// Reads `<root>/<name>.json`
#[derive(Clone, Debug)]
pub struct DirectoryLevelSource {
    root: PathBuf,
}

impl DirectoryLevelSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl LevelSource for DirectoryLevelSource {
    fn load(&self, name: &str) -> LoadFuture {
        let root = self.root.clone();
        let name = name.to_string();
        Box::pin(async move { load_level(&root, &name).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_path() {
        let path = level_path(Path::new("levels"), "forest");
        assert_eq!(path, PathBuf::from("levels/forest.json"));
    }

    #[tokio::test]
    async fn test_save_and_load_level() {
        let dir = tempfile::tempdir().unwrap();
        let descriptor = LevelDescriptor { name: "forest".into(), ..Default::default() };
        save_level(dir.path(), "forest", &descriptor).await.unwrap();

        let source = DirectoryLevelSource::new(dir.path());
        let loaded = source.load("forest").await.unwrap();
        assert_eq!(loaded.map(|d| d.name), Some("forest".to_string()));
        assert!(source.load("missing").await.unwrap().is_none());
    }
}
