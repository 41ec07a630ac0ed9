//! File-based CharacterRepository implementation.

use std::fs;
use std::path::{Path, PathBuf};

use character_core::Character;
use directories::ProjectDirs;

use crate::repository::{CharacterRepository, RepositoryError, Result};

/// File-based implementation of [`CharacterRepository`].
///
/// Stores characters as individual pretty-printed JSON files named after the
/// character, so save directories stay diffable and hand-editable. Writes go
/// through a temp file plus atomic rename.
pub struct FileCharacterRepository {
    base_dir: PathBuf,
}

impl FileCharacterRepository {
    /// Create a repository rooted at `base_dir`, creating it if needed.
    pub fn new(base_dir: impl AsRef<Path>) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        fs::create_dir_all(&base_dir)?;
        Ok(Self { base_dir })
    }

    /// Create a repository in the platform's per-user data directory.
    pub fn default_location() -> Result<Self> {
        let base_dir = ProjectDirs::from("", "", "fixer")
            .map(|dirs| dirs.data_dir().join("characters"))
            .unwrap_or_else(|| PathBuf::from("characters"));
        Self::new(base_dir)
    }

    fn save_path(&self, name: &str) -> PathBuf {
        self.base_dir.join(format!("{}.json", sanitize(name)))
    }
}

impl CharacterRepository for FileCharacterRepository {
    fn save(&self, character: &Character) -> Result<()> {
        let path = self.save_path(&character.name);
        let temp_path = path.with_extension("json.tmp");

        let bytes = serde_json::to_vec_pretty(character)
            .map_err(|e| RepositoryError::Serialization(e.to_string()))?;

        fs::write(&temp_path, bytes)?;
        fs::rename(&temp_path, &path)?;

        tracing::debug!("Saved character '{}' to {}", character.name, path.display());

        Ok(())
    }

    fn load(&self, name: &str) -> Result<Option<Character>> {
        let path = self.save_path(name);

        if !path.exists() {
            return Ok(None);
        }

        let bytes = fs::read(&path)?;
        let character: Character = serde_json::from_slice(&bytes)
            .map_err(|e| RepositoryError::Serialization(e.to_string()))?;

        tracing::debug!("Loaded character '{}' from {}", name, path.display());

        Ok(Some(character))
    }

    fn exists(&self, name: &str) -> bool {
        self.save_path(name).exists()
    }

    fn delete(&self, name: &str) -> Result<()> {
        let path = self.save_path(name);
        if path.exists() {
            fs::remove_file(&path)?;
            tracing::debug!("Deleted character '{}'", name);
        }
        Ok(())
    }

    fn list_names(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();

        for entry in fs::read_dir(&self.base_dir)? {
            let path = entry?.path();
            if let Some(name) = path
                .file_name()
                .and_then(|s| s.to_str())
                .and_then(|s| s.strip_suffix(".json"))
            {
                names.push(name.to_string());
            }
        }

        names.sort_unstable();
        Ok(names)
    }
}

/// Keeps save file names portable across filesystems.
fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
