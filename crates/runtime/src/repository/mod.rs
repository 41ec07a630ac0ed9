//! Character persistence contracts and implementations.

mod file;

pub use file::FileCharacterRepository;

use character_core::Character;

/// Errors surfaced by repositories.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),
}

pub type Result<T> = std::result::Result<T, RepositoryError>;

/// Repository for character save files.
pub trait CharacterRepository {
    /// Save a character under its name.
    fn save(&self, character: &Character) -> Result<()>;

    /// Load a character by name.
    fn load(&self, name: &str) -> Result<Option<Character>>;

    /// Check whether a save exists.
    fn exists(&self, name: &str) -> bool;

    /// Delete a save.
    fn delete(&self, name: &str) -> Result<()>;

    /// List all saved character names.
    fn list_names(&self) -> Result<Vec<String>>;
}
