//! Settings that select and construct the storage backend.
//!
//! Sources, later ones overriding earlier ones:
//! * built-in defaults (a SQLite file named `database.db`),
//! * an optional `tinyorm` settings file in the working directory
//!   (`tinyorm.toml`, `tinyorm.json`, ...),
//! * `TINYORM__*` environment variables, e.g. `TINYORM__STORAGE__KIND=memory`.

use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::error::{OrmError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    Memory,
    Sqlite,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StorageSettings {
    pub kind: StorageKind,
    #[serde(default)]
    pub file: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Settings {
    pub storage: StorageSettings,
}

/// How instances are kept between runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistenceMode {
    InMemory,
    File(PathBuf),
}

impl Settings {
    pub fn load() -> Result<Self> {
        Self::build(File::with_name("tinyorm").required(false))
    }
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::build(File::from(path.as_ref()).required(true))
    }
    fn build(file: File<config::FileSourceFile, config::FileFormat>) -> Result<Self> {
        let settings = Config::builder()
            .set_default("storage.kind", "sqlite")?
            .set_default("storage.file", "database.db")?
            .add_source(file)
            .add_source(Environment::with_prefix("TINYORM").separator("__"))
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }
    pub fn persistence_mode(&self) -> Result<PersistenceMode> {
        match (&self.storage.kind, &self.storage.file) {
            (StorageKind::Memory, _) => Ok(PersistenceMode::InMemory),
            (StorageKind::Sqlite, Some(file)) => Ok(PersistenceMode::File(file.clone())),
            (StorageKind::Sqlite, None) => Err(OrmError::Config(
                "storage.file is required for sqlite storage".to_string(),
            )),
        }
    }
}
