use std::path::PathBuf;

use tinyorm::OrmError;
use tinyorm::database::Database;
use tinyorm::settings::{PersistenceMode, Settings, StorageKind};

// each test writes its own file so they can run in parallel
fn write_settings(name: &str, content: &str) -> String {
    let path = format!("test_tinyorm_{name}.toml");
    std::fs::write(&path, content).expect("write settings");
    path
}

#[test]
fn memory_storage_from_file() {
    let path = write_settings("memory", "[storage]\nkind = \"memory\"\n");
    let settings = Settings::from_file(&path).expect("settings");
    assert_eq!(settings.storage.kind, StorageKind::Memory);
    assert_eq!(settings.persistence_mode().expect("mode"), PersistenceMode::InMemory);
    assert!(Database::open(&settings).is_ok());
    let _ = std::fs::remove_file(&path);
}

#[test]
fn sqlite_storage_defaults_its_file() {
    let path = write_settings("sqlite", "[storage]\nkind = \"sqlite\"\n");
    let settings = Settings::from_file(&path).expect("settings");
    assert_eq!(
        settings.persistence_mode().expect("mode"),
        PersistenceMode::File(PathBuf::from("database.db"))
    );
    let _ = std::fs::remove_file(&path);
}

#[test]
fn sqlite_storage_with_explicit_file() {
    let path = write_settings(
        "explicit",
        "[storage]\nkind = \"sqlite\"\nfile = \"library.db\"\n",
    );
    let settings = Settings::from_file(&path).expect("settings");
    assert_eq!(settings.storage.file, Some(PathBuf::from("library.db")));
    let _ = std::fs::remove_file(&path);
}

#[test]
fn unknown_storage_kind_is_a_config_error() {
    let path = write_settings("unknown", "[storage]\nkind = \"postgres\"\n");
    assert!(matches!(Settings::from_file(&path), Err(OrmError::Config(_))));
    let _ = std::fs::remove_file(&path);
}

#[test]
fn missing_file_is_a_config_error() {
    assert!(matches!(
        Settings::from_file("no_such_tinyorm_settings.toml"),
        Err(OrmError::Config(_))
    ));
}
