use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use encoding_rs::Encoding;
use tracing::debug;

use dm_engine::ports::{AdventureStore, StoreError};
use dm_engine::Adventure;

/// Adventures as `<name>.json` files in one directory.
pub struct JsonDirStore {
    dir: PathBuf,
}

/// Decode a file honouring a UTF-8/UTF-16 byte order mark when present.
pub fn read_text_auto(path: &Path) -> Result<String, StoreError> {
    let bytes = fs::read(path).map_err(|err| io_error(path, err))?;
    if let Some((enc, bom_len)) = Encoding::for_bom(&bytes) {
        let (cow, _, _) = enc.decode(&bytes[bom_len..]);
        Ok(cow.into_owned())
    } else {
        String::from_utf8(bytes).map_err(|err| StoreError::Serialization(err.to_string()))
    }
}

fn io_error(path: &Path, err: std::io::Error) -> StoreError {
    match err.kind() {
        ErrorKind::NotFound => StoreError::NotFound(path.display().to_string()),
        _ => StoreError::Io(format!("{}: {}", path.display(), err)),
    }
}

impl JsonDirStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, name: &str) -> Result<PathBuf, StoreError> {
        let name = name.trim();
        if name.is_empty() || name.contains(['/', '\\']) || name.starts_with('.') {
            return Err(StoreError::Io(format!("invalid adventure name: {:?}", name)));
        }
        Ok(self.dir.join(format!("{}.json", name)))
    }

    fn read(&self, name: &str) -> Result<Adventure, StoreError> {
        let path = self.path_for(name)?;
        let text = read_text_auto(&path).map_err(|err| match err {
            StoreError::NotFound(_) => StoreError::NotFound(name.to_string()),
            other => other,
        })?;
        serde_json::from_str(&text)
            .map_err(|err| StoreError::Serialization(format!("{}: {}", path.display(), err)))
    }

    fn write(&self, name: &str, adventure: &Adventure) -> Result<(), StoreError> {
        let path = self.path_for(name)?;
        fs::create_dir_all(&self.dir).map_err(|err| io_error(&self.dir, err))?;
        let json = serde_json::to_string_pretty(adventure)
            .map_err(|err| StoreError::Serialization(err.to_string()))?;
        fs::write(&path, json).map_err(|err| io_error(&path, err))?;
        debug!(path = %path.display(), "wrote adventure");
        Ok(())
    }
}

#[async_trait]
impl AdventureStore for JsonDirStore {
    async fn list(&self) -> Result<Vec<String>, StoreError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(io_error(&self.dir, err)),
        };
        let mut names = Vec::new();
        for entry in entries {
            let path = entry.map_err(|err| io_error(&self.dir, err))?.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    names.push(stem.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    async fn load(&self, name: &str) -> Result<Adventure, StoreError> {
        self.read(name)
    }

    /// Refuses to overwrite a file whose PIN was changed after `adventure`
    /// was loaded.
    async fn save(&self, name: &str, adventure: &Adventure) -> Result<(), StoreError> {
        match self.read(name) {
            Ok(on_disk) if on_disk.pin_version > adventure.pin_version => {
                return Err(StoreError::Forbidden {
                    reason: format!(
                        "PIN changed (version {} on disk, {} in session)",
                        on_disk.pin_version, adventure.pin_version
                    ),
                });
            }
            Ok(_) | Err(StoreError::NotFound(_)) => {}
            Err(err) => return Err(err),
        }
        self.write(name, adventure)
    }

    async fn create(&self, name: &str) -> Result<(), StoreError> {
        if self.path_for(name)?.exists() {
            return Err(StoreError::AlreadyExists(name.trim().to_string()));
        }
        self.write(name, &Adventure::new(name.trim()))
    }

    async fn delete(&self, name: &str) -> Result<(), StoreError> {
        let path = self.path_for(name)?;
        fs::remove_file(&path).map_err(|err| match err.kind() {
            ErrorKind::NotFound => StoreError::NotFound(name.to_string()),
            _ => io_error(&path, err),
        })
    }
}
