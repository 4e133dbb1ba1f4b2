//! Filesystem storage: one item per file.
//!
//! Items live as individual files under `path[/collection]`; the file stem
//! is the item identifier and the etag is a content hash. Writes are atomic
//! (temp file in the same directory, then rename).

use std::fs;
use std::io::Write;
use std::path::PathBuf;

use async_trait::async_trait;

use super::{content_etag, Item, ParamSpec, Storage, StorageBackend, StorageConfig};
use crate::error::{Error, Result};
use crate::status::expand_path;

#[derive(Debug)]
pub struct FilesystemBackend;

#[async_trait]
impl StorageBackend for FilesystemBackend {
    fn storage_name(&self) -> &'static str {
        "filesystem"
    }

    fn parameters(&self) -> ParamSpec {
        ParamSpec {
            required: &["path", "fileext"],
            allowed: &["path", "fileext"],
        }
    }

    async fn open(&self, config: StorageConfig) -> Result<Box<dyn Storage>> {
        let root = expand_path(config.require_str("path")?);
        let fileext = config.require_str("fileext")?.to_string();
        let dir = match &config.collection {
            Some(collection) => root.join(collection),
            None => root,
        };

        if !dir.is_dir() {
            return Err(Error::CollectionNotFound {
                collection: config
                    .collection
                    .clone()
                    .unwrap_or_else(|| dir.display().to_string()),
                storage: config.instance_name.clone(),
            });
        }

        Ok(Box::new(FilesystemStorage {
            dir,
            fileext,
            instance_name: config.instance_name.clone(),
        }))
    }

    async fn create_collection(&self, config: &StorageConfig) -> Result<StorageConfig> {
        let root = expand_path(config.require_str("path")?);
        let dir = match &config.collection {
            Some(collection) => root.join(collection),
            None => root,
        };
        fs::create_dir_all(&dir)?;
        Ok(config.clone())
    }
}

#[derive(Debug)]
struct FilesystemStorage {
    dir: PathBuf,
    fileext: String,
    instance_name: String,
}

impl FilesystemStorage {
    fn item_path(&self, ident: &str) -> PathBuf {
        self.dir.join(format!("{ident}{}", self.fileext))
    }
}

#[async_trait]
impl Storage for FilesystemStorage {
    fn instance_name(&self) -> &str {
        &self.instance_name
    }

    async fn list(&self) -> Result<Vec<(String, String)>> {
        let mut items = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            let Some(ident) = name.strip_suffix(&self.fileext) else {
                continue;
            };
            let content = fs::read_to_string(entry.path())?;
            items.push((ident.to_string(), content_etag(&content)));
        }
        items.sort();
        Ok(items)
    }

    async fn get(&self, ident: &str) -> Result<Item> {
        let content = fs::read_to_string(self.item_path(ident))?;
        Ok(Item::new(ident, content))
    }

    async fn upload(&mut self, item: &Item) -> Result<String> {
        let path = self.item_path(item.ident());
        if path.exists() {
            return Err(Error::user(format!(
                "storage \"{}\": item {} already exists",
                self.instance_name,
                item.ident()
            )));
        }
        let mut temp = tempfile::NamedTempFile::new_in(&self.dir)?;
        temp.write_all(item.content().as_bytes())?;
        temp.as_file().sync_all()?;
        temp.persist(&path).map_err(|e| e.error)?;
        Ok(item.etag())
    }

    async fn delete(&mut self, ident: &str) -> Result<()> {
        fs::remove_file(self.item_path(ident))?;
        Ok(())
    }
}
