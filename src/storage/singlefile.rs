//! Singlefile storage: a whole collection in one JSON document.
//!
//! The document maps item identifiers to content. A `%s` placeholder in
//! `path` is substituted with the collection name. Every mutation rewrites
//! the document atomically.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::{content_etag, Item, ParamSpec, Storage, StorageBackend, StorageConfig};
use crate::error::{Error, Result};
use crate::status::expand_path;

#[derive(Debug)]
pub struct SinglefileBackend;

impl SinglefileBackend {
    fn resolve_path(config: &StorageConfig) -> Result<PathBuf> {
        let raw = config.require_str("path")?;
        match &config.collection {
            Some(collection) => {
                if !raw.contains("%s") {
                    return Err(Error::user(format!(
                        "storage \"{}\": the `path` parameter must contain %s \
                         to support collections",
                        config.instance_name
                    )));
                }
                Ok(expand_path(&raw.replace("%s", collection)))
            }
            None => Ok(expand_path(raw)),
        }
    }
}

#[async_trait]
impl StorageBackend for SinglefileBackend {
    fn storage_name(&self) -> &'static str {
        "singlefile"
    }

    fn parameters(&self) -> ParamSpec {
        ParamSpec {
            required: &["path"],
            allowed: &["path"],
        }
    }

    async fn open(&self, config: StorageConfig) -> Result<Box<dyn Storage>> {
        let path = Self::resolve_path(&config)?;
        if !path.is_file() {
            return Err(Error::CollectionNotFound {
                collection: config
                    .collection
                    .clone()
                    .unwrap_or_else(|| path.display().to_string()),
                storage: config.instance_name.clone(),
            });
        }
        Ok(Box::new(SinglefileStorage {
            path,
            instance_name: config.instance_name.clone(),
        }))
    }

    async fn create_collection(&self, config: &StorageConfig) -> Result<StorageConfig> {
        let path = Self::resolve_path(config)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        if !path.exists() {
            write_document(&path, &BTreeMap::new())?;
        }
        Ok(config.clone())
    }
}

#[derive(Debug)]
struct SinglefileStorage {
    path: PathBuf,
    instance_name: String,
}

impl SinglefileStorage {
    fn load(&self) -> Result<BTreeMap<String, String>> {
        let raw = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}

fn write_document(path: &Path, items: &BTreeMap<String, String>) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut temp = tempfile::NamedTempFile::new_in(dir)?;
    serde_json::to_writer(&mut temp, items)?;
    temp.flush()?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[async_trait]
impl Storage for SinglefileStorage {
    fn instance_name(&self) -> &str {
        &self.instance_name
    }

    async fn list(&self) -> Result<Vec<(String, String)>> {
        Ok(self
            .load()?
            .iter()
            .map(|(ident, content)| (ident.clone(), content_etag(content)))
            .collect())
    }

    async fn get(&self, ident: &str) -> Result<Item> {
        let mut items = self.load()?;
        match items.remove(ident) {
            Some(content) => Ok(Item::new(ident, content)),
            None => Err(Error::user(format!(
                "storage \"{}\": no item {ident}",
                self.instance_name
            ))),
        }
    }

    async fn upload(&mut self, item: &Item) -> Result<String> {
        let mut items = self.load()?;
        if items.contains_key(item.ident()) {
            return Err(Error::user(format!(
                "storage \"{}\": item {} already exists",
                self.instance_name,
                item.ident()
            )));
        }
        items.insert(item.ident().to_string(), item.content().to_string());
        write_document(&self.path, &items)?;
        Ok(item.etag())
    }

    async fn delete(&mut self, ident: &str) -> Result<()> {
        let mut items = self.load()?;
        items.remove(ident);
        write_document(&self.path, &items)?;
        Ok(())
    }
}
