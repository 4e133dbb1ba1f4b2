//! Read-only HTTP storage.
//!
//! Fetches a remote JSON document mapping item identifiers to content over
//! the shared connector. Collections are not supported and every mutation
//! is rejected as a partial-sync error.

use std::collections::BTreeMap;

use async_trait::async_trait;

use super::{content_etag, Connector, Item, ParamSpec, Storage, StorageBackend, StorageConfig};
use crate::error::{Error, Result};

#[derive(Debug)]
pub struct HttpBackend;

#[async_trait]
impl StorageBackend for HttpBackend {
    fn storage_name(&self) -> &'static str {
        "http"
    }

    fn parameters(&self) -> ParamSpec {
        ParamSpec {
            required: &["url"],
            allowed: &["url"],
        }
    }

    fn uses_connector(&self) -> bool {
        true
    }

    async fn open(&self, config: StorageConfig) -> Result<Box<dyn Storage>> {
        if config.collection.is_some() {
            return Err(Error::user(format!(
                "storage \"{}\": http storage does not support collections",
                config.instance_name
            )));
        }
        let url = config.require_str("url")?.to_string();
        // The factory injects the shared pool; a private client is only a
        // fallback for direct construction in tests.
        let client = config.connector().cloned().unwrap_or_default();
        Ok(Box::new(HttpStorage {
            client,
            url,
            instance_name: config.instance_name.clone(),
        }))
    }
}

#[derive(Debug)]
struct HttpStorage {
    client: Connector,
    url: String,
    instance_name: String,
}

impl HttpStorage {
    async fn fetch(&self) -> Result<BTreeMap<String, String>> {
        let response = self.client.get(&self.url).send().await?;
        let response = response.error_for_status()?;
        let body = response.text().await?;
        serde_json::from_str(&body)
            .map_err(|e| Error::InvalidServerResponse(format!("{}: {e}", self.url)))
    }
}

#[async_trait]
impl Storage for HttpStorage {
    fn instance_name(&self) -> &str {
        &self.instance_name
    }

    fn read_only(&self) -> bool {
        true
    }

    async fn list(&self) -> Result<Vec<(String, String)>> {
        Ok(self
            .fetch()
            .await?
            .iter()
            .map(|(ident, content)| (ident.clone(), content_etag(content)))
            .collect())
    }

    async fn get(&self, ident: &str) -> Result<Item> {
        let mut items = self.fetch().await?;
        match items.remove(ident) {
            Some(content) => Ok(Item::new(ident, content)),
            None => Err(Error::user(format!(
                "storage \"{}\": no item {ident}",
                self.instance_name
            ))),
        }
    }

    async fn upload(&mut self, _item: &Item) -> Result<String> {
        Err(Error::PartialSync {
            storage: self.instance_name.clone(),
        })
    }

    async fn delete(&mut self, _ident: &str) -> Result<()> {
        Err(Error::PartialSync {
            storage: self.instance_name.clone(),
        })
    }
}
