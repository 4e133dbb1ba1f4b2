//! Error types for pairsync.
//!
//! The sync engine and the CLI share a single closed error taxonomy. Every
//! failure that reaches the reporting boundary (`cli::report`) is one of
//! these variants; the transparent wrappers at the tail are the
//! "unclassified" kinds that get a generic message.

use thiserror::Error;

/// Result type alias for pairsync operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while resolving storages or syncing a pair.
#[derive(Error, Debug)]
pub enum Error {
    /// The user did something wrong: bad configuration, unknown storage
    /// type, a collection that cannot be found or created.
    #[error("{}", user_message(message, problems))]
    User {
        message: String,
        /// Individual actionable problems, one line each.
        problems: Vec<String>,
    },

    /// A storage was completely emptied since the last sync.
    #[error("storage \"{storage}\" was completely emptied")]
    StorageEmpty { storage: String },

    /// A change was attempted on a storage declared read-only.
    #[error("attempted change on read-only storage {storage}")]
    PartialSync { storage: String },

    /// The same item changed on both sides of a pair.
    #[error("item {ident} changed on both sides (A: {href_a}, B: {href_b})")]
    SyncConflict {
        ident: String,
        href_a: String,
        href_b: String,
    },

    /// One storage contains multiple items with the same identifier.
    #[error("storage \"{storage}\" contains {} items with the same identifier", hrefs.len())]
    IdentConflict {
        storage: String,
        hrefs: Vec<String>,
    },

    /// The user cancelled an interactive flow. Swallowed silently at the
    /// reporting boundary.
    #[error("operation aborted")]
    Aborted,

    /// A referenced pair is absent from the configuration.
    #[error("pair {pair} does not exist")]
    PairNotFound { pair: String },

    /// A remote server returned something unparsable.
    #[error("invalid server response: {0}")]
    InvalidServerResponse(String),

    /// A storage does not support `collection = null`.
    #[error("storage does not support a null collection")]
    CollectionRequired,

    /// The configured collection does not exist on the storage. The factory
    /// intercepts this to drive the creation recovery flow.
    #[error("no collection {collection:?} found for storage \"{storage}\"")]
    CollectionNotFound { collection: String, storage: String },

    /// The storage type has no collection-creation capability.
    #[error("storage type {storage_type} does not support creating collections")]
    CollectionCreateUnsupported { storage_type: &'static str },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Database(#[from] rusqlite::Error),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    TomlParse(#[from] toml::de::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Shorthand for a `User` error without an itemized problem list.
    pub fn user(message: impl Into<String>) -> Self {
        Self::User {
            message: message.into(),
            problems: Vec::new(),
        }
    }
}

fn user_message(message: &str, problems: &[String]) -> String {
    if problems.is_empty() {
        message.to_string()
    } else {
        let mut out = String::from(message);
        for problem in problems {
            out.push_str("\n  - ");
            out.push_str(problem);
        }
        out
    }
}
