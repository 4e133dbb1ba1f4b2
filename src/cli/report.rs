//! The error reporting boundary.
//!
//! Every failure that bubbles out of a per-pair job is funneled through
//! [`handle_cli_error`], which logs one tailored message per error kind and
//! never lets anything escape. The sync run then continues with the next
//! pair.

use tracing::{debug, error};

use crate::error::Error;

const BUGTRACKER_HOME: &str = "https://github.com/pairsync/pairsync/issues";
const DOCS_HOME: &str = "https://pairsync.readthedocs.io";

/// Log a useful message for `e`, scoped to `status_name` where one applies.
///
/// Exactly one message per call; none at all for a user-initiated abort.
/// Unrecognized errors get a generic message with the raw error text, and
/// the full source chain only at debug level.
pub fn handle_cli_error(status_name: Option<&str>, e: &Error) {
    let scope = status_name.unwrap_or("sync");

    match e {
        Error::User { .. }
        | Error::CollectionNotFound { .. }
        | Error::CollectionCreateUnsupported { .. } => error!("{e}"),

        Error::CollectionRequired => error!(
            "One or more storages don't support `collections = null`. \
             You probably want to set `collections = [\"from a\", \"from b\"]`."
        ),

        Error::StorageEmpty { storage } => error!(
            "{scope}: Storage \"{storage}\" was completely emptied. If you \
             want to delete ALL entries on BOTH sides, then use \
             `pairsync sync --force-delete {scope}`. Otherwise delete the files \
             for {scope} in your status directory."
        ),

        Error::PartialSync { storage } => error!(
            "{scope}: Attempted change on {storage}, which is read-only. Set \
             `partial_sync` in your pair section to `ignore` to ignore those \
             changes, or `revert` to revert them on the other side."
        ),

        Error::SyncConflict {
            ident,
            href_a,
            href_b,
        } => error!(
            "{scope}: One item changed on both sides. Resolve this conflict \
             manually, or by setting the `conflict_resolution` parameter in \
             your config file.\n\
             See also {DOCS_HOME}/config.html#pair-section\n\
             Item ID: {ident}\n\
             Item href on side A: {href_a}\n\
             Item href on side B: {href_b}"
        ),

        Error::IdentConflict { storage, hrefs } => error!(
            "{scope}: Storage \"{storage}\" contains multiple items with the \
             same UID or even content. Sync of this collection is aborted, \
             because the fix for this is not clear; it could be the result of \
             a badly behaving server. Make sure to have a backup of your data \
             in some form. The offending hrefs are:\n\n{}",
            hrefs.join("\n")
        ),

        Error::Aborted => {}

        Error::PairNotFound { pair } => error!(
            "Pair {pair} does not exist. Please check your configuration file \
             and make sure you've typed the pair name correctly"
        ),

        Error::InvalidServerResponse(detail) => error!(
            "The server returned something pairsync doesn't understand. Error \
             message: {detail}\n\
             While this is most likely a serverside problem, the pairsync devs \
             are generally interested in such bugs. Please report it in the \
             issue tracker at {BUGTRACKER_HOME}"
        ),

        _ => {
            let prefix = match status_name {
                Some(name) => format!("Unknown error occurred for {name}"),
                None => "Unknown error occurred".to_string(),
            };
            error!("{prefix}: {e}\nUse `-vv` to see the full error chain.");
            let mut source = std::error::Error::source(e);
            while let Some(cause) = source {
                debug!("caused by: {cause}");
                source = cause.source();
            }
        }
    }
}
