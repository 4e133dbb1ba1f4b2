//! Permission ceilings for status files.
//!
//! Status data can contain identifying information (item UIDs, hrefs), so
//! files must stay private to the owning user. Violations are corrected in
//! place with a warning rather than failing the sync run.

use std::path::Path;

/// Status files must not exceed `rw-------`.
pub const STATUS_FILE_MODE: u32 = 0o600;

/// Status directories must not exceed `rwx------`.
pub const STATUS_DIR_MODE: u32 = 0o700;

/// Check that `path`'s mode bits stay within `ceiling`, correcting them to
/// exactly the ceiling if any bit outside it is set.
///
/// The ceiling is a bitmask, not an ordering: `0o604` violates a `0o600`
/// ceiling even though it is numerically larger than none of its bits.
/// Correction is best-effort and never fails the caller.
#[cfg(unix)]
pub fn assert_permissions(path: &Path, ceiling: u32) {
    use std::fs;
    use std::os::unix::fs::PermissionsExt;

    use tracing::{debug, warn};

    let Ok(metadata) = fs::metadata(path) else {
        return;
    };
    let mode = metadata.permissions().mode() & 0o777;
    if mode & !ceiling == 0 {
        return;
    }

    warn!(
        "Correcting permissions of {} from {:o} to {:o}",
        path.display(),
        mode,
        ceiling
    );
    let mut permissions = metadata.permissions();
    permissions.set_mode(ceiling);
    if let Err(e) = fs::set_permissions(path, permissions) {
        debug!("Could not correct permissions of {}: {e}", path.display());
    }
}

/// No mode bits to enforce on non-unix targets.
#[cfg(not(unix))]
pub fn assert_permissions(_path: &Path, _ceiling: u32) {}
