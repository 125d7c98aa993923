//! Candidate discovery: find every ebuild in a portage overlay.

use std::path::Path;

use tracing::{debug, trace, warn};
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::model::Ebuild;

/// Walk `overlay_dir` and return its ebuilds, sorted.
///
/// A missing or unreadable root is fatal. Entries that fail mid-walk are
/// logged and skipped.
pub fn scan(overlay_dir: &Path) -> Result<Vec<Ebuild>> {
    if !overlay_dir.is_dir() {
        return Err(Error::Config(format!(
            "overlay directory {} does not exist",
            overlay_dir.display()
        )));
    }

    let mut ebuilds = Vec::new();
    for entry in WalkDir::new(overlay_dir) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() == 0 => {
                return Err(Error::Config(format!(
                    "cannot read overlay {}: {e}",
                    overlay_dir.display()
                )));
            }
            Err(e) => {
                warn!(error = %e, "skipping unreadable overlay entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        if let Some(ebuild) = Ebuild::from_path(overlay_dir, entry.path()) {
            trace!(ebuild = ebuild.as_str(), "found ebuild");
            ebuilds.push(ebuild);
        }
    }

    ebuilds.sort();
    debug!(count = ebuilds.len(), overlay = %overlay_dir.display(), "overlay scanned");
    Ok(ebuilds)
}
