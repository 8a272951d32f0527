//! Mapping mounted files to destination symlinks.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use super::season::season_folder_name;
use super::LinkError;

/// One symlink to create: `destination -> source`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkPlan {
    pub source: PathBuf,
    pub destination: PathBuf,
}

/// Plan a link for every file under `mount_folder`.
///
/// Files mirror their relative path under `destination_folder`, except
/// episodes of a multi-season stem, which go under a sibling folder for their
/// season.
pub fn plan_links(
    mount_folder: &Path,
    destination_folder: &Path,
    stem: &str,
) -> Result<Vec<LinkPlan>, LinkError> {
    let completed_root = destination_folder
        .parent()
        .unwrap_or(destination_folder)
        .to_path_buf();

    let mut plans = Vec::new();
    for entry in WalkDir::new(mount_folder).sort_by_file_name() {
        let entry = entry.map_err(|e| LinkError::Walk(e.to_string()))?;
        if entry.file_type().is_dir() {
            continue;
        }

        let relative = entry
            .path()
            .strip_prefix(mount_folder)
            .map_err(|e| LinkError::Walk(e.to_string()))?;
        let file_name = entry.file_name().to_string_lossy();

        let base = match season_folder_name(stem, &file_name) {
            Some(season_folder) => completed_root.join(season_folder),
            None => destination_folder.to_path_buf(),
        };

        plans.push(LinkPlan {
            source: entry.path().to_path_buf(),
            destination: base.join(relative),
        });
    }

    Ok(plans)
}
