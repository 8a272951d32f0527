//! Choosing which files of a remote job to materialize.

use std::collections::BTreeSet;
use std::path::Path;

use crate::debrid::{FileGroup, TorrentFile};

/// Extensions (lowercase, without dot) treated as media.
pub const MEDIA_EXTENSIONS: &[&str] = &[
    "mkv", "mp4", "avi", "m4v", "mov", "wmv", "mpg", "mpeg", "ts", "m2ts", "webm", "flv", "srt",
    "sub", "idx", "ass", "ssa", "vtt",
];

pub fn is_media_file(path: &str) -> bool {
    Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| MEDIA_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Outcome of the selection policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionPlan {
    /// Select these ids.
    Select {
        ids: Vec<String>,
        /// Path of the largest file, when other media files were left out.
        largest_only: Option<String>,
    },
    /// The listing holds no media files.
    NoMediaFiles,
    /// No cached group matches the wanted files.
    NotCached {
        /// A cached group holds the primary file, but only together with other files.
        extra_files_group: Option<FileGroup>,
    },
}

/// Decide which files to select.
///
/// `cached_groups` is `Some` when cache membership must be enforced; the
/// wanted id set must then equal one of the groups exactly.
pub fn plan_selection(
    files: &[TorrentFile],
    only_largest_file: bool,
    cached_groups: Option<&[FileGroup]>,
) -> SelectionPlan {
    let media: Vec<&TorrentFile> = files.iter().filter(|f| is_media_file(&f.path)).collect();

    // First file wins on equal size.
    let Some(primary) = media
        .iter()
        .copied()
        .reduce(|best, f| if f.bytes > best.bytes { f } else { best })
    else {
        return SelectionPlan::NoMediaFiles;
    };
    let primary_id = primary.id.to_string();

    let ids: Vec<String> = if only_largest_file {
        vec![primary_id.clone()]
    } else {
        media.iter().map(|f| f.id.to_string()).collect()
    };

    if let Some(groups) = cached_groups {
        let target: BTreeSet<String> = ids.iter().cloned().collect();
        if !groups.iter().any(|g| *g == target) {
            let extra_files_group = if only_largest_file {
                groups.iter().find(|g| g.contains(&primary_id)).cloned()
            } else {
                None
            };
            return SelectionPlan::NotCached { extra_files_group };
        }
    }

    let largest_only = (only_largest_file && media.len() > 1).then(|| primary.path.clone());

    SelectionPlan::Select { ids, largest_only }
}
