//! Drop-folder descriptor files.

use std::path::{Path, PathBuf};

/// Subfolder holding claimed descriptors.
pub const PROCESSING_DIR: &str = "processing";
/// Subfolder holding published content.
pub const COMPLETED_DIR: &str = "completed";

/// How the content is described.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptorKind {
    /// A `.torrent` metainfo file.
    TorrentFile,
    /// A `.magnet` file holding a magnet URI.
    Magnet,
}

impl DescriptorKind {
    /// Kind for a file extension, matched case-insensitively.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "torrent" => Some(DescriptorKind::TorrentFile),
            "magnet" => Some(DescriptorKind::Magnet),
            _ => None,
        }
    }
}

/// One dropped file and every path it occupies during processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Descriptor {
    pub raw_filename: String,
    /// File name without its extension.
    pub stem: String,
    pub kind: DescriptorKind,
    /// Where the manager dropped the file.
    pub source_path: PathBuf,
    /// Where the file lives once claimed.
    pub processing_path: PathBuf,
    /// `<watch root>/completed/<stem>`
    pub destination_folder: PathBuf,
    /// `<mount root>/<stem>`, a last-resort mount candidate.
    pub expected_mount_path: PathBuf,
}

impl Descriptor {
    /// Build a descriptor for `filename` inside `watch_root`.
    ///
    /// Returns `None` for anything that is not a torrent or magnet file.
    pub fn from_filename(filename: &str, watch_root: &Path, mount_root: &Path) -> Option<Self> {
        let (stem, ext) = filename.rsplit_once('.')?;
        if stem.is_empty() {
            return None;
        }
        let kind = DescriptorKind::from_extension(ext)?;

        Some(Self {
            raw_filename: filename.to_string(),
            stem: stem.to_string(),
            kind,
            source_path: watch_root.join(filename),
            processing_path: watch_root.join(PROCESSING_DIR).join(filename),
            destination_folder: watch_root.join(COMPLETED_DIR).join(stem),
            expected_mount_path: mount_root.join(stem),
        })
    }

    /// Whether a previous run already published this item.
    pub fn is_published(&self) -> bool {
        self.destination_folder.exists()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_torrent_descriptor_paths() {
        let d = Descriptor::from_filename(
            "Movie.2020.1080p.torrent",
            Path::new("/watch/radarr"),
            Path::new("/mnt/torrents"),
        )
        .unwrap();

        assert_eq!(d.kind, DescriptorKind::TorrentFile);
        assert_eq!(d.stem, "Movie.2020.1080p");
        assert_eq!(d.source_path, PathBuf::from("/watch/radarr/Movie.2020.1080p.torrent"));
        assert_eq!(
            d.processing_path,
            PathBuf::from("/watch/radarr/processing/Movie.2020.1080p.torrent")
        );
        assert_eq!(
            d.destination_folder,
            PathBuf::from("/watch/radarr/completed/Movie.2020.1080p")
        );
        assert_eq!(d.expected_mount_path, PathBuf::from("/mnt/torrents/Movie.2020.1080p"));
    }

    #[test]
    fn test_extension_is_case_insensitive() {
        let d = Descriptor::from_filename("Show S01.MAGNET", Path::new("/w"), Path::new("/m"))
            .unwrap();
        assert_eq!(d.kind, DescriptorKind::Magnet);
        assert_eq!(d.stem, "Show S01");
    }

    #[test]
    fn test_other_files_are_ignored() {
        let root = Path::new("/w");
        let mount = Path::new("/m");
        assert!(Descriptor::from_filename("notes.txt", root, mount).is_none());
        assert!(Descriptor::from_filename("torrent", root, mount).is_none());
        assert!(Descriptor::from_filename(".torrent", root, mount).is_none());
    }

    #[test]
    fn test_is_published_checks_destination() {
        let dir = tempfile::tempdir().unwrap();
        let d = Descriptor::from_filename("A.torrent", dir.path(), Path::new("/m")).unwrap();
        assert!(!d.is_published());

        std::fs::create_dir_all(&d.destination_folder).unwrap();
        assert!(d.is_published());
    }
}
