//! Local media library
//!
//! Downloaded attachments and their renditions live as flat files in
//! one directory. File names are derived from the remote URL so that
//! re-running an import finds the file already present and skips the
//! download; a name collision between distinct remote files is treated
//! as "already downloaded", never overwritten.

use std::io::Write as _;
use std::path::{Path, PathBuf};

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use image::{DynamicImage, ImageFormat};
use sha2::{Digest, Sha256};
use url::Url;

use crate::error::{ImportError, Result};

const MAX_EXTENSION_LEN: usize = 5;

/// Media library rooted at a single directory
pub struct MediaLibrary {
    root: PathBuf,
}

impl MediaLibrary {
    /// Open the library, creating the directory when missing.
    pub fn new(root: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&root).map_err(|e| {
            ImportError::Media(format!(
                "could not create media directory {}: {e}",
                root.display()
            ))
        })?;

        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute path of a library file.
    pub fn path_of(&self, file_name: &str) -> PathBuf {
        self.root.join(file_name)
    }

    /// Whether a file with this name is already in the library.
    pub fn contains(&self, file_name: &str) -> bool {
        self.path_of(file_name).is_file()
    }

    /// Write a file atomically: the bytes land in a temp file first and
    /// are renamed into place, so a crash never leaves a half-written
    /// attachment under its final name.
    pub fn store(&self, file_name: &str, bytes: &[u8]) -> Result<PathBuf> {
        let path = self.path_of(file_name);

        let mut temp = tempfile::NamedTempFile::new_in(&self.root)
            .map_err(|e| ImportError::Media(format!("could not create temp file: {e}")))?;
        temp.write_all(bytes)
            .map_err(|e| ImportError::Media(format!("could not write {file_name}: {e}")))?;
        temp.persist(&path)
            .map_err(|e| ImportError::Media(format!("could not persist {file_name}: {e}")))?;

        Ok(path)
    }

    /// Generate and store a thumbnail rendition for a library file.
    ///
    /// The rendition keeps aspect ratio with its longest side bounded by
    /// `max_side`, and is written as `{stem}-thumb.{ext}`.
    ///
    /// # Returns
    /// The thumbnail's file name.
    pub fn store_thumbnail(
        &self,
        file_name: &str,
        image: &DynamicImage,
        format: ImageFormat,
        max_side: u32,
    ) -> Result<String> {
        let thumbnail_name = Self::thumbnail_name(file_name);
        let thumbnail = image.thumbnail(max_side, max_side);

        thumbnail
            .save_with_format(self.path_of(&thumbnail_name), format)
            .map_err(|e| {
                ImportError::Media(format!("could not write thumbnail {thumbnail_name}: {e}"))
            })?;

        Ok(thumbnail_name)
    }

    /// Thumbnail file name for a library file: `{stem}-thumb.{ext}`.
    pub fn thumbnail_name(file_name: &str) -> String {
        let path = Path::new(file_name);
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(file_name);

        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) => format!("{stem}-thumb.{ext}"),
            None => format!("{stem}-thumb"),
        }
    }

    /// Derive a library file name from a remote URL's final path
    /// segment.
    ///
    /// Returns `None` when the path carries no usable `name.ext` segment
    /// (e.g. `/media` style URLs); callers fall back to
    /// [`Self::hashed_file_name`] after sniffing the content.
    pub fn derive_file_name(url: &Url) -> Option<String> {
        let segment = url.path_segments()?.filter(|s| !s.is_empty()).next_back()?;

        let sanitized: String = segment
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-' {
                    c
                } else {
                    '-'
                }
            })
            .collect();

        let (stem, extension) = sanitized.rsplit_once('.')?;
        if stem.is_empty()
            || extension.is_empty()
            || extension.len() > MAX_EXTENSION_LEN
            || !extension.chars().all(|c| c.is_ascii_alphanumeric())
        {
            return None;
        }

        Some(sanitized)
    }

    /// Content-addressed fallback name: a URL-safe digest of the full
    /// remote URL plus the sniffed extension. Removes the most common
    /// collision source for URLs without a usable file name.
    pub fn hashed_file_name(url: &Url, extension: &str) -> String {
        let digest = Sha256::digest(url.as_str().as_bytes());
        format!("{}.{}", URL_SAFE_NO_PAD.encode(digest), extension)
    }
}
