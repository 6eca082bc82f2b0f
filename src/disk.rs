//! The on-disk image cache adapter
//!
//! Loads decode eagerly so no file handle outlives the call. Saves go through
//! a sibling temp file and a rename, so a concurrent reader either sees the
//! previous file, nothing, or the complete new file — never a torn write.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use crate::error::ImageFetchError;
use crate::pipeline::CardImage;

use image::{ImageFormat, RgbaImage};

/// Read and fully decode a cached image
///
/// All flavors of failure (missing, unreadable, corrupt) surface as
/// [`ImageFetchError`]; callers treating this as a cache probe catch them
/// wholesale.
pub fn load_from_disk(path: &Path) -> Result<CardImage, ImageFetchError> {
    let bytes = fs::read(path).map_err(|_| ImageFetchError::MissingLocalFile(path.to_owned()))?;
    let image = image::load_from_memory(&bytes).map_err(|err| {
        tracing::warn!("corrupt cached image at {}: {err}", path.display());
        ImageFetchError::Decode
    })?;
    Ok(Arc::new(image.into_rgba8()))
}

/// Encode `image` as PNG at `path`, creating directories as needed
pub fn save_to_disk(path: &Path, image: &RgbaImage) -> Result<(), ImageFetchError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut file_name = path
        .file_name()
        .ok_or_else(|| ImageFetchError::Storage(format!("no file name in {}", path.display())))?
        .to_owned();
    file_name.push(".tmp");
    let staging = path.with_file_name(file_name);

    image
        .save_with_format(&staging, ImageFormat::Png)
        .map_err(|err| ImageFetchError::Storage(err.to_string()))?;
    fs::rename(&staging, path)?;
    tracing::debug!("stored {}", path.display());
    Ok(())
}
