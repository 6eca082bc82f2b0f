//! Where cached images live on disk
//!
//! The layout is rooted at the platform app-data directory by default:
//!
//! ```text
//! <app_data>/cardimg/images/            printings, flat
//! <app_data>/cardimg/images/_<type>/    imageables, one dir per declared type
//! <app_data>/cardimg/cardback/          the bundled card back + resized tiers
//! ```
//!
//! Dropping a path into `<app_data>/cardimg/imagepath.txt` relocates the
//! images root without touching any code.

use std::fs;
use std::path::{Path, PathBuf};

use crate::request::SizeSlug;

use once_cell::sync::Lazy;

/// The ORIGINAL card back, shipped inside the crate
pub(crate) const CARD_BACK_BYTES: &[u8] = include_bytes!("../assets/cardback/cardback.png");

pub const CARD_BACK_NAME: &str = "cardback";

/// Platform app-data directory everything defaults under
pub static APP_DATA_PATH: Lazy<PathBuf> = Lazy::new(|| {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("cardimg")
});

/// Resolved on-disk locations for one loader
///
/// Kept per-loader instead of process-global so isolated roots (read: tests)
/// can coexist in one process.
#[derive(Clone, Debug)]
pub struct ImageStore {
    images_root: PathBuf,
    card_back_dir: PathBuf,
}

impl ImageStore {
    /// Store rooted at `images_root`, with the card-back directory as its
    /// `cardback` sibling
    pub fn new(images_root: PathBuf) -> Self {
        let card_back_dir = images_root
            .parent()
            .map(|parent| parent.join(CARD_BACK_NAME))
            .unwrap_or_else(|| PathBuf::from(CARD_BACK_NAME));
        Self {
            images_root,
            card_back_dir,
        }
    }

    /// The default platform locations, honoring an `imagepath.txt` override
    ///
    /// The override only moves the images root; the card-back directory stays
    /// put under the app-data directory.
    pub fn default_locations() -> Self {
        let app_data = &*APP_DATA_PATH;
        let images_root = match fs::read_to_string(app_data.join("imagepath.txt")) {
            Ok(contents) if !contents.trim().is_empty() => {
                let root = PathBuf::from(contents.trim());
                tracing::debug!("images root overridden to {}", root.display());
                root
            }
            _ => app_data.join("images"),
        };
        Self {
            images_root,
            card_back_dir: app_data.join(CARD_BACK_NAME),
        }
    }

    pub fn images_root(&self) -> &Path {
        &self.images_root
    }

    pub fn card_back_dir(&self) -> &Path {
        &self.card_back_dir
    }

    /// `cardback.png` for ORIGINAL, `cardback_<code>.png` for the resized tiers
    pub fn card_back_path(&self, size_slug: SizeSlug) -> PathBuf {
        let code = size_slug.code();
        let name = if code.is_empty() {
            format!("{CARD_BACK_NAME}.png")
        } else {
            format!("{CARD_BACK_NAME}_{code}.png")
        };
        self.card_back_dir.join(name)
    }

    /// Write the bundled card back out if it isn't there yet, so requests that
    /// resolve to the default image are plain disk hits
    pub(crate) fn ensure_card_back(&self) -> std::io::Result<()> {
        let path = self.card_back_path(SizeSlug::Original);
        if path.exists() {
            return Ok(());
        }
        fs::create_dir_all(&self.card_back_dir)?;
        fs::write(path, CARD_BACK_BYTES)
    }
}
