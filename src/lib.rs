//! On-demand fetching, transforming, and disk-caching of collectible-card
//! images
//!
//! Callers describe what they want with an [`ImageRequest`] — what is
//! pictured, which face, cropped or not, which size tier, caching flags — and
//! get the decoded raster back through an [`ImageHandle`]. Producing an image
//! can mean a round trip to the remote catalog, carving out the art window,
//! resampling, and writing the result into an on-disk cache; the [`Loader`]
//! runs all of that on bounded worker pools and coalesces identical in-flight
//! requests so the expensive work happens at most once per descriptor.

pub mod awaiter;
pub mod crop;
pub mod disk;
pub mod error;
pub mod loader;
pub mod paths;
pub mod pipeline;
mod pool;
pub mod printing;
pub mod request;
mod scryfall;
#[cfg(test)]
pub mod test_utils;

pub use awaiter::{Claim, Slot, SlotOwner, TaskAwaiter};
pub use crop::{crop_by_layout, resize_to};
pub use disk::{load_from_disk, save_to_disk};
pub use error::ImageFetchError;
pub use loader::{ImageHandle, Loader, LoaderOptions};
pub use paths::ImageStore;
pub use pipeline::{
    CacheOnly, CardImage, Cropper, Fetcher, ImageSource, ImageableProcessor, Resizer,
};
pub use printing::{Face, Layout, Printing};
pub use request::{
    Imageable, ImageRequest, SizeSlug, Subject, SubjectKind, CROPPED_SIZE, ORIGINAL_SIZE,
};
