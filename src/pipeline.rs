//! The image-resolution pipeline: fetch → crop → resize → cache-gate
//!
//! Every stage follows the same protocol: consult the disk cache, coalesce
//! onto in-flight work for the same descriptor, otherwise produce — pulling
//! from the wrapped source with a normalized upstream request — persist, and
//! publish. Persisting happens *before* publishing, so once a slot disappears
//! the on-disk artifact is already visible and a late arrival is a plain disk
//! hit instead of duplicate work.

use std::sync::Arc;

use crate::awaiter::{Claim, SlotOwner, TaskAwaiter};
use crate::crop::{crop_by_layout, resize_to};
use crate::disk;
use crate::error::ImageFetchError;
use crate::loader::Loader;
use crate::request::{ImageRequest, SizeSlug};

use image::imageops::{self, FilterType};
use image::RgbaImage;

/// A decoded raster, shared cheaply with every coalesced waiter
pub type CardImage = Arc<RgbaImage>;

/// `None` is the deliberate absence a cache-only request resolves to
pub type SourceOutput = Option<CardImage>;

pub(crate) type StageTasks = Arc<TaskAwaiter<SourceOutput>>;

/// One stage of the pipeline
pub trait ImageSource: Send + Sync {
    fn get_image(
        &self,
        request: &ImageRequest,
        loader: &Loader,
    ) -> Result<SourceOutput, ImageFetchError>;
}

/// Run `produce` as the owner of `request`'s slot, publishing whatever comes
/// out of it so every waiter observes the same outcome
fn publish<F>(
    owner: SlotOwner<'_, SourceOutput>,
    produce: F,
) -> Result<SourceOutput, ImageFetchError>
where
    F: FnOnce() -> Result<SourceOutput, ImageFetchError>,
{
    match produce() {
        Ok(value) => {
            owner.fulfill(value.clone());
            Ok(value)
        }
        Err(err) => {
            owner.fail(err.clone());
            Err(err)
        }
    }
}

/// Produces ORIGINAL-size uncropped rasters for printings from the remote
/// catalog
pub struct Fetcher {
    tasks: StageTasks,
}

impl Fetcher {
    pub(crate) fn new(tasks: StageTasks) -> Self {
        Self { tasks }
    }
}

impl ImageSource for Fetcher {
    fn get_image(
        &self,
        request: &ImageRequest,
        loader: &Loader,
    ) -> Result<SourceOutput, ImageFetchError> {
        let path = request.path(loader.store());
        if request.allow_disk_cached() {
            match disk::load_from_disk(&path) {
                Ok(image) => return Ok(Some(image)),
                Err(_) => {
                    // Only now do we know the request actually needs work; a
                    // named image can't be fetched and a missing face has
                    // nothing to fetch
                    if let Some(name) = request.picture_name() {
                        return Err(ImageFetchError::NoLocalImage(name.to_owned()));
                    }
                    if !request.has_image() {
                        return Err(ImageFetchError::MissingDefault);
                    }
                }
            }
        }

        let owner = match self.tasks.claim(request) {
            Claim::Waiter(slot) => return slot.wait(),
            Claim::Owner(owner) => owner,
        };

        publish(owner, || {
            let Some(printing) = request.as_printing() else {
                return Err(match request.picture_name() {
                    Some(name) => ImageFetchError::NoLocalImage(name.to_owned()),
                    None => ImageFetchError::MissingDefault,
                });
            };
            let image = Arc::new(loader.catalog().fetch_original(request, printing)?);
            if request.save() {
                disk::save_to_disk(&path, &image)?;
            }
            Ok(Some(image))
        })
    }
}

/// Produces images for subjects that render themselves
pub struct ImageableProcessor {
    tasks: StageTasks,
}

impl ImageableProcessor {
    pub(crate) fn new(tasks: StageTasks) -> Self {
        Self { tasks }
    }
}

impl ImageSource for ImageableProcessor {
    fn get_image(
        &self,
        request: &ImageRequest,
        loader: &Loader,
    ) -> Result<SourceOutput, ImageFetchError> {
        let path = request.path(loader.store());
        if request.allow_disk_cached() {
            if request.cache_only() {
                // Already warm, nothing to do
                if path.exists() {
                    return Ok(None);
                }
            } else if let Ok(image) = disk::load_from_disk(&path) {
                return Ok(Some(image));
            }
        }

        let owner = match self.tasks.claim(request) {
            Claim::Waiter(slot) => return slot.wait(),
            Claim::Owner(owner) => owner,
        };

        publish(owner, || {
            let imageable = request
                .as_imageable()
                .ok_or(ImageFetchError::MissingDefault)?;
            let size = request.size();
            // No awaiter lock is held here, so the render is free to demand
            // sub-images back through the loader
            let image =
                imageable.render(size, loader, request.back(), request.crop())?;
            let image = if image.dimensions() == size {
                image
            } else {
                imageops::resize(&image, size.0, size.1, FilterType::Lanczos3)
            };
            let image = Arc::new(image);
            if request.save() {
                disk::save_to_disk(&path, &image)?;
            }
            Ok(if request.cache_only() {
                None
            } else {
                Some(image)
            })
        })
    }
}

/// What a transformer stage contributes on top of the shared protocol: how to
/// normalize the upstream request and the pure image operation itself
pub(crate) trait TransformOp: Send + Sync {
    fn upstream(&self, request: &ImageRequest) -> ImageRequest;
    fn apply(&self, image: &RgbaImage, request: &ImageRequest) -> RgbaImage;
}

/// A stage that wraps an inner source and post-processes its output
///
/// The upstream request preserves everything but the normalized field —
/// including `save`, so intermediate artifacts populate their own cache
/// entries on the way through.
pub struct Transformer<Op> {
    source: Box<dyn ImageSource>,
    tasks: StageTasks,
    op: Op,
}

impl<Op: TransformOp> ImageSource for Transformer<Op> {
    fn get_image(
        &self,
        request: &ImageRequest,
        loader: &Loader,
    ) -> Result<SourceOutput, ImageFetchError> {
        let path = request.path(loader.store());
        if request.allow_disk_cached() {
            if let Ok(image) = disk::load_from_disk(&path) {
                return Ok(Some(image));
            }
        }

        let owner = match self.tasks.claim(request) {
            Claim::Waiter(slot) => return slot.wait(),
            Claim::Owner(owner) => owner,
        };

        publish(owner, || {
            let upstream = self.op.upstream(request);
            let Some(source_image) = self.source.get_image(&upstream, loader)? else {
                return Ok(None);
            };
            let processed = Arc::new(self.op.apply(&source_image, request));
            if request.save() {
                disk::save_to_disk(&path, &processed)?;
            }
            Ok(Some(processed))
        })
    }
}

pub(crate) struct CropOp;

impl TransformOp for CropOp {
    fn upstream(&self, request: &ImageRequest) -> ImageRequest {
        request.clone().with_crop(false)
    }

    fn apply(&self, image: &RgbaImage, request: &ImageRequest) -> RgbaImage {
        crop_by_layout(image, request.as_printing(), request.back())
    }
}

pub(crate) struct ResizeOp;

impl TransformOp for ResizeOp {
    fn upstream(&self, request: &ImageRequest) -> ImageRequest {
        // Resizing always starts from the full-resolution artifact, no matter
        // what order requests arrive in
        request.clone().with_size(SizeSlug::Original)
    }

    fn apply(&self, image: &RgbaImage, request: &ImageRequest) -> RgbaImage {
        resize_to(image, request.size_slug(), request.crop())
    }
}

/// Crops the wrapped source's output to the art window
pub type Cropper = Transformer<CropOp>;

impl Cropper {
    pub(crate) fn cropping(source: Box<dyn ImageSource>, tasks: StageTasks) -> Self {
        Self {
            source,
            tasks,
            op: CropOp,
        }
    }
}

/// Resamples the wrapped source's output down to the requested tier
pub type Resizer = Transformer<ResizeOp>;

impl Resizer {
    pub(crate) fn resizing(source: Box<dyn ImageSource>, tasks: StageTasks) -> Self {
        Self {
            source,
            tasks,
            op: ResizeOp,
        }
    }
}

/// Runs the wrapped source purely for its persistence side effect
pub struct CacheOnly {
    source: Box<dyn ImageSource>,
}

impl CacheOnly {
    pub(crate) fn new(source: Box<dyn ImageSource>) -> Self {
        Self { source }
    }
}

impl ImageSource for CacheOnly {
    fn get_image(
        &self,
        request: &ImageRequest,
        loader: &Loader,
    ) -> Result<SourceOutput, ImageFetchError> {
        self.source.get_image(request, loader)?;
        Ok(None)
    }
}

/// Stage-kind awaiters, one set per loader so keys are disambiguated by the
/// stage they're pending in
pub(crate) struct Stages {
    fetch: StageTasks,
    imageable: StageTasks,
    crop: StageTasks,
    resize: StageTasks,
}

impl Stages {
    pub(crate) fn new() -> Self {
        Self {
            fetch: Arc::new(TaskAwaiter::new()),
            imageable: Arc::new(TaskAwaiter::new()),
            crop: Arc::new(TaskAwaiter::new()),
            resize: Arc::new(TaskAwaiter::new()),
        }
    }

    /// Total keys pending across every stage
    pub(crate) fn in_flight(&self) -> usize {
        self.fetch.in_flight()
            + self.imageable.in_flight()
            + self.crop.in_flight()
            + self.resize.in_flight()
    }
}

/// Assemble the stage chain a request calls for
///
/// Imageables resolve in a single stage — their `render` already honors size
/// and crop, and the processor itself withholds the value under `cache_only`.
/// Printings build up from the fetcher, inside out.
pub(crate) fn build(request: &ImageRequest, stages: &Stages) -> Box<dyn ImageSource> {
    if request.is_imageable() {
        return Box::new(ImageableProcessor::new(Arc::clone(&stages.imageable)));
    }

    let mut source: Box<dyn ImageSource> = Box::new(Fetcher::new(Arc::clone(&stages.fetch)));
    if request.crop() {
        source = Box::new(Cropper::cropping(source, Arc::clone(&stages.crop)));
    }
    if request.size_slug() != SizeSlug::Original {
        source = Box::new(Resizer::resizing(source, Arc::clone(&stages.resize)));
    }
    if request.cache_only() {
        source = Box::new(CacheOnly::new(source));
    }
    source
}
