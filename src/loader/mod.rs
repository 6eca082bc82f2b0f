//! The facade callers hand requests to
//!
//! A [`Loader`] owns two bounded worker pools (printings do network and disk
//! work, imageables render themselves and may recursively demand more
//! images), a small LRU over recent results, and the default card back. Each
//! request gets the pipeline its flags call for and an [`ImageHandle`] that
//! resolves exactly once with the outcome. Dropping the handle never cancels
//! the task — the disk cache gets populated either way.


use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::Arc;

use crate::awaiter::Slot;
use crate::crop::{crop_by_layout, resize_to};
use crate::disk;
use crate::error::ImageFetchError;
use crate::paths::{self, ImageStore};
use crate::pipeline::{self, CardImage, ImageSource, SourceOutput, Stages};
use crate::pool::WorkerPool;
use crate::request::{ImageRequest, SizeSlug, SCRYFALL_CARD_API};
use crate::scryfall::CatalogClient;

use lru::LruCache;
use parking_lot::Mutex;

/// The loader's knobs. `..Default::default()` is the intended way to set just
/// one of them
#[derive(Clone, Debug)]
pub struct LoaderOptions {
    /// Workers fetching and transforming printings
    pub printing_workers: usize,
    /// Workers driving imageable renders
    pub imageable_workers: usize,
    /// Recent-result cache capacity, `None` to disable
    pub image_cache_capacity: Option<NonZeroUsize>,
    /// Override the on-disk images root
    pub images_root: Option<PathBuf>,
    /// Where card objects are served from; tests point this at a local server
    pub catalog_base: String,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            printing_workers: 8,
            imageable_workers: 4,
            image_cache_capacity: NonZeroUsize::new(64),
            images_root: None,
            catalog_base: SCRYFALL_CARD_API.to_owned(),
        }
    }
}

/// A one-shot handle to a requested image
///
/// Resolves to the decoded raster, or to `None` for requests that only warm
/// the cache. Waiting is idempotent — every call observes the same outcome.
pub struct ImageHandle {
    slot: Arc<Slot<SourceOutput>>,
}

impl ImageHandle {
    fn ready(outcome: Result<SourceOutput, ImageFetchError>) -> Self {
        Self {
            slot: Slot::ready(outcome),
        }
    }

    /// Block until the task completes
    pub fn wait(&self) -> Result<SourceOutput, ImageFetchError> {
        self.slot.wait()
    }

    /// The outcome, if the task has already completed
    pub fn try_get(&self) -> Option<Result<SourceOutput, ImageFetchError>> {
        self.slot.value()
    }
}

struct LoaderInner {
    store: ImageStore,
    catalog: CatalogClient,
    stages: Stages,
    printing_pool: WorkerPool,
    imageable_pool: WorkerPool,
    recent: Option<Mutex<LruCache<ImageRequest, CardImage>>>,
    default_images: Mutex<HashMap<(SizeSlug, bool), CardImage>>,
}

#[derive(Clone)]
pub struct Loader {
    inner: Arc<LoaderInner>,
}

impl Default for Loader {
    fn default() -> Self {
        Self::new(LoaderOptions::default())
    }
}

impl Loader {
    pub fn new(options: LoaderOptions) -> Self {
        let store = match options.images_root {
            Some(root) => ImageStore::new(root),
            None => ImageStore::default_locations(),
        };
        if let Err(err) = store.ensure_card_back() {
            tracing::warn!("failed materializing the bundled card back: {err}");
        }

        let recent = options
            .image_cache_capacity
            .map(|capacity| Mutex::new(LruCache::new(capacity)));

        Self {
            inner: Arc::new(LoaderInner {
                store,
                catalog: CatalogClient::new(options.catalog_base),
                stages: Stages::new(),
                printing_pool: WorkerPool::new("cardimg-printing", options.printing_workers),
                imageable_pool: WorkerPool::new("cardimg-imageable", options.imageable_workers),
                recent,
                default_images: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Hand `request` to the right pool and return a handle to its outcome
    pub fn get_image(&self, request: ImageRequest) -> ImageHandle {
        if Self::worth_remembering(&request) {
            if let Some(recent) = &self.inner.recent {
                if let Some(image) = recent.lock().get(&request) {
                    tracing::debug!(%request, "recent-result cache hit");
                    return ImageHandle::ready(Ok(Some(Arc::clone(image))));
                }
            }
        }

        let slot = Slot::pending();
        let handle = ImageHandle {
            slot: Arc::clone(&slot),
        };

        let loader = self.clone();
        let job_request = request.clone();
        let job_slot = Arc::clone(&slot);
        let job = move || {
            let pipeline = pipeline::build(&job_request, loader.stages());
            let outcome = pipeline.get_image(&job_request, &loader);
            if let Err(err) = &outcome {
                tracing::warn!(request = %job_request, "image task failed: {err}");
            }
            if let Ok(Some(image)) = &outcome {
                loader.remember(&job_request, image);
            }
            job_slot.resolve(outcome);
        };

        let pool = if request.is_imageable() {
            &self.inner.imageable_pool
        } else {
            &self.inner.printing_pool
        };
        if let Err(err) = pool.submit(job) {
            slot.resolve(Err(err));
        }
        handle
    }

    /// The bundled card back at the requested tier
    ///
    /// Smaller uncropped tiers are generated lazily by resampling the
    /// ORIGINAL and cached back to disk; cropped card backs are carved with
    /// the standard recipe and kept in memory only.
    pub fn get_default_image(
        &self,
        size_slug: SizeSlug,
        crop: bool,
    ) -> Result<CardImage, ImageFetchError> {
        if let Some(image) = self.inner.default_images.lock().get(&(size_slug, crop)) {
            return Ok(Arc::clone(image));
        }

        let image = if crop {
            let cropped = crop_by_layout(&*self.card_back_original()?, None, false);
            if size_slug == SizeSlug::Original {
                Arc::new(cropped)
            } else {
                Arc::new(resize_to(&cropped, size_slug, true))
            }
        } else if size_slug == SizeSlug::Original {
            self.card_back_original()?
        } else {
            let path = self.inner.store.card_back_path(size_slug);
            match disk::load_from_disk(&path) {
                Ok(image) => image,
                Err(_) => {
                    let resized = resize_to(&*self.card_back_original()?, size_slug, false);
                    disk::save_to_disk(&path, &resized)?;
                    Arc::new(resized)
                }
            }
        };

        self.inner
            .default_images
            .lock()
            .insert((size_slug, crop), Arc::clone(&image));
        Ok(image)
    }

    /// Stop accepting work. In-flight tasks run to completion; their handles
    /// still resolve
    pub fn stop(&self) {
        self.inner.printing_pool.stop();
        self.inner.imageable_pool.stop();
    }

    fn card_back_original(&self) -> Result<CardImage, ImageFetchError> {
        match disk::load_from_disk(&self.inner.store.card_back_path(SizeSlug::Original)) {
            Ok(image) => Ok(image),
            // Fall back to the compiled-in copy when the materialized file
            // went missing
            Err(_) => {
                let image = image::load_from_memory(paths::CARD_BACK_BYTES)
                    .map_err(|_| ImageFetchError::Decode)?;
                Ok(Arc::new(image.into_rgba8()))
            }
        }
    }

    // Forced recomputations have to reach the pipeline, and cache-only
    // absences aren't worth a cache entry.
    fn worth_remembering(request: &ImageRequest) -> bool {
        request.allow_disk_cached() && !request.cache_only()
    }

    fn remember(&self, request: &ImageRequest, image: &CardImage) {
        if !Self::worth_remembering(request) {
            return;
        }
        if let Some(recent) = &self.inner.recent {
            recent.lock().put(request.clone(), Arc::clone(image));
        }
    }

    pub(crate) fn store(&self) -> &ImageStore {
        &self.inner.store
    }

    pub(crate) fn catalog(&self) -> &CatalogClient {
        &self.inner.catalog
    }

    pub(crate) fn stages(&self) -> &Stages {
        &self.inner.stages
    }
}
