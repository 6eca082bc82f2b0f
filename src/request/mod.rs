//! The request descriptor: what is pictured, which face, cropped or not,
//! which size tier, and caching flags
//!
//! An [`ImageRequest`] is the identity the whole pipeline is keyed on. It is
//! the key for the in-flight single-flight map, the key for the loader's
//! recent-result cache, and (through [`ImageRequest::path`]) the key into the
//! on-disk cache. Everything it derives is a pure function of its fields; the
//! descriptor itself never touches the network or the filesystem.


use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;
use std::sync::Arc;

use crate::error::ImageFetchError;
use crate::loader::Loader;
use crate::paths::ImageStore;
use crate::printing::Printing;

use image::RgbaImage;

/// Full-resolution card dimensions, uncropped
pub const ORIGINAL_SIZE: (u32, u32) = (745, 1040);
/// Full-resolution dimensions of the art window
pub const CROPPED_SIZE: (u32, u32) = (560, 435);

/// Where the remote catalog serves card objects from
pub const SCRYFALL_CARD_API: &str = "https://api.scryfall.com/cards/multiverse";

/// Size tiers an image can be requested at
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SizeSlug {
    #[default]
    Original,
    Medium,
    Small,
    Thumbnail,
}

impl SizeSlug {
    pub const ALL: [Self; 4] = [Self::Original, Self::Medium, Self::Small, Self::Thumbnail];

    /// The short code suffixed to cached file names. Empty for ORIGINAL
    pub fn code(self) -> &'static str {
        match self {
            Self::Original => "",
            Self::Medium => "m",
            Self::Small => "s",
            Self::Thumbnail => "t",
        }
    }

    pub fn scale(self) -> f64 {
        match self {
            Self::Original => 1.0,
            Self::Medium => 0.5,
            Self::Small => 0.3,
            Self::Thumbnail => 0.15,
        }
    }

    /// Concrete pixel dimensions for this tier
    ///
    /// Non-ORIGINAL tiers are derived componentwise from the ORIGINAL
    /// dimensions, so the table stays monotone by construction. Scaled
    /// dimensions truncate, so the half cases land low: MEDIUM is (372, 520).
    pub fn size(self, cropped: bool) -> (u32, u32) {
        let (width, height) = if cropped { CROPPED_SIZE } else { ORIGINAL_SIZE };
        match self {
            Self::Original => (width, height),
            _ => (
                (f64::from(width) * self.scale()) as u32,
                (f64::from(height) * self.scale()) as u32,
            ),
        }
    }
}

/// A caller-defined value that can render itself into an image
///
/// The loader is passed back in so nested imageables can demand sub-images
/// through the normal pipeline. Renders must not assume they are the only
/// in-flight work.
pub trait Imageable: fmt::Debug + Send + Sync {
    /// Stable identifier used for the cached file name
    fn image_name(&self) -> String;

    /// Directory (under the images root, prefixed with `_`) this kind of
    /// imageable is cached in
    fn image_dir_name(&self) -> String;

    fn has_back(&self) -> bool {
        false
    }

    fn render(
        &self,
        size: (u32, u32),
        loader: &Loader,
        back: bool,
        crop: bool,
    ) -> Result<RgbaImage, ImageFetchError>;
}

/// What a request pictures
///
/// `None` means the default/back image; the request still remembers which
/// [`SubjectKind`] it was about so named lookups land in the right directory.
#[derive(Clone, Debug)]
pub enum Subject {
    Printing(Printing),
    Imageable(Arc<dyn Imageable>),
    None,
}

impl Subject {
    fn identity(&self) -> Option<(String, String)> {
        match self {
            Self::Imageable(imageable) => {
                Some((imageable.image_dir_name(), imageable.image_name()))
            }
            Self::Printing(_) | Self::None => None,
        }
    }
}

impl PartialEq for Subject {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Printing(a), Self::Printing(b)) => a == b,
            // Imageables are compared by their declared identity since trait
            // objects have no structural equality
            (Self::Imageable(_), Self::Imageable(_)) => self.identity() == other.identity(),
            (Self::None, Self::None) => true,
            _ => false,
        }
    }
}

impl Eq for Subject {}

impl Hash for Subject {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Self::Printing(printing) => {
                0u8.hash(state);
                printing.hash(state);
            }
            Self::Imageable(imageable) => {
                1u8.hash(state);
                imageable.image_dir_name().hash(state);
                imageable.image_name().hash(state);
            }
            Self::None => 2u8.hash(state),
        }
    }
}

/// The type tag of the subject, preserved even when the subject is absent
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum SubjectKind {
    Printing,
    /// Carries the image directory name of the imageable type
    Imageable(String),
}

/// Immutable descriptor for one image
///
/// Equality and hashing cover every field; two requests differing anywhere
/// are distinct cache keys.
#[derive(Clone, Debug)]
pub struct ImageRequest {
    subject: Subject,
    kind: SubjectKind,
    picture_name: Option<String>,
    back: bool,
    crop: bool,
    size_slug: SizeSlug,
    save: bool,
    cache_only: bool,
    allow_disk_cached: bool,
}

impl ImageRequest {
    fn with_defaults(subject: Subject, kind: SubjectKind) -> Self {
        Self {
            subject,
            kind,
            picture_name: None,
            back: false,
            crop: false,
            size_slug: SizeSlug::Original,
            save: true,
            cache_only: false,
            allow_disk_cached: true,
        }
    }

    pub fn printing(printing: Printing) -> Self {
        Self::with_defaults(Subject::Printing(printing), SubjectKind::Printing)
    }

    pub fn imageable(imageable: Arc<dyn Imageable>) -> Self {
        let kind = SubjectKind::Imageable(imageable.image_dir_name());
        Self::with_defaults(Subject::Imageable(imageable), kind)
    }

    /// A request for a caller-named image of the given kind, with no subject
    /// attached
    pub fn named<N: Into<String>>(picture_name: N, kind: SubjectKind) -> Self {
        let mut request = Self::with_defaults(Subject::None, kind);
        request.picture_name = Some(picture_name.into());
        request
    }

    /// A request for the default card back
    pub fn card_back() -> Self {
        Self::with_defaults(Subject::None, SubjectKind::Printing)
    }

    // Override methods: transformers use these to derive their upstream
    // request, everything not overridden is preserved.

    pub fn with_picture_name<N: Into<String>>(mut self, picture_name: N) -> Self {
        self.picture_name = Some(picture_name.into());
        self
    }

    pub fn with_back(mut self, back: bool) -> Self {
        self.back = back;
        self
    }

    pub fn with_crop(mut self, crop: bool) -> Self {
        self.crop = crop;
        self
    }

    pub fn with_size(mut self, size_slug: SizeSlug) -> Self {
        self.size_slug = size_slug;
        self
    }

    pub fn with_save(mut self, save: bool) -> Self {
        self.save = save;
        self
    }

    pub fn with_cache_only(mut self, cache_only: bool) -> Self {
        self.cache_only = cache_only;
        self
    }

    pub fn with_allow_disk_cached(mut self, allow_disk_cached: bool) -> Self {
        self.allow_disk_cached = allow_disk_cached;
        self
    }

    pub fn subject(&self) -> &Subject {
        &self.subject
    }

    pub fn kind(&self) -> &SubjectKind {
        &self.kind
    }

    pub fn picture_name(&self) -> Option<&str> {
        self.picture_name.as_deref()
    }

    pub fn back(&self) -> bool {
        self.back
    }

    pub fn crop(&self) -> bool {
        self.crop
    }

    pub fn size_slug(&self) -> SizeSlug {
        self.size_slug
    }

    /// Concrete pixel dimensions this request resolves to
    pub fn size(&self) -> (u32, u32) {
        self.size_slug.size(self.crop)
    }

    pub fn save(&self) -> bool {
        self.save
    }

    pub fn cache_only(&self) -> bool {
        self.cache_only
    }

    pub fn allow_disk_cached(&self) -> bool {
        self.allow_disk_cached
    }

    pub fn as_printing(&self) -> Option<&Printing> {
        match &self.subject {
            Subject::Printing(printing) => Some(printing),
            _ => None,
        }
    }

    pub fn as_imageable(&self) -> Option<&Arc<dyn Imageable>> {
        match &self.subject {
            Subject::Imageable(imageable) => Some(imageable),
            _ => None,
        }
    }

    pub fn is_imageable(&self) -> bool {
        matches!(self.subject, Subject::Imageable(_))
    }

    /// Whether a non-default image is expected
    pub fn has_image(&self) -> bool {
        if self.picture_name.is_some() {
            return true;
        }
        match (&self.subject, self.back) {
            (Subject::Imageable(imageable), true) => imageable.has_back(),
            (Subject::Imageable(_), false) => true,
            (Subject::Printing(printing), true) => printing.has_back_face(),
            (Subject::Printing(printing), false) => printing.has_front_face(),
            (Subject::None, _) => false,
        }
    }

    fn identifier(&self) -> String {
        if let Some(name) = &self.picture_name {
            return name.clone();
        }
        match &self.subject {
            Subject::Imageable(imageable) => imageable.image_name(),
            Subject::Printing(printing) => printing.id().to_string(),
            // Unreachable through `has_image`, but harmless
            Subject::None => crate::paths::CARD_BACK_NAME.to_owned(),
        }
    }

    pub fn extension(&self) -> &'static str {
        "png"
    }

    /// The cached file name: `<id>[_b][_crop][_<code>].png`, or the card back
    /// when no image is expected
    pub fn name(&self) -> String {
        let mut name = if self.has_image() {
            let mut name = self.identifier();
            if self.back {
                name.push_str("_b");
            }
            name
        } else {
            crate::paths::CARD_BACK_NAME.to_owned()
        };
        if self.crop {
            name.push_str("_crop");
        }
        let code = self.size_slug.code();
        if !code.is_empty() {
            name.push('_');
            name.push_str(code);
        }
        name.push('.');
        name.push_str(self.extension());
        name
    }

    /// The directory this request caches into: a `_`-prefixed per-type dir
    /// for imageables, the images root for printings, the card-back dir when
    /// no image is expected
    pub fn dir_path(&self, store: &ImageStore) -> PathBuf {
        let imageable_dir = |dir_name: &str| store.images_root().join(format!("_{dir_name}"));

        if self.picture_name.is_some() {
            return match &self.kind {
                SubjectKind::Imageable(dir_name) => imageable_dir(dir_name),
                SubjectKind::Printing => store.images_root().to_owned(),
            };
        }
        if self.has_image() {
            return match &self.subject {
                Subject::Imageable(imageable) => imageable_dir(&imageable.image_dir_name()),
                _ => store.images_root().to_owned(),
            };
        }
        store.card_back_dir().to_owned()
    }

    pub fn path(&self, store: &ImageStore) -> PathBuf {
        self.dir_path(store).join(self.name())
    }

    /// The catalog URL for this printing's card object
    pub fn remote_card_uri(&self) -> Option<String> {
        self.card_uri(SCRYFALL_CARD_API)
    }

    pub(crate) fn card_uri(&self, base: &str) -> Option<String> {
        self.as_printing()
            .map(|printing| format!("{}/{}", base, printing.id()))
    }
}

impl PartialEq for ImageRequest {
    fn eq(&self, other: &Self) -> bool {
        self.subject == other.subject
            && self.kind == other.kind
            && self.picture_name == other.picture_name
            && self.back == other.back
            && self.crop == other.crop
            && self.size_slug == other.size_slug
            && self.save == other.save
            && self.cache_only == other.cache_only
            && self.allow_disk_cached == other.allow_disk_cached
    }
}

impl Eq for ImageRequest {}

impl Hash for ImageRequest {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.subject.hash(state);
        self.kind.hash(state);
        self.picture_name.hash(state);
        self.back.hash(state);
        self.crop.hash(state);
        self.size_slug.hash(state);
        self.save.hash(state);
        self.cache_only.hash(state);
        self.allow_disk_cached.hash(state);
    }
}

impl fmt::Display for ImageRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}
