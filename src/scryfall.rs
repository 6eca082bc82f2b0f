//! Client for the remote card catalog
//!
//! Two round-trip shapes: a card object (JSON) and a raw image body. Layout
//! indirection lives here too — transforming and modal cards keep per-face
//! image URLs, and a meld back face is a separate card object reachable
//! through `all_parts`.

use std::io::Read;
use std::time::Duration;

use crate::error::ImageFetchError;
use crate::printing::{Layout, Printing};
use crate::request::{ImageRequest, ORIGINAL_SIZE};

use image::imageops::{self, FilterType};
use image::RgbaImage;
use serde::Deserialize;

const TIMEOUT: Duration = Duration::from_secs(30);
const BODY_SIZE_LIMIT: usize = 20 * 1_024 * 1_024;

const USER_AGENT: &str = concat!(
    "cardimg ",
    env!("CARGO_PKG_VERSION"),
    " https://github.com/Inlyne-Project/cardimg"
);

/// The slice of a catalog card object we consume
#[derive(Debug, Deserialize)]
struct RemoteCard {
    #[serde(default)]
    image_uris: Option<ImageUris>,
    #[serde(default)]
    card_faces: Vec<CardFace>,
    #[serde(default)]
    all_parts: Vec<RelatedPart>,
}

#[derive(Debug, Deserialize)]
struct ImageUris {
    png: String,
}

#[derive(Debug, Deserialize)]
struct CardFace {
    #[serde(default)]
    image_uris: Option<ImageUris>,
}

#[derive(Debug, Deserialize)]
struct RelatedPart {
    name: String,
    uri: String,
}

impl RemoteCard {
    /// Pick the image URL for the requested face per the printing's layout
    fn image_url(&self, layout: Layout, back: bool) -> Result<&str, ImageFetchError> {
        let uris = match layout {
            Layout::Transform | Layout::Modal => {
                let face = if back {
                    self.card_faces.last()
                } else {
                    self.card_faces.first()
                };
                face.and_then(|face| face.image_uris.as_ref())
            }
            _ => self.image_uris.as_ref(),
        };
        uris.map(|uris| uris.png.as_str()).ok_or_else(|| {
            ImageFetchError::Transport("card object carries no image url".to_owned())
        })
    }
}

pub(crate) struct CatalogClient {
    agent: ureq::Agent,
    base: String,
}

impl CatalogClient {
    pub(crate) fn new<B: Into<String>>(base: B) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(TIMEOUT)
            .user_agent(USER_AGENT)
            .build();
        Self {
            agent,
            base: base.into(),
        }
    }

    /// Fetch the ORIGINAL-size uncropped raster for `printing`
    pub(crate) fn fetch_original(
        &self,
        request: &ImageRequest,
        printing: &Printing,
    ) -> Result<RgbaImage, ImageFetchError> {
        let card_url = request
            .card_uri(&self.base)
            .expect("only printing requests reach the catalog");
        tracing::debug!(url = %card_url, "fetching remote card");
        let mut card = self.get_card(&card_url)?;

        // A meld pair's shared back is its own card object
        if printing.layout() == Layout::Meld && request.back() {
            let back_name = printing.back_face().map(|face| face.name());
            let back_uri = card
                .all_parts
                .iter()
                .find(|part| Some(part.name.as_str()) == back_name)
                .map(|part| part.uri.clone());
            if let Some(uri) = back_uri {
                card = self.get_card(&uri)?;
            }
        }

        let image_url = card.image_url(printing.layout(), request.back())?;
        let body = self.get_bytes(image_url)?;
        let image = image::load_from_memory(&body)
            .map_err(|_| ImageFetchError::Decode)?
            .into_rgba8();

        // The catalog serves scans at full resolution already; anything else
        // gets normalized so downstream geometry holds
        let image = if image.dimensions() == ORIGINAL_SIZE {
            image
        } else {
            imageops::resize(&image, ORIGINAL_SIZE.0, ORIGINAL_SIZE.1, FilterType::Lanczos3)
        };
        Ok(image)
    }

    fn get_card(&self, url: &str) -> Result<RemoteCard, ImageFetchError> {
        let response = self.agent.get(url).call()?;
        response
            .into_json()
            .map_err(|err| ImageFetchError::Transport(err.to_string()))
    }

    fn get_bytes(&self, url: &str) -> Result<Vec<u8>, ImageFetchError> {
        let response = self.agent.get(url).call()?;
        let len = response
            .header("Content-Length")
            .and_then(|len| len.parse::<usize>().ok());
        let mut body = Vec::with_capacity(len.unwrap_or(0).clamp(0, BODY_SIZE_LIMIT));
        response
            .into_reader()
            .take(u64::try_from(BODY_SIZE_LIMIT).unwrap())
            .read_to_end(&mut body)
            .map_err(|err| ImageFetchError::Transport(err.to_string()))?;
        Ok(body)
    }
}
