//! Card artwork retrieval and memoization.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use image::imageops::{self, FilterType};
use image::RgbaImage;
use tracing::{debug, warn};

use crate::catalog::{ArtworkRef, Catalog};
use crate::error::{DeckError, Result};

/// How a fetched image is fitted into its target box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CropMode {
    /// Scale to the box.
    Fit,
    /// Scale to the box, then keep only the top `rows`.
    Top { rows: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtworkKey {
    pub card_id: String,
    pub width: u32,
    pub height: u32,
    pub crop: CropMode,
}

/// Outcome of an artwork request; failures never escape as errors.
#[derive(Debug, Clone)]
pub enum Artwork {
    Ready(RgbaImage),
    Unavailable,
}

/// Anything that can turn an artwork URL into encoded image bytes.
pub trait ArtworkSource {
    fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

/// Blocking HTTP(S) source with a per-request timeout.
pub struct HttpArtworkSource {
    client: reqwest::blocking::Client,
}

impl HttpArtworkSource {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("deckforge/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| DeckError::fetch("<client>", err))?;
        Ok(Self { client })
    }
}

impl ArtworkSource for HttpArtworkSource {
    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .send()
            .and_then(|resp| resp.error_for_status())
            .map_err(|err| DeckError::fetch(url, err))?;
        let bytes = response.bytes().map_err(|err| DeckError::fetch(url, err))?;
        Ok(bytes.to_vec())
    }
}

struct CachedArtwork {
    fetched_at: Instant,
    image: RgbaImage,
}

/// Fitted artwork keyed by (card, size, crop). Entries expire after `ttl`;
/// failed fetches are never stored.
pub struct ArtworkCache {
    ttl: Duration,
    entries: HashMap<ArtworkKey, CachedArtwork>,
}

impl ArtworkCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Cached artwork for `key`, fetching from `source` on a miss or after expiry.
    pub fn get_or_fetch(
        &mut self,
        source: &dyn ArtworkSource,
        catalog: &Catalog,
        url_template: &str,
        key: &ArtworkKey,
    ) -> Artwork {
        if let Some(hit) = self.entries.get(key) {
            if hit.fetched_at.elapsed() < self.ttl {
                debug!(card_id = %key.card_id, "artwork cache hit");
                return Artwork::Ready(hit.image.clone());
            }
        }
        self.entries.remove(key);
        let url = artwork_url(catalog, &key.card_id, url_template);
        match source.fetch(&url).and_then(|bytes| fit(&bytes, &url, key)) {
            Ok(image) => {
                self.entries.insert(
                    key.clone(),
                    CachedArtwork {
                        fetched_at: Instant::now(),
                        image: image.clone(),
                    },
                );
                Artwork::Ready(image)
            }
            Err(err) => {
                warn!(card_id = %key.card_id, %err, "artwork unavailable");
                Artwork::Unavailable
            }
        }
    }
}

/// Explicit external URL for custom cards, otherwise the catalog template.
pub fn artwork_url(catalog: &Catalog, card_id: &str, template: &str) -> String {
    catalog
        .resolve(card_id)
        .map(|record| record.artwork_ref())
        .unwrap_or_else(|| ArtworkRef::Catalog(card_id.to_string()))
        .url(template)
}

fn fit(bytes: &[u8], url: &str, key: &ArtworkKey) -> Result<RgbaImage> {
    let decoded = image::load_from_memory(bytes).map_err(|err| DeckError::fetch(url, err))?;
    let scaled = imageops::resize(&decoded.to_rgba8(), key.width, key.height, FilterType::Triangle);
    Ok(match key.crop {
        CropMode::Fit => scaled,
        CropMode::Top { rows } => {
            imageops::crop_imm(&scaled, 0, 0, key.width, rows.min(key.height)).to_image()
        }
    })
}

#[cfg(test)]
pub(crate) mod fakes {
    use std::cell::RefCell;
    use std::collections::HashMap;

    use image::{DynamicImage, Rgba, RgbaImage};

    use super::*;

    /// In-memory source serving solid-color PNGs; unknown URLs fail.
    #[derive(Default)]
    pub struct FakeSource {
        images: HashMap<String, Vec<u8>>,
        pub requests: RefCell<Vec<String>>,
    }

    impl FakeSource {
        pub fn with(mut self, url: &str, color: [u8; 4]) -> Self {
            let img = RgbaImage::from_pixel(40, 56, Rgba(color));
            let mut out = std::io::Cursor::new(Vec::new());
            DynamicImage::ImageRgba8(img)
                .write_to(&mut out, image::ImageFormat::Png)
                .unwrap();
            self.images.insert(url.to_string(), out.into_inner());
            self
        }
    }

    impl ArtworkSource for FakeSource {
        fn fetch(&self, url: &str) -> Result<Vec<u8>> {
            self.requests.borrow_mut().push(url.to_string());
            self.images
                .get(url)
                .cloned()
                .ok_or_else(|| DeckError::fetch(url, "404 not found"))
        }
    }
}
