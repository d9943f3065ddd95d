//! Owned application state: catalog, working deck, rules and render caches.

use image::{GrayImage, RgbImage};
use tracing::info;

use crate::catalog::Catalog;
use crate::codec::{decode_deck, encode_deck};
use crate::deck::{AddOutcome, Deck, DeckRules, DeckStatus};
use crate::error::Result;
use crate::image::{ArtworkCache, ArtworkSource, Composer, CompositeCache, HttpArtworkSource, LabelFont};
use crate::qr;
use crate::settings::Settings;

pub struct Session {
    catalog: Catalog,
    deck: Deck,
    rules: DeckRules,
    url_template: String,
    source: Box<dyn ArtworkSource>,
    font: LabelFont,
    artwork: ArtworkCache,
    composites: CompositeCache,
}

impl Session {
    /// Session fetching artwork over HTTP with the configured timeout and fonts.
    pub fn new(catalog: Catalog, settings: &Settings) -> Result<Self> {
        let source = HttpArtworkSource::new(settings.artwork_timeout())?;
        let font = LabelFont::load(&settings.font_paths);
        Ok(Self::with_source(catalog, settings, Box::new(source), font))
    }

    pub fn with_source(
        catalog: Catalog,
        settings: &Settings,
        source: Box<dyn ArtworkSource>,
        font: LabelFont,
    ) -> Self {
        Self {
            catalog,
            deck: Deck::new(),
            rules: settings.deck_rules(),
            url_template: settings.artwork_url_template.clone(),
            source,
            font,
            artwork: ArtworkCache::new(settings.artwork_cache_ttl()),
            composites: CompositeCache::new(
                settings.composite_cache_ttl(),
                settings.composite_cache_capacity,
            ),
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn deck(&self) -> &Deck {
        &self.deck
    }

    pub fn rules(&self) -> &DeckRules {
        &self.rules
    }

    pub fn status(&self) -> DeckStatus {
        self.deck.status()
    }

    /// Replace the working deck wholesale.
    pub fn replace_deck(&mut self, deck: Deck) {
        self.deck = deck;
    }

    pub fn set_leader(&mut self, card_id: &str) -> Result<()> {
        self.deck.set_leader(&self.catalog, card_id)
    }

    pub fn set_name(&mut self, name: Option<&str>) -> Result<()> {
        self.deck.set_name(name)
    }

    pub fn add_copy(&mut self, card_id: &str) -> Result<AddOutcome> {
        self.deck.add_copy(&self.catalog, &self.rules, card_id)
    }

    pub fn remove_copy(&mut self, card_id: &str) -> u32 {
        self.deck.remove_copy(card_id)
    }

    pub fn clear(&mut self) {
        self.deck.clear();
    }

    pub fn export_text(&self) -> Result<String> {
        encode_deck(&self.deck, &self.catalog)
    }

    /// Decode deck text; the working deck is only replaced when decoding succeeds.
    pub fn import_text(&mut self, text: &str) -> Result<&Deck> {
        let deck = decode_deck(text, &self.catalog)?;
        info!(leader = deck.leader(), cards = deck.total_count(), "deck imported");
        self.deck = deck;
        Ok(&self.deck)
    }

    /// Read a QR code from image bytes and import its payload.
    pub fn import_image(&mut self, bytes: &[u8]) -> Result<&Deck> {
        let text = qr::decode_bytes(bytes)?;
        self.import_text(&text)
    }

    pub fn qr_panel(&self) -> Result<GrayImage> {
        qr::encode_panel(&self.export_text()?)
    }

    /// Composite image of the working deck, memoized per deck fingerprint.
    pub fn render(&mut self) -> Result<RgbImage> {
        let composer = Composer {
            catalog: &self.catalog,
            source: self.source.as_ref(),
            font: &self.font,
            url_template: &self.url_template,
        };
        let artwork = &mut self.artwork;
        self.composites
            .get_or_render(&self.deck, |deck| composer.render(deck, artwork))
    }
}
