use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};

use image::imageops::overlay;
use image::{DynamicImage, Rgba, RgbaImage, RgbImage};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::catalog::Catalog;
use crate::codec::encode_deck;
use crate::deck::Deck;
use crate::error::{DeckError, Result};
use crate::qr;

use super::artwork::{Artwork, ArtworkCache, ArtworkKey, ArtworkSource, CropMode};
use super::background::paint_background;
use super::font::LabelFont;

pub const CANVAS_WIDTH: u32 = 2150;
pub const CANVAS_HEIGHT: u32 = 2048;
pub const GRID_HEIGHT: u32 = 1500;
pub const UPPER_HEIGHT: u32 = CANVAS_HEIGHT - GRID_HEIGHT;
pub const GAP: u32 = 48;
/// Leader art keeps the 400:280 proportion of the upper band.
pub const LEADER_WIDTH: u32 = UPPER_HEIGHT * 400 / 280;
pub const LEADER_SCALED_HEIGHT: u32 = UPPER_HEIGHT * 2;
pub const QR_SIZE: u32 = qr::PANEL_SIZE;
pub const QR_X: u32 = CANVAS_WIDTH - QR_SIZE;
pub const QR_Y: u32 = (UPPER_HEIGHT - QR_SIZE) / 2;
pub const NAME_X: u32 = GAP + LEADER_WIDTH + GAP;
pub const NAME_WIDTH: u32 = QR_X - GAP - NAME_X;
pub const GRID_COLUMNS: u32 = 10;
pub const GRID_ROWS: u32 = 5;
pub const GRID_CAPACITY: usize = (GRID_COLUMNS * GRID_ROWS) as usize;
pub const CELL_WIDTH: u32 = CANVAS_WIDTH / GRID_COLUMNS;
pub const CELL_HEIGHT: u32 = GRID_HEIGHT / GRID_ROWS;

const LABEL_PX: f32 = 70.0;
/// Smallest size a long name shrinks to before it is clipped instead.
const LABEL_MIN_PX: f32 = 7.0;
const LABEL_PADDING: u32 = 20;
const LABEL_MARGIN: u32 = 50;
const LABEL_BACKING_ALPHA: u8 = 128;
const LABEL_TEXT: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Everything a composite render reads besides the deck itself.
pub struct Composer<'a> {
    pub catalog: &'a Catalog,
    pub source: &'a dyn ArtworkSource,
    pub font: &'a LabelFont,
    pub url_template: &'a str,
}

impl Composer<'_> {
    /// Render the shareable deck image: gradient background, leader art, name
    /// label, QR code and the first 50 cards in sort order.
    pub fn render(&self, deck: &Deck, artwork: &mut ArtworkCache) -> Result<RgbImage> {
        let leader = deck.leader().ok_or(DeckError::MissingLeader)?;
        let payload = encode_deck(deck, self.catalog)?;
        let leader_colors = self
            .catalog
            .resolve(leader)
            .map(|record| record.color.as_str())
            .unwrap_or("");

        let background = paint_background(leader_colors, CANVAS_WIDTH, CANVAS_HEIGHT);
        let mut canvas = DynamicImage::ImageRgb8(background).to_rgba8();

        let leader_key = ArtworkKey {
            card_id: leader.to_string(),
            width: LEADER_WIDTH,
            height: LEADER_SCALED_HEIGHT,
            crop: CropMode::Top { rows: UPPER_HEIGHT },
        };
        if let Artwork::Ready(art) = self.fetch(artwork, &leader_key) {
            overlay(&mut canvas, &art, GAP as i64, 0);
        }

        let code = DynamicImage::ImageLuma8(qr::encode_panel(&payload)?).to_rgba8();
        overlay(&mut canvas, &code, QR_X as i64, QR_Y as i64);

        if let Some(name) = deck.name() {
            self.draw_label(&mut canvas, name);
        }

        self.draw_grid(&mut canvas, deck, artwork);
        info!(leader, cards = deck.total_count(), "composite rendered");
        Ok(DynamicImage::ImageRgba8(canvas).to_rgb8())
    }

    fn fetch(&self, artwork: &mut ArtworkCache, key: &ArtworkKey) -> Artwork {
        artwork.get_or_fetch(self.source, self.catalog, self.url_template, key)
    }

    /// Largest size up to `LABEL_PX` at which `name` fits inside the backing.
    fn label_px(&self, name: &str) -> f32 {
        let max_w = NAME_WIDTH - 2 * LABEL_MARGIN - 2 * LABEL_PADDING;
        let mut px = LABEL_PX;
        while px > LABEL_MIN_PX && self.font.measure(name, px).0 > max_w {
            px -= 1.0;
        }
        px
    }

    fn draw_label(&self, canvas: &mut RgbaImage, name: &str) {
        let px = self.label_px(name);
        let (text_w, text_h) = self.font.measure(name, px);
        let backing_w = (text_w + 2 * LABEL_PADDING).min(NAME_WIDTH - 2 * LABEL_MARGIN);
        let backing_h = (text_h + 2 * LABEL_PADDING).min(UPPER_HEIGHT - 2 * LABEL_MARGIN);
        let backing_x = NAME_X + (NAME_WIDTH - backing_w) / 2;
        let backing_y = (UPPER_HEIGHT - backing_h) / 2;
        shade(canvas, backing_x, backing_y, backing_w, backing_h, LABEL_BACKING_ALPHA);

        // Text goes through a layer the size of the backing so nothing drawn
        // can reach the leader art or the QR panel.
        let mut layer = RgbaImage::from_pixel(backing_w, backing_h, Rgba([255, 255, 255, 0]));
        let text_x = (backing_w as i32 - text_w as i32) / 2;
        let text_y = (backing_h as i32 - text_h as i32) / 2;
        self.font.draw(&mut layer, text_x, text_y, name, px, LABEL_TEXT);
        overlay(canvas, &layer, backing_x as i64, backing_y as i64);
        if px < LABEL_PX {
            debug!(px, text_w, "deck name shrunk to fit label");
        }
    }

    fn draw_grid(&self, canvas: &mut RgbaImage, deck: &Deck, artwork: &mut ArtworkCache) {
        let placed: Vec<&str> = deck
            .expanded(self.catalog)
            .into_iter()
            .take(GRID_CAPACITY)
            .collect();

        // One lookup per distinct card, however many copies are shown.
        let mut art: BTreeMap<&str, Artwork> = BTreeMap::new();
        for card_id in &placed {
            if art.contains_key(card_id) {
                continue;
            }
            let key = ArtworkKey {
                card_id: card_id.to_string(),
                width: CELL_WIDTH,
                height: CELL_HEIGHT,
                crop: CropMode::Fit,
            };
            art.insert(*card_id, self.fetch(artwork, &key));
        }

        for (idx, card_id) in placed.iter().enumerate() {
            let (x, y) = cell_origin(idx);
            if let Some(Artwork::Ready(img)) = art.get(card_id) {
                overlay(canvas, img, x as i64, y as i64);
            }
        }
    }
}

/// Top-left corner of grid cell `idx`, filled row-major.
pub fn cell_origin(idx: usize) -> (u32, u32) {
    let idx = idx as u32;
    (
        (idx % GRID_COLUMNS) * CELL_WIDTH,
        UPPER_HEIGHT + (idx / GRID_COLUMNS) * CELL_HEIGHT,
    )
}

/// Darken a rectangle as if black at `alpha` were composited over it.
fn shade(canvas: &mut RgbaImage, x: u32, y: u32, w: u32, h: u32, alpha: u8) {
    let keep = 255 - alpha as u32;
    let x_end = (x + w).min(canvas.width());
    let y_end = (y + h).min(canvas.height());
    for py in y..y_end {
        for px in x..x_end {
            let pixel = canvas.get_pixel_mut(px, py);
            for channel in 0..3 {
                pixel[channel] = ((pixel[channel] as u32 * keep + 127) / 255) as u8;
            }
        }
    }
}

/// SHA-256 over leader, contents and name; identical decks share a fingerprint.
pub fn fingerprint(deck: &Deck) -> String {
    let mut hasher = Sha256::new();
    hasher.update(deck.leader().unwrap_or("").as_bytes());
    hasher.update([0u8]);
    for (card_id, count) in deck.cards() {
        hasher.update(card_id.as_bytes());
        hasher.update(count.to_le_bytes());
    }
    hasher.update([0u8]);
    if let Some(name) = deck.name() {
        hasher.update([1u8]);
        hasher.update(name.as_bytes());
    }
    let digest = hasher.finalize();
    format!("{digest:02x}")
}

struct CachedComposite {
    rendered_at: Instant,
    seq: u64,
    image: RgbImage,
}

/// Finished composites memoized by deck fingerprint. Entries expire after
/// `ttl`; past `capacity` the oldest render is evicted.
pub struct CompositeCache {
    ttl: Duration,
    capacity: usize,
    next_seq: u64,
    entries: HashMap<String, CachedComposite>,
}

impl CompositeCache {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            ttl,
            capacity: capacity.max(1),
            next_seq: 0,
            entries: HashMap::new(),
        }
    }

    /// Cached image for `deck`, or the result of `render` which is then stored.
    pub fn get_or_render(
        &mut self,
        deck: &Deck,
        render: impl FnOnce(&Deck) -> Result<RgbImage>,
    ) -> Result<RgbImage> {
        let key = fingerprint(deck);
        if let Some(hit) = self.entries.get(&key) {
            if hit.rendered_at.elapsed() < self.ttl {
                debug!(fingerprint = %key, "composite cache hit");
                return Ok(hit.image.clone());
            }
        }
        let image = render(deck)?;
        self.store(key, image.clone());
        Ok(image)
    }

    fn store(&mut self, key: String, image: RgbImage) {
        let ttl = self.ttl;
        self.entries.retain(|_, entry| entry.rendered_at.elapsed() < ttl);
        self.entries.remove(&key);
        while self.entries.len() >= self.capacity {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.seq)
                .map(|(key, _)| key.clone());
            match oldest {
                Some(oldest) => {
                    debug!(fingerprint = %oldest, "composite evicted");
                    self.entries.remove(&oldest);
                }
                None => break,
            }
        }
        self.entries.insert(
            key,
            CachedComposite {
                rendered_at: Instant::now(),
                seq: self.next_seq,
                image,
            },
        );
        self.next_seq += 1;
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
}

#[cfg(test)]
mod tests {
    use image::Rgb;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::catalog::fixtures::{card, sample_catalog};
    use crate::catalog::CardType;
    use crate::color::Color;
    use crate::deck::DeckRules;
    use crate::image::artwork::fakes::FakeSource;

    const TEMPLATE: &str = "https://cards.test/{id}.png";

    fn composer<'a>(catalog: &'a Catalog, source: &'a FakeSource, font: &'a LabelFont) -> Composer<'a> {
        Composer {
            catalog,
            source,
            font,
            url_template: TEMPLATE,
        }
    }

    fn url(id: &str) -> String {
        TEMPLATE.replace("{id}", id)
    }

    #[test]
    fn layout_constants_match_canvas_geometry() {
        assert_eq!(UPPER_HEIGHT, 548);
        assert_eq!(LEADER_WIDTH, 782);
        assert_eq!(NAME_X, 878);
        assert_eq!(NAME_WIDTH, 824);
        assert_eq!((QR_X, QR_Y), (1750, 74));
        assert_eq!((CELL_WIDTH, CELL_HEIGHT), (215, 300));
        assert_eq!(cell_origin(0), (0, 548));
        assert_eq!(cell_origin(11), (215, 848));
        assert_eq!(cell_origin(49), (1935, 1748));
    }

    #[test]
    fn renders_full_canvas_with_art_and_qr() {
        let catalog = sample_catalog();
        let source = FakeSource::default()
            .with(&url("OP01-001"), [10, 20, 30, 255])
            .with(&url("OP01-010"), [40, 50, 60, 255]);
        let font = LabelFont::Builtin;
        let mut deck = Deck::new();
        deck.set_leader(&catalog, "OP01-001").unwrap();
        deck.set_name(Some("Red Rush")).unwrap();
        for _ in 0..4 {
            deck.add_copy(&catalog, &DeckRules::default(), "OP01-010").unwrap();
        }
        let mut cache = ArtworkCache::new(Duration::from_secs(60));
        let img = composer(&catalog, &source, &font).render(&deck, &mut cache).unwrap();

        assert_eq!(img.dimensions(), (CANVAS_WIDTH, CANVAS_HEIGHT));
        assert_eq!(*img.get_pixel(0, 0), Color::Red.swatch());
        assert_eq!(*img.get_pixel(GAP + 5, 5), Rgb([10, 20, 30]));
        assert_eq!(*img.get_pixel(5, UPPER_HEIGHT + 5), Rgb([40, 50, 60]));
        assert_eq!(*img.get_pixel(3 * CELL_WIDTH + 5, UPPER_HEIGHT + 5), Rgb([40, 50, 60]));
        // Fifth cell is empty and shows the background.
        assert_eq!(*img.get_pixel(4 * CELL_WIDTH + 5, UPPER_HEIGHT + 5), Color::Red.swatch());
        // QR quiet zone is white.
        assert_eq!(*img.get_pixel(QR_X + 2, QR_Y + 2), Rgb([255, 255, 255]));
        // Each distinct card is fetched once.
        assert_eq!(source.requests.borrow().len(), 2);
    }

    #[test]
    fn failed_fetch_leaves_cell_showing_background() {
        let catalog = sample_catalog();
        let source = FakeSource::default().with(&url("OP01-010"), [40, 50, 60, 255]);
        let font = LabelFont::Builtin;
        let mut deck = Deck::new();
        deck.set_leader(&catalog, "OP01-001").unwrap();
        deck.add_copy(&catalog, &DeckRules::default(), "OP01-011").unwrap();
        deck.add_copy(&catalog, &DeckRules::default(), "OP01-010").unwrap();
        let mut cache = ArtworkCache::new(Duration::from_secs(60));
        let img = composer(&catalog, &source, &font).render(&deck, &mut cache).unwrap();

        // OP01-011 (cost 1) sorts first and has no artwork.
        assert_eq!(*img.get_pixel(5, UPPER_HEIGHT + 5), Color::Red.swatch());
        assert_eq!(*img.get_pixel(CELL_WIDTH + 5, UPPER_HEIGHT + 5), Rgb([40, 50, 60]));
        // Missing leader art leaves the band showing the background too.
        assert_eq!(*img.get_pixel(GAP + 5, 5), Color::Red.swatch());
    }

    #[test]
    fn grid_ignores_cards_beyond_capacity() {
        let mut records = vec![card("LEAD-99", CardType::Leader, "青", 5)];
        let mut source = FakeSource::default();
        for i in 0..13u8 {
            let id = format!("TST-{i:03}");
            records.push(card(&id, CardType::Character, "青", 1));
            source = source.with(&url(&id), [i * 10, 100, 200, 255]);
        }
        let catalog = Catalog::from_records(records);
        let font = LabelFont::Builtin;
        let rules = DeckRules::default();

        let mut full = Deck::new();
        full.set_leader(&catalog, "LEAD-99").unwrap();
        let mut truncated = full.clone();
        for i in 0..13 {
            let id = format!("TST-{i:03}");
            for copy in 0..4 {
                full.add_copy(&catalog, &rules, &id).unwrap();
                // 12 ids x 4 + 2 copies of the last one = 50.
                if i < 12 || copy < 2 {
                    truncated.add_copy(&catalog, &rules, &id).unwrap();
                }
            }
        }
        assert_eq!(full.total_count(), 52);
        assert_eq!(truncated.total_count(), 50);

        let mut cache = ArtworkCache::new(Duration::from_secs(60));
        let c = composer(&catalog, &source, &font);
        let a = c.render(&full, &mut cache).unwrap();
        let b = c.render(&truncated, &mut cache).unwrap();
        let grid_start = (UPPER_HEIGHT * CANVAS_WIDTH * 3) as usize;
        assert!(a.as_raw()[grid_start..] == b.as_raw()[grid_start..]);
    }

    #[test]
    fn label_backing_darkens_name_region() {
        let catalog = sample_catalog();
        let source = FakeSource::default();
        let font = LabelFont::Builtin;
        let mut deck = Deck::new();
        deck.set_leader(&catalog, "OP01-001").unwrap();
        deck.set_name(Some("Red Rush")).unwrap();
        let mut cache = ArtworkCache::new(Duration::from_secs(60));
        let img = composer(&catalog, &source, &font).render(&deck, &mut cache).unwrap();

        let (text_w, text_h) = font.measure("Red Rush", LABEL_PX);
        let backing_x = NAME_X + (NAME_WIDTH - (text_w + 40)) / 2;
        let backing_y = (UPPER_HEIGHT - (text_h + 40)) / 2;
        let red = Color::Red.swatch();
        let shaded = |c: u8| ((c as u32 * 127 + 127) / 255) as u8;
        assert_eq!(
            *img.get_pixel(backing_x + 2, backing_y + 2),
            Rgb([shaded(red[0]), shaded(red[1]), shaded(red[2])])
        );
        assert_eq!(*img.get_pixel(NAME_X + 2, backing_y + 2), red);
    }

    #[test]
    fn composite_qr_decodes_to_deck_text() {
        let catalog = sample_catalog();
        let source = FakeSource::default();
        let font = LabelFont::Builtin;
        let mut deck = Deck::new();
        deck.set_leader(&catalog, "OP01-001").unwrap();
        deck.set_name(Some("Red Rush")).unwrap();
        for _ in 0..4 {
            deck.add_copy(&catalog, &DeckRules::default(), "OP01-010").unwrap();
        }
        let mut cache = ArtworkCache::new(Duration::from_secs(60));
        let img = composer(&catalog, &source, &font).render(&deck, &mut cache).unwrap();

        let decoded = qr::decode_image(&DynamicImage::ImageRgb8(img)).unwrap();
        assert_eq!(decoded, encode_deck(&deck, &catalog).unwrap());
    }

    #[test]
    fn long_names_stay_inside_the_name_region() {
        let catalog = sample_catalog();
        let source = FakeSource::default();
        let font = LabelFont::Builtin;
        let red = Color::Red.swatch();
        let mid = UPPER_HEIGHT / 2;
        let shrunk = "Straw Hat Crew Aggro Tournament List v2!";
        assert_eq!(shrunk.chars().count(), 40);
        let clipped = "Straw Hat Crew ".repeat(10);

        for name in [shrunk, clipped.trim_end()] {
            let mut deck = Deck::new();
            deck.set_leader(&catalog, "OP01-001").unwrap();
            deck.set_name(Some(name)).unwrap();
            let mut cache = ArtworkCache::new(Duration::from_secs(60));
            let img = composer(&catalog, &source, &font).render(&deck, &mut cache).unwrap();

            // Leader band and the gap before the QR panel are untouched.
            for x in [GAP + 5, NAME_X - 5, NAME_X + NAME_WIDTH + 5, QR_X - 5] {
                assert_eq!(*img.get_pixel(x, mid), red, "{name}: x={x}");
            }
            let mut png = std::io::Cursor::new(Vec::new());
            DynamicImage::ImageRgb8(img)
                .write_to(&mut png, image::ImageFormat::Png)
                .unwrap();
            let decoded = qr::decode_bytes(png.get_ref()).unwrap();
            assert_eq!(decoded, encode_deck(&deck, &catalog).unwrap());
        }
    }

    #[test]
    fn label_shrinks_until_the_name_fits() {
        let catalog = sample_catalog();
        let source = FakeSource::default();
        let font = LabelFont::Builtin;
        let c = composer(&catalog, &source, &font);
        let max_w = NAME_WIDTH - 2 * LABEL_MARGIN - 2 * LABEL_PADDING;

        assert_eq!(c.label_px("Red Rush"), LABEL_PX);
        let px = c.label_px("Straw Hat Crew Aggro Tournament List v2!");
        assert!(px < LABEL_PX);
        assert!(font.measure("Straw Hat Crew Aggro Tournament List v2!", px).0 <= max_w);
        assert_eq!(c.label_px(&"W".repeat(200)), LABEL_MIN_PX);
    }

    #[test]
    fn composite_cache_reuses_identical_decks() {
        let catalog = sample_catalog();
        let mut deck = Deck::new();
        deck.set_leader(&catalog, "OP01-001").unwrap();
        let mut cache = CompositeCache::new(Duration::from_secs(60), 4);
        let mut renders = 0;
        for _ in 0..2 {
            cache
                .get_or_render(&deck, |_| {
                    renders += 1;
                    Ok(RgbImage::new(1, 1))
                })
                .unwrap();
        }
        assert_eq!(renders, 1);
        deck.set_name(Some("Renamed")).unwrap();
        cache.get_or_render(&deck, |_| Ok(RgbImage::new(1, 1))).unwrap();
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn composite_cache_evicts_oldest_past_capacity() {
        let catalog = sample_catalog();
        let rules = DeckRules::default();
        let mut decks = Vec::new();
        for copies in 0..3 {
            let mut deck = Deck::new();
            deck.set_leader(&catalog, "OP01-001").unwrap();
            for _ in 0..copies {
                deck.add_copy(&catalog, &rules, "OP01-010").unwrap();
            }
            decks.push(deck);
        }
        let mut cache = CompositeCache::new(Duration::from_secs(60), 2);
        for deck in &decks {
            cache.get_or_render(deck, |_| Ok(RgbImage::new(1, 1))).unwrap();
        }
        assert_eq!(cache.len(), 2);

        let mut renders = 0;
        let mut count = |_: &Deck| {
            renders += 1;
            Ok::<_, DeckError>(RgbImage::new(1, 1))
        };
        cache.get_or_render(&decks[2], &mut count).unwrap();
        cache.get_or_render(&decks[0], &mut count).unwrap();
        assert_eq!(renders, 1);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn expired_composites_are_rendered_again() {
        let catalog = sample_catalog();
        let mut deck = Deck::new();
        deck.set_leader(&catalog, "OP01-001").unwrap();
        let mut cache = CompositeCache::new(Duration::ZERO, 4);
        let mut renders = 0;
        for _ in 0..2 {
            cache
                .get_or_render(&deck, |_| {
                    renders += 1;
                    Ok(RgbImage::new(1, 1))
                })
                .unwrap();
        }
        assert_eq!(renders, 2);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn fingerprint_tracks_contents() {
        let catalog = sample_catalog();
        let mut a = Deck::new();
        a.set_leader(&catalog, "OP01-001").unwrap();
        let mut b = a.clone();
        assert_eq!(fingerprint(&a), fingerprint(&b));
        b.add_copy(&catalog, &DeckRules::default(), "OP01-010").unwrap();
        assert_ne!(fingerprint(&a), fingerprint(&b));
        assert_eq!(fingerprint(&a).len(), 64);
    }
}
