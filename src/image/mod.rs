//! Composite deck image: background, artwork, label and layout.

pub mod artwork;
mod background;
mod font;
mod paint;

pub use artwork::{Artwork, ArtworkCache, ArtworkKey, ArtworkSource, CropMode, HttpArtworkSource, artwork_url};
pub use background::{gradient_row, paint_background, stop_positions};
pub use font::{GLYPH_HEIGHT, GLYPH_WIDTH, LabelFont};
pub use paint::{
    CANVAS_HEIGHT, CANVAS_WIDTH, CELL_HEIGHT, CELL_WIDTH, Composer, CompositeCache, GRID_CAPACITY,
    UPPER_HEIGHT, cell_origin, fingerprint,
};
