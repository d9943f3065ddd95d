//! Deck-list interchange for trading card games: canonical text, QR sharing and
//! composite deck images.

pub mod catalog;
pub mod codec;
pub mod color;
pub mod deck;
pub mod error;
pub mod filter;
pub mod image;
pub mod qr;
pub mod session;
pub mod settings;
pub mod slots;

pub use catalog::{ArtworkRef, CardRecord, CardType, Catalog, CatalogSource};
pub use codec::{decode_deck, encode_deck};
pub use color::{Color, ColorRank};
pub use deck::{AddOutcome, Deck, DeckRules, DeckStatus, SortKey};
pub use error::{DeckError, Result};
pub use filter::{FilterOptions, ParallelMode, search};
pub use session::Session;
pub use settings::Settings;
pub use slots::{SlotInfo, SlotStore, write_atomic};
