//! Layered settings: built-in defaults, optional TOML file, `DECKFORGE_*` environment.

use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use crate::deck::{COPY_LIMIT, DeckRules, UNLIMITED_CARDS};

pub const DEFAULT_CONFIG_FILE: &str = "deckforge.toml";
pub const DEFAULT_ARTWORK_TEMPLATE: &str =
    "https://www.onepiece-cardgame.com/images/cardlist/card/{id}.png";

/// Font files tried in order for the deck-name label; the first that loads wins.
pub const DEFAULT_FONT_PATHS: [&str; 8] = [
    "assets/fonts/deck.ttf",
    "/usr/share/fonts/truetype/noto/NotoSansJP-Regular.otf",
    "/usr/share/fonts/opentype/noto/NotoSansCJKjp-Regular.otf",
    "/usr/share/fonts/opentype/noto/NotoSansCJK-Regular.ttc",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "C:\\Windows\\Fonts\\meiryo.ttc",
    "C:\\Windows\\Fonts\\msgothic.ttc",
];

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Directory holding `cardlist.json` and friends.
    pub catalog_path: PathBuf,
    pub slot_dir: PathBuf,
    pub artwork_url_template: String,
    pub artwork_timeout_secs: u64,
    pub artwork_cache_ttl_secs: u64,
    pub composite_cache_ttl_secs: u64,
    /// Most finished composites kept in memory at once.
    pub composite_cache_capacity: usize,
    pub font_paths: Vec<PathBuf>,
    pub copy_limit: u32,
    pub unlimited_cards: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            catalog_path: PathBuf::from("data"),
            slot_dir: PathBuf::from("saved_decks"),
            artwork_url_template: DEFAULT_ARTWORK_TEMPLATE.to_string(),
            artwork_timeout_secs: 5,
            artwork_cache_ttl_secs: 3600,
            composite_cache_ttl_secs: 3600,
            composite_cache_capacity: 8,
            font_paths: DEFAULT_FONT_PATHS.iter().map(PathBuf::from).collect(),
            copy_limit: COPY_LIMIT,
            unlimited_cards: UNLIMITED_CARDS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Settings {
    /// Load settings. An explicit `path` must exist; otherwise `deckforge.toml` in
    /// the working directory is read when present.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let font_paths: Vec<String> = defaults
            .font_paths
            .iter()
            .map(|p| p.display().to_string())
            .collect();
        let mut builder = Config::builder()
            .set_default("catalog_path", defaults.catalog_path.display().to_string())?
            .set_default("slot_dir", defaults.slot_dir.display().to_string())?
            .set_default("artwork_url_template", defaults.artwork_url_template)?
            .set_default("artwork_timeout_secs", defaults.artwork_timeout_secs)?
            .set_default("artwork_cache_ttl_secs", defaults.artwork_cache_ttl_secs)?
            .set_default("composite_cache_ttl_secs", defaults.composite_cache_ttl_secs)?
            .set_default("composite_cache_capacity", defaults.composite_cache_capacity as u64)?
            .set_default("font_paths", font_paths)?
            .set_default("copy_limit", defaults.copy_limit)?
            .set_default("unlimited_cards", defaults.unlimited_cards)?;
        builder = match path {
            Some(p) => builder.add_source(File::from(p).required(true)),
            None => builder.add_source(File::with_name(DEFAULT_CONFIG_FILE).required(false)),
        };
        builder
            .add_source(
                Environment::with_prefix("DECKFORGE")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("font_paths")
                    .with_list_parse_key("unlimited_cards"),
            )
            .build()?
            .try_deserialize()
    }

    pub fn artwork_timeout(&self) -> Duration {
        Duration::from_secs(self.artwork_timeout_secs)
    }

    pub fn artwork_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.artwork_cache_ttl_secs)
    }

    pub fn composite_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.composite_cache_ttl_secs)
    }

    pub fn deck_rules(&self) -> DeckRules {
        DeckRules {
            copy_limit: self.copy_limit,
            unlimited: self.unlimited_cards.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_match_builtin_rules() {
        let settings = Settings::default();
        assert_eq!(settings.deck_rules(), DeckRules::default());
        assert_eq!(settings.artwork_timeout(), Duration::from_secs(5));
        assert_eq!(settings.composite_cache_ttl(), Duration::from_secs(3600));
        assert_eq!(settings.composite_cache_capacity, 8);
    }

    #[test]
    fn file_overrides_defaults() {
        let dir = std::env::temp_dir().join(format!("deckforge-settings-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("deckforge.toml");
        std::fs::write(
            &path,
            "slot_dir = \"decks\"\ncopy_limit = 3\nunlimited_cards = [\"OP01-075\"]\n",
        )
        .unwrap();
        let settings = Settings::load(Some(&path)).unwrap();
        assert_eq!(settings.slot_dir, PathBuf::from("decks"));
        assert_eq!(settings.copy_limit, 3);
        assert_eq!(settings.unlimited_cards, vec!["OP01-075"]);
        assert_eq!(settings.artwork_url_template, DEFAULT_ARTWORK_TEMPLATE);
        assert_eq!(settings.composite_cache_capacity, 8);
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let missing = std::env::temp_dir().join("deckforge-missing/deckforge.toml");
        assert!(Settings::load(Some(&missing)).is_err());
    }
}
