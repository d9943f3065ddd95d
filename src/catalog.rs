//! Card catalog: typed records, loading, and the variant-preference resolver.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, info};

use crate::color::{Color, ColorRank, split_tokens};
use crate::deck::SortKey;
use crate::error::{DeckError, Result};

/// Card kinds; `Other` absorbs anything outside the closed set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CardType {
    Leader,
    Character,
    Event,
    Stage,
    #[default]
    #[serde(other)]
    Other,
}

impl CardType {
    pub fn rank(self) -> u16 {
        match self {
            CardType::Leader => 0,
            CardType::Character => 1,
            CardType::Event => 2,
            CardType::Stage => 3,
            CardType::Other => 9,
        }
    }
}

impl fmt::Display for CardType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CardType::Leader => "LEADER",
            CardType::Character => "CHARACTER",
            CardType::Event => "EVENT",
            CardType::Stage => "STAGE",
            CardType::Other => "OTHER",
        };
        f.write_str(name)
    }
}

/// Where a card's artwork comes from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ArtworkRef {
    /// Official catalog art, looked up by identifier through a URL template.
    Catalog(String),
    /// Custom card with an explicit image URL.
    External(String),
}

impl ArtworkRef {
    /// Expand into a fetchable URL; `{id}` in the template is replaced by the card id.
    pub fn url(&self, template: &str) -> String {
        match self {
            ArtworkRef::Catalog(id) => template.replace("{id}", id),
            ArtworkRef::External(url) => url.clone(),
        }
    }
}

/// One printed card as described by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardRecord {
    pub card_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub color: String,
    #[serde(default, rename = "type")]
    pub card_type: CardType,
    #[serde(default, deserialize_with = "deserialize_cost")]
    pub cost: u32,
    #[serde(default)]
    pub counter: String,
    #[serde(default, deserialize_with = "deserialize_list")]
    pub features: Vec<String>,
    #[serde(default, deserialize_with = "deserialize_list")]
    pub attributes: Vec<String>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub trigger: String,
    #[serde(default)]
    pub block_icon: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acquisition: Option<String>,
    #[serde(default)]
    pub series_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default)]
    pub is_parallel: bool,
}

impl CardRecord {
    pub fn colors(&self) -> Vec<Color> {
        split_tokens(&self.color)
            .into_iter()
            .filter_map(Color::from_token)
            .collect()
    }

    pub fn color_rank(&self) -> ColorRank {
        ColorRank::compute(&self.color, self.card_type.rank())
    }

    pub fn sort_key(&self) -> SortKey {
        SortKey {
            type_rank: self.card_type.rank(),
            cost: self.cost,
            color: self.color_rank(),
            card_id: self.card_id.clone(),
        }
    }

    pub fn is_leader(&self) -> bool {
        self.card_type == CardType::Leader
    }

    /// Custom cards carry an explicit `http(s)` image URL.
    pub fn artwork_ref(&self) -> ArtworkRef {
        match self.image_url.as_deref().map(str::trim) {
            Some(url) if url.starts_with("http://") || url.starts_with("https://") => {
                ArtworkRef::External(url.to_string())
            }
            _ => ArtworkRef::Catalog(self.card_id.clone()),
        }
    }

    fn normalize(&mut self) {
        self.card_id = self.card_id.trim().to_string();
        if self.series_id.trim().is_empty() {
            self.series_id = series_from_acquisition(self.acquisition.as_deref().unwrap_or(""));
        }
    }
}

/// Extract the series code between `【` and `】` in acquisition info.
fn series_from_acquisition(info: &str) -> String {
    if let Some(start) = info.find('【') {
        let rest = &info[start + '【'.len_utf8()..];
        if let Some(end) = rest.find('】') {
            return rest[..end].trim().to_string();
        }
    }
    match info.trim() {
        "" | "-" => "-".to_string(),
        _ => "その他".to_string(),
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ListCell {
    List(Vec<String>),
    Text(String),
}

fn deserialize_list<'de, D: Deserializer<'de>>(de: D) -> std::result::Result<Vec<String>, D::Error> {
    let items = match Option::<ListCell>::deserialize(de)? {
        None => Vec::new(),
        Some(ListCell::List(items)) => items,
        Some(ListCell::Text(text)) => text.split(['/', '／']).map(str::to_string).collect(),
    };
    Ok(items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty() && s != "-")
        .collect())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CostCell {
    Number(u32),
    Text(String),
}

fn deserialize_cost<'de, D: Deserializer<'de>>(de: D) -> std::result::Result<u32, D::Error> {
    match Option::<CostCell>::deserialize(de)? {
        None => Ok(0),
        Some(CostCell::Number(n)) => Ok(n),
        Some(CostCell::Text(text)) => match text.trim() {
            "" | "-" => Ok(0),
            other => other
                .parse()
                .map_err(|_| serde::de::Error::custom(format!("invalid cost '{other}'"))),
        },
    }
}

/// A catalog file plus whether every record in it is an alternate printing.
#[derive(Debug, Clone)]
pub struct CatalogSource {
    pub path: PathBuf,
    pub parallel: bool,
}

impl CatalogSource {
    pub fn standard(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            parallel: false,
        }
    }

    pub fn parallel(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            parallel: true,
        }
    }
}

/// Read-only card catalog indexed by identifier.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    records: Vec<CardRecord>,
    by_id: HashMap<String, Vec<usize>>,
}

impl Catalog {
    pub fn from_records(records: Vec<CardRecord>) -> Self {
        let mut catalog = Self::default();
        for mut record in records {
            record.normalize();
            catalog
                .by_id
                .entry(record.card_id.clone())
                .or_default()
                .push(catalog.records.len());
            catalog.records.push(record);
        }
        catalog
    }

    /// Load the standard catalog files from a data directory.
    ///
    /// `cardlist.json` holds the main list, `custom_cards.json` user-made cards and
    /// `cardlist_parallel.json` alternate printings. Missing files are skipped but at
    /// least one must exist.
    pub fn load_dir(dir: &Path) -> Result<Self> {
        Self::load(&[
            CatalogSource::standard(dir.join("cardlist.json")),
            CatalogSource::standard(dir.join("custom_cards.json")),
            CatalogSource::parallel(dir.join("cardlist_parallel.json")),
        ])
    }

    pub fn load(sources: &[CatalogSource]) -> Result<Self> {
        let mut records = Vec::new();
        let mut found = false;
        for source in sources {
            if !source.path.exists() {
                debug!(path = %source.path.display(), "catalog source missing, skipped");
                continue;
            }
            found = true;
            let mut loaded = read_records(&source.path)?;
            if source.parallel {
                for record in &mut loaded {
                    record.is_parallel = true;
                }
            }
            debug!(path = %source.path.display(), count = loaded.len(), "catalog source loaded");
            records.extend(loaded);
        }
        if !found {
            return Err(DeckError::Catalog("no catalog files found".to_string()));
        }
        let catalog = Self::from_records(records);
        info!(
            records = catalog.records.len(),
            ids = catalog.by_id.len(),
            "catalog loaded"
        );
        Ok(catalog)
    }

    pub fn records(&self) -> &[CardRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn contains(&self, card_id: &str) -> bool {
        self.by_id.contains_key(card_id)
    }

    /// Standard printing first, otherwise the first printing sharing the id.
    pub fn resolve(&self, card_id: &str) -> Option<&CardRecord> {
        let indices = self.by_id.get(card_id)?;
        indices
            .iter()
            .map(|&idx| &self.records[idx])
            .find(|record| !record.is_parallel)
            .or_else(|| indices.first().map(|&idx| &self.records[idx]))
    }

    pub fn require(&self, card_id: &str) -> Result<&CardRecord> {
        self.resolve(card_id)
            .ok_or_else(|| DeckError::UnknownCard(card_id.to_string()))
    }

    /// Total: identifiers missing from the catalog sort after everything else.
    pub fn sort_key(&self, card_id: &str) -> SortKey {
        match self.resolve(card_id) {
            Some(record) => record.sort_key(),
            None => SortKey::unresolved(card_id),
        }
    }

    pub fn leaders(&self) -> impl Iterator<Item = &CardRecord> {
        self.records.iter().filter(|r| r.is_leader())
    }
}

fn read_records(path: &Path) -> Result<Vec<CardRecord>> {
    let raw = fs::read_to_string(path)
        .map_err(|err| DeckError::Catalog(format!("failed to read {}: {err}", path.display())))?;
    if raw.trim_start().starts_with('[') {
        return serde_json::from_str(&raw)
            .map_err(|err| DeckError::Catalog(format!("failed to parse {}: {err}", path.display())));
    }
    let mut records = Vec::new();
    for (idx, line) in raw.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let record = serde_json::from_str(line).map_err(|err| {
            DeckError::Catalog(format!(
                "failed to parse card record at line {} in {}: {err}",
                idx + 1,
                path.display()
            ))
        })?;
        records.push(record);
    }
    Ok(records)
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn card(id: &str, card_type: CardType, color: &str, cost: u32) -> CardRecord {
        CardRecord {
            card_id: id.to_string(),
            name: format!("Card {id}"),
            color: color.to_string(),
            card_type,
            cost,
            counter: "-".to_string(),
            features: Vec::new(),
            attributes: Vec::new(),
            text: String::new(),
            trigger: String::new(),
            block_icon: String::new(),
            acquisition: None,
            series_id: "OP01".to_string(),
            image_url: None,
            is_parallel: false,
        }
    }

    pub fn sample_catalog() -> Catalog {
        let mut parallel_leader = card("OP01-001", CardType::Leader, "赤", 5);
        parallel_leader.is_parallel = true;
        parallel_leader.name = "Parallel leader".to_string();
        let mut parallel_only = card("OP02-099", CardType::Character, "緑", 3);
        parallel_only.is_parallel = true;
        Catalog::from_records(vec![
            parallel_leader,
            card("OP01-001", CardType::Leader, "赤", 5),
            card("LEAD-01", CardType::Leader, "赤/緑/青", 5),
            card("OP01-010", CardType::Character, "赤", 2),
            card("OP01-011", CardType::Character, "赤", 1),
            card("OP01-012", CardType::Event, "赤", 1),
            card("OP01-013", CardType::Stage, "赤", 1),
            card("OP01-075", CardType::Character, "赤", 1),
            card("OP01-020", CardType::Character, "緑/赤", 2),
            card("OP01-030", CardType::Character, "-", 2),
            card("ST01-004", CardType::Character, "赤", 4),
            card("ST01-005", CardType::Character, "赤", 4),
            parallel_only,
        ])
    }
}
