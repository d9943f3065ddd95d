use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use crate::catalog::Catalog;
use crate::color::{COLORLESS_RANK, ColorRank};
use crate::error::{DeckError, Result};

/// Number of main-deck cards a finished deck holds.
pub const DECK_TARGET: u32 = 50;
/// Default per-card copy cap.
pub const COPY_LIMIT: u32 = 4;
/// Cards exempt from the copy cap.
pub const UNLIMITED_CARDS: [&str; 2] = ["OP01-075", "OP08-072"];
/// Leading character reserved for the name line of the text format.
pub const NAME_MARKER: char = '#';

/// Ordering key shared by every deck listing: type, cost, color identity, identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SortKey {
    pub type_rank: u16,
    pub cost: u32,
    pub color: ColorRank,
    pub card_id: String,
}

impl SortKey {
    /// Key for identifiers the catalog cannot resolve.
    pub fn unresolved(card_id: &str) -> Self {
        Self {
            type_rank: COLORLESS_RANK,
            cost: u32::MAX,
            color: ColorRank::COLORLESS,
            card_id: card_id.to_string(),
        }
    }
}

impl Ord for SortKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.type_rank
            .cmp(&other.type_rank)
            .then(self.cost.cmp(&other.cost))
            .then(self.color.cmp(&other.color))
            .then_with(|| self.card_id.cmp(&other.card_id))
    }
}

impl PartialOrd for SortKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Copy-cap configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeckRules {
    pub copy_limit: u32,
    pub unlimited: Vec<String>,
}

impl Default for DeckRules {
    fn default() -> Self {
        Self {
            copy_limit: COPY_LIMIT,
            unlimited: UNLIMITED_CARDS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl DeckRules {
    pub fn is_unlimited(&self, card_id: &str) -> bool {
        self.unlimited.iter().any(|id| id == card_id)
    }
}

/// Result of [`Deck::add_copy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// The card now has this many copies.
    Added(u32),
    /// The card is already at the cap; nothing changed.
    CopyLimitReached(u32),
}

/// Advisory progress toward the 50-card target; never blocks export or rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeckStatus {
    Incomplete { missing: u32 },
    Complete,
    Over { excess: u32 },
}

impl fmt::Display for DeckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeckStatus::Incomplete { missing } => write!(f, "{missing} more card(s) can be added"),
            DeckStatus::Complete => write!(f, "deck is complete"),
            DeckStatus::Over { excess } => write!(f, "deck exceeds {DECK_TARGET} cards by {excess}"),
        }
    }
}

/// A deck under construction: leader, main-deck copy counts, optional name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Deck {
    leader: Option<String>,
    cards: BTreeMap<String, u32>,
    name: Option<String>,
}

impl Deck {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn leader(&self) -> Option<&str> {
        self.leader.as_deref()
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn cards(&self) -> &BTreeMap<String, u32> {
        &self.cards
    }

    pub fn count(&self, card_id: &str) -> u32 {
        self.cards.get(card_id).copied().unwrap_or(0)
    }

    /// Set the leader; the id is removed from the main deck if present.
    pub fn set_leader(&mut self, catalog: &Catalog, card_id: &str) -> Result<()> {
        catalog.require(card_id)?;
        self.cards.remove(card_id);
        self.leader = Some(card_id.to_string());
        Ok(())
    }

    /// Empty or whitespace-only names clear the name.
    pub fn set_name(&mut self, name: Option<&str>) -> Result<()> {
        let name = name.map(str::trim).filter(|n| !n.is_empty());
        if let Some(n) = name {
            validate_name(n)?;
        }
        self.name = name.map(str::to_string);
        Ok(())
    }

    pub fn add_copy(&mut self, catalog: &Catalog, rules: &DeckRules, card_id: &str) -> Result<AddOutcome> {
        let record = catalog.require(card_id)?;
        if record.is_leader() || self.leader.as_deref() == Some(card_id) {
            return Err(DeckError::LeaderInMainDeck(card_id.to_string()));
        }
        let current = self.count(card_id);
        if current >= rules.copy_limit && !rules.is_unlimited(card_id) {
            return Ok(AddOutcome::CopyLimitReached(current));
        }
        let next = current + 1;
        self.cards.insert(card_id.to_string(), next);
        Ok(AddOutcome::Added(next))
    }

    /// Returns the remaining count; removing an absent card is a no-op.
    pub fn remove_copy(&mut self, card_id: &str) -> u32 {
        match self.cards.get_mut(card_id) {
            Some(count) if *count > 1 => {
                *count -= 1;
                *count
            }
            Some(_) => {
                self.cards.remove(card_id);
                0
            }
            None => 0,
        }
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Main-deck cards; the leader is not counted.
    pub fn total_count(&self) -> u32 {
        self.cards.values().sum()
    }

    pub fn status(&self) -> DeckStatus {
        let total = self.total_count();
        match total.cmp(&DECK_TARGET) {
            Ordering::Less => DeckStatus::Incomplete {
                missing: DECK_TARGET - total,
            },
            Ordering::Equal => DeckStatus::Complete,
            Ordering::Greater => DeckStatus::Over {
                excess: total - DECK_TARGET,
            },
        }
    }

    /// Distinct main-deck cards with counts, in ascending sort-key order.
    pub fn sorted_entries(&self, catalog: &Catalog) -> Vec<(&str, u32)> {
        let mut entries: Vec<(SortKey, &str, u32)> = self
            .cards
            .iter()
            .map(|(id, &count)| (catalog.sort_key(id), id.as_str(), count))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries.into_iter().map(|(_, id, count)| (id, count)).collect()
    }

    /// Every copy as its own entry, in sort-key order.
    pub fn expanded(&self, catalog: &Catalog) -> Vec<&str> {
        self.sorted_entries(catalog)
            .into_iter()
            .flat_map(|(id, count)| std::iter::repeat_n(id, count as usize))
            .collect()
    }

    /// Assemble a deck from already-validated parts; used by the text decoder.
    pub(crate) fn from_parts(leader: String, cards: BTreeMap<String, u32>, name: Option<String>) -> Self {
        Self {
            leader: Some(leader),
            cards,
            name,
        }
    }
}

pub(crate) fn validate_name(name: &str) -> Result<()> {
    if name.starts_with(NAME_MARKER) {
        return Err(DeckError::InvalidDeckName {
            name: name.to_string(),
            reason: "must not start with '#'",
        });
    }
    if name.contains(['\n', '\r']) {
        return Err(DeckError::InvalidDeckName {
            name: name.to_string(),
            reason: "must be a single line",
        });
    }
    Ok(())
}
