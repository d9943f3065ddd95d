//! Faceted catalog search.

use std::cmp::Ordering;

use crate::catalog::{CardRecord, CardType, Catalog};

/// Which printings a search returns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ParallelMode {
    #[default]
    Normal,
    Parallel,
    Both,
}

/// Search facets. Empty facets do not filter; within a facet any value matches.
#[derive(Debug, Clone, Default)]
pub struct FilterOptions {
    pub colors: Vec<String>,
    pub types: Vec<CardType>,
    pub costs: Vec<u32>,
    pub counters: Vec<String>,
    pub attributes: Vec<String>,
    pub blocks: Vec<String>,
    pub features: Vec<String>,
    pub free_words: String,
    pub series_ids: Vec<String>,
    /// Deck-building mode: hide leaders and keep cards sharing a leader color.
    pub leader_colors: Vec<String>,
    pub parallel_mode: ParallelMode,
}

impl FilterOptions {
    pub fn matches(&self, card: &CardRecord) -> bool {
        let parallel_ok = match self.parallel_mode {
            ParallelMode::Normal => !card.is_parallel,
            ParallelMode::Parallel => card.is_parallel,
            ParallelMode::Both => true,
        };
        if !parallel_ok {
            return false;
        }
        if !self.leader_colors.is_empty()
            && (card.is_leader() || !self.leader_colors.iter().any(|c| card.color.contains(c.as_str())))
        {
            return false;
        }
        if !self.colors.is_empty() && !self.colors.iter().any(|c| card.color.contains(c.as_str())) {
            return false;
        }
        if !self.types.is_empty() && !self.types.contains(&card.card_type) {
            return false;
        }
        if !self.costs.is_empty() && !self.costs.contains(&card.cost) {
            return false;
        }
        if !self.counters.is_empty() && !self.counters.contains(&card.counter) {
            return false;
        }
        if !self.attributes.is_empty() && !any_shared(&self.attributes, &card.attributes) {
            return false;
        }
        if !self.blocks.is_empty() && !self.blocks.contains(&card.block_icon) {
            return false;
        }
        if !self.series_ids.is_empty() && !self.series_ids.contains(&card.series_id) {
            return false;
        }
        if !self.features.is_empty() && !any_shared(&self.features, &card.features) {
            return false;
        }
        self.free_words_match(card)
    }

    /// Every keyword must appear somewhere in name, features, text or trigger.
    fn free_words_match(&self, card: &CardRecord) -> bool {
        let haystacks = [
            card.name.to_lowercase(),
            card.features.join("/").to_lowercase(),
            card.text.to_lowercase(),
            card.trigger.to_lowercase(),
        ];
        self.free_words.split_whitespace().all(|word| {
            let word = word.to_lowercase();
            haystacks.iter().any(|h| h.contains(&word))
        })
    }
}

fn any_shared(wanted: &[String], present: &[String]) -> bool {
    wanted.iter().any(|w| present.contains(w))
}

/// Matching records ordered by color rank, cost, identifier, then standard before parallel.
pub fn search<'a>(catalog: &'a Catalog, options: &FilterOptions) -> Vec<&'a CardRecord> {
    let mut results: Vec<&CardRecord> = catalog
        .records()
        .iter()
        .filter(|card| options.matches(card))
        .collect();
    results.sort_by(|a, b| catalog_order(a, b));
    results
}

fn catalog_order(a: &CardRecord, b: &CardRecord) -> Ordering {
    a.color_rank()
        .cmp(&b.color_rank())
        .then(a.cost.cmp(&b.cost))
        .then_with(|| a.card_id.cmp(&b.card_id))
        .then(a.is_parallel.cmp(&b.is_parallel))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::fixtures::{card, sample_catalog};
    use pretty_assertions::assert_eq;

    fn ids(results: &[&CardRecord]) -> Vec<String> {
        results.iter().map(|r| r.card_id.clone()).collect()
    }

    #[test]
    fn default_search_hides_parallels_and_orders_by_color_rank() {
        let catalog = sample_catalog();
        let results = search(&catalog, &FilterOptions::default());
        assert!(results.iter().all(|r| !r.is_parallel));
        assert_eq!(results.first().map(|r| r.card_id.as_str()), Some("OP01-001"));
        assert_eq!(results.last().map(|r| r.card_id.as_str()), Some("OP01-030"));
    }

    #[test]
    fn both_mode_lists_standard_before_parallel() {
        let catalog = sample_catalog();
        let options = FilterOptions {
            parallel_mode: ParallelMode::Both,
            types: vec![CardType::Leader],
            ..FilterOptions::default()
        };
        let results = search(&catalog, &options);
        let listed: Vec<(&str, bool)> = results
            .iter()
            .map(|r| (r.card_id.as_str(), r.is_parallel))
            .collect();
        assert_eq!(
            listed,
            vec![("OP01-001", false), ("OP01-001", true), ("LEAD-01", false)]
        );
    }

    #[test]
    fn leader_colors_hide_leaders_and_off_color_cards() {
        let catalog = sample_catalog();
        let options = FilterOptions {
            leader_colors: vec!["緑".to_string()],
            ..FilterOptions::default()
        };
        assert_eq!(ids(&search(&catalog, &options)), vec!["OP01-020"]);
    }

    #[test]
    fn facets_combine_with_and() {
        let catalog = sample_catalog();
        let options = FilterOptions {
            types: vec![CardType::Character],
            costs: vec![4],
            ..FilterOptions::default()
        };
        assert_eq!(ids(&search(&catalog, &options)), vec!["ST01-004", "ST01-005"]);
    }

    #[test]
    fn free_words_require_every_keyword() {
        let mut luffy = card("OP05-119", CardType::Character, "青", 10);
        luffy.name = "Monkey.D.Luffy".to_string();
        luffy.features = vec!["Straw Hat Crew".to_string()];
        let catalog = Catalog::from_records(vec![luffy, card("OP05-001", CardType::Leader, "青", 5)]);
        let hit = FilterOptions {
            free_words: "luffy straw".to_string(),
            ..FilterOptions::default()
        };
        let miss = FilterOptions {
            free_words: "luffy zoro".to_string(),
            ..FilterOptions::default()
        };
        assert_eq!(ids(&search(&catalog, &hit)), vec!["OP05-119"]);
        assert!(search(&catalog, &miss).is_empty());
    }
}
