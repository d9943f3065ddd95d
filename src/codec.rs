//! Canonical deck text: `# name`, `1x<leader>`, then `<count>x<id>` per card.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::catalog::Catalog;
use crate::deck::{Deck, NAME_MARKER, validate_name};
use crate::error::{DeckError, Result};

/// Render a deck in canonical form. Lines are joined with `\n` and there is no
/// trailing newline.
pub fn encode_deck(deck: &Deck, catalog: &Catalog) -> Result<String> {
    let leader = deck.leader().ok_or(DeckError::MissingLeader)?;
    let mut lines = Vec::with_capacity(deck.cards().len() + 2);
    if let Some(name) = deck.name() {
        lines.push(format!("{NAME_MARKER} {name}"));
    }
    lines.push(format!("1x{leader}"));
    for (card_id, count) in deck.sorted_entries(catalog) {
        lines.push(format!("{count}x{card_id}"));
    }
    Ok(lines.join("\n"))
}

/// Parse canonical deck text into a fresh deck.
///
/// Structural problems abort the whole decode. Main-deck identifiers the catalog
/// does not know are dropped so lists survive catalog drift; an unknown leader
/// is an error.
pub fn decode_deck(text: &str, catalog: &Catalog) -> Result<Deck> {
    let mut lines = text
        .lines()
        .enumerate()
        .map(|(idx, line)| (idx + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty())
        .peekable();

    let mut name = None;
    if let Some((line_no, line)) = lines.next_if(|(_, line)| line.starts_with(NAME_MARKER)) {
        let value = line[NAME_MARKER.len_utf8()..].trim();
        if !value.is_empty() {
            validate_name(value).map_err(|err| DeckError::malformed(line_no, err.to_string()))?;
            name = Some(value.to_string());
        }
    }

    let (leader_line, leader_text) = lines
        .next()
        .ok_or_else(|| DeckError::malformed(text.lines().count().max(1), "missing leader line"))?;
    let (leader_count, leader) = parse_entry(leader_line, leader_text)?;
    if leader_count != 1 {
        return Err(DeckError::malformed(
            leader_line,
            format!("leader count must be 1, got {leader_count}"),
        ));
    }
    catalog.require(leader)?;

    let mut cards: BTreeMap<String, u32> = BTreeMap::new();
    for (line_no, line) in lines {
        let (count, card_id) = parse_entry(line_no, line)?;
        if card_id == leader {
            return Err(DeckError::malformed(
                line_no,
                format!("leader '{card_id}' listed in the main deck"),
            ));
        }
        if !catalog.contains(card_id) {
            warn!(card_id, line = line_no, "dropping card missing from catalog");
            continue;
        }
        let entry = cards.entry(card_id.to_string()).or_insert(0);
        *entry = entry
            .checked_add(count)
            .ok_or_else(|| DeckError::malformed(line_no, "copy count overflow"))?;
    }
    debug!(leader, distinct = cards.len(), "deck decoded");
    Ok(Deck::from_parts(leader.to_string(), cards, name))
}

/// Parse one `<count>x<identifier>` line; the line must already be trimmed.
pub fn parse_entry(line_no: usize, line: &str) -> Result<(u32, &str)> {
    let digits = line.bytes().take_while(u8::is_ascii_digit).count();
    let rest = &line[digits..];
    let Some(card_id) = rest.strip_prefix('x') else {
        return Err(DeckError::malformed(
            line_no,
            format!("expected <count>x<id>, got '{line}'"),
        ));
    };
    if digits == 0 || card_id.is_empty() || card_id.chars().any(char::is_whitespace) {
        return Err(DeckError::malformed(
            line_no,
            format!("expected <count>x<id>, got '{line}'"),
        ));
    }
    let count: u32 = line[..digits]
        .parse()
        .map_err(|_| DeckError::malformed(line_no, format!("count out of range in '{line}'")))?;
    if count == 0 {
        return Err(DeckError::malformed(
            line_no,
            format!("count must be positive in '{line}'"),
        ));
    }
    Ok((count, card_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::fixtures::sample_catalog;
    use crate::deck::DeckRules;
    use pretty_assertions::assert_eq;

    fn red_rush(catalog: &Catalog) -> Deck {
        let mut deck = Deck::new();
        deck.set_leader(catalog, "OP01-001").unwrap();
        deck.set_name(Some("Red Rush")).unwrap();
        for _ in 0..4 {
            deck.add_copy(catalog, &DeckRules::default(), "OP01-010").unwrap();
        }
        deck
    }

    #[test]
    fn encodes_red_rush_example() {
        let catalog = sample_catalog();
        let text = encode_deck(&red_rush(&catalog), &catalog).unwrap();
        assert_eq!(text, "# Red Rush\n1xOP01-001\n4xOP01-010");
    }

    #[test]
    fn encode_requires_leader() {
        let catalog = sample_catalog();
        assert!(matches!(
            encode_deck(&Deck::new(), &catalog),
            Err(DeckError::MissingLeader)
        ));
    }

    #[test]
    fn round_trip_preserves_deck_and_text() {
        let catalog = sample_catalog();
        let rules = DeckRules::default();
        let mut deck = red_rush(&catalog);
        for id in ["OP01-013", "OP01-020", "OP01-030", "OP02-099", "OP01-075"] {
            deck.add_copy(&catalog, &rules, id).unwrap();
            deck.add_copy(&catalog, &rules, id).unwrap();
        }
        let text = encode_deck(&deck, &catalog).unwrap();
        let decoded = decode_deck(&text, &catalog).unwrap();
        assert_eq!(decoded, deck);
        assert_eq!(encode_deck(&decoded, &catalog).unwrap(), text);
    }

    #[test]
    fn nameless_deck_round_trips() {
        let catalog = sample_catalog();
        let mut deck = Deck::new();
        deck.set_leader(&catalog, "LEAD-01").unwrap();
        let text = encode_deck(&deck, &catalog).unwrap();
        assert_eq!(text, "1xLEAD-01");
        assert_eq!(decode_deck(&text, &catalog).unwrap(), deck);
    }

    #[test]
    fn malformed_line_aborts_decode() {
        let catalog = sample_catalog();
        let err = decode_deck("1xLEAD-01\nnotaline\n", &catalog).unwrap_err();
        assert!(matches!(err, DeckError::MalformedDeckList { line: 2, .. }));
    }

    #[test]
    fn unknown_cards_are_dropped() {
        let catalog = sample_catalog();
        let deck = decode_deck("1xLEAD-01\n4xUNKNOWN-99\n", &catalog).unwrap();
        assert_eq!(deck.leader(), Some("LEAD-01"));
        assert_eq!(deck.count("UNKNOWN-99"), 0);
        assert!(deck.cards().is_empty());
    }

    #[test]
    fn missing_leader_line_is_malformed() {
        let catalog = sample_catalog();
        for text in ["", "# Only a name\n", "\n\n  \n"] {
            let err = decode_deck(text, &catalog).unwrap_err();
            assert!(matches!(err, DeckError::MalformedDeckList { .. }), "{text:?}");
        }
    }

    #[test]
    fn leader_line_must_hold_exactly_one() {
        let catalog = sample_catalog();
        let err = decode_deck("2xOP01-001", &catalog).unwrap_err();
        assert!(matches!(err, DeckError::MalformedDeckList { line: 1, .. }));
    }

    #[test]
    fn unknown_leader_aborts() {
        let catalog = sample_catalog();
        let err = decode_deck("1xNOPE-01\n4xOP01-010", &catalog).unwrap_err();
        assert!(matches!(err, DeckError::UnknownCard(id) if id == "NOPE-01"));
    }

    #[test]
    fn whitespace_and_blank_lines_are_ignored() {
        let catalog = sample_catalog();
        let deck = decode_deck("\n\n  #   Red Rush  \n\n 1xOP01-001 \n\t4xOP01-010\n\n", &catalog).unwrap();
        assert_eq!(deck.name(), Some("Red Rush"));
        assert_eq!(deck.count("OP01-010"), 4);
    }

    #[test]
    fn repeated_lines_accumulate() {
        let catalog = sample_catalog();
        let deck = decode_deck("1xOP01-001\n2xOP01-010\n1xOP01-010", &catalog).unwrap();
        assert_eq!(deck.count("OP01-010"), 3);
    }

    #[test]
    fn leader_in_main_deck_is_rejected() {
        let catalog = sample_catalog();
        let err = decode_deck("1xOP01-001\n1xOP01-001", &catalog).unwrap_err();
        assert!(matches!(err, DeckError::MalformedDeckList { line: 2, .. }));
    }

    #[test]
    fn entry_grammar() {
        assert_eq!(parse_entry(1, "4xOP01-010").unwrap(), (4, "OP01-010"));
        assert_eq!(parse_entry(1, "12xEXx-1").unwrap(), (12, "EXx-1"));
        for bad in ["x4", "4x", "4 xOP", "4xOP 01", "0xOP01-010", "-1xOP", "99999999999xOP"] {
            assert!(parse_entry(1, bad).is_err(), "{bad}");
        }
    }
}
