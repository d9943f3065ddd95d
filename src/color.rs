//! Color identity tokens and the ranking derived from them.

use std::fmt;

use image::Rgb;
use serde::{Deserialize, Serialize};

/// Rank assigned to every component when a card has no recognizable color.
pub const COLORLESS_RANK: u16 = 999;

/// Card colors in canonical order; the discriminant is the color's rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    Red,
    Green,
    Blue,
    Purple,
    Black,
    Yellow,
}

impl Color {
    pub const CANONICAL: [Color; 6] = [
        Color::Red,
        Color::Green,
        Color::Blue,
        Color::Purple,
        Color::Black,
        Color::Yellow,
    ];

    /// Accepts catalog tokens (`赤`) as well as English names (`red`).
    pub fn from_token(token: &str) -> Option<Self> {
        let token = token.trim();
        let color = match token {
            "赤" => Color::Red,
            "緑" => Color::Green,
            "青" => Color::Blue,
            "紫" => Color::Purple,
            "黒" => Color::Black,
            "黄" => Color::Yellow,
            _ => match token.to_ascii_lowercase().as_str() {
                "red" => Color::Red,
                "green" => Color::Green,
                "blue" => Color::Blue,
                "purple" => Color::Purple,
                "black" => Color::Black,
                "yellow" => Color::Yellow,
                _ => return None,
            },
        };
        Some(color)
    }

    pub fn rank(self) -> u16 {
        self as u16
    }

    /// Background fill used by the composite renderer.
    pub fn swatch(self) -> Rgb<u8> {
        match self {
            Color::Red => Rgb([0xac, 0x11, 0x22]),
            Color::Green => Rgb([0x00, 0x88, 0x66]),
            Color::Blue => Rgb([0x00, 0x84, 0xbd]),
            Color::Purple => Rgb([0x93, 0x38, 0x8b]),
            Color::Black => Rgb([0x21, 0x18, 0x18]),
            Color::Yellow => Rgb([0xf7, 0xe7, 0x31]),
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Color::Red => "red",
            Color::Green => "green",
            Color::Blue => "blue",
            Color::Purple => "purple",
            Color::Black => "black",
            Color::Yellow => "yellow",
        };
        f.write_str(name)
    }
}

/// Split a color-identity string on `/` or the full-width `／`, keeping source order.
pub fn split_tokens(identity: &str) -> Vec<&str> {
    identity
        .split(['/', '／'])
        .map(str::trim)
        .filter(|t| !t.is_empty() && *t != "-")
        .collect()
}

/// Swatches for every token in source order; unknown tokens fall back to white.
pub fn gradient_stops(identity: &str) -> Vec<Rgb<u8>> {
    split_tokens(identity)
        .into_iter()
        .map(|token| {
            Color::from_token(token)
                .map(Color::swatch)
                .unwrap_or(Rgb([0xff, 0xff, 0xff]))
        })
        .collect()
}

/// Four-part rank ordering cards by color identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ColorRank {
    pub primary: u16,
    pub type_rank: u16,
    pub secondary: u16,
    pub multi: u16,
}

impl ColorRank {
    pub const COLORLESS: ColorRank = ColorRank {
        primary: COLORLESS_RANK,
        type_rank: COLORLESS_RANK,
        secondary: COLORLESS_RANK,
        multi: COLORLESS_RANK,
    };

    pub fn compute(identity: &str, type_rank: u16) -> Self {
        let present: Vec<Color> = split_tokens(identity)
            .into_iter()
            .filter_map(Color::from_token)
            .collect();
        let mut canonical = Color::CANONICAL
            .iter()
            .copied()
            .filter(|c| present.contains(c));
        let Some(primary) = canonical.next() else {
            return Self::COLORLESS;
        };
        let is_multi = canonical.clone().next().is_some();
        let secondary = if is_multi {
            canonical.next().map(|c| c.rank() + 1).unwrap_or(0)
        } else {
            0
        };
        Self {
            primary: primary.rank(),
            type_rank,
            secondary,
            multi: u16::from(is_multi),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn tokens_accept_both_separators() {
        assert_eq!(split_tokens("赤／緑/ 青 "), vec!["赤", "緑", "青"]);
        assert!(split_tokens("-").is_empty());
    }

    #[test]
    fn primary_follows_canonical_order_not_source_order() {
        let rank = ColorRank::compute("黄/赤", 1);
        assert_eq!(
            rank,
            ColorRank {
                primary: 0,
                type_rank: 1,
                secondary: 6,
                multi: 1
            }
        );
    }

    #[test]
    fn single_color_has_no_secondary() {
        let rank = ColorRank::compute("Blue", 2);
        assert_eq!(rank.primary, 2);
        assert_eq!(rank.secondary, 0);
        assert_eq!(rank.multi, 0);
    }

    #[test]
    fn colorless_sorts_after_every_colored_card() {
        let colorless = ColorRank::compute("-", 0);
        assert_eq!(colorless, ColorRank::COLORLESS);
        assert!(ColorRank::compute("黄", 9) < colorless);
    }

    #[test]
    fn unknown_tokens_map_to_white_stops() {
        let stops = gradient_stops("赤/銀");
        assert_eq!(stops, vec![Color::Red.swatch(), Rgb([0xff, 0xff, 0xff])]);
    }
}
