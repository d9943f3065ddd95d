//! Shared clap helper types for CLI commands.

use clap::ValueEnum;
use deckforge::{CardType, ParallelMode};

/// Card type selector used by search facets.
#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum CardTypeArg {
    Leader,
    Character,
    Event,
    Stage,
}

impl From<CardTypeArg> for CardType {
    fn from(value: CardTypeArg) -> CardType {
        match value {
            CardTypeArg::Leader => CardType::Leader,
            CardTypeArg::Character => CardType::Character,
            CardTypeArg::Event => CardType::Event,
            CardTypeArg::Stage => CardType::Stage,
        }
    }
}

/// Which printings to include in search results.
#[derive(ValueEnum, Debug, Clone, Copy, Default)]
pub enum ParallelArg {
    #[default]
    Normal,
    Parallel,
    Both,
}

impl From<ParallelArg> for ParallelMode {
    fn from(value: ParallelArg) -> ParallelMode {
        match value {
            ParallelArg::Normal => ParallelMode::Normal,
            ParallelArg::Parallel => ParallelMode::Parallel,
            ParallelArg::Both => ParallelMode::Both,
        }
    }
}
