//! Command-line interface wiring for the `deckforge` binary.
//!
//! This module owns the clap definitions and delegates execution to
//! specialized submodules that encapsulate each command family.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use deckforge::{Catalog, Settings};

pub mod card;
pub mod code;
pub mod common;
pub mod deck;
pub mod render;
pub mod slot;
pub mod utils;

/// Parsed CLI entrypoint for the `deckforge` binary.
#[derive(Parser, Debug)]
#[command(name = "deckforge", version, about = "Build, share and render trading card game decks")]
pub struct Cli {
    /// Settings file (default: ./deckforge.toml when present).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    /// Catalog data directory, overriding the configured one.
    #[arg(long, global = true)]
    pub catalog: Option<PathBuf>,
    /// Increase log verbosity (-v info, -vv debug).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,
    /// Top-level command to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// High-level command families made available to end users.
#[derive(Subcommand, Debug)]
pub enum Command {
    #[command(subcommand)]
    Deck(deck::DeckCommand),
    /// Render the composite deck image.
    Render(render::RenderArgs),
    #[command(subcommand)]
    Code(code::CodeCommand),
    #[command(subcommand)]
    Card(card::CardCommand),
    #[command(subcommand)]
    Slot(slot::SlotCommand),
}

/// Settings plus the catalog location shared by every command.
pub struct CliContext {
    pub settings: Settings,
}

impl CliContext {
    pub fn catalog(&self) -> Result<Catalog> {
        let dir = &self.settings.catalog_path;
        Catalog::load_dir(dir).with_context(|| format!("failed to load catalog from {}", dir.display()))
    }
}

/// Execute the requested command.
pub fn run(cli: Cli) -> Result<()> {
    let mut settings = Settings::load(cli.config.as_deref()).context("failed to load settings")?;
    if let Some(dir) = cli.catalog {
        settings.catalog_path = dir;
    }
    let ctx = CliContext { settings };
    match cli.command {
        Command::Deck(cmd) => deck::handle(&ctx, cmd),
        Command::Render(args) => render::handle(&ctx, args),
        Command::Code(cmd) => code::handle(&ctx, cmd),
        Command::Card(cmd) => card::handle(&ctx, cmd),
        Command::Slot(cmd) => slot::handle(&ctx, cmd),
    }
}
