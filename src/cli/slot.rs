//! Save slot management (`deckforge slot ...`).

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Subcommand};
use deckforge::{SlotStore, decode_deck, encode_deck};

use crate::cli::CliContext;
use crate::cli::utils::{load_deck, write_output};

/// Supported `deckforge slot` subcommands.
#[derive(Subcommand, Debug)]
pub enum SlotCommand {
    /// List saved decks.
    List,
    /// Save a deck file into a slot named after the deck (or `--name`).
    Save(SlotSaveArgs),
    /// Write a saved deck to a file or stdout.
    Load(SlotLoadArgs),
    /// Delete a saved deck.
    Delete(SlotNameArgs),
}

#[derive(Args, Debug)]
pub struct SlotSaveArgs {
    /// Deck file to save.
    pub deck: PathBuf,
    /// Slot name; defaults to the deck name.
    #[arg(short = 'n', long)]
    pub name: Option<String>,
}

#[derive(Args, Debug)]
pub struct SlotLoadArgs {
    pub name: String,
    /// Output deck file (`-` for stdout).
    #[arg(short = 'o', long = "output", default_value = "-")]
    pub output: PathBuf,
}

#[derive(Args, Debug)]
pub struct SlotNameArgs {
    pub name: String,
}

/// Execute a slot command.
pub fn handle(ctx: &CliContext, command: SlotCommand) -> Result<()> {
    let store = SlotStore::new(&ctx.settings.slot_dir);
    match command {
        SlotCommand::List => {
            let slots = store.list()?;
            if slots.is_empty() {
                println!("No saved decks in {}", store.dir().display());
            }
            for slot in slots {
                let modified = slot
                    .modified
                    .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_else(|| "-".to_string());
                println!("{modified}  {}", slot.name);
            }
            Ok(())
        }
        SlotCommand::Save(args) => {
            let catalog = ctx.catalog()?;
            let deck = load_deck(&args.deck, &catalog)?;
            let name = args
                .name
                .as_deref()
                .or(deck.name())
                .ok_or_else(|| anyhow::anyhow!("deck has no name; pass --name"))?;
            let path = store.save(name, &encode_deck(&deck, &catalog)?)?;
            println!("Saved slot '{name}' to {}", path.display());
            Ok(())
        }
        SlotCommand::Load(args) => {
            let catalog = ctx.catalog()?;
            let text = store.load(&args.name)?;
            let deck = decode_deck(&text, &catalog)?;
            write_output(&args.output, &encode_deck(&deck, &catalog)?)
        }
        SlotCommand::Delete(args) => {
            store.delete(&args.name)?;
            println!("Deleted slot '{}'", args.name);
            Ok(())
        }
    }
}
