//! Deck lifecycle commands (`deckforge deck ...`).

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{ArgGroup, Args, Subcommand};
use deckforge::{AddOutcome, Catalog, Deck, DeckRules, decode_deck, encode_deck, qr};
use tracing::info;

use crate::cli::CliContext;
use crate::cli::utils::{load_deck, read_text, save_deck, write_output};

/// Supported `deckforge deck` subcommands.
#[derive(Subcommand, Debug)]
pub enum DeckCommand {
    /// Create a new deck file with a leader and optional name.
    New(DeckNewArgs),
    /// Add copies of a card to a deck file.
    Add(DeckEditArgs),
    /// Remove copies of a card from a deck file.
    Remove(DeckEditArgs),
    /// Print the deck contents with card names and the 50-card status.
    Show(DeckShowArgs),
    /// Write the canonical deck text.
    Export(DeckExportArgs),
    /// Build a deck file from deck text or a QR image.
    Import(DeckImportArgs),
}

/// Arguments for `deckforge deck new`.
#[derive(Args, Debug)]
pub struct DeckNewArgs {
    /// Leader card identifier.
    #[arg(short = 'l', long)]
    pub leader: String,
    /// Deck name shown on the composite image.
    #[arg(short = 'n', long)]
    pub name: Option<String>,
    /// Output deck file.
    #[arg(short = 'o', long = "output")]
    pub output: PathBuf,
}

/// Arguments for `deckforge deck add` and `deckforge deck remove`.
#[derive(Args, Debug)]
pub struct DeckEditArgs {
    /// Deck file to modify in place.
    pub deck: PathBuf,
    /// Card identifier.
    pub card: String,
    /// Number of copies.
    #[arg(short = 'c', long, default_value_t = 1)]
    pub count: u32,
}

/// Arguments for `deckforge deck show`.
#[derive(Args, Debug)]
pub struct DeckShowArgs {
    /// Deck file to inspect.
    pub deck: PathBuf,
}

/// Arguments for `deckforge deck export`.
#[derive(Args, Debug)]
pub struct DeckExportArgs {
    /// Source deck file.
    pub deck: PathBuf,
    /// Output file path (`-` for stdout).
    #[arg(short = 'o', long = "output", default_value = "-")]
    pub output: PathBuf,
}

/// Arguments for `deckforge deck import`.
#[derive(Args, Debug)]
#[command(group(ArgGroup::new("source").required(true).args(["from", "image"])))]
pub struct DeckImportArgs {
    /// Deck text file (`-` for stdin).
    #[arg(long)]
    pub from: Option<PathBuf>,
    /// Image containing a deck QR code.
    #[arg(long)]
    pub image: Option<PathBuf>,
    /// Output deck file.
    #[arg(short = 'o', long = "output")]
    pub output: PathBuf,
}

/// Execute a deck command.
pub fn handle(ctx: &CliContext, command: DeckCommand) -> Result<()> {
    let catalog = ctx.catalog()?;
    let rules = ctx.settings.deck_rules();
    match command {
        DeckCommand::New(args) => new(&catalog, args),
        DeckCommand::Add(args) => add(&catalog, &rules, args),
        DeckCommand::Remove(args) => remove(&catalog, args),
        DeckCommand::Show(args) => show(&catalog, args),
        DeckCommand::Export(args) => export(&catalog, args),
        DeckCommand::Import(args) => import(&catalog, args),
    }
}

fn new(catalog: &Catalog, args: DeckNewArgs) -> Result<()> {
    let mut deck = Deck::new();
    deck.set_leader(catalog, &args.leader)?;
    deck.set_name(args.name.as_deref())?;
    save_deck(&args.output, &deck, catalog)?;
    println!("Created deck {} (leader: {})", args.output.display(), args.leader);
    Ok(())
}

fn add(catalog: &Catalog, rules: &DeckRules, args: DeckEditArgs) -> Result<()> {
    let mut deck = load_deck(&args.deck, catalog)?;
    let mut added = 0u32;
    for _ in 0..args.count {
        match deck.add_copy(catalog, rules, &args.card)? {
            AddOutcome::Added(_) => added += 1,
            AddOutcome::CopyLimitReached(held) => {
                println!("Copy limit reached for {} ({held} copies)", args.card);
                break;
            }
        }
    }
    save_deck(&args.deck, &deck, catalog)?;
    info!(card = %args.card, added, "cards added");
    println!(
        "Added {added}x{} ({} in deck, {})",
        args.card,
        deck.count(&args.card),
        deck.status()
    );
    Ok(())
}

fn remove(catalog: &Catalog, args: DeckEditArgs) -> Result<()> {
    let mut deck = load_deck(&args.deck, catalog)?;
    let before = deck.count(&args.card);
    for _ in 0..args.count {
        if deck.remove_copy(&args.card) == 0 {
            break;
        }
    }
    save_deck(&args.deck, &deck, catalog)?;
    println!(
        "Removed {}x{} ({})",
        before - deck.count(&args.card),
        args.card,
        deck.status()
    );
    Ok(())
}

fn show(catalog: &Catalog, args: DeckShowArgs) -> Result<()> {
    let deck = load_deck(&args.deck, catalog)?;
    println!("Deck: {}", deck.name().unwrap_or("(unnamed)"));
    if let Some(leader) = deck.leader() {
        println!("Leader: {} {}", leader, card_name(catalog, leader));
    }
    for (card_id, count) in deck.sorted_entries(catalog) {
        println!("{count:>3}x {card_id:<10} {}", card_name(catalog, card_id));
    }
    println!("Total: {} ({})", deck.total_count(), deck.status());
    Ok(())
}

fn export(catalog: &Catalog, args: DeckExportArgs) -> Result<()> {
    let deck = load_deck(&args.deck, catalog)?;
    let text = encode_deck(&deck, catalog)?;
    write_output(&args.output, &text)
}

fn import(catalog: &Catalog, args: DeckImportArgs) -> Result<()> {
    let text = match (&args.from, &args.image) {
        (Some(path), _) => read_text(path)?,
        (None, Some(path)) => {
            let bytes = std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
            qr::decode_bytes(&bytes).with_context(|| format!("no deck code in {}", path.display()))?
        }
        (None, None) => bail!("either --from or --image is required"),
    };
    let deck = decode_deck(&text, catalog)?;
    save_deck(&args.output, &deck, catalog)?;
    println!(
        "Imported deck into {} ({} cards, {})",
        args.output.display(),
        deck.total_count(),
        deck.status()
    );
    Ok(())
}

fn card_name<'a>(catalog: &'a Catalog, card_id: &str) -> &'a str {
    catalog
        .resolve(card_id)
        .map(|record| record.name.as_str())
        .unwrap_or("(not in catalog)")
}
