//! Catalog browsing (`deckforge card ...`).

use anyhow::Result;
use clap::{Args, Subcommand};
use deckforge::{CardRecord, FilterOptions, search};

use crate::cli::CliContext;
use crate::cli::common::{CardTypeArg, ParallelArg};

/// Supported `deckforge card` subcommands.
#[derive(Subcommand, Debug)]
pub enum CardCommand {
    /// Search the catalog by facets and keywords.
    Search(CardSearchArgs),
    /// Show every printing of a card.
    Show(CardShowArgs),
}

/// Arguments for `deckforge card search`. Repeat a flag to match any of its values.
#[derive(Args, Debug)]
pub struct CardSearchArgs {
    /// Keywords that must all appear in name, features, text or trigger.
    pub words: Vec<String>,
    #[arg(long = "color")]
    pub colors: Vec<String>,
    #[arg(long = "type", value_enum)]
    pub types: Vec<CardTypeArg>,
    #[arg(long = "cost")]
    pub costs: Vec<u32>,
    #[arg(long = "counter")]
    pub counters: Vec<String>,
    #[arg(long = "attribute")]
    pub attributes: Vec<String>,
    #[arg(long = "block")]
    pub blocks: Vec<String>,
    #[arg(long = "feature")]
    pub features: Vec<String>,
    #[arg(long = "series")]
    pub series: Vec<String>,
    /// Deck-building mode: hide leaders and keep cards sharing these colors.
    #[arg(long = "leader-color")]
    pub leader_colors: Vec<String>,
    #[arg(long, default_value_t = ParallelArg::Normal, value_enum)]
    pub parallel: ParallelArg,
    /// Maximum number of rows to print.
    #[arg(long, default_value_t = 50)]
    pub limit: usize,
}

#[derive(Args, Debug)]
pub struct CardShowArgs {
    /// Card identifier.
    pub id: String,
}

/// Execute a card command.
pub fn handle(ctx: &CliContext, command: CardCommand) -> Result<()> {
    let catalog = ctx.catalog()?;
    match command {
        CardCommand::Search(args) => {
            let options = FilterOptions {
                colors: args.colors,
                types: args.types.into_iter().map(Into::into).collect(),
                costs: args.costs,
                counters: args.counters,
                attributes: args.attributes,
                blocks: args.blocks,
                features: args.features,
                free_words: args.words.join(" "),
                series_ids: args.series,
                leader_colors: args.leader_colors,
                parallel_mode: args.parallel.into(),
            };
            let results = search(&catalog, &options);
            for record in results.iter().take(args.limit) {
                println!("{}", summary_line(record));
            }
            println!("{} match(es)", results.len());
            Ok(())
        }
        CardCommand::Show(args) => {
            let record = catalog.require(&args.id)?;
            print_details(record);
            for variant in catalog.records().iter().filter(|r| r.card_id == args.id && r.is_parallel) {
                println!();
                print_details(variant);
            }
            Ok(())
        }
    }
}

fn summary_line(record: &CardRecord) -> String {
    format!(
        "{:<10} {:<9} {:<8} {:>2}  {}{}",
        record.card_id,
        record.card_type.to_string(),
        record.color,
        record.cost,
        record.name,
        if record.is_parallel { " (parallel)" } else { "" }
    )
}

fn print_details(record: &CardRecord) {
    println!("{}{}", record.name, if record.is_parallel { " (parallel)" } else { "" });
    println!("  id:         {}", record.card_id);
    println!("  type:       {}", record.card_type);
    println!("  color:      {}", record.color);
    println!("  cost:       {}", record.cost);
    println!("  counter:    {}", record.counter);
    if !record.attributes.is_empty() {
        println!("  attributes: {}", record.attributes.join("/"));
    }
    if !record.features.is_empty() {
        println!("  features:   {}", record.features.join("/"));
    }
    println!("  series:     {}", record.series_id);
    if !record.text.is_empty() {
        println!("  text:       {}", record.text);
    }
    if !record.trigger.is_empty() {
        println!("  trigger:    {}", record.trigger);
    }
}
