//! QR deck codes (`deckforge code ...`).

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use deckforge::{decode_deck, encode_deck, qr};
use image::DynamicImage;

use crate::cli::CliContext;
use crate::cli::utils::{load_deck, save_png, write_output};

/// Supported `deckforge code` subcommands.
#[derive(Subcommand, Debug)]
pub enum CodeCommand {
    /// Write the deck's QR code as a 400x400 PNG.
    Encode(CodeEncodeArgs),
    /// Read a deck QR code from an image and print the deck text.
    Decode(CodeDecodeArgs),
}

#[derive(Args, Debug)]
pub struct CodeEncodeArgs {
    /// Deck file to encode.
    pub deck: PathBuf,
    /// Output PNG path.
    #[arg(short = 'o', long = "output")]
    pub output: PathBuf,
}

#[derive(Args, Debug)]
pub struct CodeDecodeArgs {
    /// PNG or JPEG image containing the code.
    pub image: PathBuf,
    /// Output file for the deck text (`-` for stdout).
    #[arg(short = 'o', long = "output", default_value = "-")]
    pub output: PathBuf,
}

/// Execute a code command.
pub fn handle(ctx: &CliContext, command: CodeCommand) -> Result<()> {
    match command {
        CodeCommand::Encode(args) => encode(ctx, args),
        CodeCommand::Decode(args) => decode(ctx, args),
    }
}

fn encode(ctx: &CliContext, args: CodeEncodeArgs) -> Result<()> {
    let catalog = ctx.catalog()?;
    let deck = load_deck(&args.deck, &catalog)?;
    let text = encode_deck(&deck, &catalog)?;
    let panel = qr::encode_panel(&text)?;
    save_png(&args.output, DynamicImage::ImageLuma8(panel))?;
    println!("Wrote deck code for {} to {}", args.deck.display(), args.output.display());
    Ok(())
}

fn decode(ctx: &CliContext, args: CodeDecodeArgs) -> Result<()> {
    let bytes = fs::read(&args.image).with_context(|| format!("failed to read {}", args.image.display()))?;
    let text = qr::decode_bytes(&bytes)?;
    // Normalize through the codec so only valid deck text is emitted.
    let catalog = ctx.catalog()?;
    let deck = decode_deck(&text, &catalog)?;
    write_output(&args.output, &encode_deck(&deck, &catalog)?)
}
