//! Composite image rendering (`deckforge render ...`).

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use deckforge::Session;
use image::DynamicImage;

use crate::cli::CliContext;
use crate::cli::utils::{load_deck, save_png};

/// Args for `deckforge render`.
#[derive(Args, Debug)]
pub struct RenderArgs {
    /// Deck file to render.
    pub deck: PathBuf,
    /// Output PNG path.
    #[arg(short = 'o', long = "output")]
    pub output: PathBuf,
}

/// Execute the render command.
pub fn handle(ctx: &CliContext, args: RenderArgs) -> Result<()> {
    let catalog = ctx.catalog()?;
    let deck = load_deck(&args.deck, &catalog)?;
    let status = deck.status();
    let mut session = Session::new(catalog, &ctx.settings)?;
    session.replace_deck(deck);
    let image = session
        .render()
        .with_context(|| format!("failed to render {}", args.deck.display()))?;

    if let Some(parent) = args.output.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).with_context(|| {
                format!("failed to create output directory {}", parent.display())
            })?;
        }
    }
    let (width, height) = image.dimensions();
    save_png(&args.output, DynamicImage::ImageRgb8(image))?;
    println!(
        "Rendered {}x{} deck image to {} ({status})",
        width,
        height,
        args.output.display()
    );
    Ok(())
}
