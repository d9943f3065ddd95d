//! Convenience helpers shared across command handlers.

use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;

use anyhow::{Context, Result};
use deckforge::{Catalog, Deck, decode_deck, encode_deck, write_atomic};
use image::DynamicImage;

/// Read a text file, or stdin when the path is `-`.
pub fn read_text(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        return read_stdin();
    }
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

/// Read the entire stdin stream into memory.
pub fn read_stdin() -> Result<String> {
    let mut buffer = String::new();
    io::stdin()
        .read_to_string(&mut buffer)
        .context("failed to read from stdin")?;
    Ok(buffer)
}

/// Persist a string either to a file or stdout when `-` is provided.
pub fn write_output(path: &Path, content: &str) -> Result<()> {
    if path.as_os_str() == "-" {
        let mut stdout = io::stdout();
        stdout.write_all(content.as_bytes())?;
        stdout.write_all(b"\n")?;
        return Ok(());
    }
    write_atomic(path, content).with_context(|| format!("failed to write {}", path.display()))
}

/// Load a deck file holding canonical deck text.
pub fn load_deck(path: &Path, catalog: &Catalog) -> Result<Deck> {
    let text = read_text(path)?;
    decode_deck(&text, catalog).with_context(|| format!("failed to read deck {}", path.display()))
}

/// Write a deck file in canonical form.
pub fn save_deck(path: &Path, deck: &Deck, catalog: &Catalog) -> Result<()> {
    let text = encode_deck(deck, catalog)?;
    write_output(path, &text)
}

pub fn save_png(path: &Path, image: DynamicImage) -> Result<()> {
    image
        .save_with_format(path, image::ImageFormat::Png)
        .with_context(|| format!("failed to write {}", path.display()))
}
