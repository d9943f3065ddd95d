//! Named deck save slots: one `<name>.txt` of canonical deck text per slot.

use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tracing::{debug, info};

use crate::error::{DeckError, Result};

pub const SLOT_EXTENSION: &str = "txt";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotInfo {
    pub name: String,
    pub modified: Option<DateTime<Local>>,
}

/// Directory-backed slot store. Writes land in a temp file first and are
/// renamed into place, so a failed save never clobbers the previous slot.
#[derive(Debug, Clone)]
pub struct SlotStore {
    dir: PathBuf,
}

impl SlotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Slots sorted by name. A missing directory lists as empty.
    pub fn list(&self) -> Result<Vec<SlotInfo>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(DeckError::persistence(&self.dir, err)),
        };
        let mut slots = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|err| DeckError::persistence(&self.dir, err))?;
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(SLOT_EXTENSION) {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };
            let modified = entry
                .metadata()
                .and_then(|meta| meta.modified())
                .ok()
                .map(DateTime::<Local>::from);
            slots.push(SlotInfo {
                name: name.to_string(),
                modified,
            });
        }
        slots.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(slots)
    }

    pub fn save(&self, name: &str, text: &str) -> Result<PathBuf> {
        let path = self.slot_path(name)?;
        fs::create_dir_all(&self.dir).map_err(|err| DeckError::persistence(&self.dir, err))?;
        write_atomic(&path, text)?;
        info!(slot = name, path = %path.display(), "slot saved");
        Ok(path)
    }

    pub fn load(&self, name: &str) -> Result<String> {
        let path = self.slot_path(name)?;
        let text = fs::read_to_string(&path).map_err(|err| DeckError::persistence(&path, err))?;
        debug!(slot = name, bytes = text.len(), "slot loaded");
        Ok(text)
    }

    pub fn delete(&self, name: &str) -> Result<()> {
        let path = self.slot_path(name)?;
        fs::remove_file(&path).map_err(|err| DeckError::persistence(&path, err))?;
        info!(slot = name, "slot deleted");
        Ok(())
    }

    fn slot_path(&self, name: &str) -> Result<PathBuf> {
        let name = sanitize_slot_name(name)?;
        Ok(self.dir.join(format!("{name}.{SLOT_EXTENSION}")))
    }
}

/// Trimmed slot name; rejects empty names, path separators, control characters
/// and dot-only names.
pub fn sanitize_slot_name(name: &str) -> Result<&str> {
    let trimmed = name.trim();
    let reason = if trimmed.is_empty() {
        Some("must not be empty")
    } else if trimmed.contains(['/', '\\']) {
        Some("must not contain path separators")
    } else if trimmed.chars().any(char::is_control) {
        Some("must not contain control characters")
    } else if trimmed.chars().all(|c| c == '.') {
        Some("must not consist of dots only")
    } else {
        None
    };
    match reason {
        Some(reason) => Err(DeckError::InvalidDeckName {
            name: name.to_string(),
            reason,
        }),
        None => Ok(trimmed),
    }
}

/// Replace `path` with `text` through a sibling `.tmp` file and a rename, so
/// an interrupted write leaves the previous contents intact.
pub fn write_atomic(path: &Path, text: &str) -> Result<()> {
    let mut tmp_name = path
        .file_name()
        .ok_or_else(|| DeckError::persistence(path, "not a file path"))?
        .to_os_string();
    tmp_name.push(".tmp");
    let tmp = path.with_file_name(tmp_name);
    let written = write_file(&tmp, text)
        .and_then(|()| fs::rename(&tmp, path).map_err(|err| DeckError::persistence(path, err)));
    if written.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    written
}

fn write_file(path: &Path, text: &str) -> Result<()> {
    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
        .map_err(|err| DeckError::persistence(path, err))?;
    let mut writer = BufWriter::new(file);
    writer
        .write_all(text.as_bytes())
        .and_then(|()| writer.flush())
        .map_err(|err| DeckError::persistence(path, err))
}
