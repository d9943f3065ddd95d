//! QR transport for canonical deck text.

use std::panic::{self, AssertUnwindSafe};

use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage, Luma};
use imageproc::contrast::equalize_histogram;
use qrcode::types::QrError;
use qrcode::{Color as Module, EcLevel, QrCode};
use tracing::debug;

use crate::error::{DeckError, Result};

pub const MODULE_PX: u32 = 8;
pub const QUIET_ZONE_MODULES: u32 = 2;
pub const PANEL_SIZE: u32 = 400;
/// Captures wider or taller than this get an extra downscaled detection pass.
const DOWNSCALE_ABOVE: u32 = 1600;

const DARK: Luma<u8> = Luma([0]);
const LIGHT: Luma<u8> = Luma([255]);

/// Encode `payload` as a `PANEL_SIZE` square, black modules on white.
pub fn encode_panel(payload: &str) -> Result<GrayImage> {
    let raw = encode_modules(payload)?;
    Ok(imageops::resize(&raw, PANEL_SIZE, PANEL_SIZE, FilterType::Nearest))
}

/// Encode at the native `MODULE_PX` scale, quiet zone included.
pub fn encode_modules(payload: &str) -> Result<GrayImage> {
    // Byte-mode data at an automatic version can only fail by not fitting.
    let code = QrCode::with_error_correction_level(payload.as_bytes(), EcLevel::M)
        .map_err(|_: QrError| DeckError::PayloadTooLarge(payload.len()))?;
    let width = code.width() as u32;
    let colors = code.to_colors();
    let side = (width + 2 * QUIET_ZONE_MODULES) * MODULE_PX;
    let mut img = GrayImage::from_pixel(side, side, LIGHT);
    for (idx, module) in colors.iter().enumerate() {
        if *module != Module::Dark {
            continue;
        }
        let mx = idx as u32 % width + QUIET_ZONE_MODULES;
        let my = idx as u32 / width + QUIET_ZONE_MODULES;
        for dy in 0..MODULE_PX {
            for dx in 0..MODULE_PX {
                img.put_pixel(mx * MODULE_PX + dx, my * MODULE_PX + dy, DARK);
            }
        }
    }
    debug!(version_width = width, payload_len = payload.len(), "qr encoded");
    Ok(img)
}

/// Decode the first QR payload found in raw image bytes (PNG, JPEG).
pub fn decode_bytes(bytes: &[u8]) -> Result<String> {
    let img = image::load_from_memory(bytes).map_err(|err| DeckError::UnreadableImage(err.to_string()))?;
    decode_image(&img)
}

/// Detection runs on grayscale, then histogram-equalized, then downscaled copies.
pub fn decode_image(img: &DynamicImage) -> Result<String> {
    let gray = img.to_luma8();
    if let Some(text) = detect(&gray, "grayscale") {
        return Ok(text);
    }
    let equalized = equalize_histogram(&gray);
    if let Some(text) = detect(&equalized, "equalized") {
        return Ok(text);
    }
    if let Some(small) = downscaled(&gray) {
        if let Some(text) = detect(&small, "downscaled") {
            return Ok(text);
        }
    }
    Err(DeckError::NoCodeDetected)
}

/// Copy shrunk so the longer side is `DOWNSCALE_ABOVE`, for oversized captures only.
fn downscaled(gray: &GrayImage) -> Option<GrayImage> {
    let (w, h) = gray.dimensions();
    if w.max(h) <= DOWNSCALE_ABOVE {
        return None;
    }
    let factor = w.max(h) as f32 / DOWNSCALE_ABOVE as f32;
    let nw = ((w as f32 / factor).round() as u32).max(1);
    let nh = ((h as f32 / factor).round() as u32).max(1);
    Some(imageops::resize(gray, nw, nh, FilterType::Triangle))
}

fn detect(gray: &GrayImage, pass: &str) -> Option<String> {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        let (w, h) = gray.dimensions();
        let mut prepared = rqrr::PreparedImage::prepare_from_greyscale(
            w as usize,
            h as usize,
            |x, y| gray.get_pixel(x as u32, y as u32)[0],
        );
        let grids = prepared.detect_grids();
        debug!(pass, grids = grids.len(), "qr detection pass");
        grids
            .into_iter()
            .find_map(|grid| grid.decode().ok().map(|(_, content)| content))
    }));
    match outcome {
        Ok(found) => found,
        Err(_) => {
            debug!(pass, "qr detector panicked");
            None
        }
    }
}
