//! I/O helpers for RGBA rasters and JSON.
//!
//! - `load_rgba_image`: read a PNG/JPEG into an owned RGBA buffer.
//! - `save_rgba`: write an owned RGBA buffer to disk (format from extension).
//! - `write_json_file`: pretty-print a serializable value to disk.
use super::RgbaBuffer;
use image::{DynamicImage, ImageBuffer, Rgba};
use serde::Serialize;
use std::fs;
use std::path::Path;

/// Load an image from disk and convert to 8-bit RGBA.
pub fn load_rgba_image(path: &Path) -> Result<RgbaBuffer, String> {
    let img = image::open(path)
        .map_err(|e| format!("Failed to open {}: {e}", path.display()))?
        .into_rgba8();
    let width = img.width() as usize;
    let height = img.height() as usize;
    RgbaBuffer::from_raw(width, height, img.into_raw())
        .ok_or_else(|| format!("Unexpected buffer size for {}", path.display()))
}

/// Save an RGBA buffer; the format follows the file extension.
pub fn save_rgba(buffer: &RgbaBuffer, path: &Path) -> Result<(), String> {
    ensure_parent_dir(path)?;
    let image: ImageBuffer<Rgba<u8>, Vec<u8>> = ImageBuffer::from_raw(
        buffer.width() as u32,
        buffer.height() as u32,
        buffer.as_bytes().to_vec(),
    )
    .ok_or_else(|| "Failed to create image buffer".to_string())?;
    let dynamic = DynamicImage::ImageRgba8(image);
    let is_jpeg = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("jpg") || e.eq_ignore_ascii_case("jpeg"));
    // JPEG has no alpha channel
    let dynamic = if is_jpeg {
        DynamicImage::ImageRgb8(dynamic.into_rgb8())
    } else {
        dynamic
    };
    dynamic
        .save(path)
        .map_err(|e| format!("Failed to save {}: {e}", path.display()))
}

/// Serialize a value as pretty JSON to `path`, creating parent directories.
pub fn write_json_file<T: Serialize>(path: &Path, value: &T) -> Result<(), String> {
    ensure_parent_dir(path)?;
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| format!("Failed to serialize JSON for {}: {e}", path.display()))?;
    fs::write(path, json).map_err(|e| format!("Failed to write JSON {}: {e}", path.display()))
}

fn ensure_parent_dir(path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create {}: {e}", parent.display()))?;
        }
    }
    Ok(())
}
