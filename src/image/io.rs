//! I/O helpers for frames and JSON.
//!
//! - `load_frame`: read a PNG/TIFF frame into an `ImageF32` holding raw
//!   counts, with the bit depth they were stored at (8-bit grayscale is kept
//!   as is, everything else goes through 16-bit luma).
//! - `save_grayscale_f32`: write an `ImageF32` to a grayscale PNG, stretched
//!   to the frame's own min/max.
//! - `write_json_file` / `read_json_file`: serde round trips through disk.
use super::ImageF32;
use image::{DynamicImage, GenericImageView, GrayImage, Luma};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::Path;

/// Frame read from disk.
#[derive(Clone, Debug)]
pub struct LoadedFrame {
    pub image: ImageF32,
    /// Bits per sample of the stored counts (8 or 16).
    pub bit_depth: u8,
}

/// Load an image from disk as a single-channel float frame.
pub fn load_frame(path: &Path) -> Result<LoadedFrame, String> {
    let img = image::open(path).map_err(|e| format!("Failed to open {}: {e}", path.display()))?;
    let (w, h) = img.dimensions();
    let (data, bit_depth): (Vec<f32>, u8) = match img {
        DynamicImage::ImageLuma8(buf) => (buf.into_raw().into_iter().map(f32::from).collect(), 8),
        other => (
            other
                .into_luma16()
                .into_raw()
                .into_iter()
                .map(f32::from)
                .collect(),
            16,
        ),
    };
    let image = ImageF32::from_vec(w as usize, h as usize, data)
        .ok_or_else(|| format!("Unexpected buffer size for {}", path.display()))?;
    Ok(LoadedFrame { image, bit_depth })
}

/// Save a float image to a grayscale PNG, mapping `[min, max]` to `[0, 255]`.
pub fn save_grayscale_f32(image: &ImageF32, path: &Path) -> Result<(), String> {
    ensure_parent_dir(path)?;
    let lo = image.min_value();
    let hi = image.max_value();
    let span = if hi > lo { hi - lo } else { 1.0 };
    let mut out = GrayImage::new(image.w as u32, image.h as u32);
    for (y, row) in image.rows().enumerate() {
        for (x, &px) in row.iter().enumerate() {
            let v = ((px - lo) / span * 255.0).clamp(0.0, 255.0);
            out.put_pixel(x as u32, y as u32, Luma([v as u8]));
        }
    }
    out.save(path)
        .map_err(|e| format!("Failed to save {}: {e}", path.display()))
}

/// Serialize a value as pretty JSON to `path`, creating parent directories.
pub fn write_json_file<T: Serialize>(path: &Path, value: &T) -> Result<(), String> {
    ensure_parent_dir(path)?;
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| format!("Failed to serialize JSON for {}: {e}", path.display()))?;
    fs::write(path, json).map_err(|e| format!("Failed to write JSON {}: {e}", path.display()))
}

/// Read and deserialize a JSON document.
pub fn read_json_file<T: DeserializeOwned>(path: &Path) -> Result<T, String> {
    let data = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {e}", path.display()))?;
    serde_json::from_str(&data).map_err(|e| format!("Failed to parse {}: {e}", path.display()))
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
