use std::fs;
use std::io::Cursor;
use std::path::Path;

use image::{DynamicImage, ImageError, ImageFormat};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImageLoadError {
    #[error("Failed to load image: {0}")]
    Load(#[from] ImageError),
    #[error("File not found: {0}")]
    NotFound(String),
    #[error("Failed to save image: {0}")]
    Save(String),
}

pub fn load_image(path: &Path) -> Result<DynamicImage, ImageLoadError> {
    if !path.exists() {
        return Err(ImageLoadError::NotFound(path.display().to_string()));
    }
    Ok(image::open(path)?)
}

/// Decode an in-memory image, guessing the format from its magic bytes.
pub fn decode_bytes(bytes: &[u8]) -> Result<DynamicImage, ImageLoadError> {
    Ok(image::load_from_memory(bytes)?)
}

pub fn encode_png(img: &DynamicImage) -> Result<Vec<u8>, ImageLoadError> {
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png)?;
    Ok(buf.into_inner())
}

/// Write `img` as PNG, creating parent directories as needed.
pub fn save_png(img: &DynamicImage, path: &Path) -> Result<(), ImageLoadError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| ImageLoadError::Save(e.to_string()))?;
    }
    img.save_with_format(path, ImageFormat::Png)
        .map_err(|e| ImageLoadError::Save(e.to_string()))
}
