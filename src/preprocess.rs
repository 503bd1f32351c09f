//! Morphological cleanup applied to images before text detection.
//!
//! Grayscale, dilate with a `dilate_kernel` square window, erode with an
//! `erode_kernel` square window, then expand back to three channels. Windows
//! are anchored the way OpenCV anchors even-sized kernels (offset `-k/2`).

use image::{DynamicImage, GrayImage, Luma};
use imageproc::morphology::{grayscale_dilate, grayscale_erode, Mask};

use crate::config::PreprocessConfig;

/// Largest accepted kernel side; the mask centre must fit in a `u8`.
pub const MAX_KERNEL: u32 = 255;

pub fn preprocess(image: &DynamicImage, config: &PreprocessConfig) -> DynamicImage {
    let gray = image.to_luma8();
    let dilated = dilate(&gray, config.dilate_kernel);
    let eroded = erode(&dilated, config.erode_kernel);
    DynamicImage::ImageRgb8(DynamicImage::ImageLuma8(eroded).to_rgb8())
}

/// Max filter over a `size`×`size` window.
pub fn dilate(image: &GrayImage, size: u32) -> GrayImage {
    match square_mask(size) {
        Some(mask) => grayscale_dilate(image, &mask),
        None => image.clone(),
    }
}

/// Min filter over a `size`×`size` window.
pub fn erode(image: &GrayImage, size: u32) -> GrayImage {
    match square_mask(size) {
        Some(mask) => grayscale_erode(image, &mask),
        None => image.clone(),
    }
}

// Solid square centred at `size / 2`, so even kernels reach one pixel further
// right and down, as OpenCV's default anchor does.
fn square_mask(size: u32) -> Option<Mask> {
    let size = size.min(MAX_KERNEL);
    if size <= 1 {
        return None;
    }
    let solid = GrayImage::from_pixel(size, size, Luma([255]));
    let centre = (size / 2) as u8;
    Some(Mask::from_image(&solid, centre, centre))
}
