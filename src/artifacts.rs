//! Debug images written next to an OCR run.

use std::path::{Path, PathBuf};

use ab_glyph::{FontVec, PxScale};
use image::{DynamicImage, Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::ArtifactsConfig;
use crate::error::Result;
use crate::image_loader::save_png;
use crate::types::Detection;

const BOX_COLOR: Rgb<u8> = Rgb([255, 0, 0]);

const SYSTEM_FONTS: [&str; 4] = [
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactPaths {
    pub real: PathBuf,
    pub preprocessed: PathBuf,
    pub annotated: PathBuf,
}

impl ArtifactPaths {
    pub fn for_stem(dir: &Path, stem: &str) -> Self {
        Self {
            real: dir.join(format!("{stem}_real.png")),
            preprocessed: dir.join(format!("{stem}_preprocessed.png")),
            annotated: dir.join(format!("{stem}_annotated.png")),
        }
    }
}

/// File stem used for artifact names; `image` when the path has none.
pub fn stem_of(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("image")
        .to_string()
}

/// Read and parse a font file; `None` when it is missing or not a font.
pub fn read_font(path: &Path) -> Option<FontVec> {
    let data = std::fs::read(path).ok()?;
    FontVec::try_from_vec(data).ok()
}

/// Label drawn next to a detection box.
pub fn label_for(detection: &Detection) -> String {
    format!("{} ({:.2})", detection.text, detection.confidence)
}

/// Draws detection boxes, plus text labels when a font is loaded.
pub struct Annotator {
    font: Option<FontVec>,
    font_scale: f32,
}

impl Annotator {
    /// Boxes only.
    pub fn boxes_only() -> Self {
        Self {
            font: None,
            font_scale: ArtifactsConfig::default().font_scale,
        }
    }

    /// Configured font first, then common system fonts.
    pub fn from_config(config: &ArtifactsConfig) -> Self {
        let configured = config.font.as_deref().and_then(|path| {
            let font = read_font(path);
            if font.is_none() {
                warn!(path = %path.display(), "unable to load label font");
            }
            font
        });
        let font = configured.or_else(|| {
            SYSTEM_FONTS.iter().find_map(|path| {
                let font = read_font(Path::new(path))?;
                debug!(path, "loaded system font for labels");
                Some(font)
            })
        });
        if font.is_none() {
            debug!("no label font found, annotated images get boxes only");
        }
        Self {
            font,
            font_scale: config.font_scale,
        }
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    /// Boxes as in [`annotate`], each labelled with its text and confidence.
    pub fn annotate(&self, image: &DynamicImage, detections: &[Detection]) -> RgbImage {
        let mut canvas = annotate(image, detections);
        if let Some(font) = &self.font {
            let scale = PxScale::from(self.font_scale);
            let (width, height) = canvas.dimensions();
            for detection in detections {
                let (x, y, _, h) = detection.region.bounding_rect();
                let x = x.max(0.0).round() as i32;
                let y = y.max(0.0).round() as i32;
                if x as u32 >= width || y as u32 >= height {
                    continue;
                }
                let label = label_for(detection);
                let (_, text_h) = text_size(scale, font, &label);
                // Above the box, or inside its top edge when there is no room.
                let ty = if y >= text_h as i32 + 2 {
                    y - text_h as i32 - 2
                } else {
                    (y + 3).min(y + h.round() as i32)
                };
                draw_text_mut(&mut canvas, BOX_COLOR, x, ty, scale, font, &label);
            }
        }
        canvas
    }
}

/// Copy of `image` with a 2px red box around every detection.
pub fn annotate(image: &DynamicImage, detections: &[Detection]) -> RgbImage {
    let mut canvas = image.to_rgb8();
    let (width, height) = canvas.dimensions();

    for detection in detections {
        let (x, y, w, h) = detection.region.bounding_rect();
        let x = x.max(0.0).round() as i32;
        let y = y.max(0.0).round() as i32;
        let w = w.round().max(1.0) as u32;
        let h = h.round().max(1.0) as u32;
        if x as u32 >= width || y as u32 >= height {
            continue;
        }

        draw_hollow_rect_mut(&mut canvas, Rect::at(x, y).of_size(w, h), BOX_COLOR);
        if w > 2 && h > 2 {
            draw_hollow_rect_mut(
                &mut canvas,
                Rect::at(x + 1, y + 1).of_size(w - 2, h - 2),
                BOX_COLOR,
            );
        }
    }
    canvas
}

pub fn write_artifacts(
    dir: &Path,
    stem: &str,
    original: &DynamicImage,
    preprocessed: &DynamicImage,
    detections: &[Detection],
    annotator: &Annotator,
) -> Result<ArtifactPaths> {
    let paths = ArtifactPaths::for_stem(dir, stem);

    save_png(original, &paths.real)?;
    save_png(preprocessed, &paths.preprocessed)?;
    let annotated = DynamicImage::ImageRgb8(annotator.annotate(original, detections));
    save_png(&annotated, &paths.annotated)?;

    info!(dir = %dir.display(), boxes = detections.len(), "wrote OCR artifacts");
    Ok(paths)
}
