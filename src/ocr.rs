//! OCR adapter: turns a raster image into ordered text detections.
//!
//! Engines implement [`OcrEngine`]. The bundled [`TesseractEngine`] uses
//! Tesseract through the `leptess` crate and needs the `ocr` feature:
//!
//! ```toml
//! [dependencies]
//! flowdesc = { version = "0.1", features = ["ocr"] }
//! ```
//!
//! Tesseract must be installed and `tessdata` reachable (typically
//! `/usr/share/tesseract-ocr/tessdata`, or set `TESSDATA_PREFIX`).
//!
//! The engine's "found nothing" answer is kept distinct from an empty list:
//! see [`Detections`].

use std::sync::{Arc, Mutex};

use image::DynamicImage;
use thiserror::Error;
use tracing::debug;

use crate::config::{OcrConfig, PreprocessConfig};
use crate::preprocess::preprocess;
use crate::types::Detections;

#[derive(Debug, Error)]
pub enum OcrError {
    #[error("Failed to initialize OCR engine: {0}")]
    InitError(String),
    #[error("Failed to load image for OCR: {0}")]
    ImageLoadError(String),
    #[error("OCR processing failed: {0}")]
    ProcessingError(String),
    #[error("Tesseract not available - install Tesseract OCR and enable the 'ocr' feature")]
    NotAvailable,
}

/// A text detection/recognition engine.
///
/// Engines are stateful and not assumed to be reentrant; the adapter
/// serializes access.
pub trait OcrEngine {
    fn name(&self) -> &str;

    fn detect(&mut self, image: &DynamicImage) -> Result<Detections, OcrError>;
}

/// One adapter run: the image the engine saw plus what it found.
#[derive(Debug, Clone)]
pub struct OcrRun {
    pub preprocessed: DynamicImage,
    pub detections: Detections,
}

/// Process-scoped OCR handle shared across requests.
#[derive(Clone)]
pub struct OcrAdapter {
    engine: Arc<Mutex<Box<dyn OcrEngine + Send>>>,
    preprocess: PreprocessConfig,
    min_confidence: f32,
}

impl std::fmt::Debug for OcrAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OcrAdapter")
            .field("preprocess", &self.preprocess)
            .field("min_confidence", &self.min_confidence)
            .finish_non_exhaustive()
    }
}

impl OcrAdapter {
    pub fn new(
        engine: Box<dyn OcrEngine + Send>,
        preprocess: PreprocessConfig,
        min_confidence: f32,
    ) -> Self {
        Self {
            engine: Arc::new(Mutex::new(engine)),
            preprocess,
            min_confidence,
        }
    }

    /// Build the Tesseract-backed adapter. Initialization failures surface here,
    /// never per call.
    pub fn tesseract(ocr: &OcrConfig, preprocess: PreprocessConfig) -> Result<Self, OcrError> {
        let engine = TesseractEngine::new(ocr)?;
        Ok(Self::new(Box::new(engine), preprocess, ocr.min_confidence))
    }

    /// Apply the configured preprocessing filter (or pass through when disabled).
    pub fn prepare(&self, image: &DynamicImage) -> DynamicImage {
        if self.preprocess.enabled {
            preprocess(image, &self.preprocess)
        } else {
            image.clone()
        }
    }

    /// Run the engine on an already-prepared image, on the calling thread.
    pub fn detect_prepared(&self, prepared: &DynamicImage) -> Result<Detections, OcrError> {
        let mut engine = self
            .engine
            .lock()
            .map_err(|_| OcrError::ProcessingError("OCR engine lock poisoned".to_string()))?;
        let detections = engine.detect(prepared)?;
        debug!(
            engine = engine.name(),
            absent = detections.is_absent(),
            count = detections.len(),
            "OCR engine finished"
        );
        Ok(self.filter(detections))
    }

    /// Preprocess and detect on the blocking thread pool.
    pub async fn run(&self, image: DynamicImage) -> Result<OcrRun, OcrError> {
        let adapter = self.clone();
        tokio::task::spawn_blocking(move || {
            let preprocessed = adapter.prepare(&image);
            let detections = adapter.detect_prepared(&preprocessed)?;
            Ok(OcrRun {
                preprocessed,
                detections,
            })
        })
        .await
        .map_err(|e| OcrError::ProcessingError(format!("OCR task failed: {e}")))?
    }

    fn filter(&self, detections: Detections) -> Detections {
        match detections {
            Detections::Found(mut found) if self.min_confidence > 0.0 => {
                found.retain(|d| d.confidence >= self.min_confidence);
                Detections::Found(found)
            }
            other => other,
        }
    }
}

/// Tesseract engine via `leptess`.
#[cfg(feature = "ocr")]
pub struct TesseractEngine {
    inner: leptess::LepTess,
}

#[cfg(feature = "ocr")]
impl TesseractEngine {
    pub fn new(config: &OcrConfig) -> Result<Self, OcrError> {
        let datapath = config
            .datapath
            .as_ref()
            .map(|p| p.to_string_lossy().into_owned());
        let inner = leptess::LepTess::new(datapath.as_deref(), &config.language)
            .map_err(|e| OcrError::InitError(format!("{:?}", e)))?;
        Ok(Self { inner })
    }
}

#[cfg(feature = "ocr")]
impl OcrEngine for TesseractEngine {
    fn name(&self) -> &str {
        "tesseract"
    }

    fn detect(&mut self, image: &DynamicImage) -> Result<Detections, OcrError> {
        use crate::types::{Detection, Region};

        let png = crate::image_loader::encode_png(image)
            .map_err(|e| OcrError::ImageLoadError(e.to_string()))?;
        self.inner
            .set_image_from_mem(&png)
            .map_err(|e| OcrError::ImageLoadError(format!("{:?}", e)))?;

        let Some(boxes) = self
            .inner
            .get_component_boxes(leptess::capi::TessPageIteratorLevel_RIL_WORD, true)
        else {
            return Ok(Detections::Absent);
        };

        let mut detections = Vec::new();
        for b in &boxes {
            let rect = b.get_val();
            self.inner.set_rectangle(&b);

            let text = self
                .inner
                .get_utf8_text()
                .map_err(|e| OcrError::ProcessingError(e.to_string()))?;
            let trimmed = text.trim();
            if trimmed.is_empty() {
                continue;
            }

            let confidence = self.inner.mean_text_conf() as f32 / 100.0;
            detections.push(Detection::new(
                Region::from_rect(rect.x as f32, rect.y as f32, rect.w as f32, rect.h as f32),
                trimmed,
                confidence,
            ));
        }

        Ok(Detections::Found(detections))
    }
}

/// Placeholder when the crate is built without the `ocr` feature.
#[cfg(not(feature = "ocr"))]
pub struct TesseractEngine {
    _private: (),
}

#[cfg(not(feature = "ocr"))]
impl TesseractEngine {
    pub fn new(_config: &OcrConfig) -> Result<Self, OcrError> {
        Err(OcrError::NotAvailable)
    }
}

#[cfg(not(feature = "ocr"))]
impl OcrEngine for TesseractEngine {
    fn name(&self) -> &str {
        "tesseract (unavailable)"
    }

    fn detect(&mut self, _image: &DynamicImage) -> Result<Detections, OcrError> {
        Err(OcrError::NotAvailable)
    }
}

/// Whether this build can construct a real OCR engine.
#[inline]
pub const fn is_available() -> bool {
    cfg!(feature = "ocr")
}
