use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::generation::{GenerationConfig, GenerationOverrides};
use crate::prompts::{PromptTemplate, StageName};
use crate::preprocess::MAX_KERNEL;

pub const DEFAULT_MODEL_ENDPOINT: &str = "http://127.0.0.1:8080/v1";
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(300);
pub const DEFAULT_COMPRESSION_RATIO: f32 = 0.1;

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("unable to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid TOML in {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// All settings consumed by the core, loaded once at startup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub ocr: OcrConfig,
    pub preprocess: PreprocessConfig,
    pub model: ModelConfig,
    pub generation: GenerationConfig,
    pub stages: StagesConfig,
    pub compression: CompressionConfig,
    pub network: NetworkConfig,
    pub vision: VisionConfig,
    pub artifacts: ArtifactsConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Tesseract language code.
    pub language: String,
    /// Directory holding `tessdata`; Tesseract's default lookup when unset.
    pub datapath: Option<PathBuf>,
    /// Detections below this confidence are dropped by the adapter.
    pub min_confidence: f32,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            language: "eng".to_string(),
            datapath: None,
            min_confidence: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    pub enabled: bool,
    /// Side of the square dilation window, in pixels.
    pub dilate_kernel: u32,
    /// Side of the square erosion window, in pixels.
    pub erode_kernel: u32,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dilate_kernel: 2,
            erode_kernel: 4,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Base URL of an OpenAI-compatible API (without the `/completions` suffix).
    pub endpoint: String,
    pub text_model: String,
    pub vision_model: String,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    pub max_concurrent_invocations: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_MODEL_ENDPOINT.to_string(),
            text_model: "llava-v1.6-mistral-7b".to_string(),
            vision_model: "llava-v1.5-7b".to_string(),
            api_key: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            max_concurrent_invocations: 1,
        }
    }
}

impl ModelConfig {
    /// Config value first, then `FLOWDESC_API_KEY`, then `OPENAI_API_KEY`.
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var("FLOWDESC_API_KEY").ok())
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .filter(|k| !k.trim().is_empty())
    }
}

/// Template and sampling overrides for one prompt stage.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StageConfig {
    pub template: Option<String>,
    #[serde(flatten)]
    pub overrides: GenerationOverrides,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StagesConfig {
    pub clean: StageConfig,
    pub understand: StageConfig,
    pub describe: StageConfig,
    pub fast: StageConfig,
}

impl StagesConfig {
    pub fn get(&self, name: StageName) -> &StageConfig {
        match name {
            StageName::Clean => &self.clean,
            StageName::Understand => &self.understand,
            StageName::Describe => &self.describe,
            StageName::Fast => &self.fast,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressionConfig {
    /// Share of prompt tokens kept, in `(0, 1]`.
    pub ratio: f32,
    /// Tokens containing any of these are never pruned.
    pub force_tokens: Vec<String>,
    /// Lower bound on kept tokens regardless of ratio.
    pub min_tokens: usize,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            ratio: DEFAULT_COMPRESSION_RATIO,
            force_tokens: vec![
                "<|im_start|>".to_string(),
                "<|im_end|>".to_string(),
            ],
            min_tokens: 8,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    #[serde(with = "humantime_serde")]
    pub probe_timeout: Duration,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VisionConfig {
    pub system_prompt: String,
    pub instruction: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            system_prompt: "You are an assistant who perfectly describes images.".to_string(),
            instruction: "Describe what this flowgraph is about step by step:".to_string(),
            temperature: crate::generation::DEFAULT_TEMPERATURE,
            max_tokens: None,
        }
    }
}

/// Debug image options. Labels are skipped when no font can be loaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactsConfig {
    /// TrueType/OpenType font for box labels; common system fonts are tried otherwise.
    pub font: Option<PathBuf>,
    pub font_scale: f32,
}

impl Default for ArtifactsConfig {
    fn default() -> Self {
        Self {
            font: None,
            font_scale: 16.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl Config {
    /// Load config: explicit path > `~/.config/flowdesc/config.toml` > defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigLoadError> {
        let candidate = match path {
            Some(p) => Some(p.to_path_buf()),
            None => Self::central_config_path().filter(|p| p.exists()),
        };

        match candidate {
            Some(path) => Self::from_file(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigLoadError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&raw).map_err(|source| ConfigLoadError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn central_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("flowdesc").join("config.toml"))
    }

    pub fn validate(&self) -> Result<(), String> {
        self.generation
            .validate()
            .map_err(|e| format!("[generation] {e}"))?;

        for name in StageName::ALL {
            let stage = self.stages.get(name);
            self.generation
                .merged(&stage.overrides)
                .validate()
                .map_err(|e| format!("[stages.{name}] {e}"))?;
            if let Some(template) = &stage.template {
                PromptTemplate::parse(template)
                    .map_err(|e| format!("stage '{name}' template {e}"))?;
            }
        }

        if !(self.compression.ratio > 0.0 && self.compression.ratio <= 1.0) {
            return Err(format!(
                "compression ratio must be in (0, 1], got {}",
                self.compression.ratio
            ));
        }
        if !(0.0..=1.0).contains(&self.ocr.min_confidence) {
            return Err(format!(
                "[ocr] min_confidence must be within [0, 1], got {}",
                self.ocr.min_confidence
            ));
        }
        if self.preprocess.dilate_kernel == 0 || self.preprocess.erode_kernel == 0 {
            return Err("[preprocess] kernel sizes must be at least 1".to_string());
        }
        if self.preprocess.dilate_kernel > MAX_KERNEL || self.preprocess.erode_kernel > MAX_KERNEL {
            return Err(format!("[preprocess] kernel sizes must be at most {MAX_KERNEL}"));
        }
        if self.model.endpoint.trim().is_empty() {
            return Err("[model] endpoint must not be empty".to_string());
        }
        if self.model.request_timeout.is_zero() {
            return Err("[model] request_timeout must be greater than 0".to_string());
        }
        if self.model.max_concurrent_invocations == 0 {
            return Err("[model] max_concurrent_invocations must be at least 1".to_string());
        }
        if self.network.probe_timeout.is_zero() {
            return Err("[network] probe_timeout must be greater than 0".to_string());
        }
        if !(0.0..=2.0).contains(&self.vision.temperature) {
            return Err(format!(
                "[vision] temperature must be within [0, 2], got {}",
                self.vision.temperature
            ));
        }
        if !(self.artifacts.font_scale > 0.0) {
            return Err(format!(
                "[artifacts] font_scale must be greater than 0, got {}",
                self.artifacts.font_scale
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values_match_expected() {
        let cfg = Config::default();

        assert_eq!(cfg.ocr.language, "eng");
        assert_eq!(cfg.generation.max_tokens, 10_000);
        assert!((cfg.generation.temperature - 0.98).abs() < f32::EPSILON);
        assert!(!cfg.generation.echo);
        assert!((cfg.compression.ratio - 0.1).abs() < f32::EPSILON);
        assert_eq!(cfg.network.probe_timeout, Duration::from_secs(10));
        assert_eq!(cfg.model.max_concurrent_invocations, 1);
        assert!(cfg.preprocess.enabled);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn parses_partial_toml_with_durations_and_stage_overrides() {
        let raw = r#"
            [network]
            probe_timeout = "3s"

            [compression]
            ratio = 0.5

            [stages.understand]
            temperature = 0.2
            stop = ["<END>"]
        "#;
        let cfg: Config = toml::from_str(raw).expect("parse config");

        assert_eq!(cfg.network.probe_timeout, Duration::from_secs(3));
        assert!((cfg.compression.ratio - 0.5).abs() < f32::EPSILON);
        assert_eq!(cfg.stages.understand.overrides.temperature, Some(0.2));
        assert_eq!(
            cfg.stages.understand.overrides.stop,
            Some(vec!["<END>".to_string()])
        );
        assert!(cfg.stages.clean.template.is_none());
        assert_eq!(cfg.model.endpoint, DEFAULT_MODEL_ENDPOINT);
    }

    #[test]
    fn validate_rejects_out_of_range_compression_ratio() {
        for ratio in [0.0, -0.5, 1.5] {
            let mut cfg = Config::default();
            cfg.compression.ratio = ratio;
            let err = cfg.validate().unwrap_err();
            assert!(err.contains("compression ratio"), "got: {err}");
        }
    }

    #[test]
    fn validate_rejects_template_without_placeholder() {
        let mut cfg = Config::default();
        cfg.stages.clean.template = Some("Clean this please".to_string());
        let err = cfg.validate().unwrap_err();
        assert!(err.contains("placeholder"), "got: {err}");
    }

    #[test]
    fn validate_rejects_bad_stage_override() {
        let mut cfg = Config::default();
        cfg.stages.describe.overrides.max_tokens = Some(0);
        let err = cfg.validate().unwrap_err();
        assert!(err.contains("stages.describe"), "got: {err}");
    }

    #[test]
    fn validate_rejects_kernel_outside_range() {
        for size in [0, MAX_KERNEL + 1] {
            let mut cfg = Config::default();
            cfg.preprocess.erode_kernel = size;
            let err = cfg.validate().unwrap_err();
            assert!(err.contains("kernel sizes"), "got: {err}");
        }
    }

    #[test]
    fn validate_rejects_non_positive_font_scale() {
        let mut cfg = Config::default();
        cfg.artifacts.font_scale = 0.0;
        let err = cfg.validate().unwrap_err();
        assert!(err.contains("font_scale"), "got: {err}");
    }

    #[test]
    fn load_reads_explicit_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("flowdesc.toml");
        std::fs::write(&path, "[model]\nendpoint = \"http://localhost:9999/v1\"\n").unwrap();

        let cfg = Config::load(Some(&path)).expect("load");
        assert_eq!(cfg.model.endpoint, "http://localhost:9999/v1");
    }

    #[test]
    fn load_reports_missing_explicit_file() {
        let err = Config::load(Some(Path::new("/nonexistent/flowdesc.toml"))).unwrap_err();
        assert!(matches!(err, ConfigLoadError::Io { .. }));
    }
}
