use std::fs;
use std::path::Path;

use thiserror::Error;
use url::Url;

use crate::vision::ImageSource;

#[derive(Debug, Error)]
pub enum ResourceParseError {
    #[error("Invalid URL '{value}': {message}. Hint: include http(s):// and ensure the URL is well-formed.")]
    InvalidUrl { value: String, message: String },
    #[error("Local file not found: {path}. Hint: check the path relative to the current working directory or use an absolute path.")]
    FileNotFound { path: String },
    #[error("Unsupported file extension '{extension}'. Supported image extensions: {supported}.")]
    UnsupportedExtension {
        extension: String,
        supported: String,
    },
}

pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp", "gif", "bmp", "tif", "tiff"];

/// Classify a command-line input as a remote URL or a local image file.
pub fn parse_image_source(value: &str) -> Result<ImageSource, ResourceParseError> {
    if value.starts_with("http://") || value.starts_with("https://") {
        parse_url(value)
    } else {
        parse_local_image(Path::new(value)).map(|()| ImageSource::Path(value.into()))
    }
}

/// Validate that `path` names an existing file with an image extension.
pub fn parse_local_image(path: &Path) -> Result<(), ResourceParseError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    if !IMAGE_EXTENSIONS.contains(&extension.as_str()) {
        return Err(ResourceParseError::UnsupportedExtension {
            extension: if extension.is_empty() {
                "no extension".to_string()
            } else {
                extension
            },
            supported: IMAGE_EXTENSIONS.join(", "),
        });
    }

    let not_found = || ResourceParseError::FileNotFound {
        path: path.to_string_lossy().into_owned(),
    };
    let metadata = fs::metadata(path).map_err(|_| not_found())?;
    if !metadata.is_file() {
        return Err(not_found());
    }
    Ok(())
}

fn parse_url(value: &str) -> Result<ImageSource, ResourceParseError> {
    let url = Url::parse(value).map_err(|e| ResourceParseError::InvalidUrl {
        value: value.to_string(),
        message: e.to_string(),
    })?;
    if url.host_str().map_or(true, str::is_empty) {
        return Err(ResourceParseError::InvalidUrl {
            value: value.to_string(),
            message: "missing host".to_string(),
        });
    }
    Ok(ImageSource::Url(url.to_string()))
}
