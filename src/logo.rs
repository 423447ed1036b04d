use base64::{engine::general_purpose, Engine as _};
use image::ImageFormat;
use resvg::usvg;
use std::fs;
use std::path::Path;

use crate::error::LogoError;

/// An image picked by the user, ready to be embedded in the symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Logo {
    name: String,
    mime_type: &'static str,
    data_url: String,
}

impl Logo {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mime_type(&self) -> &'static str {
        self.mime_type
    }

    /// `data:<mime>;base64,...`, usable as an `href` of an SVG `<image>`.
    pub fn data_url(&self) -> &str {
        &self.data_url
    }
}

#[derive(Debug, Clone, Default)]
pub struct LogoService;

impl LogoService {
    pub fn new() -> Self {
        Self
    }

    /// Read an image file from disk.
    pub fn load(&self, path: &Path) -> Result<Logo, LogoError> {
        let bytes = fs::read(path).map_err(|source| LogoError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        self.from_bytes(&name, &bytes)
    }

    /// Sniff the content and turn it into a data URL. Only formats an SVG
    /// renderer can embed are accepted.
    pub fn from_bytes(&self, name: &str, bytes: &[u8]) -> Result<Logo, LogoError> {
        let mime_type = sniff_mime(bytes).ok_or_else(|| LogoError::NotAnImage(name.to_string()))?;

        let encoded = general_purpose::STANDARD.encode(bytes);
        log::info!("Loaded logo {} ({}, {} bytes)", name, mime_type, bytes.len());

        Ok(Logo {
            name: name.to_string(),
            mime_type,
            data_url: format!("data:{};base64,{}", mime_type, encoded),
        })
    }
}

fn sniff_mime(bytes: &[u8]) -> Option<&'static str> {
    match image::guess_format(bytes) {
        Ok(ImageFormat::Png) => return Some("image/png"),
        Ok(ImageFormat::Jpeg) => return Some("image/jpeg"),
        Ok(ImageFormat::Gif) => return Some("image/gif"),
        Ok(ImageFormat::WebP) => return Some("image/webp"),
        Ok(_) => return None,
        Err(_) => {}
    }

    // Raster sniffing knows nothing about SVG; let the renderer decide
    match usvg::Tree::from_data(bytes, &usvg::Options::default()) {
        Ok(_) => Some("image/svg+xml"),
        Err(e) => {
            log::debug!("Not an SVG either: {}", e);
            None
        }
    }
}
