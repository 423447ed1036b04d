use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ColorError {
    #[error("color must start with '#': {0:?}")]
    MissingHash(String),
    #[error("color must be #rgb or #rrggbb: {0:?}")]
    BadLength(String),
    #[error("invalid hex digit in color {0:?}")]
    BadDigit(String),
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("nothing to encode: text is empty")]
    EmptyText,
    #[error("failed to encode QR symbol: {0}")]
    Encode(#[from] qrcode::types::QrError),
}

#[derive(Debug, Error)]
pub enum LogoError {
    #[error("failed to read logo {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{0} is not an image file")]
    NotAnImage(String),
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to parse export SVG: {0}")]
    Parse(#[from] resvg::usvg::Error),
    #[error("cannot allocate a {width}x{height} bitmap surface")]
    Surface { width: u32, height: u32 },
    #[error("failed to encode PNG: {0}")]
    Encode(#[from] image::ImageError),
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Everything the studio can refuse. None of these are fatal for a session.
#[derive(Debug, Error)]
pub enum StudioError {
    #[error(transparent)]
    Color(#[from] ColorError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Logo(#[from] LogoError),
    #[error(transparent)]
    Export(#[from] ExportError),
}
