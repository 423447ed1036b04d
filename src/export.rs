use base64::{engine::general_purpose, Engine as _};
use image::codecs::png::PngEncoder;
use image::ImageEncoder;
use resvg::{tiny_skia, usvg};
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::ExportConfig;
use crate::error::ExportError;
use crate::qr::RenderedSymbol;
use crate::state::ExportFormat;

/// A finished download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportArtifact {
    pub format: ExportFormat,
    pub file_name: String,
    pub mime_type: &'static str,
    pub width: u32,
    pub height: u32,
    pub bytes: Vec<u8>,
}

impl ExportArtifact {
    /// Write the file into `dir` under its download name.
    pub fn save_to(&self, dir: &Path) -> Result<PathBuf, ExportError> {
        let path = dir.join(&self.file_name);
        let write_err = |source| ExportError::Write {
            path: path.clone(),
            source,
        };

        if !dir.exists() {
            fs::create_dir_all(dir).map_err(write_err)?;
        }
        fs::write(&path, &self.bytes).map_err(write_err)?;

        log::info!("Saved {} ({} bytes) to {}", self.file_name, self.bytes.len(), path.display());
        Ok(path)
    }

    pub fn to_data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.mime_type,
            general_purpose::STANDARD.encode(&self.bytes)
        )
    }
}

#[derive(Debug, Clone)]
pub struct ExportService {
    config: ExportConfig,
}

impl ExportService {
    pub fn new(config: ExportConfig) -> Self {
        Self { config }
    }

    pub fn export(&self, symbol: &RenderedSymbol, format: ExportFormat) -> Result<ExportArtifact, ExportError> {
        let (frame, edge) = self.frame(symbol);

        let bytes = match format {
            ExportFormat::Svg => frame.into_bytes(),
            ExportFormat::Png => rasterize(&frame, edge)?,
        };

        log::info!("Exported {} as {}x{} {}", symbol.request().text, edge, edge, format);

        Ok(ExportArtifact {
            format,
            file_name: format.file_name(),
            mime_type: format.mime_type(),
            width: edge,
            height: edge,
            bytes,
        })
    }

    /// Wrap a copy of the symbol markup in a padded, rounded background.
    pub fn frame(&self, symbol: &RenderedSymbol) -> (String, u32) {
        let padding = self.config.padding;
        let total = symbol.size() + padding * 2;
        let background = symbol.request().background;

        let svg = format!(
            concat!(
                r#"<svg xmlns="http://www.w3.org/2000/svg" width="{total}" height="{total}" viewBox="0 0 {total} {total}">"#,
                r#"<rect width="{total}" height="{total}" fill="{background}" rx="{radius}"/>"#,
                r#"<g transform="translate({padding},{padding})">{symbol}</g>"#,
                "</svg>"
            ),
            total = total,
            background = background,
            radius = self.config.corner_radius,
            padding = padding,
            symbol = symbol.svg(),
        );

        (svg, total)
    }
}

/// SVG -> offscreen pixmap -> PNG bytes.
fn rasterize(svg: &str, edge: u32) -> Result<Vec<u8>, ExportError> {
    let options = usvg::Options::default();
    let tree = usvg::Tree::from_data(svg.as_bytes(), &options)?;

    let mut pixmap = tiny_skia::Pixmap::new(edge, edge).ok_or(ExportError::Surface {
        width: edge,
        height: edge,
    })?;

    let tree_size = tree.size();
    let transform = tiny_skia::Transform::from_scale(
        edge as f32 / tree_size.width(),
        edge as f32 / tree_size.height(),
    );
    resvg::render(&tree, transform, &mut pixmap.as_mut());

    // tiny_skia keeps premultiplied RGBA; PNG wants straight alpha
    let mut data = pixmap.take();
    for px in data.chunks_exact_mut(4) {
        let a = px[3];
        if a > 0 && a < 255 {
            for c in &mut px[..3] {
                *c = ((*c as u32 * 255 + a as u32 / 2) / a as u32).min(255) as u8;
            }
        }
    }

    let mut png = Vec::new();
    PngEncoder::new(&mut png).write_image(&data, edge, edge, image::ColorType::Rgba8)?;
    Ok(png)
}
