// src/qr.rs
use qrcode::{EcLevel, QrCode};
use std::fmt::Write as _;

use crate::color::Color;
use crate::config::RenderConfig;
use crate::error::RenderError;
use crate::logo::Logo;

/// Everything the renderer needs for one symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct QrRequest {
    pub text: String,
    pub foreground: Color,
    pub background: Color,
    pub logo: Option<Logo>,
}

impl QrRequest {
    /// The page always asks for the highest level so a logo can cover modules.
    pub const ERROR_CORRECTION: EcLevel = EcLevel::H;
}

/// Module rectangle cleared under the logo, in module units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Excavation {
    pub x: usize,
    pub y: usize,
    pub w: usize,
    pub h: usize,
}

/// Logo placement inside the symbol, in module units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogoPlacement {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
    pub excavation: Excavation,
}

/// A symbol as it is shown in the preview.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedSymbol {
    request: QrRequest,
    /// Modules per side, quiet zone included.
    cells: usize,
    size: u32,
    modules: Vec<bool>,
    logo: Option<LogoPlacement>,
    svg: String,
}

impl RenderedSymbol {
    pub fn request(&self) -> &QrRequest {
        &self.request
    }

    pub fn cells(&self) -> usize {
        self.cells
    }

    /// Edge length in pixels, as set on the `<svg>` element.
    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn is_dark(&self, x: usize, y: usize) -> bool {
        x < self.cells && y < self.cells && self.modules[y * self.cells + x]
    }

    pub fn logo_placement(&self) -> Option<&LogoPlacement> {
        self.logo.as_ref()
    }

    pub fn svg(&self) -> &str {
        &self.svg
    }

    /// Terminal preview, two text rows per character row.
    pub fn to_terminal(&self) -> String {
        let mut out = String::new();
        // One light module of quiet zone so the preview scans on dark terminals
        let edge = self.cells as isize + 1;
        let light = |x: isize, y: isize| -> bool {
            x < 0 || y < 0 || !self.is_dark(x as usize, y as usize)
        };

        let mut y = -1;
        while y < edge {
            for x in -1..edge {
                let ch = match (light(x, y), light(x, y + 1)) {
                    (true, true) => '█',
                    (true, false) => '▀',
                    (false, true) => '▄',
                    (false, false) => ' ',
                };
                out.push(ch);
            }
            out.push('\n');
            y += 2;
        }
        out
    }
}

#[derive(Debug, Clone)]
pub struct QrService {
    config: RenderConfig,
}

impl QrService {
    pub fn new(config: RenderConfig) -> Self {
        Self { config }
    }

    /// Encode the request and draw it as SVG.
    pub fn render(&self, request: &QrRequest) -> Result<RenderedSymbol, RenderError> {
        if request.text.is_empty() {
            return Err(RenderError::EmptyText);
        }

        let code = QrCode::with_error_correction_level(request.text.as_bytes(), QrRequest::ERROR_CORRECTION)?;

        let margin = self.config.margin as usize;
        let width = code.width();
        let cells = width + margin * 2;

        let mut modules = vec![false; cells * cells];
        for y in 0..width {
            for x in 0..width {
                if code[(x, y)] == qrcode::Color::Dark {
                    modules[(y + margin) * cells + x + margin] = true;
                }
            }
        }

        let logo = request.logo.as_ref().map(|_| self.place_logo(cells));
        if let Some(placement) = &logo {
            excavate(&mut modules, cells, &placement.excavation);
        }

        let svg = self.draw_svg(request, cells, &modules, logo.as_ref());

        log::debug!(
            "Rendered {} chars as {}x{} modules (version {:?})",
            request.text.chars().count(),
            width,
            width,
            code.version()
        );

        Ok(RenderedSymbol {
            request: request.clone(),
            cells,
            size: self.config.size,
            modules,
            logo,
            svg,
        })
    }

    fn place_logo(&self, cells: usize) -> LogoPlacement {
        let cells_f = cells as f64;
        let scale = cells_f / self.config.size as f64;
        let w = self.config.logo_size as f64 * scale;
        let h = w;
        let x = cells_f / 2.0 - w / 2.0;
        let y = cells_f / 2.0 - h / 2.0;

        let floor_x = x.floor();
        let floor_y = y.floor();
        let excavation = Excavation {
            x: floor_x as usize,
            y: floor_y as usize,
            w: (w + x - floor_x).ceil() as usize,
            h: (h + y - floor_y).ceil() as usize,
        };

        LogoPlacement { x, y, w, h, excavation }
    }

    fn draw_svg(&self, request: &QrRequest, cells: usize, modules: &[bool], logo: Option<&LogoPlacement>) -> String {
        let size = self.config.size;
        let mut svg = String::new();

        // Writing into a String cannot fail
        let _ = write!(
            svg,
            r#"<svg xmlns="http://www.w3.org/2000/svg" height="{size}" width="{size}" viewBox="0 0 {cells} {cells}" shape-rendering="crispEdges">"#
        );
        let _ = write!(
            svg,
            r#"<path fill="{}" d="M0,0 h{cells}v{cells}H0z"/>"#,
            request.background
        );
        let _ = write!(svg, r#"<path fill="{}" d="{}"/>"#, request.foreground, module_path(modules, cells));

        if let (Some(placement), Some(logo)) = (logo, request.logo.as_ref()) {
            let _ = write!(
                svg,
                r#"<image href="{}" height="{}" width="{}" x="{}" y="{}" preserveAspectRatio="none"/>"#,
                logo.data_url(),
                placement.h,
                placement.w,
                placement.x,
                placement.y
            );
        }

        svg.push_str("</svg>");
        svg
    }
}

/// One sub-path per horizontal run of dark modules.
fn module_path(modules: &[bool], cells: usize) -> String {
    let mut d = String::new();
    for (y, row) in modules.chunks(cells).enumerate() {
        let mut start: Option<usize> = None;
        for x in 0..=cells {
            let dark = x < cells && row[x];
            match (dark, start) {
                (true, None) => start = Some(x),
                (false, Some(s)) => {
                    let _ = write!(d, "M{} {}h{}v1H{}z", s, y, x - s, s);
                    start = None;
                }
                _ => {}
            }
        }
    }
    d
}

fn excavate(modules: &mut [bool], cells: usize, area: &Excavation) {
    for y in area.y..(area.y + area.h).min(cells) {
        for x in area.x..(area.x + area.w).min(cells) {
            modules[y * cells + x] = false;
        }
    }
}
