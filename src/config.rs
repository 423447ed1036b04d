use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    pub render: RenderConfig,
    pub export: ExportConfig,
    pub session: SessionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RenderConfig {
    /// Edge length of the on-screen symbol in pixels.
    pub size: u32,
    /// Quiet zone around the symbol, in modules.
    pub margin: u32,
    /// Edge length of the embedded logo in pixels.
    pub logo_size: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExportConfig {
    pub padding: u32,
    pub corner_radius: u32,
    pub output_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionConfig {
    pub debounce_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            render: RenderConfig {
                size: 250,
                margin: 0,
                logo_size: 40,
            },
            export: ExportConfig {
                padding: 32,
                corner_radius: 8,
                output_dir: PathBuf::from("."),
            },
            session: SessionConfig { debounce_ms: 500 },
        }
    }
}

/// Reads `key` from the environment, keeping `default` when unset or unparsable.
fn env_or<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                log::warn!("Ignoring invalid {}={:?}", key, raw);
                default
            }
        },
        Err(_) => default,
    }
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        // Environment first, defaults otherwise
        let defaults = Config::default();
        let config = Config {
            render: RenderConfig {
                size: env_or("QR_SIZE", defaults.render.size),
                margin: env_or("QR_MARGIN", defaults.render.margin),
                logo_size: env_or("QR_LOGO_SIZE", defaults.render.logo_size),
            },
            export: ExportConfig {
                padding: env_or("QR_PADDING", defaults.export.padding),
                corner_radius: env_or("QR_CORNER_RADIUS", defaults.export.corner_radius),
                output_dir: env::var("QR_OUTPUT_DIR")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.export.output_dir),
            },
            session: SessionConfig {
                debounce_ms: env_or("QR_DEBOUNCE_MS", defaults.session.debounce_ms),
            },
        };

        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.render.size == 0 {
            anyhow::bail!("Symbol size must be positive");
        }

        if self.render.logo_size >= self.render.size {
            anyhow::bail!(
                "Logo size {} must be smaller than the symbol size {}",
                self.render.logo_size,
                self.render.size
            );
        }

        let Some(edge) = self.export_edge() else {
            anyhow::bail!(
                "Symbol size {} with padding {} is too large",
                self.render.size,
                self.export.padding
            );
        };

        // The rounded background must still fit inside the padded frame
        let too_round = self.export.corner_radius.checked_mul(2).map_or(true, |d| d > edge);
        if too_round {
            anyhow::bail!("Corner radius {} is too large", self.export.corner_radius);
        }

        if self.export.output_dir.as_os_str().is_empty() {
            anyhow::bail!("Output directory must not be empty");
        }

        Ok(())
    }

    /// Edge length of an exported file in pixels, `None` on overflow.
    pub fn export_edge(&self) -> Option<u32> {
        self.export
            .padding
            .checked_mul(2)
            .and_then(|p| p.checked_add(self.render.size))
    }
}
