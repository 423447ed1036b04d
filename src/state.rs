use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::color::Color;
use crate::logo::Logo;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Svg,
    Png,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Svg => "svg",
            ExportFormat::Png => "png",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            ExportFormat::Svg => "image/svg+xml;charset=utf-8",
            ExportFormat::Png => "image/png",
        }
    }

    /// Download name used for every export of this format.
    pub fn file_name(self) -> String {
        format!("qr-code.{}", self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "svg" => Ok(ExportFormat::Svg),
            "png" => Ok(ExportFormat::Png),
            other => Err(format!("unknown export format {:?} (expected svg or png)", other)),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Raw values of the controls, exactly as last entered.
///
/// Nothing here is debounced; the studio forwards text and color changes to
/// its debouncers and reads the logo and format straight from this holder.
#[derive(Debug, Clone, PartialEq)]
pub struct InputState {
    text: String,
    foreground: Color,
    background: Color,
    logo: Option<Logo>,
    format: ExportFormat,
}

impl Default for InputState {
    fn default() -> Self {
        Self {
            text: String::new(),
            foreground: Color::BLACK,
            background: Color::WHITE,
            logo: None,
            format: ExportFormat::Svg,
        }
    }
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn foreground(&self) -> Color {
        self.foreground
    }

    pub fn background(&self) -> Color {
        self.background
    }

    pub fn logo(&self) -> Option<&Logo> {
        self.logo.as_ref()
    }

    pub fn format(&self) -> ExportFormat {
        self.format
    }

    /// Returns `true` when the value actually changed.
    pub fn set_text(&mut self, text: impl Into<String>) -> bool {
        let text = text.into();
        if self.text == text {
            return false;
        }
        self.text = text;
        true
    }

    pub fn set_foreground(&mut self, color: Color) -> bool {
        std::mem::replace(&mut self.foreground, color) != color
    }

    pub fn set_background(&mut self, color: Color) -> bool {
        std::mem::replace(&mut self.background, color) != color
    }

    pub fn set_logo(&mut self, logo: Logo) -> &Logo {
        self.logo.insert(logo)
    }

    pub fn clear_logo(&mut self) {
        self.logo = None;
    }

    pub fn set_format(&mut self, format: ExportFormat) {
        self.format = format;
    }

    pub fn snapshot(&self) -> InputSnapshot {
        InputSnapshot {
            text: self.text.clone(),
            foreground: self.foreground,
            background: self.background,
            logo: self.logo.as_ref().map(|logo| logo.name().to_string()),
            format: self.format,
        }
    }
}

/// Serializable view of the inputs, used by the `state` command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputSnapshot {
    pub text: String,
    pub foreground: Color,
    pub background: Color,
    pub logo: Option<String>,
    pub format: ExportFormat,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_with_page_defaults() {
        let state = InputState::new();
        assert_eq!(state.text(), "");
        assert_eq!(state.foreground(), Color::BLACK);
        assert_eq!(state.background(), Color::WHITE);
        assert!(state.logo().is_none());
        assert_eq!(state.format(), ExportFormat::Svg);
    }

    #[test]
    fn setters_report_changes() {
        let mut state = InputState::new();
        assert!(state.set_text("hello"));
        assert!(!state.set_text("hello"));
        assert!(state.set_foreground(Color::rgb(1, 2, 3)));
        assert!(!state.set_foreground(Color::rgb(1, 2, 3)));
        assert!(!state.set_background(Color::WHITE));
    }

    #[test]
    fn format_names_and_parsing() {
        assert_eq!(ExportFormat::Svg.file_name(), "qr-code.svg");
        assert_eq!(ExportFormat::Png.file_name(), "qr-code.png");
        assert_eq!("PNG".parse::<ExportFormat>(), Ok(ExportFormat::Png));
        assert!("jpeg".parse::<ExportFormat>().is_err());
    }

    #[test]
    fn snapshot_serializes_to_json() {
        let mut state = InputState::new();
        state.set_text("https://example.com");
        state.set_format(ExportFormat::Png);
        let json = serde_json::to_value(state.snapshot()).unwrap();
        assert_eq!(json["text"], "https://example.com");
        assert_eq!(json["foreground"], "#000000");
        assert_eq!(json["background"], "#ffffff");
        assert_eq!(json["format"], "png");
        assert!(json["logo"].is_null());
    }
}
