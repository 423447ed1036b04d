use std::path::{Path, PathBuf};
use tokio::sync::watch;
use tokio::time::Duration;

use crate::color::Color;
use crate::config::Config;
use crate::debounce::Debouncer;
use crate::error::StudioError;
use crate::export::{ExportArtifact, ExportService};
use crate::logo::{Logo, LogoService};
use crate::qr::{QrRequest, QrService, RenderedSymbol};
use crate::state::{ExportFormat, InputSnapshot, InputState};

/// The page controller: raw inputs in, debounced preview and exports out.
pub struct StudioService {
    inputs: InputState,
    text: Debouncer<String>,
    foreground: Debouncer<Color>,
    background: Debouncer<Color>,
    settled: SettledWatch,
    qr_service: QrService,
    logo_service: LogoService,
    export_service: ExportService,
    output_dir: PathBuf,
    symbol: Option<RenderedSymbol>,
}

struct SettledWatch {
    text: watch::Receiver<String>,
    foreground: watch::Receiver<Color>,
    background: watch::Receiver<Color>,
}

impl StudioService {
    /// Must be called inside a tokio runtime.
    pub fn new(config: Config) -> Self {
        let inputs = InputState::new();
        let delay = Duration::from_millis(config.session.debounce_ms);

        let text = Debouncer::new(inputs.text().to_string(), delay);
        let foreground = Debouncer::new(inputs.foreground(), delay);
        let background = Debouncer::new(inputs.background(), delay);
        let settled = SettledWatch {
            text: text.subscribe(),
            foreground: foreground.subscribe(),
            background: background.subscribe(),
        };

        Self {
            inputs,
            text,
            foreground,
            background,
            settled,
            qr_service: QrService::new(config.render),
            logo_service: LogoService::new(),
            export_service: ExportService::new(config.export.clone()),
            output_dir: config.export.output_dir,
            symbol: None,
        }
    }

    pub fn inputs(&self) -> &InputState {
        &self.inputs
    }

    pub fn snapshot(&self) -> InputSnapshot {
        self.inputs.snapshot()
    }

    pub fn set_text(&mut self, text: &str) {
        if self.inputs.set_text(text) {
            self.text.set(text.to_string());
        }
    }

    pub fn set_foreground(&mut self, hex: &str) -> Result<Color, StudioError> {
        let color: Color = hex.parse()?;
        if self.inputs.set_foreground(color) {
            self.foreground.set(color);
        }
        Ok(color)
    }

    pub fn set_background(&mut self, hex: &str) -> Result<Color, StudioError> {
        let color: Color = hex.parse()?;
        if self.inputs.set_background(color) {
            self.background.set(color);
        }
        Ok(color)
    }

    /// Load a logo from disk. On failure the current logo is kept.
    pub fn load_logo(&mut self, path: &Path) -> Result<&Logo, StudioError> {
        let logo = self.logo_service.load(path)?;
        Ok(self.inputs.set_logo(logo))
    }

    pub fn clear_logo(&mut self) {
        self.inputs.clear_logo();
    }

    pub fn set_format(&mut self, format: ExportFormat) {
        self.inputs.set_format(format);
    }

    /// Settle every debounced value now.
    pub fn flush(&mut self) {
        self.text.flush();
        self.foreground.flush();
        self.background.flush();
    }

    pub fn is_settled(&self) -> bool {
        self.text.is_settled() && self.foreground.is_settled() && self.background.is_settled()
    }

    /// Resolves once any debounced value has settled on something new.
    ///
    /// Cancel safe. Pends forever once the debouncers are gone.
    pub async fn changed(&mut self) {
        let settled = &mut self.settled;
        let result = tokio::select! {
            r = settled.text.changed() => r,
            r = settled.foreground.changed() => r,
            r = settled.background.changed() => r,
        };
        if result.is_err() {
            std::future::pending::<()>().await;
        }
        settled.text.borrow_and_update();
        settled.foreground.borrow_and_update();
        settled.background.borrow_and_update();
    }

    /// Request built from the settled values, or `None` while the text is empty.
    pub fn request(&self) -> Option<QrRequest> {
        let text = self.text.settled();
        if text.is_empty() {
            return None;
        }
        Some(QrRequest {
            text,
            foreground: self.foreground.settled(),
            background: self.background.settled(),
            logo: self.inputs.logo().cloned(),
        })
    }

    /// Current preview. Re-renders only when the settled request changed.
    pub fn preview(&mut self) -> Result<Option<&RenderedSymbol>, StudioError> {
        self.refresh()?;
        Ok(self.symbol.as_ref())
    }

    fn refresh(&mut self) -> Result<(), StudioError> {
        let Some(request) = self.request() else {
            self.symbol = None;
            return Ok(());
        };

        let stale = self.symbol.as_ref().map_or(true, |s| *s.request() != request);
        if stale {
            self.symbol = Some(self.qr_service.render(&request)?);
        }
        Ok(())
    }

    /// Export the current preview. `Ok(None)` when there is nothing to export.
    pub fn export(&mut self, format: ExportFormat) -> Result<Option<ExportArtifact>, StudioError> {
        self.refresh()?;
        match &self.symbol {
            Some(symbol) => Ok(Some(self.export_service.export(symbol, format)?)),
            None => {
                log::warn!("Nothing to export yet: enter some text first");
                Ok(None)
            }
        }
    }

    /// Export in the selected format and save it as a download.
    pub fn download(&mut self) -> Result<Option<(PathBuf, ExportArtifact)>, StudioError> {
        let format = self.inputs.format();
        let Some(artifact) = self.export(format)? else {
            return Ok(None);
        };
        let path = artifact.save_to(&self.output_dir)?;
        Ok(Some((path, artifact)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LogoError;
    use std::fs;
    use tokio::time::sleep;

    fn studio() -> StudioService {
        StudioService::new(Config::default())
    }

    #[tokio::test(start_paused = true)]
    async fn text_renders_after_debounce() {
        let mut studio = studio();
        studio.set_text("https://example.com");

        assert!(studio.preview().unwrap().is_none(), "still debouncing");

        sleep(Duration::from_millis(501)).await;
        let symbol = studio.preview().unwrap().expect("symbol after debounce");
        assert_eq!(symbol.request().text, "https://example.com");
    }

    #[tokio::test(start_paused = true)]
    async fn changed_fires_once_settled() {
        let mut studio = studio();
        studio.set_text("abc");
        assert!(!studio.is_settled());

        studio.changed().await;
        assert!(studio.is_settled());
        assert_eq!(studio.request().unwrap().text, "abc");
    }

    #[tokio::test(start_paused = true)]
    async fn colors_are_debounced_too() {
        let mut studio = studio();
        studio.set_text("abc");
        studio.set_background("#B3FFB3").unwrap();
        studio.set_foreground("#fff").unwrap();
        studio.flush();
        let request = studio.request().unwrap();
        assert_eq!(request.background, Color::rgb(0xb3, 0xff, 0xb3));
        assert_eq!(request.foreground, Color::WHITE);

        studio.set_foreground("#123456").unwrap();
        assert_eq!(studio.request().unwrap().foreground, Color::WHITE);
        sleep(Duration::from_millis(501)).await;
        assert_eq!(studio.request().unwrap().foreground, Color::rgb(0x12, 0x34, 0x56));
    }

    #[tokio::test(start_paused = true)]
    async fn invalid_color_keeps_previous_value() {
        let mut studio = studio();
        assert!(studio.set_foreground("blue").is_err());
        assert_eq!(studio.inputs().foreground(), Color::BLACK);
    }

    #[tokio::test(start_paused = true)]
    async fn export_without_text_is_a_no_op() {
        let mut studio = studio();
        assert!(studio.export(ExportFormat::Png).unwrap().is_none());
        assert!(studio.download().unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn export_uses_last_settled_background() {
        let mut studio = studio();
        studio.set_text("hello");
        studio.set_background("#FFB3FF").unwrap();
        studio.flush();

        // Not settled yet: the export still shows the flushed color
        studio.set_background("#000000").unwrap();

        let artifact = studio.export(ExportFormat::Svg).unwrap().unwrap();
        let svg = String::from_utf8(artifact.bytes).unwrap();
        assert!(svg.contains(r##"fill="#ffb3ff" rx="8""##));

        sleep(Duration::from_millis(501)).await;
        let artifact = studio.export(ExportFormat::Svg).unwrap().unwrap();
        let svg = String::from_utf8(artifact.bytes).unwrap();
        assert!(svg.contains(r##"fill="#000000" rx="8""##));
    }

    #[tokio::test(start_paused = true)]
    async fn non_image_logo_is_rejected_without_losing_state() {
        let dir = tempfile::tempdir().unwrap();
        let notes = dir.path().join("notes.txt");
        fs::write(&notes, "not an image").unwrap();
        let logo = dir.path().join("logo.svg");
        fs::write(&logo, r#"<svg xmlns="http://www.w3.org/2000/svg" width="2" height="2"/>"#).unwrap();

        let mut studio = studio();
        studio.load_logo(&logo).unwrap();

        let err = studio.load_logo(&notes).unwrap_err();
        assert!(matches!(err, StudioError::Logo(LogoError::NotAnImage(_))));
        assert_eq!(studio.inputs().logo().map(|l| l.name()), Some("logo.svg"));

        studio.set_text("still works");
        studio.flush();
        assert!(studio.preview().unwrap().unwrap().logo_placement().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn logo_change_re_renders_immediately() {
        let dir = tempfile::tempdir().unwrap();
        let logo = dir.path().join("logo.svg");
        fs::write(&logo, r#"<svg xmlns="http://www.w3.org/2000/svg" width="2" height="2"/>"#).unwrap();

        let mut studio = studio();
        studio.set_text("logo");
        studio.flush();
        assert!(studio.preview().unwrap().unwrap().logo_placement().is_none());

        studio.load_logo(&logo).unwrap();
        assert!(studio.preview().unwrap().unwrap().logo_placement().is_some());

        studio.clear_logo();
        assert!(studio.preview().unwrap().unwrap().logo_placement().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn clearing_text_hides_preview() {
        let mut studio = studio();
        studio.set_text("x");
        studio.flush();
        assert!(studio.preview().unwrap().is_some());

        studio.set_text("");
        studio.flush();
        assert!(studio.preview().unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn download_writes_selected_format() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.export.output_dir = dir.path().to_path_buf();

        let mut studio = StudioService::new(config);
        studio.set_text("download me");
        studio.set_format(ExportFormat::Png);
        studio.flush();

        let (path, artifact) = studio.download().unwrap().unwrap();
        assert_eq!(path, dir.path().join("qr-code.png"));
        assert_eq!(artifact.format, ExportFormat::Png);
        let img = image::open(&path).unwrap();
        assert_eq!((img.width(), img.height()), (314, 314));
    }
}
