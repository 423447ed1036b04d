use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};

mod color;
mod command;
mod config;
mod debounce;
mod error;
mod export;
mod logo;
mod qr;
mod state;
mod studio;

use color::{Color, PRESET_COLORS};
use command::{Command, Target, HELP};
use config::Config;
use state::ExportFormat;
use studio::StudioService;

/// Generate QR codes with custom colors and an optional logo, exported as SVG or PNG.
///
/// Without --text an interactive session starts: type `help` for commands.
#[derive(Debug, Parser)]
#[command(name = "qr-studio", version, about)]
struct Cli {
    /// Text or URL to encode; exports once and exits.
    #[arg(long)]
    text: Option<String>,

    /// Foreground color (#rgb or #rrggbb).
    #[arg(long)]
    fg: Option<String>,

    /// Background color (#rgb or #rrggbb).
    #[arg(long)]
    bg: Option<String>,

    /// Image to embed in the middle of the code.
    #[arg(long)]
    logo: Option<PathBuf>,

    /// Download format.
    #[arg(long, default_value = "svg")]
    format: ExportFormat,

    /// Directory downloads are written to.
    #[arg(long)]
    out: Option<PathBuf>,

    /// Quiet period before edits reach the preview.
    #[arg(long)]
    debounce_ms: Option<u64>,

    /// Print the export as a data: URL instead of saving it (one-shot only).
    #[arg(long)]
    data_url: bool,
}

impl Cli {
    fn apply(&self, config: &mut Config) {
        if let Some(out) = &self.out {
            config.export.output_dir = out.clone();
        }
        if let Some(ms) = self.debounce_ms {
            config.session.debounce_ms = ms;
        }
    }

    /// Push flags into the studio, the same way interactive edits would.
    fn seed(&self, studio: &mut StudioService) -> anyhow::Result<()> {
        if let Some(text) = &self.text {
            studio.set_text(text);
        }
        if let Some(fg) = &self.fg {
            studio.set_foreground(fg).context("invalid --fg")?;
        }
        if let Some(bg) = &self.bg {
            studio.set_background(bg).context("invalid --bg")?;
        }
        if let Some(logo) = &self.logo {
            studio.load_logo(logo).context("invalid --logo")?;
        }
        studio.set_format(self.format);
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init();

    let cli = Cli::parse();

    let mut config = Config::load().context("Failed to load config")?;
    cli.apply(&mut config);
    config.validate()?;

    let mut studio = StudioService::new(config.clone());
    cli.seed(&mut studio)?;

    if cli.text.is_some() {
        return one_shot(&mut studio, cli.data_url);
    }

    println!("qr-studio: enter text to encode, `help` for commands");
    println!("Downloads go to {}", config.export.output_dir.display());
    interactive(&mut studio).await
}

fn one_shot(studio: &mut StudioService, data_url: bool) -> anyhow::Result<()> {
    studio.flush();

    if data_url {
        let format = studio.inputs().format();
        let Some(artifact) = studio.export(format)? else {
            anyhow::bail!("Nothing to export: --text is empty");
        };
        println!("{}", artifact.to_data_url());
        return Ok(());
    }

    match studio.download()? {
        Some((path, _)) => {
            println!("{}", path.display());
            Ok(())
        }
        None => anyhow::bail!("Nothing to export: --text is empty"),
    }
}

async fn interactive(studio: &mut StudioService) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read stdin")? else {
                    break;
                };
                match Command::parse(&line) {
                    Ok(Some(Command::Quit)) => break,
                    Ok(Some(command)) => handle(studio, command),
                    Ok(None) => {}
                    Err(e) => println!("{}", e),
                }
            }
            _ = studio.changed() => {
                show(studio);
            }
        }
    }

    Ok(())
}

/// Failures are reported and the session goes on.
fn handle(studio: &mut StudioService, command: Command) {
    match command {
        Command::Text(text) => studio.set_text(&text),
        Command::Color(target, hex) => {
            let result = match target {
                Target::Foreground => studio.set_foreground(&hex),
                Target::Background => studio.set_background(&hex),
            };
            if let Err(e) = result {
                log::warn!("{}", e);
                println!("{}", e);
            }
        }
        Command::Preset(target, index) => match Color::preset(index) {
            Some(color) => {
                let hex = color.to_string();
                let result = match target {
                    Target::Foreground => studio.set_foreground(&hex),
                    Target::Background => studio.set_background(&hex),
                };
                if let Err(e) = result {
                    log::warn!("{}", e);
                    println!("{}", e);
                }
            }
            None => println!("No preset {}, there are {}", index, PRESET_COLORS.len()),
        },
        Command::Presets => {
            for (i, hex) in PRESET_COLORS.iter().enumerate() {
                println!("{}: {}", i, hex);
            }
        }
        Command::Logo(path) => match studio.load_logo(&path) {
            Ok(logo) => {
                println!("Logo {} ({})", logo.name(), logo.mime_type());
                show(studio);
            }
            Err(e) => {
                log::warn!("Logo rejected: {}", e);
                println!("{}", e);
            }
        },
        Command::ClearLogo => {
            studio.clear_logo();
            show(studio);
        }
        Command::Format(format) => studio.set_format(format),
        Command::Export(format) => {
            if let Some(format) = format {
                studio.set_format(format);
            }
            match studio.download() {
                Ok(Some((path, artifact))) => println!(
                    "Saved {} ({}x{}, {} bytes)",
                    path.display(),
                    artifact.width,
                    artifact.height,
                    artifact.bytes.len()
                ),
                Ok(None) => println!("Nothing to export yet"),
                Err(e) => {
                    log::error!("Export failed: {}", e);
                    println!("{}", e);
                }
            }
        }
        Command::Show => show(studio),
        Command::State => match serde_json::to_string_pretty(&studio.snapshot()) {
            Ok(json) => println!("{}", json),
            Err(e) => log::error!("Failed to serialize state: {}", e),
        },
        Command::Help => println!("{}", HELP),
        Command::Quit => {}
    }
}

fn show(studio: &mut StudioService) {
    if !studio.is_settled() {
        println!("(still typing, showing the last settled preview)");
    }
    match studio.preview() {
        Ok(Some(symbol)) => {
            print!("{}", symbol.to_terminal());
            let cells = symbol.cells();
            match symbol.logo_placement() {
                Some(logo) => println!(
                    "{}x{} modules, {}x{} cleared for the logo",
                    cells, cells, logo.excavation.w, logo.excavation.h
                ),
                None => println!("{}x{} modules", cells, cells),
            }
        }
        Ok(None) => println!("(enter some text)"),
        Err(e) => {
            log::warn!("Preview failed: {}", e);
            println!("{}", e);
        }
    }
}
