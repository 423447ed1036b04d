use std::path::PathBuf;

use crate::state::ExportFormat;

pub const HELP: &str = "\
commands:
  text <value...>        set the text or URL to encode
  fg <#hex>              foreground color
  bg <#hex>              background color
  preset fg|bg <index>   pick a preset swatch (see `presets`)
  presets                list preset swatches
  logo <path>            embed an image in the middle of the code
  logo clear             remove the logo
  format svg|png         choose the download format
  export [svg|png]       save qr-code.<ext> to the output directory
  show                   print the current preview
  state                  print the inputs as JSON
  help                   this text
  quit                   leave";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Foreground,
    Background,
}

/// One line of interactive input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Text(String),
    Color(Target, String),
    Preset(Target, usize),
    Presets,
    Logo(PathBuf),
    ClearLogo,
    Format(ExportFormat),
    Export(Option<ExportFormat>),
    Show,
    State,
    Help,
    Quit,
}

impl Command {
    /// Blank lines parse to `Ok(None)`.
    pub fn parse(line: &str) -> Result<Option<Command>, String> {
        let line = line.trim_end_matches(['\r', '\n']);
        let trimmed = line.trim_start();
        if trimmed.is_empty() {
            return Ok(None);
        }

        let (word, rest) = match trimmed.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest),
            None => (trimmed, ""),
        };
        let arg = rest.trim();

        let command = match word.to_ascii_lowercase().as_str() {
            // Text keeps inner and trailing spaces, only the separator is dropped
            "text" => Command::Text(rest.strip_prefix(' ').unwrap_or(rest).to_string()),
            "fg" | "color" => Command::Color(Target::Foreground, required(arg, "fg <#hex>")?),
            "bg" | "background" => Command::Color(Target::Background, required(arg, "bg <#hex>")?),
            "preset" => {
                let mut parts = arg.split_whitespace();
                let target = match parts.next() {
                    Some("fg") => Target::Foreground,
                    Some("bg") => Target::Background,
                    _ => return Err("usage: preset fg|bg <index>".to_string()),
                };
                let index = parts
                    .next()
                    .and_then(|i| i.parse().ok())
                    .ok_or_else(|| "usage: preset fg|bg <index>".to_string())?;
                Command::Preset(target, index)
            }
            "presets" => Command::Presets,
            "logo" if arg == "clear" => Command::ClearLogo,
            "logo" => Command::Logo(PathBuf::from(required(arg, "logo <path> | logo clear")?)),
            "format" => Command::Format(required(arg, "format svg|png")?.parse()?),
            "export" | "download" => {
                if arg.is_empty() {
                    Command::Export(None)
                } else {
                    Command::Export(Some(arg.parse()?))
                }
            }
            "show" => Command::Show,
            "state" => Command::State,
            "help" | "?" => Command::Help,
            "quit" | "exit" | "q" => Command::Quit,
            other => return Err(format!("unknown command {:?}, try `help`", other)),
        };

        Ok(Some(command))
    }
}

fn required(arg: &str, usage: &str) -> Result<String, String> {
    if arg.is_empty() {
        Err(format!("usage: {}", usage))
    } else {
        Ok(arg.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> Command {
        Command::parse(line).unwrap().unwrap()
    }

    #[test]
    fn parses_text_verbatim() {
        assert_eq!(parse("text https://example.com"), Command::Text("https://example.com".into()));
        assert_eq!(parse("text hello  world "), Command::Text("hello  world ".into()));
        assert_eq!(parse("text"), Command::Text(String::new()));
    }

    #[test]
    fn parses_colors_and_presets() {
        assert_eq!(parse("fg #FFB3B3"), Command::Color(Target::Foreground, "#FFB3B3".into()));
        assert_eq!(parse("BG #fff"), Command::Color(Target::Background, "#fff".into()));
        assert_eq!(parse("preset bg 3"), Command::Preset(Target::Background, 3));
        assert!(Command::parse("preset xx 3").is_err());
        assert!(Command::parse("preset fg").is_err());
        assert!(Command::parse("fg").is_err());
    }

    #[test]
    fn parses_logo_and_export() {
        assert_eq!(parse("logo ./brand.png"), Command::Logo(PathBuf::from("./brand.png")));
        assert_eq!(parse("logo clear"), Command::ClearLogo);
        assert_eq!(parse("format png"), Command::Format(ExportFormat::Png));
        assert_eq!(parse("export"), Command::Export(None));
        assert_eq!(parse("export svg"), Command::Export(Some(ExportFormat::Svg)));
        assert!(Command::parse("export gif").is_err());
    }

    #[test]
    fn blank_and_unknown_lines() {
        assert_eq!(Command::parse("   \n").unwrap(), None);
        assert!(Command::parse("frobnicate").unwrap_err().contains("help"));
        assert_eq!(parse("q"), Command::Quit);
    }
}
