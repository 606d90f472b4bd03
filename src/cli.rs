//! Command-line front-end.
//!
//! One-shot subcommands format a payload, render it and export it. `live` runs an
//! interactive session on stdin/stdout, and `theme` reads or changes the persisted
//! light/dark preference.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tokio::io::BufReader;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::debug;

use crate::config::{config_dir, Config};
use crate::controller::{Controller, Field, Outcome};
use crate::encoder::{StyledEncoder, Symbol};
use crate::generator::{Generator, RenderState};
use crate::live;
use crate::notify::{self, Notification};
use crate::options::{Color, ErrorCorrectionLevel, EyeStyle, ShapeKind};
use crate::payload::ContentType;
use crate::render::MAX_CANVAS_SIDE;
use crate::theme::{self, Theme, ThemeStore};

/// qistudio - styled QR codes for text, links, contacts and Wi-Fi
#[derive(Parser, Debug)]
#[command(name = "qistudio")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (defaults to config.toml in the config directory)
    #[arg(long, global = true, env = "QISTUDIO_CONFIG_FILE")]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub style: StyleArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Rendering overrides; anything left out comes from the configuration file.
#[derive(Args, Debug, Default, Clone)]
pub struct StyleArgs {
    /// Canvas width and height in pixels
    #[arg(long, short, global = true,
          value_parser = clap::value_parser!(u32).range(1..=MAX_CANVAS_SIDE as i64))]
    pub size: Option<u32>,

    /// Quiet zone in pixels
    #[arg(long, short, global = true,
          value_parser = clap::value_parser!(u32).range(0..=(MAX_CANVAS_SIDE / 2) as i64))]
    pub margin: Option<u32>,

    /// Error correction level (L, M, Q or H)
    #[arg(long, short = 'e', global = true)]
    pub ecc: Option<ErrorCorrectionLevel>,

    /// Foreground color (#rgb or #rrggbb)
    #[arg(long, global = true)]
    pub fg: Option<Color>,

    /// Background color (#rgb or #rrggbb)
    #[arg(long, global = true)]
    pub bg: Option<Color>,

    /// Transparent background
    #[arg(long, global = true)]
    pub transparent: bool,

    /// Module shape
    #[arg(long, global = true, value_enum)]
    pub shape: Option<ShapeArg>,

    /// Finder pattern style
    #[arg(long, global = true, value_enum)]
    pub eye: Option<EyeArg>,

    /// Directory exports are written to
    #[arg(long, short, global = true, env = "QISTUDIO_OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeArg {
    Square,
    Rounded,
    Circle,
    Dots,
}

impl From<ShapeArg> for ShapeKind {
    fn from(shape: ShapeArg) -> Self {
        match shape {
            ShapeArg::Square => ShapeKind::Square,
            ShapeArg::Rounded => ShapeKind::Rounded,
            ShapeArg::Circle => ShapeKind::Circle,
            ShapeArg::Dots => ShapeKind::Dots,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EyeArg {
    Square,
    Rounded,
}

impl From<EyeArg> for EyeStyle {
    fn from(eye: EyeArg) -> Self {
        match eye {
            EyeArg::Square => EyeStyle::Square,
            EyeArg::Rounded => EyeStyle::Rounded,
        }
    }
}

/// Output options shared by the one-shot subcommands.
#[derive(Args, Debug, Clone)]
pub struct OutputArgs {
    /// Export formats: png, jpg, jpeg, svg, pdf
    #[arg(long, short, value_delimiter = ',', default_value = "png")]
    pub format: Vec<String>,

    /// Logo placed in the center of the symbol
    #[arg(long)]
    pub logo: Option<PathBuf>,

    /// Print the symbol to the terminal as well
    #[arg(long, short)]
    pub print: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Plain text
    Text {
        text: String,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Website link; https:// is added when no scheme is given
    Url {
        url: String,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// mailto: link
    Email {
        email: String,
        #[arg(long, default_value = "")]
        subject: String,
        #[arg(long, default_value = "")]
        body: String,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// tel: link
    Phone {
        phone: String,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Wi-Fi network credentials
    Wifi {
        ssid: String,
        #[arg(long, default_value = "")]
        password: String,
        /// WPA, WEP or nopass
        #[arg(long, default_value = "WPA")]
        security: String,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// vCard 3.0 contact
    Vcard {
        #[arg(long, default_value = "")]
        first: String,
        #[arg(long, default_value = "")]
        last: String,
        #[arg(long, default_value = "")]
        org: String,
        #[arg(long, default_value = "")]
        phone: String,
        #[arg(long, default_value = "")]
        email: String,
        #[arg(long, default_value = "")]
        url: String,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Interactive session reading commands from stdin
    Live,
    /// Show or change the light/dark preference
    Theme {
        #[command(subcommand)]
        action: Option<ThemeAction>,
    },
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThemeAction {
    Show,
    Toggle,
    Set {
        #[arg(value_enum)]
        theme: ThemeArg,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThemeArg {
    Light,
    Dark,
}

impl From<ThemeArg> for Theme {
    fn from(theme: ThemeArg) -> Self {
        match theme {
            ThemeArg::Light => Theme::Light,
            ThemeArg::Dark => Theme::Dark,
        }
    }
}

impl Commands {
    /// Content type and raw field values of a one-shot subcommand.
    pub fn form(&self) -> Option<(ContentType, Vec<(Field, &str)>, &OutputArgs)> {
        let form = match self {
            Commands::Text { text, output } => {
                (ContentType::Text, vec![(Field::Text, text.as_str())], output)
            }
            Commands::Url { url, output } => {
                (ContentType::Url, vec![(Field::Url, url.as_str())], output)
            }
            Commands::Email {
                email,
                subject,
                body,
                output,
            } => (
                ContentType::Email,
                vec![
                    (Field::Email, email.as_str()),
                    (Field::EmailSubject, subject.as_str()),
                    (Field::EmailBody, body.as_str()),
                ],
                output,
            ),
            Commands::Phone { phone, output } => {
                (ContentType::Phone, vec![(Field::Phone, phone.as_str())], output)
            }
            Commands::Wifi {
                ssid,
                password,
                security,
                output,
            } => (
                ContentType::Wifi,
                vec![
                    (Field::WifiSsid, ssid.as_str()),
                    (Field::WifiPassword, password.as_str()),
                    (Field::WifiSecurity, security.as_str()),
                ],
                output,
            ),
            Commands::Vcard {
                first,
                last,
                org,
                phone,
                email,
                url,
                output,
            } => (
                ContentType::VCard,
                vec![
                    (Field::VCardFirstName, first.as_str()),
                    (Field::VCardLastName, last.as_str()),
                    (Field::VCardOrg, org.as_str()),
                    (Field::VCardPhone, phone.as_str()),
                    (Field::VCardEmail, email.as_str()),
                    (Field::VCardUrl, url.as_str()),
                ],
                output,
            ),
            Commands::Live | Commands::Theme { .. } => return None,
        };
        Some(form)
    }
}

impl StyleArgs {
    /// Applies the flags given on the command line over `config`.
    pub fn apply(&self, config: &mut Config) {
        if let Some(size) = self.size {
            config.size = size;
        }
        if let Some(margin) = self.margin {
            config.margin = margin;
        }
        if let Some(ecc) = self.ecc {
            config.error_correction = ecc;
        }
        if let Some(fg) = self.fg {
            config.foreground = fg;
        }
        if let Some(bg) = self.bg {
            config.background = bg;
        }
        if self.transparent {
            config.transparent = true;
        }
        if let Some(shape) = self.shape {
            config.shape = shape.into();
        }
        if let Some(eye) = self.eye {
            config.eye = Some(eye.into());
        }
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
    }
}

/// Runs the parsed command line.
pub async fn execute(cli: Cli) -> Result<()> {
    let mut config = Config::load(cli.config.as_deref()).context("loading configuration")?;
    cli.style.apply(&mut config);
    debug!(?config, "effective configuration");

    let store = ThemeStore::in_dir(config_dir());
    theme::init(&store, theme::os_prefers_dark());

    match &cli.command {
        Commands::Theme { action } => run_theme(&store, action.unwrap_or(ThemeAction::Show)),
        Commands::Live => run_live(&config).await,
        command => {
            let (kind, fields, output) = command
                .form()
                .context("subcommand has no input form")?;
            run_once(&config, kind, &fields, output).await
        }
    }
}

fn run_theme(store: &ThemeStore, action: ThemeAction) -> Result<()> {
    let theme = match action {
        ThemeAction::Show => theme::current()?,
        ThemeAction::Toggle => theme::toggle(store)
            .with_context(|| format!("saving theme to {}", store.path().display()))?,
        ThemeAction::Set { theme } => theme::set(store, theme.into())
            .with_context(|| format!("saving theme to {}", store.path().display()))?,
    };
    println!("{theme}");
    Ok(())
}

fn controller(
    config: &Config,
) -> (
    Controller<StyledEncoder>,
    UnboundedReceiver<Notification>,
) {
    let (notifier, notifications) = notify::channel();
    let generator = Generator::with_options(StyledEncoder, config.render_options());
    (
        Controller::new(generator, notifier, config.output_dir.clone()),
        notifications,
    )
}

async fn run_live(config: &Config) -> Result<()> {
    let (controller, notifications) = controller(config);
    let input = BufReader::new(tokio::io::stdin());
    live::run(controller, input, tokio::io::stdout(), notifications)
        .await
        .context("live session failed")?;
    Ok(())
}

async fn run_once(
    config: &Config,
    kind: ContentType,
    fields: &[(Field, &str)],
    output: &OutputArgs,
) -> Result<()> {
    let (mut controller, mut notifications) = controller(config);
    for &(field, value) in fields {
        controller.set_field(field, value);
    }
    if !controller.switch_input_type(kind) {
        controller.refresh();
    }

    if let Some(path) = &output.logo {
        if controller.upload_logo(path).await != Outcome::Applied {
            report(&mut notifications);
            bail!("could not use logo {}", path.display());
        }
    }

    match controller.generator().render_state() {
        RenderState::Rendered => {}
        RenderState::Placeholder => bail!("nothing to encode: the payload is empty"),
        RenderState::Failed(message) => bail!("failed to create QR code: {message}"),
    }

    if output.print {
        if let Some(symbol) = controller.generator().symbol() {
            print!("{}", symbol.to_terminal());
        }
    }

    let mut failed = Vec::new();
    for format in &output.format {
        match controller.download(format).await {
            Some(path) => println!("{}", path.display()),
            None => failed.push(format.as_str()),
        }
    }
    report(&mut notifications);

    if !failed.is_empty() {
        bail!("export failed for: {}", failed.join(", "));
    }
    Ok(())
}

fn report(notifications: &mut UnboundedReceiver<Notification>) {
    while let Ok(notification) = notifications.try_recv() {
        eprintln!("{notification}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wifi_subcommand() {
        let cli = Cli::parse_from([
            "qistudio",
            "wifi",
            "Home",
            "--password",
            "secret",
            "--format",
            "png,svg",
            "--shape",
            "dots",
        ]);
        let (kind, fields, output) = cli.command.form().unwrap();
        assert_eq!(kind, ContentType::Wifi);
        assert_eq!(fields[0], (Field::WifiSsid, "Home"));
        assert_eq!(fields[2], (Field::WifiSecurity, "WPA"));
        assert_eq!(output.format, vec!["png", "svg"]);
        assert_eq!(cli.style.shape, Some(ShapeArg::Dots));
    }

    #[test]
    fn test_style_flags_override_config() {
        let cli = Cli::parse_from([
            "qistudio", "--size", "512", "--ecc", "q", "--fg", "#336699", "--eye", "rounded",
            "--transparent", "text", "hello",
        ]);
        let mut config = Config::default();
        cli.style.apply(&mut config);

        assert_eq!(config.size, 512);
        assert_eq!(config.error_correction, ErrorCorrectionLevel::Quartile);
        assert_eq!(config.foreground.to_string(), "#336699");
        assert_eq!(config.eye, Some(EyeStyle::Rounded));
        assert!(config.transparent);
        assert_eq!(config.margin, Config::default().margin);
    }

    #[test]
    fn test_bad_color_is_rejected() {
        assert!(Cli::try_parse_from(["qistudio", "--fg", "blue", "text", "x"]).is_err());
    }

    #[test]
    fn test_size_is_bounded() {
        assert!(Cli::try_parse_from(["qistudio", "--size", "4096", "text", "x"]).is_ok());
        assert!(Cli::try_parse_from(["qistudio", "--size", "4097", "text", "x"]).is_err());
        assert!(Cli::try_parse_from(["qistudio", "--size", "0", "text", "x"]).is_err());
    }

    #[test]
    fn test_theme_subcommand() {
        let cli = Cli::parse_from(["qistudio", "theme", "set", "dark"]);
        assert!(matches!(
            cli.command,
            Commands::Theme {
                action: Some(ThemeAction::Set {
                    theme: ThemeArg::Dark
                })
            }
        ));
        assert!(cli.command.form().is_none());
    }

    #[tokio::test]
    async fn test_run_once_writes_every_format() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            output_dir: dir.path().to_path_buf(),
            ..Config::default()
        };
        let output = OutputArgs {
            format: vec!["png".into(), "pdf".into()],
            logo: None,
            print: false,
        };
        run_once(&config, ContentType::Url, &[(Field::Url, "example.com")], &output)
            .await
            .unwrap();

        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert!(names.iter().all(|name| name.starts_with("qrcode-")));
        let mut extensions: Vec<&str> = names
            .iter()
            .filter_map(|name| name.rsplit('.').next())
            .collect();
        extensions.sort();
        assert_eq!(extensions, vec!["pdf", "png"]);
    }

    #[tokio::test]
    async fn test_run_once_empty_payload_fails() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            output_dir: dir.path().to_path_buf(),
            ..Config::default()
        };
        let output = OutputArgs {
            format: vec!["png".into()],
            logo: None,
            print: false,
        };
        let err = run_once(&config, ContentType::Text, &[(Field::Text, "")], &output)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("nothing to encode"));
    }
}
