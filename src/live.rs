/// Interactive session over a line-oriented stream.
///
/// Each input line is one [`Command`]. Field edits go through the debouncer, so a
/// burst of `set` lines yields a single render. Logo loads and error correction
/// rebuilds run as spawned tasks and report back over a channel; the controller
/// drops their results when a newer request has superseded them.
use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::str::FromStr;

use tokio::io::{self, AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::debug;

use crate::controller::{BuiltSymbol, Controller, Field, LoadedLogo, Outcome};
use crate::debounce::{debounce, DEBOUNCE_WINDOW};
use crate::encoder::{Encoder, Symbol};
use crate::generator::RenderState;
use crate::notify::Notification;
use crate::options::ErrorCorrectionLevel;
use crate::payload::ContentType;
use crate::render::MAX_CANVAS_SIDE;
use crate::theme::{self, Theme};

pub const HELP: &str = "\
commands:
  type <text|url|email|phone|wifi|vcard>   switch the input form
  set <field> [value]                      edit a field (text, url, email, email.subject,
                                           email.body, phone, wifi.ssid, wifi.password,
                                           wifi.security, vcard.first, vcard.last,
                                           vcard.org, vcard.phone, vcard.email, vcard.url)
  shape <square|rounded|circle|dots>       dot and corner style
  eye <square|rounded>                     finder pattern style
  size <px> | margin <px>                  canvas size and quiet zone
  ecc <L|M|Q|H>                            error correction level
  fg <#hex> | bg <#hex>                    colors
  transparent <on|off>                     transparent background
  logo <path> | logo clear                 center logo
  download <png|jpg|jpeg|svg|pdf>          export the current symbol
  show | info | reset | help | quit";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Type(ContentType),
    Set(Field, String),
    Shape(String),
    Eye(String),
    Size(u32),
    Margin(u32),
    ErrorCorrection(ErrorCorrectionLevel),
    Foreground(String),
    Background(String),
    Transparent(bool),
    Logo(PathBuf),
    ClearLogo,
    Download(String),
    Show,
    Info,
    Reset,
    Help,
    Quit,
}

impl FromStr for Command {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };
        let required = |name: &str| {
            if rest.is_empty() {
                Err(format!("{name} needs an argument"))
            } else {
                Ok(rest.to_string())
            }
        };
        let pixels = |name: &str, range: RangeInclusive<u32>| match rest.parse::<u32>() {
            Ok(px) if range.contains(&px) => Ok(px),
            _ => Err(format!(
                "{name} needs a pixel count between {} and {}, got {rest:?}",
                range.start(),
                range.end()
            )),
        };

        match word {
            "type" => Ok(Command::Type(rest.parse()?)),
            "set" => {
                let (field, value) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
                Ok(Command::Set(field.parse()?, value.trim_start().to_string()))
            }
            "shape" => required("shape").map(Command::Shape),
            "eye" => required("eye").map(Command::Eye),
            "size" => pixels("size", 1..=MAX_CANVAS_SIDE).map(Command::Size),
            "margin" => pixels("margin", 0..=MAX_CANVAS_SIDE / 2).map(Command::Margin),
            "ecc" => Ok(Command::ErrorCorrection(rest.parse()?)),
            "fg" => required("fg").map(Command::Foreground),
            "bg" => required("bg").map(Command::Background),
            "transparent" => match rest {
                "on" | "true" | "yes" => Ok(Command::Transparent(true)),
                "off" | "false" | "no" => Ok(Command::Transparent(false)),
                other => Err(format!("transparent expects on or off, got {other:?}")),
            },
            "logo" if rest == "clear" => Ok(Command::ClearLogo),
            "logo" => required("logo").map(|path| Command::Logo(PathBuf::from(path))),
            "download" => Ok(Command::Download(if rest.is_empty() {
                "png".to_string()
            } else {
                rest.to_string()
            })),
            "show" => Ok(Command::Show),
            "info" => Ok(Command::Info),
            "reset" => Ok(Command::Reset),
            "help" | "?" => Ok(Command::Help),
            "quit" | "exit" => Ok(Command::Quit),
            other => Err(format!("unknown command: {other} (try help)")),
        }
    }
}

/// Completed background work.
enum Job<E: Encoder> {
    Logo(LoadedLogo),
    Rebuild(BuiltSymbol<E>),
}

/// Text shown for the current render state.
pub fn preview<E: Encoder>(controller: &Controller<E>) -> String {
    let generator = controller.generator();
    match (generator.render_state(), generator.symbol()) {
        (RenderState::Rendered, Some(symbol)) => {
            let info = generator.preview_info();
            let theme = theme::current().unwrap_or(Theme::Light);
            format!(
                "{}{} | {} | {}\n",
                themed(symbol.to_terminal(), theme),
                info.content_type,
                info.size,
                info.error_correction
            )
        }
        (RenderState::Failed(message), _) => format!("Failed to create QR code: {message}\n"),
        _ => "Enter content to generate a QR code\n".to_string(),
    }
}

/// On dark terminals blocks read as light, so the blocks move to the light modules.
fn themed(blocks: String, theme: Theme) -> String {
    if !theme.is_dark() {
        return blocks;
    }
    blocks
        .chars()
        .map(|c| match c {
            '█' => ' ',
            ' ' => '█',
            other => other,
        })
        .collect()
}

struct Session<E: Encoder, W> {
    controller: Controller<E>,
    output: W,
    jobs: UnboundedSender<Job<E>>,
    in_flight: usize,
}

impl<E, W> Session<E, W>
where
    E: Encoder + Clone + Send + 'static,
    E::Symbol: Send + 'static,
    W: AsyncWrite + Unpin,
{
    async fn say(&mut self, text: &str) -> io::Result<()> {
        self.output.write_all(text.as_bytes()).await?;
        if !text.ends_with('\n') {
            self.output.write_all(b"\n").await?;
        }
        self.output.flush().await
    }

    async fn show(&mut self) -> io::Result<()> {
        let text = preview(&self.controller);
        self.say(&text).await
    }

    async fn flush_notifications(
        &mut self,
        notifications: &mut UnboundedReceiver<Notification>,
    ) -> io::Result<()> {
        while let Ok(notification) = notifications.try_recv() {
            self.say(&notification.to_string()).await?;
        }
        Ok(())
    }

    /// Runs one command. Returns false on quit.
    async fn execute(&mut self, command: Command, edited: &dyn Fn()) -> io::Result<bool> {
        debug!(?command, "live command");
        match command {
            Command::Type(kind) => {
                self.controller.switch_input_type(kind);
                self.show().await?;
            }
            Command::Set(field, value) => {
                self.controller.set_field(field, value);
                edited();
            }
            Command::Shape(shape) => {
                self.controller.set_shape(&shape);
                self.show().await?;
            }
            Command::Eye(eye) => {
                self.controller.set_eye_style(&eye);
                self.show().await?;
            }
            Command::Size(size) => {
                self.controller.set_size(size);
                self.show().await?;
            }
            Command::Margin(margin) => {
                self.controller.set_margin(margin);
                self.show().await?;
            }
            Command::ErrorCorrection(level) => {
                match self.controller.begin_error_correction(level) {
                    Some(pending) => {
                        let jobs = self.jobs.clone();
                        self.in_flight += 1;
                        tokio::spawn(async move {
                            let _ = jobs.send(Job::Rebuild(pending.build().await));
                        });
                    }
                    None => self.show().await?,
                }
            }
            Command::Foreground(hex) => {
                if !self.controller.set_foreground(&hex) {
                    self.say(&format!("ignoring invalid color {hex}")).await?;
                }
            }
            Command::Background(hex) => {
                if !self.controller.set_background(&hex) {
                    self.say(&format!("ignoring invalid color {hex}")).await?;
                }
            }
            Command::Transparent(on) => self.controller.set_transparent(on),
            Command::Logo(path) => {
                if let Some(pending) = self.controller.begin_logo_upload(&path) {
                    let jobs = self.jobs.clone();
                    self.in_flight += 1;
                    tokio::spawn(async move {
                        let _ = jobs.send(Job::Logo(pending.load().await));
                    });
                }
            }
            Command::ClearLogo => self.controller.remove_logo(),
            Command::Download(format) => {
                if let Some(path) = self.controller.download(&format).await {
                    self.say(&format!("saved {}", path.display())).await?;
                }
            }
            Command::Show => self.show().await?,
            Command::Info => {
                let generator = self.controller.generator();
                let info = generator.preview_info();
                let current = generator.current_data();
                let text = format!(
                    "type: {}\nsize: {}\nerror correction: {}\ndots: {}\ncorners: {} / {}\ncolors: {} on {}\nlogo: {}\noutput: {}",
                    info.content_type,
                    info.size,
                    info.error_correction,
                    current.options.dot_style.name(),
                    current.options.corner_square_style.name(),
                    current.options.corner_dot_style.name(),
                    current.options.foreground,
                    current.options.background,
                    if current.has_logo { "yes" } else { "no" },
                    self.controller.output_dir().display()
                );
                self.say(&text).await?;
            }
            Command::Reset => {
                self.controller.reset();
                self.show().await?;
            }
            Command::Help => self.say(HELP).await?,
            Command::Quit => return Ok(false),
        }
        Ok(true)
    }

    async fn finish(&mut self, job: Job<E>) -> io::Result<()> {
        self.in_flight -= 1;
        let outcome = match job {
            Job::Logo(loaded) => self.controller.finish_logo_upload(loaded),
            Job::Rebuild(built) => self.controller.finish_error_correction(built),
        };
        if outcome == Outcome::Applied {
            self.show().await?;
        }
        Ok(())
    }
}

/// Drives `controller` from `input` until EOF or `quit`, writing previews and
/// notifications to `output`. Pending edits and in-flight jobs are settled before
/// returning the controller.
pub async fn run<E, R, W>(
    controller: Controller<E>,
    input: R,
    output: W,
    mut notifications: UnboundedReceiver<Notification>,
) -> io::Result<Controller<E>>
where
    E: Encoder + Clone + Send + 'static,
    E::Symbol: Send + 'static,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let (edits, mut ready) = debounce::<()>(DEBOUNCE_WINDOW);
    let (job_tx, mut job_rx) = mpsc::unbounded_channel();
    let mut session = Session {
        controller,
        output,
        jobs: job_tx,
        in_flight: 0,
    };
    let mut lines = input.lines();
    let mut edits = Some(edits);

    loop {
        tokio::select! {
            line = lines.next_line(), if edits.is_some() => {
                let keep_going = match line? {
                    Some(line) if line.trim().is_empty() => true,
                    Some(line) => match line.parse::<Command>() {
                        Ok(command) => {
                            let push = || {
                                if let Some(edits) = &edits {
                                    edits.push(());
                                }
                            };
                            session.execute(command, &push).await?
                        }
                        Err(err) => {
                            session.say(&format!("error: {err}")).await?;
                            true
                        }
                    },
                    None => false,
                };
                if !keep_going {
                    // Dropping the debouncer flushes a pending edit.
                    edits = None;
                }
            }
            Some(()) = ready.recv() => {
                session.controller.refresh();
                session.show().await?;
            }
            Some(job) = job_rx.recv(), if session.in_flight > 0 => {
                session.finish(job).await?;
            }
            else => break,
        }
        session.flush_notifications(&mut notifications).await?;
    }

    Ok(session.controller)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    use image::{DynamicImage, ImageFormat, RgbaImage};

    use crate::encoder::StyledEncoder;
    use crate::generator::Generator;
    use crate::notify;

    fn write_png(dir: &Path, name: &str, side: u32) -> PathBuf {
        let path = dir.join(name);
        DynamicImage::ImageRgba8(RgbaImage::new(side, side))
            .save_with_format(&path, ImageFormat::Png)
            .unwrap();
        path
    }

    async fn session(dir: &Path, script: &str) -> (Controller<StyledEncoder>, String) {
        let (notifier, rx) = notify::channel();
        let controller = Controller::new(Generator::new(StyledEncoder), notifier, dir);
        let mut output = Vec::new();
        let controller = run(controller, script.as_bytes(), &mut output, rx)
            .await
            .unwrap();
        (controller, String::from_utf8(output).unwrap())
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(
            "set email.subject Hello there".parse::<Command>(),
            Ok(Command::Set(Field::EmailSubject, "Hello there".into()))
        );
        assert_eq!(
            "set text".parse::<Command>(),
            Ok(Command::Set(Field::Text, String::new()))
        );
        assert_eq!(
            "type wifi".parse::<Command>(),
            Ok(Command::Type(ContentType::Wifi))
        );
        assert_eq!(
            "ecc Q".parse::<Command>(),
            Ok(Command::ErrorCorrection(ErrorCorrectionLevel::Quartile))
        );
        assert_eq!("logo clear".parse::<Command>(), Ok(Command::ClearLogo));
        assert_eq!(
            "download".parse::<Command>(),
            Ok(Command::Download("png".into()))
        );
        assert_eq!(
            "transparent on".parse::<Command>(),
            Ok(Command::Transparent(true))
        );
        assert!("size big".parse::<Command>().is_err());
        assert_eq!("size 4096".parse::<Command>(), Ok(Command::Size(4096)));
        assert!("size 4097".parse::<Command>().is_err());
        assert!("size 0".parse::<Command>().is_err());
        assert!("fly".parse::<Command>().is_err());
    }

    #[test]
    fn test_dark_theme_inverts_blocks() {
        assert_eq!(themed("█  █\n".into(), Theme::Light), "█  █\n");
        assert_eq!(themed("█  █\n".into(), Theme::Dark), " ██ \n");
    }

    #[tokio::test(start_paused = true)]
    async fn test_edits_render_after_input_ends() {
        let dir = tempfile::tempdir().unwrap();
        let (controller, output) =
            session(dir.path(), "set text h\nset text he\nset text hello\n").await;

        assert_eq!(controller.generator().options().data, "hello");
        assert_eq!(controller.generator().render_state(), &RenderState::Rendered);
        assert_eq!(output.matches("Text | 400px | High (30%)").count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_command_reports_error() {
        let dir = tempfile::tempdir().unwrap();
        let (_, output) = session(dir.path(), "fly away\nquit\nset text ignored\n").await;
        assert!(output.contains("error: unknown command: fly"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_info_lists_styles() {
        let dir = tempfile::tempdir().unwrap();
        let (_, output) =
            session(dir.path(), "shape circle\neye rounded\ntransparent on\ninfo\n").await;
        assert!(output.contains("dots: classy-rounded"));
        assert!(output.contains("corners: extra-rounded / dot"));
        assert!(output.contains("colors: #000000 on transparent"));
        assert!(output.contains(&format!("output: {}", dir.path().display())));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unsupported_download_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let (_, output) = session(dir.path(), "download gif\n").await;
        assert!(output.contains("[error] Failed to download QR code: Unsupported format: gif"));
    }

    #[tokio::test]
    async fn test_latest_logo_wins() {
        let dir = tempfile::tempdir().unwrap();
        let big = write_png(dir.path(), "big.png", 300);
        let small = write_png(dir.path(), "small.png", 24);
        let script = format!(
            "type url\nlogo {}\nlogo {}\n",
            big.display(),
            small.display()
        );
        let (controller, output) = session(dir.path(), &script).await;

        let logo = controller.generator().options().logo.clone().unwrap();
        assert_eq!(logo.width(), 24);
        assert_eq!(output.matches("Logo added successfully").count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_placeholder_until_edit_settles() {
        let dir = tempfile::tempdir().unwrap();
        let (controller, output) =
            session(dir.path(), "type url\nset url example.com\nshow\n").await;
        assert!(output.contains("Enter content to generate a QR code"));
        assert_eq!(
            controller.generator().options().data,
            "https://example.com"
        );
    }

    #[tokio::test]
    async fn test_ecc_changes_supersede_and_download() {
        let dir = tempfile::tempdir().unwrap();
        let script = "set url example.com\ntype url\necc L\necc M\ndownload svg\n";
        let (controller, output) = session(dir.path(), script).await;

        assert_eq!(
            controller.generator().options().error_correction,
            ErrorCorrectionLevel::Medium
        );
        assert_eq!(controller.generator().render_state(), &RenderState::Rendered);
        assert!(output.contains("[success] QR code downloaded as SVG"));
        let saved: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(saved.len(), 1);
    }
}
