/// Application controller.
///
/// Glue between the user surface and the core: it keeps the active input type and
/// the raw value of every form field, formats the active form into a payload, pushes
/// style changes into the [`Generator`], and runs logo uploads, error correction
/// changes and downloads, reporting outcomes as notifications.
///
/// Logo uploads and error correction changes are split into a synchronous `begin_*`
/// step that takes a supersede ticket, an async step that may run on another task,
/// and a `finish_*` step that applies the result only if its ticket is still current.
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use tracing::{debug, info};

use crate::encoder::Encoder;
use crate::error::{ExportError, LogoError, RenderError};
use crate::export::{self, ExportFormat, ExportGate};
use crate::generator::{Generator, RenderState};
use crate::logo::{Logo, LogoUpload};
use crate::notify::Notifier;
use crate::options::{
    is_valid_hex_color, Background, Color, ErrorCorrectionLevel, EyeStyle, RenderOptions,
    ShapeKind,
};
use crate::payload::{self, ContentInput, ContentType};
use crate::sequence::{Sequencer, Ticket};

/// A single input field of one of the forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Text,
    Url,
    Email,
    EmailSubject,
    EmailBody,
    Phone,
    WifiSsid,
    WifiPassword,
    WifiSecurity,
    VCardFirstName,
    VCardLastName,
    VCardOrg,
    VCardPhone,
    VCardEmail,
    VCardUrl,
}

impl Field {
    const NAMES: [(&'static str, Field); 15] = [
        ("text", Field::Text),
        ("url", Field::Url),
        ("email", Field::Email),
        ("email.subject", Field::EmailSubject),
        ("email.body", Field::EmailBody),
        ("phone", Field::Phone),
        ("wifi.ssid", Field::WifiSsid),
        ("wifi.password", Field::WifiPassword),
        ("wifi.security", Field::WifiSecurity),
        ("vcard.first", Field::VCardFirstName),
        ("vcard.last", Field::VCardLastName),
        ("vcard.org", Field::VCardOrg),
        ("vcard.phone", Field::VCardPhone),
        ("vcard.email", Field::VCardEmail),
        ("vcard.url", Field::VCardUrl),
    ];
}

impl FromStr for Field {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Field::NAMES
            .iter()
            .find(|(name, _)| *name == s)
            .map(|&(_, field)| field)
            .ok_or_else(|| format!("unknown field: {s}"))
    }
}

/// Raw values of every form field, kept across type switches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormState {
    pub text: String,
    pub url: String,
    pub email: String,
    pub email_subject: String,
    pub email_body: String,
    pub phone: String,
    pub wifi_ssid: String,
    pub wifi_password: String,
    pub wifi_security: String,
    pub vcard_first_name: String,
    pub vcard_last_name: String,
    pub vcard_org: String,
    pub vcard_phone: String,
    pub vcard_email: String,
    pub vcard_url: String,
}

impl Default for FormState {
    fn default() -> Self {
        FormState {
            text: String::new(),
            url: String::new(),
            email: String::new(),
            email_subject: String::new(),
            email_body: String::new(),
            phone: String::new(),
            wifi_ssid: String::new(),
            wifi_password: String::new(),
            wifi_security: "WPA".to_string(),
            vcard_first_name: String::new(),
            vcard_last_name: String::new(),
            vcard_org: String::new(),
            vcard_phone: String::new(),
            vcard_email: String::new(),
            vcard_url: String::new(),
        }
    }
}

impl FormState {
    pub fn set(&mut self, field: Field, value: impl Into<String>) {
        let slot = match field {
            Field::Text => &mut self.text,
            Field::Url => &mut self.url,
            Field::Email => &mut self.email,
            Field::EmailSubject => &mut self.email_subject,
            Field::EmailBody => &mut self.email_body,
            Field::Phone => &mut self.phone,
            Field::WifiSsid => &mut self.wifi_ssid,
            Field::WifiPassword => &mut self.wifi_password,
            Field::WifiSecurity => &mut self.wifi_security,
            Field::VCardFirstName => &mut self.vcard_first_name,
            Field::VCardLastName => &mut self.vcard_last_name,
            Field::VCardOrg => &mut self.vcard_org,
            Field::VCardPhone => &mut self.vcard_phone,
            Field::VCardEmail => &mut self.vcard_email,
            Field::VCardUrl => &mut self.vcard_url,
        };
        *slot = value.into();
    }

    /// Snapshot of the form belonging to `kind`.
    pub fn collect(&self, kind: ContentType) -> ContentInput {
        match kind {
            ContentType::Text => ContentInput::Text {
                text: self.text.clone(),
            },
            ContentType::Url => ContentInput::Url {
                url: self.url.clone(),
            },
            ContentType::Email => ContentInput::Email {
                email: self.email.clone(),
                subject: self.email_subject.clone(),
                body: self.email_body.clone(),
            },
            ContentType::Phone => ContentInput::Phone {
                phone: self.phone.clone(),
            },
            ContentType::Wifi => ContentInput::Wifi {
                ssid: self.wifi_ssid.clone(),
                password: self.wifi_password.clone(),
                security: self.wifi_security.clone(),
            },
            ContentType::VCard => ContentInput::VCard {
                first_name: self.vcard_first_name.clone(),
                last_name: self.vcard_last_name.clone(),
                org: self.vcard_org.clone(),
                phone: self.vcard_phone.clone(),
                email: self.vcard_email.clone(),
                url: self.vcard_url.clone(),
            },
        }
    }
}

/// How a supersedable operation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Applied,
    Superseded,
    Failed,
}

/// A validated logo upload holding its ticket.
#[derive(Debug)]
pub struct PendingLogo {
    ticket: Ticket,
    upload: LogoUpload,
}

/// Result of [`PendingLogo::load`], ready for [`Controller::finish_logo_upload`].
#[derive(Debug)]
pub struct LoadedLogo {
    ticket: Ticket,
    result: Result<Logo, LogoError>,
}

impl PendingLogo {
    /// Decodes and downscales the logo on the blocking pool.
    pub async fn load(self) -> LoadedLogo {
        LoadedLogo {
            ticket: self.ticket,
            result: self.upload.load_async().await,
        }
    }
}

/// An error correction change waiting for its encoder instance.
pub struct PendingRebuild<E: Encoder> {
    ticket: Ticket,
    level: ErrorCorrectionLevel,
    encoder: E,
    options: RenderOptions,
}

/// Result of [`PendingRebuild::build`].
pub struct BuiltSymbol<E: Encoder> {
    ticket: Ticket,
    level: ErrorCorrectionLevel,
    payload: String,
    result: Result<E::Symbol, RenderError>,
}

impl<E> PendingRebuild<E>
where
    E: Encoder + Send + 'static,
    E::Symbol: Send + 'static,
{
    /// Builds the new instance on the blocking pool.
    pub async fn build(self) -> BuiltSymbol<E> {
        let PendingRebuild {
            ticket,
            level,
            encoder,
            options,
        } = self;
        let payload = options.data.clone();
        let result = tokio::task::spawn_blocking(move || encoder.create(&options))
            .await
            .unwrap_or_else(|e| Err(RenderError::Encode(format!("build task failed: {e}"))));
        BuiltSymbol {
            ticket,
            level,
            payload,
            result,
        }
    }
}

/// Color inputs (foreground, background, transparent) matching `options`.
fn color_inputs(options: &RenderOptions) -> (Color, Color, bool) {
    match options.background {
        Background::Color(color) => (options.foreground, color, false),
        Background::Transparent => (options.foreground, Color::WHITE, true),
    }
}

pub struct Controller<E: Encoder> {
    generator: Generator<E>,
    input_type: ContentType,
    form: FormState,
    foreground: Color,
    background: Color,
    transparent: bool,
    output_dir: PathBuf,
    notifier: Notifier,
    gate: ExportGate,
    logo_seq: Sequencer,
    ecc_seq: Sequencer,
}

impl<E: Encoder> Controller<E> {
    pub fn new(generator: Generator<E>, notifier: Notifier, output_dir: impl Into<PathBuf>) -> Self {
        let (foreground, background, transparent) = color_inputs(generator.options());
        Controller {
            generator,
            input_type: ContentType::Text,
            form: FormState::default(),
            foreground,
            background,
            transparent,
            output_dir: output_dir.into(),
            notifier,
            gate: ExportGate::new(),
            logo_seq: Sequencer::new(),
            ecc_seq: Sequencer::new(),
        }
    }

    pub fn generator(&self) -> &Generator<E> {
        &self.generator
    }

    pub fn input_type(&self) -> ContentType {
        self.input_type
    }

    pub fn form(&self) -> &FormState {
        &self.form
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn export_gate(&self) -> &ExportGate {
        &self.gate
    }

    /// Records a raw field edit. Call [`Controller::refresh`] (usually debounced)
    /// to re-render.
    pub fn set_field(&mut self, field: Field, value: impl Into<String>) {
        self.form.set(field, value);
    }

    /// Switches the active form and re-renders. Returns false if `kind` was already
    /// active.
    pub fn switch_input_type(&mut self, kind: ContentType) -> bool {
        if kind == self.input_type {
            return false;
        }
        debug!(from = %self.input_type, to = %kind, "input type switched");
        self.input_type = kind;
        self.refresh();
        true
    }

    /// Formats the active form and pushes the payload into the generator.
    pub fn refresh(&mut self) {
        let input = self.form.collect(self.input_type);
        let payload = payload::format(&input);
        self.generator.set_payload(payload, input.content_type());
        self.report_render_state();
    }

    pub fn set_size(&mut self, size: u32) {
        self.generator.set_dimensions(size);
        self.report_render_state();
    }

    pub fn set_margin(&mut self, margin: u32) {
        self.generator.set_margin(margin);
        self.report_render_state();
    }

    pub fn set_shape(&mut self, shape: &str) {
        self.generator.set_shape(ShapeKind::from_name(shape));
        self.report_render_state();
    }

    pub fn set_eye_style(&mut self, eye: &str) {
        self.generator.set_eye_style(EyeStyle::from_name(eye));
        self.report_render_state();
    }

    /// Updates the foreground from a hex text input. Invalid text is ignored.
    pub fn set_foreground(&mut self, hex: &str) -> bool {
        if !is_valid_hex_color(hex) {
            return false;
        }
        let Ok(color) = hex.parse() else {
            return false;
        };
        self.foreground = color;
        self.apply_colors();
        true
    }

    /// Updates the background from a hex text input. Invalid text is ignored.
    pub fn set_background(&mut self, hex: &str) -> bool {
        if !is_valid_hex_color(hex) {
            return false;
        }
        let Ok(color) = hex.parse() else {
            return false;
        };
        self.background = color;
        self.apply_colors();
        true
    }

    pub fn set_transparent(&mut self, transparent: bool) {
        self.transparent = transparent;
        self.apply_colors();
    }

    fn apply_colors(&mut self) {
        self.generator
            .set_colors(self.foreground, self.background, self.transparent);
        self.report_render_state();
    }

    /// Validates and loads a logo in one go.
    pub async fn upload_logo(&mut self, path: impl AsRef<Path>) -> Outcome {
        let Some(pending) = self.begin_logo_upload(path) else {
            return Outcome::Failed;
        };
        let loaded = pending.load().await;
        self.finish_logo_upload(loaded)
    }

    /// Checks MIME type and size and takes a ticket. Rejections are reported as
    /// warnings and leave the state untouched.
    pub fn begin_logo_upload(&self, path: impl AsRef<Path>) -> Option<PendingLogo> {
        let upload = match LogoUpload::inspect(path).and_then(|u| u.validate().map(|_| u)) {
            Ok(upload) => upload,
            Err(err) if err.is_validation() => {
                self.notifier.warning(err.to_string());
                return None;
            }
            Err(err) => {
                self.notifier.error(format!("Failed to upload logo: {err}"));
                return None;
            }
        };
        Some(PendingLogo {
            ticket: self.logo_seq.issue(),
            upload,
        })
    }

    pub fn finish_logo_upload(&mut self, loaded: LoadedLogo) -> Outcome {
        if !self.logo_seq.is_current(loaded.ticket) {
            debug!("discarding superseded logo upload");
            return Outcome::Superseded;
        }
        match loaded.result {
            Ok(logo) => {
                self.generator.set_logo(Arc::new(logo));
                self.notifier.success("Logo added successfully");
                self.report_render_state();
                Outcome::Applied
            }
            Err(err) => {
                self.notifier.error(format!("Failed to upload logo: {err}"));
                Outcome::Failed
            }
        }
    }

    /// Removes the logo. Any upload still in flight is superseded.
    pub fn remove_logo(&mut self) {
        self.logo_seq.issue();
        self.generator.clear_logo();
        self.notifier.info("Logo removed");
        self.report_render_state();
    }

    /// Downloads the current symbol as `format` into the output directory.
    pub async fn download(&mut self, format: &str) -> Option<PathBuf> {
        let result = match format.parse::<ExportFormat>() {
            Ok(parsed) => {
                export::download(&self.gate, self.generator.symbol(), parsed, &self.output_dir)
                    .await
            }
            Err(err) => Err(err),
        };
        match result {
            Ok(path) => {
                self.notifier.success(format!(
                    "QR code downloaded as {}",
                    format.to_ascii_uppercase()
                ));
                Some(path)
            }
            Err(ExportError::NothingToExport) => {
                self.notifier.warning(ExportError::NothingToExport.to_string());
                None
            }
            Err(ExportError::Busy) => {
                self.notifier.warning("A download is already in progress");
                None
            }
            Err(err) => {
                self.notifier
                    .error(format!("Failed to download QR code: {err}"));
                None
            }
        }
    }

    /// Back to default options, empty forms and the text type.
    pub fn reset(&mut self) {
        self.logo_seq.issue();
        self.ecc_seq.issue();
        self.generator.reset();
        self.form = FormState::default();
        self.input_type = ContentType::Text;
        (self.foreground, self.background, self.transparent) =
            color_inputs(self.generator.options());
    }

    fn report_render_state(&self) {
        if let RenderState::Failed(message) = self.generator.render_state() {
            self.notifier
                .error(format!("Failed to create QR code: {message}"));
        }
    }
}

impl<E> Controller<E>
where
    E: Encoder + Clone + Send + 'static,
    E::Symbol: Send + 'static,
{
    /// Records the level and takes a ticket; the instance is built by
    /// [`PendingRebuild::build`]. Returns `None` when there is nothing to render, in
    /// which case the level is just recorded.
    pub fn begin_error_correction(
        &mut self,
        level: ErrorCorrectionLevel,
    ) -> Option<PendingRebuild<E>> {
        let ticket = self.ecc_seq.issue();
        if !self.generator.options().has_payload() {
            self.generator.set_error_correction_level(level);
            return None;
        }
        let mut options = self.generator.options().clone();
        options.error_correction = level;
        Some(PendingRebuild {
            ticket,
            level,
            encoder: self.generator.encoder().clone(),
            options,
        })
    }

    pub fn finish_error_correction(&mut self, built: BuiltSymbol<E>) -> Outcome {
        if !self.ecc_seq.is_current(built.ticket) {
            debug!(level = %built.level, "discarding superseded error correction change");
            return Outcome::Superseded;
        }
        info!(level = %built.level, "error correction level changed");
        self.generator
            .install_symbol(built.level, &built.payload, built.result);
        self.report_render_state();
        match self.generator.render_state() {
            RenderState::Failed(_) => Outcome::Failed,
            _ => Outcome::Applied,
        }
    }

    /// Begin, build and finish in one go.
    pub async fn change_error_correction(&mut self, level: ErrorCorrectionLevel) -> Outcome {
        match self.begin_error_correction(level) {
            Some(pending) => {
                let built = pending.build().await;
                self.finish_error_correction(built)
            }
            None => Outcome::Applied,
        }
    }
}
