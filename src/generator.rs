/// Render-options state.
///
/// [`Generator`] owns the session's [`RenderOptions`] and the live encoder instance.
/// Each setter patches only its own fields and is idempotent. Once a payload is
/// present, a setter also re-renders: styling changes patch the live instance, while
/// payload and error correction changes rebuild it from scratch. Without a payload
/// the change is only recorded and the generator stays in the placeholder state.
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::encoder::{Encoder, Symbol};
use crate::error::RenderError;
use crate::logo::Logo;
use crate::options::{
    Background, Color, ErrorCorrectionLevel, EyeStyle, RenderOptions, ShapeKind,
};
use crate::payload::ContentType;

/// What the preview surface should show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderState {
    /// No payload yet.
    Placeholder,
    Rendered,
    /// The encoder instance could not be built or patched.
    Failed(String),
}

/// Snapshot of the generator for external use.
#[derive(Debug, Clone, PartialEq)]
pub struct CurrentData {
    pub data: String,
    pub options: RenderOptions,
    pub has_logo: bool,
}

/// Labels describing the current symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewInfo {
    pub content_type: &'static str,
    pub size: String,
    pub error_correction: &'static str,
}

pub struct Generator<E: Encoder> {
    encoder: E,
    defaults: RenderOptions,
    options: RenderOptions,
    symbol: Option<E::Symbol>,
    state: RenderState,
    content_type: ContentType,
}

impl<E: Encoder> Generator<E> {
    pub fn new(encoder: E) -> Self {
        Generator::with_options(encoder, RenderOptions::default())
    }

    /// Starts from `defaults` instead of [`RenderOptions::default`]; [`Generator::reset`]
    /// returns here.
    pub fn with_options(encoder: E, defaults: RenderOptions) -> Self {
        let mut generator = Generator {
            encoder,
            options: defaults.clone(),
            defaults,
            symbol: None,
            state: RenderState::Placeholder,
            content_type: ContentType::Text,
        };
        generator.rebuild();
        generator
    }

    pub fn encoder(&self) -> &E {
        &self.encoder
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    pub fn render_state(&self) -> &RenderState {
        &self.state
    }

    pub fn symbol(&self) -> Option<&E::Symbol> {
        self.symbol.as_ref()
    }

    pub fn content_type(&self) -> ContentType {
        self.content_type
    }

    /// Stores a freshly formatted payload and rebuilds the encoder instance.
    ///
    /// # Arguments
    ///
    /// * `payload` - The formatted payload string, see [`crate::payload::format`].
    /// * `content_type` - The input type the payload came from.
    ///
    /// An empty payload switches to the placeholder. Setting the payload that is
    /// already rendered does nothing.
    ///
    /// # Example
    ///
    /// ```rust
    /// use qistudio::encoder::StyledEncoder;
    /// use qistudio::generator::{Generator, RenderState};
    /// use qistudio::payload::ContentType;
    ///
    /// let mut generator = Generator::new(StyledEncoder);
    /// generator.set_payload("tel:+15550100", ContentType::Phone);
    /// assert_eq!(generator.render_state(), &RenderState::Rendered);
    ///
    /// generator.set_payload("", ContentType::Phone);
    /// assert_eq!(generator.render_state(), &RenderState::Placeholder);
    /// ```
    pub fn set_payload(&mut self, payload: impl Into<String>, content_type: ContentType) {
        let payload = payload.into();
        self.content_type = content_type;
        if payload == self.options.data && self.state == RenderState::Rendered {
            return;
        }
        self.options.data = payload;
        self.rebuild();
    }

    /// Applies `size` to both width and height.
    ///
    /// A size above [`crate::render::MAX_CANVAS_SIDE`], or one too small for the
    /// margin and module count, moves the generator to [`RenderState::Failed`].
    ///
    /// # Example
    ///
    /// ```rust
    /// use qistudio::encoder::{StyledEncoder, Symbol};
    /// use qistudio::generator::Generator;
    /// use qistudio::payload::ContentType;
    ///
    /// let mut generator = Generator::new(StyledEncoder);
    /// generator.set_payload("Hello, World!", ContentType::Text);
    /// generator.set_dimensions(256);
    /// let image = generator.symbol().unwrap().to_image();
    /// assert_eq!(image.dimensions(), (256, 256));
    /// ```
    pub fn set_dimensions(&mut self, size: u32) {
        self.options.width = size;
        self.options.height = size;
        self.refresh();
    }

    pub fn set_margin(&mut self, margin: u32) {
        self.options.margin = margin;
        self.refresh();
    }

    /// Recolors the symbol.
    ///
    /// # Arguments
    ///
    /// * `foreground` - Color of the dots and both corner parts.
    /// * `background` - Fill behind the modules.
    /// * `transparent` - When set, replaces `background` with no fill at all.
    pub fn set_colors(&mut self, foreground: Color, background: Color, transparent: bool) {
        self.options.foreground = foreground;
        self.options.background = if transparent {
            Background::Transparent
        } else {
            Background::Color(background)
        };
        self.refresh();
    }

    /// Applies a named dot shape. The shape also sets both corner styles.
    pub fn set_shape(&mut self, shape: ShapeKind) {
        let (dots, corners) = shape.styles();
        self.options.dot_style = dots;
        self.options.corner_square_style = corners;
        self.options.corner_dot_style = corners;
        self.refresh();
    }

    pub fn set_eye_style(&mut self, eye: EyeStyle) {
        let (square, dot) = eye.styles();
        self.options.corner_square_style = square;
        self.options.corner_dot_style = dot;
        self.refresh();
    }

    /// Changes the error correction level. The encoder instance is always rebuilt,
    /// never patched.
    ///
    /// Without a payload only the level is recorded.
    pub fn set_error_correction_level(&mut self, level: ErrorCorrectionLevel) {
        self.options.error_correction = level;
        self.rebuild();
    }

    /// Installs an instance built elsewhere (off the event loop).
    ///
    /// # Arguments
    ///
    /// * `level` - The error correction level `built` was created with.
    /// * `payload` - The payload `built` was created from.
    /// * `built` - The build result. An error moves the generator to
    ///   [`RenderState::Failed`].
    ///
    /// If the payload changed in the meantime the instance is stale and a fresh one
    /// is built instead.
    pub fn install_symbol(
        &mut self,
        level: ErrorCorrectionLevel,
        payload: &str,
        built: Result<E::Symbol, RenderError>,
    ) {
        self.options.error_correction = level;
        if payload != self.options.data {
            debug!("prebuilt instance is stale, rebuilding");
            self.rebuild();
            return;
        }
        self.symbol = None;
        if !self.options.has_payload() {
            self.state = RenderState::Placeholder;
            return;
        }
        match built.and_then(|mut symbol| symbol.update(&self.options).map(|_| symbol)) {
            Ok(symbol) => self.render_with(symbol),
            Err(err) => self.fail(err),
        }
    }

    pub fn set_logo(&mut self, logo: Arc<Logo>) {
        self.options.logo = Some(logo);
        self.refresh();
    }

    pub fn clear_logo(&mut self) {
        self.options.logo = None;
        self.refresh();
    }

    /// Restores the starting options, drops the logo and shows the placeholder.
    pub fn reset(&mut self) {
        self.options = self.defaults.clone();
        self.options.data.clear();
        self.options.logo = None;
        self.content_type = ContentType::Text;
        self.symbol = None;
        self.state = RenderState::Placeholder;
    }

    pub fn current_data(&self) -> CurrentData {
        CurrentData {
            data: self.options.data.clone(),
            options: self.options.clone(),
            has_logo: self.options.logo.is_some(),
        }
    }

    pub fn preview_info(&self) -> PreviewInfo {
        PreviewInfo {
            content_type: self.content_type.label(),
            size: format!("{}px", self.options.width),
            error_correction: self.options.error_correction.label(),
        }
    }

    /// Patches the live instance, or rebuilds when a payload exists but no
    /// instance survived an earlier failure.
    fn refresh(&mut self) {
        if !self.options.has_payload() {
            return;
        }
        let Some(symbol) = self.symbol.as_mut() else {
            self.rebuild();
            return;
        };
        match symbol.update(&self.options) {
            Ok(()) => {
                debug!("encoder instance patched");
                self.state = RenderState::Rendered;
            }
            Err(err) => self.fail(err),
        }
    }

    /// Discards the current instance and builds a new one.
    fn rebuild(&mut self) {
        self.symbol = None;
        if !self.options.has_payload() {
            self.state = RenderState::Placeholder;
            return;
        }
        match self.encoder.create(&self.options) {
            Ok(symbol) => self.render_with(symbol),
            Err(err) => self.fail(err),
        }
    }

    fn render_with(&mut self, symbol: E::Symbol) {
        info!(
            modules = symbol.module_count(),
            level = %self.options.error_correction,
            "QR code rendered"
        );
        self.symbol = Some(symbol);
        self.state = RenderState::Rendered;
    }

    fn fail(&mut self, err: RenderError) {
        warn!(error = %err, "failed to create QR code");
        self.symbol = None;
        self.state = RenderState::Failed(err.to_string());
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use image::RgbaImage;

    use crate::options::{CornerStyle, DotStyle};

    /// Counts how often instances are created and patched.
    #[derive(Default, Clone)]
    pub(crate) struct CountingEncoder {
        pub created: Arc<AtomicUsize>,
        pub updated: Arc<AtomicUsize>,
    }

    pub(crate) struct CountingSymbol {
        pub serial: usize,
        updated: Arc<AtomicUsize>,
        width: u32,
    }

    impl Encoder for CountingEncoder {
        type Symbol = CountingSymbol;

        fn create(&self, options: &RenderOptions) -> Result<CountingSymbol, RenderError> {
            if options.data == "boom" {
                return Err(RenderError::Encode("boom".into()));
            }
            let serial = self.created.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(CountingSymbol {
                serial,
                updated: self.updated.clone(),
                width: options.width,
            })
        }
    }

    impl Symbol for CountingSymbol {
        fn update(&mut self, options: &RenderOptions) -> Result<(), RenderError> {
            if options.width < 21 {
                return Err(RenderError::CanvasTooSmall {
                    width: options.width,
                    height: options.height,
                    margin: options.margin,
                    modules: 21,
                });
            }
            self.updated.fetch_add(1, Ordering::SeqCst);
            self.width = options.width;
            Ok(())
        }

        fn module_count(&self) -> usize {
            21
        }

        fn to_image(&self) -> RgbaImage {
            RgbaImage::new(self.width, self.width)
        }

        fn to_svg(&self) -> String {
            "<svg/>".to_string()
        }

        fn to_terminal(&self) -> String {
            String::new()
        }
    }

    fn generator() -> (Generator<CountingEncoder>, CountingEncoder) {
        let encoder = CountingEncoder::default();
        (Generator::new(encoder.clone()), encoder)
    }

    fn logo() -> Arc<Logo> {
        let img = image::DynamicImage::ImageRgba8(RgbaImage::new(4, 4));
        Arc::new(Logo::from_image(img).unwrap())
    }

    #[test]
    fn test_starts_in_placeholder() {
        let (generator, encoder) = generator();
        assert_eq!(generator.render_state(), &RenderState::Placeholder);
        assert!(generator.symbol().is_none());
        assert_eq!(encoder.created.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_updates_without_payload_are_recorded_only() {
        let (mut generator, encoder) = generator();
        generator.set_dimensions(300);
        generator.set_margin(10);
        generator.set_shape(ShapeKind::Dots);
        assert_eq!(generator.options().width, 300);
        assert_eq!(generator.options().height, 300);
        assert_eq!(generator.options().margin, 10);
        assert_eq!(generator.render_state(), &RenderState::Placeholder);
        assert_eq!(encoder.created.load(Ordering::SeqCst), 0);
        assert_eq!(encoder.updated.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_payload_renders_and_styles_patch() {
        let (mut generator, encoder) = generator();
        generator.set_payload("hello", ContentType::Text);
        assert_eq!(generator.render_state(), &RenderState::Rendered);
        assert_eq!(encoder.created.load(Ordering::SeqCst), 1);

        generator.set_dimensions(500);
        generator.set_colors(Color::WHITE, Color::BLACK, false);
        assert_eq!(encoder.created.load(Ordering::SeqCst), 1);
        assert_eq!(encoder.updated.load(Ordering::SeqCst), 2);
        assert_eq!(generator.symbol().map(|s| s.width), Some(500));
    }

    #[test]
    fn test_empty_payload_returns_to_placeholder() {
        let (mut generator, _) = generator();
        generator.set_payload("hello", ContentType::Text);
        generator.set_payload("", ContentType::Url);
        assert_eq!(generator.render_state(), &RenderState::Placeholder);
        assert!(generator.symbol().is_none());
        assert!(!generator.current_data().options.has_payload());
    }

    #[test]
    fn test_shape_is_idempotent() {
        let (mut generator, _) = generator();
        generator.set_payload("hello", ContentType::Text);
        generator.set_shape(ShapeKind::from_name("square"));
        let once = generator.options().clone();
        generator.set_shape(ShapeKind::from_name("square"));
        assert_eq!(generator.options(), &once);
    }

    #[test]
    fn test_shape_and_eye_leave_other_fields() {
        let (mut generator, _) = generator();
        generator.set_dimensions(250);
        generator.set_shape(ShapeKind::Circle);
        assert_eq!(generator.options().dot_style, DotStyle::ClassyRounded);
        assert_eq!(generator.options().corner_dot_style, CornerStyle::ExtraRounded);

        generator.set_eye_style(EyeStyle::Rounded);
        assert_eq!(generator.options().dot_style, DotStyle::ClassyRounded);
        assert_eq!(generator.options().corner_square_style, CornerStyle::ExtraRounded);
        assert_eq!(generator.options().corner_dot_style, CornerStyle::Dot);
        assert_eq!(generator.options().width, 250);
    }

    #[test]
    fn test_transparent_overrides_background() {
        let (mut generator, _) = generator();
        generator.set_colors(Color::BLACK, Color::WHITE, true);
        assert_eq!(generator.options().background, Background::Transparent);
        generator.set_colors(Color::BLACK, Color::WHITE, false);
        assert_eq!(generator.options().background, Background::Color(Color::WHITE));
    }

    #[test]
    fn test_error_correction_recreates_instance() {
        let (mut generator, encoder) = generator();
        generator.set_payload("hello", ContentType::Text);
        let first = generator.symbol().map(|s| s.serial);

        generator.set_error_correction_level(ErrorCorrectionLevel::Low);
        let second = generator.symbol().map(|s| s.serial);

        assert_eq!(encoder.created.load(Ordering::SeqCst), 2);
        assert_eq!(encoder.updated.load(Ordering::SeqCst), 0);
        assert_ne!(first, second);
        assert_eq!(generator.options().error_correction, ErrorCorrectionLevel::Low);
    }

    #[test]
    fn test_construction_failure_clears_render() {
        let (mut generator, _) = generator();
        generator.set_payload("hello", ContentType::Text);
        generator.set_payload("boom", ContentType::Text);
        assert!(matches!(generator.render_state(), RenderState::Failed(_)));
        assert!(generator.symbol().is_none());
    }

    #[test]
    fn test_patch_failure_then_recovery() {
        let (mut generator, encoder) = generator();
        generator.set_payload("hello", ContentType::Text);
        generator.set_dimensions(10);
        assert!(matches!(generator.render_state(), RenderState::Failed(_)));
        assert!(generator.symbol().is_none());

        generator.set_dimensions(300);
        assert_eq!(generator.render_state(), &RenderState::Rendered);
        assert_eq!(encoder.created.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_logo_set_and_clear_releases_image() {
        let (mut generator, _) = generator();
        generator.set_payload("hello", ContentType::Text);
        let logo = logo();
        let weak = Arc::downgrade(&logo);
        generator.set_logo(logo);
        assert!(generator.current_data().has_logo);

        generator.clear_logo();
        assert!(generator.options().logo.is_none());
        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn test_install_symbol_for_stale_payload_rebuilds() {
        let (mut generator, encoder) = generator();
        generator.set_payload("new", ContentType::Text);
        let prebuilt = encoder.create(&RenderOptions {
            data: "old".into(),
            ..RenderOptions::default()
        });
        generator.install_symbol(ErrorCorrectionLevel::Medium, "old", prebuilt);
        assert_eq!(generator.options().error_correction, ErrorCorrectionLevel::Medium);
        assert_eq!(generator.symbol().map(|s| s.serial), Some(3));
    }

    #[test]
    fn test_preview_info_and_reset() {
        let (mut generator, _) = generator();
        generator.set_payload("WIFI:T:WPA;S:a;P:b;H:false;", ContentType::Wifi);
        generator.set_error_correction_level(ErrorCorrectionLevel::Quartile);
        let info = generator.preview_info();
        assert_eq!(info.content_type, "Wi-Fi Network");
        assert_eq!(info.size, "400px");
        assert_eq!(info.error_correction, "Quartile (25%)");

        generator.set_logo(logo());
        generator.reset();
        assert_eq!(generator.options(), &RenderOptions::default());
        assert_eq!(generator.render_state(), &RenderState::Placeholder);
    }
}
